//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Credo configuration file.

use crate::adapters::postgresql::client::redact_connection_string;
use crate::config::load_config;
use crate::config::schema::{CredoConfig, DatabaseTarget};
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let overrides = match config.integrity.catalog() {
            Ok(_) => config.integrity.policies.len(),
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        print_summary(&config, overrides);
        Ok(0)
    }
}

fn print_summary(config: &CredoConfig, overrides: usize) {
    println!("Configuration Summary:");
    println!("  Application: {}", config.application.name);
    println!("  Environment: {:?}", config.environment);
    println!("  Log Level: {}", config.application.log_level);
    println!("  Database Target: {}", config.database_target.as_str());

    match config.database_target {
        DatabaseTarget::Memory => match &config.memory.snapshot_path {
            Some(path) => println!("  Snapshot File: {}", path.display()),
            None => println!("  Snapshot File: none (data is lost on exit)"),
        },
        DatabaseTarget::PostgreSQL => {
            if let Some(ref pg_config) = config.postgresql {
                println!(
                    "  PostgreSQL Connection: {}",
                    redact_connection_string(pg_config.connection_string.expose_secret().as_ref())
                );
                println!("  Max Connections: {}", pg_config.max_connections);
                println!("  SSL Mode: {}", pg_config.ssl_mode);
            }
        }
    }

    let retry = &config.sequences.retry;
    println!(
        "  Sequence Bootstrap: {}",
        if config.sequences.bootstrap_from_existing {
            "from existing custom ids"
        } else {
            "from zero"
        }
    );
    println!(
        "  Sequence Retries: {} (initial {}ms, max {}ms, x{})",
        retry.max_retries, retry.initial_delay_ms, retry.max_delay_ms, retry.backoff_multiplier
    );
    println!("  Delete Policy Overrides: {overrides}");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_valid_config_exits_zero() {
        let file = config_file(
            r#"
database_target = "memory"

[integrity.policies]
"Provider.locations" = "restrict"
"#,
        );
        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_invalid_policy_exits_two() {
        let file = config_file(
            r#"
[integrity.policies]
"Payer.address" = "nullify"
"#,
        );
        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_missing_file_exits_two() {
        let code = ValidateArgs {}
            .execute("/nonexistent/credo.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
