//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{CredoConfig, DatabaseTarget, Environment, PostgreSQLConfig};
use super::secret::secret_string;
use crate::domain::errors::CredoError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`CredoConfig`]
/// 4. Applies environment variable overrides (`CREDO_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`CredoError::Configuration`] if the file cannot be read or
/// parsed, a referenced variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use credo::config::load_config;
///
/// let config = load_config("credo.toml").expect("Failed to load config");
/// println!("backend: {}", config.database_target.as_str());
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<CredoConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CredoError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CredoError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses, overrides and validates configuration from TOML text
pub fn parse_config(contents: &str) -> Result<CredoConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: CredoConfig = toml::from_str(&contents)
        .map_err(|e| CredoError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        CredoError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied untouched. Every missing variable is reported at
/// once.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| CredoError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(CredoError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CredoError::Configuration(format!("Invalid value '{value}' for {name}"))
    })
}

/// Applies environment variable overrides using the `CREDO_*` prefix
///
/// Variables follow the pattern `CREDO_<SECTION>_<KEY>`, for example
/// `CREDO_POSTGRESQL_CONNECTION_STRING` or `CREDO_SEQUENCES_RETRY_MAX_RETRIES`.
/// Unlike TOML values, malformed numbers and booleans are rejected rather
/// than ignored.
fn apply_env_overrides(config: &mut CredoConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("CREDO_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("CREDO_ENVIRONMENT") {
        config.environment = match val.to_ascii_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(CredoError::Configuration(format!(
                    "Invalid value '{other}' for CREDO_ENVIRONMENT"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("CREDO_DATABASE_TARGET") {
        config.database_target = match val.to_ascii_lowercase().as_str() {
            "memory" => DatabaseTarget::Memory,
            "postgresql" => DatabaseTarget::PostgreSQL,
            other => {
                return Err(CredoError::Configuration(format!(
                    "Invalid value '{other}' for CREDO_DATABASE_TARGET"
                )))
            }
        };
    }

    // Memory overrides
    if let Ok(val) = std::env::var("CREDO_MEMORY_SNAPSHOT_PATH") {
        config.memory.snapshot_path = Some(PathBuf::from(val));
    }

    // PostgreSQL overrides; a connection string alone is enough to create the section
    if let Ok(val) = std::env::var("CREDO_POSTGRESQL_CONNECTION_STRING") {
        match config.postgresql.as_mut() {
            Some(pg) => pg.connection_string = secret_string(val),
            None => config.postgresql = Some(PostgreSQLConfig::new(secret_string(val))),
        }
    }
    if let Some(pg) = config.postgresql.as_mut() {
        if let Ok(val) = std::env::var("CREDO_POSTGRESQL_MAX_CONNECTIONS") {
            pg.max_connections = parse_env("CREDO_POSTGRESQL_MAX_CONNECTIONS", &val)?;
        }
        if let Ok(val) = std::env::var("CREDO_POSTGRESQL_STATEMENT_TIMEOUT_SECONDS") {
            pg.statement_timeout_seconds =
                parse_env("CREDO_POSTGRESQL_STATEMENT_TIMEOUT_SECONDS", &val)?;
        }
        if let Ok(val) = std::env::var("CREDO_POSTGRESQL_SSL_MODE") {
            pg.ssl_mode = val;
        }
    }

    // Sequence overrides
    if let Ok(val) = std::env::var("CREDO_SEQUENCES_BOOTSTRAP_FROM_EXISTING") {
        config.sequences.bootstrap_from_existing =
            parse_env("CREDO_SEQUENCES_BOOTSTRAP_FROM_EXISTING", &val)?;
    }
    if let Ok(val) = std::env::var("CREDO_SEQUENCES_RETRY_MAX_RETRIES") {
        config.sequences.retry.max_retries = parse_env("CREDO_SEQUENCES_RETRY_MAX_RETRIES", &val)?;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("CREDO_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_env("CREDO_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("CREDO_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
