//! CLI interface and argument parsing
//!
//! Operator commands for Credo, built with clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Credo - provider credentialing entity store
#[derive(Parser, Debug)]
#[command(name = "credo")]
#[command(version, about, long_about = None)]
#[command(author = "Credo Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "credo.toml", env = "CREDO_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CREDO_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show sequence counters and document counts
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["credo", "status"]);
        assert_eq!(cli.config, "credo.toml");
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["credo", "--config", "custom.toml", "validate-config"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["credo", "--log-level", "debug", "status"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_status_json() {
        let cli = Cli::parse_from(["credo", "status", "--json"]);
        match cli.command {
            Commands::Status(args) => assert!(args.json),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["credo", "init", "--force", "--with-examples"]);
        match cli.command {
            Commands::Init(args) => {
                assert!(args.force);
                assert!(args.with_examples);
                assert_eq!(args.output, "credo.toml");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
