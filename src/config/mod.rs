//! Configuration management for Credo.
//!
//! Credo reads a TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `CREDO_*` environment overrides
//! - Defaults for every section
//! - Validation on load, including delete-policy overrides
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use credo::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("credo.toml")?;
//!
//! println!("Backend: {}", config.database_target.as_str());
//! println!("Bootstrap counters: {}", config.sequences.bootstrap_from_existing);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application name and log level
//! - [`MemoryConfig`] - Snapshot file for the in-memory store
//! - [`PostgreSQLConfig`] - PostgreSQL connection pool
//! - [`SequenceConfig`] - Counter bootstrap and increment retries
//! - [`IntegrityConfig`] - Per-relationship delete policies
//! - [`LoggingConfig`] - Local JSON log files
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//! database_target = "postgresql"
//!
//! [application]
//! log_level = "info"
//!
//! [postgresql]
//! connection_string = "${CREDO_DATABASE_URL}"
//! max_connections = 20
//!
//! [sequences.retry]
//! max_retries = 5
//! initial_delay_ms = 25
//!
//! [integrity.policies]
//! "Provider.locations" = "restrict"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CredoConfig, DatabaseTarget, Environment, IntegrityConfig, LoggingConfig,
    MemoryConfig, PostgreSQLConfig, RetryConfig, SequenceConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
