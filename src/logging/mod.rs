//! Logging and observability
//!
//! Structured `tracing` output: console for operators, JSON files for
//! collection. The macros below keep field names consistent across the
//! allocator and the graph manager.
//!
//! # Example
//!
//! ```no_run
//! use credo::logging::init_logging;
//! use credo::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(sequence = "payer", value = 42, "Allocated custom id");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a newly stored entity
///
/// # Example
///
/// ```no_run
/// use credo::log_entity_created;
/// use credo::domain::{DocumentId, EntityKind};
///
/// let id = DocumentId::generate();
/// log_entity_created!(EntityKind::Payer, &id, Some(7u64));
/// ```
#[macro_export]
macro_rules! log_entity_created {
    ($kind:expr, $id:expr, $custom_id:expr) => {
        tracing::info!(
            kind = %$kind,
            id = %$id,
            custom_id = ?$custom_id,
            "Entity created"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use credo::log_error_with_context;
/// use credo::domain::CredoError;
///
/// let error = CredoError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use credo::log_retry_attempt;
/// use std::time::Duration;
///
/// log_retry_attempt!("user", 2, 5, Duration::from_millis(50), "store unavailable");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($sequence:expr, $attempt:expr, $max_attempts:expr, $delay:expr, $reason:expr) => {
        tracing::warn!(
            sequence = %$sequence,
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_ms = $delay.as_millis() as u64,
            reason = %$reason,
            "Retrying counter increment"
        );
    };
}
