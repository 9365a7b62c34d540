//! Domain error types
//!
//! This module defines the error hierarchy for Credo. Domain errors carry the
//! entity kind and ids involved so callers can report them without parsing
//! messages. Store errors are backend-neutral and never expose driver types.

use super::ids::{DocumentId, SequenceName};
use super::kind::EntityKind;
use std::fmt;
use thiserror::Error;

/// Main Credo error type
#[derive(Debug, Error)]
pub enum CredoError {
    /// A field, enum value or domain rule was violated
    #[error("Validation error on {kind}: {rule}")]
    Validation { kind: EntityKind, rule: String },

    /// A reference named a document that does not exist
    #[error("Reference not found: {kind}.{field} -> {target_kind} {target_id}")]
    ReferenceNotFound {
        kind: EntityKind,
        field: String,
        target_kind: EntityKind,
        target_id: DocumentId,
    },

    /// A delete was rejected because other documents still depend on the target
    #[error(
        "Referential integrity violation: {kind} {id} is referenced by {} document(s): {}",
        .blockers.len(),
        format_blockers(.blockers)
    )]
    ReferentialIntegrity {
        kind: EntityKind,
        id: DocumentId,
        blockers: Vec<Blocker>,
    },

    /// The sequence allocator could not produce a value
    #[error("Allocation error for sequence '{sequence}': {message}")]
    Allocation {
        sequence: SequenceName,
        message: String,
    },

    /// Optimistic concurrency check failed
    #[error("Conflict on {kind} {id}: expected version {expected}, found {found}")]
    Conflict {
        kind: EntityKind,
        id: DocumentId,
        expected: u64,
        found: u64,
    },

    /// The document does not exist or was deleted
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: DocumentId },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Store errors that have no domain-level meaning
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// A document that prevents a delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocker {
    /// Kind of the referencing document
    pub kind: EntityKind,
    /// Id of the referencing document
    pub id: DocumentId,
    /// Field holding the reference
    pub field: String,
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.id, self.field)
    }
}

fn format_blockers(blockers: &[Blocker]) -> String {
    blockers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Store-specific errors
///
/// Returned by [`DocumentStore`](crate::adapters::database::DocumentStore) and
/// [`CounterStore`](crate::adapters::database::CounterStore) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached; the operation may be retried
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A unique field value is already taken by another document
    #[error("Duplicate value for {kind}.{field}: '{value}'")]
    Duplicate {
        kind: EntityKind,
        field: String,
        value: String,
    },

    /// The document id is in use or was used by a deleted document
    #[error("Document id already used: {kind} {id}")]
    IdTaken { kind: EntityKind, id: DocumentId },

    /// The stored version differs from the expected one
    #[error("Version mismatch on {kind} {id}: expected {expected}, found {found}")]
    VersionMismatch {
        kind: EntityKind,
        id: DocumentId,
        expected: u64,
        found: u64,
    },

    /// The document does not exist
    #[error("Document missing: {kind} {id}")]
    Missing { kind: EntityKind, id: DocumentId },

    /// A written document references a document that does not exist
    #[error("Dangling reference: {kind}.{field} -> {target_kind} {target_id}")]
    DanglingReference {
        kind: EntityKind,
        field: String,
        target_kind: EntityKind,
        target_id: DocumentId,
    },

    /// A removed document is still referenced after the batch was applied
    #[error("{kind} {id} is still referenced by {source_kind} {source_id} ({field})")]
    StillReferenced {
        kind: EntityKind,
        id: DocumentId,
        source_kind: EntityKind,
        source_id: DocumentId,
        field: String,
    },

    /// Snapshot file could not be read or written
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Any other backend failure
    #[error("Query failed: {0}")]
    Query(String),
}

impl From<StoreError> for CredoError {
    /// Store conditions with a domain meaning become domain errors; the rest
    /// stay wrapped.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionMismatch {
                kind,
                id,
                expected,
                found,
            } => CredoError::Conflict {
                kind,
                id,
                expected,
                found,
            },
            StoreError::Missing { kind, id } => CredoError::NotFound { kind, id },
            StoreError::Duplicate { kind, field, value } => CredoError::Validation {
                kind,
                rule: format!("{field} '{value}' is already in use"),
            },
            StoreError::DanglingReference {
                kind,
                field,
                target_kind,
                target_id,
            } => CredoError::ReferenceNotFound {
                kind,
                field,
                target_kind,
                target_id,
            },
            StoreError::StillReferenced {
                kind,
                id,
                source_kind,
                source_id,
                field,
            } => CredoError::ReferentialIntegrity {
                kind,
                id,
                blockers: vec![Blocker {
                    kind: source_kind,
                    id: source_id,
                    field,
                }],
            },
            other => CredoError::Store(other),
        }
    }
}

impl CredoError {
    /// Shorthand for a validation failure
    pub fn validation(kind: EntityKind, rule: impl Into<String>) -> Self {
        CredoError::Validation {
            kind,
            rule: rule.into(),
        }
    }

    /// Whether retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CredoError::Allocation { .. } | CredoError::Store(StoreError::Unavailable(_))
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for CredoError {
    fn from(err: std::io::Error) -> Self {
        CredoError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for CredoError {
    fn from(err: serde_json::Error) -> Self {
        CredoError::Serialization(err.to_string())
    }
}

// Conversion from toml::de::Error
impl From<toml::de::Error> for CredoError {
    fn from(err: toml::de::Error) -> Self {
        CredoError::Configuration(format!("TOML parsing error: {err}"))
    }
}
