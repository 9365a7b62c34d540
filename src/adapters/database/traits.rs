//! Store abstraction traits
//!
//! This module defines the traits that store adapters must implement to back
//! the sequence allocator and the entity graph manager.

use crate::domain::ids::{DocumentId, SequenceName};
use crate::domain::kind::EntityKind;
use crate::domain::{Result, StoredDocument};
use async_trait::async_trait;

/// One write inside an atomic batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert a new document
    Insert(StoredDocument),

    /// Replace a document if its stored version still equals `expected_version`
    Replace {
        document: StoredDocument,
        expected_version: u64,
    },

    /// Remove a document if its stored version still equals `expected_version`,
    /// leaving a tombstone behind
    Remove {
        kind: EntityKind,
        id: DocumentId,
        expected_version: u64,
    },
}

/// A set of writes applied all-or-nothing
///
/// After the ops are applied, no remaining document may reference a removed
/// one; stores reject the batch with `StoreError::StillReferenced` otherwise.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Ids removed by this batch
    pub fn removed_ids(&self) -> impl Iterator<Item = (EntityKind, &DocumentId)> + '_ {
        self.ops.iter().filter_map(|op| match op {
            WriteOp::Remove { kind, id, .. } => Some((*kind, id)),
            _ => None,
        })
    }
}

impl IntoIterator for WriteBatch {
    type Item = WriteOp;
    type IntoIter = std::vec::IntoIter<WriteOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Document storage for entity records
///
/// Implementations enforce, at write time and atomically with the write:
/// id uniqueness (including ids of deleted documents), unique keys per kind,
/// that every reference edge of a written document resolves to an existing
/// document of the declared kind, and optimistic version checks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Test the store connection
    async fn test_connection(&self) -> Result<()>;

    /// Create tables or files the store needs
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert a new document
    ///
    /// # Errors
    ///
    /// `IdTaken`, `Duplicate` or `DanglingReference` store errors.
    async fn insert(&self, document: StoredDocument) -> Result<()>;

    /// Fetch a live document; deleted documents are not returned
    async fn get(&self, kind: EntityKind, id: &DocumentId) -> Result<Option<StoredDocument>>;

    /// Whether a live document of `kind` with `id` exists
    async fn exists(&self, kind: EntityKind, id: &DocumentId) -> Result<bool> {
        Ok(self.get(kind, id).await?.is_some())
    }

    /// Replace a document whose stored version equals `expected_version`
    ///
    /// # Errors
    ///
    /// `Missing`, `VersionMismatch`, `Duplicate` or `DanglingReference` store errors.
    async fn replace(&self, document: StoredDocument, expected_version: u64) -> Result<()>;

    /// Apply every op of `batch` atomically
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Live documents holding at least one reference to `id`
    async fn referencing(&self, kind: EntityKind, id: &DocumentId) -> Result<Vec<StoredDocument>>;

    /// Number of live documents of `kind`
    async fn count(&self, kind: EntityKind) -> Result<u64>;

    /// Short backend name for logs and status output
    fn backend_name(&self) -> &'static str;
}

/// Storage for named monotonically increasing counters
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter and return the new value
    ///
    /// Returns `Ok(None)` when the counter does not exist yet.
    async fn increment(&self, name: &SequenceName) -> Result<Option<u64>>;

    /// Create the counter with `value` unless it already exists
    ///
    /// Returns whether this call created it. Concurrent callers race safely:
    /// exactly one of them creates the counter.
    async fn seed(&self, name: &SequenceName, value: u64) -> Result<bool>;

    /// Highest custom id ever stored for `kind`, including deleted documents,
    /// or 0 when there is none
    async fn max_existing(&self, kind: EntityKind) -> Result<u64>;

    /// Current counter value without incrementing
    async fn current(&self, name: &SequenceName) -> Result<Option<u64>>;

    /// All counters and their values, ordered by name
    async fn counters(&self) -> Result<Vec<(SequenceName, u64)>>;
}
