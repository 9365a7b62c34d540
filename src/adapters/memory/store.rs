//! In-process store with optional JSON snapshot persistence
//!
//! All state sits behind one mutex, so every operation (including a whole
//! [`WriteBatch`]) is atomic with respect to every other. When a snapshot path
//! is configured the full state is written to a temporary file and renamed
//! over the snapshot before an operation returns, so a restarted process
//! resumes counters past every value already handed out.

use crate::adapters::database::traits::{CounterStore, DocumentStore, WriteBatch, WriteOp};
use crate::domain::errors::StoreError;
use crate::domain::ids::{DocumentId, SequenceName};
use crate::domain::kind::EntityKind;
use crate::domain::record::LifecycleState;
use crate::domain::{Result, StoredDocument};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// What remains of a deleted document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tombstone {
    kind: EntityKind,
    custom_id: Option<u64>,
    deleted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoryState {
    #[serde(default)]
    documents: BTreeMap<DocumentId, StoredDocument>,
    #[serde(default)]
    counters: BTreeMap<SequenceName, u64>,
    #[serde(default)]
    tombstones: BTreeMap<DocumentId, Tombstone>,
}

impl MemoryState {
    fn live(&self, kind: EntityKind, id: &DocumentId) -> Option<&StoredDocument> {
        self.documents.get(id).filter(|doc| doc.kind == kind)
    }

    fn check_unique(&self, document: &StoredDocument) -> std::result::Result<(), StoreError> {
        for key in &document.unique_keys {
            let taken = self.documents.values().any(|other| {
                other.kind == document.kind
                    && other.id != document.id
                    && other.unique_keys.contains(key)
            });
            if taken {
                return Err(StoreError::Duplicate {
                    kind: document.kind,
                    field: key.field.clone(),
                    value: key.value.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_edges(&self, document: &StoredDocument) -> std::result::Result<(), StoreError> {
        for edge in &document.references {
            let is_self = edge.target_id == document.id && edge.target_kind == document.kind;
            if !is_self && self.live(edge.target_kind, &edge.target_id).is_none() {
                return Err(StoreError::DanglingReference {
                    kind: document.kind,
                    field: edge.field.clone(),
                    target_kind: edge.target_kind,
                    target_id: edge.target_id.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_version(
        &self,
        kind: EntityKind,
        id: &DocumentId,
        expected_version: u64,
    ) -> std::result::Result<(), StoreError> {
        let current = self.live(kind, id).ok_or_else(|| StoreError::Missing {
            kind,
            id: id.clone(),
        })?;
        if current.version != expected_version {
            return Err(StoreError::VersionMismatch {
                kind,
                id: id.clone(),
                expected: expected_version,
                found: current.version,
            });
        }
        Ok(())
    }

    fn insert(&mut self, document: StoredDocument) -> std::result::Result<(), StoreError> {
        if self.documents.contains_key(&document.id) || self.tombstones.contains_key(&document.id)
        {
            return Err(StoreError::IdTaken {
                kind: document.kind,
                id: document.id,
            });
        }
        self.check_unique(&document)?;
        self.check_edges(&document)?;
        self.documents.insert(document.id.clone(), document);
        Ok(())
    }

    fn replace(
        &mut self,
        document: StoredDocument,
        expected_version: u64,
    ) -> std::result::Result<(), StoreError> {
        self.check_version(document.kind, &document.id, expected_version)?;
        self.check_unique(&document)?;
        self.check_edges(&document)?;
        self.documents.insert(document.id.clone(), document);
        Ok(())
    }

    fn remove(
        &mut self,
        kind: EntityKind,
        id: &DocumentId,
        expected_version: u64,
    ) -> std::result::Result<(), StoreError> {
        self.check_version(kind, id, expected_version)?;
        if let Some(document) = self.documents.remove(id) {
            self.tombstones.insert(
                id.clone(),
                Tombstone {
                    kind,
                    custom_id: document.custom_id,
                    deleted_at: Utc::now(),
                },
            );
        }
        Ok(())
    }

    fn apply(&mut self, batch: WriteBatch) -> std::result::Result<(), StoreError> {
        let removed: Vec<(EntityKind, DocumentId)> = batch
            .removed_ids()
            .map(|(kind, id)| (kind, id.clone()))
            .collect();

        for op in batch {
            match op {
                WriteOp::Insert(document) => self.insert(document)?,
                WriteOp::Replace {
                    document,
                    expected_version,
                } => self.replace(document, expected_version)?,
                WriteOp::Remove {
                    kind,
                    id,
                    expected_version,
                } => self.remove(kind, &id, expected_version)?,
            }
        }

        for (kind, id) in removed {
            if let Some(source) = self.documents.values().find(|doc| doc.references_id(&id)) {
                let field = source
                    .fields_referencing(&id)
                    .next()
                    .map(|edge| edge.field.clone())
                    .unwrap_or_default();
                return Err(StoreError::StillReferenced {
                    kind,
                    id,
                    source_kind: source.kind,
                    source_id: source.id.clone(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// In-process [`DocumentStore`] and [`CounterStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Creates an empty, purely in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store persisted at `path`, loading the snapshot if it exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let bytes = std::fs::read(&path).map_err(|e| {
                StoreError::Snapshot(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Snapshot(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            MemoryState::default()
        };

        tracing::info!(
            path = %path.display(),
            documents = state.documents.len(),
            counters = state.counters.len(),
            "Opened memory store snapshot"
        );

        Ok(Self {
            state: Mutex::new(state),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> Result<T> {
        let state = self.lock()?;
        Ok(f(&state))
    }

    /// Runs `f` against the state and persists the result. With a snapshot
    /// configured, `f` works on a copy that only replaces the live state once
    /// the snapshot is on disk.
    fn write<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> std::result::Result<T, StoreError>,
    ) -> Result<T> {
        let mut state = self.lock()?;
        match &self.snapshot_path {
            None => Ok(f(&mut state)?),
            Some(path) => {
                let mut next = state.clone();
                let value = f(&mut next)?;
                write_snapshot(path, &next)?;
                *state = next;
                Ok(value)
            }
        }
    }
}

fn write_snapshot(path: &Path, state: &MemoryState) -> std::result::Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|e| StoreError::Snapshot(format!("Failed to serialize snapshot: {e}")))?;

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)
        .map_err(|e| StoreError::Snapshot(format!("Failed to write {}: {}", tmp.display(), e)))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        StoreError::Snapshot(format!("Failed to replace {}: {}", path.display(), e))
    })
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn test_connection(&self) -> Result<()> {
        self.lock()?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Snapshot(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        if !path.exists() {
            let state = self.lock()?;
            write_snapshot(path, &state)?;
            tracing::info!(path = %path.display(), "Created memory store snapshot");
        }
        Ok(())
    }

    async fn insert(&self, document: StoredDocument) -> Result<()> {
        self.write(|state| state.insert(document))
    }

    async fn get(&self, kind: EntityKind, id: &DocumentId) -> Result<Option<StoredDocument>> {
        self.read(|state| state.live(kind, id).cloned())
    }

    async fn replace(&self, document: StoredDocument, expected_version: u64) -> Result<()> {
        self.write(|state| state.replace(document, expected_version))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.write(|state| {
            let mut next = state.clone();
            next.apply(batch)?;
            *state = next;
            Ok(())
        })
    }

    async fn referencing(&self, kind: EntityKind, id: &DocumentId) -> Result<Vec<StoredDocument>> {
        self.read(|state| {
            state
                .documents
                .values()
                .filter(|doc| {
                    doc.references
                        .iter()
                        .any(|edge| edge.target_kind == kind && &edge.target_id == id)
                })
                .cloned()
                .collect()
        })
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        self.read(|state| {
            state
                .documents
                .values()
                .filter(|doc| doc.kind == kind && doc.state != LifecycleState::Deleted)
                .count() as u64
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn increment(&self, name: &SequenceName) -> Result<Option<u64>> {
        self.write(|state| {
            Ok(state.counters.get_mut(name).map(|value| {
                *value += 1;
                *value
            }))
        })
    }

    async fn seed(&self, name: &SequenceName, value: u64) -> Result<bool> {
        if self.read(|state| state.counters.contains_key(name))? {
            return Ok(false);
        }
        self.write(|state| {
            if state.counters.contains_key(name) {
                return Ok(false);
            }
            state.counters.insert(name.clone(), value);
            Ok(true)
        })
    }

    async fn max_existing(&self, kind: EntityKind) -> Result<u64> {
        self.read(|state| {
            let live = state
                .documents
                .values()
                .filter(|doc| doc.kind == kind)
                .filter_map(|doc| doc.custom_id);
            let deleted = state
                .tombstones
                .values()
                .filter(|tomb| tomb.kind == kind)
                .filter_map(|tomb| tomb.custom_id);
            live.chain(deleted).max().unwrap_or(0)
        })
    }

    async fn current(&self, name: &SequenceName) -> Result<Option<u64>> {
        self.read(|state| state.counters.get(name).copied())
    }

    async fn counters(&self) -> Result<Vec<(SequenceName, u64)>> {
        self.read(|state| {
            state
                .counters
                .iter()
                .map(|(name, value)| (name.clone(), *value))
                .collect()
        })
    }
}
