//! PostgreSQL adapter implementing the store traits
//!
//! Every write runs in one transaction. Reference targets are locked
//! `FOR SHARE` before a document pointing at them is written, and removed
//! documents are locked `FOR UPDATE`, so a concurrent insert and delete of
//! the same target serialize: whichever commits second sees the other's
//! result and fails cleanly.

use crate::adapters::database::traits::{CounterStore, DocumentStore, WriteBatch, WriteOp};
use crate::adapters::postgresql::client::{map_error, unique_violation, PostgreSQLClient};
use crate::adapters::postgresql::models::{
    from_bigint, parse_id, parse_kind, to_bigint, DocumentRow, DOCUMENT_COLUMNS,
};
use crate::domain::ids::{DocumentId, SequenceName};
use crate::domain::kind::EntityKind;
use crate::domain::{CredoError, Result, StoreError, StoredDocument};
use async_trait::async_trait;
use deadpool_postgres::Transaction;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// PostgreSQL implementation of the store traits
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    /// Runs `ops` in one transaction, committing only if all succeed
    async fn transact(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut conn = self.client.connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| map_error(e, "begin transaction"))?;

        let mut removed = Vec::new();
        for op in ops {
            match op {
                WriteOp::Insert(document) => insert_document(&tx, &document).await?,
                WriteOp::Replace {
                    document,
                    expected_version,
                } => replace_document(&tx, &document, expected_version).await?,
                WriteOp::Remove {
                    kind,
                    id,
                    expected_version,
                } => {
                    remove_document(&tx, kind, &id, expected_version).await?;
                    removed.push(id.to_string());
                }
            }
        }

        if !removed.is_empty() {
            ensure_unreferenced(&tx, &removed).await?;
        }

        tx.commit().await.map_err(|e| map_error(e, "commit"))?;
        Ok(())
    }
}

async fn insert_document(tx: &Transaction<'_>, document: &StoredDocument) -> Result<()> {
    let id = document.id.to_string();
    let tombstoned = tx
        .query_opt("SELECT 1 FROM tombstones WHERE id = $1", &[&id])
        .await
        .map_err(|e| map_error(e, "tombstone lookup"))?;
    if tombstoned.is_some() {
        return Err(StoreError::IdTaken {
            kind: document.kind,
            id: document.id.clone(),
        }
        .into());
    }

    lock_targets(tx, document).await?;
    check_unique(tx, document).await?;

    let row = DocumentRow::from_domain(document)?;
    let query = format!(
        "INSERT INTO documents ({DOCUMENT_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
    );
    tx.execute(
        query.as_str(),
        &[
            &row.id,
            &row.kind,
            &row.custom_id,
            &row.version,
            &row.state,
            &row.created_by,
            &row.updated_by,
            &row.created_at,
            &row.updated_at,
            &row.body,
            &row.refs,
            &row.unique_keys,
        ],
    )
    .await
    .map_err(|e| match unique_violation(&e).as_deref() {
        Some("documents_pkey") => StoreError::IdTaken {
            kind: document.kind,
            id: document.id.clone(),
        },
        Some("idx_documents_kind_custom_id") => StoreError::Duplicate {
            kind: document.kind,
            field: "customId".to_string(),
            value: document.custom_id.map(|c| c.to_string()).unwrap_or_default(),
        },
        _ => map_error(e, "insert document"),
    })?;

    write_indexes(tx, document).await
}

async fn replace_document(
    tx: &Transaction<'_>,
    document: &StoredDocument,
    expected_version: u64,
) -> Result<()> {
    lock_version(tx, document.kind, &document.id, expected_version).await?;
    lock_targets(tx, document).await?;
    check_unique(tx, document).await?;

    let row = DocumentRow::from_domain(document)?;
    tx.execute(
        "UPDATE documents SET custom_id = $2, version = $3, state = $4, updated_by = $5, \
         updated_at = $6, body = $7, refs = $8, unique_keys = $9 WHERE id = $1",
        &[
            &row.id,
            &row.custom_id,
            &row.version,
            &row.state,
            &row.updated_by,
            &row.updated_at,
            &row.body,
            &row.refs,
            &row.unique_keys,
        ],
    )
    .await
    .map_err(|e| map_error(e, "replace document"))?;

    write_indexes(tx, document).await
}

async fn remove_document(
    tx: &Transaction<'_>,
    kind: EntityKind,
    id: &DocumentId,
    expected_version: u64,
) -> Result<()> {
    let custom_id = lock_version(tx, kind, id, expected_version).await?;
    let id_text = id.to_string();

    tx.execute("DELETE FROM documents WHERE id = $1", &[&id_text])
        .await
        .map_err(|e| map_error(e, "delete document"))?;
    tx.execute(
        "INSERT INTO tombstones (id, kind, custom_id) VALUES ($1, $2, $3)",
        &[&id_text, &kind.as_str(), &custom_id],
    )
    .await
    .map_err(|e| map_error(e, "write tombstone"))?;

    tracing::debug!(kind = %kind, id = %id, "Removed document");
    Ok(())
}

/// Locks the row and checks its version; returns its custom id
async fn lock_version(
    tx: &Transaction<'_>,
    kind: EntityKind,
    id: &DocumentId,
    expected_version: u64,
) -> Result<Option<i64>> {
    let row = tx
        .query_opt(
            "SELECT version, custom_id FROM documents WHERE id = $1 AND kind = $2 FOR UPDATE",
            &[&id.to_string(), &kind.as_str()],
        )
        .await
        .map_err(|e| map_error(e, "lock document"))?
        .ok_or_else(|| StoreError::Missing {
            kind,
            id: id.clone(),
        })?;

    let found = from_bigint(row.get("version"))?;
    if found != expected_version {
        return Err(StoreError::VersionMismatch {
            kind,
            id: id.clone(),
            expected: expected_version,
            found,
        }
        .into());
    }
    Ok(row.get("custom_id"))
}

/// Locks every reference target `FOR SHARE`, failing on the first missing one
async fn lock_targets(tx: &Transaction<'_>, document: &StoredDocument) -> Result<()> {
    let targets: Vec<String> = document
        .references
        .iter()
        .filter(|edge| edge.target_id != document.id)
        .map(|edge| edge.target_id.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if targets.is_empty() {
        return Ok(());
    }

    let rows = tx
        .query(
            "SELECT id, kind FROM documents WHERE id = ANY($1) ORDER BY id FOR SHARE",
            &[&targets],
        )
        .await
        .map_err(|e| map_error(e, "lock reference targets"))?;

    let mut found: HashMap<DocumentId, EntityKind> = HashMap::new();
    for row in rows {
        let id: String = row.get("id");
        let kind: String = row.get("kind");
        found.insert(parse_id(&id)?, parse_kind(&kind)?);
    }

    for edge in &document.references {
        if edge.target_id == document.id {
            continue;
        }
        if found.get(&edge.target_id) != Some(&edge.target_kind) {
            return Err(StoreError::DanglingReference {
                kind: document.kind,
                field: edge.field.clone(),
                target_kind: edge.target_kind,
                target_id: edge.target_id.clone(),
            }
            .into());
        }
    }
    Ok(())
}

async fn check_unique(tx: &Transaction<'_>, document: &StoredDocument) -> Result<()> {
    let id = document.id.to_string();
    for key in &document.unique_keys {
        let taken = tx
            .query_opt(
                "SELECT 1 FROM document_unique_keys \
                 WHERE kind = $1 AND field = $2 AND value = $3 AND document_id <> $4",
                &[&document.kind.as_str(), &key.field, &key.value, &id],
            )
            .await
            .map_err(|e| map_error(e, "unique key lookup"))?;
        if taken.is_some() {
            return Err(StoreError::Duplicate {
                kind: document.kind,
                field: key.field.clone(),
                value: key.value.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Rewrites the reference and unique-key index rows of `document`
async fn write_indexes(tx: &Transaction<'_>, document: &StoredDocument) -> Result<()> {
    let id = document.id.to_string();

    tx.execute("DELETE FROM document_references WHERE source_id = $1", &[&id])
        .await
        .map_err(|e| map_error(e, "clear references"))?;
    for edge in &document.references {
        tx.execute(
            "INSERT INTO document_references (source_id, field, target_kind, target_id) \
             VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
            &[
                &id,
                &edge.field,
                &edge.target_kind.as_str(),
                &edge.target_id.to_string(),
            ],
        )
        .await
        .map_err(|e| map_error(e, "index reference"))?;
    }

    tx.execute("DELETE FROM document_unique_keys WHERE document_id = $1", &[&id])
        .await
        .map_err(|e| map_error(e, "clear unique keys"))?;
    for key in &document.unique_keys {
        tx.execute(
            "INSERT INTO document_unique_keys (kind, field, value, document_id) \
             VALUES ($1, $2, $3, $4)",
            &[&document.kind.as_str(), &key.field, &key.value, &id],
        )
        .await
        .map_err(|e| match unique_violation(&e) {
            Some(_) => StoreError::Duplicate {
                kind: document.kind,
                field: key.field.clone(),
                value: key.value.clone(),
            },
            None => map_error(e, "index unique key"),
        })?;
    }
    Ok(())
}

/// Fails if any live document still references one of `removed`
async fn ensure_unreferenced(tx: &Transaction<'_>, removed: &[String]) -> Result<()> {
    let row = tx
        .query_opt(
            "SELECT r.target_id, r.target_kind, r.source_id, d.kind AS source_kind, r.field \
             FROM document_references r JOIN documents d ON d.id = r.source_id \
             WHERE r.target_id = ANY($1) ORDER BY r.source_id, r.field LIMIT 1",
            &[&removed],
        )
        .await
        .map_err(|e| map_error(e, "check remaining references"))?;

    let Some(row) = row else {
        return Ok(());
    };
    let target_id: String = row.get("target_id");
    let target_kind: String = row.get("target_kind");
    let source_id: String = row.get("source_id");
    let source_kind: String = row.get("source_kind");

    Err(StoreError::StillReferenced {
        kind: parse_kind(&target_kind)?,
        id: parse_id(&target_id)?,
        source_kind: parse_kind(&source_kind)?,
        source_id: parse_id(&source_id)?,
        field: row.get("field"),
    }
    .into())
}

#[async_trait]
impl DocumentStore for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn insert(&self, document: StoredDocument) -> Result<()> {
        self.transact(vec![WriteOp::Insert(document)]).await
    }

    async fn get(&self, kind: EntityKind, id: &DocumentId) -> Result<Option<StoredDocument>> {
        let query = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1 AND kind = $2");
        let row = self
            .client
            .query_opt(query.as_str(), &[&id.to_string(), &kind.as_str()])
            .await?;

        row.map(|row| DocumentRow::from_row(&row)?.to_domain())
            .transpose()
    }

    async fn exists(&self, kind: EntityKind, id: &DocumentId) -> Result<bool> {
        let rows = self
            .client
            .query(
                "SELECT EXISTS(SELECT 1 FROM documents WHERE id = $1 AND kind = $2)",
                &[&id.to_string(), &kind.as_str()],
            )
            .await?;

        Ok(rows.first().map(|row| row.get::<_, bool>(0)).unwrap_or(false))
    }

    async fn replace(&self, document: StoredDocument, expected_version: u64) -> Result<()> {
        self.transact(vec![WriteOp::Replace {
            document,
            expected_version,
        }])
        .await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let size = batch.len();
        self.transact(batch.into_iter().collect()).await?;
        tracing::debug!(operations = size, "Committed write batch");
        Ok(())
    }

    async fn referencing(&self, kind: EntityKind, id: &DocumentId) -> Result<Vec<StoredDocument>> {
        let query = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id IN \
             (SELECT source_id FROM document_references WHERE target_id = $1 AND target_kind = $2) \
             ORDER BY id"
        );
        let rows = self
            .client
            .query(query.as_str(), &[&id.to_string(), &kind.as_str()])
            .await?;

        rows.iter()
            .map(|row| DocumentRow::from_row(row)?.to_domain())
            .collect()
    }

    async fn count(&self, kind: EntityKind) -> Result<u64> {
        let rows = self
            .client
            .query(
                "SELECT COUNT(*) FROM documents WHERE kind = $1",
                &[&kind.as_str()],
            )
            .await?;

        let count: i64 = rows.first().map(|row| row.get(0)).unwrap_or(0);
        from_bigint(count)
    }

    fn backend_name(&self) -> &'static str {
        "postgresql"
    }
}

#[async_trait]
impl CounterStore for PostgreSQLAdapter {
    async fn increment(&self, name: &SequenceName) -> Result<Option<u64>> {
        let row = self
            .client
            .query_opt(
                "UPDATE sequences SET value = value + 1, updated_at = NOW() \
                 WHERE name = $1 RETURNING value",
                &[&name.as_str()],
            )
            .await?;

        row.map(|row| from_bigint(row.get("value"))).transpose()
    }

    async fn seed(&self, name: &SequenceName, value: u64) -> Result<bool> {
        let inserted = self
            .client
            .execute(
                "INSERT INTO sequences (name, value) VALUES ($1, $2) \
                 ON CONFLICT (name) DO NOTHING",
                &[&name.as_str(), &to_bigint(value)?],
            )
            .await?;

        Ok(inserted == 1)
    }

    async fn max_existing(&self, kind: EntityKind) -> Result<u64> {
        let rows = self
            .client
            .query(
                "SELECT GREATEST( \
                     COALESCE((SELECT MAX(custom_id) FROM documents WHERE kind = $1), 0), \
                     COALESCE((SELECT MAX(custom_id) FROM tombstones WHERE kind = $1), 0) \
                 )::BIGINT",
                &[&kind.as_str()],
            )
            .await?;

        let max: i64 = rows.first().map(|row| row.get(0)).unwrap_or(0);
        from_bigint(max)
    }

    async fn current(&self, name: &SequenceName) -> Result<Option<u64>> {
        let row = self
            .client
            .query_opt(
                "SELECT value FROM sequences WHERE name = $1",
                &[&name.as_str()],
            )
            .await?;

        row.map(|row| from_bigint(row.get("value"))).transpose()
    }

    async fn counters(&self) -> Result<Vec<(SequenceName, u64)>> {
        let rows = self
            .client
            .query("SELECT name, value FROM sequences ORDER BY name", &[])
            .await?;

        rows.iter()
            .map(|row| {
                let name: String = row.get("name");
                let name = SequenceName::new(name).map_err(CredoError::Serialization)?;
                Ok((name, from_bigint(row.get("value"))?))
            })
            .collect()
    }
}
