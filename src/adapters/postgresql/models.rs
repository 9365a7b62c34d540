//! PostgreSQL row models
//!
//! Conversions between [`StoredDocument`] and rows of the `documents` table.
//! Ids and enums are stored as text, counters and versions as BIGINT.

use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::record::{Audit, LifecycleState};
use crate::domain::{CredoError, ReferenceEdge, Result, StoredDocument, UniqueKey};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_postgres::Row;

/// Columns selected for every document query, in [`DocumentRow`] order
pub const DOCUMENT_COLUMNS: &str = "id, kind, custom_id, version, state, created_by, \
     updated_by, created_at, updated_at, body, refs, unique_keys";

/// One row of the `documents` table
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: String,
    pub kind: String,
    pub custom_id: Option<i64>,
    pub version: i64,
    pub state: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: Value,
    pub refs: Value,
    pub unique_keys: Value,
}

impl DocumentRow {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: read(row, "id")?,
            kind: read(row, "kind")?,
            custom_id: read(row, "custom_id")?,
            version: read(row, "version")?,
            state: read(row, "state")?,
            created_by: read(row, "created_by")?,
            updated_by: read(row, "updated_by")?,
            created_at: read(row, "created_at")?,
            updated_at: read(row, "updated_at")?,
            body: read(row, "body")?,
            refs: read(row, "refs")?,
            unique_keys: read(row, "unique_keys")?,
        })
    }

    pub fn from_domain(document: &StoredDocument) -> Result<Self> {
        Ok(Self {
            id: document.id.to_string(),
            kind: document.kind.as_str().to_string(),
            custom_id: document.custom_id.map(to_bigint).transpose()?,
            version: to_bigint(document.version)?,
            state: document.state.as_str().to_string(),
            created_by: document.audit.created_by.as_ref().map(ToString::to_string),
            updated_by: document.audit.updated_by.as_ref().map(ToString::to_string),
            created_at: document.audit.created_at,
            updated_at: document.audit.updated_at,
            body: document.body.clone(),
            refs: serde_json::to_value(&document.references)?,
            unique_keys: serde_json::to_value(&document.unique_keys)?,
        })
    }

    pub fn to_domain(self) -> Result<StoredDocument> {
        let references: Vec<ReferenceEdge> = serde_json::from_value(self.refs)?;
        let unique_keys: Vec<UniqueKey> = serde_json::from_value(self.unique_keys)?;

        Ok(StoredDocument {
            kind: parse_kind(&self.kind)?,
            id: parse_id(&self.id)?,
            custom_id: self.custom_id.map(from_bigint).transpose()?,
            version: from_bigint(self.version)?,
            state: self
                .state
                .parse::<LifecycleState>()
                .map_err(CredoError::Serialization)?,
            audit: Audit {
                created_by: self.created_by.as_deref().map(parse_id).transpose()?,
                updated_by: self.updated_by.as_deref().map(parse_id).transpose()?,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            body: self.body,
            references,
            unique_keys,
        })
    }
}

fn read<'a, T>(row: &'a Row, column: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(column)
        .map_err(|e| CredoError::Serialization(format!("Column '{column}': {e}")))
}

pub fn parse_kind(value: &str) -> Result<EntityKind> {
    value.parse().map_err(CredoError::Serialization)
}

pub fn parse_id(value: &str) -> Result<DocumentId> {
    DocumentId::new(value.trim()).map_err(CredoError::Serialization)
}

pub fn to_bigint(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| CredoError::Serialization(format!("{value} does not fit in BIGINT")))
}

pub fn from_bigint(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| CredoError::Serialization(format!("negative value {value} in BIGINT column")))
}
