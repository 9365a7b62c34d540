//! Persisted record envelope
//!
//! A [`Record`] wraps a typed entity body with its identity, custom id,
//! version, lifecycle state and audit stamps.

use super::document::{ReferenceEdge, StoredDocument};
use super::entity::Entity;
use super::errors::CredoError;
use super::ids::DocumentId;
use super::kind::EntityKind;
use super::result::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;

/// Lifecycle of an entity document
///
/// `Draft` bodies have been validated but not stored. `Deleted` is terminal;
/// stores keep a tombstone so a deleted id is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Draft,
    Persisted,
    Updated,
    Deleted,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Draft => "draft",
            LifecycleState::Persisted => "persisted",
            LifecycleState::Updated => "updated",
            LifecycleState::Deleted => "deleted",
        }
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "draft" => Ok(LifecycleState::Draft),
            "persisted" => Ok(LifecycleState::Persisted),
            "updated" => Ok(LifecycleState::Updated),
            "deleted" => Ok(LifecycleState::Deleted),
            other => Err(format!("Unknown lifecycle state: {other}")),
        }
    }
}

/// Who performs a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// An existing user, recorded in the audit stamps
    User(DocumentId),
    /// Internal writes with no acting user (sign-up, migrations)
    System,
}

impl Actor {
    pub fn user_id(&self) -> Option<&DocumentId> {
        match self {
            Actor::User(id) => Some(id),
            Actor::System => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{id}"),
            Actor::System => write!(f, "system"),
        }
    }
}

/// Audit stamps; `created_at <= updated_at` always holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub created_by: Option<DocumentId>,
    pub updated_by: Option<DocumentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    /// Stamps a new document
    pub fn stamp(actor: &Actor, now: DateTime<Utc>) -> Self {
        Self {
            created_by: actor.user_id().cloned(),
            updated_by: actor.user_id().cloned(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refreshes the update stamp, never moving `updated_at` before `created_at`
    pub fn touch(&mut self, actor: &Actor, now: DateTime<Utc>) {
        self.updated_by = actor.user_id().cloned();
        self.updated_at = now.max(self.created_at);
    }

    /// Audit references to users, indexed like body references
    pub fn edges(&self) -> Vec<ReferenceEdge> {
        [("createdBy", &self.created_by), ("updatedBy", &self.updated_by)]
            .into_iter()
            .filter_map(|(field, user)| {
                user.as_ref().map(|id| ReferenceEdge {
                    field: field.to_string(),
                    target_kind: EntityKind::User,
                    target_id: id.clone(),
                })
            })
            .collect()
    }
}

/// Typed persisted entity
#[derive(Debug, Clone)]
pub struct Record<E> {
    pub id: DocumentId,
    pub custom_id: Option<u64>,
    pub version: u64,
    pub state: LifecycleState,
    pub audit: Audit,
    pub body: E,
}

impl<E: Entity> Record<E> {
    /// Converts to the untyped form stores persist, deriving the reference
    /// and unique-key indexes from the body.
    pub fn to_stored(&self) -> Result<StoredDocument> {
        let body = serde_json::to_value(&self.body)?;

        let mut seen = HashSet::new();
        let references = self
            .body
            .references()
            .into_iter()
            .map(|reference| reference.into_edge())
            .chain(self.audit.edges())
            .filter(|edge| seen.insert(edge.clone()))
            .collect();

        Ok(StoredDocument {
            kind: E::KIND,
            id: self.id.clone(),
            custom_id: self.custom_id,
            version: self.version,
            state: self.state,
            audit: self.audit.clone(),
            body,
            references,
            unique_keys: self.body.unique_keys(),
        })
    }

    /// Rebuilds a typed record from a stored document
    pub fn from_stored(document: StoredDocument) -> Result<Self> {
        if document.kind != E::KIND {
            return Err(CredoError::Serialization(format!(
                "Document {} is a {}, not a {}",
                document.id,
                document.kind,
                E::KIND
            )));
        }

        let body: E = serde_json::from_value(document.body)?;
        Ok(Self {
            id: document.id,
            custom_id: document.custom_id,
            version: document.version,
            state: document.state,
            audit: document.audit,
            body,
        })
    }

    /// Wire representation: body fields plus envelope fields and virtuals
    ///
    /// Secret fields are omitted; [`Record::to_stored`] keeps them.
    pub fn to_json(&self) -> Result<Value> {
        let mut value = serde_json::to_value(&self.body)?;
        for path in E::SECRET_FIELDS {
            let segments: Vec<&str> = path.split('.').collect();
            strip_field(&mut value, &segments);
        }
        let Value::Object(map) = &mut value else {
            return Err(CredoError::Serialization(format!(
                "{} body did not serialize to an object",
                E::KIND
            )));
        };

        map.insert("id".to_string(), json!(self.id));
        if let (Some(field), Some(custom_id)) = (E::KIND.custom_id_field(), self.custom_id) {
            map.insert(field.to_string(), json!(custom_id));
        }
        map.insert("version".to_string(), json!(self.version));
        map.insert("state".to_string(), json!(self.state));
        map.insert("createdBy".to_string(), json!(self.audit.created_by));
        map.insert("updatedBy".to_string(), json!(self.audit.updated_by));
        map.insert("createdAt".to_string(), json!(self.audit.created_at));
        map.insert("updatedAt".to_string(), json!(self.audit.updated_at));
        for (name, virtual_value) in self.body.virtuals() {
            map.insert(name.to_string(), virtual_value);
        }

        Ok(value)
    }
}

fn strip_field(value: &mut Value, path: &[&str]) {
    match value {
        Value::Array(items) => {
            for item in items {
                strip_field(item, path);
            }
        }
        Value::Object(map) => match path {
            [] => {}
            [last] => {
                map.remove(*last);
            }
            [head, rest @ ..] => {
                if let Some(child) = map.get_mut(*head) {
                    strip_field(child, rest);
                }
            }
        },
        _ => {}
    }
}
