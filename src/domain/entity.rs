//! Entity trait and validation helpers
//!
//! Every persisted body type implements [`Entity`]. The trait exposes what
//! the graph manager needs: the kind, trimming, field validation, the
//! outgoing references, and how to drop an optional reference when its
//! target is deleted.

use super::document::{ReferenceEdge, UniqueKey};
use super::errors::CredoError;
use super::ids::DocumentId;
use super::kind::EntityKind;
use super::result::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A typed reference from an entity body to another document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub target: EntityKind,
    pub id: DocumentId,
    pub required: bool,
}

impl Reference {
    pub fn required(field: &'static str, target: EntityKind, id: &DocumentId) -> Self {
        Self {
            field,
            target,
            id: id.clone(),
            required: true,
        }
    }

    pub fn optional(field: &'static str, target: EntityKind, id: &DocumentId) -> Self {
        Self {
            field,
            target,
            id: id.clone(),
            required: false,
        }
    }

    pub fn into_edge(self) -> ReferenceEdge {
        ReferenceEdge {
            field: self.field.to_string(),
            target_kind: self.target,
            target_id: self.id,
        }
    }
}

/// Collects references from an optional id and a list of ids
#[derive(Debug, Default)]
pub struct References(Vec<Reference>);

impl References {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, field: &'static str, target: EntityKind, id: &DocumentId) -> Self {
        self.0.push(Reference::required(field, target, id));
        self
    }

    pub fn optional(
        mut self,
        field: &'static str,
        target: EntityKind,
        id: Option<&DocumentId>,
    ) -> Self {
        if let Some(id) = id {
            self.0.push(Reference::optional(field, target, id));
        }
        self
    }

    pub fn each<'a>(
        mut self,
        field: &'static str,
        target: EntityKind,
        ids: impl IntoIterator<Item = &'a DocumentId>,
    ) -> Self {
        self.0
            .extend(ids.into_iter().map(|id| Reference::optional(field, target, id)));
        self
    }

    pub fn build(self) -> Vec<Reference> {
        self.0
    }
}

/// A persisted entity body
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind stored alongside every document of this type
    const KIND: EntityKind;

    /// Dotted paths of secret fields, left out of the wire form. Arrays along
    /// a path apply to each element.
    const SECRET_FIELDS: &'static [&'static str] = &[];

    /// Trims free-text fields in place
    fn normalize(&mut self) {}

    /// Checks required fields and domain rules
    fn validate(&self) -> Result<()>;

    /// Outgoing references; unset optional fields contribute none
    fn references(&self) -> Vec<Reference>;

    /// Removes optional references to `target`; returns whether anything changed.
    /// Required references are left alone.
    fn detach(&mut self, _target: &DocumentId) -> bool {
        false
    }

    /// Values the store must keep unique per kind
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Fields computed on read, never stored
    fn virtuals(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }
}

// Validation helpers shared by the entity modules.

pub(crate) fn invalid(kind: EntityKind, rule: impl Into<String>) -> CredoError {
    CredoError::validation(kind, rule)
}

pub(crate) fn require_text(kind: EntityKind, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(kind, format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn require_ordered(
    kind: EntityKind,
    field: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(invalid(
                kind,
                format!("{field}: start date {from} is after end date {to}"),
            ));
        }
    }
    Ok(())
}

pub(crate) fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

pub(crate) fn trim_opt(value: &mut Option<String>) {
    if let Some(inner) = value {
        trim(inner);
        if inner.is_empty() {
            *value = None;
        }
    }
}

pub(crate) fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

/// Clears an optional reference pointing at `target`
pub(crate) fn detach_one(slot: &mut Option<DocumentId>, target: &DocumentId) -> bool {
    if slot.as_ref() == Some(target) {
        *slot = None;
        true
    } else {
        false
    }
}

/// Removes `target` from a reference list
pub(crate) fn detach_all(list: &mut Vec<DocumentId>, target: &DocumentId) -> bool {
    let before = list.len();
    list.retain(|id| id != target);
    list.len() != before
}

/// Capitalises the first character and lower-cases the rest
pub(crate) fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
