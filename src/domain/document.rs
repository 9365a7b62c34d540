//! Untyped stored documents
//!
//! [`StoredDocument`] is what stores persist: the record envelope, the entity
//! body as JSON, and the reference and unique-key indexes derived from the
//! typed entity when it was written. Stores never look inside `body`.

use super::ids::DocumentId;
use super::kind::EntityKind;
use super::record::{Audit, LifecycleState};
use serde::{Deserialize, Serialize};

/// One outgoing reference of a stored document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceEdge {
    /// Field path on the source document, e.g. `address` or `owners.homeAddress`
    pub field: String,
    pub target_kind: EntityKind,
    pub target_id: DocumentId,
}

/// A value that must be unique among documents of the same kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueKey {
    pub field: String,
    pub value: String,
}

/// Envelope and body of a persisted document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub kind: EntityKind,
    pub id: DocumentId,
    pub custom_id: Option<u64>,
    pub version: u64,
    pub state: LifecycleState,
    pub audit: Audit,
    pub body: serde_json::Value,
    #[serde(default)]
    pub references: Vec<ReferenceEdge>,
    #[serde(default)]
    pub unique_keys: Vec<UniqueKey>,
}

impl StoredDocument {
    /// Whether this document holds at least one reference to `target`
    pub fn references_id(&self, target: &DocumentId) -> bool {
        self.references.iter().any(|edge| &edge.target_id == target)
    }

    /// Reference fields of this document that point at `target`
    pub fn fields_referencing<'a>(
        &'a self,
        target: &'a DocumentId,
    ) -> impl Iterator<Item = &'a ReferenceEdge> + 'a {
        self.references
            .iter()
            .filter(move |edge| &edge.target_id == target)
    }
}
