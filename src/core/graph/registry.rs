//! Dispatch from an [`EntityKind`] to its typed body
//!
//! Stores deal in untyped documents. Where the manager has only a kind at
//! hand (JSON payloads, documents found while planning a delete), these
//! helpers pick the concrete [`Entity`] type and work on the typed record.

use crate::domain::ids::DocumentId;
use crate::domain::record::{Actor, LifecycleState, Record};
use crate::domain::{Entity, Result, StoredDocument};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeSet;

/// Binds `$ty` to the body type of `$kind` and evaluates `$body`
macro_rules! with_entity {
    ($kind:expr, $ty:ident => $body:expr) => {{
        use $crate::domain::kind::EntityKind as K;
        use $crate::domain::models as m;
        match $kind {
            K::User => {
                type $ty = m::User;
                $body
            }
            K::BillingAccount => {
                type $ty = m::BillingAccount;
                $body
            }
            K::Payer => {
                type $ty = m::Payer;
                $body
            }
            K::Provider => {
                type $ty = m::Provider;
                $body
            }
            K::ProviderAssociate => {
                type $ty = m::ProviderAssociate;
                $body
            }
            K::ProviderLocation => {
                type $ty = m::ProviderLocation;
                $body
            }
            K::Address => {
                type $ty = m::Address;
                $body
            }
            K::PifGroup => {
                type $ty = m::PifGroup;
                $body
            }
            K::PifIndividual => {
                type $ty = m::PifIndividual;
                $body
            }
            K::Upload => {
                type $ty = m::Upload;
                $body
            }
            K::Comment => {
                type $ty = m::Comment;
                $body
            }
        }
    }};
}

pub(crate) use with_entity;

/// Wire representation of a stored document
pub(crate) fn to_json(document: StoredDocument) -> Result<Value> {
    with_entity!(document.kind, E => Record::<E>::from_stored(document)?.to_json())
}

/// Drops the optional references to `targets` from `document`, bumping its
/// version and update stamp
pub(crate) fn detach(
    document: &StoredDocument,
    targets: &BTreeSet<DocumentId>,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<StoredDocument> {
    with_entity!(document.kind, E => detach_typed::<E>(document, targets, actor, now))
}

fn detach_typed<E: Entity>(
    document: &StoredDocument,
    targets: &BTreeSet<DocumentId>,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<StoredDocument> {
    let mut record = Record::<E>::from_stored(document.clone())?;
    for target in targets {
        record.body.detach(target);
    }
    record.version += 1;
    record.state = LifecycleState::Updated;
    record.audit.touch(actor, now);
    record.to_stored()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::kind::EntityKind;
    use crate::domain::models::Payer;
    use crate::domain::record::Audit;
    use serde_json::json;

    fn payer_document(upload: &DocumentId) -> StoredDocument {
        let body: Payer = serde_json::from_value(json!({
            "payerName": "Aetna",
            "payerType": "commercial",
            "address": "65f1c2a4b7e3d90012ab34cd",
            "uploads": [upload]
        }))
        .unwrap();
        Record {
            id: DocumentId::generate(),
            custom_id: Some(4),
            version: 2,
            state: LifecycleState::Persisted,
            audit: Audit::stamp(&Actor::System, Utc::now()),
            body,
        }
        .to_stored()
        .unwrap()
    }

    #[test]
    fn test_detach_removes_edge_and_bumps_version() {
        let upload = DocumentId::generate();
        let document = payer_document(&upload);
        assert!(document.references_id(&upload));

        let targets = BTreeSet::from([upload.clone()]);
        let updated = detach(&document, &targets, &Actor::System, Utc::now()).unwrap();

        assert!(!updated.references_id(&upload));
        assert_eq!(updated.version, 3);
        assert_eq!(updated.state, LifecycleState::Updated);
        assert_eq!(updated.custom_id, Some(4));
    }

    #[test]
    fn test_to_json_includes_envelope() {
        let document = payer_document(&DocumentId::generate());
        let id = document.id.clone();
        let value = to_json(document).unwrap();

        assert_eq!(value["id"], json!(id));
        assert_eq!(value["customId"], json!(4));
        assert_eq!(value["payerName"], json!("Aetna"));
        assert_eq!(value["state"], json!("persisted"));
    }

    #[test]
    fn test_body_must_match_kind() {
        let mut document = payer_document(&DocumentId::generate());
        document.kind = EntityKind::Comment;
        assert!(to_json(document).is_err());
    }
}
