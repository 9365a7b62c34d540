//! JSON merge patches for entity bodies
//!
//! Updates from the wire are RFC 7386 merge patches: objects merge
//! recursively, `null` removes a field, anything else replaces it. Envelope
//! fields are owned by the store and cannot be written through a payload.

use crate::domain::errors::CredoError;
use crate::domain::kind::EntityKind;
use crate::domain::Result;
use serde_json::Value;

/// Fields set by the manager, never by callers
pub const RESERVED_FIELDS: [&str; 9] = [
    "id",
    "customId",
    "customUserId",
    "version",
    "state",
    "createdAt",
    "createdBy",
    "updatedAt",
    "updatedBy",
];

/// Rejects payloads that are not objects or that touch reserved fields
pub fn ensure_writable(kind: EntityKind, payload: &Value) -> Result<()> {
    let Value::Object(map) = payload else {
        return Err(CredoError::validation(kind, "payload must be a JSON object"));
    };

    let mut reserved: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|key| RESERVED_FIELDS.contains(key))
        .collect();
    if reserved.is_empty() {
        return Ok(());
    }

    reserved.sort_unstable();
    Err(CredoError::validation(
        kind,
        format!("{} cannot be set by callers", reserved.join(", ")),
    ))
}

/// Applies `patch` to `target` in place
pub fn merge(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_replaces_and_removes() {
        let mut doc = json!({"payerName": "Medicare", "payerFax": "555", "address": "a"});
        merge(&mut doc, &json!({"payerName": "Medicaid", "payerFax": null}));
        assert_eq!(doc, json!({"payerName": "Medicaid", "address": "a"}));
    }

    #[test]
    fn test_merge_nested_objects() {
        let mut doc = json!({"bankInformation": {"bankName": "First", "routingNumber": "1"}});
        merge(&mut doc, &json!({"bankInformation": {"bankName": "Second"}}));
        assert_eq!(
            doc,
            json!({"bankInformation": {"bankName": "Second", "routingNumber": "1"}})
        );
    }

    #[test]
    fn test_merge_arrays_are_replaced() {
        let mut doc = json!({"uploads": ["a", "b"]});
        merge(&mut doc, &json!({"uploads": ["c"]}));
        assert_eq!(doc, json!({"uploads": ["c"]}));
    }

    #[test]
    fn test_reserved_fields_rejected() {
        let err = ensure_writable(EntityKind::User, &json!({"customUserId": 9, "version": 3}))
            .unwrap_err();
        assert!(err.to_string().contains("customUserId, version"));
        assert!(ensure_writable(EntityKind::User, &json!({"firstName": "Ada"})).is_ok());
    }

    #[test]
    fn test_non_object_payload_rejected() {
        assert!(ensure_writable(EntityKind::Payer, &json!([1, 2])).is_err());
    }
}
