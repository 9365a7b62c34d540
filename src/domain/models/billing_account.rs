//! Billing accounts

use super::enums::BillingAccountPlan;
use crate::config::SecretString;
use crate::domain::document::UniqueKey;
use crate::domain::entity::{detach_all, invalid, require_text, trim, Entity, Reference, References};
use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::result::Result;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One column of the account's agile board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub value: String,
    pub label: String,
}

impl BoardStatus {
    fn new(value: &str, label: &str) -> Self {
        Self {
            id: None,
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// Board columns every new account starts with
pub fn default_board_statuses() -> Vec<BoardStatus> {
    vec![
        BoardStatus::new("toDo", "To-Do"),
        BoardStatus::new("inProcess", "In progress"),
        BoardStatus::new("blocked", "Blocked"),
        BoardStatus::new("done", "Done"),
    ]
}

/// The paying customer that owns providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAccount {
    pub billing_account_name: String,
    pub address: DocumentId,
    #[serde(default)]
    pub providers: Vec<DocumentId>,
    pub secure_credential_key: SecretString,
    #[serde(default = "default_board_statuses")]
    pub agile_board_status_list: Vec<BoardStatus>,
    pub current_plan: BillingAccountPlan,
    pub current_plan_due: DateTime<Utc>,
}

impl Entity for BillingAccount {
    const KIND: EntityKind = EntityKind::BillingAccount;
    const SECRET_FIELDS: &'static [&'static str] = &["secureCredentialKey"];

    fn normalize(&mut self) {
        trim(&mut self.billing_account_name);
        for status in &mut self.agile_board_status_list {
            trim(&mut status.value);
            trim(&mut status.label);
        }
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "billingAccountName", &self.billing_account_name)?;

        if self.secure_credential_key.expose_secret().is_empty() {
            return Err(invalid(Self::KIND, "secureCredentialKey is required"));
        }

        let mut values = HashSet::new();
        for status in &self.agile_board_status_list {
            require_text(Self::KIND, "agileBoardStatusList.value", &status.value)?;
            require_text(Self::KIND, "agileBoardStatusList.label", &status.label)?;
            if !values.insert(status.value.as_str()) {
                return Err(invalid(
                    Self::KIND,
                    format!("agileBoardStatusList has duplicate value '{}'", status.value),
                ));
            }
        }

        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        References::new()
            .required("address", EntityKind::Address, &self.address)
            .each("providers", EntityKind::Provider, &self.providers)
            .build()
    }

    fn detach(&mut self, target: &DocumentId) -> bool {
        detach_all(&mut self.providers, target)
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey {
            field: "billingAccountName".to_string(),
            value: self.billing_account_name.clone(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> serde_json::Value {
        json!({
            "billingAccountName": "  Northwind Clinics ",
            "address": "65f1c2a4b7e3d90012ab34cd",
            "secureCredentialKey": "s3cr3t",
            "currentPlan": "trail",
            "currentPlanDue": "2026-01-31T00:00:00Z"
        })
    }

    #[test]
    fn test_default_board_statuses_applied() {
        let account: BillingAccount = serde_json::from_value(payload()).unwrap();
        let values: Vec<&str> = account
            .agile_board_status_list
            .iter()
            .map(|s| s.value.as_str())
            .collect();
        assert_eq!(values, vec!["toDo", "inProcess", "blocked", "done"]);
        assert_eq!(account.current_plan, BillingAccountPlan::Trial);
    }

    #[test]
    fn test_normalize_and_validate() {
        let mut account: BillingAccount = serde_json::from_value(payload()).unwrap();
        account.normalize();
        assert_eq!(account.billing_account_name, "Northwind Clinics");
        assert!(account.validate().is_ok());
    }

    #[test]
    fn test_duplicate_board_values_rejected() {
        let mut value = payload();
        value["agileBoardStatusList"] = json!([
            {"value": "todo", "label": "To-Do"},
            {"value": "todo", "label": "Also to-do"}
        ]);
        let account: BillingAccount = serde_json::from_value(value).unwrap();
        let err = account.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate value 'todo'"));
    }

    #[test]
    fn test_empty_secure_key_rejected() {
        let mut value = payload();
        value["secureCredentialKey"] = json!("");
        let account: BillingAccount = serde_json::from_value(value).unwrap();
        assert!(account.validate().is_err());
    }

    #[test]
    fn test_missing_address_rejected_on_deserialize() {
        let mut value = payload();
        value.as_object_mut().unwrap().remove("address");
        assert!(serde_json::from_value::<BillingAccount>(value).is_err());
    }

    #[test]
    fn test_address_reference_is_required() {
        let account: BillingAccount = serde_json::from_value(payload()).unwrap();
        let refs = account.references();
        assert_eq!(refs.len(), 1);
        assert!(refs[0].required);
        assert_eq!(refs[0].target, EntityKind::Address);
    }
}
