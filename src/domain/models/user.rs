//! User accounts

use super::enums::{AccessLevel, LoginMethod, UserType};
use crate::config::SecretString;
use crate::domain::document::UniqueKey;
use crate::domain::entity::{
    capitalize, detach_all, detach_one, invalid, looks_like_email, require_text, trim, trim_opt,
    Entity, Reference, References,
};
use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Per-provider access grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub provider: DocumentId,
    pub access_level: AccessLevel,
}

/// A person who signs in to the system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub contact_phone: String,
    pub email: String,
    #[serde(default)]
    pub login_method: LoginMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretString>,
    #[serde(default = "default_email_notification")]
    pub email_notification: bool,
    pub user_type: UserType,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_group_provider_tab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_associate_provider_tab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_account: Option<DocumentId>,
    #[serde(default)]
    pub providers: Vec<DocumentId>,
    #[serde(default)]
    pub access_levels: Vec<AccessGrant>,
}

fn default_email_notification() -> bool {
    true
}

impl User {
    /// First and last name, each capitalised
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            capitalize(&self.first_name),
            capitalize(&self.last_name)
        )
    }

    /// Access level granted on `provider`, if any
    pub fn access_to(&self, provider: &DocumentId) -> Option<AccessLevel> {
        self.access_levels
            .iter()
            .find(|grant| &grant.provider == provider)
            .map(|grant| grant.access_level)
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;
    const SECRET_FIELDS: &'static [&'static str] = &["password"];

    fn normalize(&mut self) {
        trim(&mut self.first_name);
        trim(&mut self.last_name);
        trim(&mut self.contact_phone);
        trim(&mut self.email);
        trim_opt(&mut self.avatar_url);
        trim_opt(&mut self.designation);
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "firstName", &self.first_name)?;
        require_text(Self::KIND, "lastName", &self.last_name)?;
        require_text(Self::KIND, "contactPhone", &self.contact_phone)?;
        require_text(Self::KIND, "email", &self.email)?;

        if !looks_like_email(&self.email) {
            return Err(invalid(
                Self::KIND,
                format!("email '{}' is not a valid address", self.email),
            ));
        }

        if self.permissions.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid(Self::KIND, "permissions cannot contain blank entries"));
        }

        let mut granted = HashSet::new();
        for grant in &self.access_levels {
            if !granted.insert(&grant.provider) {
                return Err(invalid(
                    Self::KIND,
                    format!("accessLevels has more than one grant for provider {}", grant.provider),
                ));
            }
        }

        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        References::new()
            .optional(
                "billingAccount",
                EntityKind::BillingAccount,
                self.billing_account.as_ref(),
            )
            .each("providers", EntityKind::Provider, &self.providers)
            .each(
                "accessLevels.provider",
                EntityKind::Provider,
                self.access_levels.iter().map(|grant| &grant.provider),
            )
            .build()
    }

    fn detach(&mut self, target: &DocumentId) -> bool {
        let before = self.access_levels.len();
        self.access_levels.retain(|grant| &grant.provider != target);
        let grants = self.access_levels.len() != before;

        detach_one(&mut self.billing_account, target)
            | detach_all(&mut self.providers, target)
            | grants
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey {
            field: "email".to_string(),
            value: self.email.to_lowercase(),
        }]
    }

    fn virtuals(&self) -> Vec<(&'static str, Value)> {
        vec![("displayName", Value::String(self.display_name()))]
    }
}
