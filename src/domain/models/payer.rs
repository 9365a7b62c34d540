//! Insurance payers

use super::enums::PayerType;
use crate::domain::entity::{
    detach_all, require_text, trim, trim_opt, Entity, Reference, References,
};
use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payer {
    pub payer_name: String,
    pub payer_type: PayerType,
    pub address: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_fax: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_state: Option<String>,
    /// Free-form values for account-defined custom fields
    #[serde(default)]
    pub custom_field_values: Map<String, Value>,
    #[serde(default)]
    pub uploads: Vec<DocumentId>,
    #[serde(default)]
    pub comments: Vec<DocumentId>,
}

impl Entity for Payer {
    const KIND: EntityKind = EntityKind::Payer;

    fn normalize(&mut self) {
        trim(&mut self.payer_name);
        trim_opt(&mut self.payer_website);
        trim_opt(&mut self.payer_fax);
        trim_opt(&mut self.payer_contact_name);
        trim_opt(&mut self.payer_phone);
        trim_opt(&mut self.payer_state);
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "payerName", &self.payer_name)
    }

    fn references(&self) -> Vec<Reference> {
        References::new()
            .required("address", EntityKind::Address, &self.address)
            .each("uploads", EntityKind::Upload, &self.uploads)
            .each("comments", EntityKind::Comment, &self.comments)
            .build()
    }

    fn detach(&mut self, target: &DocumentId) -> bool {
        detach_all(&mut self.uploads, target) | detach_all(&mut self.comments, target)
    }
}
