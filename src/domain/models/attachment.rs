//! Uploaded files and comments, attached by reference

use crate::domain::entity::{require_text, trim, trim_opt, Entity, Reference};
use crate::domain::kind::EntityKind;
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};

/// Metadata of an uploaded file; the bytes live in object storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub storage_key: String,
}

impl Entity for Upload {
    const KIND: EntityKind = EntityKind::Upload;

    fn normalize(&mut self) {
        trim(&mut self.file_name);
        trim_opt(&mut self.content_type);
        trim(&mut self.storage_key);
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "fileName", &self.file_name)?;
        require_text(Self::KIND, "storageKey", &self.storage_key)
    }

    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub body: String,
}

impl Entity for Comment {
    const KIND: EntityKind = EntityKind::Comment;

    fn normalize(&mut self) {
        trim(&mut self.body);
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "body", &self.body)
    }

    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }
}
