//! Provider associates: individual practitioners under a group provider

use crate::domain::entity::{detach_all, require_text, trim, Entity, Reference, References};
use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAssociate {
    pub provider_display_name: String,
    pub parent_provider: DocumentId,
    pub pif_individual: DocumentId,
    pub status: bool,
    #[serde(default)]
    pub locations: Vec<DocumentId>,
}

impl Entity for ProviderAssociate {
    const KIND: EntityKind = EntityKind::ProviderAssociate;

    fn normalize(&mut self) {
        trim(&mut self.provider_display_name);
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "providerDisplayName", &self.provider_display_name)
    }

    fn references(&self) -> Vec<Reference> {
        References::new()
            .required("parentProvider", EntityKind::Provider, &self.parent_provider)
            .required("pifIndividual", EntityKind::PifIndividual, &self.pif_individual)
            .each("locations", EntityKind::ProviderLocation, &self.locations)
            .build()
    }

    fn detach(&mut self, target: &DocumentId) -> bool {
        detach_all(&mut self.locations, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_is_required() {
        let result = serde_json::from_value::<ProviderAssociate>(json!({
            "providerDisplayName": "Dr. Chen",
            "parentProvider": "000000000000000000000001",
            "pifIndividual": "000000000000000000000002"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_required_references() {
        let associate: ProviderAssociate = serde_json::from_value(json!({
            "providerDisplayName": "Dr. Chen",
            "parentProvider": "000000000000000000000001",
            "pifIndividual": "000000000000000000000002",
            "status": true,
            "locations": ["000000000000000000000003"]
        }))
        .unwrap();

        let refs = associate.references();
        assert_eq!(refs.len(), 3);
        assert!(refs[0].required && refs[1].required);
        assert!(!refs[2].required);
    }
}
