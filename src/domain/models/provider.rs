//! Providers and their PIF link
//!
//! A provider's account type decides which information form it links:
//! `group` and `groupWithoutAssociateProviders` accounts reference a
//! [`PifGroup`](super::PifGroup), `individual` accounts a
//! [`PifIndividual`](super::PifIndividual). Exactly one link is set.

use super::enums::ProviderAccountType;
use crate::domain::entity::{
    detach_all, detach_one, invalid, require_text, trim, Entity, Reference, References,
};
use crate::domain::ids::DocumentId;
use crate::domain::kind::EntityKind;
use crate::domain::result::Result;
use serde::{Deserialize, Serialize};

/// The information form a provider is linked to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PifLink {
    Group(DocumentId),
    Individual(DocumentId),
}

impl PifLink {
    pub fn kind(&self) -> EntityKind {
        match self {
            PifLink::Group(_) => EntityKind::PifGroup,
            PifLink::Individual(_) => EntityKind::PifIndividual,
        }
    }

    pub fn id(&self) -> &DocumentId {
        match self {
            PifLink::Group(id) | PifLink::Individual(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub provider_display_name: String,
    pub provider_account_type: ProviderAccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_account: Option<DocumentId>,
    #[serde(default)]
    pub associate_providers: Vec<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pif_group_or_facility: Option<DocumentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pif_individual: Option<DocumentId>,
    #[serde(default)]
    pub multiple_locations: bool,
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(default)]
    pub locations: Vec<DocumentId>,
}

fn default_status() -> bool {
    true
}

impl Provider {
    /// Resolves the PIF link demanded by the account type
    ///
    /// Fails when the matching link is missing or when the other link is
    /// also set.
    pub fn pif_link(&self) -> Result<PifLink> {
        let account_type = self.provider_account_type;
        match (
            account_type.is_group(),
            &self.pif_group_or_facility,
            &self.pif_individual,
        ) {
            (true, Some(group), None) => Ok(PifLink::Group(group.clone())),
            (false, None, Some(individual)) => Ok(PifLink::Individual(individual.clone())),
            (_, Some(_), Some(_)) => Err(invalid(
                Self::KIND,
                "pifGroupOrFacility and pifIndividual cannot both be set",
            )),
            (true, _, _) => Err(invalid(
                Self::KIND,
                format!("providerAccountType '{account_type}' requires pifGroupOrFacility"),
            )),
            (false, _, _) => Err(invalid(
                Self::KIND,
                format!("providerAccountType '{account_type}' requires pifIndividual"),
            )),
        }
    }
}

impl Entity for Provider {
    const KIND: EntityKind = EntityKind::Provider;

    fn normalize(&mut self) {
        trim(&mut self.provider_display_name);
    }

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "providerDisplayName", &self.provider_display_name)?;
        self.pif_link()?;

        if self.provider_account_type == ProviderAccountType::GroupWithoutAssociateProviders
            && !self.associate_providers.is_empty()
        {
            return Err(invalid(
                Self::KIND,
                "groupWithoutAssociateProviders accounts cannot list associateProviders",
            ));
        }

        Ok(())
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = References::new().optional(
            "billingAccount",
            EntityKind::BillingAccount,
            self.billing_account.as_ref(),
        );
        if let Some(group) = &self.pif_group_or_facility {
            refs = refs.required("pifGroupOrFacility", EntityKind::PifGroup, group);
        }
        if let Some(individual) = &self.pif_individual {
            refs = refs.required("pifIndividual", EntityKind::PifIndividual, individual);
        }
        refs.each(
            "associateProviders",
            EntityKind::ProviderAssociate,
            &self.associate_providers,
        )
        .each("locations", EntityKind::ProviderLocation, &self.locations)
        .build()
    }

    fn detach(&mut self, target: &DocumentId) -> bool {
        detach_one(&mut self.billing_account, target)
            | detach_all(&mut self.associate_providers, target)
            | detach_all(&mut self.locations, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn id(n: u8) -> DocumentId {
        DocumentId::new(format!("{n:024x}")).unwrap()
    }

    fn provider(
        account_type: ProviderAccountType,
        group: Option<u8>,
        individual: Option<u8>,
    ) -> Provider {
        Provider {
            provider_display_name: "Lakeside Family Practice".to_string(),
            provider_account_type: account_type,
            billing_account: None,
            associate_providers: Vec::new(),
            pif_group_or_facility: group.map(id),
            pif_individual: individual.map(id),
            multiple_locations: false,
            status: true,
            locations: Vec::new(),
        }
    }

    #[test_case(ProviderAccountType::Group, Some(1), None, Some(EntityKind::PifGroup) ; "group with group pif")]
    #[test_case(ProviderAccountType::GroupWithoutAssociateProviders, Some(1), None, Some(EntityKind::PifGroup) ; "solo group with group pif")]
    #[test_case(ProviderAccountType::Individual, None, Some(2), Some(EntityKind::PifIndividual) ; "individual with individual pif")]
    #[test_case(ProviderAccountType::Group, None, Some(2), None ; "group with individual pif")]
    #[test_case(ProviderAccountType::Individual, Some(1), None, None ; "individual with group pif")]
    #[test_case(ProviderAccountType::Group, Some(1), Some(2), None ; "both links")]
    #[test_case(ProviderAccountType::Individual, None, None, None ; "no links")]
    fn test_pif_link_matrix(
        account_type: ProviderAccountType,
        group: Option<u8>,
        individual: Option<u8>,
        expected: Option<EntityKind>,
    ) {
        let result = provider(account_type, group, individual).pif_link();
        match expected {
            Some(kind) => assert_eq!(result.unwrap().kind(), kind),
            None => assert!(result.is_err()),
        }
    }

    #[test]
    fn test_group_without_associates_rejects_associates() {
        let mut provider = provider(ProviderAccountType::GroupWithoutAssociateProviders, Some(1), None);
        provider.associate_providers.push(id(5));
        assert!(provider.validate().is_err());

        provider.provider_account_type = ProviderAccountType::Group;
        assert!(provider.validate().is_ok());
    }

    #[test]
    fn test_defaults_on_deserialize() {
        let provider: Provider = serde_json::from_value(serde_json::json!({
            "providerDisplayName": "Dr. Rivera",
            "providerAccountType": "individual",
            "pifIndividual": "000000000000000000000002"
        }))
        .unwrap();
        assert!(provider.status);
        assert!(!provider.multiple_locations);
    }

    #[test]
    fn test_pif_link_is_not_detachable() {
        let mut provider = provider(ProviderAccountType::Group, Some(1), None);
        provider.locations = vec![id(7)];
        assert!(!provider.detach(&id(1)));
        assert!(provider.pif_group_or_facility.is_some());
        assert!(provider.detach(&id(7)));
        assert!(provider.locations.is_empty());
    }
}
