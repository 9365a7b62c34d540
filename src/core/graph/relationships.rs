//! Relationship catalog
//!
//! Every reference field of every entity kind, with what deleting its target
//! does to the referencing document. Defaults live in [`DEFAULT_RELATIONSHIPS`];
//! deployments may override the policy per relationship from
//! `[integrity.policies]`.
//!
//! Audit references (`createdBy`, `updatedBy`) are not listed here. They
//! always restrict deletes of the acting user.

use crate::domain::kind::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What happens to a referencing document when its target is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDelete {
    /// The delete fails while the reference exists
    Restrict,
    /// The reference is removed from the referencing document
    Nullify,
    /// The referencing document is deleted too
    Cascade,
}

impl fmt::Display for OnDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OnDelete::Restrict => "restrict",
            OnDelete::Nullify => "nullify",
            OnDelete::Cascade => "cascade",
        };
        f.write_str(name)
    }
}

/// Whether the referencing document belongs to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coupling {
    /// The source exists only as part of the target (associate of a provider)
    Exclusive,
    /// Independent documents that merely point at each other
    Shared,
}

/// One reference field between two kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub source: EntityKind,
    pub field: &'static str,
    pub target: EntityKind,
    pub required: bool,
    pub coupling: Coupling,
    pub on_delete: OnDelete,
}

impl Relationship {
    /// Configuration key, e.g. `Provider.locations`
    pub fn key(&self) -> String {
        format!("{}.{}", self.source, self.field)
    }

    fn check(&self, policy: OnDelete) -> Result<(), String> {
        match policy {
            OnDelete::Nullify if self.required => Err(format!(
                "{} is required and cannot be nullified",
                self.key()
            )),
            OnDelete::Cascade if self.coupling == Coupling::Shared => Err(format!(
                "{} links independent documents and cannot cascade",
                self.key()
            )),
            _ => Ok(()),
        }
    }
}

const fn optional(source: EntityKind, field: &'static str, target: EntityKind) -> Relationship {
    Relationship {
        source,
        field,
        target,
        required: false,
        coupling: Coupling::Shared,
        on_delete: OnDelete::Nullify,
    }
}

const fn required(source: EntityKind, field: &'static str, target: EntityKind) -> Relationship {
    Relationship {
        source,
        field,
        target,
        required: true,
        coupling: Coupling::Shared,
        on_delete: OnDelete::Restrict,
    }
}

const fn exclusive(mut relationship: Relationship) -> Relationship {
    relationship.coupling = Coupling::Exclusive;
    relationship
}

const fn cascading(mut relationship: Relationship) -> Relationship {
    relationship.on_delete = OnDelete::Cascade;
    relationship
}

use EntityKind::{
    Address, BillingAccount, Comment, Payer, PifGroup, PifIndividual, Provider,
    ProviderAssociate, ProviderLocation, Upload, User,
};

/// Built-in relationships and their default delete policies
pub const DEFAULT_RELATIONSHIPS: &[Relationship] = &[
    optional(User, "billingAccount", BillingAccount),
    optional(User, "providers", Provider),
    optional(User, "accessLevels.provider", Provider),
    required(BillingAccount, "address", Address),
    optional(BillingAccount, "providers", Provider),
    required(Payer, "address", Address),
    optional(Payer, "uploads", Upload),
    optional(Payer, "comments", Comment),
    optional(Provider, "billingAccount", BillingAccount),
    required(Provider, "pifGroupOrFacility", PifGroup),
    required(Provider, "pifIndividual", PifIndividual),
    exclusive(optional(Provider, "associateProviders", ProviderAssociate)),
    optional(Provider, "locations", ProviderLocation),
    cascading(exclusive(required(ProviderAssociate, "parentProvider", Provider))),
    required(ProviderAssociate, "pifIndividual", PifIndividual),
    optional(ProviderAssociate, "locations", ProviderLocation),
    required(ProviderLocation, "address", Address),
    optional(PifGroup, "providers", Provider),
    optional(PifGroup, "licenses.uploads", Upload),
    optional(PifGroup, "licenses.comments", Comment),
    optional(PifGroup, "liabilityInsurance.uploads", Upload),
    optional(PifGroup, "liabilityInsurance.comments", Comment),
    optional(PifGroup, "owners.address", Address),
    optional(PifGroup, "owners.homeAddress", Address),
    optional(PifGroup, "owners.uploads", Upload),
    optional(PifGroup, "uploads", Upload),
    optional(PifIndividual, "providers", Provider),
    optional(PifIndividual, "associateProviders", ProviderAssociate),
    optional(PifIndividual, "professionalLicenses.uploads", Upload),
    optional(PifIndividual, "dea.uploads", Upload),
    optional(PifIndividual, "cds.uploads", Upload),
    optional(PifIndividual, "education.uploads", Upload),
    optional(PifIndividual, "professionalTraining.uploads", Upload),
    optional(
        PifIndividual,
        "specialtyAndBoardCertificationDetails.uploads",
        Upload,
    ),
    optional(PifIndividual, "admittingPrivileges.uploads", Upload),
    optional(PifIndividual, "admittingArrangements.uploads", Upload),
    optional(PifIndividual, "uploads", Upload),
];

/// Audit reference fields present on every document
pub const AUDIT_FIELDS: [&str; 2] = ["createdBy", "updatedBy"];

/// Relationships with their effective delete policies
#[derive(Debug, Clone)]
pub struct RelationshipCatalog {
    relationships: Vec<Relationship>,
}

impl Default for RelationshipCatalog {
    fn default() -> Self {
        Self {
            relationships: DEFAULT_RELATIONSHIPS.to_vec(),
        }
    }
}

impl RelationshipCatalog {
    /// Applies `"Kind.field" = policy` overrides to the defaults
    ///
    /// # Errors
    ///
    /// Unknown keys, nullifying a required relationship, and cascading over
    /// a shared one are rejected.
    pub fn with_overrides(overrides: &BTreeMap<String, OnDelete>) -> Result<Self, String> {
        let mut catalog = Self::default();

        for (key, policy) in overrides {
            let relationship = catalog
                .relationships
                .iter_mut()
                .find(|r| r.key() == *key)
                .ok_or_else(|| format!("unknown relationship '{key}'"))?;
            relationship.check(*policy)?;
            relationship.on_delete = *policy;
        }

        Ok(catalog)
    }

    pub fn get(&self, source: EntityKind, field: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|r| r.source == source && r.field == field)
    }

    /// Effective policy for a reference field; audit and unlisted fields restrict
    pub fn policy(&self, source: EntityKind, field: &str) -> OnDelete {
        self.get(source, field)
            .map(|r| r.on_delete)
            .unwrap_or(OnDelete::Restrict)
    }

    /// Whether the field must always hold a reference
    pub fn is_required(&self, source: EntityKind, field: &str) -> bool {
        AUDIT_FIELDS.contains(&field) || self.get(source, field).map_or(true, |r| r.required)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    /// Relationships whose target is `kind`
    pub fn targeting(&self, kind: EntityKind) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(move |r| r.target == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_defaults_obey_policy_rules() {
        for relationship in DEFAULT_RELATIONSHIPS {
            assert!(
                relationship.check(relationship.on_delete).is_ok(),
                "{} has an illegal default",
                relationship.key()
            );
        }
    }

    #[test]
    fn test_keys_are_unique() {
        let keys: HashSet<String> = DEFAULT_RELATIONSHIPS.iter().map(|r| r.key()).collect();
        assert_eq!(keys.len(), DEFAULT_RELATIONSHIPS.len());
    }

    #[test]
    fn test_associate_cascades_from_provider() {
        let catalog = RelationshipCatalog::default();
        let rel = catalog
            .get(EntityKind::ProviderAssociate, "parentProvider")
            .unwrap();
        assert_eq!(rel.on_delete, OnDelete::Cascade);
        assert_eq!(rel.coupling, Coupling::Exclusive);
    }

    #[test]
    fn test_override_applies() {
        let overrides =
            BTreeMap::from([("Provider.locations".to_string(), OnDelete::Restrict)]);
        let catalog = RelationshipCatalog::with_overrides(&overrides).unwrap();
        assert_eq!(
            catalog.policy(EntityKind::Provider, "locations"),
            OnDelete::Restrict
        );
    }

    #[test]
    fn test_nullify_required_rejected() {
        let overrides = BTreeMap::from([("Payer.address".to_string(), OnDelete::Nullify)]);
        let err = RelationshipCatalog::with_overrides(&overrides).unwrap_err();
        assert!(err.contains("Payer.address"));
    }

    #[test]
    fn test_cascade_shared_rejected() {
        let overrides = BTreeMap::from([("Payer.uploads".to_string(), OnDelete::Cascade)]);
        assert!(RelationshipCatalog::with_overrides(&overrides).is_err());
    }

    #[test]
    fn test_audit_fields_always_restrict() {
        let catalog = RelationshipCatalog::default();
        assert_eq!(catalog.policy(EntityKind::Payer, "createdBy"), OnDelete::Restrict);
        assert!(catalog.is_required(EntityKind::Payer, "updatedBy"));
        assert!(!catalog.is_required(EntityKind::Payer, "uploads"));
    }

    #[test]
    fn test_targeting_address() {
        let catalog = RelationshipCatalog::default();
        let sources: Vec<String> = catalog
            .targeting(EntityKind::Address)
            .map(|r| r.key())
            .collect();
        assert!(sources.contains(&"Payer.address".to_string()));
        assert!(sources.contains(&"PifGroup.owners.homeAddress".to_string()));
    }
}
