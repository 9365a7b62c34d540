//! Entity kinds
//!
//! Every persisted document belongs to exactly one [`EntityKind`]. The kind
//! decides whether the document draws a custom id from a sequence, what the
//! custom id field is called on the wire, and whether an acting user is
//! required to create it.

use super::ids::SequenceName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a persisted entity document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    BillingAccount,
    Payer,
    Provider,
    ProviderAssociate,
    ProviderLocation,
    Address,
    PifGroup,
    PifIndividual,
    Upload,
    Comment,
}

impl EntityKind {
    /// All kinds, in dependency-friendly order (leaves last)
    pub const ALL: [EntityKind; 11] = [
        EntityKind::User,
        EntityKind::BillingAccount,
        EntityKind::Payer,
        EntityKind::Provider,
        EntityKind::ProviderAssociate,
        EntityKind::ProviderLocation,
        EntityKind::PifGroup,
        EntityKind::PifIndividual,
        EntityKind::Address,
        EntityKind::Upload,
        EntityKind::Comment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::BillingAccount => "BillingAccount",
            EntityKind::Payer => "Payer",
            EntityKind::Provider => "Provider",
            EntityKind::ProviderAssociate => "ProviderAssociate",
            EntityKind::ProviderLocation => "ProviderLocation",
            EntityKind::Address => "Address",
            EntityKind::PifGroup => "PifGroup",
            EntityKind::PifIndividual => "PifIndividual",
            EntityKind::Upload => "Upload",
            EntityKind::Comment => "Comment",
        }
    }

    /// Name of the counter that mints custom ids for this kind, if any
    pub fn sequence(&self) -> Option<SequenceName> {
        self.sequence_str().map(SequenceName::from_static)
    }

    fn sequence_str(&self) -> Option<&'static str> {
        match self {
            EntityKind::User => Some("user"),
            EntityKind::BillingAccount => Some("billingAccount"),
            EntityKind::Payer => Some("payer"),
            _ => None,
        }
    }

    /// Inverse of [`EntityKind::sequence`]
    pub fn for_sequence(name: &SequenceName) -> Option<EntityKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.sequence_str() == Some(name.as_str()))
    }

    /// Wire name of the custom id field for sequenced kinds
    pub fn custom_id_field(&self) -> Option<&'static str> {
        match self {
            EntityKind::User => Some("customUserId"),
            EntityKind::BillingAccount | EntityKind::Payer => Some("customId"),
            _ => None,
        }
    }

    /// Whether writing a document of this kind requires an acting user.
    ///
    /// Users may be created by the system (sign-up, invitations). Addresses,
    /// attachments and the PIF documents are filled in through onboarding
    /// flows that may have no session user.
    pub fn requires_actor(&self) -> bool {
        matches!(
            self,
            EntityKind::BillingAccount
                | EntityKind::Payer
                | EntityKind::Provider
                | EntityKind::ProviderAssociate
                | EntityKind::ProviderLocation
        )
    }

    /// Shared-by-reference kinds are never removed as a side effect of
    /// deleting a referencing document unless pruning is requested.
    pub fn is_shared(&self) -> bool {
        matches!(
            self,
            EntityKind::Address | EntityKind::Upload | EntityKind::Comment
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown entity kind: {s}"))
    }
}
