//! Entity models
//!
//! One module per document kind. Wire names are camelCase and match the
//! stored documents; legacy field names are accepted as serde aliases.

pub mod associate;
pub mod attachment;
pub mod billing_account;
pub mod common;
pub mod enums;
pub mod location;
pub mod payer;
pub mod pif_group;
pub mod pif_individual;
pub mod provider;
pub mod user;

pub use associate::ProviderAssociate;
pub use attachment::{Comment, Upload};
pub use billing_account::{default_board_statuses, BillingAccount, BoardStatus};
pub use common::{MonthRange, PostalAddress};
pub use enums::{
    AccessLevel, BillingAccountPlan, LoginMethod, OwnershipType, PayerType, ProviderAccountType,
    UserType,
};
pub use location::{Address, ProviderLocation};
pub use payer::Payer;
pub use pif_group::{BankInformation, GroupLicense, LiabilityInsurance, Ownership, PifGroup};
pub use pif_individual::PifIndividual;
pub use provider::{PifLink, Provider};
pub use user::{AccessGrant, User};
