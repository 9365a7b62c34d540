//! Domain models and types for Credo.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`DocumentId`], [`SequenceName`])
//! - **Entity kinds** ([`EntityKind`]) and the [`Entity`] trait every body implements
//! - **Entity models** ([`models`]) for users, billing accounts, payers,
//!   providers, locations, addresses, attachments and the PIF forms
//! - **Record envelope** ([`Record`]) with custom id, version, lifecycle and audit
//! - **Error types** ([`CredoError`], [`StoreError`]) and the [`Result`] alias
//!
//! # Example
//!
//! ```rust
//! use credo::domain::models::{Address, PifLink, Provider, ProviderAccountType};
//! use credo::domain::{DocumentId, Entity};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut address = Address {
//!     street_line1: " 100 Lake Rd ".to_string(),
//!     street_line2: None,
//!     city: "Madison".to_string(),
//!     state: "WI".to_string(),
//!     zip_code: "53703".to_string(),
//! };
//! address.normalize();
//! address.validate()?;
//!
//! let provider = Provider {
//!     provider_display_name: "Lakeside".to_string(),
//!     provider_account_type: ProviderAccountType::Group,
//!     billing_account: None,
//!     associate_providers: vec![],
//!     pif_group_or_facility: Some(DocumentId::generate()),
//!     pif_individual: None,
//!     multiple_locations: false,
//!     status: true,
//!     locations: vec![],
//! };
//! assert!(matches!(provider.pif_link()?, PifLink::Group(_)));
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod entity;
pub mod errors;
pub mod ids;
pub mod kind;
pub mod models;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use document::{ReferenceEdge, StoredDocument, UniqueKey};
pub use entity::{Entity, Reference};
pub use errors::{Blocker, CredoError, StoreError};
pub use ids::{DocumentId, SequenceName};
pub use kind::EntityKind;
pub use record::{Actor, Audit, LifecycleState, Record};
pub use result::Result;
