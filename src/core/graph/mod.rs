//! Entity graph management
//!
//! - [`manager`] - create, read, update and delete with reference checks
//! - [`delete`] - delete planning over the reference graph
//! - [`relationships`] - reference fields and their delete policies
//! - [`patch`] - JSON merge patches and reserved envelope fields

pub mod delete;
pub mod manager;
pub mod patch;
pub mod relationships;
mod registry;

pub use delete::{AffectedDocument, DeleteOptions, DeleteReport};
pub use manager::GraphManager;
pub use relationships::{Coupling, OnDelete, Relationship, RelationshipCatalog};
