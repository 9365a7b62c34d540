//! Store abstraction layer
//!
//! Trait-based abstraction over the storage backends, so the allocator and
//! graph manager work unchanged on the in-memory store and on PostgreSQL.

pub mod factory;
pub mod traits;

pub use factory::{build_graph_manager, create_stores};
pub use traits::{CounterStore, DocumentStore, WriteBatch, WriteOp};
