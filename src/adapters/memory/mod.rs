//! In-memory store backend
//!
//! Backs both [`DocumentStore`](crate::adapters::database::DocumentStore) and
//! [`CounterStore`](crate::adapters::database::CounterStore) with process
//! memory, optionally persisted to a JSON snapshot file.

pub mod store;

pub use store::MemoryStore;
