//! PostgreSQL storage backend
//!
//! Documents live in one `documents` table with JSONB bodies. Outgoing
//! references and unique keys are indexed in side tables that the
//! integrity checks query; custom id counters live in `sequences`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use models::DocumentRow;
