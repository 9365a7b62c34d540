//! Storage backends for Credo.
//!
//! - [`database`] - Store traits and the backend factory
//! - [`memory`] - In-process store with an optional JSON snapshot file
//! - [`postgresql`] - PostgreSQL store
//!
//! # Design Pattern
//!
//! Adapters isolate the backends behind the
//! [`DocumentStore`](database::DocumentStore) and
//! [`CounterStore`](database::CounterStore) traits. The factory picks one from
//! configuration and hands out `Arc` trait objects:
//!
//! ```rust,no_run
//! use credo::adapters::database::create_stores;
//! use credo::config::CredoConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CredoConfig::default();
//! let (documents, counters) = create_stores(&config).await?;
//! documents.test_connection().await?;
//! println!("{:?}", counters.counters().await?);
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
