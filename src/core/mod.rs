//! Core business logic for Credo.
//!
//! # Modules
//!
//! - [`sequence`] - Race-free custom id allocation
//! - [`graph`] - Entity graph manager: creation, updates, deletes and
//!   referential integrity
//!
//! # Example
//!
//! ```rust,no_run
//! use credo::adapters::database::build_graph_manager;
//! use credo::config::load_config;
//! use credo::domain::models::Address;
//! use credo::domain::Actor;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("credo.toml")?;
//! let manager = build_graph_manager(&config).await?;
//!
//! let address = Address {
//!     street_line1: "1 Main St".to_string(),
//!     street_line2: None,
//!     city: "Springfield".to_string(),
//!     state: "IL".to_string(),
//!     zip_code: "62701".to_string(),
//! };
//! let record = manager.create(address, &Actor::System).await?;
//! println!("Created address {}", record.id);
//! # Ok(())
//! # }
//! ```

pub mod graph;
pub mod sequence;
