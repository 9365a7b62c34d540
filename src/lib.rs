// Credo - Provider Credentialing Entity Store
// Copyright (c) 2025 Credo Contributors
// Licensed under the MIT License

//! # Credo - Provider Credentialing Entity Store
//!
//! Credo stores the documents behind provider credentialing: users, payers,
//! billing accounts, providers and the records hanging off them. Every
//! document carries a generated [`domain::DocumentId`]; the sequenced kinds
//! also get a gap-tolerant, never-reused custom id such as `customPayerId`.
//!
//! ## Architecture
//!
//! - [`cli`] - Operator commands (`init`, `validate-config`, `status`)
//! - [`core`] - Sequence allocator and entity graph manager
//! - [`adapters`] - Store backends (memory, PostgreSQL)
//! - [`domain`] - Entity models, ids and the error taxonomy
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
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
//! let address = manager
//!     .create(
//!         Address {
//!             street_line1: "1 Main St".to_string(),
//!             street_line2: None,
//!             city: "Springfield".to_string(),
//!             state: "IL".to_string(),
//!             zip_code: "62701".to_string(),
//!         },
//!         &Actor::System,
//!     )
//!     .await?;
//! println!("stored address {}", address.id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::Result`]. Callers match on
//! [`domain::CredoError`] to tell validation failures, missing references,
//! blocked deletes and version conflicts apart.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
