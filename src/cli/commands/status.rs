//! Status command implementation
//!
//! This module implements the `status` command, which prints the custom id
//! counters and the number of live documents per kind.

use crate::adapters::database::build_graph_manager;
use crate::config::load_config;
use crate::core::graph::GraphManager;
use crate::domain::kind::EntityKind;
use crate::domain::Result;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show this entity kind
    #[arg(long)]
    pub kind: Option<EntityKind>,

    /// Print machine-readable JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Counters and document counts at one point in time
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub backend: &'static str,
    /// Counter value by sequence name
    pub sequences: BTreeMap<String, u64>,
    /// Live documents by kind
    pub documents: BTreeMap<String, u64>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking store status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let manager = match build_graph_manager(&config).await {
            Ok(m) => m,
            Err(e) => {
                println!("❌ Failed to open store");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        let report = match self.collect(&manager).await {
            Ok(r) => r,
            Err(e) => {
                crate::log_error_with_context!(e, "Failed to read store status");
                println!("❌ Failed to read store status");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(0)
    }

    pub async fn collect(&self, manager: &GraphManager) -> Result<StatusReport> {
        let kinds: Vec<EntityKind> = match self.kind {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        };

        let mut sequences = BTreeMap::new();
        for (name, value) in manager.allocator().snapshot().await? {
            let included = EntityKind::for_sequence(&name)
                .map_or(self.kind.is_none(), |kind| kinds.contains(&kind));
            if included {
                sequences.insert(name.to_string(), value);
            }
        }

        let mut documents = BTreeMap::new();
        for kind in kinds {
            documents.insert(kind.to_string(), manager.store().count(kind).await?);
        }

        Ok(StatusReport {
            backend: manager.store().backend_name(),
            sequences,
            documents,
        })
    }
}

fn print_report(report: &StatusReport) {
    println!("📊 Store Status ({})", report.backend);
    println!();

    if report.sequences.is_empty() {
        println!("No sequence counters yet.");
    } else {
        println!("{:<20} {:>12}", "Sequence", "Last Value");
        println!("{}", "-".repeat(33));
        for (name, value) in &report.sequences {
            println!("{name:<20} {value:>12}");
        }
    }
    println!();

    println!("{:<20} {:>12}", "Kind", "Documents");
    println!("{}", "-".repeat(33));
    for (kind, count) in &report.documents {
        println!("{kind:<20} {count:>12}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredoConfig;
    use crate::domain::models::Address;
    use crate::domain::Actor;

    fn address() -> Address {
        Address {
            street_line1: "9 Elm St".to_string(),
            street_line2: None,
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62704".to_string(),
        }
    }

    #[tokio::test]
    async fn test_collect_counts_documents() {
        let manager = build_graph_manager(&CredoConfig::default()).await.unwrap();
        manager.create(address(), &Actor::System).await.unwrap();
        manager.create(address(), &Actor::System).await.unwrap();

        let args = StatusArgs {
            kind: None,
            json: false,
        };
        let report = args.collect(&manager).await.unwrap();

        assert_eq!(report.backend, "memory");
        assert_eq!(report.documents["Address"], 2);
        assert_eq!(report.documents["User"], 0);
        assert!(report.sequences.is_empty());
    }

    #[tokio::test]
    async fn test_collect_filters_by_kind() {
        let manager = build_graph_manager(&CredoConfig::default()).await.unwrap();
        let name = EntityKind::User.sequence().unwrap();
        manager.allocator().next(&name).await.unwrap();

        let args = StatusArgs {
            kind: Some(EntityKind::Payer),
            json: true,
        };
        let report = args.collect(&manager).await.unwrap();

        assert_eq!(report.documents.len(), 1);
        assert!(report.sequences.is_empty());
    }
}
