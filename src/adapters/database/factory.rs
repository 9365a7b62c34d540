//! Store factory
//!
//! Builds the configured backend and wires the sequence allocator and graph
//! manager on top of it.

use crate::adapters::database::traits::{CounterStore, DocumentStore};
use crate::adapters::memory::MemoryStore;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::{CredoConfig, DatabaseTarget};
use crate::core::graph::GraphManager;
use crate::core::sequence::SequenceAllocator;
use crate::domain::{CredoError, Result};
use std::sync::Arc;

/// Create the document and counter stores named by `database_target`
///
/// Both trait objects share one backend instance, so they see the same
/// documents and counters.
///
/// # Errors
///
/// Returns an error if the target's section is missing or the backend
/// cannot be opened.
pub async fn create_stores(
    config: &CredoConfig,
) -> Result<(Arc<dyn DocumentStore>, Arc<dyn CounterStore>)> {
    match config.database_target {
        DatabaseTarget::Memory => {
            let store = match &config.memory.snapshot_path {
                Some(path) => {
                    tracing::info!(path = %path.display(), "Opening memory store with snapshot");
                    MemoryStore::open(path)?
                }
                None => {
                    tracing::info!("Creating ephemeral memory store");
                    MemoryStore::new()
                }
            };
            let store = Arc::new(store);

            Ok((
                store.clone() as Arc<dyn DocumentStore>,
                store as Arc<dyn CounterStore>,
            ))
        }
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                CredoError::Configuration(
                    "database_target is postgresql but [postgresql] is missing".to_string(),
                )
            })?;

            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            tracing::info!(
                server = %client.connection_string_safe(),
                "Creating PostgreSQL stores"
            );
            let adapter = Arc::new(PostgreSQLAdapter::new(client));

            Ok((
                adapter.clone() as Arc<dyn DocumentStore>,
                adapter as Arc<dyn CounterStore>,
            ))
        }
    }
}

/// Opens the configured stores, applies the schema and builds a graph manager
pub async fn build_graph_manager(config: &CredoConfig) -> Result<GraphManager> {
    let catalog = config
        .integrity
        .catalog()
        .map_err(CredoError::Configuration)?;

    let (documents, counters) = create_stores(config).await?;
    documents.ensure_schema().await?;

    let allocator = Arc::new(SequenceAllocator::new(counters, &config.sequences));
    Ok(GraphManager::new(documents, allocator, catalog))
}
