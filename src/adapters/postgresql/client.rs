//! PostgreSQL client implementation
//!
//! Connection pooling, schema setup and error mapping. Queries that span
//! several statements run on a single pooled connection inside a
//! transaction; see [`PostgreSQLClient::connection`].

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{CredoError, Result, StoreError};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

/// PostgreSQL client for Credo
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// No connection is opened until the first query.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the connection string cannot be parsed
    /// or the pool cannot be built.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .parse()
            .map_err(|e| {
                CredoError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| {
                CredoError::Configuration(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| map_error(e, "connection test"))?;

        tracing::info!(
            server = %self.connection_string_safe(),
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Runs the schema migration; every statement is idempotent
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.connection().await?;
        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");

        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| map_error(e, "schema migration"))?;

        tracing::info!("PostgreSQL schema initialized successfully");
        Ok(())
    }

    /// Get a pooled connection with the configured statement timeout applied
    pub async fn connection(&self) -> Result<Object> {
        let client = self.pool.get().await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to get connection from pool: {e}"))
        })?;

        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client
            .batch_execute(&timeout_query)
            .await
            .map_err(|e| map_error(e, "set statement timeout"))?;

        Ok(client)
    }

    pub async fn query(&self, query: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.connection().await?;
        client
            .query(query, params)
            .await
            .map_err(|e| map_error(e, "query").into())
    }

    pub async fn query_opt(
        &self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>> {
        let client = self.connection().await?;
        client
            .query_opt(query, params)
            .await
            .map_err(|e| map_error(e, "query").into())
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(&self, statement: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client = self.connection().await?;
        client
            .execute(statement, params)
            .await
            .map_err(|e| map_error(e, "statement").into())
    }

    /// Get the connection string (without credentials)
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_ref())
    }

    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

/// Replaces everything before the host with `***`
pub fn redact_connection_string(connection_string: &str) -> String {
    connection_string
        .rsplit_once('@')
        .map(|(_, host)| format!("postgresql://***@{host}"))
        .unwrap_or_else(|| "postgresql://***".to_string())
}

/// Maps a driver error to a backend-neutral store error
///
/// Lost connections, deadlocks and serialization failures are reported as
/// [`StoreError::Unavailable`] so callers may retry them.
pub(crate) fn map_error(error: tokio_postgres::Error, context: &str) -> StoreError {
    let transient = error.is_closed()
        || matches!(
            error.code(),
            Some(code) if *code == SqlState::T_R_DEADLOCK_DETECTED
                || *code == SqlState::T_R_SERIALIZATION_FAILURE
                || *code == SqlState::ADMIN_SHUTDOWN
                || *code == SqlState::CANNOT_CONNECT_NOW
        )
        || error.as_db_error().is_none();

    if transient {
        StoreError::Unavailable(format!("{context}: {error}"))
    } else {
        StoreError::Query(format!("{context}: {error}"))
    }
}

/// Name of the constraint a unique violation hit, if that is what `error` is
pub(crate) fn unique_violation(error: &tokio_postgres::Error) -> Option<String> {
    if error.code() != Some(&SqlState::UNIQUE_VIOLATION) {
        return None;
    }
    error
        .as_db_error()
        .and_then(|db| db.constraint())
        .map(str::to_string)
}
