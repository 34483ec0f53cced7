//! Persistence boundary for the export/import engine
//!
//! This module provides the storage abstraction the engines run against:
//! - In-memory: always available, transactional staging, used by tests and
//!   the CLI tree command
//! - PostgreSQL: for server deployments, JSONB row bodies
//!
//! Rows cross the boundary as JSON values, one physical table per
//! [`StoreTable`]. Typed entities are (de)serialized by the engines.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[cfg(feature = "postgres-backend")]
pub mod postgres;

pub mod config;
pub mod memory;
pub mod schema;

#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresBackend;

pub use crate::models::StoreTable;
pub use config::{AgentflowConfig, DatabaseBackendType};
pub use memory::InMemoryBackend;
pub use schema::DatabaseSchema;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Saving rows failed
    #[error("Save failed: {0}")]
    SaveFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// One stored row as a JSON object
pub type QueryRow = serde_json::Value;

/// Row filter. Every field that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindCriteria {
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
    /// Restrict to these primary ids
    pub ids: Option<Vec<String>>,
    /// Match the row's `type` column
    pub kind: Option<String>,
}

impl FindCriteria {
    /// Rows owned by an organization
    pub fn organization(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: Some(organization_id.into()),
            ..Default::default()
        }
    }

    /// Rows owned by a user inside an organization
    pub fn tenant(user_id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            organization_id: Some(organization_id.into()),
            ..Default::default()
        }
    }

    /// Rows with one of the given ids, regardless of owner
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Evaluate the filter against a row body
    pub fn matches(&self, row: &QueryRow) -> bool {
        let field = |name: &str| row.get(name).and_then(|v| v.as_str());

        if let Some(user_id) = &self.user_id
            && field("userId") != Some(user_id.as_str())
        {
            return false;
        }
        if let Some(organization_id) = &self.organization_id
            && field("organizationId") != Some(organization_id.as_str())
        {
            return false;
        }
        if let Some(kind) = &self.kind
            && field("type") != Some(kind.as_str())
        {
            return false;
        }
        if let Some(ids) = &self.ids {
            return field("id").is_some_and(|id| ids.iter().any(|candidate| candidate == id));
        }
        true
    }
}

/// Primary id of a row body
pub fn row_id(row: &QueryRow) -> DatabaseResult<&str> {
    row.get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DatabaseError::InvalidInput("row is missing a string id".to_string()))
}

/// Storage backend.
///
/// All operations are async; implementations are not required to be `Send`.
#[async_trait(?Send)]
pub trait DatabaseBackend {
    type Unit: UnitOfWork;

    /// Create tables and indexes if they don't exist
    async fn initialize(&self) -> DatabaseResult<()>;

    /// Read committed rows from a table
    async fn find(&self, table: StoreTable, criteria: &FindCriteria)
    -> DatabaseResult<Vec<QueryRow>>;

    /// Open a unit of work. The caller must `release` it on every exit path.
    async fn connect(&self) -> DatabaseResult<Self::Unit>;

    async fn health_check(&self) -> DatabaseResult<bool>;

    /// Backend type string ("memory" or "postgres")
    fn backend_type(&self) -> &'static str;

    async fn close(&self) -> DatabaseResult<()>;
}

/// Transactional scope for an import.
///
/// Reads through a unit of work see its own uncommitted writes.
#[async_trait(?Send)]
pub trait UnitOfWork {
    async fn start_transaction(&mut self) -> DatabaseResult<()>;

    /// Serialize writers into one organization until the transaction ends.
    async fn lock_organization(&mut self, organization_id: &str) -> DatabaseResult<()> {
        let _ = organization_id;
        Ok(())
    }

    async fn find(
        &mut self,
        table: StoreTable,
        criteria: &FindCriteria,
    ) -> DatabaseResult<Vec<QueryRow>>;

    /// The subset of `ids` already present in `table`
    async fn existing_ids(
        &mut self,
        table: StoreTable,
        ids: &[String],
    ) -> DatabaseResult<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows = self.find(table, &FindCriteria::ids(ids.iter().cloned())).await?;
        rows.iter()
            .map(|row| row_id(row).map(str::to_string))
            .collect()
    }

    /// Insert or replace rows by id. Returns the number of rows written.
    async fn save(&mut self, table: StoreTable, rows: &[QueryRow]) -> DatabaseResult<usize>;

    async fn commit(&mut self) -> DatabaseResult<()>;

    async fn rollback(&mut self) -> DatabaseResult<()>;

    /// Give the underlying resources back. An open transaction is discarded.
    async fn release(&mut self);
}
