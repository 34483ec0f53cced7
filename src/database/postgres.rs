//! PostgreSQL database backend implementation
//!
//! Provides a PostgreSQL backend for server deployments. Rows are stored as
//! JSONB bodies, one table per [`StoreTable`].

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_postgres::Client;
use tokio_postgres::types::ToSql;
use tracing::{debug, warn};

use super::schema::{DatabaseSchema, SCHEMA_VERSION, body_sql};
use super::{
    DatabaseBackend, DatabaseError, DatabaseResult, FindCriteria, QueryRow, StoreTable,
    UnitOfWork, row_id,
};

/// PostgreSQL database backend
///
/// A unit of work holds the client exclusively until it is released, so
/// transactions from different units never interleave on the connection.
#[derive(Clone)]
pub struct PostgresBackend {
    connection_string: String,
    client: Arc<Mutex<Client>>,
}

impl PostgresBackend {
    /// Open a connection and drive it on a background task
    pub async fn new(connection_string: &str) -> DatabaseResult<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, tokio_postgres::NoTls)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(format!("PostgreSQL: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection closed with error");
            }
        });
        debug!("connected to PostgreSQL");

        Ok(Self {
            connection_string: connection_string.to_string(),
            client: Arc::new(Mutex::new(client)),
        })
    }

    /// Connection string with the password replaced by `****`
    pub fn connection_string_masked(&self) -> String {
        mask_password(&self.connection_string)
    }
}

fn mask_password(url: &str) -> String {
    let Some(at) = url.rfind('@') else {
        return url.to_string();
    };
    let authority_start = url.find("://").map_or(0, |i| i + 3);
    match url[authority_start..at].find(':') {
        Some(colon) => {
            let password_start = authority_start + colon + 1;
            format!("{}****{}", &url[..password_start], &url[at..])
        }
        None => url.to_string(),
    }
}

async fn select_rows(
    client: &Client,
    table: StoreTable,
    criteria: &FindCriteria,
) -> DatabaseResult<Vec<QueryRow>> {
    let params: [&(dyn ToSql + Sync); 4] = [
        &criteria.user_id,
        &criteria.organization_id,
        &criteria.kind,
        &criteria.ids,
    ];
    let rows = client
        .query(&body_sql::select(table), &params)
        .await
        .map_err(|e| DatabaseError::QueryFailed(format!("Failed to query {}: {}", table, e)))?;

    rows.iter()
        .map(|row| {
            row.try_get::<_, serde_json::Value>(0).map_err(|e| {
                DatabaseError::SerializationError(format!("Invalid body in {}: {}", table, e))
            })
        })
        .collect()
}

fn text_field(row: &QueryRow, name: &str) -> Option<String> {
    row.get(name).and_then(|v| v.as_str()).map(str::to_string)
}

#[async_trait(?Send)]
impl DatabaseBackend for PostgresBackend {
    type Unit = PostgresUnitOfWork;

    async fn initialize(&self) -> DatabaseResult<()> {
        let client = self.client.lock().await;

        client
            .batch_execute(&DatabaseSchema::create_tables_sql())
            .await
            .map_err(|e| {
                DatabaseError::MigrationFailed(format!("Failed to create tables: {}", e))
            })?;

        client
            .batch_execute(&DatabaseSchema::create_indexes_sql())
            .await
            .map_err(|e| {
                DatabaseError::MigrationFailed(format!("Failed to create indexes: {}", e))
            })?;

        client
            .execute(DatabaseSchema::record_schema_version_sql(), &[&SCHEMA_VERSION])
            .await
            .map_err(|e| {
                DatabaseError::MigrationFailed(format!("Failed to record schema version: {}", e))
            })?;

        Ok(())
    }

    async fn find(
        &self,
        table: StoreTable,
        criteria: &FindCriteria,
    ) -> DatabaseResult<Vec<QueryRow>> {
        let client = self.client.lock().await;
        select_rows(&client, table, criteria).await
    }

    async fn connect(&self) -> DatabaseResult<PostgresUnitOfWork> {
        let client = self.client.clone().lock_owned().await;
        Ok(PostgresUnitOfWork {
            client: Some(client),
            in_transaction: false,
        })
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        let client = self.client.lock().await;
        let rows = client
            .query("SELECT 1 as healthy", &[])
            .await
            .map_err(|e| DatabaseError::QueryFailed(format!("Health check failed: {}", e)))?;
        Ok(!rows.is_empty())
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn close(&self) -> DatabaseResult<()> {
        // The connection is closed when the client is dropped
        Ok(())
    }
}

/// Unit of work holding the PostgreSQL client
pub struct PostgresUnitOfWork {
    client: Option<OwnedMutexGuard<Client>>,
    in_transaction: bool,
}

impl PostgresUnitOfWork {
    fn client(&self) -> DatabaseResult<&Client> {
        self.client.as_deref().ok_or_else(|| {
            DatabaseError::TransactionFailed("unit of work already released".to_string())
        })
    }

    async fn execute_control(&mut self, statement: &str) -> DatabaseResult<()> {
        self.client()?
            .batch_execute(statement)
            .await
            .map_err(|e| DatabaseError::TransactionFailed(format!("{} failed: {}", statement, e)))
    }
}

#[async_trait(?Send)]
impl UnitOfWork for PostgresUnitOfWork {
    async fn start_transaction(&mut self) -> DatabaseResult<()> {
        self.execute_control("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn lock_organization(&mut self, organization_id: &str) -> DatabaseResult<()> {
        if !self.in_transaction {
            return Err(DatabaseError::TransactionFailed(
                "organization lock requires an open transaction".to_string(),
            ));
        }
        self.client()?
            .execute(body_sql::LOCK_ORGANIZATION, &[&organization_id])
            .await
            .map_err(|e| {
                DatabaseError::TransactionFailed(format!(
                    "Failed to lock organization {}: {}",
                    organization_id, e
                ))
            })?;
        debug!(organization_id, "acquired organization advisory lock");
        Ok(())
    }

    async fn find(
        &mut self,
        table: StoreTable,
        criteria: &FindCriteria,
    ) -> DatabaseResult<Vec<QueryRow>> {
        select_rows(self.client()?, table, criteria).await
    }

    async fn save(&mut self, table: StoreTable, rows: &[QueryRow]) -> DatabaseResult<usize> {
        let client = self.client()?;
        let sql = body_sql::upsert(table);
        let statement = client
            .prepare(&sql)
            .await
            .map_err(|e| DatabaseError::SaveFailed(format!("Failed to prepare {}: {}", table, e)))?;

        for row in rows {
            let id = row_id(row)?;
            client
                .execute(
                    &statement,
                    &[
                        &id,
                        &text_field(row, "userId"),
                        &text_field(row, "organizationId"),
                        &text_field(row, "type"),
                        row,
                    ],
                )
                .await
                .map_err(|e| {
                    DatabaseError::SaveFailed(format!("Failed to save {} {}: {}", table, id, e))
                })?;
        }
        Ok(rows.len())
    }

    async fn commit(&mut self) -> DatabaseResult<()> {
        self.execute_control("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> DatabaseResult<()> {
        self.execute_control("ROLLBACK").await?;
        self.in_transaction = false;
        Ok(())
    }

    async fn release(&mut self) {
        if self.in_transaction {
            if let Err(e) = self.rollback().await {
                warn!("Failed to discard open transaction on release: {}", e);
            }
        }
        self.client = None;
    }
}
