//! In-memory database backend
//!
//! Keeps every table in process memory behind async locks. Units of work
//! stage their writes and apply them on commit, so a failed import leaves
//! nothing behind. Clones share the same store.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{
    DatabaseBackend, DatabaseError, DatabaseResult, FindCriteria, QueryRow, StoreTable,
    UnitOfWork, row_id,
};

type Tables = HashMap<StoreTable, Vec<QueryRow>>;

#[derive(Default)]
struct Shared {
    tables: Mutex<Tables>,
    org_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    failing_tables: Mutex<HashSet<StoreTable>>,
    open_units: AtomicUsize,
}

/// Process-local backend
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    shared: Arc<Shared>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert committed rows directly, bypassing any unit of work
    pub async fn seed(&self, table: StoreTable, rows: Vec<QueryRow>) -> DatabaseResult<()> {
        let mut tables = self.shared.tables.lock().await;
        let stored = tables.entry(table).or_default();
        for row in rows {
            upsert(stored, row)?;
        }
        Ok(())
    }

    /// Make every later save into `table` fail
    pub async fn fail_saves_for(&self, table: StoreTable) {
        self.shared.failing_tables.lock().await.insert(table);
    }

    /// Number of units of work connected but not yet released
    pub fn open_units(&self) -> usize {
        self.shared.open_units.load(Ordering::SeqCst)
    }

    /// Committed row count for a table
    pub async fn row_count(&self, table: StoreTable) -> usize {
        self.shared
            .tables
            .lock()
            .await
            .get(&table)
            .map_or(0, Vec::len)
    }

    async fn org_lock(&self, organization_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.shared.org_locks.lock().await;
        locks
            .entry(organization_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn upsert(rows: &mut Vec<QueryRow>, row: QueryRow) -> DatabaseResult<()> {
    let id = row_id(&row)?.to_string();
    match rows
        .iter_mut()
        .find(|existing| existing.get("id").and_then(|v| v.as_str()) == Some(id.as_str()))
    {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
    Ok(())
}

fn select(rows: Option<&Vec<QueryRow>>, criteria: &FindCriteria) -> Vec<QueryRow> {
    rows.map(|rows| {
        rows.iter()
            .filter(|row| criteria.matches(row))
            .cloned()
            .collect()
    })
    .unwrap_or_default()
}

#[async_trait(?Send)]
impl DatabaseBackend for InMemoryBackend {
    type Unit = InMemoryUnitOfWork;

    async fn initialize(&self) -> DatabaseResult<()> {
        let mut tables = self.shared.tables.lock().await;
        for table in StoreTable::ALL {
            tables.entry(table).or_default();
        }
        Ok(())
    }

    async fn find(
        &self,
        table: StoreTable,
        criteria: &FindCriteria,
    ) -> DatabaseResult<Vec<QueryRow>> {
        let tables = self.shared.tables.lock().await;
        Ok(select(tables.get(&table), criteria))
    }

    async fn connect(&self) -> DatabaseResult<InMemoryUnitOfWork> {
        self.shared.open_units.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryUnitOfWork {
            backend: self.clone(),
            staged: None,
            org_guard: None,
            released: false,
        })
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(true)
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn close(&self) -> DatabaseResult<()> {
        Ok(())
    }
}

/// Unit of work over an [`InMemoryBackend`]
pub struct InMemoryUnitOfWork {
    backend: InMemoryBackend,
    /// Pending writes while a transaction is open
    staged: Option<Tables>,
    org_guard: Option<OwnedMutexGuard<()>>,
    released: bool,
}

impl InMemoryUnitOfWork {
    fn ensure_open(&self) -> DatabaseResult<()> {
        if self.released {
            return Err(DatabaseError::TransactionFailed(
                "unit of work already released".to_string(),
            ));
        }
        Ok(())
    }

    fn end_transaction(&mut self) {
        self.staged = None;
        self.org_guard = None;
    }
}

#[async_trait(?Send)]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn start_transaction(&mut self) -> DatabaseResult<()> {
        self.ensure_open()?;
        if self.staged.is_some() {
            return Err(DatabaseError::TransactionFailed(
                "transaction already started".to_string(),
            ));
        }
        self.staged = Some(Tables::new());
        Ok(())
    }

    async fn lock_organization(&mut self, organization_id: &str) -> DatabaseResult<()> {
        self.ensure_open()?;
        if self.staged.is_none() {
            return Err(DatabaseError::TransactionFailed(
                "organization lock requires an open transaction".to_string(),
            ));
        }
        let lock = self.backend.org_lock(organization_id).await;
        self.org_guard = Some(lock.lock_owned().await);
        debug!(organization_id, "acquired organization lock");
        Ok(())
    }

    async fn find(
        &mut self,
        table: StoreTable,
        criteria: &FindCriteria,
    ) -> DatabaseResult<Vec<QueryRow>> {
        self.ensure_open()?;
        let tables = self.backend.shared.tables.lock().await;
        let mut rows = tables.get(&table).cloned().unwrap_or_default();
        if let Some(staged) = self.staged.as_ref().and_then(|s| s.get(&table)) {
            for row in staged {
                upsert(&mut rows, row.clone())?;
            }
        }
        Ok(select(Some(&rows), criteria))
    }

    async fn save(&mut self, table: StoreTable, rows: &[QueryRow]) -> DatabaseResult<usize> {
        self.ensure_open()?;
        if self.backend.shared.failing_tables.lock().await.contains(&table) {
            return Err(DatabaseError::SaveFailed(format!(
                "injected failure saving {}",
                table
            )));
        }
        match self.staged.as_mut() {
            Some(staged) => {
                let pending = staged.entry(table).or_default();
                for row in rows {
                    upsert(pending, row.clone())?;
                }
            }
            None => {
                let mut tables = self.backend.shared.tables.lock().await;
                let stored = tables.entry(table).or_default();
                for row in rows {
                    upsert(stored, row.clone())?;
                }
            }
        }
        Ok(rows.len())
    }

    async fn commit(&mut self) -> DatabaseResult<()> {
        self.ensure_open()?;
        let staged = self.staged.take().ok_or_else(|| {
            DatabaseError::TransactionFailed("no transaction to commit".to_string())
        })?;
        {
            let mut tables = self.backend.shared.tables.lock().await;
            for table in StoreTable::ALL {
                if let Some(rows) = staged.get(&table) {
                    let stored = tables.entry(table).or_default();
                    for row in rows {
                        upsert(stored, row.clone())?;
                    }
                }
            }
        }
        self.end_transaction();
        Ok(())
    }

    async fn rollback(&mut self) -> DatabaseResult<()> {
        self.ensure_open()?;
        if self.staged.is_none() {
            return Err(DatabaseError::TransactionFailed(
                "no transaction to roll back".to_string(),
            ));
        }
        self.end_transaction();
        Ok(())
    }

    async fn release(&mut self) {
        if self.released {
            return;
        }
        self.end_transaction();
        self.released = true;
        self.backend.shared.open_units.fetch_sub(1, Ordering::SeqCst);
    }
}
