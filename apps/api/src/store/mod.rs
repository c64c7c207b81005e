//! Row store: the single seam between the service and the hosted tables.
//!
//! The hosted backend is treated purely as a row store: every table supports
//! select-all, insert, update-by-id and delete-by-column. No joins run
//! server-side; cross-table correlation happens in the stores above this layer.
//!
//! `AppState` carries an `Arc<dyn RowStore>`, chosen at startup from config.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::StoreSettings;

pub mod memory;
pub mod postgres;
pub mod rest;

pub use memory::MemoryRowStore;
pub use postgres::PgRowStore;
pub use rest::RestRowStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid column name '{0}'")]
    InvalidColumn(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Items,
    Jobs,
    JobCombine,
    JobCombineItems,
    Categories,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Items => "items",
            Table::Jobs => "jobs",
            Table::JobCombine => "jobCombine",
            Table::JobCombineItems => "jobCombineItems",
            Table::Categories => "categories",
        }
    }
}

#[async_trait]
pub trait RowStore: Send + Sync {
    /// Short label used in logs.
    fn backend(&self) -> &'static str;

    async fn select_all(&self, table: Table) -> Result<Vec<Value>, StoreError>;

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<(), StoreError>;

    /// Applies the keys of a JSON object to the row with the given id.
    async fn update_by_id(&self, table: Table, id: i64, patch: Value) -> Result<(), StoreError>;

    async fn delete_where(&self, table: Table, column: &str, value: i64) -> Result<(), StoreError>;

    async fn delete_by_id(&self, table: Table, id: i64) -> Result<(), StoreError> {
        self.delete_where(table, "id", id).await
    }
}

/// Builds the configured backend. Fails when the backend cannot be reached at startup.
pub async fn build_row_store(settings: &StoreSettings) -> anyhow::Result<Arc<dyn RowStore>> {
    let store: Arc<dyn RowStore> = match settings {
        StoreSettings::Rest { url, key } => Arc::new(RestRowStore::new(url.clone(), key.clone())?),
        StoreSettings::Postgres { database_url } => Arc::new(PgRowStore::connect(database_url).await?),
        StoreSettings::Memory => Arc::new(MemoryRowStore::new()),
    };
    info!("Row store backend: {}", store.backend());
    Ok(store)
}

// ────────────────────────────────────────────────────────────────────────────
// Typed helpers
// ────────────────────────────────────────────────────────────────────────────

/// Reads a whole table into typed rows. Rows that do not decode are skipped with a warning.
pub async fn fetch_rows<T: DeserializeOwned>(
    store: &dyn RowStore,
    table: Table,
) -> Result<Vec<T>, StoreError> {
    let rows = store.select_all(table).await?;
    Ok(decode_rows(table, rows))
}

pub fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            serde_json::from_value(row)
                .map_err(|e| warn!("Skipping malformed {} row {}: {}", table.name(), id, e))
                .ok()
        })
        .collect()
}

pub async fn insert_rows<T: Serialize>(
    store: &dyn RowStore,
    table: Table,
    rows: &[T],
) -> Result<(), StoreError> {
    let values = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    store.insert(table, values).await
}

pub async fn update_row<P: Serialize>(
    store: &dyn RowStore,
    table: Table,
    id: i64,
    patch: &P,
) -> Result<(), StoreError> {
    store.update_by_id(table, id, serde_json::to_value(patch)?).await
}

// ────────────────────────────────────────────────────────────────────────────
// Id generation
// ────────────────────────────────────────────────────────────────────────────

/// Time-based row ids (epoch milliseconds). Ids handed out by one clock are
/// strictly increasing; two processes creating rows in the same millisecond
/// can still collide.
#[derive(Debug, Default)]
pub struct IdClock {
    last: AtomicI64,
}

impl IdClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> i64 {
        self.reserve(1)
    }

    /// Reserves `count` consecutive ids and returns the first.
    pub fn reserve(&self, count: usize) -> i64 {
        let count = count.max(1) as i64;
        let now = Utc::now().timestamp_millis();
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let first = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                first + count - 1,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return first,
                Err(actual) => current = actual,
            }
        }
    }
}

// Local row caches are plain data; a panic mid-update leaves nothing half-built
// that a later reader could not handle, so poisoning is ignored.
pub(crate) fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_clock_is_strictly_increasing() {
        let clock = IdClock::new();
        let a = clock.next_id();
        let b = clock.next_id();
        assert!(b > a);
    }

    #[test]
    fn test_reserve_hands_out_consecutive_block() {
        let clock = IdClock::new();
        let first = clock.reserve(4);
        let after = clock.next_id();
        assert!(after >= first + 4);
    }

    #[test]
    fn test_decode_rows_skips_malformed() {
        #[derive(serde::Deserialize)]
        struct Row {
            id: i64,
        }
        let rows = vec![json!({ "id": 1 }), json!({ "id": "x" }), json!({ "id": 3 })];
        let decoded: Vec<Row> = decode_rows(Table::Items, rows);
        assert_eq!(decoded.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_table_names_match_hosted_schema() {
        assert_eq!(Table::JobCombine.name(), "jobCombine");
        assert_eq!(Table::JobCombineItems.name(), "jobCombineItems");
    }
}
