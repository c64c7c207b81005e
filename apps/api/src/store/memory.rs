//! In-process row store for local development (`STORE_BACKEND=memory`) and tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use super::{read_guard, write_guard, RowStore, StoreError, Table};

#[derive(Debug, Default)]
pub struct MemoryRowStore {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_inserts: RwLock<HashSet<Table>>,
    writes: AtomicUsize,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, table: Table, rows: Vec<Value>) {
        write_guard(&self.tables).entry(table).or_default().extend(rows);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        read_guard(&self.tables)
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of successful insert/update/delete calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_inserts_into(&self, table: Table) {
        write_guard(&self.failing_inserts).insert(table);
    }

    fn check_write(&self, table: Table) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "write to {} rejected",
                table.name()
            )));
        }
        Ok(())
    }
}

fn row_matches(row: &Value, column: &str, value: i64) -> bool {
    row.get(column).and_then(Value::as_i64) == Some(value)
}

#[async_trait]
impl RowStore for MemoryRowStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn select_all(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "read of {} rejected",
                table.name()
            )));
        }
        Ok(self.rows(table))
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<(), StoreError> {
        self.check_write(table)?;
        if read_guard(&self.failing_inserts).contains(&table) {
            return Err(StoreError::Unavailable(format!(
                "insert into {} rejected",
                table.name()
            )));
        }
        write_guard(&self.tables).entry(table).or_default().extend(rows);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_by_id(&self, table: Table, id: i64, patch: Value) -> Result<(), StoreError> {
        self.check_write(table)?;
        let Value::Object(fields) = patch else {
            return Err(StoreError::Unavailable("patch must be a JSON object".into()));
        };
        let mut tables = write_guard(&self.tables);
        if let Some(row) = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| row_matches(r, "id", id)))
        {
            if let Value::Object(existing) = row {
                existing.extend(fields);
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_where(&self, table: Table, column: &str, value: i64) -> Result<(), StoreError> {
        self.check_write(table)?;
        if let Some(rows) = write_guard(&self.tables).get_mut(&table) {
            rows.retain(|r| !row_matches(r, column, value));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryRowStore::new();
        store.seed(Table::Items, vec![json!({ "id": 1, "name": "a", "price": 1.0 })]);
        store
            .update_by_id(Table::Items, 1, json!({ "name": "b" }))
            .await
            .unwrap();
        assert_eq!(store.rows(Table::Items), vec![json!({ "id": 1, "name": "b", "price": 1.0 })]);
    }

    #[tokio::test]
    async fn test_delete_where_filters_by_column() {
        let store = MemoryRowStore::new();
        store.seed(
            Table::JobCombineItems,
            vec![json!({ "id": 1, "jobId": 7 }), json!({ "id": 2, "jobId": 8 })],
        );
        store
            .delete_where(Table::JobCombineItems, "jobId", 7)
            .await
            .unwrap();
        assert_eq!(store.rows(Table::JobCombineItems), vec![json!({ "id": 2, "jobId": 8 })]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryRowStore::new();
        store.set_fail_reads(true);
        assert!(store.select_all(Table::Jobs).await.is_err());

        store.fail_inserts_into(Table::Jobs);
        assert!(store.insert(Table::Jobs, vec![json!({ "id": 1 })]).await.is_err());
        assert!(store.insert(Table::Items, vec![json!({ "id": 1 })]).await.is_ok());
        assert_eq!(store.write_count(), 1);
    }
}
