//! Row store over a direct Postgres connection.
//!
//! Rows travel as JSON: reads use `to_jsonb(t)`, writes go through
//! `jsonb_populate_record(set)` so the table's own column types apply.
//! Column names come from JSON keys and are checked before being quoted into SQL.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::{RowStore, StoreError, Table};

#[derive(Clone)]
pub struct PgRowStore {
    pool: PgPool,
}

impl PgRowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");
        Ok(Self::new(pool))
    }
}

fn quote_ident(name: &str) -> Result<String, StoreError> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if !valid {
        return Err(StoreError::InvalidColumn(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

fn object_keys(value: &Value) -> Result<Vec<String>, StoreError> {
    match value {
        Value::Object(map) => map.keys().map(|k| quote_ident(k)).collect(),
        _ => Err(StoreError::InvalidColumn("<non-object row>".into())),
    }
}

fn select_sql(table: Table) -> String {
    format!("SELECT to_jsonb(t) FROM \"{}\" t ORDER BY t.id", table.name())
}

fn insert_sql(table: Table, columns: &[String]) -> String {
    let cols = columns.join(", ");
    format!(
        "INSERT INTO \"{t}\" ({cols}) SELECT {cols} FROM jsonb_populate_recordset(NULL::\"{t}\", $1)",
        t = table.name()
    )
}

fn update_sql(table: Table, columns: &[String]) -> String {
    let assignments = columns
        .iter()
        .map(|c| format!("{c} = r.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE \"{t}\" SET {assignments} FROM jsonb_populate_record(NULL::\"{t}\", $1) AS r WHERE \"{t}\".id = $2",
        t = table.name()
    )
}

fn delete_sql(table: Table, column: &str) -> Result<String, StoreError> {
    Ok(format!(
        "DELETE FROM \"{}\" WHERE {} = $1",
        table.name(),
        quote_ident(column)?
    ))
}

#[async_trait]
impl RowStore for PgRowStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn select_all(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        Ok(sqlx::query_scalar::<_, Value>(&select_sql(table))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<(), StoreError> {
        let Some(first) = rows.first() else {
            return Ok(());
        };
        let columns = object_keys(first)?;
        sqlx::query(&insert_sql(table, &columns))
            .bind(Value::Array(rows))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_by_id(&self, table: Table, id: i64, patch: Value) -> Result<(), StoreError> {
        let columns = object_keys(&patch)?;
        if columns.is_empty() {
            return Ok(());
        }
        sqlx::query(&update_sql(table, &columns))
            .bind(patch)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_where(&self, table: Table, column: &str, value: i64) -> Result<(), StoreError> {
        sqlx::query(&delete_sql(table, column)?)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
