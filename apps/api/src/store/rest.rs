//! Row store over the hosted backend's REST interface (`{url}/rest/v1/{table}`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{RowStore, StoreError, Table};

#[derive(Debug, Deserialize)]
struct RestErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct RestRowStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestRowStore {
    pub fn new(base_url: String, api_key: String) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// Turns a non-2xx response into `StoreError::Api`, preferring the backend's `message`.
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<RestErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

fn eq_filter(value: i64) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl RowStore for RestRowStore {
    fn backend(&self) -> &'static str {
        "rest"
    }

    async fn select_all(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&[("select", "*")])
            .send()
            .await?;
        let rows: Vec<Value> = check(response).await?.json().await?;
        debug!("Fetched {} rows from {}", rows.len(), table.name());
        Ok(rows)
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }
        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn update_by_id(&self, table: Table, id: i64, patch: Value) -> Result<(), StoreError> {
        let response = self
            .authorized(self.client.patch(self.table_url(table)))
            .query(&[("id", eq_filter(id))])
            .header("Prefer", "return=minimal")
            .json(&patch)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_where(&self, table: Table, column: &str, value: i64) -> Result<(), StoreError> {
        let response = self
            .authorized(self.client.delete(self.table_url(table)))
            .query(&[(column, eq_filter(value))])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
