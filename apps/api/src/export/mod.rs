//! Export of catalog items to downstream systems.
//!
//! Each target receives a JSON bundle (the item plus its generated jobs) at
//! `exports/{target}/{item_id}.json` in object storage. Targets succeed or
//! fail independently; the item is stamped as exported when any target took it.

use std::fmt;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::CatalogStore;
use crate::jobs::JobStore;
use crate::models::{Item, ItemId, Job};

pub mod handlers;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Item {0} not found")]
    ItemNotFound(ItemId),

    #[error("Select at least one export target")]
    NoTargets,

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportTarget {
    Erp,
    Ecommerce,
    Operational,
    Stakeholders,
}

impl ExportTarget {
    pub const ALL: [ExportTarget; 4] = [
        ExportTarget::Erp,
        ExportTarget::Ecommerce,
        ExportTarget::Operational,
        ExportTarget::Stakeholders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportTarget::Erp => "erp",
            ExportTarget::Ecommerce => "ecommerce",
            ExportTarget::Operational => "operational",
            ExportTarget::Stakeholders => "stakeholders",
        }
    }

    pub fn object_key(&self, item_id: ItemId) -> String {
        format!("exports/{}/{}.json", self.as_str(), item_id)
    }
}

impl fmt::Display for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where export bundles are written. Carried in `AppState` as `Arc<dyn ExportSink>`.
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), ExportError>;
}

pub struct S3Sink {
    client: S3Client,
    bucket: String,
}

impl S3Sink {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ExportSink for S3Sink {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), ExportError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| ExportError::Upload(e.to_string()))?;
        info!("Uploaded export bundle to s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ExportBundle<'a> {
    target: ExportTarget,
    generated_at: DateTime<Utc>,
    item: &'a Item,
    jobs: &'a [Job],
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TargetStatus {
    pub target: ExportTarget,
    pub key: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub item_id: ItemId,
    pub targets: Vec<TargetStatus>,
    pub exported_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub targets: Vec<ExportTarget>,
}

pub async fn export_item(
    catalog: &CatalogStore,
    jobs: &JobStore,
    sink: &dyn ExportSink,
    item_id: ItemId,
    targets: &[ExportTarget],
) -> Result<ExportReport, ExportError> {
    if targets.is_empty() {
        return Err(ExportError::NoTargets);
    }
    let item = catalog
        .get_by_id(item_id)
        .ok_or(ExportError::ItemNotFound(item_id))?;
    let item_jobs = jobs.get_by_item_id(item_id);
    let generated_at = Utc::now();

    let mut statuses: Vec<TargetStatus> = Vec::with_capacity(targets.len());
    for &target in targets {
        if statuses.iter().any(|s| s.target == target) {
            continue;
        }
        let key = target.object_key(item_id);
        let body = serde_json::to_vec_pretty(&ExportBundle {
            target,
            generated_at,
            item: &item,
            jobs: &item_jobs,
        })?;
        let error = match sink.put(&key, body, "application/json").await {
            Ok(()) => None,
            Err(e) => {
                warn!("Export of item {item_id} to {target} failed: {e}");
                Some(e.to_string())
            }
        };
        statuses.push(TargetStatus {
            target,
            key,
            ok: error.is_none(),
            error,
        });
    }

    // The uploads already happened; a failed stamp must not hide their outcome.
    let exported_at = if statuses.iter().any(|s| s.ok) {
        match catalog.mark_exported(item_id).await {
            Ok(item) => item.and_then(|item| item.exported_at),
            Err(e) => {
                warn!("Item {item_id} exported but the export time was not stored: {e}");
                None
            }
        }
    } else {
        None
    };

    Ok(ExportReport {
        item_id,
        targets: statuses,
        exported_at,
    })
}
