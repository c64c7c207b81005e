use std::sync::Arc;

use anyhow::Result;

use crate::ai_client::WebhookClient;
use crate::auth::AuthClient;
use crate::catalog::CatalogStore;
use crate::combine::CombineStore;
use crate::config::Config;
use crate::export::ExportSink;
use crate::generation::Workflow;
use crate::jobs::JobStore;
use crate::prompts::PromptStore;
use crate::store::RowStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogStore>,
    pub jobs: Arc<JobStore>,
    pub combines: Arc<CombineStore>,
    pub prompts: Arc<PromptStore>,
    /// `None` when `WEBHOOK_URL` is unset: jobs are stored but not dispatched.
    pub webhook: Option<WebhookClient>,
    pub auth: Option<AuthClient>,
    /// Object storage for export bundles. S3 in production, swapped in tests.
    pub export_sink: Option<Arc<dyn ExportSink>>,
    pub config: Config,
}

impl AppState {
    /// Builds every store over one row store backend. Export stays disabled
    /// until a sink is attached with [`AppState::with_export_sink`].
    pub fn new(config: Config, backend: Arc<dyn RowStore>) -> Result<Self> {
        let webhook = config.webhook.as_ref().map(WebhookClient::new).transpose()?;
        let auth = config.auth.as_ref().map(AuthClient::new).transpose()?;
        Ok(Self {
            catalog: Arc::new(CatalogStore::new(backend.clone())),
            jobs: Arc::new(JobStore::new(backend.clone(), config.job_cache)),
            combines: Arc::new(CombineStore::new(backend.clone())),
            prompts: Arc::new(PromptStore::new(backend)),
            webhook,
            auth,
            export_sink: None,
            config,
        })
    }

    pub fn with_export_sink(mut self, sink: Arc<dyn ExportSink>) -> Self {
        self.export_sink = Some(sink);
        self
    }

    pub fn workflow(&self) -> Workflow<'_> {
        Workflow {
            catalog: &self.catalog,
            jobs: &self.jobs,
            prompts: &self.prompts,
            webhook: self.webhook.as_ref(),
            default_submitee: &self.config.default_submitee,
        }
    }

    /// Loads every store from the backend. Failures are logged per store and
    /// leave that store empty.
    pub async fn load_all(&self) {
        if let Err(e) = self.catalog.fetch_all().await {
            tracing::warn!("Initial catalog load failed: {e}");
        }
        if let Err(e) = self.jobs.fetch_all().await {
            tracing::warn!("Initial job load failed: {e}");
        }
        if let Err(e) = self.combines.fetch_combines().await {
            tracing::warn!("Initial job combine load failed: {e}");
        }
        if let Err(e) = self.combines.fetch_items().await {
            tracing::warn!("Initial job combine item load failed: {e}");
        }
        if let Err(e) = self.prompts.fetch_all().await {
            tracing::warn!("Initial prompt load failed: {e}");
        }
    }
}
