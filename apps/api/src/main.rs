mod ai_client;
mod auth;
mod catalog;
mod combine;
mod config;
mod errors;
mod export;
mod generation;
mod jobs;
mod models;
mod prompts;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, S3Settings};
use crate::export::S3Sink;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::build_row_store;

#[tokio::main]
async fn main() -> Result<()> {
    // Fails when the row store settings are missing
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Lookbook API v{}", env!("CARGO_PKG_VERSION"));

    let backend = build_row_store(&config.store).await?;

    let mut state = AppState::new(config.clone(), backend)?;
    match &config.s3 {
        Some(s3) => {
            let client = build_s3_client(s3).await;
            state = state.with_export_sink(Arc::new(S3Sink::new(client, &s3.bucket)));
            info!("Export enabled (bucket: {})", s3.bucket);
        }
        None => info!("S3 not configured, export disabled"),
    }
    if state.webhook.is_none() {
        info!("WEBHOOK_URL not set, jobs will be stored without dispatch");
    }
    info!("Job cache policy: {:?}", state.jobs.policy());

    state.load_all().await;

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client for an S3-compatible endpoint (MinIO locally, AWS in production).
async fn build_s3_client(settings: &S3Settings) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &settings.access_key_id,
        &settings.secret_access_key,
        None,
        None,
        "lookbook-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&settings.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
