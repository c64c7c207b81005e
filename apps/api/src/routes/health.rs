use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus which optional integrations are enabled.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "lookbook-api",
        "integrations": {
            "webhook": state.webhook.is_some(),
            "auth": state.auth.is_some(),
            "export": state.export_sink.is_some(),
        }
    }))
}
