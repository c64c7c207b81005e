use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ai_client::WebhookError;
use crate::auth::AuthError;
use crate::combine::SubmitError;
use crate::export::ExportError;
use crate::generation::GenerationError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Auth error: {0}")]
    Auth(AuthError),

    #[error("Export error: {0}")]
    Export(ExportError),

    /// An optional integration is not configured.
    #[error("{0} is not configured")]
    ServiceUnavailable(&'static str),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Store(e) => AppError::Store(e),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<GenerationError> for AppError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::ItemNotFound(_) => AppError::NotFound(e.to_string()),
            GenerationError::Store(e) => AppError::Store(e),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::ItemNotFound(_) => AppError::NotFound(e.to_string()),
            ExportError::NoTargets => AppError::Validation(e.to_string()),
            other => AppError::Export(other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials | AuthError::InvalidSession => {
                AppError::Unauthorized(e.to_string())
            }
            other => AppError::Auth(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "STORE_ERROR",
                    "The data store request failed".to_string(),
                )
            }
            AppError::Webhook(e) => {
                tracing::error!("Webhook error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "WEBHOOK_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Auth(e) => {
                tracing::error!("Auth error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "AUTH_ERROR",
                    "The auth service request failed".to_string(),
                )
            }
            AppError::Export(e) => {
                tracing::error!("Export error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXPORT_ERROR",
                    "An export error occurred".to_string(),
                )
            }
            AppError::ServiceUnavailable(service) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                format!("{service} is not configured"),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
