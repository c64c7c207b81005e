use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};

use crate::auth::{bearer_token, AuthClient, AuthUser, Credentials, Session};
use crate::errors::AppError;
use crate::state::AppState;

fn client(state: &AppState) -> Result<&AuthClient, AppError> {
    state
        .auth
        .as_ref()
        .ok_or(AppError::ServiceUnavailable("Authentication"))
}

fn token(headers: &HeaderMap) -> Result<&str, AppError> {
    bearer_token(headers).ok_or_else(|| AppError::Unauthorized("Bearer token required".to_string()))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Session>, AppError> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".to_string(),
        ));
    }
    Ok(Json(client(&state)?.sign_in(&credentials).await?))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    client(&state)?.sign_out(token(&headers)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn handle_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthUser>, AppError> {
    Ok(Json(client(&state)?.current_user(token(&headers)?).await?))
}
