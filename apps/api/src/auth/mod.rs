//! Email/password sessions against the hosted backend's auth service.

use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AuthSettings;

pub mod handlers;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Session is missing or expired")]
    InvalidSession,

    #[error("Auth service error (status {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    key: String,
}

impl AuthClient {
    pub fn new(settings: &AuthSettings) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            base_url: settings.url.trim_end_matches('/').to_string(),
            key: settings.key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let response = self
            .client
            .post(self.url("token?grant_type=password"))
            .header("apikey", &self.key)
            .json(&json!({
                "email": credentials.email,
                "password": credentials.password,
            }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            warn!("Sign-in rejected for {}", credentials.email);
            return Err(AuthError::InvalidCredentials);
        }
        let session: Session = check(response).await?.json().await?;
        info!("User {} signed in", session.user.id);
        Ok(session)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.url("logout"))
            .header("apikey", &self.key)
            .bearer_auth(access_token)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidSession);
        }
        check(response).await?;
        Ok(())
    }

    pub async fn current_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .get(self.url("user"))
            .header("apikey", &self.key)
            .bearer_auth(access_token)
            .send()
            .await?;
        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(AuthError::InvalidSession);
        }
        Ok(check(response).await?.json().await?)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(AuthError::Api {
        status: status.as_u16(),
        message: response.text().await.unwrap_or_default(),
    })
}

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
