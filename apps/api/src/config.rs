use anyhow::{anyhow, Context, Result};

use crate::jobs::CachePolicy;

/// Which row store backs the service.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreSettings {
    Rest { url: String, key: String },
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthSettings {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookSettings {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if the row store settings are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreSettings,
    pub auth: Option<AuthSettings>,
    pub webhook: Option<WebhookSettings>,
    pub s3: Option<S3Settings>,
    pub job_cache: CachePolicy,
    pub default_submitee: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            var(key).ok_or_else(|| anyhow!("Required environment variable '{key}' is not set"))
        };

        let supabase = match (var("SUPABASE_URL"), var("SUPABASE_KEY")) {
            (Some(url), Some(key)) => Some((url, key)),
            _ => None,
        };

        let backend = var("STORE_BACKEND").unwrap_or_else(|| "rest".to_string());
        let store = match backend.as_str() {
            "rest" => StoreSettings::Rest {
                url: require("SUPABASE_URL")?,
                key: require("SUPABASE_KEY")?,
            },
            "postgres" => StoreSettings::Postgres {
                database_url: require("DATABASE_URL")?,
            },
            "memory" => StoreSettings::Memory,
            other => return Err(anyhow!("STORE_BACKEND must be rest, postgres or memory, got '{other}'")),
        };

        let webhook = match (var("WEBHOOK_URL"), var("WEBHOOK_KEY")) {
            (Some(url), key) => Some(WebhookSettings {
                url,
                key: key.unwrap_or_default(),
            }),
            _ => None,
        };

        let s3 = match var("S3_BUCKET") {
            Some(bucket) => Some(S3Settings {
                bucket,
                endpoint: require("S3_ENDPOINT")?,
                access_key_id: require("AWS_ACCESS_KEY_ID")?,
                secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            }),
            None => None,
        };

        let job_cache = match var("JOB_CACHE_POLICY") {
            Some(raw) => raw
                .parse::<CachePolicy>()
                .map_err(|e| anyhow!(e))
                .context("JOB_CACHE_POLICY is invalid")?,
            None => CachePolicy::Once,
        };

        Ok(Config {
            store,
            auth: supabase.map(|(url, key)| AuthSettings { url, key }),
            webhook,
            s3,
            job_cache,
            default_submitee: var("DEFAULT_SUBMITEE").unwrap_or_else(|| "admin".to_string()),
            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
