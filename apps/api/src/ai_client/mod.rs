//! AI webhook client: the single point of entry for calls to the external
//! AI processing workflow.
//!
//! Requests go to `{WEBHOOK_URL}/{path}` with the shared key in the `N8N_KEY`
//! header. Job results are not returned here: the workflow writes them back
//! into the `jobs` / `jobCombineItems` tables on its own schedule.
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::WebhookSettings;
use crate::models::Job;

const MAX_RETRIES: u32 = 3;
const KEY_HEADER: &str = "N8N_KEY";
/// Webhook path that answers with prompt suggestions for a garment name.
pub const SUGGEST_PATH: &str = "aicloth";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Webhook unavailable after {retries} retries")]
    Exhausted { retries: u32 },

    #[error("Webhook returned no usable suggestions")]
    EmptySuggestions,
}

#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    base_url: String,
    key: String,
}

impl WebhookClient {
    pub fn new(settings: &WebhookSettings) -> Result<Self, WebhookError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(60)).build()?,
            base_url: settings.url.trim_end_matches('/').to_string(),
            key: settings.key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POSTs `payload` to the webhook path and returns the JSON reply.
    /// Retries on 429 and 5xx with exponential backoff.
    pub async fn call(&self, path: &str, payload: &Value) -> Result<Value, WebhookError> {
        let url = self.url(path);
        let mut last_error: Option<WebhookError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Webhook call to {} attempt {} failed, retrying after {}ms...",
                    path,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&url)
                .header(KEY_HEADER, &self.key)
                .json(payload)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(WebhookError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Webhook {} returned {}: {}", path, status, body);
                last_error = Some(WebhookError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                return Err(WebhookError::Api {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }

            let body = response.text().await?;
            debug!("Webhook {} answered with {} bytes", path, body.len());
            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(strip_json_fences(&body))?);
        }

        Err(last_error.unwrap_or(WebhookError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }

    /// Hands a freshly created job to the workflow under its type path.
    pub async fn dispatch_job(&self, job: &Job) -> Result<Value, WebhookError> {
        self.call(job.job_type.as_str(), &serde_json::to_value(job)?)
            .await
    }

    /// Asks the workflow for prompt ideas for a garment name.
    pub async fn suggest_prompts(&self, name: &str) -> Result<Vec<String>, WebhookError> {
        let reply = self.call(SUGGEST_PATH, &json!(name)).await?;
        let suggestions = parse_suggestions(reply)?;
        if suggestions.is_empty() {
            return Err(WebhookError::EmptySuggestions);
        }
        Ok(suggestions)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SuggestionReply {
    List(Vec<String>),
    Prompts { prompts: Vec<String> },
    Output { output: String },
}

/// Accepts a bare list, `{ "prompts": [...] }`, or `{ "output": "<json text>" }`
/// where the text may be wrapped in code fences.
fn parse_suggestions(reply: Value) -> Result<Vec<String>, WebhookError> {
    let reply = match reply {
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => {
            // Workflows often wrap the reply in a one-element item list.
            items.into_iter().next().unwrap_or(Value::Null)
        }
        other => other,
    };
    let prompts = match serde_json::from_value::<SuggestionReply>(reply)? {
        SuggestionReply::List(list) => list,
        SuggestionReply::Prompts { prompts } => prompts,
        SuggestionReply::Output { output } => {
            return parse_suggestions(serde_json::from_str(strip_json_fences(&output))?)
        }
    };
    Ok(prompts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from a text reply.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n[\"a\"]\n```";
        assert_eq!(strip_json_fences(input), "[\"a\"]");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences(" {\"k\": 1} "), "{\"k\": 1}");
    }

    #[test]
    fn test_parse_suggestions_shapes() {
        assert_eq!(
            parse_suggestions(json!(["studio shot", " "])).unwrap(),
            vec!["studio shot"]
        );
        assert_eq!(
            parse_suggestions(json!({ "prompts": ["a", "b"] })).unwrap(),
            vec!["a", "b"]
        );
        assert_eq!(
            parse_suggestions(json!({ "output": "```json\n[\"c\"]\n```" })).unwrap(),
            vec!["c"]
        );
        assert_eq!(
            parse_suggestions(json!([{ "prompts": ["d"] }])).unwrap(),
            vec!["d"]
        );
    }

    #[test]
    fn test_parse_suggestions_rejects_unknown_shape() {
        assert!(parse_suggestions(json!({ "unexpected": 1 })).is_err());
    }

    #[test]
    fn test_url_joins_path() {
        let client = WebhookClient::new(&WebhookSettings {
            url: "https://hooks.example/webhook/".into(),
            key: "k".into(),
        })
        .unwrap();
        assert_eq!(client.url("photo"), "https://hooks.example/webhook/photo");
    }
}
