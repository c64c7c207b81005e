use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::item::ItemId;

pub type JobId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Photo,
    Video,
    Story,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Photo => "photo",
            JobType::Video => "video",
            JobType::Story => "story",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "photo" => Ok(JobType::Photo),
            "video" => Ok(JobType::Video),
            "story" => Ok(JobType::Story),
            other => Err(format!("unknown job type '{other}'")),
        }
    }
}

/// One AI generation request for a single item, as stored in the `jobs` table.
///
/// `url` stays empty until the external worker attaches the result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub item_id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub prompt: String,
    #[serde(default)]
    pub submit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub submitee: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub meta: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Job {
    pub fn from_new(id: JobId, created: DateTime<Utc>, new: NewJob) -> Self {
        Self {
            id,
            job_type: new.job_type,
            item_id: new.item_id,
            original_image: new.original_image,
            prompt: new.prompt,
            submit_date: Some(new.submit_date.unwrap_or(created)),
            create_date: Some(created),
            submitee: new.submitee,
            meta: new.meta,
            url: None,
        }
    }

    pub fn has_result(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Merges a patch. Type and owning item are immutable and not part of the patch.
    pub fn apply(&mut self, patch: &JobPatch) {
        if let Some(original_image) = &patch.original_image {
            self.original_image = Some(original_image.clone());
        }
        if let Some(prompt) = &patch.prompt {
            self.prompt = prompt.clone();
        }
        if let Some(submit_date) = patch.submit_date {
            self.submit_date = Some(submit_date);
        }
        if let Some(submitee) = &patch.submitee {
            self.submitee = submitee.clone();
        }
        if let Some(meta) = &patch.meta {
            for (key, value) in meta {
                self.meta.insert(key.clone(), value.clone());
            }
        }
        if let Some(url) = &patch.url {
            self.url = Some(url.clone());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub item_id: ItemId,
    #[serde(default)]
    pub original_image: Option<String>,
    pub prompt: String,
    /// Defaults to the creation time.
    #[serde(default)]
    pub submit_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitee: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}
