//! Generation workflows: turn an item into photo, video and story jobs.
//!
//! Jobs are persisted through the `JobStore` first and then handed to the AI
//! webhook. A failed hand-off is reported per job and never removes the job.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::ai_client::WebhookClient;
use crate::catalog::CatalogStore;
use crate::jobs::JobStore;
use crate::models::{Item, ItemId, ItemType, Job, JobId, JobType, NewJob};
use crate::prompts::PromptStore;
use crate::store::StoreError;

pub mod handlers;

/// Number of prompt fields offered for a photo batch.
pub const PHOTO_PROMPT_COUNT: usize = 5;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Item {0} not found")]
    ItemNotFound(ItemId),

    #[error("Enter at least one prompt")]
    NoPrompts,

    #[error("Select at least one photo")]
    NoSourcePhotos,

    #[error("Job {0} is not a finished photo of this item")]
    IneligiblePhoto(JobId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoRequest {
    /// Defaults to `PHOTO_PROMPT_COUNT` copies of the category prompt.
    #[serde(default)]
    pub prompts: Option<Vec<String>>,
    #[serde(default)]
    pub submitee: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoRequest {
    #[serde(default)]
    pub photo_job_ids: Vec<JobId>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub submitee: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub submitee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "dispatch", rename_all = "snake_case")]
pub enum Dispatch {
    Sent,
    /// No webhook configured.
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchedJob {
    pub job: Job,
    #[serde(flatten)]
    pub dispatch: Dispatch,
}

/// An item with its generated content grouped by job type.
#[derive(Debug, Clone, Serialize)]
pub struct ItemContent {
    pub item: Item,
    pub photos: Vec<Job>,
    pub videos: Vec<Job>,
    pub stories: Vec<Job>,
}

impl ItemContent {
    pub fn build(item: Item, jobs: &JobStore) -> Self {
        let mut content = Self {
            photos: Vec::new(),
            videos: Vec::new(),
            stories: Vec::new(),
            item,
        };
        for job in jobs.get_by_item_id(content.item.id) {
            match job.job_type {
                JobType::Photo => content.photos.push(job),
                JobType::Video => content.videos.push(job),
                JobType::Story => content.stories.push(job),
            }
        }
        content
    }
}

pub fn default_photo_prompts(prompts: &PromptStore, item_type: ItemType) -> Vec<String> {
    vec![prompts.get_by_type(item_type); PHOTO_PROMPT_COUNT]
}

pub fn default_video_prompt(item_type: ItemType) -> String {
    format!("Generate a 360° view of this {item_type} with smooth rotation and professional lighting")
}

pub fn default_story_prompt(item: &Item) -> String {
    format!(
        "Write an engaging product description for '{}', a {} from our collection. \
         Highlight its style, materials and the occasions it suits.",
        item.name, item.item_type
    )
}

/// Photo jobs of the item that already carry a result and can seed a video.
pub fn video_sources(jobs: &JobStore, item_id: ItemId) -> Vec<Job> {
    jobs.get_by_item_id_and_type(item_id, JobType::Photo)
        .into_iter()
        .filter(Job::has_result)
        .collect()
}

/// Borrowed view of the stores and clients a workflow needs.
pub struct Workflow<'a> {
    pub catalog: &'a CatalogStore,
    pub jobs: &'a JobStore,
    pub prompts: &'a PromptStore,
    pub webhook: Option<&'a WebhookClient>,
    pub default_submitee: &'a str,
}

impl Workflow<'_> {
    fn item(&self, item_id: ItemId) -> Result<Item, GenerationError> {
        self.catalog
            .get_by_id(item_id)
            .ok_or(GenerationError::ItemNotFound(item_id))
    }

    fn submitee(&self, requested: Option<String>) -> String {
        requested
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.default_submitee.to_string())
    }

    /// One photo job per non-blank prompt; `meta.promptIndex` keeps the prompt position.
    pub async fn submit_photos(
        &self,
        item_id: ItemId,
        request: PhotoRequest,
    ) -> Result<Vec<DispatchedJob>, GenerationError> {
        let item = self.item(item_id)?;
        let prompts = request
            .prompts
            .unwrap_or_else(|| default_photo_prompts(self.prompts, item.item_type));
        let prompts: Vec<(usize, String)> = prompts
            .into_iter()
            .enumerate()
            .map(|(i, p)| (i, p.trim().to_string()))
            .filter(|(_, p)| !p.is_empty())
            .collect();
        if prompts.is_empty() {
            return Err(GenerationError::NoPrompts);
        }

        let submitee = self.submitee(request.submitee);
        let new_jobs = prompts
            .into_iter()
            .map(|(index, prompt)| NewJob {
                job_type: JobType::Photo,
                item_id,
                original_image: item.display_image().map(str::to_string),
                prompt,
                submit_date: None,
                submitee: submitee.clone(),
                meta: meta("promptIndex", json!(index)),
            })
            .collect();
        self.create_and_dispatch(new_jobs).await
    }

    /// One video job per selected photo job; every selection must be a finished photo of the item.
    pub async fn submit_videos(
        &self,
        item_id: ItemId,
        request: VideoRequest,
    ) -> Result<Vec<DispatchedJob>, GenerationError> {
        let item = self.item(item_id)?;
        if request.photo_job_ids.is_empty() {
            return Err(GenerationError::NoSourcePhotos);
        }
        let eligible = video_sources(self.jobs, item_id);
        let mut sources = Vec::with_capacity(request.photo_job_ids.len());
        for id in &request.photo_job_ids {
            let photo = eligible
                .iter()
                .find(|j| j.id == *id)
                .ok_or(GenerationError::IneligiblePhoto(*id))?;
            if !sources.iter().any(|s: &&Job| s.id == photo.id) {
                sources.push(photo);
            }
        }

        let prompt = request
            .prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| default_video_prompt(item.item_type));
        let submitee = self.submitee(request.submitee);
        let new_jobs = sources
            .into_iter()
            .map(|photo| NewJob {
                job_type: JobType::Video,
                item_id,
                original_image: photo.url.clone(),
                prompt: prompt.clone(),
                submit_date: None,
                submitee: submitee.clone(),
                meta: meta("sourcePhotoJobId", json!(photo.id)),
            })
            .collect();
        self.create_and_dispatch(new_jobs).await
    }

    pub async fn submit_story(
        &self,
        item_id: ItemId,
        request: StoryRequest,
    ) -> Result<DispatchedJob, GenerationError> {
        let item = self.item(item_id)?;
        let prompt = match request.prompt {
            Some(p) if p.trim().is_empty() => return Err(GenerationError::NoPrompts),
            Some(p) => p.trim().to_string(),
            None => default_story_prompt(&item),
        };
        let new_job = NewJob {
            job_type: JobType::Story,
            item_id,
            original_image: item.display_image().map(str::to_string),
            prompt,
            submit_date: None,
            submitee: self.submitee(request.submitee),
            meta: Map::new(),
        };
        let mut created = self.create_and_dispatch(vec![new_job]).await?;
        created.pop().ok_or(GenerationError::NoPrompts)
    }

    async fn create_and_dispatch(
        &self,
        new_jobs: Vec<NewJob>,
    ) -> Result<Vec<DispatchedJob>, GenerationError> {
        let mut created = Vec::with_capacity(new_jobs.len());
        for new_job in new_jobs {
            created.push(self.jobs.add(new_job).await?);
        }

        let dispatched: Vec<DispatchedJob> = match self.webhook {
            None => created
                .into_iter()
                .map(|job| DispatchedJob {
                    job,
                    dispatch: Dispatch::Skipped,
                })
                .collect(),
            Some(webhook) => dispatch_all(webhook, created).await,
        };
        if let Some(first) = dispatched.first() {
            info!(
                "Created {} {} job(s) for item {}",
                dispatched.len(),
                first.job.job_type,
                first.job.item_id
            );
        }
        Ok(dispatched)
    }
}

/// Hands every job to the webhook at once, so one slow or failing call does
/// not hold up the others. Results keep the order of `jobs`.
async fn dispatch_all(webhook: &WebhookClient, jobs: Vec<Job>) -> Vec<DispatchedJob> {
    let mut set = JoinSet::new();
    for (index, job) in jobs.iter().enumerate() {
        let webhook = webhook.clone();
        let job = job.clone();
        set.spawn(async move { (index, webhook.dispatch_job(&job).await) });
    }

    let mut outcomes: Vec<Option<Dispatch>> = vec![None; jobs.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, Ok(_))) => outcomes[index] = Some(Dispatch::Sent),
            Ok((index, Err(e))) => {
                warn!("Job {} was stored but dispatch failed: {e}", jobs[index].id);
                outcomes[index] = Some(Dispatch::Failed {
                    error: e.to_string(),
                });
            }
            Err(e) => warn!("Dispatch task aborted: {e}"),
        }
    }

    jobs.into_iter()
        .zip(outcomes)
        .map(|(job, outcome)| DispatchedJob {
            job,
            dispatch: outcome.unwrap_or_else(|| Dispatch::Failed {
                error: "dispatch task aborted".to_string(),
            }),
        })
        .collect()
}

fn meta(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}
