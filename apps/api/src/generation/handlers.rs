//! Axum route handlers for the generation workflows.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::generation::{
    default_photo_prompts, default_video_prompt, video_sources, DispatchedJob, PhotoRequest,
    StoryRequest, VideoRequest,
};
use crate::models::{ItemId, Job};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PhotoDefaultsResponse {
    pub prompts: Vec<String>,
    pub video_prompt: String,
    /// Photo jobs with a result that can seed a video.
    pub video_sources: Vec<Job>,
}

/// GET /api/v1/items/:id/photo-jobs/defaults
pub async fn handle_photo_defaults(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<PhotoDefaultsResponse>, AppError> {
    let item = state
        .catalog
        .get_by_id(id)
        .ok_or_else(|| AppError::NotFound(format!("Item {id} not found")))?;
    Ok(Json(PhotoDefaultsResponse {
        prompts: default_photo_prompts(&state.prompts, item.item_type),
        video_prompt: default_video_prompt(item.item_type),
        video_sources: video_sources(&state.jobs, id),
    }))
}

/// POST /api/v1/items/:id/photo-jobs
///
/// An empty body submits the category defaults.
pub async fn handle_create_photo_jobs(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    request: Option<Json<PhotoRequest>>,
) -> Result<(StatusCode, Json<Vec<DispatchedJob>>), AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let jobs = state.workflow().submit_photos(id, request).await?;
    Ok((StatusCode::CREATED, Json(jobs)))
}

/// POST /api/v1/items/:id/video-jobs
pub async fn handle_create_video_jobs(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    Json(request): Json<VideoRequest>,
) -> Result<(StatusCode, Json<Vec<DispatchedJob>>), AppError> {
    let jobs = state.workflow().submit_videos(id, request).await?;
    Ok((StatusCode::CREATED, Json(jobs)))
}

/// POST /api/v1/items/:id/story-jobs
pub async fn handle_create_story_job(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    request: Option<Json<StoryRequest>>,
) -> Result<(StatusCode, Json<DispatchedJob>), AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let job = state.workflow().submit_story(id, request).await?;
    Ok((StatusCode::CREATED, Json(job)))
}
