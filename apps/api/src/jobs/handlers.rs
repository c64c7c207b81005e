//! Axum route handlers for the jobs API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::jobs::FetchOutcome;
use crate::models::{ItemId, Job, JobId, JobPatch, JobType, NewJob};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub item_id: Option<ItemId>,
    #[serde(rename = "type")]
    pub job_type: Option<JobType>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    /// Bypass the cache policy for this refresh.
    #[serde(default)]
    pub force: bool,
}

/// GET /api/v1/jobs[?item_id=&type=]
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Json<Vec<Job>> {
    let jobs = &state.jobs;
    Json(match (query.item_id, query.job_type) {
        (Some(item_id), Some(job_type)) => jobs.get_by_item_id_and_type(item_id, job_type),
        (Some(item_id), None) => jobs.get_by_item_id(item_id),
        (None, Some(job_type)) => jobs.get_by_type(job_type),
        (None, None) => jobs.all(),
    })
}

/// POST /api/v1/jobs
///
/// Stores a job as given; no webhook dispatch. The generation endpoints
/// under `/items/:id` create and dispatch in one step.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(mut request): Json<NewJob>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    if state.catalog.get_by_id(request.item_id).is_none() {
        return Err(AppError::Validation(format!(
            "Item {} does not exist",
            request.item_id
        )));
    }
    if request.submitee.trim().is_empty() {
        request.submitee = state.config.default_submitee.clone();
    }
    let job = state.jobs.add(request).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// POST /api/v1/jobs/refresh[?force=true]
pub async fn handle_refresh_jobs(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<FetchOutcome>, AppError> {
    if query.force {
        state.jobs.invalidate();
    }
    Ok(Json(state.jobs.fetch_all().await?))
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
    Json(patch): Json<JobPatch>,
) -> Result<Json<Job>, AppError> {
    state
        .jobs
        .update(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(id): Path<JobId>,
) -> Result<StatusCode, AppError> {
    if state.jobs.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Job {id} not found")))
    }
}
