//! Axum route handlers for outfit batches.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::combine::{
    generate_combinations, BatchReceipt, BatchRequest, Combination, CombineResultRow,
    OutfitSelection,
};
use crate::errors::AppError;
use crate::models::{CombineId, CombinePatch, JobCombine, JobCombineItem};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub count: usize,
    pub combinations: Vec<Combination>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub combines: usize,
    pub items: usize,
}

fn check_known_items(state: &AppState, selection: &OutfitSelection) -> Result<(), AppError> {
    let unknown = state.catalog.unknown_ids(selection.all_ids());
    if unknown.is_empty() {
        return Ok(());
    }
    let ids: Vec<String> = unknown.iter().map(|id| id.to_string()).collect();
    Err(AppError::Validation(format!(
        "Unknown item ids: {}",
        ids.join(", ")
    )))
}

fn require_combine(state: &AppState, id: CombineId) -> Result<JobCombine, AppError> {
    state
        .combines
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("Job combine {id} not found")))
}

/// GET /api/v1/combines
pub async fn handle_list_combines(State(state): State<AppState>) -> Json<Vec<JobCombine>> {
    Json(state.combines.all())
}

/// POST /api/v1/combines
pub async fn handle_submit_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<(StatusCode, Json<BatchReceipt>), AppError> {
    // Form checks run first so a blank name is reported ahead of unknown ids.
    request.validate()?;
    check_known_items(&state, &request.selection)?;
    let receipt = state.combines.submit(&request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// POST /api/v1/combines/preview
///
/// The combinations a selection would produce. Nothing is written.
pub async fn handle_preview(
    State(state): State<AppState>,
    Json(selection): Json<OutfitSelection>,
) -> Result<Json<PreviewResponse>, AppError> {
    check_known_items(&state, &selection)?;
    let combinations = generate_combinations(&selection);
    Ok(Json(PreviewResponse {
        count: combinations.len(),
        combinations,
    }))
}

/// POST /api/v1/combines/refresh
pub async fn handle_refresh_combines(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, AppError> {
    let combines = state.combines.fetch_combines().await?;
    let items = state.combines.fetch_items().await?;
    Ok(Json(RefreshResponse { combines, items }))
}

/// GET /api/v1/combines/:id/items
pub async fn handle_combine_items(
    State(state): State<AppState>,
    Path(id): Path<CombineId>,
) -> Result<Json<Vec<JobCombineItem>>, AppError> {
    require_combine(&state, id)?;
    Ok(Json(state.combines.items_for(id)))
}

/// GET /api/v1/combines/:id/results
pub async fn handle_combine_results(
    State(state): State<AppState>,
    Path(id): Path<CombineId>,
) -> Result<Json<Vec<CombineResultRow>>, AppError> {
    require_combine(&state, id)?;
    Ok(Json(state.combines.results(id, &state.catalog)))
}

/// PATCH /api/v1/combines/:id
pub async fn handle_update_combine(
    State(state): State<AppState>,
    Path(id): Path<CombineId>,
    Json(patch): Json<CombinePatch>,
) -> Result<Json<JobCombine>, AppError> {
    state
        .combines
        .update(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job combine {id} not found")))
}

/// DELETE /api/v1/combines/:id
pub async fn handle_delete_combine(
    State(state): State<AppState>,
    Path(id): Path<CombineId>,
) -> Result<StatusCode, AppError> {
    require_combine(&state, id)?;
    state.combines.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
