//! Axum route handlers for the catalog API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::generation::ItemContent;
use crate::models::{Item, ItemId, ItemPatch, ItemType, NewItem};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ItemListQuery {
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub selected: Option<Item>,
}

fn find_item(state: &AppState, id: ItemId) -> Result<Item, AppError> {
    state
        .catalog
        .get_by_id(id)
        .ok_or_else(|| AppError::NotFound(format!("Item {id} not found")))
}

/// GET /api/v1/items[?type=]
pub async fn handle_list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemListQuery>,
) -> Json<Vec<Item>> {
    Json(match query.item_type {
        Some(item_type) => state.catalog.get_by_type(item_type),
        None => state.catalog.all(),
    })
}

/// POST /api/v1/items
pub async fn handle_create_item(
    State(state): State<AppState>,
    Json(request): Json<NewItem>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    let item = state.catalog.add(request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// POST /api/v1/items/refresh
pub async fn handle_refresh_items(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, AppError> {
    let count = state.catalog.fetch_all().await?;
    Ok(Json(RefreshResponse { count }))
}

/// GET /api/v1/items/:id
pub async fn handle_get_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(find_item(&state, id)?))
}

/// PATCH /api/v1/items/:id
pub async fn handle_update_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    Json(patch): Json<ItemPatch>,
) -> Result<Json<Item>, AppError> {
    if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    state
        .catalog
        .update(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Item {id} not found")))
}

/// DELETE /api/v1/items/:id
pub async fn handle_delete_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<StatusCode, AppError> {
    if state.catalog.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Item {id} not found")))
    }
}

/// GET /api/v1/items/:id/content
///
/// The item with its photo, video and story jobs.
pub async fn handle_item_content(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<ItemContent>, AppError> {
    let item = find_item(&state, id)?;
    Ok(Json(ItemContent::build(item, &state.jobs)))
}

/// POST /api/v1/items/:id/select
pub async fn handle_select_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
) -> Result<Json<SelectionResponse>, AppError> {
    let item = find_item(&state, id)?;
    state.catalog.select(Some(item.id));
    Ok(Json(SelectionResponse {
        selected: Some(item),
    }))
}

/// GET /api/v1/items/selection
pub async fn handle_get_selection(State(state): State<AppState>) -> Json<SelectionResponse> {
    Json(SelectionResponse {
        selected: state.catalog.selected(),
    })
}

/// DELETE /api/v1/items/selection
pub async fn handle_clear_selection(State(state): State<AppState>) -> StatusCode {
    state.catalog.select(None);
    StatusCode::NO_CONTENT
}
