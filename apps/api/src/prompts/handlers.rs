//! Axum route handlers for the prompt catalog API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{ItemType, ItemTypePrompt};
use crate::prompts::AddOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdatePromptRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AddPromptResponse {
    pub outcome: AddOutcome,
    pub prompt: ItemTypePrompt,
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// GET /api/v1/prompts
pub async fn handle_list_prompts(State(state): State<AppState>) -> Json<Vec<ItemTypePrompt>> {
    Json(state.prompts.all())
}

/// PUT /api/v1/prompts/:type
pub async fn handle_update_prompt(
    State(state): State<AppState>,
    Path(item_type): Path<ItemType>,
    Json(request): Json<UpdatePromptRequest>,
) -> Result<Json<ItemTypePrompt>, AppError> {
    require_text(&request.prompt, "prompt")?;
    let prompt = state
        .prompts
        .update(item_type, request.prompt.trim().to_string())
        .await?;
    Ok(Json(prompt))
}

/// POST /api/v1/prompts
///
/// Adds a prompt for a category without one; an existing prompt is kept.
pub async fn handle_add_prompt(
    State(state): State<AppState>,
    Json(request): Json<ItemTypePrompt>,
) -> Result<Json<AddPromptResponse>, AppError> {
    require_text(&request.prompt, "prompt")?;
    let item_type = request.item_type;
    let outcome = state.prompts.add(request).await?;
    Ok(Json(AddPromptResponse {
        outcome,
        prompt: ItemTypePrompt::new(item_type, state.prompts.get_by_type(item_type)),
    }))
}

/// POST /api/v1/prompts/suggest
pub async fn handle_suggest_prompts(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<SuggestResponse>, AppError> {
    require_text(&request.name, "name")?;
    let webhook = state
        .webhook
        .as_ref()
        .ok_or(AppError::ServiceUnavailable("AI webhook"))?;
    let suggestions = webhook.suggest_prompts(request.name.trim()).await?;
    Ok(Json(SuggestResponse { suggestions }))
}
