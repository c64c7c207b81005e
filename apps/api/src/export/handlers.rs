use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::AppError;
use crate::export::{export_item, ExportReport, ExportRequest};
use crate::models::ItemId;
use crate::state::AppState;

/// POST /api/v1/items/:id/export
///
/// Per-target outcomes are in the report body; the request itself only
/// fails for an unknown item, an empty target list or a store error.
pub async fn handle_export_item(
    State(state): State<AppState>,
    Path(id): Path<ItemId>,
    Json(request): Json<ExportRequest>,
) -> Result<Json<ExportReport>, AppError> {
    let sink = state
        .export_sink
        .clone()
        .ok_or(AppError::ServiceUnavailable("Export storage"))?;
    let report = export_item(&state.catalog, &state.jobs, sink.as_ref(), id, &request.targets).await?;
    Ok(Json(report))
}
