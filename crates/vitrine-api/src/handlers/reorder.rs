use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use vitrine_core::{AppError, EntityType, ReorderRequest, ReorderResponse};

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Replace the order of every sibling of one entity type in one request
pub async fn reorder_entities(
    State(state): State<Arc<AppState>>,
    Path(entity_type): Path<String>,
    ValidatedJson(request): ValidatedJson<ReorderRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let entity_type: EntityType = entity_type
        .parse()
        .map_err(|e: anyhow::Error| AppError::NotFound(e.to_string()))?;

    let updated = state.reorders.reorder(entity_type, request.items).await?;
    Ok(Json(ReorderResponse { updated }))
}
