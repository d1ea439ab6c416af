use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vitrine_core::UploadTargetRequest;
use vitrine_services::SIGNATURE_HEADER;

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Issue a presigned PUT target for one asset of an existing entity
#[tracing::instrument(
    skip(state, request),
    fields(
        entity_type = %request.entity_type,
        entity_id = %request.entity_id,
        intent = %request.intent,
        operation = "issue_upload_target"
    )
)]
pub async fn issue_upload_target(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadTargetRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let target = state.uploads.issue(request).await?;
    Ok(Json(target))
}

/// Storage completion notification. The signature covers the raw body, so
/// the body is read as bytes before parsing.
pub async fn upload_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let response = state.completions.handle(&body, signature).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct DurabilityQuery {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct DurabilityResponse {
    pub url: String,
    pub durable: bool,
}

/// Whether a final asset URL has been verified by the completion webhook
pub async fn upload_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DurabilityQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let durable = state.completions.is_durable(&query.url).await?;
    Ok(Json(DurabilityResponse {
        url: query.url,
        durable,
    }))
}
