//! Local storage routes: signed PUTs from the upload transport and reads of
//! stored objects. Only mounted for the local backend.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use vitrine_core::validation::guess_content_type;
use vitrine_core::{AppError, UploadCompletionNotice};

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignedUploadQuery {
    pub expires: u64,
    pub signature: String,
}

/// Store the body of a signed PUT, then verify it like a completion webhook
#[tracing::instrument(skip(state, query, body), fields(key = %key, size = body.len(), operation = "local_upload"))]
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedUploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let size = state
        .storage
        .accept_signed_upload(&key, query.expires, &query.signature, &body)
        .await?;

    let response = state
        .completions
        .complete(UploadCompletionNotice {
            key,
            size,
            etag: None,
        })
        .await?;
    Ok(Json(response))
}

/// Serve a stored object
#[tracing::instrument(skip(state), fields(operation = "local_read"))]
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, HttpAppError> {
    let data = state.storage.read(&key).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, guess_content_type(&key))
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from(data))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })?;

    Ok(response)
}
