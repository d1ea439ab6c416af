use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use vitrine_core::StorageBackend;

use crate::state::AppState;

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    storage: StorageBackend,
    version: &'static str,
}

/// Liveness probe
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            storage: state.storage.backend_type(),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
