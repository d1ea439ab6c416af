//! Route configuration and setup.

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use vitrine_core::{ServerConfig, StorageBackend};
use vitrine_infra::request_id_middleware;

use crate::constants::{API_PREFIX, HTTP_CONCURRENCY_LIMIT, MAX_JSON_BODY_BYTES};
use crate::handlers::{health, media, reorder, uploads};
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(config: &ServerConfig, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;

    let api = Router::new()
        .route("/uploads/presigned", post(uploads::issue_upload_target))
        .route("/uploads/webhook", post(uploads::upload_webhook))
        .route("/uploads/status", get(uploads::upload_status))
        .route("/{entity_type}/reorder", put(reorder::reorder_entities));

    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .nest(API_PREFIX, api)
        .layer(RequestBodyLimitLayer::new(MAX_JSON_BODY_BYTES));

    if config.storage_backend == StorageBackend::Local {
        let media_path = config.local_media_path().ok_or_else(|| {
            anyhow::anyhow!("LOCAL_STORAGE_BASE_URL needs a path to serve uploads from")
        })?;
        if media_path == "/health" || media_path.starts_with(API_PREFIX) {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_BASE_URL path {} collides with API routes",
                media_path
            ));
        }
        let upload_limit = usize::try_from(config.max_upload_bytes).unwrap_or(usize::MAX);
        let media = Router::new()
            .route(
                &format!("{}/{{*key}}", media_path),
                get(media::get_object).put(media::put_object),
            )
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(upload_limit));
        app = app.merge(media);
        tracing::info!(path = %media_path, "Local media routes mounted");
    }

    let app = app
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &ServerConfig) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
