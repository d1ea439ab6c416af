//! Application bootstrap: storage, services, seed data and routes.

pub mod routes;
pub mod seed;
pub mod server;

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use vitrine_core::ServerConfig;
use vitrine_services::create_storage;

use crate::state::AppState;

/// Build state and router from configuration.
pub async fn initialize_app(config: ServerConfig) -> Result<(Arc<AppState>, Router)> {
    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage backend")?;
    tracing::info!(backend = %storage.backend_type(), "Storage initialized");

    let state = Arc::new(AppState::new(config.clone(), storage));

    if let Some(path) = &config.position_seed_path {
        let seeded = seed::load_positions(path, &state.positions).await?;
        tracing::info!(path = %path, entity_types = seeded, "Position seed loaded");
    }

    Arc::new(state.cleanup.clone()).start();
    tracing::info!("Started upload record cleanup background task");

    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}
