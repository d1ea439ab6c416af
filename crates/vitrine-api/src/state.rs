//! Shared application state

use std::sync::Arc;
use vitrine_core::ServerConfig;
use vitrine_services::{
    InMemoryPositionRepository, InMemoryUploadRecordRepository, PresignedUploadConfig,
    PresignedUploadService, ReorderService, Storage, UploadCleanupService,
    UploadCompletionService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub storage: Arc<dyn Storage>,
    pub uploads: Arc<PresignedUploadService>,
    pub completions: Arc<UploadCompletionService>,
    pub reorders: Arc<ReorderService>,
    pub cleanup: UploadCleanupService,
    pub uploads_repository: Arc<InMemoryUploadRecordRepository>,
    pub positions: Arc<InMemoryPositionRepository>,
}

impl AppState {
    /// Wire services over in-memory repositories.
    pub fn new(config: ServerConfig, storage: Arc<dyn Storage>) -> Self {
        let uploads_repository = Arc::new(InMemoryUploadRecordRepository::new());
        let positions = Arc::new(InMemoryPositionRepository::new());

        let uploads = Arc::new(PresignedUploadService::new(
            storage.clone(),
            uploads_repository.clone(),
            PresignedUploadConfig::from(&config),
        ));
        let completions = Arc::new(UploadCompletionService::new(
            storage.clone(),
            uploads_repository.clone(),
            config.webhook_signing_secret.clone().into_bytes(),
        ));
        let reorders = Arc::new(ReorderService::new(positions.clone()));
        let cleanup = UploadCleanupService::new(uploads_repository.clone());

        Self {
            config,
            storage,
            uploads,
            completions,
            reorders,
            cleanup,
            uploads_repository,
            positions,
        }
    }
}
