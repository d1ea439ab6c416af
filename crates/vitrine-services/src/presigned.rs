//! Presigned upload gateway
//!
//! Issues one short-lived PUT destination per asset and remembers it so the
//! completion webhook can verify the object later.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use vitrine_core::validation::validate_filename;
use vitrine_core::{AppError, ServerConfig, UploadGateway, UploadTarget, UploadTargetRequest};
use vitrine_storage::{asset_key, Storage};

use crate::repository::{UploadRecord, UploadRecordRepository, UploadRecordStatus};

const DEFAULT_TTL_SECS: u64 = 15 * 60;

#[derive(Debug, Clone)]
pub struct PresignedUploadConfig {
    pub url_ttl: Duration,
    pub max_upload_bytes: u64,
    /// Empty means any content type
    pub allowed_content_types: Vec<String>,
}

impl Default for PresignedUploadConfig {
    fn default() -> Self {
        Self {
            url_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_upload_bytes: 25 * 1024 * 1024,
            allowed_content_types: Vec::new(),
        }
    }
}

impl From<&ServerConfig> for PresignedUploadConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            url_ttl: Duration::from_secs(config.upload_url_ttl_secs),
            max_upload_bytes: config.max_upload_bytes,
            allowed_content_types: config.allowed_content_types.clone(),
        }
    }
}

pub struct PresignedUploadService {
    storage: Arc<dyn Storage>,
    records: Arc<dyn UploadRecordRepository>,
    config: PresignedUploadConfig,
}

impl PresignedUploadService {
    pub fn new(
        storage: Arc<dyn Storage>,
        records: Arc<dyn UploadRecordRepository>,
        config: PresignedUploadConfig,
    ) -> Self {
        Self {
            storage,
            records,
            config,
        }
    }

    fn validate(&self, request: &UploadTargetRequest) -> Result<(), AppError> {
        if request.entity_id.is_nil() {
            return Err(AppError::InvalidInput(
                "entity_id is required before uploading assets".to_string(),
            ));
        }

        validate_filename(&request.file.filename)
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        if request.file.file_size == 0 {
            return Err(AppError::InvalidInput("file_size must be greater than 0".to_string()));
        }

        if request.file.file_size > self.config.max_upload_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File is {} bytes, the limit is {} bytes",
                request.file.file_size, self.config.max_upload_bytes
            )));
        }

        let content_type = request.file.content_type.to_lowercase();
        if !self.config.allowed_content_types.is_empty()
            && !self.config.allowed_content_types.contains(&content_type)
        {
            return Err(AppError::InvalidInput(format!(
                "Content type '{}' is not allowed",
                request.file.content_type
            )));
        }

        Ok(())
    }

    /// Validate the request, sign a PUT URL and record the pending upload.
    #[tracing::instrument(
        skip(self, request),
        fields(
            entity_type = %request.entity_type,
            entity_id = %request.entity_id,
            intent = %request.intent,
            operation = "issue_upload_target"
        )
    )]
    pub async fn issue(&self, request: UploadTargetRequest) -> Result<UploadTarget, AppError> {
        self.validate(&request)?;

        let upload_id = Uuid::new_v4();
        let storage_key = asset_key(
            request.entity_type,
            request.entity_id,
            &request.intent,
            upload_id,
            &request.file.filename,
        );

        let upload_url = self
            .storage
            .presigned_put_url(&storage_key, &request.file.content_type, self.config.url_ttl)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to generate presigned URL: {}", e)))?;

        let final_asset_url = self.storage.public_url(&storage_key);
        let created_at = Utc::now();
        let ttl = chrono::Duration::from_std(self.config.url_ttl)
            .map_err(|e| AppError::Internal(format!("Invalid upload URL TTL: {}", e)))?;
        let expires_at = created_at + ttl;

        let pruned = self.records.prune_expired(created_at).await?;
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired upload records");
        }

        self.records
            .insert(UploadRecord {
                upload_id,
                entity_type: request.entity_type,
                entity_id: request.entity_id,
                intent: request.intent.clone(),
                storage_key: storage_key.clone(),
                final_asset_url: final_asset_url.clone(),
                content_type: request.file.content_type.clone(),
                expected_size: request.file.file_size,
                status: UploadRecordStatus::Pending,
                created_at,
                expires_at,
                completed_at: None,
                failure_reason: None,
            })
            .await?;

        tracing::info!(
            upload_id = %upload_id,
            storage_key = %storage_key,
            filename = %request.file.filename,
            file_size = request.file.file_size,
            "Issued presigned upload target"
        );

        Ok(UploadTarget {
            upload_id,
            upload_url,
            final_asset_url,
            expires_at,
        })
    }
}

#[async_trait]
impl UploadGateway for PresignedUploadService {
    async fn issue_upload_target(
        &self,
        request: UploadTargetRequest,
    ) -> Result<UploadTarget, AppError> {
        self.issue(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryUploadRecordRepository;
    use crate::test_helpers::{MockStorage, MOCK_PUBLIC_HOST, MOCK_UPLOAD_HOST};
    use vitrine_core::{AssetIntent, EntityType, FileMeta};

    fn request(size: u64, content_type: &str) -> UploadTargetRequest {
        UploadTargetRequest {
            entity_type: EntityType::Project,
            entity_id: Uuid::new_v4(),
            intent: AssetIntent::image(),
            file: FileMeta {
                filename: "hero.png".to_string(),
                content_type: content_type.to_string(),
                file_size: size,
            },
        }
    }

    fn service(
        storage: MockStorage,
        records: InMemoryUploadRecordRepository,
    ) -> PresignedUploadService {
        PresignedUploadService::new(
            Arc::new(storage),
            Arc::new(records),
            PresignedUploadConfig {
                url_ttl: Duration::from_secs(600),
                max_upload_bytes: 1000,
                allowed_content_types: vec!["image/png".to_string()],
            },
        )
    }

    #[tokio::test]
    async fn test_issue_records_pending_upload() {
        let records = InMemoryUploadRecordRepository::new();
        let svc = service(MockStorage::new(), records.clone());
        let req = request(10, "image/png");
        let entity_id = req.entity_id;

        let before = Utc::now();
        let target = svc.issue(req).await.unwrap();

        assert!(target.upload_url.starts_with(MOCK_UPLOAD_HOST));
        assert!(target.upload_url.contains("X-Amz-Expires=600"));
        assert!(target.final_asset_url.starts_with(MOCK_PUBLIC_HOST));
        assert!(target.final_asset_url.ends_with(&format!("{}.png", target.upload_id)));
        assert!(target.expires_at >= before + chrono::Duration::seconds(600));

        let key = format!(
            "assets/projects/{}/image/{}.png",
            entity_id, target.upload_id
        );
        let record = records.find_by_key(&key).await.unwrap().unwrap();
        assert_eq!(record.status, UploadRecordStatus::Pending);
        assert_eq!(record.expected_size, 10);
    }

    #[tokio::test]
    async fn test_issue_prunes_abandoned_targets() {
        let records = InMemoryUploadRecordRepository::new();
        let svc = service(MockStorage::new(), records.clone());
        let issued_at = Utc::now() - chrono::Duration::hours(1);
        records
            .insert(UploadRecord {
                upload_id: Uuid::new_v4(),
                entity_type: EntityType::Project,
                entity_id: Uuid::new_v4(),
                intent: AssetIntent::image(),
                storage_key: "assets/projects/abandoned.png".to_string(),
                final_asset_url: format!("{}/abandoned.png", MOCK_PUBLIC_HOST),
                content_type: "image/png".to_string(),
                expected_size: 10,
                status: UploadRecordStatus::Pending,
                created_at: issued_at,
                expires_at: issued_at + chrono::Duration::minutes(10),
                completed_at: None,
                failure_reason: None,
            })
            .await
            .unwrap();

        svc.issue(request(10, "image/png")).await.unwrap();

        assert_eq!(records.len().await, 1);
        assert!(records
            .find_by_key("assets/projects/abandoned.png")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_issue_rejects_invalid_requests() {
        let records = InMemoryUploadRecordRepository::new();
        let svc = service(MockStorage::new(), records.clone());

        assert!(matches!(
            svc.issue(request(0, "image/png")).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.issue(request(1001, "image/png")).await,
            Err(AppError::PayloadTooLarge(_))
        ));
        assert!(matches!(
            svc.issue(request(10, "application/zip")).await,
            Err(AppError::InvalidInput(_))
        ));

        let mut nil = request(10, "image/png");
        nil.entity_id = Uuid::nil();
        assert!(matches!(svc.issue(nil).await, Err(AppError::InvalidInput(_))));

        assert!(records.is_empty().await);
    }

    #[tokio::test]
    async fn test_signing_failure_records_nothing() {
        let storage = MockStorage::new();
        storage.fail_signing(true);
        let records = InMemoryUploadRecordRepository::new();
        let svc = service(storage, records.clone());

        let result = svc.issue_upload_target(request(10, "image/png")).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert!(records.is_empty().await);
    }
}
