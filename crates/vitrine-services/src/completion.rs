//! Upload completion webhook
//!
//! The storage provider (or an edge function in front of it) posts a signed
//! `UploadCompletionNotice` once an object is written. The notice is checked
//! against the pending upload record and the object itself before the asset
//! URL is considered durable.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use vitrine_core::{
    AppError, CompletionStatus, UploadCompletionNotice, UploadCompletionResponse,
};
use vitrine_storage::Storage;

use crate::repository::{UploadRecordRepository, UploadRecordStatus};

/// Header carrying hex(HMAC-SHA256(secret, body))
pub const SIGNATURE_HEADER: &str = "x-vitrine-signature";

type HmacSha256 = Hmac<Sha256>;

/// Hex encoded HMAC-SHA256 of `body`
pub fn sign_payload(secret: &[u8], body: &[u8]) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(format!("Invalid signing secret: {}", e)))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub struct UploadCompletionService {
    storage: Arc<dyn Storage>,
    records: Arc<dyn UploadRecordRepository>,
    signing_secret: Vec<u8>,
}

impl UploadCompletionService {
    pub fn new(
        storage: Arc<dyn Storage>,
        records: Arc<dyn UploadRecordRepository>,
        signing_secret: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            storage,
            records,
            signing_secret: signing_secret.into(),
        }
    }

    pub fn verify_signature(&self, body: &[u8], signature: Option<&str>) -> Result<(), AppError> {
        let provided = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;

        let expected = sign_payload(&self.signing_secret, body)?;
        let provided = provided.to_ascii_lowercase();
        if expected.len() != provided.len()
            || !bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
        {
            return Err(AppError::Unauthorized(
                "Invalid webhook signature".to_string(),
            ));
        }
        Ok(())
    }

    /// Verify the signature over the raw body, then process the notice.
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<UploadCompletionResponse, AppError> {
        self.verify_signature(body, signature)?;
        let notice: UploadCompletionNotice = serde_json::from_slice(body)?;
        self.complete(notice).await
    }

    #[tracing::instrument(skip(self, notice), fields(key = %notice.key, size = notice.size))]
    pub async fn complete(
        &self,
        notice: UploadCompletionNotice,
    ) -> Result<UploadCompletionResponse, AppError> {
        let record = self
            .records
            .find_by_key(&notice.key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No upload issued for {}", notice.key)))?;

        match record.status {
            UploadRecordStatus::Completed => {
                tracing::debug!(upload_id = %record.upload_id, "Upload already verified");
                return Ok(UploadCompletionResponse {
                    upload_id: record.upload_id,
                    status: CompletionStatus::AlreadyVerified,
                    final_asset_url: record.final_asset_url,
                });
            }
            UploadRecordStatus::Failed => {
                return Err(AppError::Conflict(format!(
                    "Upload {} was rejected: {}",
                    record.upload_id,
                    record.failure_reason.unwrap_or_default()
                )));
            }
            UploadRecordStatus::Pending => {}
        }

        let now = Utc::now();
        if !record.accepts_completion_at(now) {
            let reason = format!("upload target expired at {}", record.expires_at);
            tracing::warn!(
                upload_id = %record.upload_id,
                storage_key = %record.storage_key,
                "Completion arrived after the upload target expired"
            );
            self.records
                .mark_failed(record.upload_id, reason.clone())
                .await?;
            if let Err(e) = self.storage.delete(&record.storage_key).await {
                tracing::debug!(error = %e, storage_key = %record.storage_key, "No expired object to delete");
            }
            return Err(AppError::Conflict(format!(
                "Upload {} rejected: {}",
                record.upload_id, reason
            )));
        }

        // Not written yet. Leave the record pending so the provider can retry.
        if !self.storage.exists(&record.storage_key).await? {
            return Err(AppError::NotFound(format!(
                "Object {} not found in storage",
                record.storage_key
            )));
        }

        let stored_size = self.storage.content_length(&record.storage_key).await?;
        if stored_size != record.expected_size || notice.size != record.expected_size {
            let reason = format!(
                "expected {} bytes, notice reported {}, storage holds {}",
                record.expected_size, notice.size, stored_size
            );
            tracing::warn!(
                upload_id = %record.upload_id,
                storage_key = %record.storage_key,
                reason = %reason,
                "Upload size mismatch, discarding object"
            );
            self.records
                .mark_failed(record.upload_id, reason.clone())
                .await?;
            if let Err(e) = self.storage.delete(&record.storage_key).await {
                tracing::error!(error = %e, storage_key = %record.storage_key, "Failed to delete rejected object");
            }
            return Err(AppError::Conflict(format!("Upload size mismatch: {}", reason)));
        }

        let completed = self
            .records
            .mark_completed(record.upload_id, now)
            .await?;

        tracing::info!(
            upload_id = %completed.upload_id,
            entity_type = %completed.entity_type,
            entity_id = %completed.entity_id,
            intent = %completed.intent,
            etag = ?notice.etag,
            "Upload verified"
        );

        Ok(UploadCompletionResponse {
            upload_id: completed.upload_id,
            status: CompletionStatus::Verified,
            final_asset_url: completed.final_asset_url,
        })
    }

    /// Whether an asset URL belongs to a verified upload.
    pub async fn is_durable(&self, final_asset_url: &str) -> Result<bool, AppError> {
        Ok(self
            .records
            .find_by_url(final_asset_url)
            .await?
            .map(|r| r.status == UploadRecordStatus::Completed)
            .unwrap_or(false))
    }
}
