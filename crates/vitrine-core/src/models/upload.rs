use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AssetIntent, EntityType, FileMeta};

/// Request for a presigned upload destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTargetRequest {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub intent: AssetIntent,
    #[serde(flatten)]
    pub file: FileMeta,
}

/// Short-lived write destination issued by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    /// Upload ID (used by the completion webhook)
    pub upload_id: Uuid,
    /// Presigned URL the client PUTs the file to
    pub upload_url: String,
    /// Durable URL of the asset once the upload succeeded
    pub final_asset_url: String,
    /// URL expiration time
    pub expires_at: DateTime<Utc>,
}

impl UploadTarget {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Storage provider notification that an object was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCompletionNotice {
    /// Storage key of the written object
    pub key: String,
    /// Object size reported by the provider
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Verified,
    AlreadyVerified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadCompletionResponse {
    pub upload_id: Uuid,
    pub status: CompletionStatus,
    pub final_asset_url: String,
}
