//! Collaborator interfaces
//!
//! The upload pipeline talks to the outside world only through these traits.
//! The HTTP client implements them against a running API; the services crate
//! implements the gateway in-process; tests use recording fakes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{EntityType, LocalFile, PositionUpdate, UploadTarget, UploadTargetRequest};

/// Progress callback, receives a percentage in `0..=100`.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Entity CRUD collaborator
#[async_trait]
pub trait EntityApi: Send + Sync {
    /// Create an entity. The returned representation must contain an `id`.
    async fn create(&self, entity_type: EntityType, payload: Value) -> Result<Value, AppError>;

    /// Partially update an entity
    async fn patch(
        &self,
        entity_type: EntityType,
        id: Uuid,
        partial: Value,
    ) -> Result<Value, AppError>;
}

/// Issues short-lived write destinations for a single asset
#[async_trait]
pub trait UploadGateway: Send + Sync {
    async fn issue_upload_target(
        &self,
        request: UploadTargetRequest,
    ) -> Result<UploadTarget, AppError>;
}

/// Transfers file bytes to a presigned URL
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn put(
        &self,
        upload_url: &str,
        file: &LocalFile,
        on_progress: ProgressFn,
    ) -> Result<(), AppError>;
}

/// Bulk position update for one entity type
#[async_trait]
pub trait ReorderApi: Send + Sync {
    async fn reorder(
        &self,
        entity_type: EntityType,
        items: Vec<PositionUpdate>,
    ) -> Result<(), AppError>;
}

/// Extract the `id` field of an entity representation.
pub fn entity_id(value: &Value) -> Result<Uuid, AppError> {
    let raw = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Upstream {
            status: 200,
            message: "entity response is missing an id".to_string(),
        })?;
    Ok(Uuid::parse_str(raw)?)
}
