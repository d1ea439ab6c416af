//! Domain methods for the Vitrine API client.
//!
//! `ApiClient` is the entity, gateway and reorder collaborator of the upload
//! pipeline when it runs against a live server.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;
use vitrine_core::{
    AppError, EntityApi, EntityType, PositionUpdate, ReorderApi, ReorderRequest, ReorderResponse,
    UploadGateway, UploadTarget, UploadTargetRequest,
};

use crate::{api_prefix, ApiClient};

impl ApiClient {
    /// List entities of one type as returned by the API.
    pub async fn list_entities(&self, entity_type: EntityType) -> Result<Vec<Value>, AppError> {
        self.get(&format!("{}/{}", api_prefix(), entity_type.as_path()), &[])
            .await
    }

    pub async fn get_entity(&self, entity_type: EntityType, id: Uuid) -> Result<Value, AppError> {
        self.get(
            &format!("{}/{}/{}", api_prefix(), entity_type.as_path(), id),
            &[],
        )
        .await
    }

    /// Bulk reorder, returning how many rows the server updated.
    pub async fn reorder_entities(
        &self,
        entity_type: EntityType,
        items: Vec<PositionUpdate>,
    ) -> Result<ReorderResponse, AppError> {
        let body = ReorderRequest { items };
        self.send_json(
            Method::PUT,
            &format!("{}/{}/reorder", api_prefix(), entity_type.as_path()),
            Some(&body),
        )
        .await
    }
}

#[async_trait]
impl EntityApi for ApiClient {
    async fn create(&self, entity_type: EntityType, payload: Value) -> Result<Value, AppError> {
        self.post_json(&format!("{}/{}", api_prefix(), entity_type.as_path()), &payload)
            .await
    }

    async fn patch(
        &self,
        entity_type: EntityType,
        id: Uuid,
        partial: Value,
    ) -> Result<Value, AppError> {
        self.send_json(
            Method::PATCH,
            &format!("{}/{}/{}", api_prefix(), entity_type.as_path(), id),
            Some(&partial),
        )
        .await
    }
}

#[async_trait]
impl UploadGateway for ApiClient {
    async fn issue_upload_target(
        &self,
        request: UploadTargetRequest,
    ) -> Result<UploadTarget, AppError> {
        self.post_json(&format!("{}/uploads/presigned", api_prefix()), &request)
            .await
    }
}

#[async_trait]
impl ReorderApi for ApiClient {
    async fn reorder(
        &self,
        entity_type: EntityType,
        items: Vec<PositionUpdate>,
    ) -> Result<(), AppError> {
        let response = self.reorder_entities(entity_type, items).await?;
        tracing::debug!(entity_type = %entity_type, updated = response.updated, "Order saved");
        Ok(())
    }
}
