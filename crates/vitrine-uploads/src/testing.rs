//! Recording fakes for the collaborator traits

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use uuid::Uuid;
use vitrine_core::{
    AppError, AssetIntent, EntityApi, EntityType, LocalFile, PositionUpdate, ProgressFn,
    ReorderApi, UploadGateway, UploadTarget, UploadTargetRequest, UploadTransport,
};

use crate::deps::PipelineDeps;
use crate::preview::InMemoryPreviews;

pub fn png(name: &str) -> LocalFile {
    LocalFile::new(name, "image/png", vec![7u8; 16])
}

#[derive(Clone, Default)]
pub struct FakeEntityApi {
    pub creates: Arc<Mutex<Vec<(EntityType, Value)>>>,
    pub patches: Arc<Mutex<Vec<(EntityType, Uuid, Value)>>>,
    fail_create: Arc<Mutex<bool>>,
    fail_patches: Arc<Mutex<usize>>,
    created_id: Arc<Mutex<Option<Uuid>>>,
    raw_id: Arc<Mutex<Option<String>>>,
}

impl FakeEntityApi {
    pub fn fail_create(&self) {
        *self.fail_create.lock().unwrap() = true;
    }

    /// Fail the next `count` patches
    pub fn fail_patches(&self, count: usize) {
        *self.fail_patches.lock().unwrap() = count;
    }

    /// Answer creates with this `id` instead of a fresh UUID
    pub fn respond_with_id(&self, raw: &str) {
        *self.raw_id.lock().unwrap() = Some(raw.to_string());
    }

    pub fn created_id(&self) -> Option<Uuid> {
        *self.created_id.lock().unwrap()
    }

    pub fn patch_calls(&self) -> Vec<(EntityType, Uuid, Value)> {
        self.patches.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> Vec<(EntityType, Value)> {
        self.creates.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntityApi for FakeEntityApi {
    async fn create(&self, entity_type: EntityType, payload: Value) -> Result<Value, AppError> {
        self.creates.lock().unwrap().push((entity_type, payload.clone()));
        if *self.fail_create.lock().unwrap() {
            return Err(AppError::Upstream {
                status: 422,
                message: "title is required".to_string(),
            });
        }
        let mut entity = payload;
        if let Some(raw) = self.raw_id.lock().unwrap().clone() {
            entity["id"] = json!(raw);
            return Ok(entity);
        }
        let id = Uuid::new_v4();
        *self.created_id.lock().unwrap() = Some(id);
        entity["id"] = json!(id.to_string());
        Ok(entity)
    }

    async fn patch(
        &self,
        entity_type: EntityType,
        id: Uuid,
        partial: Value,
    ) -> Result<Value, AppError> {
        self.patches
            .lock()
            .unwrap()
            .push((entity_type, id, partial.clone()));
        let mut remaining = self.fail_patches.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(AppError::Transport("connection reset".to_string()));
        }
        let mut entity = partial;
        entity["id"] = json!(id.to_string());
        Ok(entity)
    }
}

#[derive(Clone, Default)]
pub struct FakeGateway {
    pub requests: Arc<Mutex<Vec<UploadTargetRequest>>>,
    failing: Arc<Mutex<HashSet<AssetIntent>>>,
}

impl FakeGateway {
    pub fn fail_for(&self, intent: AssetIntent) {
        self.failing.lock().unwrap().insert(intent);
    }

    pub fn calls(&self) -> Vec<UploadTargetRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_for(&self, intent: &AssetIntent) -> usize {
        self.calls().iter().filter(|r| &r.intent == intent).count()
    }
}

#[async_trait]
impl UploadGateway for FakeGateway {
    async fn issue_upload_target(
        &self,
        request: UploadTargetRequest,
    ) -> Result<UploadTarget, AppError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if self.failing.lock().unwrap().contains(&request.intent) {
            return Err(AppError::Upstream {
                status: 503,
                message: "gateway unavailable".to_string(),
            });
        }
        Ok(UploadTarget {
            upload_id: Uuid::new_v4(),
            upload_url: format!("https://upload.test/{}/{}", request.intent, n),
            final_asset_url: format!(
                "https://cdn.test/{}/{}/{}-{}.png",
                request.entity_type, request.entity_id, request.intent, n
            ),
            expires_at: Utc::now() + Duration::minutes(15),
        })
    }
}

#[derive(Clone, Default)]
pub struct FakeTransport {
    pub puts: Arc<Mutex<Vec<(String, String)>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl FakeTransport {
    /// Fail every PUT whose URL contains `/{intent}/`
    pub fn fail_for(&self, intent: &AssetIntent) {
        self.failing
            .lock()
            .unwrap()
            .insert(format!("/{}/", intent));
    }

    /// Hold every PUT until a permit is added to the returned semaphore
    pub fn gate(&self) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(semaphore.clone());
        semaphore
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.puts.lock().unwrap().iter().map(|(_, f)| f.clone()).collect()
    }
}

#[async_trait]
impl UploadTransport for FakeTransport {
    async fn put(
        &self,
        upload_url: &str,
        file: &LocalFile,
        on_progress: ProgressFn,
    ) -> Result<(), AppError> {
        self.puts
            .lock()
            .unwrap()
            .push((upload_url.to_string(), file.filename.clone()));
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        on_progress(50);
        let fail = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|marker| upload_url.contains(marker.as_str()));
        if fail {
            return Err(AppError::Transport("connection reset by peer".to_string()));
        }
        on_progress(100);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeReorderApi {
    pub calls: Arc<Mutex<Vec<(EntityType, Vec<PositionUpdate>)>>>,
    fail: Arc<Mutex<bool>>,
    gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl FakeReorderApi {
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn gate(&self) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(semaphore.clone());
        semaphore
    }

    pub fn calls(&self) -> Vec<(EntityType, Vec<PositionUpdate>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReorderApi for FakeReorderApi {
    async fn reorder(
        &self,
        entity_type: EntityType,
        items: Vec<PositionUpdate>,
    ) -> Result<(), AppError> {
        self.calls.lock().unwrap().push((entity_type, items));
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        if *self.fail.lock().unwrap() {
            return Err(AppError::Upstream {
                status: 500,
                message: "database unavailable".to_string(),
            });
        }
        Ok(())
    }
}

pub struct Fakes {
    pub entities: FakeEntityApi,
    pub gateway: FakeGateway,
    pub transport: FakeTransport,
    pub previews: Arc<InMemoryPreviews>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            entities: FakeEntityApi::default(),
            gateway: FakeGateway::default(),
            transport: FakeTransport::default(),
            previews: Arc::new(InMemoryPreviews::new()),
        }
    }

    pub fn deps(&self) -> PipelineDeps {
        PipelineDeps::new(
            Arc::new(self.entities.clone()),
            Arc::new(self.gateway.clone()),
            Arc::new(self.transport.clone()),
            self.previews.clone(),
        )
    }
}
