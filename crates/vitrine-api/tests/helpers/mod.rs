//! Test helpers: build AppState and router over in-memory storage.
//!
//! Run from workspace root: `cargo test -p vitrine-api`.

#![allow(dead_code)]

use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use vitrine_api::constants;
use vitrine_api::setup::routes;
use vitrine_api::state::AppState;
use vitrine_core::{ServerConfig, StorageBackend};
use vitrine_services::test_helpers::{MockStorage, MOCK_PUBLIC_HOST};
use vitrine_services::sign_payload;
#[cfg(feature = "storage-local")]
use vitrine_storage::LocalStorage;

pub const TEST_SIGNING_SECRET: &str = "test-webhook-secret-0123456789abcdef";

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        server_port: 0,
        environment: "test".to_string(),
        cors_origins: vec!["*".to_string()],
        storage_backend: StorageBackend::S3,
        s3_bucket: Some("vitrine-test".to_string()),
        s3_region: Some("us-east-1".to_string()),
        s3_endpoint: None,
        local_storage_path: None,
        local_storage_base_url: None,
        upload_url_ttl_secs: 900,
        max_upload_bytes: 1024 * 1024,
        allowed_content_types: vec!["image/png".to_string(), "image/jpeg".to_string()],
        webhook_signing_secret: TEST_SIGNING_SECRET.to_string(),
        position_seed_path: None,
    }
}

/// Test application: server plus the storage double behind it.
pub struct TestApp {
    pub server: TestServer,
    pub storage: MockStorage,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub async fn setup_test_app() -> TestApp {
    let config = test_config();
    let storage = MockStorage::new();
    let state = Arc::new(AppState::new(config.clone(), Arc::new(storage.clone())));
    let router = routes::setup_routes(&config, state.clone()).expect("build routes");
    let server = TestServer::new(router).expect("start test server");
    TestApp {
        server,
        storage,
        state,
    }
}

pub const LOCAL_MEDIA_URL: &str = "http://localhost:3000/media";

/// Test application over the local filesystem backend.
#[cfg(feature = "storage-local")]
pub struct LocalTestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    _dir: tempfile::TempDir,
}

#[cfg(feature = "storage-local")]
pub async fn setup_local_test_app() -> LocalTestApp {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let config = ServerConfig {
        storage_backend: StorageBackend::Local,
        s3_bucket: None,
        s3_region: None,
        local_storage_path: Some(dir.path().display().to_string()),
        local_storage_base_url: Some(LOCAL_MEDIA_URL.to_string()),
        max_upload_bytes: 64,
        ..test_config()
    };
    let storage = LocalStorage::new(
        dir.path(),
        LOCAL_MEDIA_URL.to_string(),
        TEST_SIGNING_SECRET.as_bytes(),
    )
    .await
    .expect("local storage");
    let state = Arc::new(AppState::new(config.clone(), Arc::new(storage)));
    let router = routes::setup_routes(&config, state.clone()).expect("build routes");
    let server = TestServer::new(router).expect("start test server");
    LocalTestApp {
        server,
        state,
        _dir: dir,
    }
}

/// Path and query pairs of a signed local upload URL.
pub fn split_upload_url(upload_url: &str) -> (String, Vec<(String, String)>) {
    let rest = upload_url
        .strip_prefix("http://localhost:3000")
        .expect("local upload URL");
    let (path, query) = rest.split_once('?').expect("signed query");
    let params = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    (path.to_string(), params)
}

pub fn upload_request(entity_id: Uuid, file_size: u64, content_type: &str) -> Value {
    json!({
        "entity_type": "projects",
        "entity_id": entity_id,
        "intent": "image",
        "file": {
            "filename": "hero.png",
            "content_type": content_type,
            "file_size": file_size,
        }
    })
}

/// Storage key behind a final asset URL issued by the mock backend.
pub fn storage_key(final_asset_url: &str) -> String {
    final_asset_url
        .trim_start_matches(MOCK_PUBLIC_HOST)
        .trim_start_matches('/')
        .to_string()
}

pub fn signed(body: &Value) -> (Vec<u8>, String) {
    let raw = serde_json::to_vec(body).expect("serialize notice");
    let signature = sign_payload(TEST_SIGNING_SECRET.as_bytes(), &raw).expect("sign notice");
    (raw, signature)
}
