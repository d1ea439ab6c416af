//! Test helpers
//!
//! In-memory `Storage` double shared by unit tests here and the API
//! integration tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vitrine_storage::{validate_key, Storage, StorageBackend, StorageError, StorageResult};

pub const MOCK_UPLOAD_HOST: &str = "https://uploads.storage.test";
pub const MOCK_PUBLIC_HOST: &str = "https://cdn.storage.test";

/// Storage double recording object sizes by key
#[derive(Clone, Default)]
pub struct MockStorage {
    objects: Arc<Mutex<HashMap<String, u64>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    fail_signing: Arc<Mutex<bool>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a client PUT of `size` bytes.
    pub fn put_object(&self, key: &str, size: u64) {
        self.objects.lock().unwrap().insert(key.to_string(), size);
    }

    pub fn has_object(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_signing(&self, fail: bool) {
        *self.fail_signing.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;
        if *self.fail_signing.lock().unwrap() {
            return Err(StorageError::BackendError("signing unavailable".to_string()));
        }
        Ok(format!(
            "{}/{}?X-Amz-Expires={}&X-Amz-Signature=mock",
            MOCK_UPLOAD_HOST,
            storage_key,
            expires_in.as_secs()
        ))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.has_object(storage_key))
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .copied()
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(storage_key);
        self.deleted.lock().unwrap().push(storage_key.to_string());
        Ok(())
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("{}/{}", MOCK_PUBLIC_HOST, storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
