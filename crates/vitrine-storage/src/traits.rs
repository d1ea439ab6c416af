//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use vitrine_core::AppError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Upload URL rejected: {0}")]
    Forbidden(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object {} not found", key)),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::Forbidden(msg) => AppError::Unauthorized(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction trait
///
/// Objects are written by clients through presigned URLs, so most backends
/// only need to sign, inspect and remove. Backends whose URLs point back at
/// the API itself also accept the signed upload and serve reads.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Generate a presigned PUT URL for a direct upload.
    async fn presigned_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Check if an object exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Size in bytes of an existing object
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Store the body of a PUT made against a URL this backend signed.
    ///
    /// Returns the number of bytes written.
    async fn accept_signed_upload(
        &self,
        storage_key: &str,
        _expires: u64,
        _signature: &str,
        _data: &[u8],
    ) -> StorageResult<u64> {
        Err(StorageError::ConfigError(format!(
            "{} uploads go to the provider, not the API ({})",
            self.backend_type(),
            storage_key
        )))
    }

    /// Read a whole object for serving through the API
    async fn read(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::ConfigError(format!(
            "{} objects are not served by the API ({})",
            self.backend_type(),
            storage_key
        )))
    }

    /// Durable public URL an object will be served from once written
    fn public_url(&self, storage_key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
