//! Vitrine Storage Library
//!
//! Storage abstraction used by the upload gateway and the completion webhook.
//! The gateway hands out presigned PUT URLs and the webhook checks the written
//! object afterwards. With S3 the bytes never pass through the API; the local
//! backend signs URLs that the API itself accepts.
//!
//! # Storage key format
//!
//! `assets/{entity_type}/{entity_id}/{intent}/{upload_id}.{ext}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;
#[cfg(feature = "storage-local")]
pub mod upload_token;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{asset_key, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
pub use vitrine_core::StorageBackend;
