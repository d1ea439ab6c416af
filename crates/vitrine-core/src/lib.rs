//! Vitrine Core Library
//!
//! This crate provides the domain models, error types, configuration, file
//! validation and collaborator interfaces shared by the upload pipeline, the
//! HTTP client and the server-side services.

pub mod config;
pub mod error;
pub mod interfaces;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{ClientConfig, ServerConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use interfaces::{EntityApi, ProgressFn, ReorderApi, UploadGateway, UploadTransport};
pub use models::{
    AssetIntent, CompletionStatus, EntityType, FileMeta, LocalFile, PositionUpdate,
    ReorderRequest, ReorderResponse, UploadCompletionNotice, UploadCompletionResponse,
    UploadTarget, UploadTargetRequest,
};
pub use storage_types::StorageBackend;
pub use validation::{FileConstraints, ValidationError};
