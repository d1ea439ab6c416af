//! Vitrine Services Layer
//!
//! Server-side counterparts of the upload pipeline: issuing presigned upload
//! targets, verifying completion webhooks and persisting bulk reorders. Keep
//! business rules here; keep thin HTTP handling in vitrine-api.

pub mod cleanup;
pub mod completion;
pub mod ordering;
pub mod presigned;
pub mod repository;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use cleanup::UploadCleanupService;
pub use completion::{sign_payload, UploadCompletionService, SIGNATURE_HEADER};
pub use ordering::ReorderService;
pub use presigned::{PresignedUploadConfig, PresignedUploadService};
pub use repository::{
    InMemoryPositionRepository, InMemoryUploadRecordRepository, PositionRepository,
    UploadRecord, UploadRecordRepository, UploadRecordStatus, COMPLETION_GRACE_SECS,
};
pub use vitrine_storage::{create_storage, Storage, StorageBackend, StorageError};
