//! Domain models shared by the upload pipeline, the API client and the services.

pub mod asset;
pub mod entity;
pub mod reorder;
pub mod upload;

pub use asset::{AssetIntent, FileMeta, LocalFile};
pub use entity::EntityType;
pub use reorder::{PositionUpdate, ReorderRequest, ReorderResponse};
pub use upload::{
    CompletionStatus, UploadCompletionNotice, UploadCompletionResponse, UploadTarget,
    UploadTargetRequest,
};
