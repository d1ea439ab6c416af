//! Vitrine Uploads
//!
//! Client-side orchestration for admin forms: per-slot upload sessions, the
//! create/edit entity coordinator that defers uploads until the entity exists,
//! and the reorder coordinator that persists a new list order in one request.
//!
//! All network access goes through the collaborator traits in
//! `vitrine_core::interfaces`, bundled in [`PipelineDeps`].

pub mod coordinator;
mod create_flow;
pub mod deps;
mod edit_flow;
pub mod error;
pub mod pending;
pub mod preview;
pub mod reorder;
pub mod session;

#[cfg(test)]
mod testing;

pub use coordinator::{
    AssetAlias, AssetSlot, CoordinatorMode, EntityCreationCoordinator, Notice, Phase,
    SelectOutcome, SubmitReport,
};
pub use deps::PipelineDeps;
pub use error::PipelineError;
pub use pending::{PendingCreationState, StagedAsset};
pub use preview::{InMemoryPreviews, PreviewFactory, PreviewHandle};
pub use reorder::{CommitOutcome, Orderable, OrderableItem, ReorderCoordinator, SurfaceState};
pub use session::{SessionSnapshot, UploadRequest, UploadSession, UploadStatus};
