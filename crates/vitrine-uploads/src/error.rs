use vitrine_core::{AppError, ValidationError};

/// Errors surfaced by upload sessions and coordinators.
///
/// Collaborator failures keep the underlying `AppError` so callers can still
/// inspect status codes and recoverability.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("File rejected: {0}")]
    Selection(#[from] ValidationError),

    #[error("No file staged for upload")]
    NothingStaged,

    #[error("Entity must be created before its assets can be uploaded")]
    EntityNotCreated,

    #[error("Could not obtain an upload target: {0}")]
    Gateway(#[source] AppError),

    #[error("Upload failed: {0}")]
    Transport(#[source] AppError),

    #[error("Upload result discarded because a newer selection replaced it")]
    Superseded,

    #[error("Entity {operation} failed: {source}")]
    EntityMutation {
        operation: &'static str,
        #[source]
        source: AppError,
    },

    #[error("Entity was created but its id is unreadable: {0}")]
    EntityIdUnreadable(#[source] AppError),

    #[error("Saving the new order failed: {0}")]
    Reorder(#[source] AppError),

    #[error("Cannot move item {from} to {to} in a list of {len}")]
    InvalidMove { from: usize, to: usize, len: usize },

    #[error("A save is already in progress")]
    SurfaceBusy,

    #[error("The reorder surface is closed")]
    SurfaceClosed,

    #[error("Pending assets were already consumed")]
    AlreadyConsumed,

    #[error("Not available here: {0}")]
    WrongMode(String),

    #[error("Unknown asset slot '{0}'")]
    UnknownSlot(String),

    #[error("Form payload must be a JSON object, got {0}")]
    InvalidPayload(&'static str),
}

impl PipelineError {
    pub(crate) fn mutation(operation: &'static str, source: AppError) -> Self {
        PipelineError::EntityMutation { operation, source }
    }

    /// Whether re-invoking the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Gateway(_)
            | PipelineError::Transport(_)
            | PipelineError::Reorder(_)
            | PipelineError::EntityMutation { .. } => true,
            PipelineError::SurfaceBusy => true,
            _ => false,
        }
    }
}
