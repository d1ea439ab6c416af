use std::collections::BTreeMap;
use vitrine_core::{AssetIntent, LocalFile};

use crate::error::PipelineError;

/// A file waiting for its entity to exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    pub file: LocalFile,
    pub preview_url: String,
}

/// Files staged in create mode, keyed by intent.
///
/// Consumed exactly once, right after the entity is created.
#[derive(Debug, Default)]
pub struct PendingCreationState {
    staged: BTreeMap<AssetIntent, StagedAsset>,
    consumed: bool,
}

impl PendingCreationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage or replace the file for `intent`.
    pub fn stage(
        &mut self,
        intent: AssetIntent,
        file: LocalFile,
        preview_url: String,
    ) -> Result<(), PipelineError> {
        if self.consumed {
            return Err(PipelineError::AlreadyConsumed);
        }
        self.staged.insert(intent, StagedAsset { file, preview_url });
        Ok(())
    }

    pub fn unstage(&mut self, intent: &AssetIntent) -> Option<StagedAsset> {
        self.staged.remove(intent)
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Take every staged asset. A second call fails.
    pub fn consume(&mut self) -> Result<BTreeMap<AssetIntent, StagedAsset>, PipelineError> {
        if self.consumed {
            return Err(PipelineError::AlreadyConsumed);
        }
        self.consumed = true;
        Ok(std::mem::take(&mut self.staged))
    }

    /// Drop everything staged (cancel or close).
    pub fn clear(&mut self) {
        self.staged.clear();
    }
}
