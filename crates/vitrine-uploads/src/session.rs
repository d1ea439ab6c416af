//! Upload session
//!
//! One session tracks one asset slot of one entity: the staged local file and
//! its preview, the upload in flight, and the durable URL once the upload
//! succeeded. Sessions are cheap handles; clones observe the same state.
//!
//! Every `select` and `clear` bumps the session generation. An upload started
//! under an older generation cannot write its outcome back, so the most
//! recent selection always wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use uuid::Uuid;
use vitrine_core::{
    AssetIntent, EntityType, FileConstraints, LocalFile, ProgressFn, UploadGateway,
    UploadTargetRequest, UploadTransport,
};

use crate::deps::PipelineDeps;
use crate::error::PipelineError;
use crate::preview::{PreviewFactory, PreviewHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Idle,
    Staged,
    Uploading,
    Complete,
    Error,
}

/// Observable state of a session, published on every transition.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SessionSnapshot {
    pub intent: AssetIntent,
    pub status: UploadStatus,
    pub progress: u8,
    /// What the UI should show for this slot
    pub display_url: Option<String>,
    pub remote_url: Option<String>,
    pub last_error: Option<String>,
    pub has_file: bool,
}

/// Arguments of [`UploadSession::upload`]. Unset fields fall back to the
/// session's own file, entity id and intent.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file: Option<LocalFile>,
    pub entity_id: Option<Uuid>,
    pub intent: Option<AssetIntent>,
}

impl UploadRequest {
    pub fn for_entity(entity_id: Uuid) -> Self {
        Self {
            entity_id: Some(entity_id),
            ..Self::default()
        }
    }
}

type CompletionCallback = Arc<dyn Fn(&AssetIntent, &str) + Send + Sync>;

struct SessionState {
    entity_id: Option<Uuid>,
    file: Option<LocalFile>,
    preview: Option<PreviewHandle>,
    remote_url: Option<String>,
    status: UploadStatus,
    progress: u8,
    last_error: Option<String>,
    generation: u64,
}

impl SessionState {
    fn display_url(&self) -> Option<String> {
        let preview = self.preview.as_ref().map(|p| p.url().to_string());
        match self.status {
            UploadStatus::Staged | UploadStatus::Uploading => preview.or_else(|| self.remote_url.clone()),
            UploadStatus::Error => self.remote_url.clone().or(preview),
            UploadStatus::Idle | UploadStatus::Complete => self.remote_url.clone(),
        }
    }
}

struct SessionInner {
    entity_type: EntityType,
    intent: AssetIntent,
    constraints: FileConstraints,
    gateway: Arc<dyn UploadGateway>,
    transport: Arc<dyn UploadTransport>,
    previews: Arc<dyn PreviewFactory>,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
    on_complete: Mutex<Option<CompletionCallback>>,
}

impl SessionInner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, state: &SessionState) -> SessionSnapshot {
        SessionSnapshot {
            intent: self.intent.clone(),
            status: state.status,
            progress: state.progress,
            display_url: state.display_url(),
            remote_url: state.remote_url.clone(),
            last_error: state.last_error.clone(),
            has_file: state.file.is_some(),
        }
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(self.snapshot(state));
    }

    fn report_progress(&self, generation: u64, percent: u8) {
        let state = &mut *self.lock();
        if state.generation != generation || state.status != UploadStatus::Uploading {
            return;
        }
        let percent = percent.min(100);
        if percent > state.progress {
            state.progress = percent;
            self.publish(state);
        }
    }
}

/// Per-slot upload lifecycle handle
#[derive(Clone)]
pub struct UploadSession {
    inner: Arc<SessionInner>,
}

impl UploadSession {
    pub fn new(
        entity_type: EntityType,
        intent: AssetIntent,
        constraints: FileConstraints,
        deps: &PipelineDeps,
    ) -> Self {
        let state = SessionState {
            entity_id: None,
            file: None,
            preview: None,
            remote_url: None,
            status: UploadStatus::Idle,
            progress: 0,
            last_error: None,
            generation: 0,
        };
        let initial = SessionSnapshot {
            intent: intent.clone(),
            status: UploadStatus::Idle,
            progress: 0,
            display_url: None,
            remote_url: None,
            last_error: None,
            has_file: false,
        };
        let (updates, _) = watch::channel(initial);
        Self {
            inner: Arc::new(SessionInner {
                entity_type,
                intent,
                constraints,
                gateway: deps.gateway.clone(),
                transport: deps.transport.clone(),
                previews: deps.previews.clone(),
                state: Mutex::new(state),
                updates,
                on_complete: Mutex::new(None),
            }),
        }
    }

    pub fn with_entity_id(self, entity_id: Uuid) -> Self {
        self.set_entity_id(entity_id);
        self
    }

    /// Start from an asset the entity already has.
    pub fn with_remote_url(self, url: impl Into<String>) -> Self {
        {
            let state = &mut *self.inner.lock();
            state.remote_url = Some(url.into());
            self.inner.publish(state);
        }
        self
    }

    /// Called with the new URL after every successful upload.
    pub fn on_complete<F>(self, callback: F) -> Self
    where
        F: Fn(&AssetIntent, &str) + Send + Sync + 'static,
    {
        *self
            .inner
            .on_complete
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
        self
    }

    pub fn set_entity_id(&self, entity_id: Uuid) {
        self.inner.lock().entity_id = Some(entity_id);
    }

    pub fn entity_type(&self) -> EntityType {
        self.inner.entity_type
    }

    pub fn intent(&self) -> &AssetIntent {
        &self.inner.intent
    }

    pub fn entity_id(&self) -> Option<Uuid> {
        self.inner.lock().entity_id
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.updates.borrow().clone()
    }

    pub fn status(&self) -> UploadStatus {
        self.inner.lock().status
    }

    pub fn progress(&self) -> u8 {
        self.inner.lock().progress
    }

    pub fn remote_url(&self) -> Option<String> {
        self.inner.lock().remote_url.clone()
    }

    pub fn preview_url(&self) -> Option<String> {
        self.inner
            .lock()
            .preview
            .as_ref()
            .map(|p| p.url().to_string())
    }

    pub fn display_url(&self) -> Option<String> {
        self.inner.lock().display_url()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    pub fn has_file(&self) -> bool {
        self.inner.lock().file.is_some()
    }

    /// Receiver that sees every state transition
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Stage a local file. Rejected files leave the session untouched.
    ///
    /// Returns the preview URL of the new file.
    pub fn select(&self, file: LocalFile) -> Result<String, PipelineError> {
        self.inner.constraints.validate(&file)?;

        let state = &mut *self.inner.lock();
        // Release the old preview before minting the next one.
        drop(state.preview.take());
        let preview = PreviewHandle::create(self.inner.previews.clone(), &file);
        let preview_url = preview.url().to_string();

        tracing::debug!(
            intent = %self.inner.intent,
            filename = %file.filename,
            size = file.size(),
            "File staged"
        );

        state.preview = Some(preview);
        state.file = Some(file);
        state.status = UploadStatus::Staged;
        state.progress = 0;
        state.last_error = None;
        state.generation += 1;
        self.inner.publish(state);
        Ok(preview_url)
    }

    /// Request a target, transfer the staged file and record the outcome.
    ///
    /// Failures are recorded on the session (status `Error`) and returned;
    /// the staged file is kept so the caller can retry explicitly.
    pub async fn upload(&self, request: UploadRequest) -> Result<String, PipelineError> {
        let prepared = self.prepare_upload(request)?;
        let outcome = prepared.execute().await;
        self.apply_outcome(outcome)
    }

    /// First half of an upload: validates, snapshots what to send and marks
    /// the session `Uploading`.
    pub fn prepare_upload(&self, request: UploadRequest) -> Result<PreparedUpload, PipelineError> {
        if let Some(file) = request.file {
            // The file already staged keeps its preview.
            let already_staged = self.inner.lock().file.as_ref() == Some(&file);
            if !already_staged {
                self.select(file)?;
            }
        }

        let state = &mut *self.inner.lock();
        let file = state.file.clone().ok_or(PipelineError::NothingStaged)?;
        let entity_id = request
            .entity_id
            .or(state.entity_id)
            .ok_or(PipelineError::EntityNotCreated)?;
        state.entity_id = Some(entity_id);

        state.generation += 1;
        state.status = UploadStatus::Uploading;
        state.progress = 0;
        state.last_error = None;
        self.inner.publish(state);

        Ok(PreparedUpload {
            session: self.clone(),
            generation: state.generation,
            entity_id,
            intent: request.intent.unwrap_or_else(|| self.inner.intent.clone()),
            file,
        })
    }

    /// Last half of an upload: writes the outcome back unless a newer
    /// selection or upload superseded it.
    pub fn apply_outcome(&self, outcome: UploadOutcome) -> Result<String, PipelineError> {
        let released;
        let result = {
            let state = &mut *self.inner.lock();
            if state.generation != outcome.generation {
                tracing::debug!(
                    intent = %self.inner.intent,
                    "Dropping outcome of superseded upload"
                );
                return Err(PipelineError::Superseded);
            }

            match outcome.result {
                Ok(url) => {
                    released = state.preview.take();
                    state.file = None;
                    state.remote_url = Some(url.clone());
                    state.status = UploadStatus::Complete;
                    state.progress = 100;
                    state.last_error = None;
                    self.inner.publish(state);
                    Ok(url)
                }
                Err(err) => {
                    released = None;
                    state.status = UploadStatus::Error;
                    state.last_error = Some(err.to_string());
                    self.inner.publish(state);
                    Err(err)
                }
            }
        };
        drop(released);

        match &result {
            Ok(url) => {
                tracing::info!(intent = %self.inner.intent, url = %url, "Upload complete");
                let callback = self
                    .inner
                    .on_complete
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                if let Some(callback) = callback {
                    callback(&self.inner.intent, url);
                }
            }
            Err(err) => {
                tracing::warn!(intent = %self.inner.intent, error = %err, "Upload failed");
            }
        }
        result
    }

    /// Mark the slot complete with a URL produced by another slot.
    pub fn adopt_remote_url(&self, url: impl Into<String>) {
        let released = {
            let state = &mut *self.inner.lock();
            let released = state.preview.take();
            state.file = None;
            state.remote_url = Some(url.into());
            state.status = UploadStatus::Complete;
            state.progress = 100;
            state.last_error = None;
            state.generation += 1;
            self.inner.publish(state);
            released
        };
        drop(released);
    }

    /// Drop the local file and preview but keep status, error and remote URL.
    pub fn release_local(&self) {
        let released = {
            let state = &mut *self.inner.lock();
            let released = state.preview.take();
            state.file = None;
            self.inner.publish(state);
            released
        };
        drop(released);
    }

    /// Reset to the initial state. Safe to call any number of times.
    pub fn clear(&self) {
        let released = {
            let state = &mut *self.inner.lock();
            let released = state.preview.take();
            state.file = None;
            state.remote_url = None;
            state.status = UploadStatus::Idle;
            state.progress = 0;
            state.last_error = None;
            state.generation += 1;
            self.inner.publish(state);
            released
        };
        drop(released);
    }
}

impl std::fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSession")
            .field("entity_type", &self.inner.entity_type)
            .field("intent", &self.inner.intent)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// An upload that has been prepared but not yet sent
pub struct PreparedUpload {
    session: UploadSession,
    generation: u64,
    entity_id: Uuid,
    intent: AssetIntent,
    file: LocalFile,
}

/// Result of [`PreparedUpload::execute`], tagged with the generation it
/// was started under.
pub struct UploadOutcome {
    generation: u64,
    result: Result<String, PipelineError>,
}

impl PreparedUpload {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[tracing::instrument(
        skip(self),
        fields(
            entity_type = %self.session.inner.entity_type,
            entity_id = %self.entity_id,
            intent = %self.intent,
            filename = %self.file.filename
        )
    )]
    pub async fn execute(self) -> UploadOutcome {
        let inner = self.session.inner.clone();
        let request = UploadTargetRequest {
            entity_type: inner.entity_type,
            entity_id: self.entity_id,
            intent: self.intent.clone(),
            file: self.file.meta(),
        };

        let result: Result<String, PipelineError> = async {
            let target = inner
                .gateway
                .issue_upload_target(request)
                .await
                .map_err(PipelineError::Gateway)?;

            let generation = self.generation;
            let progress_inner = inner.clone();
            let on_progress: ProgressFn =
                Arc::new(move |percent| progress_inner.report_progress(generation, percent));

            inner
                .transport
                .put(&target.upload_url, &self.file, on_progress)
                .await
                .map_err(PipelineError::Transport)?;

            Ok(target.final_asset_url)
        }
        .await;

        UploadOutcome {
            generation: self.generation,
            result,
        }
    }
}
