//! Create-mode path: stage, create, upload with the new id, patch once.

use futures::future::join_all;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;
use vitrine_core::interfaces::entity_id;
use vitrine_core::{AssetIntent, LocalFile};

use crate::coordinator::{Notice, Phase, SelectOutcome, Shared, SubmitReport};
use crate::error::PipelineError;
use crate::pending::{PendingCreationState, StagedAsset};
use crate::session::{UploadRequest, UploadSession};

pub(crate) struct CreateFlow {
    phase: Phase,
    entity_id: Option<Uuid>,
    pending: PendingCreationState,
}

impl CreateFlow {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Composing,
            entity_id: None,
            pending: PendingCreationState::new(),
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn entity_id(&self) -> Option<Uuid> {
        self.entity_id
    }

    pub(crate) fn select(
        &mut self,
        shared: &mut Shared,
        intent: &AssetIntent,
        file: LocalFile,
    ) -> Result<SelectOutcome, PipelineError> {
        if self.phase != Phase::Composing {
            return Err(PipelineError::WrongMode(format!(
                "cannot stage files while {:?}",
                self.phase
            )));
        }
        let session = shared.slot(intent)?.session.clone();
        let preview_url = session.select(file.clone())?;
        self.pending
            .stage(intent.clone(), file, preview_url.clone())?;
        Ok(SelectOutcome::Staged { preview_url })
    }

    pub(crate) fn unstage(&mut self, intent: &AssetIntent) {
        self.pending.unstage(intent);
    }

    pub(crate) fn discard(&mut self) {
        self.pending.clear();
    }

    pub(crate) async fn submit(
        &mut self,
        shared: &mut Shared,
        payload: Value,
    ) -> Result<SubmitReport, PipelineError> {
        if self.phase != Phase::Composing {
            return Err(PipelineError::WrongMode(format!(
                "entity already submitted ({:?})",
                self.phase
            )));
        }
        let fields = shared.form_fields(payload)?;

        self.phase = Phase::Submitting;
        tracing::info!(
            entity_type = %shared.entity_type,
            staged = self.pending.len(),
            "Creating entity"
        );
        let entity = match shared
            .deps
            .entities
            .create(shared.entity_type, Value::Object(fields))
            .await
        {
            Ok(entity) => entity,
            Err(err) => {
                // Nothing is uploaded for an entity that does not exist.
                self.phase = Phase::Composing;
                return Err(shared.entity_failed("create", err));
            }
        };
        let id = match entity_id(&entity) {
            Ok(id) => id,
            Err(err) => {
                // The entity exists server-side, so a resubmit would duplicate it.
                tracing::error!(
                    entity_type = %shared.entity_type,
                    error = %err,
                    "Created entity has no readable id"
                );
                shared.notify(Notice::EntityIdUnreadable {
                    message: err.to_string(),
                });
                self.finish(shared);
                return Err(PipelineError::EntityIdUnreadable(err));
            }
        };
        self.entity_id = Some(id);
        shared.notify(Notice::EntityCreated { entity_id: id });

        self.phase = Phase::AttachingAssets;
        let staged = self.pending.consume()?;
        for slot in shared.slots.values() {
            slot.session.set_entity_id(id);
        }

        let mut report = SubmitReport {
            entity_id: id,
            entity,
            ..SubmitReport::default()
        };

        // Secondaries reusing a staged primary are not uploaded.
        let first_round: Vec<AssetIntent> = staged
            .keys()
            .filter(|intent| {
                shared
                    .enabled_alias_for_secondary(intent)
                    .map_or(true, |alias| !staged.contains_key(&alias.primary))
            })
            .cloned()
            .collect();
        upload_all(shared, id, &staged, &first_round, &mut report).await;

        // A failed primary falls back to the secondary's own file.
        let fallback: Vec<AssetIntent> = staged
            .keys()
            .filter(|intent| !first_round.contains(intent))
            .filter(|intent| {
                shared
                    .enabled_alias_for_secondary(intent)
                    .is_some_and(|alias| report.failed.contains_key(&alias.primary))
            })
            .cloned()
            .collect();
        if !fallback.is_empty() {
            upload_all(shared, id, &staged, &fallback, &mut report).await;
        }

        for alias in shared.aliases.clone() {
            if !alias.enabled || report.uploaded.contains_key(&alias.secondary) {
                continue;
            }
            let Some(url) = report.uploaded.get(&alias.primary).cloned() else {
                continue;
            };
            if let Ok(slot) = shared.slot(&alias.secondary) {
                slot.session.adopt_remote_url(url.clone());
            }
            report.uploaded.insert(alias.secondary.clone(), url.clone());
            shared.notify(Notice::AssetUploaded {
                intent: alias.secondary,
                url,
                reused_from: Some(alias.primary),
            });
        }

        let asset_fields: BTreeMap<String, String> = report
            .uploaded
            .iter()
            .filter_map(|(intent, url)| shared.field(intent).map(|field| (field, url.clone())))
            .collect();

        if asset_fields.is_empty() && shared.unattached.is_empty() {
            self.finish(shared);
            return Ok(report);
        }

        self.phase = Phase::Patching;
        match shared.send_patch(id, Map::new(), asset_fields).await {
            Ok((patched, attached)) => {
                report.entity = patched;
                report.attached = attached;
                self.finish(shared);
            }
            Err(err) => {
                // Uploaded URLs stay unattached until retry_attach succeeds.
                report.attach_error = Some(err.to_string());
            }
        }
        Ok(report)
    }

    pub(crate) fn finish(&mut self, shared: &mut Shared) {
        if self.phase == Phase::Done {
            return;
        }
        self.phase = Phase::Done;
        self.pending.clear();
        for slot in shared.slots.values() {
            slot.session.release_local();
        }
        if let Some(entity_id) = self.entity_id {
            tracing::info!(entity_type = %shared.entity_type, entity_id = %entity_id, "Entity saved");
        }
    }
}

/// Upload the staged files of the given slots concurrently and record every
/// outcome.
async fn upload_all(
    shared: &mut Shared,
    entity_id: Uuid,
    staged: &BTreeMap<AssetIntent, StagedAsset>,
    intents: &[AssetIntent],
    report: &mut SubmitReport,
) {
    let uploads: Vec<(UploadSession, LocalFile)> = intents
        .iter()
        .filter_map(|intent| {
            let session = shared.slots.get(intent)?.session.clone();
            let asset = staged.get(intent)?;
            tracing::debug!(intent = %intent, preview_url = %asset.preview_url, "Uploading staged file");
            Some((session, asset.file.clone()))
        })
        .collect();
    let results = join_all(uploads.into_iter().map(|(session, file)| async move {
        let request = UploadRequest {
            file: Some(file),
            ..UploadRequest::for_entity(entity_id)
        };
        let result = session.upload(request).await;
        (session.intent().clone(), result)
    }))
    .await;

    for (intent, result) in results {
        match result {
            Ok(url) => {
                report.uploaded.insert(intent.clone(), url.clone());
                shared.notify(Notice::AssetUploaded {
                    intent,
                    url,
                    reused_from: None,
                });
            }
            Err(err) => {
                let message = err.to_string();
                report.failed.insert(intent.clone(), message.clone());
                shared.notify(Notice::AssetFailed { intent, message });
            }
        }
    }
}
