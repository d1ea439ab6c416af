//! Entity creation coordinator
//!
//! Forms that create or edit an entity with asset slots go through one
//! coordinator. The mode is fixed at construction:
//!
//! * create: files are only staged. On submit the entity is created first,
//!   staged files are uploaded concurrently with the new id, and all obtained
//!   URLs are attached with a single patch.
//! * edit: a selected file is uploaded right away and the entity is patched
//!   with that slot's URL as soon as the upload succeeds.
//!
//! Partial outcomes are reported as separate [`Notice`]s.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;
use vitrine_core::{AppError, AssetIntent, EntityType, FileConstraints, LocalFile};

use crate::create_flow::CreateFlow;
use crate::deps::PipelineDeps;
use crate::edit_flow::EditFlow;
use crate::error::PipelineError;
use crate::session::UploadSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorMode {
    Create,
    Edit { entity_id: Uuid },
}

/// Create-mode progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Composing,
    Submitting,
    AttachingAssets,
    Patching,
    Done,
}

/// An asset slot of the form and the entity field its URL is written to
#[derive(Debug, Clone)]
pub struct AssetSlot {
    pub intent: AssetIntent,
    pub field: String,
    pub constraints: FileConstraints,
}

impl AssetSlot {
    pub fn new(intent: AssetIntent, field: impl Into<String>, constraints: FileConstraints) -> Self {
        Self {
            intent,
            field: field.into(),
            constraints,
        }
    }
}

/// "Use the primary asset for the secondary slot too"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetAlias {
    pub primary: AssetIntent,
    pub secondary: AssetIntent,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    EntityCreated {
        entity_id: Uuid,
    },
    EntityUpdated {
        entity_id: Uuid,
    },
    EntityFailed {
        operation: &'static str,
        message: String,
    },
    /// The entity was created but its id could not be read back
    EntityIdUnreadable {
        message: String,
    },
    AssetUploaded {
        intent: AssetIntent,
        url: String,
        /// Set when the URL was reused from another slot instead of uploaded
        reused_from: Option<AssetIntent>,
    },
    AssetFailed {
        intent: AssetIntent,
        message: String,
    },
    AssetsAttached {
        fields: Vec<String>,
    },
    AttachFailed {
        fields: Vec<String>,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Create mode: kept locally until the entity exists
    Staged { preview_url: String },
    /// Edit mode: uploaded and patched onto the entity
    Uploaded { url: String, patched: Vec<String> },
    /// Edit mode: the primary's URL was reused, nothing was uploaded
    Reused {
        url: String,
        from: AssetIntent,
        patched: Vec<String>,
    },
}

/// What a submit achieved. Creation can succeed while some assets fail.
#[derive(Debug, Clone, Default)]
pub struct SubmitReport {
    pub entity_id: Uuid,
    pub entity: Value,
    pub uploaded: BTreeMap<AssetIntent, String>,
    pub failed: BTreeMap<AssetIntent, String>,
    /// Entity fields written by the asset patch
    pub attached: Vec<String>,
    pub attach_error: Option<String>,
}

impl SubmitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.attach_error.is_none()
    }
}

pub(crate) struct Slot {
    pub(crate) field: String,
    pub(crate) session: UploadSession,
}

/// State both flows work on
pub(crate) struct Shared {
    pub(crate) entity_type: EntityType,
    pub(crate) deps: PipelineDeps,
    pub(crate) slots: BTreeMap<AssetIntent, Slot>,
    pub(crate) aliases: Vec<AssetAlias>,
    pub(crate) notices: Vec<Notice>,
    /// Uploaded URLs not yet written to the entity, by field
    pub(crate) unattached: BTreeMap<String, String>,
}

impl Shared {
    pub(crate) fn slot(&self, intent: &AssetIntent) -> Result<&Slot, PipelineError> {
        self.slots
            .get(intent)
            .ok_or_else(|| PipelineError::UnknownSlot(intent.to_string()))
    }

    pub(crate) fn field(&self, intent: &AssetIntent) -> Option<String> {
        self.slots.get(intent).map(|s| s.field.clone())
    }

    pub(crate) fn enabled_alias_for_secondary(&self, intent: &AssetIntent) -> Option<AssetAlias> {
        self.aliases
            .iter()
            .find(|a| a.enabled && &a.secondary == intent)
            .cloned()
    }

    pub(crate) fn enabled_aliases_for_primary(&self, intent: &AssetIntent) -> Vec<AssetAlias> {
        self.aliases
            .iter()
            .filter(|a| a.enabled && &a.primary == intent)
            .cloned()
            .collect()
    }

    /// Form fields as a JSON object, without any asset slot field.
    pub(crate) fn form_fields(&self, payload: Value) -> Result<Map<String, Value>, PipelineError> {
        let mut fields = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            Value::Bool(_) => return Err(PipelineError::InvalidPayload("a boolean")),
            Value::Number(_) => return Err(PipelineError::InvalidPayload("a number")),
            Value::String(_) => return Err(PipelineError::InvalidPayload("a string")),
            Value::Array(_) => return Err(PipelineError::InvalidPayload("an array")),
        };
        for slot in self.slots.values() {
            fields.remove(&slot.field);
        }
        Ok(fields)
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        match &notice {
            Notice::EntityFailed { .. }
            | Notice::EntityIdUnreadable { .. }
            | Notice::AssetFailed { .. }
            | Notice::AttachFailed { .. } => {
                tracing::warn!(entity_type = %self.entity_type, notice = ?notice, "Pipeline notice")
            }
            _ => tracing::info!(entity_type = %self.entity_type, notice = ?notice, "Pipeline notice"),
        }
        self.notices.push(notice);
    }

    /// Patch the entity with `payload` plus any URLs left unattached by an
    /// earlier failed patch. Returns the entity and the asset fields written.
    pub(crate) async fn send_patch(
        &mut self,
        entity_id: Uuid,
        mut payload: Map<String, Value>,
        asset_fields: BTreeMap<String, String>,
    ) -> Result<(Value, Vec<String>), PipelineError> {
        let mut pending = self.unattached.clone();
        pending.extend(asset_fields);
        for (field, url) in &pending {
            payload.insert(field.clone(), Value::String(url.clone()));
        }
        let fields: Vec<String> = pending.keys().cloned().collect();

        tracing::debug!(
            entity_type = %self.entity_type,
            entity_id = %entity_id,
            fields = ?payload.keys().collect::<Vec<_>>(),
            "Patching entity"
        );

        match self
            .deps
            .entities
            .patch(self.entity_type, entity_id, Value::Object(payload))
            .await
        {
            Ok(entity) => {
                self.unattached.clear();
                if !fields.is_empty() {
                    self.notify(Notice::AssetsAttached {
                        fields: fields.clone(),
                    });
                }
                Ok((entity, fields))
            }
            Err(err) => {
                self.unattached = pending;
                if !fields.is_empty() {
                    self.notify(Notice::AttachFailed {
                        fields,
                        message: err.to_string(),
                    });
                }
                Err(PipelineError::mutation("patch", err))
            }
        }
    }

    pub(crate) fn entity_failed(&mut self, operation: &'static str, err: AppError) -> PipelineError {
        self.notify(Notice::EntityFailed {
            operation,
            message: err.to_string(),
        });
        PipelineError::mutation(operation, err)
    }
}

enum Flow {
    Create(CreateFlow),
    Edit(EditFlow),
}

pub struct EntityCreationCoordinator {
    shared: Shared,
    flow: Flow,
}

impl EntityCreationCoordinator {
    pub fn for_create(entity_type: EntityType, deps: PipelineDeps) -> Self {
        Self::new(entity_type, deps, Flow::Create(CreateFlow::new()))
    }

    pub fn for_edit(entity_type: EntityType, entity_id: Uuid, deps: PipelineDeps) -> Self {
        Self::new(entity_type, deps, Flow::Edit(EditFlow::new(entity_id)))
    }

    fn new(entity_type: EntityType, deps: PipelineDeps, flow: Flow) -> Self {
        tracing::debug!(
            entity_type = %entity_type,
            mode = ?Self::mode_of(&flow),
            "Coordinator opened"
        );
        Self {
            shared: Shared {
                entity_type,
                deps,
                slots: BTreeMap::new(),
                aliases: Vec::new(),
                notices: Vec::new(),
                unattached: BTreeMap::new(),
            },
            flow,
        }
    }

    fn mode_of(flow: &Flow) -> CoordinatorMode {
        match flow {
            Flow::Create(_) => CoordinatorMode::Create,
            Flow::Edit(edit) => CoordinatorMode::Edit {
                entity_id: edit.entity_id(),
            },
        }
    }

    /// Register an asset slot and its upload session.
    pub fn with_slot(mut self, slot: AssetSlot) -> Self {
        let mut session = UploadSession::new(
            self.shared.entity_type,
            slot.intent.clone(),
            slot.constraints,
            &self.shared.deps,
        );
        if let Flow::Edit(edit) = &self.flow {
            session = session.with_entity_id(edit.entity_id());
        }
        self.shared.slots.insert(
            slot.intent,
            Slot {
                field: slot.field,
                session,
            },
        );
        self
    }

    /// Seed a slot with the URL the entity currently has.
    pub fn with_existing_url(
        self,
        intent: &AssetIntent,
        url: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let session = self.shared.slot(intent)?.session.clone();
        session.with_remote_url(url);
        Ok(self)
    }

    /// Let the secondary slot reuse the primary's URL. Enabled by default
    /// in create mode, disabled in edit mode.
    pub fn with_alias(
        mut self,
        primary: AssetIntent,
        secondary: AssetIntent,
    ) -> Result<Self, PipelineError> {
        self.shared.slot(&primary)?;
        self.shared.slot(&secondary)?;
        let enabled = matches!(self.flow, Flow::Create(_));
        self.shared.aliases.retain(|a| a.secondary != secondary);
        self.shared.aliases.push(AssetAlias {
            primary,
            secondary,
            enabled,
        });
        Ok(self)
    }

    /// Toggle reuse for a secondary slot. Takes effect at the next upload;
    /// URLs already written are left alone.
    pub fn set_alias_enabled(
        &mut self,
        secondary: &AssetIntent,
        enabled: bool,
    ) -> Result<(), PipelineError> {
        let alias = self
            .shared
            .aliases
            .iter_mut()
            .find(|a| &a.secondary == secondary)
            .ok_or_else(|| PipelineError::UnknownSlot(secondary.to_string()))?;
        alias.enabled = enabled;
        tracing::debug!(secondary = %secondary, enabled, "Asset alias toggled");
        Ok(())
    }

    pub fn mode(&self) -> CoordinatorMode {
        Self::mode_of(&self.flow)
    }

    pub fn phase(&self) -> Phase {
        match &self.flow {
            Flow::Create(create) => create.phase(),
            Flow::Edit(_) => Phase::Composing,
        }
    }

    pub fn entity_id(&self) -> Option<Uuid> {
        match &self.flow {
            Flow::Create(create) => create.entity_id(),
            Flow::Edit(edit) => Some(edit.entity_id()),
        }
    }

    pub fn session(&self, intent: &AssetIntent) -> Option<&UploadSession> {
        self.shared.slots.get(intent).map(|s| &s.session)
    }

    pub fn aliases(&self) -> &[AssetAlias] {
        &self.shared.aliases
    }

    pub fn notices(&self) -> &[Notice] {
        &self.shared.notices
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.shared.notices)
    }

    /// Uploaded URLs waiting for a successful patch, by field
    pub fn unattached(&self) -> &BTreeMap<String, String> {
        &self.shared.unattached
    }

    /// Create mode stages the file; edit mode uploads and patches it now.
    pub async fn select(
        &mut self,
        intent: &AssetIntent,
        file: LocalFile,
    ) -> Result<SelectOutcome, PipelineError> {
        match &mut self.flow {
            Flow::Create(create) => create.select(&mut self.shared, intent, file),
            Flow::Edit(edit) => edit.select(&mut self.shared, intent, file).await,
        }
    }

    /// Forget the local file of a slot.
    pub fn remove(&mut self, intent: &AssetIntent) -> Result<(), PipelineError> {
        let session = self.shared.slot(intent)?.session.clone();
        if let Flow::Create(create) = &mut self.flow {
            create.unstage(intent);
        }
        session.clear();
        Ok(())
    }

    /// Create mode: create the entity, upload staged files, attach URLs.
    /// Edit mode: patch the entity with `payload`.
    pub async fn submit(&mut self, payload: Value) -> Result<SubmitReport, PipelineError> {
        match &mut self.flow {
            Flow::Create(create) => create.submit(&mut self.shared, payload).await,
            Flow::Edit(edit) => edit.submit(&mut self.shared, payload).await,
        }
    }

    /// Re-send the patch for URLs a failed patch left unattached. Nothing is
    /// uploaded again.
    pub async fn retry_attach(&mut self) -> Result<Vec<String>, PipelineError> {
        let entity_id = self.entity_id().ok_or(PipelineError::EntityNotCreated)?;
        if self.shared.unattached.is_empty() {
            return Ok(Vec::new());
        }
        let (_, fields) = self
            .shared
            .send_patch(entity_id, Map::new(), BTreeMap::new())
            .await?;
        if let Flow::Create(create) = &mut self.flow {
            create.finish(&mut self.shared);
        }
        Ok(fields)
    }

    /// Close the form: staged files and previews are dropped.
    pub fn cancel(mut self) {
        if let Flow::Create(create) = &mut self.flow {
            create.discard();
        }
        for slot in self.shared.slots.values() {
            if slot.session.has_file() {
                slot.session.clear();
            }
        }
        tracing::debug!(entity_type = %self.shared.entity_type, "Coordinator cancelled");
    }
}
