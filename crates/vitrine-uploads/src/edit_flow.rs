//! Edit-mode path: the entity exists, so every selection uploads right away
//! and patches its own field.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;
use vitrine_core::{AssetIntent, LocalFile};

use crate::coordinator::{Notice, SelectOutcome, Shared, SubmitReport};
use crate::error::PipelineError;
use crate::session::UploadRequest;

pub(crate) struct EditFlow {
    entity_id: Uuid,
}

impl EditFlow {
    pub(crate) fn new(entity_id: Uuid) -> Self {
        Self { entity_id }
    }

    pub(crate) fn entity_id(&self) -> Uuid {
        self.entity_id
    }

    pub(crate) async fn select(
        &mut self,
        shared: &mut Shared,
        intent: &AssetIntent,
        file: LocalFile,
    ) -> Result<SelectOutcome, PipelineError> {
        let slot = shared.slot(intent)?;
        let session = slot.session.clone();
        let field = slot.field.clone();

        // Reuse is decided before anything is sent for the secondary slot.
        if let Some(alias) = shared.enabled_alias_for_secondary(intent) {
            let primary_url = shared
                .slot(&alias.primary)
                .ok()
                .and_then(|primary| primary.session.remote_url());
            if let Some(url) = primary_url {
                session.adopt_remote_url(url.clone());
                shared.notify(Notice::AssetUploaded {
                    intent: intent.clone(),
                    url: url.clone(),
                    reused_from: Some(alias.primary.clone()),
                });
                let patched = self
                    .patch(shared, BTreeMap::from([(field, url.clone())]))
                    .await?;
                return Ok(SelectOutcome::Reused {
                    url,
                    from: alias.primary,
                    patched,
                });
            }
        }

        let request = UploadRequest {
            file: Some(file),
            entity_id: Some(self.entity_id),
            intent: None,
        };
        let url = match session.upload(request).await {
            Ok(url) => url,
            Err(err @ PipelineError::Selection(_)) => return Err(err),
            Err(err) => {
                // The entity keeps its previous value; nothing is patched.
                shared.notify(Notice::AssetFailed {
                    intent: intent.clone(),
                    message: err.to_string(),
                });
                return Err(err);
            }
        };
        shared.notify(Notice::AssetUploaded {
            intent: intent.clone(),
            url: url.clone(),
            reused_from: None,
        });

        let mut fields = BTreeMap::from([(field, url.clone())]);
        for alias in shared.enabled_aliases_for_primary(intent) {
            let Ok(secondary) = shared.slot(&alias.secondary) else {
                continue;
            };
            secondary.session.adopt_remote_url(url.clone());
            fields.insert(secondary.field.clone(), url.clone());
            shared.notify(Notice::AssetUploaded {
                intent: alias.secondary,
                url: url.clone(),
                reused_from: Some(intent.clone()),
            });
        }

        let patched = self.patch(shared, fields).await?;
        Ok(SelectOutcome::Uploaded { url, patched })
    }

    async fn patch(
        &self,
        shared: &mut Shared,
        fields: BTreeMap<String, String>,
    ) -> Result<Vec<String>, PipelineError> {
        let (_, patched) = shared.send_patch(self.entity_id, Map::new(), fields).await?;
        shared.notify(Notice::EntityUpdated {
            entity_id: self.entity_id,
        });
        Ok(patched)
    }

    /// Save the form fields. Assets were already patched on selection, but
    /// URLs left behind by a failed patch ride along.
    pub(crate) async fn submit(
        &mut self,
        shared: &mut Shared,
        payload: Value,
    ) -> Result<SubmitReport, PipelineError> {
        let fields = shared.form_fields(payload)?;
        let (entity, attached) = match shared
            .send_patch(self.entity_id, fields, BTreeMap::new())
            .await
        {
            Ok(patched) => patched,
            Err(PipelineError::EntityMutation { operation, source }) => {
                return Err(shared.entity_failed(operation, source));
            }
            Err(err) => return Err(err),
        };
        shared.notify(Notice::EntityUpdated {
            entity_id: self.entity_id,
        });

        let uploaded = shared
            .slots
            .iter()
            .filter_map(|(intent, slot)| slot.session.remote_url().map(|url| (intent.clone(), url)))
            .collect();
        Ok(SubmitReport {
            entity_id: self.entity_id,
            entity,
            uploaded,
            attached,
            ..SubmitReport::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::coordinator::{AssetSlot, EntityCreationCoordinator, Notice, SelectOutcome};
    use crate::error::PipelineError;
    use crate::session::UploadStatus;
    use crate::testing::{png, Fakes};
    use serde_json::json;
    use uuid::Uuid;
    use vitrine_core::{AssetIntent, EntityType, FileConstraints, LocalFile};

    const OLD_LOGO: &str = "https://cdn.test/brands/old-logo.png";

    fn brand(fakes: &Fakes, id: Uuid) -> EntityCreationCoordinator {
        EntityCreationCoordinator::for_edit(EntityType::Brand, id, fakes.deps())
            .with_slot(AssetSlot::new(
                AssetIntent::logo(),
                "logo",
                FileConstraints::images(1024),
            ))
            .with_existing_url(&AssetIntent::logo(), OLD_LOGO)
            .unwrap()
    }

    #[tokio::test]
    async fn test_select_uploads_and_patches_immediately() {
        let fakes = Fakes::new();
        let id = Uuid::new_v4();
        let mut coordinator = brand(&fakes, id);

        let outcome = coordinator
            .select(&AssetIntent::logo(), png("logo.png"))
            .await
            .unwrap();

        let SelectOutcome::Uploaded { url, patched } = outcome else {
            panic!("expected an upload");
        };
        assert_eq!(patched, vec!["logo".to_string()]);
        assert_eq!(fakes.gateway.calls()[0].entity_id, id);
        let patches = fakes.entities.patch_calls();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].1, id);
        assert_eq!(patches[0].2, json!({"logo": url}));
        assert!(fakes.entities.create_calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_field_and_entity_untouched() {
        let fakes = Fakes::new();
        fakes.transport.fail_for(&AssetIntent::logo());
        let mut coordinator = brand(&fakes, Uuid::new_v4());

        let err = coordinator
            .select(&AssetIntent::logo(), png("logo.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Transport(_)));
        // Upload started without staging
        assert_eq!(fakes.gateway.calls().len(), 1);
        assert!(fakes.entities.patch_calls().is_empty());
        let session = coordinator.session(&AssetIntent::logo()).unwrap();
        assert_eq!(session.status(), UploadStatus::Error);
        assert_eq!(session.remote_url().as_deref(), Some(OLD_LOGO));
        assert!(matches!(
            coordinator.notices().last(),
            Some(Notice::AssetFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_rejected_file_never_reaches_the_network() {
        let fakes = Fakes::new();
        let mut coordinator = brand(&fakes, Uuid::new_v4());
        let empty = LocalFile::new("logo.png", "image/png", Vec::<u8>::new());

        assert!(matches!(
            coordinator.select(&AssetIntent::logo(), empty).await,
            Err(PipelineError::Selection(_))
        ));
        assert!(fakes.gateway.calls().is_empty());
        assert!(coordinator.notices().is_empty());
    }

    #[tokio::test]
    async fn test_alias_enabled_mid_session_only_affects_next_upload() {
        let fakes = Fakes::new();
        let id = Uuid::new_v4();
        let mut coordinator = EntityCreationCoordinator::for_edit(EntityType::Project, id, fakes.deps())
            .with_slot(AssetSlot::new(AssetIntent::image(), "featuredImage", FileConstraints::images(1024)))
            .with_slot(AssetSlot::new(AssetIntent::card_image(), "cardImage", FileConstraints::images(1024)))
            .with_existing_url(&AssetIntent::card_image(), "https://cdn.test/old-card.png")
            .unwrap()
            .with_alias(AssetIntent::image(), AssetIntent::card_image())
            .unwrap();

        coordinator
            .select(&AssetIntent::image(), png("first.png"))
            .await
            .unwrap();
        assert_eq!(fakes.entities.patch_calls()[0].2.as_object().unwrap().len(), 1);
        let card = coordinator.session(&AssetIntent::card_image()).unwrap().clone();
        assert_eq!(card.remote_url().as_deref(), Some("https://cdn.test/old-card.png"));

        coordinator
            .set_alias_enabled(&AssetIntent::card_image(), true)
            .unwrap();
        // Toggling alone patches nothing.
        assert_eq!(fakes.entities.patch_calls().len(), 1);

        let outcome = coordinator
            .select(&AssetIntent::image(), png("second.png"))
            .await
            .unwrap();
        let SelectOutcome::Uploaded { url, patched } = outcome else {
            panic!("expected an upload");
        };
        assert_eq!(patched, vec!["cardImage".to_string(), "featuredImage".to_string()]);
        assert_eq!(card.remote_url(), Some(url.clone()));
        assert_eq!(fakes.gateway.calls_for(&AssetIntent::card_image()), 0);
        let body = &fakes.entities.patch_calls()[1].2;
        assert_eq!(body["cardImage"], json!(url));
        assert_eq!(body["featuredImage"], json!(url));
    }

    #[tokio::test]
    async fn test_secondary_reuses_primary_without_upload() {
        let fakes = Fakes::new();
        let mut coordinator = EntityCreationCoordinator::for_edit(EntityType::Project, Uuid::new_v4(), fakes.deps())
            .with_slot(AssetSlot::new(AssetIntent::image(), "featuredImage", FileConstraints::images(1024)))
            .with_slot(AssetSlot::new(AssetIntent::card_image(), "cardImage", FileConstraints::images(1024)))
            .with_existing_url(&AssetIntent::image(), "https://cdn.test/hero.png")
            .unwrap()
            .with_alias(AssetIntent::image(), AssetIntent::card_image())
            .unwrap();
        coordinator
            .set_alias_enabled(&AssetIntent::card_image(), true)
            .unwrap();

        let outcome = coordinator
            .select(&AssetIntent::card_image(), png("card.png"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SelectOutcome::Reused {
                url: "https://cdn.test/hero.png".to_string(),
                from: AssetIntent::image(),
                patched: vec!["cardImage".to_string()],
            }
        );
        assert!(fakes.gateway.calls().is_empty());
        assert_eq!(fakes.previews.live_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_patch_rides_along_with_next_save() {
        let fakes = Fakes::new();
        fakes.entities.fail_patches(1);
        let mut coordinator = brand(&fakes, Uuid::new_v4());

        let err = coordinator
            .select(&AssetIntent::logo(), png("logo.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EntityMutation { operation: "patch", .. }));
        let url = coordinator.unattached()["logo"].clone();

        let report = coordinator.submit(json!({"name": "Acme"})).await.unwrap();
        assert_eq!(report.attached, vec!["logo".to_string()]);
        let body = &fakes.entities.patch_calls()[1].2;
        assert_eq!(body, &json!({"name": "Acme", "logo": url}));
        assert!(coordinator.unattached().is_empty());
        assert_eq!(fakes.transport.put_count(), 1);
    }

    #[tokio::test]
    async fn test_submit_failure_is_form_wide() {
        let fakes = Fakes::new();
        fakes.entities.fail_patches(1);
        let mut coordinator = brand(&fakes, Uuid::new_v4());

        let err = coordinator.submit(json!({"name": "Acme"})).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            coordinator.notices().last(),
            Some(Notice::EntityFailed { operation: "patch", .. })
        ));
    }
}
