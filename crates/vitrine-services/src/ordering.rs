use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use vitrine_core::{AppError, EntityType, PositionUpdate, ReorderApi};

use crate::repository::PositionRepository;

/// Applies bulk reorders of one entity type's siblings
pub struct ReorderService {
    positions: Arc<dyn PositionRepository>,
}

impl ReorderService {
    pub fn new(positions: Arc<dyn PositionRepository>) -> Self {
        Self { positions }
    }

    #[tracing::instrument(skip(self, items), fields(entity_type = %entity_type, count = items.len()))]
    pub async fn reorder(
        &self,
        entity_type: EntityType,
        items: Vec<PositionUpdate>,
    ) -> Result<usize, AppError> {
        validate_order(&items)?;
        let updated = self.positions.apply_order(entity_type, &items).await?;
        tracing::info!(updated, "Reorder applied");
        Ok(updated)
    }
}

/// Ids must be unique and positions must be exactly `1..=N`.
pub fn validate_order(items: &[PositionUpdate]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::InvalidInput("Reorder requires at least one item".to_string()));
    }

    let mut ids = HashSet::with_capacity(items.len());
    if let Some(dup) = items.iter().find(|u| !ids.insert(u.id)) {
        return Err(AppError::InvalidInput(format!("Duplicate id {} in reorder", dup.id)));
    }

    let mut positions: Vec<u32> = items.iter().map(|u| u.position).collect();
    positions.sort_unstable();
    let contiguous = positions
        .iter()
        .enumerate()
        .all(|(index, position)| *position as usize == index + 1);
    if !contiguous {
        return Err(AppError::InvalidInput(format!(
            "Positions must be a permutation of 1..={}",
            items.len()
        )));
    }

    Ok(())
}

#[async_trait]
impl ReorderApi for ReorderService {
    async fn reorder(
        &self,
        entity_type: EntityType,
        items: Vec<PositionUpdate>,
    ) -> Result<(), AppError> {
        ReorderService::reorder(self, entity_type, items).await.map(|_| ())
    }
}
