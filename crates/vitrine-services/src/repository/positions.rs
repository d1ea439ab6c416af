use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use vitrine_core::{AppError, EntityType, PositionUpdate};

#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Current `id -> position` map for one entity type
    async fn positions(&self, entity_type: EntityType) -> Result<HashMap<Uuid, u32>, AppError>;

    /// Replace the order of every sibling at once.
    ///
    /// `updates` must name exactly the known siblings; otherwise nothing is
    /// written. Returns the number of rows updated.
    async fn apply_order(
        &self,
        entity_type: EntityType,
        updates: &[PositionUpdate],
    ) -> Result<usize, AppError>;
}

/// Positions kept in process memory
#[derive(Clone, Default)]
pub struct InMemoryPositionRepository {
    positions: Arc<RwLock<HashMap<EntityType, HashMap<Uuid, u32>>>>,
}

impl InMemoryPositionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register siblings in their initial order (positions `1..=N`).
    pub async fn seed(&self, entity_type: EntityType, ids: &[Uuid]) {
        let mut positions = self.positions.write().await;
        let entry = positions.entry(entity_type).or_default();
        entry.clear();
        for (index, id) in ids.iter().enumerate() {
            entry.insert(*id, index as u32 + 1);
        }
    }
}

#[async_trait]
impl PositionRepository for InMemoryPositionRepository {
    async fn positions(&self, entity_type: EntityType) -> Result<HashMap<Uuid, u32>, AppError> {
        let positions = self.positions.read().await;
        Ok(positions.get(&entity_type).cloned().unwrap_or_default())
    }

    async fn apply_order(
        &self,
        entity_type: EntityType,
        updates: &[PositionUpdate],
    ) -> Result<usize, AppError> {
        // Check and write under one lock so concurrent reorders cannot interleave.
        let mut positions = self.positions.write().await;
        let siblings = positions.entry(entity_type).or_default();

        if let Some(unknown) = updates.iter().find(|u| !siblings.contains_key(&u.id)) {
            return Err(AppError::NotFound(format!(
                "{} {} not found",
                entity_type, unknown.id
            )));
        }

        let submitted: HashSet<Uuid> = updates.iter().map(|u| u.id).collect();
        if submitted.len() != siblings.len() {
            return Err(AppError::Conflict(format!(
                "Reorder must include all {} {}, got {}",
                siblings.len(),
                entity_type,
                submitted.len()
            )));
        }

        for update in updates {
            siblings.insert(update.id, update.position);
        }
        Ok(updates.len())
    }
}
