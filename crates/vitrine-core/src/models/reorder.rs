use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of a bulk reorder: the entity and its new 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: Uuid,
    pub position: u32,
}

impl PositionUpdate {
    pub fn new(id: Uuid, position: u32) -> Self {
        Self { id, position }
    }
}

/// Body of the bulk reorder request. Always carries the complete sibling set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub items: Vec<PositionUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderResponse {
    pub updated: usize,
}
