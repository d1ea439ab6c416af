//! Initial sibling order, loaded from a JSON file of the form
//! `{"projects": ["<uuid>", ...], "brands": [...]}`.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;
use vitrine_core::EntityType;
use vitrine_services::InMemoryPositionRepository;

pub fn parse_seed(raw: &str) -> Result<BTreeMap<EntityType, Vec<Uuid>>> {
    let by_name: BTreeMap<String, Vec<Uuid>> =
        serde_json::from_str(raw).context("Position seed must map entity types to id lists")?;
    by_name
        .into_iter()
        .map(|(name, ids)| Ok((name.parse::<EntityType>()?, ids)))
        .collect()
}

/// Seed the repository; returns how many entity types were loaded.
pub async fn load_positions(
    path: impl AsRef<Path>,
    positions: &InMemoryPositionRepository,
) -> Result<usize> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read position seed {}", path.display()))?;
    let seed = parse_seed(&raw)?;
    for (entity_type, ids) in &seed {
        positions.seed(*entity_type, ids).await;
    }
    Ok(seed.len())
}
