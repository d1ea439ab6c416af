//! Shared key generation for storage backends.
//!
//! Key format: `assets/{entity_type}/{entity_id}/{intent}/{upload_id}.{ext}`.

use uuid::Uuid;
use vitrine_core::{AssetIntent, EntityType};

use crate::traits::{StorageError, StorageResult};

const MAX_EXTENSION_LEN: usize = 10;
const FALLBACK_EXTENSION: &str = "bin";

/// Generate the storage key for one upload of an entity asset.
///
/// The client filename only contributes its extension; anything that is not a
/// short alphanumeric extension falls back to `bin`.
pub fn asset_key(
    entity_type: EntityType,
    entity_id: Uuid,
    intent: &AssetIntent,
    upload_id: Uuid,
    filename: &str,
) -> String {
    format!(
        "assets/{}/{}/{}/{}.{}",
        entity_type.as_path(),
        entity_id,
        intent,
        upload_id,
        sanitized_extension(filename)
    )
}

fn sanitized_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| {
            !e.is_empty()
                && e.len() <= MAX_EXTENSION_LEN
                && e.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Reject keys that could escape a backend root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty()
        || storage_key.contains("..")
        || storage_key.starts_with('/')
        || storage_key.contains('\\')
        || storage_key.contains('\0')
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
