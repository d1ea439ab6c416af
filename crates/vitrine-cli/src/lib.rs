//! Helpers shared by the `vitrine` command-line client.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;
use vitrine_core::validation::guess_content_type;
use vitrine_core::{AssetIntent, LocalFile};
use vitrine_uploads::Orderable;

/// `intent=field[=path]`: an asset slot writing its URL to `field`, with the
/// file to upload for it. A slot without a path only receives a reused URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetArg {
    pub intent: AssetIntent,
    pub field: String,
    pub path: Option<PathBuf>,
}

impl FromStr for AssetArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, '=');
        let (Some(intent), Some(field)) = (parts.next(), parts.next()) else {
            bail!("Expected intent=field[=path], got '{}'", s);
        };
        if field.is_empty() {
            bail!("Expected intent=field[=path], got '{}'", s);
        }
        let path = match parts.next() {
            Some("") => bail!("Empty path in '{}'", s),
            Some(path) => Some(PathBuf::from(path)),
            None => None,
        };
        Ok(Self {
            intent: AssetIntent::parse(intent)?,
            field: field.to_string(),
            path,
        })
    }
}

/// `primary:secondary`: the secondary slot reuses the primary's upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReuseArg {
    pub primary: AssetIntent,
    pub secondary: AssetIntent,
}

impl FromStr for ReuseArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (primary, secondary) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("Expected primary:secondary, got '{}'", s))?;
        let primary = AssetIntent::parse(primary)?;
        let secondary = AssetIntent::parse(secondary)?;
        if primary == secondary {
            bail!("An asset cannot reuse itself: '{}'", s);
        }
        Ok(Self { primary, secondary })
    }
}

/// Read a file from disk, guessing its content type from the extension.
pub async fn load_file(path: &Path) -> Result<LocalFile> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Not a file path: {}", path.display()))?
        .to_string();
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = guess_content_type(&filename);
    Ok(LocalFile::new(filename, content_type, data))
}

/// Parse a JSON object given inline or as `@path/to/file.json`.
pub fn parse_fields(raw: Option<&str>) -> Result<serde_json::Value> {
    let Some(raw) = raw else {
        return Ok(serde_json::Value::Object(Default::default()));
    };
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fields from {}", path))?,
        None => raw.to_string(),
    };
    let value: serde_json::Value =
        serde_json::from_str(&text).context("Fields must be a JSON object")?;
    if !value.is_object() {
        bail!("Fields must be a JSON object");
    }
    Ok(value)
}

/// A listed entity as far as reordering is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListedEntity {
    pub id: Uuid,
    #[serde(default)]
    pub position: u32,
}

impl Orderable for ListedEntity {
    fn id(&self) -> Uuid {
        self.id
    }

    fn position(&self) -> u32 {
        self.position
    }
}

/// Moves that turn `current` into `requested` order, applied front to back.
///
/// `requested` must name every id of `current` exactly once.
pub fn moves_to(current: &[Uuid], requested: &[Uuid]) -> Result<Vec<(usize, usize)>> {
    if current.len() != requested.len() {
        bail!(
            "Order must list all {} items, got {}",
            current.len(),
            requested.len()
        );
    }
    let mut working = current.to_vec();
    let mut moves = Vec::new();
    for (target, id) in requested.iter().enumerate() {
        let from = working
            .iter()
            .position(|candidate| candidate == id)
            .ok_or_else(|| anyhow!("Unknown or repeated id {}", id))?;
        if from < target {
            bail!("Unknown or repeated id {}", id);
        }
        if from != target {
            let moved = working.remove(from);
            working.insert(target, moved);
            moves.push((from, target));
        }
    }
    Ok(moves)
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
