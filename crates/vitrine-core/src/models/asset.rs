use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

use crate::validation::ValidationError;

const MAX_INTENT_LEN: usize = 64;

/// Tag identifying which asset slot of an entity an upload targets
/// (`logo`, `image`, `card-image`, `banner-image`, ...).
///
/// Intents end up in storage keys, so they are restricted to lowercase ASCII
/// letters, digits and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetIntent(String);

impl AssetIntent {
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let valid = !value.is_empty()
            && value.len() <= MAX_INTENT_LEN
            && !value.starts_with('-')
            && value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(ValidationError::InvalidIntent(value));
        }
        Ok(Self(value))
    }

    pub fn logo() -> Self {
        Self("logo".to_string())
    }

    pub fn image() -> Self {
        Self("image".to_string())
    }

    pub fn card_image() -> Self {
        Self("card-image".to_string())
    }

    pub fn banner_image() -> Self {
        Self("banner-image".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AssetIntent {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AssetIntent> for String {
    fn from(intent: AssetIntent) -> Self {
        intent.0
    }
}

impl Display for AssetIntent {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// File metadata sent to the gateway when requesting an upload target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub filename: String,
    pub content_type: String,
    pub file_size: u64,
}

/// A file selected locally, not yet transferred.
///
/// `data` is reference counted so handing the file to the transport or keeping
/// it in pending state never copies the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl LocalFile {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lowercased extension, if the filename has one.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta {
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
            file_size: self.size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_accepts_slugs() {
        assert_eq!(AssetIntent::parse("card-image").unwrap(), AssetIntent::card_image());
        assert!(AssetIntent::parse("logo2").is_ok());
    }

    #[test]
    fn intent_rejects_unsafe_values() {
        assert!(AssetIntent::parse("").is_err());
        assert!(AssetIntent::parse("../logo").is_err());
        assert!(AssetIntent::parse("Logo").is_err());
        assert!(AssetIntent::parse("-x").is_err());
        assert!(AssetIntent::parse("a".repeat(65)).is_err());
    }

    #[test]
    fn intent_deserialization_is_validated() {
        let ok: AssetIntent = serde_json::from_str("\"banner-image\"").unwrap();
        assert_eq!(ok, AssetIntent::banner_image());
        assert!(serde_json::from_str::<AssetIntent>("\"a/b\"").is_err());
    }

    #[test]
    fn local_file_meta() {
        let file = LocalFile::new("Hero.PNG", "image/png", vec![1u8, 2, 3]);
        assert_eq!(file.extension().as_deref(), Some("png"));
        let meta = file.meta();
        assert_eq!(meta.file_size, 3);
        assert_eq!(meta.filename, "Hero.PNG");
    }
}
