//! File selection validation
//!
//! Limits are always supplied by the caller. Nothing here hardcodes a size or
//! a list of accepted formats.

use crate::models::LocalFile;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("No file selected")]
    EmptyFile,

    #[error("File is {size} bytes, the limit is {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Content type '{0}' is not allowed")]
    InvalidContentType(String),

    #[error("Extension '{0}' is not allowed")]
    InvalidExtension(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Invalid asset intent '{0}'")]
    InvalidIntent(String),
}

/// Caller-supplied limits checked on selection.
///
/// Empty allow-lists accept everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConstraints {
    pub max_bytes: Option<u64>,
    pub allowed_content_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
}

impl FileConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn with_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_content_types = types
            .into_iter()
            .map(|t| t.into().trim().to_lowercase())
            .collect();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| e.into().trim().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Common raster image formats with the given size limit.
    pub fn images(max_bytes: u64) -> Self {
        Self::new()
            .with_max_bytes(max_bytes)
            .with_content_types(["image/jpeg", "image/png", "image/webp", "image/gif", "image/svg+xml"])
            .with_extensions(["jpg", "jpeg", "png", "webp", "gif", "svg"])
    }

    pub fn validate(&self, file: &LocalFile) -> Result<(), ValidationError> {
        validate_filename(&file.filename)?;

        if file.is_empty() {
            return Err(ValidationError::EmptyFile);
        }

        if let Some(max) = self.max_bytes {
            if file.size() > max {
                return Err(ValidationError::FileTooLarge {
                    size: file.size(),
                    max,
                });
            }
        }

        if !self.allowed_content_types.is_empty() {
            let content_type = file.content_type.to_lowercase();
            if !self.allowed_content_types.contains(&content_type) {
                return Err(ValidationError::InvalidContentType(file.content_type.clone()));
            }
        }

        if !self.allowed_extensions.is_empty() {
            match file.extension() {
                Some(ext) if self.allowed_extensions.contains(&ext) => {}
                Some(ext) => return Err(ValidationError::InvalidExtension(ext)),
                None => return Err(ValidationError::InvalidExtension(String::new())),
            }
        }

        Ok(())
    }
}

/// Rejects empty names and names carrying path components.
pub fn validate_filename(filename: &str) -> Result<(), ValidationError> {
    if filename.trim().is_empty() {
        return Err(ValidationError::InvalidFilename("filename is empty".to_string()));
    }
    if filename.contains('/') || filename.contains('\\') || filename.contains('\0') {
        return Err(ValidationError::InvalidFilename(filename.to_string()));
    }
    if filename == "." || filename == ".." {
        return Err(ValidationError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

/// Best-effort content type from a filename extension.
pub fn guess_content_type(filename: &str) -> &'static str {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("avif") => "image/avif",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(size: usize) -> LocalFile {
        LocalFile::new("photo.png", "image/png", vec![0u8; size])
    }

    #[test]
    fn test_empty_constraints_accept_any_non_empty_file() {
        let constraints = FileConstraints::new();
        assert!(constraints.validate(&png(10)).is_ok());
        assert_eq!(constraints.validate(&png(0)), Err(ValidationError::EmptyFile));
    }

    #[test]
    fn test_max_bytes() {
        let constraints = FileConstraints::new().with_max_bytes(4);
        assert!(constraints.validate(&png(4)).is_ok());
        assert_eq!(
            constraints.validate(&png(5)),
            Err(ValidationError::FileTooLarge { size: 5, max: 4 })
        );
    }

    #[test]
    fn test_content_type_and_extension_lists() {
        let constraints = FileConstraints::new()
            .with_content_types(["image/png"])
            .with_extensions([".PNG"]);
        assert!(constraints.validate(&png(1)).is_ok());

        let jpeg = LocalFile::new("photo.jpg", "image/jpeg", vec![1u8]);
        assert!(matches!(
            constraints.validate(&jpeg),
            Err(ValidationError::InvalidContentType(_))
        ));

        let mislabelled = LocalFile::new("photo.gif", "image/png", vec![1u8]);
        assert_eq!(
            constraints.validate(&mislabelled),
            Err(ValidationError::InvalidExtension("gif".to_string()))
        );
    }

    #[test]
    fn test_filename_with_path_is_rejected() {
        let file = LocalFile::new("../etc/passwd", "image/png", vec![1u8]);
        assert!(matches!(
            FileConstraints::new().validate(&file),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type("a.JPG"), "image/jpeg");
        assert_eq!(guess_content_type("logo.svg"), "image/svg+xml");
        assert_eq!(guess_content_type("noext"), "application/octet-stream");
    }
}
