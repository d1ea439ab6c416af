//! Local previews
//!
//! A preview is an ephemeral reference to a selected file that the UI can show
//! before anything is uploaded. Every preview must be released exactly once;
//! [`PreviewHandle`] does that on drop.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;
use vitrine_core::LocalFile;

/// Mints and releases preview references
pub trait PreviewFactory: Send + Sync {
    fn create(&self, file: &LocalFile) -> String;

    fn release(&self, url: &str);
}

/// Owned preview reference, released when dropped.
pub struct PreviewHandle {
    url: String,
    factory: Arc<dyn PreviewFactory>,
}

impl PreviewHandle {
    pub fn create(factory: Arc<dyn PreviewFactory>, file: &LocalFile) -> Self {
        let url = factory.create(file);
        Self { url, factory }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.factory.release(&self.url);
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle").field("url", &self.url).finish()
    }
}

/// Preview registry that tracks live references in memory.
///
/// URLs look like `blob:vitrine/<uuid>`.
#[derive(Default)]
pub struct InMemoryPreviews {
    live: Mutex<HashSet<String>>,
    created: AtomicUsize,
    released: AtomicUsize,
}

impl InMemoryPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl PreviewFactory for InMemoryPreviews {
    fn create(&self, file: &LocalFile) -> String {
        let url = format!("blob:vitrine/{}", Uuid::new_v4());
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(url = %url, filename = %file.filename, "Preview created");
        url
    }

    fn release(&self, url: &str) {
        let removed = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(url);
        if removed {
            self.released.fetch_add(1, Ordering::SeqCst);
        } else {
            tracing::warn!(url = %url, "Release of unknown or already released preview");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_releases_on_drop() {
        let previews = Arc::new(InMemoryPreviews::new());
        let file = LocalFile::new("a.png", "image/png", vec![1u8]);

        let handle = PreviewHandle::create(previews.clone(), &file);
        assert!(handle.url().starts_with("blob:vitrine/"));
        assert!(previews.is_live(handle.url()));
        assert_eq!(previews.live_count(), 1);

        drop(handle);
        assert_eq!(previews.live_count(), 0);
        assert_eq!(previews.created_count(), 1);
        assert_eq!(previews.released_count(), 1);
    }

    #[test]
    fn test_double_release_is_not_counted() {
        let previews = InMemoryPreviews::new();
        let file = LocalFile::new("a.png", "image/png", vec![1u8]);
        let url = previews.create(&file);
        previews.release(&url);
        previews.release(&url);
        assert_eq!(previews.released_count(), 1);
    }
}
