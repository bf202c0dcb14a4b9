//! Transient preview URLs for uploaded images.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, Arc<[u8]>>>,
}

impl RegistryInner {
    fn entries(&self) -> MutexGuard<'_, HashMap<u64, Arc<[u8]>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Allocates `preview://<id>` URLs that resolve to image bytes.
///
/// Every URL is owned by a [`PreviewHandle`] and disappears when the
/// handle is dropped.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<RegistryInner>,
}

impl PreviewRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers bytes for display and returns the handle that owns the URL.
    pub fn create(&self, data: Arc<[u8]>) -> PreviewHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries().insert(id, data);
        tracing::trace!(id, "allocated preview");
        PreviewHandle {
            id,
            url: format!("preview://{id}"),
            registry: Arc::clone(&self.inner),
        }
    }

    /// Looks up the bytes behind a live preview URL.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        let id: u64 = url.strip_prefix("preview://")?.parse().ok()?;
        self.inner.entries().get(&id).cloned()
    }

    /// Number of previews that have not been released yet.
    pub fn live_count(&self) -> usize {
        self.inner.entries().len()
    }
}

/// Owns one preview URL; releases it on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    url: String,
    registry: Arc<RegistryInner>,
}

impl PreviewHandle {
    /// The URL to display.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.entries().remove(&self.id);
        tracing::trace!(id = self.id, "released preview");
    }
}
