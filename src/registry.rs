//! # Backend Registry
//!
//! Maps filesystem tags to backend implementations.
//!
//! ## Overview
//!
//! Every [`FileSpec`](crate::FileSpec) carries a filesystem tag. Dispatch
//! looks the tag up here; an unknown tag is a configuration error rather
//! than an I/O condition. Backends are registered explicitly, usually once
//! when a [`Session`](crate::Session) is built:
//!
//! ```rust
//! use irfs::{BackendRegistry, LiveBackend, API_FILESYSTEM};
//!
//! let mut registry = BackendRegistry::with_defaults();
//! registry.register("MIRROR", LiveBackend);
//!
//! assert!(registry.get(API_FILESYSTEM).is_some());
//! assert!(registry.get("MIRROR").is_some());
//! assert!(registry.get("NTFS").is_none());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{API_FILESYSTEM, FileBackend, FsError, LiveBackend};

/// Tag → backend table.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Arc<dyn FileBackend>>,
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the live OS backend under `"API"`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(API_FILESYSTEM, LiveBackend);
        registry
    }

    /// Register `backend` for `tag`, replacing any previous entry.
    pub fn register(&mut self, tag: impl Into<String>, backend: impl FileBackend + 'static) {
        self.register_shared(tag, Arc::new(backend));
    }

    /// Register an already shared backend.
    pub fn register_shared(&mut self, tag: impl Into<String>, backend: Arc<dyn FileBackend>) {
        let tag = tag.into();
        tracing::debug!(%tag, "registering file backend");
        self.backends.insert(tag, backend);
    }

    /// The backend for `tag`, if any.
    pub fn get(&self, tag: &str) -> Option<Arc<dyn FileBackend>> {
        self.backends.get(tag).cloned()
    }

    /// The backend for `tag`.
    ///
    /// # Errors
    ///
    /// - [`FsError::UnsupportedFilesystem`] if nothing is registered for `tag`
    pub fn require(&self, tag: &str) -> Result<Arc<dyn FileBackend>, FsError> {
        self.get(tag).ok_or_else(|| FsError::UnsupportedFilesystem {
            filesystem: tag.to_string(),
        })
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tags()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_live_backend() {
        let registry = BackendRegistry::with_defaults();
        assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["API"]);
    }

    #[test]
    fn empty_registry_rejects_everything() {
        let registry = BackendRegistry::new();
        let err = registry.require(API_FILESYSTEM).err().unwrap();
        assert!(matches!(err, FsError::UnsupportedFilesystem { ref filesystem } if filesystem == "API"));
    }

    #[test]
    fn register_replaces_existing_tag() {
        let mut registry = BackendRegistry::with_defaults();
        registry.register(API_FILESYSTEM, LiveBackend);
        registry.register("IMAGE", LiveBackend);
        assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["API", "IMAGE"]);
    }

    #[test]
    fn debug_lists_tags() {
        let registry = BackendRegistry::with_defaults();
        assert_eq!(format!("{registry:?}"), "{\"API\"}");
    }

    #[test]
    fn registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BackendRegistry>();
    }
}
