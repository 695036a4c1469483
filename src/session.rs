//! # Session
//!
//! Configuration plus the shared state every query needs: the backend
//! registry and the identity cache.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use irfs::{Session, SessionConfig};
//!
//! let session = Session::new(SessionConfig::default().with_follow_symlinks(false));
//! match session.file_factory("/etc/passwd") {
//!     Ok(info) => println!("{} {} {}", info.mode(), info.size(), info.filename()),
//!     Err(e) if e.is_recoverable() => println!("skipped: {e}"),
//!     Err(e) => panic!("{e}"),
//! }
//! ```

use std::sync::Arc;

use crate::{
    API_FILESYSTEM, BackendRegistry, FileInformation, FileSpec, FsError, IdentityCache,
};

/// Default read buffer for streaming file content (10 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Tunables for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Filesystem tag used for specs built by [`Session::spec`].
    pub filesystem: String,
    /// Separator used for specs built by [`Session::spec`].
    pub path_sep: char,
    /// Report on symlink targets rather than the links themselves.
    pub follow_symlinks: bool,
    /// Chunk size for streaming reads such as hashing.
    pub buffer_size: usize,
}

impl SessionConfig {
    /// Set the default filesystem tag.
    pub fn with_filesystem(mut self, filesystem: impl Into<String>) -> Self {
        self.filesystem = filesystem.into();
        self
    }

    /// Set the default separator.
    pub fn with_path_sep(mut self, path_sep: char) -> Self {
        self.path_sep = path_sep;
        self
    }

    /// Choose whether stat follows symlinks.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set the streaming chunk size. Zero is treated as one byte.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - [`FsError::Deserialization`] if the document is malformed
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, FsError> {
        serde_json::from_str(json).map_err(|e| FsError::Deserialization(e.to_string()))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filesystem: API_FILESYSTEM.to_string(),
            path_sep: if cfg!(windows) { '\\' } else { '/' },
            follow_symlinks: true,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

#[derive(Debug)]
struct State {
    config: SessionConfig,
    registry: BackendRegistry,
    identities: IdentityCache,
}

/// Context passed to every query.
///
/// Cloning is cheap; clones share the registry and identity cache.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<State>,
}

impl Session {
    /// A session with the default registry and host identity lookups.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_registry(config, BackendRegistry::with_defaults())
    }

    /// A session with a custom registry.
    pub fn with_registry(config: SessionConfig, registry: BackendRegistry) -> Self {
        Self::with_parts(config, registry, IdentityCache::new())
    }

    /// A session assembled from all of its parts.
    pub fn with_parts(
        config: SessionConfig,
        registry: BackendRegistry,
        identities: IdentityCache,
    ) -> Self {
        Self {
            state: Arc::new(State {
                config,
                registry,
                identities,
            }),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.state.config
    }

    /// The backend registry.
    pub fn registry(&self) -> &BackendRegistry {
        &self.state.registry
    }

    /// The identity cache.
    pub fn identities(&self) -> &IdentityCache {
        &self.state.identities
    }

    /// A spec for `name` using the configured tag and separator.
    pub fn spec(&self, name: impl Into<String>) -> FileSpec {
        FileSpec::with_options(name, self.config().filesystem.clone(), self.config().path_sep)
    }

    /// Resolve a path through the backend registered for its tag.
    ///
    /// A plain string becomes a spec via `From<&str>`, which uses `"API"` and
    /// `/` rather than this session's settings; pass [`Session::spec`] output
    /// to honor them.
    ///
    /// # Errors
    ///
    /// - [`FsError::UnsupportedFilesystem`] if no backend serves the tag
    /// - [`FsError::Unavailable`] if the backend cannot stat the path
    pub fn file_factory(&self, filename: impl Into<FileSpec>) -> Result<FileInformation, FsError> {
        let spec = filename.into();
        let backend = self.registry().require(spec.filesystem())?;
        backend.from_stat(spec, self)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

/// Resolve `filename` within `session`; see [`Session::file_factory`].
///
/// # Errors
///
/// - [`FsError::UnsupportedFilesystem`] if no backend serves the tag
/// - [`FsError::Unavailable`] if the backend cannot stat the path
pub fn file_factory(
    filename: impl Into<FileSpec>,
    session: &Session,
) -> Result<FileInformation, FsError> {
    session.file_factory(filename)
}
