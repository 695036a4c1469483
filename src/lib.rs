//! # irfs
//!
//! Live file metadata collection for incident response.
//!
//! Given a path, this crate returns uniform metadata (permissions,
//! ownership, size, timestamps) regardless of which backend services the
//! request, and walks directories lazily on demand.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use irfs::Session;
//!
//! let session = Session::default();
//! let etc = session.file_factory("/etc")?;
//! for child in etc.list() {
//!     println!("{} {:>10} {} {}", child.mode(), child.size(), child.user(), child.filename());
//! }
//! # Ok::<(), irfs::FsError>(())
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FileSpec`] | Canonical path tagged with the filesystem that serves it |
//! | [`Permissions`] | Raw mode bits and their `ls -l` rendering |
//! | [`User`] / [`Group`] | Owner identities, resolved once per id |
//! | [`FileInformation`] | Metadata snapshot plus lazy child listing |
//! | [`BackendRegistry`] | Filesystem tag → [`FileBackend`] table |
//! | [`Session`] | Configuration, registry and identity cache |
//! | [`FsError`] | Error type with path context |
//!
//! On top of the core: [`Walk`] for recursive traversal, [`Glob`] for
//! pattern search and [`hash_file`] for content digests.
//!
//! ---
//!
//! ## Backends
//!
//! A backend implements [`FileBackend`]: stat, list and open by native path.
//! [`LiveBackend`] serves the running host under the `"API"` tag. Other
//! sources (a memory image, a disk image) register under their own tag and
//! every [`FileSpec`] carrying that tag is routed to them.
//!
//! ```rust
//! use irfs::{BackendRegistry, FsError, LiveBackend, Session, SessionConfig};
//!
//! let mut registry = BackendRegistry::with_defaults();
//! registry.register("MIRROR", LiveBackend);
//! let session = Session::with_registry(SessionConfig::default(), registry);
//!
//! let err = session.file_factory(irfs::FileSpec::with_options("/", "NTFS", '/')).unwrap_err();
//! assert!(matches!(err, FsError::UnsupportedFilesystem { .. }));
//! ```
//!
//! ---
//!
//! ## Error Handling
//!
//! A path that cannot be read is an expected outcome during collection, not
//! a bug. Such failures come back as [`FsError::Unavailable`] and
//! [`FsError::is_recoverable`] returns `true` for them. Directory listing
//! goes one step further: children that cannot be stat'd are skipped
//! silently.
//!
//! ---
//!
//! ## Thread Safety
//!
//! Backends and identity sources are `Send + Sync`. [`Session`] is cheap to
//! clone and safe to share across threads.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`FileSpec`], [`FileInformation`], [`SessionConfig`], etc. |

// Private modules
mod attributes;
mod error;
mod file_spec;
mod glob;
mod hash;
mod identity;
mod info;
mod live;
mod registry;
mod session;
mod traits;
mod types;
mod walk;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - core types
pub use file_spec::{API_FILESYSTEM, DEFAULT_PATH_SEP, FileSpec};
pub use types::{
    Permissions, S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO, S_IFLNK, S_IFMT, S_IFREG, StatRecord,
    Timestamp, TimestampField, filemode,
};

// Public re-exports - attribute access
pub use attributes::{AttributeValue, Attributes};

// Public re-exports - identities
pub use identity::{Group, IdentityCache, PlatformIdentities, User};

// Public re-exports - traits
pub use traits::{FileBackend, IdentitySource, NameIter, ReadSeek};

// Public re-exports - dispatch
pub use info::{Children, FileInformation};
pub use live::LiveBackend;
pub use registry::BackendRegistry;
pub use session::{DEFAULT_BUFFER_SIZE, Session, SessionConfig, file_factory};

// Public re-exports - collection helpers
pub use glob::{DEFAULT_RECURSION_DEPTH, Glob, GlobOptions};
pub use hash::{Hash, HashType, UnknownHashType, hash_file};
pub use walk::Walk;
