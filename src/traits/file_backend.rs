//! The backend interface every filesystem source implements.

use std::io::{self, Read, Seek};
use std::path::Path;

use crate::{FileInformation, FileSpec, FsError, Session, StatRecord};

/// A readable, seekable byte stream returned by [`FileBackend::open`].
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Answers metadata, listing and content queries for one class of
/// filesystem.
///
/// Backends deal in *native* paths, the strings produced by
/// [`FileSpec::os_path`]. Errors are plain [`io::Error`]s; turning them into
/// soft failures is the caller's job.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods take `&self`;
/// backends use interior mutability for any state they keep.
///
/// # Object Safety
///
/// This trait is object-safe and is stored as `Arc<dyn FileBackend>` in a
/// [`BackendRegistry`](crate::BackendRegistry).
///
/// # Example
///
/// ```rust
/// use irfs::{FileBackend, NameIter, ReadSeek, StatRecord};
/// use std::io;
///
/// /// A filesystem holding a single empty regular file at `/empty`.
/// struct Single;
///
/// impl FileBackend for Single {
///     fn stat(&self, path: &str, _follow_symlinks: bool) -> io::Result<StatRecord> {
///         match path {
///             "/" => Ok(StatRecord { mode: 0o40755, ..Default::default() }),
///             "/empty" => Ok(StatRecord { mode: 0o100644, ..Default::default() }),
///             _ => Err(io::ErrorKind::NotFound.into()),
///         }
///     }
///
///     fn read_dir(&self, _path: &str) -> io::Result<NameIter> {
///         Ok(NameIter::from_vec(vec![Ok("empty".to_string())]))
///     }
///
///     fn open(&self, _path: &str) -> io::Result<Box<dyn ReadSeek>> {
///         Ok(Box::new(io::Cursor::new(Vec::new())))
///     }
/// }
/// ```
pub trait FileBackend: Send + Sync {
    /// Raw metadata for a native path.
    ///
    /// With `follow_symlinks` unset, a link reports on itself rather than its
    /// target.
    fn stat(&self, path: &str, follow_symlinks: bool) -> io::Result<StatRecord>;

    /// Names of the direct children of a native directory path.
    ///
    /// The iterator is consumed lazily; an `Err` item means listing could
    /// not continue.
    fn read_dir(&self, path: &str) -> io::Result<NameIter>;

    /// Open a native path for reading.
    fn open(&self, path: &str) -> io::Result<Box<dyn ReadSeek>>;

    /// Join a child name onto a native directory path.
    fn join(&self, dir: &str, name: &str) -> String {
        Path::new(dir).join(name).to_string_lossy().into_owned()
    }

    /// Resolve a spec into a [`FileInformation`] snapshot.
    ///
    /// # Errors
    ///
    /// - [`FsError::Unavailable`] if the metadata query fails
    fn from_stat(&self, spec: FileSpec, session: &Session) -> Result<FileInformation, FsError> {
        let follow = session.config().follow_symlinks;
        match self.stat(&spec.os_path(), follow) {
            Ok(record) => Ok(FileInformation::from_record(spec, record, session)),
            Err(e) => {
                tracing::debug!(path = %spec, error = %e, "stat failed");
                Err(FsError::unavailable("stat", spec.name(), e))
            }
        }
    }
}

/// Lazy iterator over child names.
///
/// Wraps a boxed iterator so each backend can stream names however it
/// likes.
pub struct NameIter(Box<dyn Iterator<Item = io::Result<String>> + Send + 'static>);

impl NameIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = io::Result<String>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(names: Vec<io::Result<String>>) -> Self {
        Self(Box::new(names.into_iter()))
    }
}

impl Iterator for NameIter {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}
