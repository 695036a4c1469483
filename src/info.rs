//! # FileInformation
//!
//! A metadata snapshot of one path, plus lazy traversal of its children.
//!
//! ## Responsibility
//! - Hold the typed metadata derived from a backend's [`StatRecord`]
//! - Open the file for reading
//! - Enumerate children on demand
//!
//! ## Dependencies
//! - [`Session`] to reach the backend and identity cache
//! - [`FileBackend`] for native I/O

use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::{
    AttributeValue, Attributes, FileBackend, FileSpec, FsError, Group, NameIter, Permissions,
    ReadSeek, Session, StatRecord, Timestamp, User,
};

/// Metadata for one path, as reported by the backend serving its tag.
///
/// Instances are independent: traversal produces fresh values and nothing
/// is shared between a parent and its children.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FileInformation {
    filename: FileSpec,
    st_mode: Permissions,
    st_ino: u64,
    st_size: u64,
    st_dev: u64,
    st_nlink: u64,
    st_uid: User,
    st_gid: Group,
    st_mtime: Timestamp,
    st_atime: Timestamp,
    st_ctime: Timestamp,
    #[cfg_attr(feature = "serde", serde(skip))]
    session: Session,
}

impl FileInformation {
    /// Build a snapshot from a raw record, resolving owners through the
    /// session's identity cache.
    pub fn from_record(filename: FileSpec, record: StatRecord, session: &Session) -> Self {
        let (st_mtime, st_atime, st_ctime) = record.timestamps();
        let identities = session.identities();
        Self {
            filename,
            st_mode: Permissions::from_mode(record.mode),
            st_ino: record.ino,
            st_size: record.size,
            st_dev: record.dev,
            st_nlink: record.nlink,
            st_uid: identities.from_uid(record.uid),
            st_gid: identities.from_gid(record.gid),
            st_mtime,
            st_atime,
            st_ctime,
            session: session.clone(),
        }
    }

    /// Resolve `filename` through the backend registered for its tag.
    ///
    /// Same as [`Session::file_factory`].
    ///
    /// # Errors
    ///
    /// - [`FsError::UnsupportedFilesystem`] if no backend serves the tag
    /// - [`FsError::Unavailable`] if the path cannot be stat'd
    pub fn from_stat(filename: impl Into<FileSpec>, session: &Session) -> Result<Self, FsError> {
        session.file_factory(filename)
    }

    /// The path this snapshot describes.
    pub fn filename(&self) -> &FileSpec {
        &self.filename
    }

    /// Mode bits.
    pub fn mode(&self) -> Permissions {
        self.st_mode
    }

    /// Inode number.
    pub fn inode(&self) -> u64 {
        self.st_ino
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.st_size
    }

    /// Device id.
    pub fn device(&self) -> u64 {
        self.st_dev
    }

    /// Hard link count.
    pub fn nlink(&self) -> u64 {
        self.st_nlink
    }

    /// Owning user.
    pub fn user(&self) -> &User {
        &self.st_uid
    }

    /// Owning group.
    pub fn group(&self) -> &Group {
        &self.st_gid
    }

    /// Last modification.
    pub fn mtime(&self) -> Timestamp {
        self.st_mtime
    }

    /// Last access.
    pub fn atime(&self) -> Timestamp {
        self.st_atime
    }

    /// Last status change.
    pub fn ctime(&self) -> Timestamp {
        self.st_ctime
    }

    /// Returns `true` if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.st_mode.is_dir()
    }

    /// The session this snapshot was resolved in.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn backend(&self) -> Result<Arc<dyn FileBackend>, FsError> {
        self.session.registry().require(self.filename.filesystem())
    }

    /// Open the file read-only.
    ///
    /// # Errors
    ///
    /// - [`FsError::Unavailable`] if the backend cannot open the path
    /// - [`FsError::UnsupportedFilesystem`] if the tag was unregistered since
    pub fn open(&self) -> Result<Box<dyn ReadSeek>, FsError> {
        self.backend()?
            .open(&self.filename.os_path())
            .map_err(|e| FsError::unavailable("open", self.filename.name(), e))
    }

    /// Read up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes (possibly none) at end of file.
    ///
    /// # Errors
    ///
    /// - [`FsError::Unavailable`] if the file cannot be opened or read
    pub fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        let read_err = |e| FsError::unavailable("read", self.filename.name(), e);
        let mut reader = self.open()?;
        reader.seek(SeekFrom::Start(offset)).map_err(read_err)?;
        let mut buf = Vec::with_capacity(len.min(self.session.config().buffer_size));
        reader
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(read_err)?;
        Ok(buf)
    }

    /// Children of this directory, resolved one at a time.
    ///
    /// Empty for anything that is not a directory. Children that cannot be
    /// stat'd are skipped. If the directory itself cannot be listed, or
    /// listing fails part way, iteration simply ends: no error reaches the
    /// caller. Stopping iteration early skips the remaining stats.
    pub fn list(&self) -> Children {
        if !self.is_dir() {
            return Children::empty();
        }

        let Ok(backend) = self.backend() else {
            return Children::empty();
        };
        let dir = self.filename.os_path();
        match backend.read_dir(&dir) {
            Ok(names) => Children {
                inner: Some(Listing {
                    backend,
                    session: self.session.clone(),
                    filesystem: self.filename.filesystem().to_string(),
                    path_sep: self.filename.path_sep(),
                    dir,
                    names,
                }),
            },
            Err(e) => {
                tracing::debug!(path = %self.filename, error = %e, "directory listing failed");
                Children::empty()
            }
        }
    }
}

impl fmt::Debug for FileInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileInformation")
            .field("filename", &self.filename)
            .field("st_mode", &self.st_mode)
            .field("st_ino", &self.st_ino)
            .field("st_size", &self.st_size)
            .field("st_dev", &self.st_dev)
            .field("st_nlink", &self.st_nlink)
            .field("st_uid", &self.st_uid)
            .field("st_gid", &self.st_gid)
            .field("st_mtime", &self.st_mtime)
            .field("st_atime", &self.st_atime)
            .field("st_ctime", &self.st_ctime)
            .finish()
    }
}

impl fmt::Display for FileInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.filename, f)
    }
}

const FILE_INFORMATION_KEYS: &[&str] = &[
    "filename", "st_mode", "st_ino", "st_size", "st_dev", "st_nlink", "st_uid", "st_gid",
    "st_mtime", "st_atime", "st_ctime",
];

impl Attributes for FileInformation {
    fn get(&self, key: &str) -> Option<AttributeValue> {
        let value = match key {
            "filename" => AttributeValue::FileSpec(self.filename.clone()),
            "st_mode" => AttributeValue::Permissions(self.st_mode),
            "st_ino" => AttributeValue::Integer(self.st_ino),
            "st_size" => AttributeValue::Integer(self.st_size),
            "st_dev" => AttributeValue::Integer(self.st_dev),
            "st_nlink" => AttributeValue::Integer(self.st_nlink),
            "st_uid" => AttributeValue::User(self.st_uid.clone()),
            "st_gid" => AttributeValue::Group(self.st_gid.clone()),
            "st_mtime" => AttributeValue::Timestamp(self.st_mtime),
            "st_atime" => AttributeValue::Timestamp(self.st_atime),
            "st_ctime" => AttributeValue::Timestamp(self.st_ctime),
            _ => return None,
        };
        Some(value)
    }

    fn keys(&self) -> &'static [&'static str] {
        FILE_INFORMATION_KEYS
    }
}

// ============================================================================
// Children
// ============================================================================

/// Lazy, single-pass iterator over the children of a directory.
///
/// Returned by [`FileInformation::list`].
pub struct Children {
    inner: Option<Listing>,
}

struct Listing {
    backend: Arc<dyn FileBackend>,
    session: Session,
    filesystem: String,
    path_sep: char,
    dir: String,
    names: NameIter,
}

impl Children {
    fn empty() -> Self {
        Self { inner: None }
    }
}

impl Iterator for Children {
    type Item = FileInformation;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let listing = self.inner.as_mut()?;
            let name = match listing.names.next() {
                Some(Ok(name)) => name,
                Some(Err(e)) => {
                    tracing::debug!(path = %listing.dir, error = %e, "directory listing interrupted");
                    self.inner = None;
                    return None;
                }
                None => {
                    self.inner = None;
                    return None;
                }
            };

            let path = listing.backend.join(&listing.dir, &name);
            let spec = FileSpec::with_options(path, listing.filesystem.clone(), listing.path_sep);
            if let Ok(child) = listing.backend.from_stat(spec, &listing.session) {
                return Some(child);
            }
        }
    }
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Children")
            .field("dir", &self.inner.as_ref().map(|l| l.dir.as_str()))
            .finish()
    }
}
