//! Error types for file metadata collection.

use std::io;

/// Error type for every fallible operation in this crate.
///
/// Errors fall into two tiers:
///
/// - **Recoverable**: the environment refused a request (missing path,
///   permission denied, a directory where content was expected). These are
///   returned in place of a value and callers are expected to check them.
///   See [`FsError::is_recoverable`].
/// - **Contract violations**: the caller asked for something that can never
///   succeed (an unregistered filesystem tag, a malformed file spec or glob).
///
/// # Examples
///
/// ```rust
/// use irfs::FsError;
///
/// let err = FsError::UnsupportedFilesystem { filesystem: "NTFS".into() };
/// assert_eq!(err.to_string(), "unsupported filesystem type: NTFS");
/// assert!(!err.is_recoverable());
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The backend could not service a stat, open or read for a path.
    #[error("unable to {operation} {path}: {source}")]
    Unavailable {
        /// The operation that failed (`stat`, `open`, `read`).
        operation: &'static str,
        /// Canonical name of the path involved.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Expected file content but found a directory.
    #[error("not a file: {path}")]
    NotAFile {
        /// Canonical name of the directory.
        path: String,
    },

    /// A file spec was requested from a value that is neither text nor a spec.
    #[error("filename must be a string or file spec, found {found}")]
    InvalidFileSpec {
        /// Kind of the rejected value.
        found: &'static str,
    },

    /// No backend is registered for the requested filesystem tag.
    #[error("unsupported filesystem type: {filesystem}")]
    UnsupportedFilesystem {
        /// The unregistered tag.
        filesystem: String,
    },

    /// A glob pattern could not be parsed.
    #[error("invalid pattern {pattern}: {details}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// What was wrong with it.
        details: String,
    },

    /// Configuration could not be decoded.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl FsError {
    /// Build an [`FsError::Unavailable`] for `path`.
    pub fn unavailable(operation: &'static str, path: impl Into<String>, source: io::Error) -> Self {
        FsError::Unavailable {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for environmental failures the caller may skip over.
    ///
    /// Contract violations return `false`: retrying them, or continuing a bulk
    /// collection past them, cannot succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FsError::Unavailable { .. } | FsError::NotAFile { .. })
    }

    /// The I/O kind behind a recoverable failure, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            FsError::Unavailable { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn unavailable_display_includes_operation_and_path() {
        let err = FsError::unavailable(
            "stat",
            "/missing",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "unable to stat /missing: no such file");
    }

    #[test]
    fn unavailable_keeps_its_cause() {
        let err = FsError::unavailable(
            "open",
            "/secret",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.source().is_some());
        assert_eq!(err.io_kind(), Some(io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn recoverable_tiers() {
        let soft = FsError::unavailable("stat", "/x", io::Error::other("boom"));
        assert!(soft.is_recoverable());
        assert!(FsError::NotAFile { path: "/etc".into() }.is_recoverable());

        assert!(!FsError::InvalidFileSpec { found: "integer" }.is_recoverable());
        assert!(
            !FsError::UnsupportedFilesystem {
                filesystem: "NTFS".into()
            }
            .is_recoverable()
        );
        assert!(
            !FsError::InvalidPattern {
                pattern: "%%x%%".into(),
                details: "unknown".into()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn invalid_file_spec_display() {
        let err = FsError::InvalidFileSpec { found: "integer" };
        assert_eq!(
            err.to_string(),
            "filename must be a string or file spec, found integer"
        );
        assert_eq!(err.io_kind(), None);
    }
}
