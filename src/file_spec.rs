//! # FileSpec
//!
//! Canonical, backend-tagged path value.
//!
//! ## Responsibility
//! - Hold a path in canonical form: absolute, using one configured separator
//! - Convert canonical drive-letter paths (`/c:/windows`) to native form
//! - Compose child paths without touching any backend
//!
//! ## Dependencies
//! - [`AttributeValue`] for construction from dynamically typed values
//! - [`FsError`] for rejected constructions

use std::fmt;

use crate::{AttributeValue, FsError};

/// Tag of the backend servicing live OS paths.
pub const API_FILESYSTEM: &str = "API";

/// Default canonical separator.
pub const DEFAULT_PATH_SEP: char = '/';

/// A path plus the filesystem tag that selects the backend servicing it.
///
/// `FileSpec` is immutable; [`add`](Self::add) returns a new value.
///
/// # Example
///
/// ```rust
/// use irfs::FileSpec;
///
/// let spec = FileSpec::new("/").add("etc").add("passwd");
/// assert_eq!(spec.name(), "/etc/passwd");
/// assert_eq!(spec.components(), vec!["etc", "passwd"]);
/// assert_eq!(FileSpec::new("/c:/windows").os_path(), "c:/windows");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileSpec {
    name: String,
    filesystem: String,
    path_sep: char,
}

impl FileSpec {
    /// A spec on the live OS filesystem using `/` as separator.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, API_FILESYSTEM, DEFAULT_PATH_SEP)
    }

    /// A spec with an explicit filesystem tag and separator.
    pub fn with_options(name: impl Into<String>, filesystem: impl Into<String>, path_sep: char) -> Self {
        Self {
            name: name.into(),
            filesystem: filesystem.into(),
            path_sep,
        }
    }

    /// The canonical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The filesystem tag.
    pub fn filesystem(&self) -> &str {
        &self.filesystem
    }

    /// The separator used by [`name`](Self::name).
    pub fn path_sep(&self) -> char {
        self.path_sep
    }

    /// Non-empty segments of the name.
    pub fn components(&self) -> Vec<&str> {
        self.name
            .split(self.path_sep)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Last non-empty segment, ignoring trailing separators.
    pub fn file_name(&self) -> Option<&str> {
        self.name
            .split(self.path_sep)
            .rev()
            .find(|s| !s.is_empty())
    }

    /// Returns `true` if the name is just the separator.
    pub fn is_root(&self) -> bool {
        let mut chars = self.name.chars();
        chars.next() == Some(self.path_sep) && chars.next().is_none()
    }

    /// The name as the backend expects it.
    ///
    /// A canonical drive path `<sep>X:<rest>` becomes `X:<rest>`, with a
    /// separator inserted in front of `rest` if it is missing so the result
    /// is never drive-relative. Everything else passes through unchanged.
    pub fn os_path(&self) -> String {
        let Some(tail) = self.name.strip_prefix(self.path_sep) else {
            return self.name.clone();
        };

        let mut chars = tail.chars();
        match (chars.next(), chars.next()) {
            (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => {
                let rest = chars.as_str();
                if rest.starts_with(self.path_sep) {
                    format!("{drive}:{rest}")
                } else {
                    format!("{drive}:{}{rest}", self.path_sep)
                }
            }
            _ => self.name.clone(),
        }
    }

    /// A new spec with `component` appended.
    ///
    /// The root spec does not get a doubled separator.
    pub fn add(&self, component: &str) -> Self {
        let name = if self.is_root() {
            format!("{}{component}", self.name)
        } else {
            format!("{}{}{component}", self.name, self.path_sep)
        };
        Self::with_options(name, self.filesystem.clone(), self.path_sep)
    }
}

impl fmt::Display for FileSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Plain strings always get the `"API"` tag and `/`, whatever a session's
/// configuration says. Use [`Session::spec`](crate::Session::spec) to build
/// a spec with the session's tag and separator.
impl From<&str> for FileSpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FileSpec {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&String> for FileSpec {
    fn from(name: &String) -> Self {
        Self::new(name.as_str())
    }
}

impl From<&FileSpec> for FileSpec {
    fn from(spec: &FileSpec) -> Self {
        spec.clone()
    }
}

impl TryFrom<AttributeValue> for FileSpec {
    type Error = FsError;

    fn try_from(value: AttributeValue) -> Result<Self, Self::Error> {
        match value {
            AttributeValue::Text(name) => Ok(Self::new(name)),
            AttributeValue::FileSpec(spec) => Ok(spec),
            other => Err(FsError::InvalidFileSpec {
                found: other.kind(),
            }),
        }
    }
}
