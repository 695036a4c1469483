//! # Attribute Access
//!
//! A narrow, engine-agnostic capability for looking up values by name.
//!
//! ## Overview
//!
//! Query engines that filter or project collected files need two things from
//! each value: fetch an attribute by name, and list the names available.
//! [`Attributes`] provides exactly that, and [`AttributeValue`] is the closed
//! set of values that can come back.
//!
//! | Type | Keys |
//! |------|------|
//! | [`FileSpec`] | `name` |
//! | [`FileInformation`](crate::FileInformation) | `filename`, `st_mode`, `st_ino`, `st_size`, `st_dev`, `st_nlink`, `st_uid`, `st_gid`, `st_mtime`, `st_atime`, `st_ctime` |
//! | [`User`] | `uid`, `username`, `homedir`, `shell` |
//! | [`Group`] | `gid`, `group_name` |

use std::fmt;

use crate::{FileSpec, Group, Permissions, Timestamp, User};

/// A value returned from an attribute lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Free text.
    Text(String),
    /// Unsigned integer (inode, size, ids).
    Integer(u64),
    /// Mode bits.
    Permissions(Permissions),
    /// A tagged timestamp.
    Timestamp(Timestamp),
    /// An owning user.
    User(User),
    /// An owning group.
    Group(Group),
    /// A path.
    FileSpec(FileSpec),
}

impl AttributeValue {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Text(_) => "text",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Permissions(_) => "permissions",
            AttributeValue::Timestamp(_) => "timestamp",
            AttributeValue::User(_) => "user",
            AttributeValue::Group(_) => "group",
            AttributeValue::FileSpec(_) => "file spec",
        }
    }

    /// The value as a nested attribute source, if it is one.
    pub fn as_attributes(&self) -> Option<&dyn Attributes> {
        match self {
            AttributeValue::User(u) => Some(u),
            AttributeValue::Group(g) => Some(g),
            AttributeValue::FileSpec(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Integer(n) => write!(f, "{n}"),
            AttributeValue::Permissions(p) => write!(f, "{p}"),
            AttributeValue::Timestamp(t) => write!(f, "{t}"),
            AttributeValue::User(u) => write!(f, "{u}"),
            AttributeValue::Group(g) => write!(f, "{g}"),
            AttributeValue::FileSpec(s) => write!(f, "{s}"),
        }
    }
}

/// Lookup by attribute name.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn Attributes`.
///
/// # Example
///
/// ```rust
/// use irfs::{Attributes, FileSpec};
///
/// let spec = FileSpec::new("/etc");
/// assert_eq!(spec.keys(), &["name"]);
/// assert_eq!(spec.get("name").unwrap().to_string(), "/etc");
/// assert!(spec.get("size").is_none());
/// ```
pub trait Attributes {
    /// Fetch one attribute, or `None` if the key is unknown or unset.
    fn get(&self, key: &str) -> Option<AttributeValue>;

    /// Every key this value answers to.
    fn keys(&self) -> &'static [&'static str];

    /// Follow a dotted path such as `filename.name` or `st_uid.username`.
    fn select(&self, path: &str) -> Option<AttributeValue> {
        let mut parts = path.split('.');
        let mut value = self.get(parts.next()?)?;
        for part in parts {
            value = value.as_attributes()?.get(part)?;
        }
        Some(value)
    }
}

impl Attributes for FileSpec {
    fn get(&self, key: &str) -> Option<AttributeValue> {
        match key {
            "name" => Some(AttributeValue::Text(self.name().to_string())),
            _ => None,
        }
    }

    fn keys(&self) -> &'static [&'static str] {
        &["name"]
    }
}
