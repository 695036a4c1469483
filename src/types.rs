//! Value types shared by every backend: permission bits, timestamps and the
//! raw stat record.

use std::fmt;

// ============================================================================
// Mode bits
// ============================================================================

/// Bit mask selecting the file type from a mode.
pub const S_IFMT: u32 = 0o170_000;
/// Symbolic link.
pub const S_IFLNK: u32 = 0o120_000;
/// Regular file.
pub const S_IFREG: u32 = 0o100_000;
/// Block device.
pub const S_IFBLK: u32 = 0o060_000;
/// Directory.
pub const S_IFDIR: u32 = 0o040_000;
/// Character device.
pub const S_IFCHR: u32 = 0o020_000;
/// FIFO.
pub const S_IFIFO: u32 = 0o010_000;

const S_ISUID: u32 = 0o4000;
const S_ISGID: u32 = 0o2000;
const S_ISVTX: u32 = 0o1000;

const S_IRUSR: u32 = 0o400;
const S_IWUSR: u32 = 0o200;
const S_IXUSR: u32 = 0o100;
const S_IRGRP: u32 = 0o040;
const S_IWGRP: u32 = 0o020;
const S_IXGRP: u32 = 0o010;
const S_IROTH: u32 = 0o004;
const S_IWOTH: u32 = 0o002;
const S_IXOTH: u32 = 0o001;

/// One column of the symbolic mode. The first entry whose bits are all set
/// wins; no match renders as `-`.
type Column = &'static [(u32, char)];

const FILEMODE_TABLE: [Column; 10] = [
    &[
        (S_IFLNK, 'l'),
        (S_IFREG, '-'),
        (S_IFBLK, 'b'),
        (S_IFDIR, 'd'),
        (S_IFCHR, 'c'),
        (S_IFIFO, 'p'),
    ],
    &[(S_IRUSR, 'r')],
    &[(S_IWUSR, 'w')],
    &[(S_IXUSR | S_ISUID, 's'), (S_ISUID, 'S'), (S_IXUSR, 'x')],
    &[(S_IRGRP, 'r')],
    &[(S_IWGRP, 'w')],
    &[(S_IXGRP | S_ISGID, 's'), (S_ISGID, 'S'), (S_IXGRP, 'x')],
    &[(S_IROTH, 'r')],
    &[(S_IWOTH, 'w')],
    &[(S_IXOTH | S_ISVTX, 't'), (S_ISVTX, 'T'), (S_IXOTH, 'x')],
];

/// Render a raw mode as a ten character string such as `-rw-r--r--`.
///
/// Bits that no column knows about are ignored.
///
/// ```rust
/// assert_eq!(irfs::filemode(0o100644), "-rw-r--r--");
/// assert_eq!(irfs::filemode(0o104755), "-rwsr-xr-x");
/// ```
pub fn filemode(mode: u32) -> String {
    FILEMODE_TABLE
        .iter()
        .map(|column| {
            column
                .iter()
                .find(|(bits, _)| mode & bits == *bits)
                .map_or('-', |&(_, c)| c)
        })
        .collect()
}

// ============================================================================
// Permissions
// ============================================================================

/// A raw `st_mode` value, including the file type bits.
///
/// Unlike a plain permission mask, nothing is stripped: the type bits are
/// what make [`is_dir`](Self::is_dir) and the first column of
/// [`filemode`](Self::filemode) work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Wrap a raw mode.
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode)
    }

    /// The raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Symbolic rendering, e.g. `drwxr-xr-x`.
    pub fn filemode(&self) -> String {
        filemode(self.0)
    }

    /// Returns `true` if the type bits say directory.
    #[inline]
    pub const fn is_dir(&self) -> bool {
        self.0 & S_IFMT == S_IFDIR
    }

    /// Returns `true` if the type bits say symbolic link.
    #[inline]
    pub const fn is_symlink(&self) -> bool {
        self.0 & S_IFMT == S_IFLNK
    }
}

impl From<u32> for Permissions {
    fn from(mode: u32) -> Self {
        Self(mode)
    }
}

impl From<Permissions> for u32 {
    fn from(perm: Permissions) -> Self {
        perm.0
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filemode())
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Which stat field a [`Timestamp`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimestampField {
    /// Last modification (`st_mtime`).
    Modified,
    /// Last access (`st_atime`).
    Accessed,
    /// Last status change (`st_ctime`).
    Changed,
}

impl TimestampField {
    /// The stat attribute name.
    pub const fn name(self) -> &'static str {
        match self {
            TimestampField::Modified => "st_mtime",
            TimestampField::Accessed => "st_atime",
            TimestampField::Changed => "st_ctime",
        }
    }
}

/// Seconds since the Unix epoch, tagged with the field it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp {
    field: TimestampField,
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    /// Build a timestamp. `nanos` above one second is clamped.
    pub const fn new(field: TimestampField, secs: i64, nanos: u32) -> Self {
        let nanos = if nanos > 999_999_999 {
            999_999_999
        } else {
            nanos
        };
        Self { field, secs, nanos }
    }

    /// The field this value was read from.
    pub const fn field(&self) -> TimestampField {
        self.field
    }

    /// Whole seconds since the epoch.
    pub const fn secs(&self) -> i64 {
        self.secs
    }

    /// Sub-second part in nanoseconds.
    pub const fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Fractional seconds since the epoch.
    pub fn as_f64(&self) -> f64 {
        self.secs as f64 + f64::from(self.nanos) / 1e9
    }

    /// UTC date-time, or `None` when out of chrono's range.
    pub fn to_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::<chrono::Utc>::from_timestamp(self.secs, self.nanos)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%SZ")),
            None => write!(f, "{}", self.secs),
        }
    }
}

// ============================================================================
// Raw stat record
// ============================================================================

/// Raw metadata a backend reports for one native path.
///
/// Backends fill this from whatever source they read (the OS, a parsed
/// image); [`FileInformation`](crate::FileInformation) derives its typed
/// fields from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatRecord {
    /// Type and permission bits.
    pub mode: u32,
    /// Inode number.
    pub ino: u64,
    /// Size in bytes.
    pub size: u64,
    /// Device id.
    pub dev: u64,
    /// Hard link count.
    pub nlink: u64,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
    /// Modification time, seconds.
    pub mtime: i64,
    /// Modification time, nanoseconds.
    pub mtime_nsec: u32,
    /// Access time, seconds.
    pub atime: i64,
    /// Access time, nanoseconds.
    pub atime_nsec: u32,
    /// Status change time, seconds.
    pub ctime: i64,
    /// Status change time, nanoseconds.
    pub ctime_nsec: u32,
}

impl StatRecord {
    /// The three timestamps, in `(mtime, atime, ctime)` order.
    pub fn timestamps(&self) -> (Timestamp, Timestamp, Timestamp) {
        (
            Timestamp::new(TimestampField::Modified, self.mtime, self.mtime_nsec),
            Timestamp::new(TimestampField::Accessed, self.atime, self.atime_nsec),
            Timestamp::new(TimestampField::Changed, self.ctime, self.ctime_nsec),
        )
    }
}
