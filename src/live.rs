//! The backend servicing live OS paths.
//!
//! Native names are not always valid UTF-8. On unix, each byte that is not
//! part of valid UTF-8 is carried as the scalar `U+10FF00 + byte`, so every
//! name listed by [`LiveBackend`] can be stat'd and opened again. Genuine
//! characters in that range are escaped the same way to keep the mapping
//! reversible.

use std::fs;
use std::io;

use crate::{FileBackend, NameIter, ReadSeek, StatRecord};

/// Reads metadata and content straight from the host operating system.
///
/// Registered under [`API_FILESYSTEM`](crate::API_FILESYSTEM) by
/// [`BackendRegistry::with_defaults`](crate::BackendRegistry::with_defaults).
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveBackend;

impl FileBackend for LiveBackend {
    fn stat(&self, path: &str, follow_symlinks: bool) -> io::Result<StatRecord> {
        let path = native::decode(path);
        let meta = if follow_symlinks {
            fs::metadata(path)?
        } else {
            fs::symlink_metadata(path)?
        };
        Ok(record_from_metadata(&meta))
    }

    fn read_dir(&self, path: &str) -> io::Result<NameIter> {
        let entries = fs::read_dir(native::decode(path))?;
        Ok(NameIter::new(
            entries.map(|entry| entry.map(|e| native::encode(&e.file_name()))),
        ))
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn ReadSeek>> {
        Ok(Box::new(fs::File::open(native::decode(path))?))
    }
}

#[cfg(unix)]
mod native {
    use std::ffi::{OsStr, OsString};
    use std::os::unix::ffi::{OsStrExt, OsStringExt};
    use std::path::PathBuf;

    const ESCAPE_BASE: u32 = 0x10_FF00;
    const ESCAPED: std::ops::RangeInclusive<u32> = 0x10_FF80..=0x10_FFFF;

    fn escape(out: &mut String, byte: u8) {
        out.push(char::from_u32(ESCAPE_BASE + u32::from(byte)).unwrap_or(char::REPLACEMENT_CHARACTER));
    }

    pub(super) fn encode(name: &OsStr) -> String {
        let mut out = String::with_capacity(name.len());
        for chunk in name.as_bytes().utf8_chunks() {
            for c in chunk.valid().chars() {
                if ESCAPED.contains(&u32::from(c)) {
                    let mut buf = [0u8; 4];
                    for &byte in c.encode_utf8(&mut buf).as_bytes() {
                        escape(&mut out, byte);
                    }
                } else {
                    out.push(c);
                }
            }
            if !chunk.invalid().is_empty() {
                tracing::trace!(name = ?name, "escaping non-UTF-8 bytes in name");
            }
            for &byte in chunk.invalid() {
                escape(&mut out, byte);
            }
        }
        out
    }

    pub(super) fn decode(path: &str) -> PathBuf {
        if !path.chars().any(|c| ESCAPED.contains(&u32::from(c))) {
            return PathBuf::from(path);
        }
        let mut bytes = Vec::with_capacity(path.len());
        for c in path.chars() {
            let scalar = u32::from(c);
            if ESCAPED.contains(&scalar) {
                bytes.push((scalar - ESCAPE_BASE) as u8);
            } else {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
        PathBuf::from(OsString::from_vec(bytes))
    }
}

#[cfg(not(unix))]
mod native {
    use std::ffi::OsStr;
    use std::path::PathBuf;

    pub(super) fn encode(name: &OsStr) -> String {
        match name.to_str() {
            Some(name) => name.to_string(),
            None => {
                tracing::debug!(name = ?name, "name is not valid Unicode, stat will fail");
                name.to_string_lossy().into_owned()
            }
        }
    }

    pub(super) fn decode(path: &str) -> PathBuf {
        PathBuf::from(path)
    }
}

#[cfg(unix)]
fn record_from_metadata(meta: &fs::Metadata) -> StatRecord {
    use std::os::unix::fs::MetadataExt;

    StatRecord {
        mode: meta.mode(),
        ino: meta.ino(),
        size: meta.size(),
        dev: meta.dev(),
        nlink: meta.nlink(),
        uid: meta.uid(),
        gid: meta.gid(),
        mtime: meta.mtime(),
        mtime_nsec: nanos(meta.mtime_nsec()),
        atime: meta.atime(),
        atime_nsec: nanos(meta.atime_nsec()),
        ctime: meta.ctime(),
        ctime_nsec: nanos(meta.ctime_nsec()),
    }
}

#[cfg(unix)]
fn nanos(raw: i64) -> u32 {
    u32::try_from(raw).unwrap_or(0)
}

/// Hosts without a native mode get one synthesized from the file type and
/// read-only flag. Status change time is approximated by creation time.
#[cfg(not(unix))]
fn record_from_metadata(meta: &fs::Metadata) -> StatRecord {
    use std::time::{SystemTime, UNIX_EPOCH};

    use crate::types::{S_IFDIR, S_IFLNK, S_IFREG};

    fn split(time: io::Result<SystemTime>) -> (i64, u32) {
        let Ok(time) = time else { return (0, 0) };
        match time.duration_since(UNIX_EPOCH) {
            Ok(d) => (i64::try_from(d.as_secs()).unwrap_or(i64::MAX), d.subsec_nanos()),
            Err(e) => {
                let d = e.duration();
                (-i64::try_from(d.as_secs()).unwrap_or(i64::MAX), 0)
            }
        }
    }

    let file_type = meta.file_type();
    let kind = if file_type.is_dir() {
        S_IFDIR
    } else if file_type.is_symlink() {
        S_IFLNK
    } else {
        S_IFREG
    };
    let mut perm = if file_type.is_dir() { 0o755 } else { 0o644 };
    if meta.permissions().readonly() {
        perm &= !0o222;
    }

    let (mtime, mtime_nsec) = split(meta.modified());
    let (atime, atime_nsec) = split(meta.accessed());
    let (ctime, ctime_nsec) = split(meta.created());

    StatRecord {
        mode: kind | perm,
        size: meta.len(),
        nlink: 1,
        mtime,
        mtime_nsec,
        atime,
        atime_nsec,
        ctime,
        ctime_nsec,
        ..Default::default()
    }
}
