//! # Identity Resolution
//!
//! Owning user and group records, and the per-session cache that resolves
//! numeric ids into them.
//!
//! ## Responsibility
//! - Represent a possibly-unknown user or group
//! - Memoize lookups per id, including failed ones
//!
//! ## Dependencies
//! - [`IdentitySource`] for the actual lookup
//! - `libc` (`getpwuid_r`, `getgrgid_r`) on unix

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use crate::{AttributeValue, Attributes, IdentitySource};

// ============================================================================
// Records
// ============================================================================

/// The user owning a file.
///
/// Every field is empty when the id could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    /// Numeric user id.
    pub uid: Option<u32>,
    /// Login name.
    pub username: Option<String>,
    /// Home directory.
    pub homedir: Option<String>,
    /// Login shell.
    pub shell: Option<String>,
}

impl User {
    /// Returns `true` if nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.uid.is_none() && self.username.is_none()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.username, self.uid) {
            (Some(name), Some(uid)) => write!(f, "{name} ({uid})"),
            (Some(name), None) => f.write_str(name),
            (None, Some(uid)) => write!(f, "{uid}"),
            (None, None) => Ok(()),
        }
    }
}

impl Attributes for User {
    fn get(&self, key: &str) -> Option<AttributeValue> {
        match key {
            "uid" => self.uid.map(|id| AttributeValue::Integer(u64::from(id))),
            "username" => self.username.clone().map(AttributeValue::Text),
            "homedir" => self.homedir.clone().map(AttributeValue::Text),
            "shell" => self.shell.clone().map(AttributeValue::Text),
            _ => None,
        }
    }

    fn keys(&self) -> &'static [&'static str] {
        &["uid", "username", "homedir", "shell"]
    }
}

/// The group owning a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    /// Numeric group id.
    pub gid: Option<u32>,
    /// Group name.
    pub group_name: Option<String>,
}

impl Group {
    /// Returns `true` if nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.gid.is_none() && self.group_name.is_none()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.group_name, self.gid) {
            (Some(name), Some(gid)) => write!(f, "{name} ({gid})"),
            (Some(name), None) => f.write_str(name),
            (None, Some(gid)) => write!(f, "{gid}"),
            (None, None) => Ok(()),
        }
    }
}

impl Attributes for Group {
    fn get(&self, key: &str) -> Option<AttributeValue> {
        match key {
            "gid" => self.gid.map(|id| AttributeValue::Integer(u64::from(id))),
            "group_name" => self.group_name.clone().map(AttributeValue::Text),
            _ => None,
        }
    }

    fn keys(&self) -> &'static [&'static str] {
        &["gid", "group_name"]
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Memoizing id → identity resolver.
///
/// The first request for an id asks the [`IdentitySource`]; the answer,
/// including an empty record for unknown ids, is kept for the cache's
/// lifetime. Entries are only ever inserted, and a given id always resolves
/// to the same record, so concurrent population is harmless.
pub struct IdentityCache {
    source: Box<dyn IdentitySource>,
    users: RwLock<HashMap<u32, User>>,
    groups: RwLock<HashMap<u32, Group>>,
}

impl IdentityCache {
    /// A cache backed by the host's user database.
    pub fn new() -> Self {
        Self::with_source(PlatformIdentities)
    }

    /// A cache backed by a custom source.
    pub fn with_source(source: impl IdentitySource + 'static) -> Self {
        Self {
            source: Box::new(source),
            users: RwLock::new(HashMap::new()),
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a user id.
    pub fn from_uid(&self, uid: u32) -> User {
        if let Some(user) = self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&uid)
        {
            return user.clone();
        }

        tracing::trace!(uid, "resolving user");
        let user = self.source.user(uid).unwrap_or_default();
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(uid)
            .or_insert(user)
            .clone()
    }

    /// Resolve a group id.
    pub fn from_gid(&self, gid: u32) -> Group {
        if let Some(group) = self
            .groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&gid)
        {
            return group.clone();
        }

        tracing::trace!(gid, "resolving group");
        let group = self.source.group(gid).unwrap_or_default();
        self.groups
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(gid)
            .or_insert(group)
            .clone()
    }
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCache")
            .field(
                "users",
                &self.users.read().unwrap_or_else(PoisonError::into_inner).len(),
            )
            .field(
                "groups",
                &self.groups.read().unwrap_or_else(PoisonError::into_inner).len(),
            )
            .finish()
    }
}

// ============================================================================
// Host lookups
// ============================================================================

/// Reads the host's passwd and group databases.
///
/// Only unix hosts can answer; elsewhere every lookup returns `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformIdentities;

impl IdentitySource for PlatformIdentities {
    fn user(&self, uid: u32) -> Option<User> {
        #[cfg(unix)]
        return unix::user(uid);

        #[cfg(not(unix))]
        {
            let _ = uid;
            None
        }
    }

    fn group(&self, gid: u32) -> Option<Group> {
        #[cfg(unix)]
        return unix::group(gid);

        #[cfg(not(unix))]
        {
            let _ = gid;
            None
        }
    }
}

#[cfg(unix)]
mod unix {
    use std::ffi::CStr;
    use std::mem::MaybeUninit;
    use std::ptr;

    use super::{Group, User};

    const FALLBACK_BUFFER: usize = 1024;
    const MAX_BUFFER: usize = 1 << 20;

    fn initial_buffer(name: libc::c_int) -> usize {
        // SAFETY: sysconf has no memory-safety preconditions.
        let hint = unsafe { libc::sysconf(name) };
        usize::try_from(hint)
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(FALLBACK_BUFFER)
    }

    /// Copy a nul-terminated string owned by a passwd/group buffer.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a nul-terminated string that stays
    /// valid for the duration of the call.
    unsafe fn owned(ptr: *const libc::c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        // SAFETY: guaranteed by the caller.
        let s = unsafe { CStr::from_ptr(ptr) };
        Some(s.to_string_lossy().into_owned())
    }

    pub(super) fn user(uid: u32) -> Option<User> {
        let mut buf: Vec<libc::c_char> = vec![0; initial_buffer(libc::_SC_GETPW_R_SIZE_MAX)];
        loop {
            let mut pwd = MaybeUninit::<libc::passwd>::uninit();
            let mut result: *mut libc::passwd = ptr::null_mut();
            // SAFETY: every pointer refers to live, correctly sized storage.
            let rc = unsafe {
                libc::getpwuid_r(
                    uid as libc::uid_t,
                    pwd.as_mut_ptr(),
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                )
            };
            if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || result.is_null() {
                return None;
            }
            // SAFETY: a non-null result means `pwd` was filled in, and its
            // strings point into `buf`, which is still alive.
            return unsafe {
                let pwd = pwd.assume_init();
                Some(User {
                    uid: Some(uid),
                    username: owned(pwd.pw_name),
                    homedir: owned(pwd.pw_dir),
                    shell: owned(pwd.pw_shell),
                })
            };
        }
    }

    pub(super) fn group(gid: u32) -> Option<Group> {
        let mut buf: Vec<libc::c_char> = vec![0; initial_buffer(libc::_SC_GETGR_R_SIZE_MAX)];
        loop {
            let mut grp = MaybeUninit::<libc::group>::uninit();
            let mut result: *mut libc::group = ptr::null_mut();
            // SAFETY: every pointer refers to live, correctly sized storage.
            let rc = unsafe {
                libc::getgrgid_r(
                    gid as libc::gid_t,
                    grp.as_mut_ptr(),
                    buf.as_mut_ptr(),
                    buf.len(),
                    &mut result,
                )
            };
            if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || result.is_null() {
                return None;
            }
            // SAFETY: as above, `grp` is initialized and backed by `buf`.
            return unsafe {
                let grp = grp.assume_init();
                Some(Group {
                    gid: Some(gid),
                    group_name: owned(grp.gr_name),
                })
            };
        }
    }
}
