//! Identity lookups for owning users and groups.

use crate::{Group, User};

/// Resolves numeric owner ids to identity records.
///
/// `None` means the id is unknown or the platform cannot answer; callers
/// treat both the same way.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; a single source is shared by
/// every clone of a [`Session`](crate::Session).
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn IdentitySource`.
pub trait IdentitySource: Send + Sync {
    /// Look up the user owning `uid`.
    fn user(&self, uid: u32) -> Option<User>;

    /// Look up the group owning `gid`.
    fn group(&self, gid: u32) -> Option<Group>;
}
