//! # Backend Traits
//!
//! The seams where platform-specific behavior plugs in.
//!
//! | Trait | Purpose | Shipped implementation |
//! |-------|---------|------------------------|
//! | [`FileBackend`] | Metadata, listing and content for one filesystem tag | [`LiveBackend`](crate::LiveBackend) (`"API"`) |
//! | [`IdentitySource`] | uid/gid to user/group records | [`PlatformIdentities`](crate::PlatformIdentities) |
//!
//! ## Thread Safety
//!
//! Both traits require `Send + Sync`. A [`Session`](crate::Session) shares
//! its backends and identity source across clones.
//!
//! ## Object Safety
//!
//! Both traits are object-safe and are stored as trait objects.

mod file_backend;
mod identity_source;

pub use file_backend::{FileBackend, NameIter, ReadSeek};
pub use identity_source::IdentitySource;
