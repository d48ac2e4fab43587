//! Error type for map and cursor operations.
//!
//! Insertion and removal report their failures as values: the public
//! `insert` and `remove` translate them into a `bool`, the `try_*` variants
//! hand the error to the caller. Cursor misuse is a programming error, so
//! the plain cursor accessors panic with the message of the corresponding
//! variant instead of returning it.

use thiserror::Error;

/// Errors reported by [`AvlTreeMap`](crate::AvlTreeMap) and its cursors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The key is already present; the map was left unchanged.
    #[error("key is already present in the map")]
    DuplicateKey,

    /// The key is not present in the map.
    #[error("key is not present in the map")]
    KeyNotFound,

    /// The cursor points past the last entry and has nothing to dereference.
    #[error("cursor does not point at an entry")]
    InvalidAccess,

    /// The cursor is not attached to any map, so it cannot move.
    #[error("cursor is not attached to a map")]
    InvalidOwner,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
