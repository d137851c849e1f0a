//! Error type shared by all fallible `ChainHashMap` operations.

use thiserror::Error;

/// Failures reported by [`ChainHashMap`](crate::ChainHashMap).
///
/// Panics raised by a key's `Hash` or `Eq` implementation are not wrapped;
/// they unwind through the map unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// The requested initial bucket count is zero or cannot be allocated.
    #[error("invalid capacity {requested}: must be at least 1 and allocatable")]
    InvalidCapacity {
        /// Capacity passed by the caller
        requested: usize,
    },

    /// The key has no entry in the map.
    #[error("key not found")]
    KeyNotFound,
}

pub type Result<T> = core::result::Result<T, MapError>;
