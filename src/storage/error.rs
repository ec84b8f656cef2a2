//! Storage Errors
//!
//! Every failure the storage layer can report is one of three sentinels.
//! None of them are transient: they are fully determined by the state of the
//! table at the time of the call, so nothing here is ever retried.
//!
//! Callers are expected to match on the variant, not on the message:
//!
//! ```
//! use nskv::storage::{Backend, StorageEngine, StoreError};
//!
//! let engine = StorageEngine::new();
//! assert_eq!(engine.get("missing"), Err(StoreError::NotFound));
//! ```

use thiserror::Error;

/// Errors returned by [`Backend`](crate::storage::Backend) implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key is absent, or was found to be expired during the call.
    ///
    /// Some operations use this as a signal rather than a failure:
    /// `get_set` reports it after storing the new value.
    #[error("key not found")]
    NotFound,

    /// A counter operation found a value that is not exactly 8 bytes wide.
    #[error("value is not an 8-byte counter")]
    TypeMismatch,

    /// The glob pattern given to `keys` could not be compiled.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

impl StoreError {
    /// Returns true for [`StoreError::NotFound`].
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
