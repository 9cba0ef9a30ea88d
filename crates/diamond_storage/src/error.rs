//! Error types for blob storage operations.

use crate::handle::BlobHandle;
use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The handle does not address a live blob.
    ///
    /// This always indicates an indexing bug in the caller: handles are only
    /// obtained from `write`, so a missing one was either fabricated or released.
    #[error("blob not found: {handle}")]
    NotFound {
        /// The handle that failed to resolve.
        handle: BlobHandle,
    },

    /// The blob exceeds the maximum encodable length.
    #[error("blob too large: {len} bytes (max {max})")]
    TooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// The blob log is corrupted.
    #[error("blob log corrupted: {0}")]
    Corrupted(String),
}

impl StorageError {
    /// Creates a not-found error for a handle.
    pub fn not_found(handle: BlobHandle) -> Self {
        Self::NotFound { handle }
    }

    /// Returns `true` if this is a [`StorageError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
