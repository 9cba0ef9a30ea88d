//! Opaque blob handles.

use std::fmt;

/// Opaque address of an immutable blob.
///
/// Handles are issued by [`crate::BlobStore::write`] and never reused by the
/// store that issued them, even after the blob is released. The raw value is
/// backend-specific (a slot index for the in-memory store, a record offset
/// for the file store) and carries no meaning to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlobHandle(u64);

impl BlobHandle {
    /// Creates a handle from its raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the big-endian byte form used in release markers.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Parses the big-endian byte form.
    #[must_use]
    pub const fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}
