//! Content digests and content-addressable blob reuse.

use crate::error::StorageResult;
use crate::handle::BlobHandle;
use crate::store::BlobStore;
use sha2::{Digest, Sha256};
use std::fmt;

/// Length plus SHA-256 of a blob payload.
///
/// Two payloads with equal digests are treated as byte-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest {
    len: u64,
    hash: [u8; 32],
}

impl ContentDigest {
    /// Computes the digest of `data`.
    #[must_use]
    pub fn of(data: &[u8]) -> Self {
        Self {
            len: data.len() as u64,
            hash: Sha256::digest(data).into(),
        }
    }

    /// Returns the payload length.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` for the digest of an empty payload.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the SHA-256 hash.
    #[must_use]
    pub const fn hash(&self) -> &[u8; 32] {
        &self.hash
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.len)?;
        for byte in &self.hash[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A blob together with the digest of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredBlob {
    /// Handle of the blob.
    pub handle: BlobHandle,
    /// Digest of the payload behind `handle`.
    pub digest: ContentDigest,
}

/// Outcome of [`reuse_or_write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The existing blob already held identical bytes.
    Reused(StoredBlob),
    /// A new blob was written.
    Written(StoredBlob),
}

impl WriteOutcome {
    /// Returns the resulting blob.
    #[must_use]
    pub const fn blob(&self) -> StoredBlob {
        match *self {
            Self::Reused(blob) | Self::Written(blob) => blob,
        }
    }

    /// Returns `true` if no new blob was written.
    #[must_use]
    pub const fn is_reused(&self) -> bool {
        matches!(self, Self::Reused(_))
    }
}

/// Stores `data`, reusing `existing` when it holds byte-identical content.
///
/// Reuse requires equal length and hash and a handle that is still live in
/// `store`. Otherwise a fresh blob is written.
///
/// # Errors
///
/// Returns an error if writing a new blob fails.
pub fn reuse_or_write<S>(
    store: &mut S,
    existing: Option<&StoredBlob>,
    data: &[u8],
) -> StorageResult<WriteOutcome>
where
    S: BlobStore + ?Sized,
{
    let digest = ContentDigest::of(data);

    if let Some(existing) = existing {
        if existing.digest == digest && store.contains(existing.handle) {
            return Ok(WriteOutcome::Reused(*existing));
        }
    }

    let handle = store.write(data)?;
    Ok(WriteOutcome::Written(StoredBlob { handle, digest }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBlobStore;

    #[test]
    fn digest_distinguishes_content() {
        assert_eq!(ContentDigest::of(b"abc"), ContentDigest::of(b"abc"));
        assert_ne!(ContentDigest::of(b"abc"), ContentDigest::of(b"abd"));
        assert_ne!(ContentDigest::of(b"abc"), ContentDigest::of(b"abcd"));
        assert!(ContentDigest::of(b"").is_empty());
        assert_eq!(ContentDigest::of(b"abcd").len(), 4);
    }

    #[test]
    fn same_input_twice_yields_same_handle() {
        let mut store = MemoryBlobStore::new();
        let first = reuse_or_write(&mut store, None, b"selectors").unwrap();
        assert!(!first.is_reused());

        let second = reuse_or_write(&mut store, Some(&first.blob()), b"selectors").unwrap();
        assert!(second.is_reused());
        assert_eq!(first.blob().handle, second.blob().handle);
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn different_input_yields_different_handle() {
        let mut store = MemoryBlobStore::new();
        let first = reuse_or_write(&mut store, None, b"selectors").unwrap();
        let second = reuse_or_write(&mut store, Some(&first.blob()), b"selectorz").unwrap();

        assert!(!second.is_reused());
        assert_ne!(first.blob().handle, second.blob().handle);
        assert_eq!(store.read(second.blob().handle).unwrap(), b"selectorz");
    }

    #[test]
    fn released_existing_blob_is_not_reused() {
        let mut store = MemoryBlobStore::new();
        let first = reuse_or_write(&mut store, None, b"payload").unwrap();
        store.release(first.blob().handle).unwrap();

        let second = reuse_or_write(&mut store, Some(&first.blob()), b"payload").unwrap();
        assert!(!second.is_reused());
        assert_eq!(store.read(second.blob().handle).unwrap(), b"payload");
    }

    #[test]
    fn digest_display_is_short() {
        let shown = ContentDigest::of(b"").to_string();
        // sha256("") starts with e3b0c442
        assert_eq!(shown, "0:e3b0c44298fc1c14");
    }
}
