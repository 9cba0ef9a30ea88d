//! In-memory blob store.

use crate::error::{StorageError, StorageResult};
use crate::handle::BlobHandle;
use crate::store::BlobStore;
use crate::MAX_BLOB_LEN;

/// An in-memory blob store.
///
/// Blobs live in a slot arena indexed by handle. Released slots are emptied
/// but never reissued, so a stale handle can only ever resolve to `NotFound`.
/// The payload is freed on release; the empty slot itself stays, so the
/// arena grows by one word-sized entry per blob ever written.
///
/// # Example
///
/// ```rust
/// use diamond_storage::{BlobStore, MemoryBlobStore};
///
/// let mut store = MemoryBlobStore::new();
/// let handle = store.write(b"packed selectors").unwrap();
/// assert_eq!(store.read(handle).unwrap(), b"packed selectors");
/// ```
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    slots: Vec<Option<Box<[u8]>>>,
    live: usize,
    live_bytes: u64,
}

impl MemoryBlobStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of handles ever issued.
    #[must_use]
    pub fn issued_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of released slots still held by the arena.
    #[must_use]
    pub fn released_count(&self) -> usize {
        self.slots.len() - self.live
    }

    /// Returns the total payload bytes held by live blobs.
    #[must_use]
    pub fn live_bytes(&self) -> u64 {
        self.live_bytes
    }

    fn slot(&self, handle: BlobHandle) -> StorageResult<&[u8]> {
        usize::try_from(handle.as_u64())
            .ok()
            .and_then(|index| self.slots.get(index))
            .and_then(|slot| slot.as_deref())
            .ok_or_else(|| StorageError::not_found(handle))
    }
}

impl BlobStore for MemoryBlobStore {
    fn write(&mut self, data: &[u8]) -> StorageResult<BlobHandle> {
        if data.len() > MAX_BLOB_LEN {
            return Err(StorageError::TooLarge {
                len: data.len(),
                max: MAX_BLOB_LEN,
            });
        }

        let handle = BlobHandle::from_raw(self.slots.len() as u64);
        self.slots.push(Some(data.into()));
        self.live += 1;
        self.live_bytes += data.len() as u64;
        Ok(handle)
    }

    fn read(&self, handle: BlobHandle) -> StorageResult<Vec<u8>> {
        self.slot(handle).map(<[u8]>::to_vec)
    }

    fn len_of(&self, handle: BlobHandle) -> StorageResult<usize> {
        self.slot(handle).map(<[u8]>::len)
    }

    fn contains(&self, handle: BlobHandle) -> bool {
        self.slot(handle).is_ok()
    }

    fn release(&mut self, handle: BlobHandle) -> StorageResult<()> {
        let slot = usize::try_from(handle.as_u64())
            .ok()
            .and_then(|index| self.slots.get_mut(index))
            .ok_or_else(|| StorageError::not_found(handle))?;

        match slot.take() {
            Some(bytes) => {
                self.live -= 1;
                self.live_bytes -= bytes.len() as u64;
                Ok(())
            }
            None => Err(StorageError::not_found(handle)),
        }
    }

    fn live_count(&self) -> usize {
        self.live
    }

    fn flush(&mut self) -> StorageResult<()> {
        // Nothing buffered
        Ok(())
    }
}
