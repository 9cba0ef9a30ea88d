//! Blob store trait definition.

use crate::error::StorageResult;
use crate::handle::BlobHandle;

/// Write-once, handle-addressed byte storage.
///
/// Blob stores are **opaque**: they never interpret the payloads they hold.
/// The shard cache packs many logical records into one blob so that a read
/// costs one bulk copy regardless of how many records the blob contains.
///
/// # Invariants
///
/// - `write` returns a fresh handle; handles are never reused
/// - `read` returns exactly the bytes passed to the `write` that issued the handle
/// - blobs are never mutated in place
/// - `read` of a handle that was never issued, or was released, fails with
///   [`crate::StorageError::NotFound`]
///
/// # Implementors
///
/// - [`super::MemoryBlobStore`] - For tests and ephemeral diamonds
/// - [`super::FileBlobStore`] - Append-only blob log on disk
pub trait BlobStore: Send + Sync {
    /// Stores `data` as a new immutable blob and returns its handle.
    ///
    /// Cost scales with the payload size.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is too large or an I/O error occurs.
    fn write(&mut self, data: &[u8]) -> StorageResult<BlobHandle>;

    /// Reads the full payload addressed by `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if the handle is not live.
    fn read(&self, handle: BlobHandle) -> StorageResult<Vec<u8>>;

    /// Returns the payload length of a live blob without copying it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if the handle is not live.
    fn len_of(&self, handle: BlobHandle) -> StorageResult<usize>;

    /// Returns `true` if `handle` addresses a live blob.
    fn contains(&self, handle: BlobHandle) -> bool;

    /// Releases a blob. Later reads of the handle fail with `NotFound`.
    ///
    /// The handle is never issued again.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if the handle is not live.
    fn release(&mut self, handle: BlobHandle) -> StorageResult<()>;

    /// Returns the number of live blobs.
    fn live_count(&self) -> usize;

    /// Flushes pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;
}
