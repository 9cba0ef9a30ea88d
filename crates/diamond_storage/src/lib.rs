//! # Diamond Storage
//!
//! Write-once, handle-addressed blob storage.
//!
//! This is the lowest layer of the diamond: the shard cache serializes its
//! grouped views into blobs here. Stores are **opaque byte stores**; they do
//! not interpret the payloads they hold.
//!
//! ## Design Principles
//!
//! - A blob is written once and never mutated
//! - Handles are opaque and never reissued, even after release
//! - Reading a blob is one bulk copy, independent of its internal structure
//! - Reading an unknown handle is a hard `NotFound` error, never an empty result
//!
//! ## Available Stores
//!
//! - [`MemoryBlobStore`] - Slot arena for tests and ephemeral diamonds
//! - [`FileBlobStore`] - Append-only, checksummed blob log
//!
//! ## Example
//!
//! ```rust
//! use diamond_storage::{BlobStore, MemoryBlobStore};
//!
//! let mut store = MemoryBlobStore::new();
//! let handle = store.write(b"hello world").unwrap();
//! assert_eq!(store.read(handle).unwrap(), b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checksum;
mod digest;
mod error;
mod file;
mod handle;
mod memory;
mod store;

pub use digest::{reuse_or_write, ContentDigest, StoredBlob, WriteOutcome};
pub use error::{StorageError, StorageResult};
pub use file::{FileBlobStore, LogReport, RECORD_MAGIC};
pub use handle::BlobHandle;
pub use memory::MemoryBlobStore;
pub use store::BlobStore;

/// Largest payload a single blob may carry.
pub const MAX_BLOB_LEN: usize = u32::MAX as usize;
