//! The shard cache.
//!
//! For every category the cache keeps a [`Shard`]: the category's facet
//! list packed into one blob, plus one packed selector-list blob per facet.
//! Loupe reads then cost one bulk blob copy per facet instead of a scan over
//! every registered selector.
//!
//! Shards are never patched. Each rebuild recomputes the whole category from
//! the registry and swaps in a fresh shard.

mod shard;
mod shard_cache;

pub use shard::Shard;
pub use shard_cache::{RebuildReport, ShardCache};

use diamond_storage::{BlobHandle, BlobStore};
use tracing::warn;

/// Releases `handles`, returning how many were released.
///
/// A handle that is already gone is logged and skipped.
pub(crate) fn release_blobs(store: &mut dyn BlobStore, handles: &[BlobHandle]) -> u64 {
    let mut released = 0;
    for &handle in handles {
        match store.release(handle) {
            Ok(()) => released += 1,
            Err(err) => warn!(handle = %handle, error = %err, "failed to release blob"),
        }
    }
    released
}
