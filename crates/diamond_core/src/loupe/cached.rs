//! Loupe reads served from shard blobs.

use super::Loupe;
use crate::cache::ShardCache;
use crate::error::{CoreError, CoreResult};
use crate::stats::DiamondStats;
use bytes::Bytes;
use diamond_codec::{
    concat_address_lists, decode_address_list, encode_selector_list, FacetAddress,
    FacetStreamWriter,
};
use diamond_storage::{BlobHandle, BlobStore};

/// Loupe answering from the shard cache.
///
/// Reads never decode per-facet selector lists; packed blobs are copied into
/// the output as they are.
pub struct CachedLoupe<'a> {
    cache: &'a ShardCache,
    store: &'a dyn BlobStore,
    stats: &'a DiamondStats,
}

impl<'a> CachedLoupe<'a> {
    /// Creates a cached loupe.
    pub fn new(cache: &'a ShardCache, store: &'a dyn BlobStore, stats: &'a DiamondStats) -> Self {
        Self {
            cache,
            store,
            stats,
        }
    }

    fn read(&self, handle: BlobHandle) -> CoreResult<Vec<u8>> {
        let bytes = self.store.read(handle)?;
        self.stats.record_blob_read(bytes.len() as u64);
        Ok(bytes)
    }
}

impl Loupe for CachedLoupe<'_> {
    fn facet_addresses_packed(&self) -> CoreResult<Bytes> {
        let parts = self
            .cache
            .shards()
            .map(|shard| self.read(shard.facet_list().handle))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(concat_address_lists(&parts)?)
    }

    fn facets_packed(&self) -> CoreResult<Bytes> {
        let mut entries = Vec::with_capacity(self.cache.facet_count());
        let mut selector_bytes = 0;

        for shard in self.cache.shards() {
            let facets = decode_address_list(&self.read(shard.facet_list().handle)?)?;
            for facet in facets {
                let blob = shard.selector_blob(facet).ok_or_else(|| {
                    CoreError::inconsistent(format!(
                        "shard {} lists {facet} without a selector blob",
                        shard.category()
                    ))
                })?;
                let list = self.read(blob.handle)?;
                selector_bytes += list.len();
                entries.push((facet, list));
            }
        }

        let mut writer = FacetStreamWriter::with_capacity(entries.len(), selector_bytes)?;
        for (facet, list) in &entries {
            writer.push_packed(*facet, list)?;
        }
        Ok(writer.finish()?)
    }

    fn facet_function_selectors_packed(&self, facet: FacetAddress) -> CoreResult<Bytes> {
        match self.cache.selector_blob(facet) {
            Some(blob) => Ok(Bytes::from(self.read(blob.handle)?)),
            None => Ok(encode_selector_list(&[])?),
        }
    }
}
