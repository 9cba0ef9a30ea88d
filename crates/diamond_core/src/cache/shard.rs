//! A frozen snapshot of one category.

use crate::types::Category;
use diamond_codec::FacetAddress;
use diamond_storage::{BlobHandle, StoredBlob};
use std::collections::HashMap;

/// Blob handles for one category's facet grouping.
///
/// A shard is built whole by [`super::ShardCache::rebuild_shard`] and never
/// updated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub(crate) category: Category,
    pub(crate) facet_list: StoredBlob,
    pub(crate) per_facet: HashMap<FacetAddress, StoredBlob>,
    pub(crate) facet_count: usize,
    pub(crate) selector_count: usize,
}

impl Shard {
    /// Returns the shard's category.
    #[must_use]
    pub fn category(&self) -> &Category {
        &self.category
    }

    /// Returns the blob holding the packed facet list.
    #[must_use]
    pub fn facet_list(&self) -> StoredBlob {
        self.facet_list
    }

    /// Returns the blob holding `facet`'s packed selector list.
    #[must_use]
    pub fn selector_blob(&self, facet: FacetAddress) -> Option<StoredBlob> {
        self.per_facet.get(&facet).copied()
    }

    /// Returns `true` if `facet` belongs to this shard.
    #[must_use]
    pub fn contains(&self, facet: FacetAddress) -> bool {
        self.per_facet.contains_key(&facet)
    }

    /// Returns the number of facets.
    #[must_use]
    pub fn facet_count(&self) -> usize {
        self.facet_count
    }

    /// Returns the number of selectors across all facets.
    #[must_use]
    pub fn selector_count(&self) -> usize {
        self.selector_count
    }

    /// Returns every blob handle the shard references.
    #[must_use]
    pub fn handles(&self) -> Vec<BlobHandle> {
        std::iter::once(self.facet_list.handle)
            .chain(self.per_facet.values().map(|blob| blob.handle))
            .collect()
    }
}
