//! Shard rebuilds.

use super::{release_blobs, Shard};
use crate::error::{CoreError, CoreResult};
use crate::facet::FacetCatalog;
use crate::registry::DispatchRegistry;
use crate::types::Category;
use diamond_codec::{encode_address_list, encode_selector_list, FacetAddress, Selector};
use diamond_storage::{
    reuse_or_write, BlobHandle, BlobStore, ContentDigest, StoredBlob, WriteOutcome,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Blob traffic caused by one or more shard rebuilds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Blobs written by the rebuild.
    pub written: Vec<BlobHandle>,
    /// Number of per-facet blobs reused by content.
    pub reused: usize,
    /// Blobs the new shards no longer reference.
    pub superseded: Vec<BlobHandle>,
    /// Bytes written.
    pub bytes_written: u64,
    /// Number of categories rebuilt.
    pub shards: usize,
}

impl RebuildReport {
    fn merge(&mut self, other: Self) {
        self.written.extend(other.written);
        self.reused += other.reused;
        self.superseded.extend(other.superseded);
        self.bytes_written += other.bytes_written;
        self.shards += other.shards;
    }
}

/// Per-category shards plus the set of categories ever built.
#[derive(Debug, Clone, Default)]
pub struct ShardCache {
    shards: BTreeMap<Category, Shard>,
    categories: BTreeSet<Category>,
}

impl ShardCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the shard for `category` from `facets` and their selector
    /// lists (`selector_lists[i]` belongs to `facets[i]`).
    ///
    /// The facet list is packed into a single blob. Each selector list is
    /// packed into its own blob; with `dedup` set, a list whose encoding
    /// matches the facet's current blob keeps that blob. Facets that were in
    /// the previous shard but not in `facets` lose their entry, so a later
    /// re-add always writes a fresh blob.
    ///
    /// On error every blob written by this call is released and the cache is
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] for mismatched inputs (length
    /// mismatch, repeated facet, empty selector list) and storage or codec
    /// errors from packing and writing.
    pub fn rebuild_shard(
        &mut self,
        store: &mut dyn BlobStore,
        category: &Category,
        facets: &[FacetAddress],
        selector_lists: &[Vec<Selector>],
        dedup: bool,
    ) -> CoreResult<RebuildReport> {
        if facets.len() != selector_lists.len() {
            return Err(CoreError::invalid_operation(format!(
                "{} facets but {} selector lists",
                facets.len(),
                selector_lists.len()
            )));
        }

        let mut members = HashSet::with_capacity(facets.len());
        for (facet, selectors) in facets.iter().zip(selector_lists) {
            if !members.insert(*facet) {
                return Err(CoreError::invalid_operation(format!(
                    "facet {facet} appears twice in shard {category}"
                )));
            }
            if selectors.is_empty() {
                return Err(CoreError::NoSelectors { facet: *facet });
            }
        }

        let previous = self.shards.get(category);
        let mut report = RebuildReport {
            shards: 1,
            ..RebuildReport::default()
        };

        if let Some(previous) = previous {
            report.superseded.push(previous.facet_list.handle);
            report.superseded.extend(
                previous
                    .per_facet
                    .iter()
                    .filter(|(facet, _)| !members.contains(facet))
                    .map(|(_, blob)| blob.handle),
            );
        }

        let built = Self::write_shard(
            store,
            category,
            facets,
            selector_lists,
            previous,
            dedup,
            &mut report,
        );
        let shard = match built {
            Ok(shard) => shard,
            Err(err) => {
                release_blobs(store, &report.written);
                return Err(err);
            }
        };

        debug!(
            category = %category,
            facets = shard.facet_count,
            selectors = shard.selector_count,
            written = report.written.len(),
            reused = report.reused,
            "rebuilt shard"
        );
        self.shards.insert(category.clone(), shard);
        self.categories.insert(category.clone());
        Ok(report)
    }

    fn write_shard(
        store: &mut dyn BlobStore,
        category: &Category,
        facets: &[FacetAddress],
        selector_lists: &[Vec<Selector>],
        previous: Option<&Shard>,
        dedup: bool,
        report: &mut RebuildReport,
    ) -> CoreResult<Shard> {
        let list = encode_address_list(facets)?;
        let list_handle = store.write(&list)?;
        report.written.push(list_handle);
        report.bytes_written += list.len() as u64;
        let facet_list = StoredBlob {
            handle: list_handle,
            digest: ContentDigest::of(&list),
        };

        let mut per_facet = HashMap::with_capacity(facets.len());
        let mut selector_count = 0;
        for (facet, selectors) in facets.iter().zip(selector_lists) {
            let existing = previous.and_then(|shard| shard.per_facet.get(facet));
            let encoded = encode_selector_list(selectors)?;
            let outcome = reuse_or_write(store, existing.filter(|_| dedup), &encoded)?;

            match outcome {
                WriteOutcome::Reused(_) => report.reused += 1,
                WriteOutcome::Written(blob) => {
                    report.written.push(blob.handle);
                    report.bytes_written += encoded.len() as u64;
                    if let Some(old) = existing {
                        report.superseded.push(old.handle);
                    }
                }
            }

            per_facet.insert(*facet, outcome.blob());
            selector_count += selectors.len();
        }

        Ok(Shard {
            category: category.clone(),
            facet_list,
            per_facet,
            facet_count: facets.len(),
            selector_count,
        })
    }

    /// Rebuilds every category from the registry's current grouping.
    ///
    /// Facets go to the category their catalog entry declares, or to
    /// `default_category`. Every known category is rebuilt, including ones
    /// that are now empty, together with the default category and any
    /// category that appears for the first time.
    ///
    /// On error every blob written by this call is released and categories
    /// rebuilt before the failure keep their new shards only in `self`;
    /// callers stage the cache on a clone and discard it.
    ///
    /// # Errors
    ///
    /// Propagates the first failing [`ShardCache::rebuild_shard`].
    pub fn rebuild_from_registry(
        &mut self,
        store: &mut dyn BlobStore,
        registry: &DispatchRegistry,
        catalog: &FacetCatalog,
        default_category: &Category,
        dedup: bool,
    ) -> CoreResult<RebuildReport> {
        let mut partitions: BTreeMap<Category, (Vec<FacetAddress>, Vec<Vec<Selector>>)> =
            BTreeMap::new();
        for record in registry.group_by_facet() {
            let category = catalog
                .category_of(record.address)
                .unwrap_or_else(|| default_category.clone());
            let (facets, lists) = partitions.entry(category).or_default();
            facets.push(record.address);
            lists.push(record.selectors);
        }

        let mut targets = self.categories.clone();
        targets.insert(default_category.clone());
        targets.extend(partitions.keys().cloned());

        let mut total = RebuildReport::default();
        for category in targets {
            let (facets, lists) = partitions.remove(&category).unwrap_or_default();
            match self.rebuild_shard(store, &category, &facets, &lists, dedup) {
                Ok(report) => total.merge(report),
                Err(err) => {
                    release_blobs(store, &total.written);
                    return Err(err);
                }
            }
        }
        Ok(total)
    }

    /// Returns the shard for `category`.
    #[must_use]
    pub fn shard(&self, category: &Category) -> Option<&Shard> {
        self.shards.get(category)
    }

    /// Iterates shards in category order.
    pub fn shards(&self) -> impl Iterator<Item = &Shard> {
        self.shards.values()
    }

    /// Iterates every category ever built.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Returns `true` if `category` has been built.
    #[must_use]
    pub fn knows(&self, category: &Category) -> bool {
        self.categories.contains(category)
    }

    /// Finds the selector blob for `facet` in whichever shard holds it.
    #[must_use]
    pub fn selector_blob(&self, facet: FacetAddress) -> Option<StoredBlob> {
        self.shards
            .values()
            .find_map(|shard| shard.selector_blob(facet))
    }

    /// Returns the total number of facets across shards.
    #[must_use]
    pub fn facet_count(&self) -> usize {
        self.shards.values().map(Shard::facet_count).sum()
    }

    /// Returns every blob handle referenced by any shard.
    #[must_use]
    pub fn handles(&self) -> Vec<BlobHandle> {
        self.shards.values().flat_map(Shard::handles).collect()
    }

    /// Returns `true` if nothing has been built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
