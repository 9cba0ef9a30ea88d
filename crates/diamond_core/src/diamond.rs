//! The diamond: dispatch registry, cut protocol, shard cache and loupe
//! behind one handle.

use crate::cache::{release_blobs, RebuildReport, Shard, ShardCache};
use crate::config::{BlobRetention, Config};
use crate::context::CallContext;
use crate::cut::{apply, validate, CutEvent, CutRecord, EventLog, FacetCut};
use crate::error::{CoreError, CoreResult};
use crate::facet::{Facet, FacetCatalog};
use crate::loupe::{CachedLoupe, LiveLoupe, Loupe};
use crate::registry::DispatchRegistry;
use crate::state::{NamespaceRoot, StateStore};
use crate::stats::{DiamondStats, StatsSnapshot};
use crate::types::{Category, CutSequence};
use bytes::Bytes;
use diamond_codec::{FacetAddress, FacetRecord, Selector};
use diamond_storage::{BlobStore, MemoryBlobStore};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a committed cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutReceipt {
    /// Sequence assigned to the cut.
    pub sequence: CutSequence,
    /// Records emitted, in application order.
    pub records: Vec<CutRecord>,
}

impl CutReceipt {
    /// Iterates the events without their sequence stamps.
    pub fn events(&self) -> impl Iterator<Item = &CutEvent> {
        self.records.iter().map(|record| &record.event)
    }
}

struct DiamondInner {
    registry: DispatchRegistry,
    state: StateStore,
    cache: ShardCache,
    cache_enabled: bool,
    store: Box<dyn BlobStore>,
    sequence: CutSequence,
}

/// A diamond instance.
///
/// Every mutation of the registry goes through [`Diamond::diamond_cut`] and
/// is all-or-nothing. Readers observe the registry and the shard cache either
/// before or after a cut, never in between.
///
/// # Example
///
/// ```rust,ignore
/// let diamond = Diamond::in_memory(Config::default())?;
/// let erc20 = diamond.deploy(Arc::new(Erc20Facet::new()))?;
/// diamond.diamond_cut(FacetCut::new().add(erc20, Erc20Facet::SELECTORS))?;
/// diamond.enable_cache()?;
///
/// let facets = diamond.facets()?;
/// ```
pub struct Diamond {
    config: Config,
    catalog: RwLock<FacetCatalog>,
    inner: RwLock<DiamondInner>,
    events: EventLog,
    stats: DiamondStats,
}

impl Diamond {
    /// Creates a diamond writing cache blobs to `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is enabled by `config` and the initial
    /// rebuild fails.
    pub fn new(config: Config, store: Box<dyn BlobStore>) -> CoreResult<Self> {
        let cache_enabled = config.cache_enabled;
        let diamond = Self {
            events: EventLog::with_max_history(config.max_event_history),
            config,
            catalog: RwLock::new(FacetCatalog::new()),
            inner: RwLock::new(DiamondInner {
                registry: DispatchRegistry::new(),
                state: StateStore::new(),
                cache: ShardCache::new(),
                cache_enabled: false,
                store,
                sequence: CutSequence::default(),
            }),
            stats: DiamondStats::new(),
        };

        if cache_enabled {
            diamond.enable_cache()?;
        }
        Ok(diamond)
    }

    /// Creates a diamond backed by a [`MemoryBlobStore`].
    ///
    /// # Errors
    ///
    /// See [`Diamond::new`].
    pub fn in_memory(config: Config) -> CoreResult<Self> {
        Self::new(config, Box::new(MemoryBlobStore::new()))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // === Facets ===

    /// Deploys a facet so cuts can route to it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] for the zero address or an
    /// address already in use.
    pub fn deploy(&self, facet: Arc<dyn Facet>) -> CoreResult<FacetAddress> {
        let address = self.catalog.write().deploy(facet)?;
        debug!(facet = %address, "deployed facet");
        Ok(address)
    }

    /// Returns `true` if a facet is deployed at `address`.
    pub fn is_deployed(&self, address: FacetAddress) -> bool {
        self.catalog.read().contains(address)
    }

    // === Cuts ===

    /// Applies `cut` atomically.
    ///
    /// On success the new registry, state and cache are published together
    /// and the cut's records are emitted. On failure nothing changes and no
    /// record is emitted.
    ///
    /// # Errors
    ///
    /// Returns the first validation, application, delegate or rebuild error.
    pub fn diamond_cut(&self, cut: FacetCut) -> CoreResult<CutReceipt> {
        let catalog = self.catalog.read();
        let mut inner = self.inner.write();

        match self.commit_cut(&mut inner, &catalog, cut) {
            Ok(receipt) => {
                // Published under the write guard so records leave in sequence order.
                self.events.publish(&receipt.records);
                drop(inner);
                self.stats.record_cut_commit();
                info!(
                    sequence = %receipt.sequence,
                    records = receipt.records.len(),
                    "committed cut"
                );
                Ok(receipt)
            }
            Err(err) => {
                self.stats.record_cut_abort();
                warn!(error = %err, "aborted cut");
                Err(err)
            }
        }
    }

    fn commit_cut(
        &self,
        inner: &mut DiamondInner,
        catalog: &FacetCatalog,
        cut: FacetCut,
    ) -> CoreResult<CutReceipt> {
        let mutates = cut.mutates_registry();
        let plan = validate(cut, catalog)?;

        let mut registry = inner.registry.clone();
        let mut state = inner.state.clone();
        let events = apply(plan, &mut registry, &mut state)?;

        let rebuilt = if inner.cache_enabled && mutates {
            let mut cache = inner.cache.clone();
            let report = cache.rebuild_from_registry(
                inner.store.as_mut(),
                &registry,
                catalog,
                &self.config.default_category,
                self.config.dedup_blobs,
            )?;
            Some((cache, report))
        } else {
            None
        };

        let sequence = inner.sequence.next();
        inner.sequence = sequence;
        inner.registry = registry;
        inner.state = state;
        if let Some((cache, report)) = rebuilt {
            inner.cache = cache;
            self.settle_rebuild(inner, &report);
        }

        let records = events
            .into_iter()
            .map(|event| CutRecord { sequence, event })
            .collect();
        Ok(CutReceipt { sequence, records })
    }

    /// Accounts for a committed rebuild and applies the retention policy.
    fn settle_rebuild(&self, inner: &mut DiamondInner, report: &RebuildReport) {
        self.stats.record_rebuild(
            report.written.len() as u64,
            report.reused as u64,
            report.bytes_written,
        );
        if self.config.blob_retention == BlobRetention::Reclaim {
            let released = release_blobs(inner.store.as_mut(), &report.superseded);
            self.stats.record_release(released);
        }
    }

    // === Cache ===

    /// Enables the shard cache and rebuilds every category.
    ///
    /// Does nothing if the cache is already enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the rebuild fails; the cache stays disabled.
    pub fn enable_cache(&self) -> CoreResult<()> {
        let catalog = self.catalog.read();
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if inner.cache_enabled {
            return Ok(());
        }

        let mut cache = ShardCache::new();
        let report = cache.rebuild_from_registry(
            inner.store.as_mut(),
            &inner.registry,
            &catalog,
            &self.config.default_category,
            self.config.dedup_blobs,
        )?;
        inner.cache = cache;
        inner.cache_enabled = true;
        self.settle_rebuild(inner, &report);

        info!(shards = report.shards, blobs = report.written.len(), "enabled shard cache");
        Ok(())
    }

    /// Disables the shard cache and drops its shards.
    ///
    /// Under [`BlobRetention::Reclaim`] the dropped shards' blobs are
    /// released.
    pub fn disable_cache(&self) {
        let mut inner = self.inner.write();
        if !inner.cache_enabled {
            return;
        }

        let dropped = std::mem::take(&mut inner.cache);
        inner.cache_enabled = false;
        if self.config.blob_retention == BlobRetention::Reclaim {
            let released = release_blobs(inner.store.as_mut(), &dropped.handles());
            self.stats.record_release(released);
        }
        info!("disabled shard cache");
    }

    /// Rebuilds every category from the current registry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if the cache is disabled, or
    /// the rebuild error.
    pub fn rebuild_cache(&self) -> CoreResult<RebuildReport> {
        let catalog = self.catalog.read();
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        if !inner.cache_enabled {
            return Err(CoreError::invalid_operation("shard cache is disabled"));
        }

        let mut cache = inner.cache.clone();
        let report = cache.rebuild_from_registry(
            inner.store.as_mut(),
            &inner.registry,
            &catalog,
            &self.config.default_category,
            self.config.dedup_blobs,
        )?;
        inner.cache = cache;
        self.settle_rebuild(inner, &report);
        Ok(report)
    }

    /// Returns `true` if loupe reads are served from the shard cache.
    pub fn is_cache_enabled(&self) -> bool {
        self.inner.read().cache_enabled
    }

    /// Returns a copy of the shard for `category`.
    pub fn shard(&self, category: &Category) -> Option<Shard> {
        self.inner.read().cache.shard(category).cloned()
    }

    // === Loupe ===

    /// Returns the facet `selector` routes to. Always a direct lookup.
    pub fn facet_address(&self, selector: Selector) -> Option<FacetAddress> {
        self.inner.read().registry.facet_address(selector)
    }

    /// Returns every facet owning at least one selector.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a cache blob is missing.
    pub fn facet_addresses(&self) -> CoreResult<Vec<FacetAddress>> {
        self.with_loupe(|loupe| loupe.facet_addresses())
    }

    /// Returns every facet with its selectors.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a cache blob is missing.
    pub fn facets(&self) -> CoreResult<Vec<FacetRecord>> {
        self.with_loupe(|loupe| loupe.facets())
    }

    /// Returns the selectors routed to `facet`; empty if it owns none.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a cache blob is missing.
    pub fn facet_function_selectors(&self, facet: FacetAddress) -> CoreResult<Vec<Selector>> {
        self.with_loupe(|loupe| loupe.facet_function_selectors(facet))
    }

    /// Packed form of [`Diamond::facet_addresses`].
    ///
    /// # Errors
    ///
    /// Returns a storage error if a cache blob is missing.
    pub fn facet_addresses_packed(&self) -> CoreResult<Bytes> {
        self.with_loupe(|loupe| loupe.facet_addresses_packed())
    }

    /// Packed form of [`Diamond::facets`].
    ///
    /// # Errors
    ///
    /// Returns a storage error if a cache blob is missing.
    pub fn facets_packed(&self) -> CoreResult<Bytes> {
        self.with_loupe(|loupe| loupe.facets_packed())
    }

    /// Packed form of [`Diamond::facet_function_selectors`].
    ///
    /// # Errors
    ///
    /// Returns a storage error if a cache blob is missing.
    pub fn facet_function_selectors_packed(&self, facet: FacetAddress) -> CoreResult<Bytes> {
        self.with_loupe(|loupe| loupe.facet_function_selectors_packed(facet))
    }

    /// Returns the facets of one category.
    ///
    /// With the cache enabled this reads the category's shard. Without it,
    /// the registry is partitioned live. Either way a category is known when
    /// it is the default or a deployed facet declares it, and a known
    /// category with no registered facets reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownCategory`] for an unknown category.
    pub fn facet_addresses_in(&self, category: &Category) -> CoreResult<Vec<FacetAddress>> {
        let catalog = self.catalog.read();
        let inner = self.inner.read();
        let known = catalog.knows_category(category, &self.config.default_category);

        if inner.cache_enabled {
            let Some(shard) = inner.cache.shard(category) else {
                if known {
                    return Ok(Vec::new());
                }
                return Err(CoreError::unknown_category(category.as_str()));
            };
            let list = inner.store.read(shard.facet_list().handle)?;
            self.stats.record_blob_read(list.len() as u64);
            return Ok(diamond_codec::decode_address_list(&list)?);
        }

        self.stats.record_live_scan(inner.registry.len() as u64);
        let facets: Vec<FacetAddress> = inner
            .registry
            .facet_addresses()
            .into_iter()
            .filter(|facet| {
                catalog
                    .category_of(*facet)
                    .as_ref()
                    .unwrap_or(&self.config.default_category)
                    == category
            })
            .collect();
        if facets.is_empty() && !known {
            return Err(CoreError::unknown_category(category.as_str()));
        }
        Ok(facets)
    }

    /// Runs `read` against whichever loupe currently serves reads.
    pub fn with_loupe<T>(&self, read: impl FnOnce(&dyn Loupe) -> CoreResult<T>) -> CoreResult<T> {
        let inner = self.inner.read();
        if inner.cache_enabled {
            read(&CachedLoupe::new(&inner.cache, inner.store.as_ref(), &self.stats))
        } else {
            read(&LiveLoupe::new(&inner.registry, &self.stats))
        }
    }

    /// Runs `read` against the live loupe regardless of cache state.
    pub fn with_live_loupe<T>(&self, read: impl FnOnce(&LiveLoupe<'_>) -> T) -> T {
        let inner = self.inner.read();
        read(&LiveLoupe::new(&inner.registry, &self.stats))
    }

    /// Runs `read` against the cached loupe.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] if the cache is disabled.
    pub fn with_cached_loupe<T>(
        &self,
        read: impl FnOnce(&CachedLoupe<'_>) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let inner = self.inner.read();
        if !inner.cache_enabled {
            return Err(CoreError::invalid_operation("shard cache is disabled"));
        }
        read(&CachedLoupe::new(&inner.cache, inner.store.as_ref(), &self.stats))
    }

    // === Dispatch ===

    /// Routes a call to the facet registered for `selector`.
    ///
    /// State written by the facet is kept only if the call succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FunctionNotFound`] for an unregistered selector,
    /// [`CoreError::CallReverted`] if the facet reverts, and
    /// [`CoreError::ReservedNamespace`] if it wrote under the registry's root.
    pub fn call(&self, selector: Selector, input: &[u8]) -> CoreResult<Vec<u8>> {
        let catalog = self.catalog.read();
        let mut inner = self.inner.write();

        let address = inner
            .registry
            .facet_address(selector)
            .ok_or(CoreError::FunctionNotFound { selector })?;
        let facet = catalog.resolve(address)?;

        let mut state = inner.state.clone();
        let mut ctx = CallContext::new(selector, address, &mut state);
        let outcome = facet.invoke(&mut ctx, selector, input);
        let violation = ctx.into_violation();

        let result = match (violation, outcome) {
            (Some(err), _) => Err(err),
            (None, Err(revert)) => Err(CoreError::CallReverted {
                selector,
                reason: revert.to_string(),
            }),
            (None, Ok(output)) => Ok(output),
        };

        self.stats.record_call(result.is_err());
        if result.is_ok() {
            inner.state = state;
        }
        result
    }

    /// Reads `key` in `namespace` from committed state.
    pub fn read_state(&self, namespace: &str, key: &[u8]) -> Option<Vec<u8>> {
        self.inner
            .read()
            .state
            .get(NamespaceRoot::derive(namespace), key)
            .map(<[u8]>::to_vec)
    }

    /// Returns the root the registry is keyed under.
    pub fn registry_root(&self) -> NamespaceRoot {
        NamespaceRoot::registry()
    }

    // === Registry ===

    /// Returns the ordered selector list.
    pub fn selectors(&self) -> Vec<Selector> {
        self.inner.read().registry.selectors().to_vec()
    }

    /// Returns the number of registered selectors.
    pub fn selector_count(&self) -> usize {
        self.inner.read().registry.len()
    }

    /// Returns a copy of the registry.
    pub fn registry_snapshot(&self) -> DispatchRegistry {
        self.inner.read().registry.clone()
    }

    /// Checks registry invariants and, with the cache enabled, that the
    /// cache agrees with the registry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Inconsistent`] describing the first mismatch.
    pub fn verify(&self) -> CoreResult<()> {
        let inner = self.inner.read();
        inner.registry.verify()?;
        if !inner.cache_enabled {
            return Ok(());
        }

        let cached = CachedLoupe::new(&inner.cache, inner.store.as_ref(), &self.stats).facets()?;
        let live = inner.registry.group_by_facet();
        let cached: HashSet<FacetRecord> = cached.into_iter().collect();
        let live: HashSet<FacetRecord> = live.into_iter().collect();
        if cached != live {
            return Err(CoreError::inconsistent(format!(
                "cache holds {} facets, registry groups {}",
                cached.len(),
                live.len()
            )));
        }
        Ok(())
    }

    // === Events, stats, storage ===

    /// Subscribes to future cut records.
    pub fn subscribe(&self) -> Receiver<CutRecord> {
        self.events.subscribe()
    }

    /// Returns cut records after `cursor`, up to `limit`.
    pub fn poll(&self, cursor: CutSequence, limit: usize) -> Vec<CutRecord> {
        self.events.poll(cursor, limit)
    }

    /// Returns the event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Returns the sequence of the last committed cut.
    pub fn sequence(&self) -> CutSequence {
        self.inner.read().sequence
    }

    /// Returns a snapshot of the statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns the number of live blobs in the store.
    pub fn live_blob_count(&self) -> usize {
        self.inner.read().store.live_count()
    }

    /// Returns `true` if `handle` is live in the store.
    pub fn blob_is_live(&self, handle: diamond_storage::BlobHandle) -> bool {
        self.inner.read().store.contains(handle)
    }

    /// Flushes the blob store.
    ///
    /// # Errors
    ///
    /// Returns the store's flush error.
    pub fn flush(&self) -> CoreResult<()> {
        self.inner.write().store.flush()?;
        Ok(())
    }
}

impl fmt::Debug for Diamond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let catalog = self.catalog.read();
        let inner = self.inner.read();
        f.debug_struct("Diamond")
            .field("selectors", &inner.registry.len())
            .field("cache_enabled", &inner.cache_enabled)
            .field("sequence", &inner.sequence)
            .field("catalog", &*catalog)
            .finish()
    }
}
