//! Diamond statistics.
//!
//! Counters are deterministic work units: the number of registry entries a
//! live loupe read scanned, or the number of blob bytes a cached read copied.
//! The benchmark compares implementations by these numbers instead of by
//! wall-clock time.
//!
//! # Usage
//!
//! ```rust,ignore
//! let diamond = Diamond::in_memory(Config::default());
//! diamond.facets()?;
//!
//! let stats = diamond.stats();
//! println!("Entries scanned: {}", stats.registry_entries_scanned);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Bytes per work unit when costing blob reads.
pub const WORD_SIZE: u64 = 32;

/// Diamond statistics and metrics.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct DiamondStats {
    // Cut counters
    cuts_committed: AtomicU64,
    cuts_aborted: AtomicU64,

    // Dispatch counters
    calls_dispatched: AtomicU64,
    calls_reverted: AtomicU64,

    // Cache counters
    shard_rebuilds: AtomicU64,
    blobs_written: AtomicU64,
    blobs_reused: AtomicU64,
    blobs_released: AtomicU64,
    blob_bytes_written: AtomicU64,

    // Loupe counters
    blobs_read: AtomicU64,
    blob_bytes_read: AtomicU64,
    live_scans: AtomicU64,
    registry_entries_scanned: AtomicU64,
}

impl DiamondStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_cut_commit(&self) {
        self.cuts_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cut_abort(&self) {
        self.cuts_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_call(&self, reverted: bool) {
        self.calls_dispatched.fetch_add(1, Ordering::Relaxed);
        if reverted {
            self.calls_reverted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records one shard rebuild and the blob traffic it caused.
    pub(crate) fn record_rebuild(&self, written: u64, reused: u64, bytes_written: u64) {
        self.shard_rebuilds.fetch_add(1, Ordering::Relaxed);
        self.blobs_written.fetch_add(written, Ordering::Relaxed);
        self.blobs_reused.fetch_add(reused, Ordering::Relaxed);
        self.blob_bytes_written
            .fetch_add(bytes_written, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self, count: u64) {
        self.blobs_released.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a blob read by a cached loupe call.
    pub(crate) fn record_blob_read(&self, bytes: u64) {
        self.blobs_read.fetch_add(1, Ordering::Relaxed);
        self.blob_bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a live loupe scan over `entries` registry entries.
    pub(crate) fn record_live_scan(&self, entries: u64) {
        self.live_scans.fetch_add(1, Ordering::Relaxed);
        self.registry_entries_scanned
            .fetch_add(entries, Ordering::Relaxed);
    }

    /// Returns the number of committed cuts.
    pub fn cuts_committed(&self) -> u64 {
        self.cuts_committed.load(Ordering::Relaxed)
    }

    /// Returns the number of aborted cuts.
    pub fn cuts_aborted(&self) -> u64 {
        self.cuts_aborted.load(Ordering::Relaxed)
    }

    /// Returns the number of shard rebuilds.
    pub fn shard_rebuilds(&self) -> u64 {
        self.shard_rebuilds.load(Ordering::Relaxed)
    }

    /// Returns the number of blobs released.
    pub fn blobs_released(&self) -> u64 {
        self.blobs_released.load(Ordering::Relaxed)
    }

    /// Returns the number of registry entries visited by live scans.
    pub fn registry_entries_scanned(&self) -> u64 {
        self.registry_entries_scanned.load(Ordering::Relaxed)
    }

    /// Returns the number of blob bytes copied by cached reads.
    pub fn blob_bytes_read(&self) -> u64 {
        self.blob_bytes_read.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            cuts_committed: load(&self.cuts_committed),
            cuts_aborted: load(&self.cuts_aborted),
            calls_dispatched: load(&self.calls_dispatched),
            calls_reverted: load(&self.calls_reverted),
            shard_rebuilds: load(&self.shard_rebuilds),
            blobs_written: load(&self.blobs_written),
            blobs_reused: load(&self.blobs_reused),
            blobs_released: load(&self.blobs_released),
            blob_bytes_written: load(&self.blob_bytes_written),
            blobs_read: load(&self.blobs_read),
            blob_bytes_read: load(&self.blob_bytes_read),
            live_scans: load(&self.live_scans),
            registry_entries_scanned: load(&self.registry_entries_scanned),
        }
    }
}

/// A point-in-time snapshot of diamond statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Committed cuts.
    pub cuts_committed: u64,
    /// Aborted cuts.
    pub cuts_aborted: u64,
    /// Calls routed through dispatch.
    pub calls_dispatched: u64,
    /// Dispatched calls that reverted.
    pub calls_reverted: u64,
    /// Shard rebuilds.
    pub shard_rebuilds: u64,
    /// Blobs written by rebuilds.
    pub blobs_written: u64,
    /// Per-facet blobs reused by content.
    pub blobs_reused: u64,
    /// Superseded blobs released.
    pub blobs_released: u64,
    /// Bytes written by rebuilds.
    pub blob_bytes_written: u64,
    /// Blobs read by cached loupe calls.
    pub blobs_read: u64,
    /// Bytes read by cached loupe calls.
    pub blob_bytes_read: u64,
    /// Live loupe scans.
    pub live_scans: u64,
    /// Registry entries visited by live scans.
    pub registry_entries_scanned: u64,
}

impl StatsSnapshot {
    /// Returns the counters accumulated since `earlier`.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            cuts_committed: self.cuts_committed.saturating_sub(earlier.cuts_committed),
            cuts_aborted: self.cuts_aborted.saturating_sub(earlier.cuts_aborted),
            calls_dispatched: self.calls_dispatched.saturating_sub(earlier.calls_dispatched),
            calls_reverted: self.calls_reverted.saturating_sub(earlier.calls_reverted),
            shard_rebuilds: self.shard_rebuilds.saturating_sub(earlier.shard_rebuilds),
            blobs_written: self.blobs_written.saturating_sub(earlier.blobs_written),
            blobs_reused: self.blobs_reused.saturating_sub(earlier.blobs_reused),
            blobs_released: self.blobs_released.saturating_sub(earlier.blobs_released),
            blob_bytes_written: self
                .blob_bytes_written
                .saturating_sub(earlier.blob_bytes_written),
            blobs_read: self.blobs_read.saturating_sub(earlier.blobs_read),
            blob_bytes_read: self.blob_bytes_read.saturating_sub(earlier.blob_bytes_read),
            live_scans: self.live_scans.saturating_sub(earlier.live_scans),
            registry_entries_scanned: self
                .registry_entries_scanned
                .saturating_sub(earlier.registry_entries_scanned),
        }
    }

    /// Returns the loupe read cost: one unit per scanned entry, one per blob
    /// read, and one per started [`WORD_SIZE`] bytes copied.
    #[must_use]
    pub fn read_cost(&self) -> u64 {
        self.registry_entries_scanned
            + self.blobs_read
            + self.blob_bytes_read.div_ceil(WORD_SIZE)
    }
}
