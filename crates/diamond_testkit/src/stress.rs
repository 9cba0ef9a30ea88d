//! Stress tests for the diamond.
//!
//! These verify behavior under repeated cuts and concurrent loupe reads.

use crate::fixtures::{selectors, StaticFacet};
use diamond_core::{Diamond, FacetAddress, FacetCut, FacetRecord, Selector};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Facet indexes used by stress runs start here, clear of fixture facets.
pub const STRESS_FACET_BASE: u64 = 10_000;

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of cuts to perform.
    pub operations: usize,
    /// Number of concurrent reader threads.
    pub threads: usize,
    /// Number of facets rotated through.
    pub facet_count: usize,
    /// Selectors per facet.
    pub selectors_per_facet: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            facet_count: 16,
            selectors_per_facet: 8,
        }
    }
}

/// Deploys the stress facets and returns them with their selectors.
fn deploy_stress_facets(
    diamond: &Diamond,
    config: &StressConfig,
) -> Vec<(FacetAddress, Vec<Selector>)> {
    let width = config.selectors_per_facet as u32;
    (0..config.facet_count)
        .map(|i| {
            let start = STRESS_FACET_BASE as u32 + i as u32 * width;
            let owned = selectors(start..start + width);
            let facet = StaticFacet::new(STRESS_FACET_BASE + i as u64, owned.clone());
            let address = diamond
                .deploy(Arc::new(facet))
                .expect("Failed to deploy stress facet");
            (address, owned)
        })
        .collect()
}

/// Adds and removes facets in rotation.
///
/// Cut `i` adds facet `i % facet_count` if absent, otherwise removes it.
pub fn stress_cut_churn(diamond: &Diamond, config: &StressConfig) -> StressTestResult {
    let facets = deploy_stress_facets(diamond, config);
    let mut present = vec![false; facets.len()];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let slot = i % facets.len();
        let (address, owned) = &facets[slot];
        let cut = if present[slot] {
            FacetCut::new().remove(*address)
        } else {
            FacetCut::new().add(*address, owned.iter().copied())
        };

        match diamond.diamond_cut(cut) {
            Ok(_) => {
                present[slot] = !present[slot];
                successful += 1;
            }
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Checks that a grouped view is internally consistent.
pub fn is_consistent_snapshot(records: &[FacetRecord]) -> bool {
    let mut seen_facets = HashSet::new();
    let mut seen_selectors = HashSet::new();
    records.iter().all(|record| {
        !record.selectors.is_empty()
            && seen_facets.insert(record.address)
            && record.selectors.iter().all(|s| seen_selectors.insert(*s))
    })
}

/// Runs cut churn while reader threads poll the loupe.
///
/// Every snapshot a reader observes must be consistent; the returned
/// result counts reader snapshots, with inconsistent ones as failures.
pub fn stress_concurrent_readers(diamond: Arc<Diamond>, config: &StressConfig) -> StressTestResult {
    let facets = deploy_stress_facets(&diamond, config);
    let done = Arc::new(AtomicBool::new(false));
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let readers: Vec<_> = (0..config.threads)
        .map(|_| {
            let diamond = Arc::clone(&diamond);
            let done = Arc::clone(&done);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    match diamond.facets() {
                        Ok(records) if is_consistent_snapshot(&records) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    let mut present = vec![false; facets.len()];
    for i in 0..config.operations {
        let slot = i % facets.len();
        let (address, owned) = &facets[slot];
        let cut = if present[slot] {
            FacetCut::new().remove(*address)
        } else {
            FacetCut::new().add(*address, owned.iter().copied())
        };
        if diamond.diamond_cut(cut).is_ok() {
            present[slot] = !present[slot];
        }
    }

    done.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().expect("Reader thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use diamond_core::Config;

    fn small_config() -> StressConfig {
        StressConfig {
            operations: 200,
            threads: 2,
            facet_count: 8,
            selectors_per_facet: 4,
        }
    }

    #[test]
    fn test_cut_churn_live() {
        let diamond = Diamond::in_memory(Config::default()).unwrap();
        let result = stress_cut_churn(&diamond, &small_config());
        result.print_summary("Cut churn (live)");

        assert_eq!(result.failed_ops, 0);
        assert_eq!(diamond.sequence().as_u64(), 200);
        diamond.verify().unwrap();
    }

    #[test]
    fn test_cut_churn_cached_reclaims_blobs() {
        let diamond = Diamond::in_memory(Config::new().cache_enabled(true)).unwrap();
        let result = stress_cut_churn(&diamond, &small_config());

        assert_eq!(result.failed_ops, 0);
        diamond.verify().unwrap();

        // 200 cuts over 8 facets leaves every facet removed again.
        assert_eq!(diamond.selector_count(), 0);
        assert!(diamond.live_blob_count() <= 1);
    }

    #[test]
    fn test_concurrent_readers_see_consistent_snapshots() {
        let diamond = Arc::new(Diamond::in_memory(Config::new().cache_enabled(true)).unwrap());
        let result = stress_concurrent_readers(Arc::clone(&diamond), &small_config());
        result.print_summary("Concurrent readers");

        assert_eq!(result.failed_ops, 0);
        diamond.verify().unwrap();
    }

    #[test]
    fn test_consistent_snapshot_rejects_duplicates() {
        let a = FacetAddress::from_index(1);
        let b = FacetAddress::from_index(2);
        let s = Selector::from_u32(7);

        assert!(is_consistent_snapshot(&[FacetRecord::new(a, vec![s])]));
        assert!(!is_consistent_snapshot(&[
            FacetRecord::new(a, vec![s]),
            FacetRecord::new(b, vec![s]),
        ]));
        assert!(!is_consistent_snapshot(&[FacetRecord::new(a, vec![])]));
    }
}
