//! The shard cache over the file-backed blob store.

use diamond_core::{Config, FacetCut, FileBlobStore};
use diamond_testkit::prelude::*;

#[test]
fn cached_reads_come_from_the_blob_log() {
    let diamond = TestDiamond::file(Config::new().cache_enabled(true));
    let h1 = diamond.deploy(StaticFacet::new(1, [sel(1), sel(2)]));
    let h2 = diamond.deploy(StaticFacet::new(2, [sel(3)]));

    diamond
        .diamond_cut(FacetCut::new().add(h1, [sel(1), sel(2)]).add(h2, [sel(3)]))
        .unwrap();
    diamond.flush().unwrap();

    assert_eq!(diamond.facet_addresses().unwrap(), vec![h1, h2]);
    assert_eq!(diamond.facet_function_selectors(h2).unwrap(), vec![sel(3)]);
    diamond.verify().unwrap();
}

#[test]
fn inspect_counts_blobs_and_releases() {
    let diamond = TestDiamond::file(Config::new().cache_enabled(true));
    let h1 = diamond.deploy(StaticFacet::new(1, [sel(1), sel(2)]));

    // enable: 1 list; add: 1 list + 1 selector blob, old list released.
    diamond
        .diamond_cut(FacetCut::new().add(h1, [sel(1), sel(2)]))
        .unwrap();
    // remove: 1 list, old list and selector blob released.
    diamond.diamond_cut(FacetCut::new().remove(h1)).unwrap();
    diamond.flush().unwrap();

    let report = FileBlobStore::inspect(&diamond.blob_path().unwrap()).unwrap();
    assert_eq!(report.blobs, 4);
    assert_eq!(report.releases, 3);
    assert_eq!(report.records, 7);
    assert_eq!(report.live_blobs, diamond.live_blob_count());
    assert_eq!(report.live_blobs, 1);
    assert!(!report.has_torn_tail());
}

#[test]
fn stats_charge_cached_reads_by_blob_size() {
    let diamond = TestDiamond::file(Config::new().cache_enabled(true));
    let h1 = diamond.deploy(StaticFacet::new(1, selectors(1..41)));
    diamond
        .diamond_cut(FacetCut::new().add(h1, selectors(1..41)))
        .unwrap();

    let before = diamond.stats();
    diamond.facet_function_selectors(h1).unwrap();
    let delta = diamond.stats().since(&before);

    // 4-byte count + 40 selectors = 164 bytes = 6 words, plus one blob read.
    assert_eq!(delta.blobs_read, 1);
    assert_eq!(delta.blob_bytes_read, 164);
    assert_eq!(delta.registry_entries_scanned, 0);
    assert_eq!(delta.read_cost(), 1 + 6);
}
