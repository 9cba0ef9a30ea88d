//! Blob lifecycle regressions around removal and re-addition.

use diamond_core::{BlobRetention, Category, Config, FacetCut};
use diamond_testkit::prelude::*;

fn cached(retention: BlobRetention) -> Config {
    Config::new().cache_enabled(true).blob_retention(retention)
}

fn selector_handle(diamond: &TestDiamond, index: u64) -> diamond_core::BlobHandle {
    diamond
        .shard(&Category::default())
        .and_then(|shard| shard.selector_blob(facet(index)))
        .map(|blob| blob.handle)
        .expect("facet has no selector blob")
}

#[test]
fn readded_facet_with_same_list_gets_fresh_blob() {
    for retention in [BlobRetention::Reclaim, BlobRetention::Retain] {
        let diamond = TestDiamond::memory(cached(retention));
        let h1 = diamond.deploy(StaticFacet::new(1, [sel(1), sel(2)]));

        diamond
            .diamond_cut(FacetCut::new().add(h1, [sel(1), sel(2)]))
            .unwrap();
        let before = selector_handle(&diamond, 1);

        diamond.diamond_cut(FacetCut::new().remove(h1)).unwrap();
        assert!(diamond.shard(&Category::default()).unwrap().selector_blob(h1).is_none());
        assert_eq!(
            diamond.blob_is_live(before),
            retention == BlobRetention::Retain
        );

        diamond
            .diamond_cut(FacetCut::new().add(h1, [sel(1), sel(2)]))
            .unwrap();
        let after = selector_handle(&diamond, 1);

        assert_ne!(after, before);
        assert!(diamond.blob_is_live(after));
        assert_eq!(diamond.facet_function_selectors(h1).unwrap(), vec![sel(1), sel(2)]);
        diamond.verify().unwrap();
    }
}

#[test]
fn readded_facet_with_different_list_reads_new_list() {
    for retention in [BlobRetention::Reclaim, BlobRetention::Retain] {
        let diamond = TestDiamond::memory(cached(retention));
        let h1 = diamond.deploy(StaticFacet::new(1, [sel(1), sel(2), sel(5)]));

        diamond
            .diamond_cut(FacetCut::new().add(h1, [sel(1), sel(2)]))
            .unwrap();
        diamond.diamond_cut(FacetCut::new().remove(h1)).unwrap();
        diamond
            .diamond_cut(FacetCut::new().add(h1, [sel(5), sel(1)]))
            .unwrap();

        assert_eq!(diamond.facet_function_selectors(h1).unwrap(), vec![sel(5), sel(1)]);
        diamond.verify().unwrap();
    }
}

#[test]
fn unchanged_facet_keeps_its_blob_across_unrelated_cuts() {
    let diamond = scenarios::two_facets(cached(BlobRetention::Reclaim));
    let before = selector_handle(&diamond, 1);
    let h3 = diamond.deploy(StaticFacet::new(3, [sel(7)]));

    diamond.diamond_cut(FacetCut::new().add(h3, [sel(7)])).unwrap();

    assert_eq!(selector_handle(&diamond, 1), before);
    assert!(diamond.stats().blobs_reused >= 2);
}

#[test]
fn dedup_off_rewrites_every_facet() {
    let diamond = scenarios::two_facets(cached(BlobRetention::Reclaim).dedup_blobs(false));
    let before = selector_handle(&diamond, 1);
    let h3 = diamond.deploy(StaticFacet::new(3, [sel(7)]));

    diamond.diamond_cut(FacetCut::new().add(h3, [sel(7)])).unwrap();

    let after = selector_handle(&diamond, 1);
    assert_ne!(after, before);
    assert!(!diamond.blob_is_live(before));
    assert_eq!(diamond.facet_function_selectors(facet(1)).unwrap(), vec![sel(1), sel(2)]);
}

#[test]
fn reclaim_keeps_only_current_shard_blobs_live() {
    let diamond = scenarios::two_facets(cached(BlobRetention::Reclaim));
    diamond.diamond_cut(FacetCut::new().remove(facet(1))).unwrap();

    // Default shard: one facet list plus one selector list.
    let shard = diamond.shard(&Category::default()).unwrap();
    assert_eq!(diamond.live_blob_count(), shard.handles().len());
    assert_eq!(diamond.live_blob_count(), 2);

    diamond.disable_cache();
    assert_eq!(diamond.live_blob_count(), 0);
}

#[test]
fn retain_keeps_superseded_blobs_live() {
    let diamond = scenarios::two_facets(cached(BlobRetention::Retain));
    let live_before = diamond.live_blob_count();
    diamond.diamond_cut(FacetCut::new().remove(facet(1))).unwrap();

    assert!(diamond.live_blob_count() > live_before);
    diamond.disable_cache();
    assert!(diamond.live_blob_count() > 0);
}

#[test]
fn disabled_cache_skips_rebuild_until_reenabled() {
    let diamond = scenarios::two_facets(cached(BlobRetention::Reclaim));
    diamond.disable_cache();
    diamond.diamond_cut(FacetCut::new().remove(facet(2))).unwrap();
    assert_eq!(diamond.live_blob_count(), 0);

    diamond.enable_cache().unwrap();
    assert_eq!(diamond.facet_addresses().unwrap(), vec![facet(1)]);
    diamond.verify().unwrap();
}
