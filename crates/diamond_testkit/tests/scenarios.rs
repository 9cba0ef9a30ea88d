//! End-to-end cut and loupe scenarios.

use diamond_core::{Category, Config, CoreError, CutEvent, FacetCut, Selector};
use diamond_testkit::prelude::*;
use std::collections::HashSet;

fn as_set<T: std::hash::Hash + Eq>(items: Vec<T>) -> HashSet<T> {
    items.into_iter().collect()
}

#[test]
fn add_two_facets_then_remove_one() {
    let diamond = TestDiamond::memory(Config::default());
    let h1 = diamond.deploy(StaticFacet::new(1, [sel(1), sel(2)]));
    let h2 = diamond.deploy(StaticFacet::new(2, [sel(3)]));

    diamond
        .diamond_cut(FacetCut::new().add(h1, [sel(1), sel(2)]))
        .unwrap();
    diamond.diamond_cut(FacetCut::new().add(h2, [sel(3)])).unwrap();

    assert_eq!(as_set(diamond.facet_addresses().unwrap()), as_set(vec![h1, h2]));
    assert_eq!(diamond.facet_function_selectors(h1).unwrap(), vec![sel(1), sel(2)]);
    assert_eq!(diamond.facet_address(sel(3)), Some(h2));

    diamond.diamond_cut(FacetCut::new().remove(h1)).unwrap();

    assert!(diamond.facet_function_selectors(h1).unwrap().is_empty());
    assert_eq!(diamond.facet_address(sel(1)), None);
    assert_eq!(diamond.selectors(), vec![sel(3)]);
    assert_eq!(diamond.facet_addresses().unwrap(), vec![h2]);
}

#[test]
fn enabling_cache_matches_live_scan() {
    let diamond = scenarios::two_facets(Config::default());
    diamond.diamond_cut(FacetCut::new().remove(facet(1))).unwrap();

    let live = diamond.facet_addresses().unwrap();
    diamond.enable_cache().unwrap();
    let cached = diamond.facet_addresses().unwrap();

    assert_eq!(as_set(cached), as_set(live));
    diamond.verify().unwrap();
}

#[test]
fn replace_emits_one_replaced_record() {
    let diamond = scenarios::two_facets(Config::new().cache_enabled(true));
    let h2 = facet(2);
    let h3 = diamond.deploy(StaticFacet::new(3, [sel(3)]));

    let receipt = diamond.diamond_cut(FacetCut::new().replace(h2, h3)).unwrap();

    let events: Vec<&CutEvent> = receipt.events().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        &CutEvent::Replaced {
            selector: sel(3),
            old: h2,
            new: h3,
        }
    );
    assert_eq!(diamond.facet_address(sel(3)), Some(h3));

    let addresses = diamond.facet_addresses().unwrap();
    assert!(!addresses.contains(&h2));
    assert!(addresses.contains(&h3));
    diamond.verify().unwrap();
}

#[test]
fn add_with_empty_selector_list_fails() {
    let diamond = TestDiamond::memory(Config::default());
    let h1 = diamond.deploy(StaticFacet::new(1, [sel(1)]));

    let err = diamond
        .diamond_cut(FacetCut::new().add(h1, Vec::<Selector>::new()))
        .unwrap_err();
    assert!(matches!(err, CoreError::NoSelectors { .. }));
    assert_eq!(diamond.sequence().as_u64(), 0);
}

#[test]
fn remove_of_never_registered_facet_fails() {
    let diamond = scenarios::two_facets(Config::default());
    let stranger = diamond.deploy(StaticFacet::new(9, [sel(9)]));

    let err = diamond.diamond_cut(FacetCut::new().remove(stranger)).unwrap_err();
    assert!(matches!(err, CoreError::FacetNotFound { .. }));
}

#[test]
fn selectors_of_never_added_facet_are_empty() {
    for config in [Config::default(), Config::new().cache_enabled(true)] {
        let diamond = scenarios::two_facets(config);
        assert!(diamond.facet_function_selectors(facet(42)).unwrap().is_empty());
        assert_eq!(
            diamond.facet_function_selectors_packed(facet(42)).unwrap().as_ref(),
            &[0u8, 0, 0, 0]
        );
    }
}

#[test]
fn failed_cut_leaves_everything_unchanged() {
    let diamond = scenarios::two_facets(Config::new().cache_enabled(true));
    let before_facets = diamond.facets().unwrap();
    let before_blobs = diamond.live_blob_count();
    let before_sequence = diamond.sequence();
    let h4 = diamond.deploy(StaticFacet::new(4, [sel(4), sel(3)]));

    // The addition succeeds on its own; the duplicate claim on 3 sinks the batch.
    let err = diamond
        .diamond_cut(FacetCut::new().add(h4, [sel(4)]).add(h4, [sel(3)]))
        .unwrap_err();
    assert!(matches!(err, CoreError::DuplicateSelector { .. }));

    assert_eq!(diamond.facets().unwrap(), before_facets);
    assert_eq!(diamond.live_blob_count(), before_blobs);
    assert_eq!(diamond.sequence(), before_sequence);
    assert_eq!(diamond.facet_address(sel(4)), None);
    assert_eq!(diamond.events().history_len(), 2);
}

#[test]
fn delegate_revert_reason_propagates() {
    let diamond = TestDiamond::memory(Config::default());
    let h1 = diamond.deploy(StaticFacet::new(1, [sel(1)]));
    let init = diamond.deploy(
        StaticFacet::new(5, [sel(50)]).with_init(InitBehavior::Revert(Some("not owner".into()))),
    );

    let err = diamond
        .diamond_cut(FacetCut::new().add(h1, [sel(1)]).delegate(init, b"go".to_vec()))
        .unwrap_err();
    assert_eq!(err.to_string(), format!("delegate call to {init} failed: not owner"));
    assert_eq!(diamond.facet_address(sel(1)), None);
}

#[test]
fn delegate_without_reason_uses_generic_message() {
    let diamond = TestDiamond::memory(Config::default());
    let init = diamond.deploy(StaticFacet::new(5, [sel(50)]).with_init(InitBehavior::Revert(None)));

    let err = diamond
        .diamond_cut(FacetCut::new().delegate(init, Vec::new()))
        .unwrap_err();
    assert!(matches!(err, CoreError::DelegateFailed { reason: None, .. }));
    assert!(err.to_string().contains("without a reason"));
}

#[test]
fn delegate_writes_commit_with_the_cut() {
    let diamond = TestDiamond::memory(Config::default());
    let h1 = diamond.deploy(StaticFacet::new(1, [sel(1)]));
    let init = diamond.deploy(StaticFacet::new(5, [sel(50)]).with_init(InitBehavior::Write {
        namespace: "app.settings".into(),
        key: b"mode".to_vec(),
    }));

    let receipt = diamond
        .diamond_cut(FacetCut::new().add(h1, [sel(1)]).delegate(init, b"fast".to_vec()))
        .unwrap();

    assert_eq!(diamond.read_state("app.settings", b"mode"), Some(b"fast".to_vec()));
    assert!(receipt
        .events()
        .any(|e| matches!(e, CutEvent::DelegateCalled { target, .. } if *target == init)));
}

#[test]
fn delegate_cannot_write_registry_namespace() {
    let diamond = TestDiamond::memory(Config::default());
    let init =
        diamond.deploy(StaticFacet::new(5, [sel(50)]).with_init(InitBehavior::WriteReserved));

    let err = diamond
        .diamond_cut(FacetCut::new().delegate(init, b"me".to_vec()))
        .unwrap_err();
    assert!(matches!(err, CoreError::ReservedNamespace { .. }));
}

#[test]
fn calls_route_to_registered_facet() {
    let diamond = scenarios::two_facets(Config::default());

    let output = diamond.call(sel(3), b"abc").unwrap();
    assert_eq!(output, [&sel(3).as_bytes()[..], &b"abc"[..]].concat());
    diamond.call(sel(3), b"").unwrap();
    assert_eq!(
        diamond.read_state(CALLS_NAMESPACE, sel(3).as_bytes()),
        Some(2u64.to_be_bytes().to_vec())
    );

    let err = diamond.call(sel(99), b"").unwrap_err();
    assert!(matches!(err, CoreError::FunctionNotFound { .. }));
}

#[test]
fn categories_partition_the_cache() {
    let diamond = TestDiamond::memory(Config::new().cache_enabled(true));
    let core = diamond.deploy(StaticFacet::new(1, [sel(1)]).with_category("core"));
    let plain = diamond.deploy(StaticFacet::new(2, [sel(2)]));

    diamond
        .diamond_cut(FacetCut::new().add(core, [sel(1)]).add(plain, [sel(2)]))
        .unwrap();

    assert_eq!(diamond.facet_addresses_in(&Category::new("core")).unwrap(), vec![core]);
    assert_eq!(diamond.facet_addresses_in(&Category::default()).unwrap(), vec![plain]);
    assert!(matches!(
        diamond.facet_addresses_in(&Category::new("missing")),
        Err(CoreError::UnknownCategory { .. })
    ));

    // An emptied category stays known and reads as empty.
    diamond.diamond_cut(FacetCut::new().remove(core)).unwrap();
    assert!(diamond.facet_addresses_in(&Category::new("core")).unwrap().is_empty());
}

#[test]
fn events_are_polled_in_commit_order() {
    let diamond = scenarios::two_facets(Config::default());
    let receiver = diamond.subscribe();
    diamond.diamond_cut(FacetCut::new().remove(facet(1))).unwrap();

    let records = diamond.poll(diamond_core::CutSequence::new(0), 10);
    let sequences: Vec<u64> = records.iter().map(|r| r.sequence.as_u64()).collect();
    assert_eq!(sequences, vec![1, 1, 2, 3, 3]);

    let pushed: Vec<_> = receiver.try_iter().collect();
    assert_eq!(pushed.len(), 2);
    assert!(pushed
        .iter()
        .all(|r| matches!(r.event, CutEvent::Removed { facet: f, .. } if f == facet(1))));
}
