//! Live aggregation over the registry.

use super::Loupe;
use crate::error::CoreResult;
use crate::registry::DispatchRegistry;
use crate::stats::DiamondStats;
use bytes::Bytes;
use diamond_codec::{
    encode_address_list, encode_facet_records, encode_selector_list, FacetAddress, FacetRecord,
    Selector,
};

/// Loupe answering from a full registry scan.
pub struct LiveLoupe<'a> {
    registry: &'a DispatchRegistry,
    stats: &'a DiamondStats,
}

impl<'a> LiveLoupe<'a> {
    /// Creates a live loupe over `registry`.
    pub fn new(registry: &'a DispatchRegistry, stats: &'a DiamondStats) -> Self {
        Self { registry, stats }
    }

    fn record_scan(&self) {
        self.stats.record_live_scan(self.registry.len() as u64);
    }
}

impl Loupe for LiveLoupe<'_> {
    fn facet_addresses_packed(&self) -> CoreResult<Bytes> {
        Ok(encode_address_list(&self.facet_addresses()?)?)
    }

    fn facets_packed(&self) -> CoreResult<Bytes> {
        Ok(encode_facet_records(&self.facets()?)?)
    }

    fn facet_function_selectors_packed(&self, facet: FacetAddress) -> CoreResult<Bytes> {
        Ok(encode_selector_list(&self.facet_function_selectors(facet)?)?)
    }

    fn facet_addresses(&self) -> CoreResult<Vec<FacetAddress>> {
        self.record_scan();
        Ok(self.registry.facet_addresses())
    }

    fn facets(&self) -> CoreResult<Vec<FacetRecord>> {
        self.record_scan();
        Ok(self.registry.group_by_facet())
    }

    fn facet_function_selectors(&self, facet: FacetAddress) -> CoreResult<Vec<Selector>> {
        self.record_scan();
        Ok(self.registry.selectors_of(facet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DispatchRegistry {
        let mut registry = DispatchRegistry::new();
        registry
            .add(Selector::from_u32(1), FacetAddress::from_index(1))
            .unwrap();
        registry
            .add(Selector::from_u32(2), FacetAddress::from_index(1))
            .unwrap();
        registry
            .add(Selector::from_u32(3), FacetAddress::from_index(2))
            .unwrap();
        registry
    }

    #[test]
    fn live_reads_and_counts_scans() {
        let registry = registry();
        let stats = DiamondStats::new();
        let loupe = LiveLoupe::new(&registry, &stats);

        assert_eq!(
            loupe.facet_addresses().unwrap(),
            vec![FacetAddress::from_index(1), FacetAddress::from_index(2)]
        );
        assert_eq!(loupe.facets().unwrap().len(), 2);
        assert_eq!(
            loupe
                .facet_function_selectors(FacetAddress::from_index(2))
                .unwrap(),
            vec![Selector::from_u32(3)]
        );

        let snap = stats.snapshot();
        assert_eq!(snap.live_scans, 3);
        assert_eq!(snap.registry_entries_scanned, 9);
    }

    #[test]
    fn live_unknown_facet_is_empty() {
        let registry = registry();
        let stats = DiamondStats::new();
        let loupe = LiveLoupe::new(&registry, &stats);

        assert!(loupe
            .facet_function_selectors(FacetAddress::from_index(7))
            .unwrap()
            .is_empty());
        assert_eq!(
            &loupe
                .facet_function_selectors_packed(FacetAddress::from_index(7))
                .unwrap()[..],
            &[0, 0, 0, 0]
        );
    }

    #[test]
    fn live_packed_matches_structured() {
        let registry = registry();
        let stats = DiamondStats::new();
        let loupe = LiveLoupe::new(&registry, &stats);

        let packed = loupe.facets_packed().unwrap();
        assert_eq!(
            diamond_codec::decode_facet_records(&packed).unwrap(),
            loupe.facets().unwrap()
        );
    }
}
