//! Reference model of the registry and a harness that checks a diamond
//! against it.
//!
//! The model is a plain ordered map with the cut rules written out
//! directly. It shares no code with the registry it checks.

use crate::fixtures::{StaticFacet, TestDiamond};
use crate::generators::{facet_universe, CutStep, DiamondOp};
use diamond_core::{Config, FacetAddress, FacetCut, FacetRecord, Selector};
use std::collections::{BTreeMap, BTreeSet};

/// Expected registry contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryModel {
    routes: BTreeMap<Selector, FacetAddress>,
    claims: BTreeMap<FacetAddress, BTreeSet<Selector>>,
}

impl RegistryModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `facet` is deployed and claims `selectors`.
    pub fn deploy(&mut self, facet: FacetAddress, selectors: impl IntoIterator<Item = Selector>) {
        self.claims.insert(facet, selectors.into_iter().collect());
    }

    /// Applies a cut. Returns `false` and leaves the model unchanged if any
    /// step fails.
    ///
    /// Steps are applied by kind, additions first, then replacements, then
    /// removals, each kind in the given order.
    pub fn apply(&mut self, steps: &[CutStep]) -> bool {
        let mut staged = self.routes.clone();
        let ordered = steps
            .iter()
            .filter(|s| matches!(s, CutStep::Add { .. }))
            .chain(steps.iter().filter(|s| matches!(s, CutStep::Replace { .. })))
            .chain(steps.iter().filter(|s| matches!(s, CutStep::Remove { .. })));

        for step in ordered {
            let ok = match step {
                CutStep::Add { facet, selectors } => self.add(&mut staged, *facet, selectors),
                CutStep::Replace { old, new } => self.replace(&mut staged, *old, *new),
                CutStep::Remove { facet } => Self::remove(&mut staged, *facet),
            };
            if !ok {
                return false;
            }
        }

        self.routes = staged;
        true
    }

    fn add(
        &self,
        routes: &mut BTreeMap<Selector, FacetAddress>,
        index: u64,
        selectors: &[u32],
    ) -> bool {
        let facet = FacetAddress::from_index(index);
        let Some(claims) = self.claims.get(&facet) else {
            return false;
        };
        if selectors.is_empty() {
            return false;
        }

        for raw in selectors {
            let selector = Selector::from_u32(*raw);
            if !claims.contains(&selector) || routes.contains_key(&selector) {
                return false;
            }
            routes.insert(selector, facet);
        }
        true
    }

    fn replace(&self, routes: &mut BTreeMap<Selector, FacetAddress>, old: u64, new: u64) -> bool {
        let old = FacetAddress::from_index(old);
        let new = FacetAddress::from_index(new);
        if old == new {
            return false;
        }
        let Some(claims) = self.claims.get(&new) else {
            return false;
        };

        let owned: BTreeSet<Selector> = routes
            .iter()
            .filter(|(_, owner)| **owner == old)
            .map(|(selector, _)| *selector)
            .collect();
        if owned.is_empty() {
            return false;
        }

        for selector in claims.difference(&owned) {
            match routes.get(selector) {
                Some(owner) if *owner != new => return false,
                _ => {}
            }
        }

        for selector in &owned {
            if claims.contains(selector) {
                routes.insert(*selector, new);
            } else {
                routes.remove(selector);
            }
        }
        for selector in claims {
            routes.entry(*selector).or_insert(new);
        }
        true
    }

    fn remove(routes: &mut BTreeMap<Selector, FacetAddress>, index: u64) -> bool {
        let facet = FacetAddress::from_index(index);
        let before = routes.len();
        routes.retain(|_, owner| *owner != facet);
        routes.len() != before
    }

    /// Returns the expected facet for `selector`.
    pub fn facet_address(&self, selector: Selector) -> Option<FacetAddress> {
        self.routes.get(&selector).copied()
    }

    /// Returns the expected grouping.
    pub fn grouping(&self) -> BTreeMap<FacetAddress, BTreeSet<Selector>> {
        let mut grouping: BTreeMap<FacetAddress, BTreeSet<Selector>> = BTreeMap::new();
        for (selector, facet) in &self.routes {
            grouping.entry(*facet).or_default().insert(*selector);
        }
        grouping
    }

    /// Returns the number of routed selectors.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if nothing is routed.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Converts loupe records into an order-free grouping.
pub fn grouping_of(records: &[FacetRecord]) -> BTreeMap<FacetAddress, BTreeSet<Selector>> {
    records
        .iter()
        .map(|record| (record.address, record.selectors.iter().copied().collect()))
        .collect()
}

/// Builds a [`FacetCut`] from generated steps.
pub fn cut_from_steps(steps: &[CutStep]) -> FacetCut {
    steps.iter().fold(FacetCut::new(), |cut, step| match step {
        CutStep::Add { facet, selectors } => cut.add(
            FacetAddress::from_index(*facet),
            selectors.iter().copied().map(Selector::from_u32),
        ),
        CutStep::Replace { old, new } => cut.replace(
            FacetAddress::from_index(*old),
            FacetAddress::from_index(*new),
        ),
        CutStep::Remove { facet } => cut.remove(FacetAddress::from_index(*facet)),
    })
}

/// A diamond paired with a model, checked after every operation.
pub struct ModelHarness {
    /// The diamond under test.
    pub diamond: TestDiamond,
    /// The expected state.
    pub model: RegistryModel,
}

impl ModelHarness {
    /// Deploys the [`facet_universe`] into a fresh diamond and model.
    pub fn new(config: Config) -> Self {
        let diamond = TestDiamond::memory(config);
        let mut model = RegistryModel::new();

        for (index, claims) in facet_universe() {
            let selectors: Vec<Selector> = claims.into_iter().map(Selector::from_u32).collect();
            let address = diamond.deploy(StaticFacet::new(index, selectors.clone()));
            model.deploy(address, selectors);
        }

        Self { diamond, model }
    }

    /// Applies `op` to both and asserts they agree on success.
    pub fn apply(&mut self, op: &DiamondOp) {
        match op {
            DiamondOp::Cut(steps) => {
                let expected = self.model.apply(steps);
                let actual = self.diamond.diamond_cut(cut_from_steps(steps));
                assert_eq!(
                    actual.is_ok(),
                    expected,
                    "cut {steps:?} diverged from model: {actual:?}"
                );
            }
            DiamondOp::EnableCache => self.diamond.enable_cache().expect("Failed to enable cache"),
            DiamondOp::DisableCache => self.diamond.disable_cache(),
            DiamondOp::RebuildCache => {
                if self.diamond.is_cache_enabled() {
                    self.diamond.rebuild_cache().expect("Failed to rebuild cache");
                }
            }
        }
    }

    /// Verifies every observable read against the model.
    pub fn verify_all(&self) {
        self.diamond.verify().expect("Diamond invariants violated");
        assert_eq!(self.diamond.selector_count(), self.model.len());

        for raw in 0..crate::generators::SELECTOR_SPACE {
            let selector = Selector::from_u32(raw);
            assert_eq!(
                self.diamond.facet_address(selector),
                self.model.facet_address(selector),
                "route mismatch for {selector}"
            );
        }

        let expected = self.model.grouping();
        let facets = self.diamond.facets().expect("Failed to read facets");
        assert_eq!(grouping_of(&facets), expected);

        let addresses: BTreeSet<FacetAddress> = self
            .diamond
            .facet_addresses()
            .expect("Failed to read facet addresses")
            .into_iter()
            .collect();
        assert_eq!(addresses, expected.keys().copied().collect());

        for (facet, selectors) in &expected {
            let listed: BTreeSet<Selector> = self
                .diamond
                .facet_function_selectors(*facet)
                .expect("Failed to read facet selectors")
                .into_iter()
                .collect();
            assert_eq!(&listed, selectors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(facet: u64, selectors: &[u32]) -> CutStep {
        CutStep::Add {
            facet,
            selectors: selectors.to_vec(),
        }
    }

    #[test]
    fn model_add_requires_claim_and_free_selector() {
        let mut model = RegistryModel::new();
        model.deploy(FacetAddress::from_index(1), [1, 2].map(Selector::from_u32));

        assert!(!model.apply(&[add(1, &[3])]));
        assert!(!model.apply(&[add(1, &[])]));
        assert!(!model.apply(&[add(2, &[1])]));
        assert!(model.apply(&[add(1, &[1])]));
        assert!(!model.apply(&[add(1, &[1])]));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn model_failed_cut_is_atomic() {
        let mut model = RegistryModel::new();
        model.deploy(FacetAddress::from_index(1), [1, 2].map(Selector::from_u32));

        assert!(!model.apply(&[add(1, &[1]), CutStep::Remove { facet: 5 }]));
        assert!(model.is_empty());
    }

    #[test]
    fn harness_tracks_a_simple_history() {
        let mut harness = ModelHarness::new(Config::default());
        harness.apply(&DiamondOp::Cut(vec![add(1, &[0, 1])]));
        assert_eq!(harness.model.len(), 2);
        harness.apply(&DiamondOp::EnableCache);
        harness.apply(&DiamondOp::Cut(vec![CutStep::Replace { old: 1, new: 2 }]));
        harness.verify_all();
    }
}
