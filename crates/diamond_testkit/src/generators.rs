//! Property-based test generators using proptest.
//!
//! Operations draw facets and selectors from a small fixed universe so that
//! generated cuts collide, conflict, and re-add often.

use proptest::prelude::*;

/// Number of selectors in the universe (`0..SELECTOR_SPACE`).
pub const SELECTOR_SPACE: u32 = 24;

/// Facet indices deployed by [`facet_universe`].
pub const DEPLOYED_FACETS: u64 = 6;

/// A facet index that is never deployed.
pub const UNDEPLOYED_FACET: u64 = DEPLOYED_FACETS + 1;

/// The facets every generated scenario deploys, with the selectors each
/// one claims.
///
/// Facet `i` claims every selector `s` with `(s + i) % 3 != 0`, so any two
/// facets share some selectors and differ on others.
pub fn facet_universe() -> Vec<(u64, Vec<u32>)> {
    (1..=DEPLOYED_FACETS)
        .map(|index| {
            let claims = (0..SELECTOR_SPACE)
                .filter(|s| (u64::from(*s) + index) % 3 != 0)
                .collect();
            (index, claims)
        })
        .collect()
}

/// One mutation inside a generated cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutStep {
    /// Add `selectors` to `facet`.
    Add {
        /// Facet index.
        facet: u64,
        /// Raw selectors.
        selectors: Vec<u32>,
    },
    /// Replace `old` with `new`.
    Replace {
        /// Facet being replaced.
        old: u64,
        /// Replacing facet.
        new: u64,
    },
    /// Remove `facet`.
    Remove {
        /// Facet index.
        facet: u64,
    },
}

/// One operation against a diamond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiamondOp {
    /// Apply a cut made of these steps.
    Cut(Vec<CutStep>),
    /// Enable the shard cache.
    EnableCache,
    /// Disable the shard cache.
    DisableCache,
    /// Rebuild every shard.
    RebuildCache,
}

/// Strategy for a facet index, occasionally the undeployed one.
pub fn facet_index_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        12 => 1..=DEPLOYED_FACETS,
        1 => Just(UNDEPLOYED_FACET),
    ]
}

/// Strategy for a raw selector.
pub fn selector_strategy() -> impl Strategy<Value = u32> {
    0..SELECTOR_SPACE
}

/// Strategy for one cut step.
pub fn cut_step_strategy() -> impl Strategy<Value = CutStep> {
    prop_oneof![
        4 => (facet_index_strategy(), prop::collection::vec(selector_strategy(), 0..5))
            .prop_map(|(facet, selectors)| CutStep::Add { facet, selectors }),
        2 => (facet_index_strategy(), facet_index_strategy())
            .prop_map(|(old, new)| CutStep::Replace { old, new }),
        2 => facet_index_strategy().prop_map(|facet| CutStep::Remove { facet }),
    ]
}

/// Strategy for one diamond operation.
pub fn diamond_op_strategy() -> impl Strategy<Value = DiamondOp> {
    prop_oneof![
        10 => prop::collection::vec(cut_step_strategy(), 1..4).prop_map(DiamondOp::Cut),
        1 => Just(DiamondOp::EnableCache),
        1 => Just(DiamondOp::DisableCache),
        1 => Just(DiamondOp::RebuildCache),
    ]
}

/// Strategy for a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<DiamondOp>> {
    prop::collection::vec(diamond_op_strategy(), min_ops..max_ops)
}

/// Strategy for a facet grouping: distinct facets with non-empty,
/// duplicate-free selector lists.
pub fn grouping_strategy(max_facets: usize) -> impl Strategy<Value = Vec<(u64, Vec<u32>)>> {
    prop::collection::btree_map(
        1..1_000u64,
        prop::collection::btree_set(any::<u32>(), 1..8),
        0..max_facets,
    )
    .prop_map(|groups| {
        groups
            .into_iter()
            .map(|(facet, selectors)| (facet, selectors.into_iter().collect()))
            .collect()
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universe_facets_overlap_but_differ() {
        let universe = facet_universe();
        assert_eq!(universe.len(), DEPLOYED_FACETS as usize);

        let (_, first) = &universe[0];
        let (_, second) = &universe[1];
        assert!(first.iter().any(|s| second.contains(s)));
        assert_ne!(first, second);
    }

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn selectors_stay_in_space(step in cut_step_strategy()) {
            if let CutStep::Add { selectors, .. } = step {
                prop_assert!(selectors.iter().all(|s| *s < SELECTOR_SPACE));
            }
        }

        #[test]
        fn grouping_lists_are_non_empty(grouping in grouping_strategy(6)) {
            prop_assert!(grouping.iter().all(|(_, selectors)| !selectors.is_empty()));
        }
    }
}
