//! Benchmark utilities.

use diamond_codec::{FacetAddress, Selector};
use diamond_core::{Category, Config, Diamond, Facet, FacetCut};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;

/// A facet with a fixed selector list and no behavior.
pub struct BenchFacet {
    address: FacetAddress,
    selectors: Vec<Selector>,
    category: Option<Category>,
}

impl BenchFacet {
    /// Creates a facet at `FacetAddress::from_index(index)`.
    pub fn new(index: u64, selectors: Vec<Selector>) -> Self {
        Self {
            address: FacetAddress::from_index(index),
            selectors,
            category: None,
        }
    }

    /// Places the facet in `category`.
    pub fn with_category(mut self, category: impl Into<Category>) -> Self {
        self.category = Some(category.into());
        self
    }
}

impl Facet for BenchFacet {
    fn address(&self) -> FacetAddress {
        self.address
    }

    fn selectors(&self) -> Vec<Selector> {
        self.selectors.clone()
    }

    fn category(&self) -> Option<Category> {
        self.category.clone()
    }
}

/// Generate `count` distinct random selectors.
pub fn random_selectors(count: usize) -> Vec<Selector> {
    let mut rng = rand::thread_rng();
    let mut seen = HashSet::with_capacity(count);
    while seen.len() < count {
        seen.insert(rng.gen::<u32>());
    }
    let mut selectors: Vec<Selector> = seen.into_iter().map(Selector::from_u32).collect();
    selectors.shuffle(&mut rng);
    selectors
}

/// Split `selectors` into `facets` contiguous, near-equal groups.
pub fn split_evenly(selectors: &[Selector], facets: usize) -> Vec<Vec<Selector>> {
    let mut groups = Vec::with_capacity(facets);
    let mut start = 0;
    for index in 0..facets {
        let share = selectors.len() / facets + usize::from(index < selectors.len() % facets);
        groups.push(selectors[start..start + share].to_vec());
        start += share;
    }
    groups
}

/// Deploy `facets` facets over `selectors` random selectors and add them all
/// in one cut. `categories` spreads facets round-robin over that many
/// categories (1 keeps everything in the default category).
pub fn populated_diamond(
    config: Config,
    facets: usize,
    selectors: usize,
    categories: usize,
) -> Diamond {
    let diamond = Diamond::in_memory(config).expect("Failed to create diamond");
    let groups = split_evenly(&random_selectors(selectors), facets);

    let mut cut = FacetCut::new();
    for (index, group) in groups.into_iter().enumerate() {
        let mut facet = BenchFacet::new(index as u64 + 1, group.clone());
        if categories > 1 {
            facet = facet.with_category(format!("category-{}", index % categories));
        }
        let address = diamond.deploy(Arc::new(facet)).expect("Failed to deploy facet");
        cut = cut.add(address, group);
    }
    diamond.diamond_cut(cut).expect("Failed to apply cut");
    diamond
}
