//! The dispatch registry.
//!
//! A selector → facet map plus a dense, ordered selector list. Every entry
//! stores its selector's index in the list so removal can swap the last
//! selector into the hole and pop, keeping add, remove and replace O(1).

use crate::error::{CoreError, CoreResult};
use diamond_codec::{FacetAddress, FacetRecord, Selector};
use std::collections::{HashMap, HashSet};

/// Routing entry for one registered selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerEntry {
    /// Facet the selector routes to.
    pub facet: FacetAddress,
    /// Index of the selector in the ordered selector list.
    pub position: usize,
}

/// Authoritative selector → facet map with a canonical selector order.
///
/// # Invariants
///
/// - `selectors().len()` equals the number of entries
/// - every entry's `position` is its selector's index in `selectors()`
/// - no selector appears twice
#[derive(Debug, Clone, Default)]
pub struct DispatchRegistry {
    entries: HashMap<Selector, HandlerEntry>,
    selectors: Vec<Selector>,
}

impl DispatchRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered selectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// Returns `true` if no selector is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Routes `selector` to `facet`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateSelector`] if the selector already routes
    /// somewhere.
    pub fn add(&mut self, selector: Selector, facet: FacetAddress) -> CoreResult<()> {
        if let Some(existing) = self.entries.get(&selector) {
            return Err(CoreError::DuplicateSelector {
                selector,
                existing: existing.facet,
            });
        }

        let position = self.selectors.len();
        self.selectors.push(selector);
        self.entries.insert(selector, HandlerEntry { facet, position });
        Ok(())
    }

    /// Unregisters `selector` and returns the facet it routed to.
    ///
    /// The last selector moves into the vacated position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SelectorNotFound`] if the selector is not registered.
    pub fn remove(&mut self, selector: Selector) -> CoreResult<FacetAddress> {
        let entry = self
            .entries
            .remove(&selector)
            .ok_or(CoreError::SelectorNotFound { selector })?;

        let last = self
            .selectors
            .pop()
            .ok_or_else(|| CoreError::inconsistent("entry present but selector list empty"))?;

        if last != selector {
            self.selectors[entry.position] = last;
            let moved = self.entries.get_mut(&last).ok_or_else(|| {
                CoreError::inconsistent(format!("listed selector {last} has no entry"))
            })?;
            moved.position = entry.position;
        }

        Ok(entry.facet)
    }

    /// Re-points `selector` at `facet` and returns the previous facet.
    ///
    /// The selector keeps its position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SelectorNotFound`] if the selector is not registered.
    pub fn replace(&mut self, selector: Selector, facet: FacetAddress) -> CoreResult<FacetAddress> {
        let entry = self
            .entries
            .get_mut(&selector)
            .ok_or(CoreError::SelectorNotFound { selector })?;
        Ok(std::mem::replace(&mut entry.facet, facet))
    }

    /// Returns the facet `selector` routes to.
    #[must_use]
    pub fn facet_address(&self, selector: Selector) -> Option<FacetAddress> {
        self.entries.get(&selector).map(|entry| entry.facet)
    }

    /// Returns the routing entry for `selector`.
    #[must_use]
    pub fn entry(&self, selector: Selector) -> Option<HandlerEntry> {
        self.entries.get(&selector).copied()
    }

    /// Returns the ordered selector list.
    #[must_use]
    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    /// Iterates `(selector, facet)` pairs in selector-list order.
    pub fn iter(&self) -> impl Iterator<Item = (Selector, FacetAddress)> + '_ {
        self.selectors.iter().filter_map(move |selector| {
            self.entries
                .get(selector)
                .map(|entry| (*selector, entry.facet))
        })
    }

    /// Returns the selectors routed to `facet`, in selector-list order.
    ///
    /// This is a full scan.
    #[must_use]
    pub fn selectors_of(&self, facet: FacetAddress) -> Vec<Selector> {
        self.iter()
            .filter(|(_, owner)| *owner == facet)
            .map(|(selector, _)| selector)
            .collect()
    }

    /// Returns every facet that owns a selector, in first-seen order.
    #[must_use]
    pub fn facet_addresses(&self) -> Vec<FacetAddress> {
        let mut seen = HashSet::new();
        self.iter()
            .filter_map(|(_, facet)| seen.insert(facet).then_some(facet))
            .collect()
    }

    /// Groups selectors by facet, facets in first-seen order.
    ///
    /// Records live in an arena addressed by index; the map only stores the
    /// index of each facet's record.
    #[must_use]
    pub fn group_by_facet(&self) -> Vec<FacetRecord> {
        let mut slots: HashMap<FacetAddress, usize> = HashMap::new();
        let mut records: Vec<FacetRecord> = Vec::new();

        for (selector, facet) in self.iter() {
            let slot = *slots.entry(facet).or_insert_with(|| {
                records.push(FacetRecord::new(facet, Vec::new()));
                records.len() - 1
            });
            records[slot].selectors.push(selector);
        }

        for record in &mut records {
            record.selectors.shrink_to_fit();
        }
        records
    }

    /// Checks every invariant listed on [`DispatchRegistry`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Inconsistent`] describing the first violation.
    pub fn verify(&self) -> CoreResult<()> {
        if self.selectors.len() != self.entries.len() {
            return Err(CoreError::inconsistent(format!(
                "{} listed selectors but {} entries",
                self.selectors.len(),
                self.entries.len()
            )));
        }

        for (index, selector) in self.selectors.iter().enumerate() {
            match self.entries.get(selector) {
                Some(entry) if entry.position == index => {}
                Some(entry) => {
                    return Err(CoreError::inconsistent(format!(
                        "{selector} listed at {index} but entry says {}",
                        entry.position
                    )))
                }
                None => {
                    return Err(CoreError::inconsistent(format!(
                        "{selector} listed at {index} has no entry"
                    )))
                }
            }
        }

        Ok(())
    }
}
