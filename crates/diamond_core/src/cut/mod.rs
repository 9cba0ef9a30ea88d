//! The cut protocol: atomic batch mutation of the dispatch registry.
//!
//! A [`FacetCut`] names additions, replacements and removals plus an optional
//! delegated initializer and metadata. Applying it runs, in order:
//!
//! 1. validate inputs against the facet catalog
//! 2. apply additions
//! 3. apply replacements
//! 4. apply removals
//! 5. run the delegated initializer
//! 6. emit metadata
//! 7. rebuild the shard cache (when enabled)
//!
//! Every step works on staged copies. The first failure discards them all.

mod apply;
mod events;
mod plan;

pub(crate) use apply::apply;
pub use events::{CutEvent, CutRecord, EventLog};
pub(crate) use plan::validate;

use diamond_codec::{FacetAddress, Selector};

/// Facets to route together with the selectors to route to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetAddition {
    /// The facet.
    pub facet: FacetAddress,
    /// Selectors to route to it.
    pub selectors: Vec<Selector>,
}

/// A facet swap: every selector of `old` moves to `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacetReplacement {
    /// The facet being replaced.
    pub old: FacetAddress,
    /// The replacing facet.
    pub new: FacetAddress,
}

/// A batch of registry mutations applied atomically.
///
/// # Example
///
/// ```rust,ignore
/// let cut = FacetCut::new()
///     .add(erc20, [transfer, balance_of])
///     .replace(old_admin, new_admin)
///     .remove(legacy)
///     .delegate(migrator, payload)
///     .tag("v2 upgrade");
/// diamond.diamond_cut(cut)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetCut {
    additions: Vec<FacetAddition>,
    replacements: Vec<FacetReplacement>,
    removals: Vec<FacetAddress>,
    delegate_target: Option<FacetAddress>,
    delegate_payload: Option<Vec<u8>>,
    tag: String,
    metadata: Vec<u8>,
}

impl FacetCut {
    /// Creates an empty cut.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `selectors` to `facet`.
    #[must_use]
    pub fn add(
        mut self,
        facet: FacetAddress,
        selectors: impl IntoIterator<Item = Selector>,
    ) -> Self {
        self.additions.push(FacetAddition {
            facet,
            selectors: selectors.into_iter().collect(),
        });
        self
    }

    /// Moves every selector of `old` to `new`.
    #[must_use]
    pub fn replace(mut self, old: FacetAddress, new: FacetAddress) -> Self {
        self.replacements.push(FacetReplacement { old, new });
        self
    }

    /// Unregisters every selector of `facet`.
    #[must_use]
    pub fn remove(mut self, facet: FacetAddress) -> Self {
        self.removals.push(facet);
        self
    }

    /// Runs `target`'s initializer with `payload` after the mutations.
    #[must_use]
    pub fn delegate(mut self, target: FacetAddress, payload: impl Into<Vec<u8>>) -> Self {
        self.delegate_target = Some(target);
        self.delegate_payload = Some(payload.into());
        self
    }

    /// Sets the delegate target without a payload.
    #[must_use]
    pub fn delegate_target(mut self, target: FacetAddress) -> Self {
        self.delegate_target = Some(target);
        self
    }

    /// Sets the delegate payload without touching the target.
    #[must_use]
    pub fn delegate_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.delegate_payload = Some(payload.into());
        self
    }

    /// Sets the metadata tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Sets the metadata bytes.
    #[must_use]
    pub fn metadata(mut self, metadata: impl Into<Vec<u8>>) -> Self {
        self.metadata = metadata.into();
        self
    }

    /// Returns the additions.
    #[must_use]
    pub fn additions(&self) -> &[FacetAddition] {
        &self.additions
    }

    /// Returns the replacements.
    #[must_use]
    pub fn replacements(&self) -> &[FacetReplacement] {
        &self.replacements
    }

    /// Returns the removals.
    #[must_use]
    pub fn removals(&self) -> &[FacetAddress] {
        &self.removals
    }

    /// Returns `true` if the cut mutates the registry.
    #[must_use]
    pub fn mutates_registry(&self) -> bool {
        !(self.additions.is_empty() && self.replacements.is_empty() && self.removals.is_empty())
    }

    /// Returns `true` if the cut does nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.mutates_registry()
            && self.delegate_target.is_none()
            && self.delegate_payload.is_none()
            && self.tag.is_empty()
            && self.metadata.is_empty()
    }
}
