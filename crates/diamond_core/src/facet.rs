//! Facets: the deployed modules a diamond dispatches to.
//!
//! A facet advertises the selectors it serves through
//! [`Facet::packed_selectors`]. Cuts use that discovery entrypoint to learn
//! which selectors a facet claims, and dispatch calls [`Facet::invoke`].

use crate::context::{CallContext, InitContext};
use crate::error::{CoreError, CoreResult};
use crate::types::Category;
use bytes::Bytes;
use diamond_codec::{
    decode_selector_list, encode_selector_list, CodecResult, FacetAddress, Selector,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Failure reported by a facet, with an optional reason.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Revert {
    reason: Option<String>,
}

impl Revert {
    /// Creates a revert carrying `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }

    /// Creates a revert without a reason.
    #[must_use]
    pub const fn empty() -> Self {
        Self { reason: None }
    }

    /// Returns the reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Consumes the revert, returning the reason.
    #[must_use]
    pub fn into_reason(self) -> Option<String> {
        self.reason
    }
}

impl fmt::Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason.as_deref().unwrap_or("reverted without a reason"))
    }
}

impl From<&str> for Revert {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}

impl From<CoreError> for Revert {
    fn from(err: CoreError) -> Self {
        Self::new(err.to_string())
    }
}

/// A module servicing one or more selectors.
///
/// Implementations hold no diamond state of their own; everything they
/// persist goes through the context they are handed.
pub trait Facet: Send + Sync {
    /// Returns the facet's address.
    fn address(&self) -> FacetAddress;

    /// Returns the selectors this facet serves.
    fn selectors(&self) -> Vec<Selector>;

    /// Capability discovery: the packed selector list
    /// (`[count u32 BE][selector]*count`).
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be encoded.
    fn packed_selectors(&self) -> CodecResult<Bytes> {
        encode_selector_list(&self.selectors())
    }

    /// Returns the cache category, or `None` for the diamond's default.
    fn category(&self) -> Option<Category> {
        None
    }

    /// Handles a dispatched call.
    ///
    /// # Errors
    ///
    /// Returns a [`Revert`] if the call fails.
    fn invoke(
        &self,
        ctx: &mut CallContext<'_>,
        selector: Selector,
        input: &[u8],
    ) -> Result<Vec<u8>, Revert> {
        let _ = (ctx, input);
        Err(Revert::new(format!("{selector} is not implemented")))
    }

    /// Runs post-cut initialization when the facet is a cut's delegate.
    ///
    /// # Errors
    ///
    /// Returns a [`Revert`] to abort the cut.
    fn initialize(&self, ctx: &mut InitContext<'_>, payload: &[u8]) -> Result<(), Revert> {
        let _ = (ctx, payload);
        Err(Revert::empty())
    }
}

/// The set of deployed facets, keyed by address.
///
/// A facet that is not in the catalog is unreachable: cuts cannot route to
/// it and it cannot act as a delegate.
#[derive(Clone, Default)]
pub struct FacetCatalog {
    facets: HashMap<FacetAddress, Arc<dyn Facet>>,
}

impl FacetCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys a facet.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidOperation`] for the zero address or an
    /// address that is already deployed.
    pub fn deploy(&mut self, facet: Arc<dyn Facet>) -> CoreResult<FacetAddress> {
        let address = facet.address();
        if address.is_zero() {
            return Err(CoreError::invalid_operation(
                "cannot deploy a facet at the zero address",
            ));
        }
        if self.facets.contains_key(&address) {
            return Err(CoreError::invalid_operation(format!(
                "facet {address} is already deployed"
            )));
        }
        self.facets.insert(address, facet);
        Ok(address)
    }

    /// Returns the deployed facet at `address`.
    #[must_use]
    pub fn get(&self, address: FacetAddress) -> Option<Arc<dyn Facet>> {
        self.facets.get(&address).cloned()
    }

    /// Returns `true` if a facet is deployed at `address`.
    #[must_use]
    pub fn contains(&self, address: FacetAddress) -> bool {
        self.facets.contains_key(&address)
    }

    /// Resolves a deployed facet.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FacetUnreachable`] if nothing is deployed there.
    pub fn resolve(&self, address: FacetAddress) -> CoreResult<Arc<dyn Facet>> {
        self.get(address)
            .ok_or(CoreError::FacetUnreachable { facet: address })
    }

    /// Asks the facet at `address` which selectors it claims.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FacetUnreachable`] if nothing is deployed there,
    /// or a codec error if its packed list is malformed.
    pub fn discover(&self, address: FacetAddress) -> CoreResult<Vec<Selector>> {
        let facet = self.resolve(address)?;
        let packed = facet.packed_selectors()?;
        Ok(decode_selector_list(&packed)?)
    }

    /// Returns the category declared by the facet at `address`.
    #[must_use]
    pub fn category_of(&self, address: FacetAddress) -> Option<Category> {
        self.facets.get(&address).and_then(|facet| facet.category())
    }

    /// Returns `true` if `category` is the default or some deployed facet
    /// declares it.
    #[must_use]
    pub fn knows_category(&self, category: &Category, default: &Category) -> bool {
        category == default
            || self
                .facets
                .values()
                .any(|facet| facet.category().as_ref() == Some(category))
    }

    /// Returns the number of deployed facets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facets.len()
    }

    /// Returns `true` if nothing is deployed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }
}

impl fmt::Debug for FacetCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut addresses: Vec<_> = self.facets.keys().copied().collect();
        addresses.sort();
        f.debug_struct("FacetCatalog")
            .field("facets", &addresses)
            .finish()
    }
}
