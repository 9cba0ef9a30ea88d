//! The loupe: read-only introspection over the registry.
//!
//! Two implementations answer the same questions. [`LiveLoupe`] scans the
//! registry and costs work proportional to the number of selectors.
//! [`CachedLoupe`] reads the shard cache's blobs and costs work proportional
//! to the number of facets. Unknown facets yield empty results on both paths.

mod cached;
mod live;

pub use cached::CachedLoupe;
pub use live::LiveLoupe;

use crate::error::CoreResult;
use bytes::Bytes;
use diamond_codec::{
    decode_address_list, decode_facet_records, decode_selector_list, FacetAddress, FacetRecord,
    Selector,
};

/// Enumeration of facets and their selectors.
///
/// The structured methods default to decoding the packed ones.
pub trait Loupe {
    /// All facets owning at least one selector, packed as an address list.
    ///
    /// # Errors
    ///
    /// Returns an error if a backing blob cannot be read.
    fn facet_addresses_packed(&self) -> CoreResult<Bytes>;

    /// All facets with their selectors, packed as a facet stream.
    ///
    /// # Errors
    ///
    /// Returns an error if a backing blob cannot be read.
    fn facets_packed(&self) -> CoreResult<Bytes>;

    /// Selectors of `facet`, packed as a selector list. Empty for an
    /// unknown facet.
    ///
    /// # Errors
    ///
    /// Returns an error if a backing blob cannot be read.
    fn facet_function_selectors_packed(&self, facet: FacetAddress) -> CoreResult<Bytes>;

    /// All facets owning at least one selector.
    ///
    /// # Errors
    ///
    /// Returns an error if a backing blob cannot be read.
    fn facet_addresses(&self) -> CoreResult<Vec<FacetAddress>> {
        Ok(decode_address_list(&self.facet_addresses_packed()?)?)
    }

    /// All facets with their selectors.
    ///
    /// # Errors
    ///
    /// Returns an error if a backing blob cannot be read.
    fn facets(&self) -> CoreResult<Vec<FacetRecord>> {
        Ok(decode_facet_records(&self.facets_packed()?)?)
    }

    /// Selectors of `facet`; empty for an unknown facet.
    ///
    /// # Errors
    ///
    /// Returns an error if a backing blob cannot be read.
    fn facet_function_selectors(&self, facet: FacetAddress) -> CoreResult<Vec<Selector>> {
        Ok(decode_selector_list(
            &self.facet_function_selectors_packed(facet)?,
        )?)
    }
}
