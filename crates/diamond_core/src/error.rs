//! Error types for diamond core.

use diamond_codec::{FacetAddress, Selector};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in diamond core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Blob storage error.
    #[error("storage error: {0}")]
    Storage(#[from] diamond_storage::StorageError),

    /// Packed codec error.
    #[error("codec error: {0}")]
    Codec(#[from] diamond_codec::CodecError),

    /// The selector already routes to a facet.
    #[error("selector {selector} already registered to {existing}")]
    DuplicateSelector {
        /// The selector being added.
        selector: Selector,
        /// The facet that already owns it.
        existing: FacetAddress,
    },

    /// The selector is not registered.
    #[error("selector {selector} is not registered")]
    SelectorNotFound {
        /// The missing selector.
        selector: Selector,
    },

    /// The facet owns no selectors.
    #[error("facet {facet} is not registered")]
    FacetNotFound {
        /// The missing facet.
        facet: FacetAddress,
    },

    /// A facet was named with no selectors to route to it.
    #[error("facet {facet} has no selectors")]
    NoSelectors {
        /// The facet without capabilities.
        facet: FacetAddress,
    },

    /// The facet is not deployed in the catalog.
    #[error("facet {facet} is not deployed")]
    FacetUnreachable {
        /// The unreachable facet.
        facet: FacetAddress,
    },

    /// A replacement named the same facet on both sides.
    #[error("cannot replace facet {facet} with itself")]
    IdenticalReplacement {
        /// The facet named twice.
        facet: FacetAddress,
    },

    /// A replacement facet claims a selector owned by a third facet.
    #[error("replacement claims selector {selector} owned by {owner}")]
    ReplacementConflict {
        /// The contested selector.
        selector: Selector,
        /// The facet that currently owns it.
        owner: FacetAddress,
    },

    /// An added selector is not among the facet's advertised selectors.
    #[error("facet {facet} does not advertise selector {selector}")]
    UnclaimedSelector {
        /// The facet being added.
        facet: FacetAddress,
        /// The selector it does not claim.
        selector: Selector,
    },

    /// The delegated initializer failed.
    #[error("delegate call to {target} failed: {}", .reason.as_deref().unwrap_or("initialization reverted without a reason"))]
    DelegateFailed {
        /// The delegate target.
        target: FacetAddress,
        /// The reason reported by the delegate, if any.
        reason: Option<String>,
    },

    /// The shard cache has never built this category.
    #[error("unknown cache category: {name}")]
    UnknownCategory {
        /// Name of the category.
        name: String,
    },

    /// A write targeted a reserved namespace.
    #[error("namespace {namespace} is reserved")]
    ReservedNamespace {
        /// Hex form of the reserved root.
        namespace: String,
    },

    /// Dispatch found no facet for the selector.
    #[error("function {selector} does not exist")]
    FunctionNotFound {
        /// The selector that was called.
        selector: Selector,
    },

    /// A facet rejected a dispatched call.
    #[error("call to {selector} reverted: {reason}")]
    CallReverted {
        /// The selector that was called.
        selector: Selector,
        /// The revert reason.
        reason: String,
    },

    /// Registry bookkeeping no longer matches its invariants.
    #[error("registry inconsistent: {message}")]
    Inconsistent {
        /// Description of the violation.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a registry inconsistency error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }

    /// Creates an unknown category error.
    pub fn unknown_category(name: impl Into<String>) -> Self {
        Self::UnknownCategory { name: name.into() }
    }

    /// Returns `true` for errors that reject the caller's input rather than
    /// signalling a storage or internal failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSelector { .. }
                | Self::SelectorNotFound { .. }
                | Self::FacetNotFound { .. }
                | Self::NoSelectors { .. }
                | Self::FacetUnreachable { .. }
                | Self::IdenticalReplacement { .. }
                | Self::ReplacementConflict { .. }
                | Self::UnclaimedSelector { .. }
                | Self::InvalidOperation { .. }
        )
    }
}
