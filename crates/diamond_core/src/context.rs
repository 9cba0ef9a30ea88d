//! Contexts handed to facets during dispatch and delegated initialization.
//!
//! Both contexts give a facet namespaced access to diamond state. A write
//! under the registry's reserved namespace is refused with a [`Revert`], and
//! the refusal is remembered so the diamond can report it as
//! [`CoreError::ReservedNamespace`] whatever the facet does with the revert.

use crate::error::CoreError;
use crate::facet::Revert;
use crate::registry::DispatchRegistry;
use crate::state::{NamespaceRoot, StateStore};
use diamond_codec::{FacetAddress, Selector};

/// Namespaced state access shared by both contexts.
struct StateAccess<'a> {
    state: &'a mut StateStore,
    violation: Option<CoreError>,
}

impl<'a> StateAccess<'a> {
    fn new(state: &'a mut StateStore) -> Self {
        Self {
            state,
            violation: None,
        }
    }

    fn load(&self, namespace: &str, key: &[u8]) -> Option<&[u8]> {
        self.state.get(NamespaceRoot::derive(namespace), key)
    }

    fn store(&mut self, namespace: &str, key: &[u8], value: Vec<u8>) -> Result<(), Revert> {
        match self.state.insert(NamespaceRoot::derive(namespace), key, value) {
            Ok(_) => Ok(()),
            Err(err) => Err(self.refuse(err)),
        }
    }

    fn erase(&mut self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Revert> {
        self.state
            .remove(NamespaceRoot::derive(namespace), key)
            .map_err(|err| self.refuse(err))
    }

    fn refuse(&mut self, err: CoreError) -> Revert {
        let revert = Revert::new(err.to_string());
        self.violation.get_or_insert(err);
        revert
    }
}

/// Context for a dispatched call.
pub struct CallContext<'a> {
    selector: Selector,
    facet: FacetAddress,
    access: StateAccess<'a>,
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(selector: Selector, facet: FacetAddress, state: &'a mut StateStore) -> Self {
        Self {
            selector,
            facet,
            access: StateAccess::new(state),
        }
    }

    /// Returns the selector being called.
    #[must_use]
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// Returns the facet handling the call.
    #[must_use]
    pub fn facet(&self) -> FacetAddress {
        self.facet
    }

    /// Reads `key` in `namespace`.
    #[must_use]
    pub fn load(&self, namespace: &str, key: &[u8]) -> Option<&[u8]> {
        self.access.load(namespace, key)
    }

    /// Writes `value` at `key` in `namespace`.
    ///
    /// # Errors
    ///
    /// Reverts if `namespace` is reserved.
    pub fn store(&mut self, namespace: &str, key: &[u8], value: Vec<u8>) -> Result<(), Revert> {
        self.access.store(namespace, key, value)
    }

    /// Deletes `key` in `namespace`.
    ///
    /// # Errors
    ///
    /// Reverts if `namespace` is reserved.
    pub fn erase(&mut self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Revert> {
        self.access.erase(namespace, key)
    }

    pub(crate) fn into_violation(self) -> Option<CoreError> {
        self.access.violation
    }
}

/// Context for a cut's delegated initializer.
///
/// The initializer sees the staged registry and writes to the staged state;
/// both are discarded if the cut aborts.
pub struct InitContext<'a> {
    target: FacetAddress,
    registry: &'a DispatchRegistry,
    access: StateAccess<'a>,
}

impl<'a> InitContext<'a> {
    pub(crate) fn new(
        target: FacetAddress,
        registry: &'a DispatchRegistry,
        state: &'a mut StateStore,
    ) -> Self {
        Self {
            target,
            registry,
            access: StateAccess::new(state),
        }
    }

    /// Returns the delegate target.
    #[must_use]
    pub fn target(&self) -> FacetAddress {
        self.target
    }

    /// Returns the registry as the cut left it.
    #[must_use]
    pub fn registry(&self) -> &DispatchRegistry {
        self.registry
    }

    /// Reads `key` in `namespace`.
    #[must_use]
    pub fn load(&self, namespace: &str, key: &[u8]) -> Option<&[u8]> {
        self.access.load(namespace, key)
    }

    /// Writes `value` at `key` in `namespace`.
    ///
    /// # Errors
    ///
    /// Reverts if `namespace` is reserved.
    pub fn store(&mut self, namespace: &str, key: &[u8], value: Vec<u8>) -> Result<(), Revert> {
        self.access.store(namespace, key, value)
    }

    /// Deletes `key` in `namespace`.
    ///
    /// # Errors
    ///
    /// Reverts if `namespace` is reserved.
    pub fn erase(&mut self, namespace: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Revert> {
        self.access.erase(namespace, key)
    }

    pub(crate) fn into_violation(self) -> Option<CoreError> {
        self.access.violation
    }
}
