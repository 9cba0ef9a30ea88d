//! Namespaced diamond state.
//!
//! Facets share one state store. Each facet keys its data under a
//! [`NamespaceRoot`] derived from a namespace string, so unrelated facets
//! cannot collide. The registry's own root is reserved.

use crate::error::{CoreError, CoreResult};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Namespace under which the dispatch registry is keyed.
pub const REGISTRY_NAMESPACE: &str = "diamond.standard.diamond.storage";

/// Collision-free root of a state namespace: SHA-256 of its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamespaceRoot([u8; 32]);

impl NamespaceRoot {
    /// Derives the root for `namespace`.
    #[must_use]
    pub fn derive(namespace: &str) -> Self {
        Self(Sha256::digest(namespace.as_bytes()).into())
    }

    /// Returns the registry's reserved root.
    #[must_use]
    pub fn registry() -> Self {
        Self::derive(REGISTRY_NAMESPACE)
    }

    /// Returns the raw root bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns `true` for the registry's root.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        *self == Self::registry()
    }
}

impl fmt::Display for NamespaceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Key-value state partitioned by namespace root.
///
/// Cloning produces an independent copy; cuts stage their writes on a clone
/// and publish it only on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateStore {
    namespaces: BTreeMap<NamespaceRoot, BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl StateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `key` under `root`.
    #[must_use]
    pub fn get(&self, root: NamespaceRoot, key: &[u8]) -> Option<&[u8]> {
        self.namespaces
            .get(&root)
            .and_then(|slots| slots.get(key))
            .map(Vec::as_slice)
    }

    /// Writes `value` at `key` under `root`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReservedNamespace`] for the registry's root.
    pub fn insert(
        &mut self,
        root: NamespaceRoot,
        key: &[u8],
        value: Vec<u8>,
    ) -> CoreResult<Option<Vec<u8>>> {
        Self::check_writable(root)?;
        Ok(self
            .namespaces
            .entry(root)
            .or_default()
            .insert(key.to_vec(), value))
    }

    /// Deletes `key` under `root`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ReservedNamespace`] for the registry's root.
    pub fn remove(&mut self, root: NamespaceRoot, key: &[u8]) -> CoreResult<Option<Vec<u8>>> {
        Self::check_writable(root)?;
        let Some(slots) = self.namespaces.get_mut(&root) else {
            return Ok(None);
        };
        let previous = slots.remove(key);
        if slots.is_empty() {
            self.namespaces.remove(&root);
        }
        Ok(previous)
    }

    /// Returns the number of keys under `root`.
    #[must_use]
    pub fn namespace_len(&self, root: NamespaceRoot) -> usize {
        self.namespaces.get(&root).map_or(0, BTreeMap::len)
    }

    /// Returns the total number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.namespaces.values().map(BTreeMap::len).sum()
    }

    /// Returns `true` if no key is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    fn check_writable(root: NamespaceRoot) -> CoreResult<()> {
        if root.is_reserved() {
            return Err(CoreError::ReservedNamespace {
                namespace: root.to_string(),
            });
        }
        Ok(())
    }
}
