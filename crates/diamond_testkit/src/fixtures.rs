//! Test fixtures and diamond helpers.
//!
//! Provides a configurable facet, temporary diamonds, and common scenarios.

use diamond_core::{
    CallContext, Category, Config, Diamond, Facet, FacetAddress, InitContext, Revert, Selector,
    REGISTRY_NAMESPACE,
};
use diamond_storage::FileBlobStore;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Namespace where [`StaticFacet`] counts dispatched calls.
pub const CALLS_NAMESPACE: &str = "testkit.calls";

/// What a [`StaticFacet`] does when it runs as a cut's delegate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InitBehavior {
    /// Revert, with or without a reason.
    Revert(Option<String>),
    /// Succeed without touching state.
    #[default]
    Succeed,
    /// Write `payload` at `key` in `namespace`.
    Write {
        /// Target namespace.
        namespace: String,
        /// Target key.
        key: Vec<u8>,
    },
    /// Attempt a write under the registry's reserved namespace.
    WriteReserved,
}

/// A facet with a fixed selector list.
///
/// Dispatched calls return the selector bytes followed by the input, and
/// bump a per-selector counter under [`CALLS_NAMESPACE`].
#[derive(Debug, Clone)]
pub struct StaticFacet {
    address: FacetAddress,
    selectors: Vec<Selector>,
    category: Option<Category>,
    init: InitBehavior,
}

impl StaticFacet {
    /// Creates a facet at `FacetAddress::from_index(index)`.
    pub fn new(index: u64, selectors: impl IntoIterator<Item = Selector>) -> Self {
        Self {
            address: FacetAddress::from_index(index),
            selectors: selectors.into_iter().collect(),
            category: None,
            init: InitBehavior::default(),
        }
    }

    /// Places the facet in `category`.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<Category>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the delegate behavior.
    #[must_use]
    pub fn with_init(mut self, init: InitBehavior) -> Self {
        self.init = init;
        self
    }
}

impl Facet for StaticFacet {
    fn address(&self) -> FacetAddress {
        self.address
    }

    fn selectors(&self) -> Vec<Selector> {
        self.selectors.clone()
    }

    fn category(&self) -> Option<Category> {
        self.category.clone()
    }

    fn invoke(
        &self,
        ctx: &mut CallContext<'_>,
        selector: Selector,
        input: &[u8],
    ) -> Result<Vec<u8>, Revert> {
        let key = selector.as_bytes();
        let count = ctx
            .load(CALLS_NAMESPACE, key)
            .and_then(|bytes| bytes.try_into().ok())
            .map_or(0, u64::from_be_bytes);
        ctx.store(CALLS_NAMESPACE, key, (count + 1).to_be_bytes().to_vec())?;

        let mut output = key.to_vec();
        output.extend_from_slice(input);
        Ok(output)
    }

    fn initialize(&self, ctx: &mut InitContext<'_>, payload: &[u8]) -> Result<(), Revert> {
        match &self.init {
            InitBehavior::Revert(Some(reason)) => Err(Revert::new(reason.clone())),
            InitBehavior::Revert(None) => Err(Revert::empty()),
            InitBehavior::Succeed => Ok(()),
            InitBehavior::Write { namespace, key } => ctx.store(namespace, key, payload.to_vec()),
            InitBehavior::WriteReserved => {
                ctx.store(REGISTRY_NAMESPACE, b"owner", payload.to_vec())
            }
        }
    }
}

/// Returns the selectors `range` as [`Selector`]s.
pub fn selectors(range: Range<u32>) -> Vec<Selector> {
    range.map(Selector::from_u32).collect()
}

/// Shorthand for `Selector::from_u32`.
pub fn sel(value: u32) -> Selector {
    Selector::from_u32(value)
}

/// Shorthand for `FacetAddress::from_index`.
pub fn facet(index: u64) -> FacetAddress {
    FacetAddress::from_index(index)
}

/// A test diamond with automatic cleanup.
pub struct TestDiamond {
    /// The diamond instance.
    pub diamond: Diamond,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDiamond {
    /// Creates an in-memory test diamond.
    pub fn memory(config: Config) -> Self {
        Self {
            diamond: Diamond::in_memory(config).expect("Failed to create diamond"),
            temp_dir: None,
        }
    }

    /// Creates a test diamond whose blobs live in a temporary file.
    pub fn file(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileBlobStore::open_with_create_dirs(&temp_dir.path().join("blobs.log"))
            .expect("Failed to open blob log");
        let diamond =
            Diamond::new(config, Box::new(store)).expect("Failed to create file diamond");

        Self {
            diamond,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the blob log path if file-based.
    pub fn blob_path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join("blobs.log"))
    }

    /// Deploys a [`StaticFacet`] and returns its address.
    pub fn deploy(&self, facet: StaticFacet) -> FacetAddress {
        self.diamond
            .deploy(Arc::new(facet))
            .expect("Failed to deploy facet")
    }
}

impl std::ops::Deref for TestDiamond {
    type Target = Diamond;

    fn deref(&self) -> &Self::Target {
        &self.diamond
    }
}

/// Runs a test with a temporary in-memory diamond.
pub fn with_diamond<F, R>(config: Config, f: F) -> R
where
    F: FnOnce(&TestDiamond) -> R,
{
    let diamond = TestDiamond::memory(config);
    f(&diamond)
}

/// Common scenarios.
pub mod scenarios {
    use super::*;
    use diamond_core::FacetCut;

    /// Two facets: `facet(1)` serving selectors 1 and 2, `facet(2)` serving 3.
    pub fn two_facets(config: Config) -> TestDiamond {
        let diamond = TestDiamond::memory(config);
        let h1 = diamond.deploy(StaticFacet::new(1, [sel(1), sel(2)]));
        let h2 = diamond.deploy(StaticFacet::new(2, [sel(3)]));

        diamond
            .diamond_cut(FacetCut::new().add(h1, [sel(1), sel(2)]))
            .expect("Failed to add first facet");
        diamond
            .diamond_cut(FacetCut::new().add(h2, [sel(3)]))
            .expect("Failed to add second facet");
        diamond
    }

    /// `facet_count` facets splitting `selector_count` selectors evenly.
    ///
    /// Facet `i` (1-based) serves a contiguous run of selectors; the first
    /// `selector_count % facet_count` facets get one extra.
    pub fn populated(config: Config, facet_count: usize, selector_count: usize) -> TestDiamond {
        let diamond = TestDiamond::memory(config);
        if facet_count == 0 {
            return diamond;
        }

        let mut cut = FacetCut::new();
        let mut next = 1u32;

        for index in 0..facet_count {
            let share = selector_count / facet_count
                + usize::from(index < selector_count % facet_count);
            let owned = selectors(next..next + share as u32);
            next += share as u32;

            let address = diamond.deploy(StaticFacet::new(index as u64 + 1, owned.clone()));
            if !owned.is_empty() {
                cut = cut.add(address, owned);
            }
        }

        diamond.diamond_cut(cut).expect("Failed to populate diamond");
        diamond
    }
}
