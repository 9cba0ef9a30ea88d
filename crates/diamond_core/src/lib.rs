//! # Diamond Core
//!
//! Call dispatch through a facet registry, with a read-optimized loupe.
//!
//! This crate provides:
//! - [`DispatchRegistry`]: selector → facet map with O(1) add, remove and replace
//! - The cut protocol: atomic batch mutation via [`Diamond::diamond_cut`]
//! - [`ShardCache`]: per-category packed snapshots rebuilt on every cut
//! - The loupe: cached and live introspection behind one [`Loupe`] trait
//! - Dispatch of calls to deployed [`Facet`]s over namespaced state
//!
//! ## Example
//!
//! ```rust,ignore
//! use diamond_core::{Config, Diamond, FacetCut};
//!
//! let diamond = Diamond::in_memory(Config::new().cache_enabled(true))?;
//! let facet = diamond.deploy(my_facet)?;
//! diamond.diamond_cut(FacetCut::new().add(facet, my_selectors))?;
//!
//! for record in diamond.facets()? {
//!     println!("{} serves {} selectors", record.address, record.selectors.len());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod context;
mod cut;
mod diamond;
mod error;
mod facet;
mod loupe;
mod registry;
mod state;
mod stats;
mod types;

pub use cache::{RebuildReport, Shard, ShardCache};
pub use config::{BlobRetention, Config};
pub use context::{CallContext, InitContext};
pub use cut::{CutEvent, CutRecord, EventLog, FacetAddition, FacetCut, FacetReplacement};
pub use diamond::{CutReceipt, Diamond};
pub use error::{CoreError, CoreResult};
pub use facet::{Facet, FacetCatalog, Revert};
pub use loupe::{CachedLoupe, LiveLoupe, Loupe};
pub use registry::{DispatchRegistry, HandlerEntry};
pub use state::{NamespaceRoot, StateStore, REGISTRY_NAMESPACE};
pub use stats::{DiamondStats, StatsSnapshot, WORD_SIZE};
pub use types::{Category, CutSequence, DEFAULT_CATEGORY};

pub use diamond_codec::{FacetAddress, FacetRecord, Selector};
pub use diamond_storage::{BlobHandle, BlobStore, FileBlobStore, MemoryBlobStore};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
