//! JSON diamond plans.
//!
//! A plan declares facets and a list of cuts to apply, in order:
//!
//! ```json
//! {
//!   "cache_enabled": true,
//!   "facets": [
//!     { "address": "0x…01", "selectors": ["0x7a0ed627"], "category": "loupe" }
//!   ],
//!   "cuts": [
//!     { "add": [{ "facet": "0x…01", "selectors": ["0x7a0ed627"] }], "tag": "init" }
//!   ]
//! }
//! ```

use diamond_codec::{CodecError, FacetAddress, Selector};
use diamond_core::{
    BlobRetention, BlobStore, Category, Config, CoreError, CutReceipt, Diamond, Facet, FacetCut,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors loading or applying a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The plan file could not be read.
    #[error("failed to read plan: {0}")]
    Io(#[from] std::io::Error),

    /// The plan is not valid JSON for the plan schema.
    #[error("invalid plan: {0}")]
    Json(#[from] serde_json::Error),

    /// A selector or address failed to parse.
    #[error("invalid identifier: {0}")]
    Identifier(#[from] CodecError),

    /// A cut was rejected.
    #[error("cut {index} failed: {source}")]
    Cut {
        /// Zero-based position of the cut in the plan.
        index: usize,
        /// Why the diamond rejected it.
        #[source]
        source: CoreError,
    },

    /// The diamond rejected a non-cut operation.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// A facet with a declared selector list and no behavior.
#[derive(Debug, Clone)]
pub struct DeclaredFacet {
    address: FacetAddress,
    selectors: Vec<Selector>,
    category: Option<Category>,
}

impl DeclaredFacet {
    /// Creates a declared facet.
    pub fn new(
        address: FacetAddress,
        selectors: Vec<Selector>,
        category: Option<Category>,
    ) -> Self {
        Self {
            address,
            selectors,
            category,
        }
    }
}

impl Facet for DeclaredFacet {
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

/// A diamond plan.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Start with the shard cache enabled.
    #[serde(default)]
    pub cache_enabled: bool,
    /// Category for facets that declare none.
    #[serde(default)]
    pub default_category: Option<String>,
    /// Keep superseded blobs instead of releasing them.
    #[serde(default)]
    pub retain_blobs: bool,
    /// Facets to deploy.
    pub facets: Vec<FacetEntry>,
    /// Cuts to apply, in order.
    #[serde(default)]
    pub cuts: Vec<CutEntry>,
}

/// A facet declaration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FacetEntry {
    /// Hex address.
    pub address: String,
    /// Hex selectors the facet claims.
    pub selectors: Vec<String>,
    /// Optional category.
    #[serde(default)]
    pub category: Option<String>,
}

/// One cut.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CutEntry {
    /// Additions.
    #[serde(default)]
    pub add: Vec<AddEntry>,
    /// Replacements.
    #[serde(default)]
    pub replace: Vec<ReplaceEntry>,
    /// Facets to remove.
    #[serde(default)]
    pub remove: Vec<String>,
    /// Metadata tag.
    #[serde(default)]
    pub tag: Option<String>,
}

/// An addition step.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddEntry {
    /// Hex address.
    pub facet: String,
    /// Hex selectors to route to it.
    pub selectors: Vec<String>,
}

/// A replacement step.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceEntry {
    /// Facet being replaced.
    pub old: String,
    /// Its replacement.
    pub new: String,
}

fn parse_selectors(raw: &[String]) -> Result<Vec<Selector>, CodecError> {
    raw.iter().map(|s| s.parse()).collect()
}

impl Plan {
    /// Reads a plan from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parses a plan from JSON text.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the diamond configuration the plan asks for.
    pub fn config(&self) -> Config {
        let mut config = Config::new().cache_enabled(self.cache_enabled);
        if let Some(category) = &self.default_category {
            config = config.default_category(category.as_str());
        }
        if self.retain_blobs {
            config = config.blob_retention(BlobRetention::Retain);
        }
        config
    }

    /// Builds a diamond over `store`, deploys the facets and applies the cuts.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed identifier or rejected cut.
    pub fn build(
        &self,
        store: Box<dyn BlobStore>,
    ) -> Result<(Diamond, Vec<CutReceipt>), PlanError> {
        let diamond = Diamond::new(self.config(), store)?;

        for declared in &self.facets {
            let facet = DeclaredFacet::new(
                declared.address.parse()?,
                parse_selectors(&declared.selectors)?,
                declared.category.as_deref().map(Category::new),
            );
            diamond.deploy(Arc::new(facet))?;
        }

        let mut receipts = Vec::with_capacity(self.cuts.len());
        for (index, entry) in self.cuts.iter().enumerate() {
            let cut = entry.to_cut()?;
            let receipt = diamond
                .diamond_cut(cut)
                .map_err(|source| PlanError::Cut { index, source })?;
            debug!(index, sequence = %receipt.sequence, "applied plan cut");
            receipts.push(receipt);
        }
        Ok((diamond, receipts))
    }
}

impl CutEntry {
    fn to_cut(&self) -> Result<FacetCut, PlanError> {
        let mut cut = FacetCut::new();
        for add in &self.add {
            cut = cut.add(add.facet.parse()?, parse_selectors(&add.selectors)?);
        }
        for replace in &self.replace {
            cut = cut.replace(replace.old.parse()?, replace.new.parse()?);
        }
        for facet in &self.remove {
            cut = cut.remove(facet.parse()?);
        }
        if let Some(tag) = &self.tag {
            cut = cut.tag(tag.as_str());
        }
        Ok(cut)
    }
}
