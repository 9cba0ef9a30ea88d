//! # Diamond Testkit
//!
//! Test utilities for the diamond.
//!
//! This crate provides:
//! - Fixtures: a configurable facet and temporary diamonds
//! - Property-based test generators using proptest
//! - A reference model of the registry and a harness checking a diamond against it
//! - Stress testing utilities
//! - Packed-encoding test vectors for loupe clients
//!
//! ## Usage
//!
//! ```rust,ignore
//! use diamond_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_diamond() {
//!     with_diamond(Config::default(), |diamond| {
//!         let facet = diamond.deploy(StaticFacet::new(1, [sel(1)]));
//!         // ... cut and read
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod model;
pub mod stress;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::model::*;
    pub use crate::stress::*;
    pub use diamond_core::{Config, FacetCut};
}

pub use fixtures::*;
pub use generators::*;
pub use model::*;
pub use stress::*;
pub use vectors::*;
