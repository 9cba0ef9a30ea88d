//! Shared helpers for the diamond benchmarks.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
