//! CLI command implementations.

pub mod bench;
pub mod blobs;
pub mod inspect;
pub mod plan;
pub mod report;
