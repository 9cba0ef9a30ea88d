//! # Diamond Codec
//!
//! Identifiers and packed encodings for the diamond dispatch registry.
//!
//! This crate provides:
//! - [`Selector`] and [`FacetAddress`], the fixed-width keys and values of the registry
//! - [`FacetRecord`], one facet with the selectors it serves
//! - Packed encodings used by the shard cache blobs and the packed loupe views
//!
//! Packed encodings are deterministic: identical inputs produce identical
//! bytes, which lets the shard cache reuse blobs by content digest.
//!
//! ## Usage
//!
//! ```
//! use diamond_codec::{decode_selector_list, encode_selector_list, Selector};
//!
//! let selectors = vec![Selector::from_u32(0x1234_5678), Selector::from_u32(0x9abc_def0)];
//! let bytes = encode_selector_list(&selectors).unwrap();
//! assert_eq!(bytes.len(), 4 + 2 * Selector::SIZE);
//! assert_eq!(decode_selector_list(&bytes).unwrap(), selectors);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod packed;
mod reader;
mod types;

pub use error::{CodecError, CodecResult};
pub use packed::{
    address_list_count, concat_address_lists, decode_address_list, decode_facet_records,
    decode_selector_list, encode_address_list, encode_facet_records, encode_selector_list,
    selector_list_count, FacetStreamWriter,
};
pub use reader::PackedReader;
pub use types::{FacetAddress, FacetRecord, Selector};

/// Width of every count prefix in the packed formats.
pub const COUNT_SIZE: usize = 4;
