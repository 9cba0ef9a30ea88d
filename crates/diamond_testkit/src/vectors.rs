//! Packed-encoding test vectors.
//!
//! Loupe clients in other languages decode the packed formats directly.
//! These vectors pin the byte layout so every client agrees with this
//! implementation.

use diamond_codec::{
    decode_address_list, decode_facet_records, decode_selector_list, encode_address_list,
    encode_facet_records, encode_selector_list, CodecResult,
};
use serde::{Deserialize, Serialize};

/// Which packed layout a vector exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// `[count][address]*count`
    AddressList,
    /// `[count][selector]*count`
    SelectorList,
    /// `[count]([address][count][selector]*count)*count`
    FacetStream,
}

/// A test vector that can be shared across languages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Layout of `input_hex`.
    pub encoding: Encoding,
    /// Input data (hex-encoded).
    pub input_hex: String,
    /// Expected canonical re-encoding (hex-encoded).
    pub expected_hex: String,
    /// Expected error message fragment (if this should fail).
    pub expected_error: Option<String>,
}

impl TestVector {
    fn valid(id: &str, description: &str, encoding: Encoding, hex: String) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            encoding,
            input_hex: hex.clone(),
            expected_hex: hex,
            expected_error: None,
        }
    }

    fn invalid(id: &str, description: &str, encoding: Encoding, hex: String, error: &str) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            encoding,
            input_hex: hex,
            expected_hex: String::new(),
            expected_error: Some(error.into()),
        }
    }

    /// Decodes the input and re-encodes it canonically.
    ///
    /// # Errors
    ///
    /// Returns the codec error for malformed input.
    pub fn reencode(&self) -> CodecResult<Vec<u8>> {
        let input = hex_decode(&self.input_hex);
        let bytes = match self.encoding {
            Encoding::AddressList => encode_address_list(&decode_address_list(&input)?)?,
            Encoding::SelectorList => encode_selector_list(&decode_selector_list(&input)?)?,
            Encoding::FacetStream => encode_facet_records(&decode_facet_records(&input)?)?,
        };
        Ok(bytes.to_vec())
    }
}

/// Encodes bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Decodes lowercase or uppercase hex. Panics on malformed input.
pub fn hex_decode(hex: &str) -> Vec<u8> {
    assert!(hex.len() % 2 == 0, "odd hex length: {hex}");
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("Invalid hex digit"))
        .collect()
}

fn count(n: u32) -> String {
    format!("{n:08x}")
}

fn address(index: u64) -> String {
    format!("{index:040x}")
}

/// Loupe function selectors used as sample data.
const FACETS: &str = "7a0ed627";
const FACET_FUNCTION_SELECTORS: &str = "adfca15e";
const FACET_ADDRESSES: &str = "52ef6b2c";
const FACET_ADDRESS: &str = "cdffacc6";

/// Address list vectors.
pub fn address_list_vectors() -> Vec<TestVector> {
    vec![
        TestVector::valid(
            "address_list_empty",
            "No facets",
            Encoding::AddressList,
            count(0),
        ),
        TestVector::valid(
            "address_list_one",
            "A single facet",
            Encoding::AddressList,
            count(1) + &address(1),
        ),
        TestVector::valid(
            "address_list_two",
            "Two facets keep their order",
            Encoding::AddressList,
            count(2) + &address(0xbeef) + &address(1),
        ),
        TestVector::invalid(
            "address_list_truncated",
            "Count promises two addresses, body holds one",
            Encoding::AddressList,
            count(2) + &address(1),
            "unexpected end",
        ),
    ]
}

/// Selector list vectors.
pub fn selector_list_vectors() -> Vec<TestVector> {
    vec![
        TestVector::valid(
            "selector_list_empty",
            "Unknown facet: empty list",
            Encoding::SelectorList,
            count(0),
        ),
        TestVector::valid(
            "selector_list_loupe",
            "Loupe selectors in registration order",
            Encoding::SelectorList,
            count(3) + FACET_ADDRESS + FACET_ADDRESSES + FACET_FUNCTION_SELECTORS,
        ),
        TestVector::invalid(
            "selector_list_trailing",
            "A stray byte after the last selector",
            Encoding::SelectorList,
            count(1) + FACETS + "ee",
            "trailing",
        ),
    ]
}

/// Facet stream vectors.
pub fn facet_stream_vectors() -> Vec<TestVector> {
    vec![
        TestVector::valid(
            "facet_stream_empty",
            "No facets",
            Encoding::FacetStream,
            count(0),
        ),
        TestVector::valid(
            "facet_stream_one",
            "One facet with two selectors",
            Encoding::FacetStream,
            count(1) + &address(0x10) + &count(2) + FACETS + FACET_ADDRESSES,
        ),
        TestVector::valid(
            "facet_stream_two",
            "Two facets, second with one selector",
            Encoding::FacetStream,
            count(2)
                + &address(0x10)
                + &count(2)
                + FACETS
                + FACET_ADDRESSES
                + &address(0x20)
                + &count(1)
                + FACET_ADDRESS,
        ),
        TestVector::invalid(
            "facet_stream_short_count",
            "Count prefix cut short",
            Encoding::FacetStream,
            "000000".into(),
            "unexpected end",
        ),
    ]
}

/// Generate all test vectors as JSON for cross-language use.
pub fn all_vectors_json() -> String {
    let vectors = AllTestVectors {
        address_list: address_list_vectors(),
        selector_list: selector_list_vectors(),
        facet_stream: facet_stream_vectors(),
    };

    serde_json::to_string_pretty(&vectors).expect("Failed to serialize vectors")
}

#[derive(Debug, Serialize, Deserialize)]
struct AllTestVectors {
    address_list: Vec<TestVector>,
    selector_list: Vec<TestVector>,
    facet_stream: Vec<TestVector>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(vectors: Vec<TestVector>) {
        for vector in vectors {
            match (&vector.expected_error, vector.reencode()) {
                (None, Ok(bytes)) => assert_eq!(
                    hex_encode(&bytes),
                    vector.expected_hex,
                    "Vector {} failed: {}",
                    vector.id,
                    vector.description
                ),
                (Some(fragment), Err(err)) => assert!(
                    err.to_string().contains(fragment.as_str()),
                    "Vector {} error {err} lacks {fragment:?}",
                    vector.id
                ),
                (expected, actual) => panic!(
                    "Vector {}: expected error {expected:?}, got {actual:?}",
                    vector.id
                ),
            }
        }
    }

    #[test]
    fn test_address_list_vectors() {
        check(address_list_vectors());
    }

    #[test]
    fn test_selector_list_vectors() {
        check(selector_list_vectors());
    }

    #[test]
    fn test_facet_stream_vectors() {
        check(facet_stream_vectors());
    }

    #[test]
    fn test_hex_roundtrip() {
        let bytes = vec![0x00, 0x7a, 0xff];
        assert_eq!(hex_decode(&hex_encode(&bytes)), bytes);
        assert_eq!(hex_decode("AbCd"), vec![0xab, 0xcd]);
    }

    #[test]
    fn test_all_vectors_json() {
        let json = all_vectors_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["address_list"].as_array().unwrap().len(), 4);
        assert_eq!(parsed["facet_stream"][1]["encoding"], "facet_stream");
    }
}
