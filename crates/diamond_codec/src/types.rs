//! Fixed-width identifiers.

use crate::error::{CodecError, CodecResult};
use std::fmt;
use std::str::FromStr;

/// A 4-byte function selector: the key the dispatch registry routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector([u8; 4]);

impl Selector {
    /// Encoded width in bytes.
    pub const SIZE: usize = 4;

    /// Creates a selector from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Creates a selector from its big-endian integer form.
    #[must_use]
    pub const fn from_u32(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    /// Returns the big-endian integer form.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<u32> for Selector {
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.as_u32())
    }
}

impl FromStr for Selector {
    type Err = CodecError;

    fn from_str(s: &str) -> CodecResult<Self> {
        parse_hex::<4>(s).map(Self)
    }
}

/// A 20-byte facet address: the opaque identity of a handler module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FacetAddress([u8; 20]);

impl FacetAddress {
    /// Encoded width in bytes.
    pub const SIZE: usize = 20;

    /// The all-zero address.
    pub const ZERO: Self = Self([0; 20]);

    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address whose low 8 bytes hold `index` (big-endian).
    ///
    /// Convenient for fixtures and benchmarks that need many distinct facets.
    #[must_use]
    pub fn from_index(index: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&index.to_be_bytes());
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the lowest-order byte.
    #[must_use]
    pub const fn low_byte(&self) -> u8 {
        self.0[19]
    }

    /// Returns `true` for the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for FacetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for FacetAddress {
    type Err = CodecError;

    fn from_str(s: &str) -> CodecResult<Self> {
        parse_hex::<20>(s).map(Self)
    }
}

/// One facet and the selectors it serves, in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FacetRecord {
    /// The facet address.
    pub address: FacetAddress,
    /// Selectors routed to `address`.
    pub selectors: Vec<Selector>,
}

impl FacetRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(address: FacetAddress, selectors: Vec<Selector>) -> Self {
        Self { address, selectors }
    }

    /// Encoded width of this record in the packed facet stream.
    #[must_use]
    pub fn packed_len(&self) -> usize {
        FacetAddress::SIZE + crate::COUNT_SIZE + self.selectors.len() * Selector::SIZE
    }
}

/// Parses `0x`-prefixed (or bare) hex with exactly `N` bytes.
fn parse_hex<const N: usize>(s: &str) -> CodecResult<[u8; N]> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    if digits.len() != N * 2 {
        return Err(CodecError::invalid_hex(
            s,
            format!("expected {} hex digits, got {}", N * 2, digits.len()),
        ));
    }

    let mut out = [0u8; N];
    for (slot, pair) in out.iter_mut().zip(digits.as_bytes().chunks_exact(2)) {
        let text = std::str::from_utf8(pair).map_err(|_| CodecError::invalid_hex(s, "not ASCII"))?;
        *slot = u8::from_str_radix(text, 16)
            .map_err(|e| CodecError::invalid_hex(s, e.to_string()))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_display_and_parse() {
        let selector = Selector::from_u32(0xcdff_ab12);
        assert_eq!(selector.to_string(), "0xcdffab12");
        assert_eq!("0xcdffab12".parse::<Selector>().unwrap(), selector);
        assert_eq!("CDFFAB12".parse::<Selector>().unwrap(), selector);
    }

    #[test]
    fn selector_rejects_wrong_width() {
        let err = "0x1234".parse::<Selector>().unwrap_err();
        assert!(matches!(err, CodecError::InvalidHex { .. }));
    }

    #[test]
    fn selector_rejects_non_hex() {
        assert!("0xzzzzzzzz".parse::<Selector>().is_err());
    }

    #[test]
    fn selector_ordering_follows_integer_form() {
        assert!(Selector::from_u32(1) < Selector::from_u32(0x0100_0000));
    }

    #[test]
    fn address_from_index_and_low_byte() {
        let address = FacetAddress::from_index(0x1ff);
        assert_eq!(address.low_byte(), 0xff);
        assert_eq!(address.as_bytes()[18], 0x01);
        assert!(!address.is_zero());
        assert!(FacetAddress::ZERO.is_zero());
    }

    #[test]
    fn address_display_roundtrip() {
        let address = FacetAddress::from_index(42);
        let shown = address.to_string();
        assert_eq!(shown.len(), 42);
        assert!(shown.ends_with("2a"));
        assert_eq!(shown.parse::<FacetAddress>().unwrap(), address);
    }

    #[test]
    fn facet_record_packed_len() {
        let record = FacetRecord::new(
            FacetAddress::from_index(1),
            vec![Selector::from_u32(1), Selector::from_u32(2)],
        );
        assert_eq!(record.packed_len(), 20 + 4 + 8);
    }
}
