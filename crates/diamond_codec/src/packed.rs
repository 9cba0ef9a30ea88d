//! Packed fixed-width encodings.
//!
//! ## Formats
//!
//! All counts are 32-bit big-endian.
//!
//! ```text
//! address list:  | count (4) | address (20) * count |
//! selector list: | count (4) | selector (4) * count |
//! facet stream:  | facet count (4) | record * facet count |
//!   record:      | address (20) | selector list |
//! ```
//!
//! Every encoder sizes its buffer up front and writes into it once. Lists are
//! never grown by repeated concatenation.

use crate::error::{CodecError, CodecResult};
use crate::reader::PackedReader;
use crate::types::{FacetAddress, FacetRecord, Selector};
use crate::COUNT_SIZE;
use bytes::{BufMut, Bytes, BytesMut};

fn count_prefix(count: usize) -> CodecResult<u32> {
    u32::try_from(count).map_err(|_| CodecError::CountOverflow { count })
}

/// Encodes an address list.
///
/// # Errors
///
/// Returns [`CodecError::CountOverflow`] for more than `u32::MAX` addresses.
pub fn encode_address_list(addresses: &[FacetAddress]) -> CodecResult<Bytes> {
    let count = count_prefix(addresses.len())?;
    let mut buf = BytesMut::with_capacity(COUNT_SIZE + addresses.len() * FacetAddress::SIZE);
    buf.put_u32(count);
    for address in addresses {
        buf.put_slice(address.as_bytes());
    }
    Ok(buf.freeze())
}

/// Decodes an address list, rejecting truncated or over-long input.
pub fn decode_address_list(bytes: &[u8]) -> CodecResult<Vec<FacetAddress>> {
    let mut reader = PackedReader::new(bytes);
    let count = reader.read_count()?;
    // Bound the allocation by what the input can actually hold
    let mut addresses = Vec::with_capacity(count.min(reader.remaining() / FacetAddress::SIZE));
    for _ in 0..count {
        addresses.push(reader.read_address()?);
    }
    reader.finish()?;
    Ok(addresses)
}

/// Encodes a selector list.
///
/// # Errors
///
/// Returns [`CodecError::CountOverflow`] for more than `u32::MAX` selectors.
pub fn encode_selector_list(selectors: &[Selector]) -> CodecResult<Bytes> {
    let count = count_prefix(selectors.len())?;
    let mut buf = BytesMut::with_capacity(COUNT_SIZE + selectors.len() * Selector::SIZE);
    buf.put_u32(count);
    for selector in selectors {
        buf.put_slice(selector.as_bytes());
    }
    Ok(buf.freeze())
}

/// Decodes a selector list, rejecting truncated or over-long input.
pub fn decode_selector_list(bytes: &[u8]) -> CodecResult<Vec<Selector>> {
    let mut reader = PackedReader::new(bytes);
    let count = reader.read_count()?;
    let mut selectors = Vec::with_capacity(count.min(reader.remaining() / Selector::SIZE));
    for _ in 0..count {
        selectors.push(reader.read_selector()?);
    }
    reader.finish()?;
    Ok(selectors)
}

/// Validates a packed list of `width`-byte items and returns its count.
fn checked_list_count(bytes: &[u8], width: usize) -> CodecResult<usize> {
    let mut reader = PackedReader::new(bytes);
    let count = reader.read_count()?;
    let body = count
        .checked_mul(width)
        .ok_or(CodecError::CountOverflow { count })?;
    reader.read_slice(body)?;
    reader.finish()?;
    Ok(count)
}

/// Returns the declared count of an address list after checking its length.
pub fn address_list_count(bytes: &[u8]) -> CodecResult<usize> {
    checked_list_count(bytes, FacetAddress::SIZE)
}

/// Returns the declared count of a selector list after checking its length.
pub fn selector_list_count(bytes: &[u8]) -> CodecResult<usize> {
    checked_list_count(bytes, Selector::SIZE)
}

/// Merges several packed address lists into one, in order.
///
/// The output is allocated once at its final size; each part's body is
/// copied without decoding individual addresses.
pub fn concat_address_lists<T: AsRef<[u8]>>(parts: &[T]) -> CodecResult<Bytes> {
    let mut total = 0usize;
    for part in parts {
        total += address_list_count(part.as_ref())?;
    }

    let count = count_prefix(total)?;
    let mut buf = BytesMut::with_capacity(COUNT_SIZE + total * FacetAddress::SIZE);
    buf.put_u32(count);
    for part in parts {
        buf.put_slice(&part.as_ref()[COUNT_SIZE..]);
    }
    Ok(buf.freeze())
}

/// Incremental writer for the packed facet stream.
///
/// The facet count is declared up front; [`FacetStreamWriter::finish`]
/// fails if a different number of records was pushed.
#[derive(Debug)]
pub struct FacetStreamWriter {
    buf: BytesMut,
    declared: usize,
    written: usize,
}

impl FacetStreamWriter {
    /// Creates a writer for `facet_count` records whose selector lists add up
    /// to `selector_bytes` encoded bytes (prefixes included).
    pub fn with_capacity(facet_count: usize, selector_bytes: usize) -> CodecResult<Self> {
        let declared = count_prefix(facet_count)?;
        let mut buf =
            BytesMut::with_capacity(COUNT_SIZE + facet_count * FacetAddress::SIZE + selector_bytes);
        buf.put_u32(declared);
        Ok(Self {
            buf,
            declared: facet_count,
            written: 0,
        })
    }

    /// Appends a record from an already-packed selector list.
    ///
    /// The list is length-checked but not decoded.
    pub fn push_packed(&mut self, address: FacetAddress, selector_list: &[u8]) -> CodecResult<()> {
        selector_list_count(selector_list)?;
        self.buf.put_slice(address.as_bytes());
        self.buf.put_slice(selector_list);
        self.written += 1;
        Ok(())
    }

    /// Appends a record.
    pub fn push(&mut self, record: &FacetRecord) -> CodecResult<()> {
        let count = count_prefix(record.selectors.len())?;
        self.buf.put_slice(record.address.as_bytes());
        self.buf.put_u32(count);
        for selector in &record.selectors {
            self.buf.put_slice(selector.as_bytes());
        }
        self.written += 1;
        Ok(())
    }

    /// Returns the finished stream.
    pub fn finish(self) -> CodecResult<Bytes> {
        if self.written != self.declared {
            return Err(CodecError::CountMismatch {
                declared: self.declared,
                written: self.written,
            });
        }
        Ok(self.buf.freeze())
    }
}

/// Encodes facet records as a packed facet stream.
pub fn encode_facet_records(records: &[FacetRecord]) -> CodecResult<Bytes> {
    let selector_bytes = records
        .iter()
        .map(|r| COUNT_SIZE + r.selectors.len() * Selector::SIZE)
        .sum();
    let mut writer = FacetStreamWriter::with_capacity(records.len(), selector_bytes)?;
    for record in records {
        writer.push(record)?;
    }
    writer.finish()
}

/// Decodes a packed facet stream.
pub fn decode_facet_records(bytes: &[u8]) -> CodecResult<Vec<FacetRecord>> {
    let mut reader = PackedReader::new(bytes);
    let facet_count = reader.read_count()?;
    let min_record = FacetAddress::SIZE + COUNT_SIZE;
    let mut records = Vec::with_capacity(facet_count.min(reader.remaining() / min_record));

    for _ in 0..facet_count {
        let address = reader.read_address()?;
        let count = reader.read_count()?;
        let mut selectors = Vec::with_capacity(count.min(reader.remaining() / Selector::SIZE));
        for _ in 0..count {
            selectors.push(reader.read_selector()?);
        }
        records.push(FacetRecord { address, selectors });
    }

    reader.finish()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(i: u64) -> FacetAddress {
        FacetAddress::from_index(i)
    }

    fn sel(v: u32) -> Selector {
        Selector::from_u32(v)
    }

    #[test]
    fn address_list_layout() {
        let bytes = encode_address_list(&[addr(1), addr(2)]).unwrap();
        assert_eq!(bytes.len(), 4 + 40);
        assert_eq!(&bytes[..4], &[0, 0, 0, 2]);
        assert_eq!(&bytes[4..24], addr(1).as_bytes());
    }

    #[test]
    fn empty_lists() {
        let bytes = encode_address_list(&[]).unwrap();
        assert_eq!(&bytes[..], &[0, 0, 0, 0]);
        assert!(decode_address_list(&bytes).unwrap().is_empty());
        assert!(decode_selector_list(&[0, 0, 0, 0]).unwrap().is_empty());
    }

    #[test]
    fn selector_list_preserves_order() {
        let selectors = vec![sel(3), sel(1), sel(2)];
        let bytes = encode_selector_list(&selectors).unwrap();
        assert_eq!(decode_selector_list(&bytes).unwrap(), selectors);
    }

    #[test]
    fn truncated_list_is_rejected() {
        let bytes = encode_selector_list(&[sel(1), sel(2)]).unwrap();
        let err = decode_selector_list(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof { .. }));
    }

    #[test]
    fn overlong_list_is_rejected() {
        let mut bytes = encode_selector_list(&[sel(1)]).unwrap().to_vec();
        bytes.push(0);
        assert_eq!(
            decode_selector_list(&bytes).unwrap_err(),
            CodecError::TrailingBytes { count: 1 }
        );
    }

    #[test]
    fn huge_declared_count_does_not_preallocate() {
        // Claims u32::MAX addresses but carries none
        let err = decode_address_list(&[0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof { .. }));
    }

    #[test]
    fn list_counts() {
        let bytes = encode_address_list(&[addr(1), addr(2), addr(3)]).unwrap();
        assert_eq!(address_list_count(&bytes).unwrap(), 3);
        assert!(selector_list_count(&bytes).is_err());
    }

    #[test]
    fn concat_keeps_part_order() {
        let first = encode_address_list(&[addr(1), addr(2)]).unwrap();
        let empty = encode_address_list(&[]).unwrap();
        let second = encode_address_list(&[addr(3)]).unwrap();

        let merged = concat_address_lists(&[first, empty, second]).unwrap();
        assert_eq!(
            decode_address_list(&merged).unwrap(),
            vec![addr(1), addr(2), addr(3)]
        );
    }

    #[test]
    fn concat_of_nothing_is_empty_list() {
        let merged = concat_address_lists::<Vec<u8>>(&[]).unwrap();
        assert_eq!(&merged[..], &[0, 0, 0, 0]);
    }

    #[test]
    fn concat_rejects_malformed_part() {
        let bad = vec![0u8, 0, 0, 1, 9];
        assert!(concat_address_lists(&[bad]).is_err());
    }

    #[test]
    fn facet_stream_from_packed_parts_matches_structured() {
        let records = vec![
            FacetRecord::new(addr(1), vec![sel(1), sel(2)]),
            FacetRecord::new(addr(2), vec![sel(3)]),
        ];
        let structured = encode_facet_records(&records).unwrap();

        let lists: Vec<Bytes> = records
            .iter()
            .map(|r| encode_selector_list(&r.selectors).unwrap())
            .collect();
        let selector_bytes = lists.iter().map(Bytes::len).sum();
        let mut writer = FacetStreamWriter::with_capacity(2, selector_bytes).unwrap();
        for (record, list) in records.iter().zip(&lists) {
            writer.push_packed(record.address, list).unwrap();
        }
        let packed = writer.finish().unwrap();

        assert_eq!(structured, packed);
        assert_eq!(decode_facet_records(&packed).unwrap(), records);
    }

    #[test]
    fn facet_stream_writer_checks_declared_count() {
        let mut writer = FacetStreamWriter::with_capacity(2, 0).unwrap();
        writer
            .push(&FacetRecord::new(addr(1), vec![sel(1)]))
            .unwrap();
        assert_eq!(
            writer.finish().unwrap_err(),
            CodecError::CountMismatch {
                declared: 2,
                written: 1
            }
        );
    }

    #[test]
    fn push_packed_rejects_malformed_list() {
        let mut writer = FacetStreamWriter::with_capacity(1, 0).unwrap();
        assert!(writer.push_packed(addr(1), &[0, 0, 0, 2, 1]).is_err());
    }

    proptest! {
        #[test]
        fn address_list_roundtrip(raw in prop::collection::vec(any::<u64>(), 0..64)) {
            let addresses: Vec<_> = raw.into_iter().map(FacetAddress::from_index).collect();
            let bytes = encode_address_list(&addresses).unwrap();
            prop_assert_eq!(bytes.len(), 4 + addresses.len() * 20);
            prop_assert_eq!(decode_address_list(&bytes).unwrap(), addresses);
        }

        #[test]
        fn facet_stream_roundtrip(
            raw in prop::collection::vec(
                (any::<u64>(), prop::collection::vec(any::<u32>(), 0..8)),
                0..16,
            )
        ) {
            let records: Vec<_> = raw
                .into_iter()
                .map(|(a, s)| FacetRecord::new(
                    FacetAddress::from_index(a),
                    s.into_iter().map(Selector::from_u32).collect(),
                ))
                .collect();
            let bytes = encode_facet_records(&records).unwrap();
            let expected_len: usize =
                4 + records.iter().map(FacetRecord::packed_len).sum::<usize>();
            prop_assert_eq!(bytes.len(), expected_len);
            prop_assert_eq!(decode_facet_records(&bytes).unwrap(), records);
        }
    }
}
