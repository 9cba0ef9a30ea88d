//! Bounds-checked cursor over packed bytes.

use crate::error::{CodecError, CodecResult};
use crate::types::{FacetAddress, Selector};
use bytes::Buf;

/// A cursor that decodes packed fields without panicking on short input.
///
/// Every read checks the remaining length first, so truncated blobs surface
/// as [`CodecError::UnexpectedEof`].
#[derive(Debug, Clone)]
pub struct PackedReader<'a> {
    buf: &'a [u8],
}

impl<'a> PackedReader<'a> {
    /// Creates a reader over `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> CodecResult<()> {
        if self.buf.remaining() < needed {
            return Err(CodecError::UnexpectedEof {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    /// Reads a 32-bit big-endian count prefix.
    pub fn read_count(&mut self) -> CodecResult<usize> {
        self.ensure(crate::COUNT_SIZE)?;
        Ok(self.buf.get_u32() as usize)
    }

    /// Reads one facet address.
    pub fn read_address(&mut self) -> CodecResult<FacetAddress> {
        self.ensure(FacetAddress::SIZE)?;
        let mut bytes = [0u8; FacetAddress::SIZE];
        self.buf.copy_to_slice(&mut bytes);
        Ok(FacetAddress::new(bytes))
    }

    /// Reads one selector.
    pub fn read_selector(&mut self) -> CodecResult<Selector> {
        self.ensure(Selector::SIZE)?;
        let mut bytes = [0u8; Selector::SIZE];
        self.buf.copy_to_slice(&mut bytes);
        Ok(Selector::new(bytes))
    }

    /// Borrows the next `len` bytes without copying.
    pub fn read_slice(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Fails if any input is left unread.
    pub fn finish(self) -> CodecResult<()> {
        match self.buf.remaining() {
            0 => Ok(()),
            count => Err(CodecError::TrailingBytes { count }),
        }
    }
}
