//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before a complete item was read.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the next item.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },

    /// Input carried bytes past the last declared item.
    #[error("{count} trailing bytes after packed data")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        count: usize,
    },

    /// A collection is too large for its count prefix.
    #[error("count {count} does not fit the 32-bit count prefix")]
    CountOverflow {
        /// The offending count.
        count: usize,
    },

    /// A writer finished with a different number of records than it declared.
    #[error("declared {declared} records, wrote {written}")]
    CountMismatch {
        /// Records announced in the count prefix.
        declared: usize,
        /// Records actually written.
        written: usize,
    },

    /// Text could not be parsed as a hex identifier.
    #[error("invalid hex identifier {input:?}: {message}")]
    InvalidHex {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        message: String,
    },
}

impl CodecError {
    /// Create an invalid hex error.
    pub fn invalid_hex(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidHex {
            input: input.into(),
            message: message.into(),
        }
    }
}
