//! Error types for field access.

use thiserror::Error;

/// Errors raised by the checked field accessors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The buffer ends before the bytes the field or record needs.
    #[error("buffer too short: need {needed} bytes, have {available}")]
    OutOfBounds {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// The value does not fit in the field.
    #[error("value {value:#x} does not fit in {width} bits")]
    ValueTooWide {
        /// Rejected value.
        value: u64,
        /// Field width in bits.
        width: u8,
    },

    /// A nibble of a BCD field holds a value above 9.
    #[error("invalid BCD encoding {0:#x}")]
    InvalidBcd(u64),

    /// The record's length field could not be expressed.
    #[error("length {0} cannot be encoded in the record header")]
    LengthNotEncodable(usize),
}

/// Result type alias for field operations.
pub type Result<T> = std::result::Result<T, FieldError>;
