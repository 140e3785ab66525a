//! Error types for the SMPTE packet formats.

use bitfield::FieldError;
use thiserror::Error;

/// Why a SMPTE packet was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmpteError {
    #[error("field access: {0}")]
    Field(#[from] FieldError),

    /// ANC packet does not start with 0x000 0x3FF 0x3FF.
    #[error("invalid ancillary data flag")]
    InvalidAncillaryDataFlag,

    /// Bit 8 or bit 9 of a 10-bit word disagrees with its low byte.
    #[error("parity error in {word} word {value:#05x}")]
    Parity { word: &'static str, value: u16 },

    #[error("checksum mismatch: stored {stored:#x}, computed {computed:#x}")]
    ChecksumMismatch { stored: u16, computed: u16 },

    /// Pa/Pb or a packet identifier does not match.
    #[error("invalid sync pattern {0:#x}")]
    InvalidSync(u32),

    #[error("unsupported data mode {0}")]
    UnsupportedDataMode(u8),

    #[error("packet of {needed} bytes exceeds buffer of {available}")]
    Overrun { needed: usize, available: usize },

    #[error("invalid length {0}")]
    InvalidLength(usize),

    #[error("invalid footer {0:#04x}")]
    InvalidFooter(u8),
}

/// Result type alias for SMPTE operations.
pub type Result<T> = std::result::Result<T, SmpteError>;
