//! Error types for the IETF packet headers.

use bitfield::FieldError;
use thiserror::Error;

/// Why a packet header was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IetfError {
    #[error("field access: {0}")]
    Field(#[from] FieldError),

    #[error("unsupported version {0}")]
    InvalidVersion(u8),

    /// CSRC list, header extension or padding run past the packet.
    #[error("header of {header} bytes and {padding} padding bytes exceed packet of {available}")]
    Overrun {
        header: usize,
        padding: usize,
        available: usize,
    },

    #[error("unexpected payload type {0}")]
    InvalidPayloadType(u8),

    #[error("invalid header length {0}")]
    InvalidHeaderLength(u8),

    #[error("checksum mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { stored: u16, computed: u16 },
}

/// Result type alias for IETF header operations.
pub type Result<T> = std::result::Result<T, IetfError>;
