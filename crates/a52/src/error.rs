//! Error types for A/52 header parsing.

use bitfield::FieldError;
use thiserror::Error;

/// Reasons an A/52 sync frame header is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum A52Error {
    /// The buffer is shorter than the fixed part of the header.
    #[error("field access: {0}")]
    Field(#[from] FieldError),

    /// The first two bytes are not 0x0B77.
    #[error("invalid syncword: {0:#06x}")]
    InvalidSyncword(u16),

    /// fscod (or fscod2 for E-AC-3) holds the reserved value.
    #[error("reserved sample rate code")]
    ReservedSampleRate,

    /// frmsizecod is past the end of the frame size table.
    #[error("invalid frame size code: {0}")]
    InvalidFrameSizeCode(u8),

    /// The bitstream identification does not belong to this syntax.
    #[error("unsupported bsid: {0}")]
    UnsupportedBsid(u8),
}

/// Result type alias for A/52 operations.
pub type Result<T> = std::result::Result<T, A52Error>;
