//! Error types for ID3v2 parsing and writing.

use bitfield::FieldError;
use thiserror::Error;

/// Errors raised while wrapping, decoding or building ID3v2 structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Id3Error {
    #[error("field access: {0}")]
    Field(#[from] FieldError),

    /// The tag does not start with "ID3".
    #[error("missing ID3 identifier")]
    InvalidMagic,

    #[error("unsupported ID3v2 version 2.{0}")]
    UnsupportedVersion(u8),

    /// A size byte has its top bit set.
    #[error("invalid synchsafe integer")]
    InvalidSynchsafe,

    /// Whole-tag unsynchronisation of ID3v2.3 changes frame sizes and is
    /// not undone here.
    #[error("unsynchronised ID3v2.3 tag")]
    UnsynchronisedTag,

    #[error("invalid frame id {0:?}")]
    InvalidFrameId([u8; 4]),

    #[error("unknown text encoding {0:#04x}")]
    UnknownEncoding(u8),

    /// A string that must be terminated runs to the end of the frame.
    #[error("unterminated string")]
    MissingTerminator,

    /// The frame body is compressed or encrypted.
    #[error("frame {0:?} is compressed or encrypted")]
    OpaqueFrame([u8; 4]),

    #[error("text cannot be represented in {0}")]
    Unencodable(&'static str),
}

/// Result type alias for ID3 operations.
pub type Result<T> = std::result::Result<T, Id3Error>;
