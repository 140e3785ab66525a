use bitfield::FieldError;
use thiserror::Error;

/// Errors raised while wrapping or decoding TS, PSI and SI structures.
///
/// The `validate` predicates stay boolean; these variants are what the
/// constructors report when they refuse a buffer.
#[derive(Error, Debug)]
pub enum TsError {
    #[error("field access: {0}")]
    Field(#[from] FieldError),

    #[error("invalid sync byte: {0:#04x}")]
    InvalidSyncByte(u8),

    #[error("invalid packet size: {0}")]
    InvalidPacketSize(usize),

    #[error("insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("invalid table id: expected {expected:#04x}, got {actual:#04x}")]
    InvalidTableId { expected: u8, actual: u8 },

    #[error("invalid section length: {0}")]
    InvalidSectionLength(u16),

    #[error("table {0:#04x} is not a long-form section")]
    ShortSection(u8),

    #[error("CRC-32 mismatch: stored {expected:#010x}, calculated {calculated:#010x}")]
    Crc32Mismatch { expected: u32, calculated: u32 },

    #[error("invalid PES start code")]
    InvalidPesStartCode,

    #[error("invalid PTS/DTS flags: {0:#04b}")]
    InvalidPtsDtsFlags(u8),

    #[error("malformed descriptor {tag:#04x}")]
    MalformedDescriptor { tag: u8 },

    #[error("invalid SCTE-35 section: {0}")]
    InvalidScte35(String),

    #[error("continuity error on PID {pid:#06x}: expected {expected}, got {actual}")]
    ContinuityError { pid: u16, expected: u8, actual: u8 },

    #[error("duplicate packet on PID {pid:#06x} (cc {cc})")]
    DuplicatePacket { pid: u16, cc: u8 },

    #[error("value out of range: {0}")]
    OutOfRange(String),
}
