use crate::{BitField, FieldError, Result};

/// Where a record stores its length and how to turn it into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthField {
    /// Every record has the same length.
    Fixed(usize),
    /// `raw * unit + bias` bytes follow the header.
    Bits {
        /// Field holding the raw count.
        field: BitField,
        /// Size of one counted unit in bytes (4 for 32-bit word counts).
        unit: usize,
        /// Constant added after scaling.
        bias: usize,
    },
    /// A 28-bit synchsafe integer (7 bits per byte, MSB clear) over the
    /// four bytes at the given offset, as used by ID3v2.
    Synchsafe(usize),
}

impl LengthField {
    /// Plain byte count stored in `field`.
    pub const fn bits(field: BitField) -> Self {
        Self::Bits {
            field,
            unit: 1,
            bias: 0,
        }
    }

    /// Count of `unit`-byte units stored in `field`.
    pub const fn units(field: BitField, unit: usize) -> Self {
        Self::Bits {
            field,
            unit,
            bias: 0,
        }
    }

    /// Bytes of the record that must be present to read the length.
    pub const fn end(&self) -> usize {
        match self {
            Self::Fixed(_) => 0,
            Self::Bits { field, .. } => field.end(),
            Self::Synchsafe(offset) => *offset + 4,
        }
    }
}

/// Decode a 28-bit synchsafe integer.
pub fn synchsafe_decode(bytes: [u8; 4]) -> Option<usize> {
    if bytes.iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    Some(
        ((bytes[0] as usize) << 21)
            | ((bytes[1] as usize) << 14)
            | ((bytes[2] as usize) << 7)
            | bytes[3] as usize,
    )
}

/// Encode a value below 2^28 as a synchsafe integer.
pub fn synchsafe_encode(value: usize) -> Option<[u8; 4]> {
    if value >= 1 << 28 {
        return None;
    }
    Some([
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ])
}

/// A record whose size is declared inside its own header.
///
/// `occupied = header_size + declared`, and a record is only well formed when
/// that fits in the bytes available to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    /// Bytes preceding the counted part (tag, length field, fixed fields).
    pub header_size: usize,
    /// Encoding of the declared length.
    pub length: LengthField,
}

impl RecordLayout {
    /// Record with a length field.
    pub const fn new(header_size: usize, length: LengthField) -> Self {
        Self {
            header_size,
            length,
        }
    }

    /// Record of constant size.
    pub const fn fixed(size: usize) -> Self {
        Self {
            header_size: 0,
            length: LengthField::Fixed(size),
        }
    }

    /// Bytes needed before the declared length can be read.
    pub const fn min_len(&self) -> usize {
        let end = self.length.end();
        if end > self.header_size {
            end
        } else {
            self.header_size
        }
    }

    /// Declared length of the record starting at `record[0]`, or `None` if
    /// the header itself is truncated or malformed.
    pub fn declared_length(&self, record: &[u8]) -> Option<usize> {
        if record.len() < self.min_len() {
            return None;
        }
        match self.length {
            LengthField::Fixed(size) => Some(size),
            LengthField::Bits { field, unit, bias } => {
                Some(field.read(record) as usize * unit + bias)
            }
            LengthField::Synchsafe(offset) => {
                let bytes = record[offset..offset + 4].try_into().ok()?;
                synchsafe_decode(bytes)
            }
        }
    }

    /// Header plus declared length.
    pub fn occupied_length(&self, record: &[u8]) -> Option<usize> {
        self.declared_length(record)
            .map(|declared| self.header_size + declared)
    }

    /// True when the record's declared extent fits inside `record`.
    pub fn validate(&self, record: &[u8]) -> bool {
        self.occupied_length(record)
            .is_some_and(|occupied| occupied <= record.len())
    }

    /// The record's own bytes, trimmed to its occupied length.
    pub fn split<'a>(&self, record: &'a [u8]) -> Option<&'a [u8]> {
        let occupied = self.occupied_length(record)?;
        record.get(..occupied)
    }

    /// Write `declared` into the length field.
    pub fn set_declared_length(&self, record: &mut [u8], declared: usize) -> Result<()> {
        if record.len() < self.min_len() {
            return Err(FieldError::OutOfBounds {
                needed: self.min_len(),
                available: record.len(),
            });
        }
        match self.length {
            LengthField::Fixed(size) if size == declared => Ok(()),
            LengthField::Fixed(_) => Err(FieldError::LengthNotEncodable(declared)),
            LengthField::Bits { field, unit, bias } => {
                let counted = declared
                    .checked_sub(bias)
                    .filter(|counted| counted % unit == 0)
                    .ok_or(FieldError::LengthNotEncodable(declared))?;
                field
                    .set(record, (counted / unit) as u64)
                    .map_err(|_| FieldError::LengthNotEncodable(declared))
            }
            LengthField::Synchsafe(offset) => {
                let bytes =
                    synchsafe_encode(declared).ok_or(FieldError::LengthNotEncodable(declared))?;
                record[offset..offset + 4].copy_from_slice(&bytes);
                Ok(())
            }
        }
    }
}
