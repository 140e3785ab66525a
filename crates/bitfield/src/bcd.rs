//! Binary-coded decimal: one decimal digit per nibble, most significant
//! digit first.

use crate::{BitField, FieldError, Result};

/// Decode `digits` BCD nibbles from the low bits of `raw`.
///
/// Returns `None` if a nibble is above 9.
pub fn decode(raw: u64, digits: u32) -> Option<u64> {
    let mut value = 0u64;
    for i in (0..digits).rev() {
        let digit = (raw >> (i * 4)) & 0x0F;
        if digit > 9 {
            return None;
        }
        value = value * 10 + digit;
    }
    Some(value)
}

/// Encode `value` as `digits` BCD nibbles.
///
/// Returns `None` if the value has more decimal digits than requested.
pub fn encode(mut value: u64, digits: u32) -> Option<u64> {
    let mut raw = 0u64;
    for i in 0..digits {
        raw |= (value % 10) << (i * 4);
        value /= 10;
    }
    (value == 0).then_some(raw)
}

/// Decode a single BCD byte such as the hour of a DVB UTC time.
pub fn decode_byte(byte: u8) -> Option<u8> {
    decode(byte as u64, 2).map(|v| v as u8)
}

/// Encode `value` (0..=99) as a single BCD byte.
pub fn encode_byte(value: u8) -> Option<u8> {
    encode(value as u64, 2).map(|v| v as u8)
}

/// A [`BitField`] whose contents are BCD digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcdField {
    field: BitField,
}

impl BcdField {
    /// `digits` nibbles starting at the given position.
    pub const fn new(offset: usize, bit: u8, digits: u8) -> Self {
        Self {
            field: BitField::new(offset, bit, digits * 4),
        }
    }

    /// Number of decimal digits.
    pub const fn digits(&self) -> u32 {
        self.field.width() as u32 / 4
    }

    /// Underlying raw field.
    pub const fn raw(&self) -> BitField {
        self.field
    }

    /// Bounds-checked decimal read.
    pub fn get(&self, buf: &[u8]) -> Result<u64> {
        let raw = self.field.get(buf)?;
        decode(raw, self.digits()).ok_or(FieldError::InvalidBcd(raw))
    }

    /// Bounds-checked decimal write.
    pub fn set(&self, buf: &mut [u8], value: u64) -> Result<()> {
        let raw = encode(value, self.digits()).ok_or(FieldError::ValueTooWide {
            value,
            width: self.field.width(),
        })?;
        self.field.set(buf, raw)
    }
}
