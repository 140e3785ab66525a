use crate::{FieldError, Result};

/// An unsigned big-endian field of `width` bits starting `bit` bits into
/// byte `offset` (bit 0 is the most significant bit of that byte).
///
/// Fields may straddle byte boundaries and share bytes with unrelated
/// fields; [`BitField::write`] only touches the bits the field owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitField {
    offset: usize,
    bit: u8,
    width: u8,
}

impl BitField {
    /// Declare a field. Panics at compile time when used in a const context
    /// with a bit position past 7 or a width outside `1..=64`.
    pub const fn new(offset: usize, bit: u8, width: u8) -> Self {
        assert!(bit < 8, "bit position must be within the first byte");
        assert!(width >= 1 && width <= 64, "field width must be 1..=64 bits");
        Self { offset, bit, width }
    }

    /// Single-bit field.
    pub const fn flag(offset: usize, bit: u8) -> Self {
        Self::new(offset, bit, 1)
    }

    /// Whole bytes, big-endian.
    pub const fn bytes(offset: usize, count: usize) -> Self {
        Self::new(offset, 0, (count * 8) as u8)
    }

    /// Byte offset of the first byte the field touches.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Bit position inside the first byte, counted from the MSB.
    pub const fn bit(&self) -> u8 {
        self.bit
    }

    /// Width in bits.
    pub const fn width(&self) -> u8 {
        self.width
    }

    /// Number of bytes the field spans.
    pub const fn byte_len(&self) -> usize {
        (self.bit as usize + self.width as usize).div_ceil(8)
    }

    /// One past the last byte the field touches.
    pub const fn end(&self) -> usize {
        self.offset + self.byte_len()
    }

    /// Largest value the field can hold.
    pub const fn max_value(&self) -> u64 {
        if self.width == 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }

    /// The same field moved `bytes` further into the buffer. Used for
    /// fields whose position depends on optional predecessors.
    pub const fn shifted(self, bytes: usize) -> Self {
        Self {
            offset: self.offset + bytes,
            ..self
        }
    }

    /// Whether a buffer of `len` bytes holds the whole field.
    pub const fn fits(&self, len: usize) -> bool {
        self.end() <= len
    }

    const fn shift(&self) -> u32 {
        (self.byte_len() * 8 - self.bit as usize - self.width as usize) as u32
    }

    fn load(bytes: &[u8]) -> u128 {
        bytes.iter().fold(0u128, |acc, &b| (acc << 8) | b as u128)
    }

    /// Read the field.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is shorter than [`BitField::end`]. Views check their
    /// length once at construction and use this afterwards.
    #[inline]
    pub fn read(&self, buf: &[u8]) -> u64 {
        let acc = Self::load(&buf[self.offset..self.end()]);
        ((acc >> self.shift()) as u64) & self.max_value()
    }

    /// Write the field, keeping every other bit of the touched bytes.
    /// Bits of `value` above the field width are discarded.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is shorter than [`BitField::end`].
    #[inline]
    pub fn write(&self, buf: &mut [u8], value: u64) {
        let end = self.end();
        let bytes = &mut buf[self.offset..end];
        let shift = self.shift();
        let mask = (self.max_value() as u128) << shift;
        let mut acc = Self::load(bytes);
        acc = (acc & !mask) | (((value & self.max_value()) as u128) << shift);
        for byte in bytes.iter_mut().rev() {
            *byte = acc as u8;
            acc >>= 8;
        }
    }

    /// Bounds-checked read.
    pub fn get(&self, buf: &[u8]) -> Result<u64> {
        self.check(buf.len())?;
        Ok(self.read(buf))
    }

    /// Bounds-checked write that also rejects values wider than the field.
    pub fn set(&self, buf: &mut [u8], value: u64) -> Result<()> {
        if value > self.max_value() {
            return Err(FieldError::ValueTooWide {
                value,
                width: self.width,
            });
        }
        self.check(buf.len())?;
        self.write(buf, value);
        Ok(())
    }

    fn check(&self, available: usize) -> Result<()> {
        if self.fits(available) {
            Ok(())
        } else {
            Err(FieldError::OutOfBounds {
                needed: self.end(),
                available,
            })
        }
    }
}

/// Conversion between raw field bits and the Rust type a view exposes.
pub trait FieldValue: Copy {
    /// Convert raw bits; the field width guarantees the value fits.
    fn from_bits(raw: u64) -> Self;
    /// Raw bits to store.
    fn into_bits(self) -> u64;
}

impl FieldValue for bool {
    #[inline]
    fn from_bits(raw: u64) -> Self {
        raw != 0
    }

    #[inline]
    fn into_bits(self) -> u64 {
        self as u64
    }
}

macro_rules! impl_field_value {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                #[inline]
                fn from_bits(raw: u64) -> Self {
                    raw as $ty
                }

                #[inline]
                fn into_bits(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_field_value!(u8, u16, u32, u64);
