use bitfield::{BitField, LengthField, RecordLayout, layout};

/// Program Clock Reference: 33-bit base at 90 kHz plus 9-bit extension at
/// 27 MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pcr {
    pub base: u64,
    pub extension: u16,
}

impl Pcr {
    /// Encoded size in bytes.
    pub const SIZE: usize = 6;

    const BASE: BitField = BitField::new(0, 0, 33);
    const RESERVED: BitField = BitField::new(4, 1, 6);
    const EXTENSION: BitField = BitField::new(4, 7, 9);

    /// Decode from `[base32..25][base24..17][base16..9][base8..1][base0|reserved|ext8][ext7..0]`.
    pub fn read(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        Some(Pcr {
            base: Self::BASE.read(data),
            extension: Self::EXTENSION.read(data) as u16,
        })
    }

    /// Encode into the first six bytes of `data`, reserved bits set.
    pub fn write(&self, data: &mut [u8]) -> Option<()> {
        if data.len() < Self::SIZE {
            return None;
        }
        Self::BASE.write(data, self.base);
        Self::RESERVED.write(data, 0x3F);
        Self::EXTENSION.write(data, self.extension as u64);
        Some(())
    }

    /// Full value at 27 MHz.
    pub fn as_27mhz(&self) -> u64 {
        self.base * 300 + self.extension as u64
    }

    /// Split a 27 MHz value into base and extension.
    pub fn from_27mhz(ticks: u64) -> Self {
        Pcr {
            base: (ticks / 300) & 0x1_FFFF_FFFF,
            extension: (ticks % 300) as u16,
        }
    }

    pub fn as_seconds(&self) -> f64 {
        self.as_27mhz() as f64 / 27_000_000.0
    }
}

/// The adaptation field is a record whose length byte counts the bytes
/// after it.
pub const ADAPTATION_FIELD_RECORD: RecordLayout =
    RecordLayout::new(1, LengthField::bits(BitField::bytes(0, 1)));

layout! {
    /// Adaptation field starting at its length byte (ISO/IEC 13818-1 2.4.3.4).
    ///
    /// A zero-length adaptation field has no flags byte; it is not wrapped.
    pub struct AdaptationField[2] {
        length, set_length: u8 = (0, 0, 8);
        discontinuity, set_discontinuity: bool = (1, 0, 1);
        random_access, set_random_access: bool = (1, 1, 1);
        es_priority, set_es_priority: bool = (1, 2, 1);
        pcr_flag, set_pcr_flag: bool = (1, 3, 1);
        opcr_flag, set_opcr_flag: bool = (1, 4, 1);
        splicing_point_flag, set_splicing_point_flag: bool = (1, 5, 1);
        private_data_flag, set_private_data_flag: bool = (1, 6, 1);
        extension_flag, set_extension_flag: bool = (1, 7, 1);
    }
}

/// Offsets of the optional adaptation fields, resolved once from the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdaptationLayout {
    pub pcr: Option<usize>,
    pub opcr: Option<usize>,
    pub splice_countdown: Option<usize>,
    pub private_data: Option<usize>,
    pub extension: Option<usize>,
    /// One past the last optional field.
    pub end: usize,
}

impl<B: AsRef<[u8]>> AdaptationField<B> {
    /// Bytes covered by the length byte, itself included.
    pub fn occupied_length(&self) -> usize {
        1 + self.length() as usize
    }

    /// Where each present optional field starts. Fields behind a
    /// truncated length-prefixed field are reported as absent.
    pub fn resolve(&self) -> AdaptationLayout {
        let data = self.as_bytes();
        let mut layout = AdaptationLayout::default();
        let mut pos = 2;
        if self.pcr_flag() {
            layout.pcr = Some(pos);
            pos += Pcr::SIZE;
        }
        if self.opcr_flag() {
            layout.opcr = Some(pos);
            pos += Pcr::SIZE;
        }
        if self.splicing_point_flag() {
            layout.splice_countdown = Some(pos);
            pos += 1;
        }
        if self.private_data_flag() {
            layout.private_data = Some(pos);
            match data.get(pos) {
                Some(&len) => pos += 1 + len as usize,
                None => {
                    layout.end = pos + 1;
                    return layout;
                }
            }
        }
        if self.extension_flag() {
            layout.extension = Some(pos);
            match data.get(pos) {
                Some(&len) => pos += 1 + len as usize,
                None => pos += 1,
            }
        }
        layout.end = pos;
        layout
    }

    /// The declared length fits the buffer and the optional fields fit the
    /// declared length.
    pub fn validate(&self) -> bool {
        ADAPTATION_FIELD_RECORD.validate(self.as_bytes())
            && self.resolve().end <= self.occupied_length()
    }

    fn within(&self, offset: usize, size: usize) -> Option<&[u8]> {
        let end = offset + size;
        if end > self.occupied_length() {
            return None;
        }
        self.as_bytes().get(offset..end)
    }

    pub fn pcr(&self) -> Option<Pcr> {
        let offset = self.resolve().pcr?;
        Pcr::read(self.within(offset, Pcr::SIZE)?)
    }

    pub fn opcr(&self) -> Option<Pcr> {
        let offset = self.resolve().opcr?;
        Pcr::read(self.within(offset, Pcr::SIZE)?)
    }

    pub fn splice_countdown(&self) -> Option<i8> {
        let offset = self.resolve().splice_countdown?;
        self.within(offset, 1).map(|b| b[0] as i8)
    }

    pub fn private_data(&self) -> Option<&[u8]> {
        let offset = self.resolve().private_data?;
        let len = *self.within(offset, 1)?.first()? as usize;
        self.within(offset + 1, len)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> AdaptationField<B> {
    /// Write the PCR. The PCR flag must already be set and the field must
    /// fit the declared length.
    pub fn write_pcr(&mut self, pcr: Pcr) -> Option<()> {
        let offset = self.resolve().pcr?;
        if offset + Pcr::SIZE > self.occupied_length() {
            return None;
        }
        pcr.write(self.as_bytes_mut().get_mut(offset..)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // base = 90000 (one second), extension = 0
    const PCR_ONE_SECOND: [u8; 6] = [0x00, 0x00, 0xAF, 0xC8, 0x7E, 0x00];

    #[test]
    fn test_pcr_read() {
        let pcr = Pcr::read(&PCR_ONE_SECOND).unwrap();
        assert_eq!(pcr.base, 90_000);
        assert_eq!(pcr.extension, 0);
        assert!((pcr.as_seconds() - 1.0).abs() < 1e-9);

        let max = Pcr::read(&[0xFF; 6]).unwrap();
        assert_eq!(max.base, 0x1_FFFF_FFFF);
        assert_eq!(max.extension, 0x1FF);
        assert!(Pcr::read(&[0; 5]).is_none());
    }

    #[test]
    fn test_pcr_write_sets_reserved_bits() {
        let mut buf = [0u8; 6];
        Pcr {
            base: 90_000,
            extension: 0,
        }
        .write(&mut buf)
        .unwrap();
        assert_eq!(buf, PCR_ONE_SECOND);

        let pcr = Pcr::from_27mhz(27_000_000 + 299);
        assert_eq!(pcr.base, 90_000);
        assert_eq!(pcr.extension, 299);
        pcr.write(&mut buf).unwrap();
        assert_eq!(Pcr::read(&buf), Some(pcr));
    }

    #[test]
    fn test_flags_only() {
        let data = [0x01, 0x40];
        let af = AdaptationField::new(&data[..]).unwrap();
        assert!(af.random_access());
        assert!(!af.discontinuity());
        assert!(af.pcr().is_none());
        assert!(af.validate());
        assert_eq!(af.resolve().end, 2);
    }

    #[test]
    fn test_pcr_field() {
        let mut data = vec![0x07, 0x10];
        data.extend_from_slice(&PCR_ONE_SECOND);
        let af = AdaptationField::new(&data[..]).unwrap();
        assert!(af.validate());
        assert_eq!(af.pcr().unwrap().base, 90_000);
    }

    #[test]
    fn test_gated_offsets() {
        // PCR absent, OPCR present: OPCR moves up to offset 2
        let mut data = vec![0x08, 0x0C];
        data.extend_from_slice(&PCR_ONE_SECOND);
        data.push(0xFE);
        let af = AdaptationField::new(&data[..]).unwrap();
        let layout = af.resolve();
        assert_eq!(layout.pcr, None);
        assert_eq!(layout.opcr, Some(2));
        assert_eq!(layout.splice_countdown, Some(8));
        assert_eq!(af.opcr().unwrap().base, 90_000);
        assert_eq!(af.splice_countdown(), Some(-2));
        assert!(af.validate());
    }

    #[test]
    fn test_private_data() {
        let data = [0x05, 0x02, 0x03, 0xDE, 0xAD, 0xBE];
        let af = AdaptationField::new(&data[..]).unwrap();
        assert_eq!(af.private_data(), Some(&[0xDE, 0xAD, 0xBE][..]));
        assert!(af.validate());

        // private data length runs past the declared length
        let data = [0x03, 0x02, 0x03, 0xDE, 0xAD, 0xBE];
        let af = AdaptationField::new(&data[..]).unwrap();
        assert_eq!(af.private_data(), None);
        assert!(!af.validate());
    }

    #[test]
    fn test_write_pcr() {
        let mut data = [0x07, 0x10, 0, 0, 0, 0, 0, 0];
        let mut af = AdaptationField::new(&mut data[..]).unwrap();
        af.write_pcr(Pcr {
            base: 90_000,
            extension: 0,
        })
        .unwrap();
        assert_eq!(&data[2..], &PCR_ONE_SECOND);

        let mut data = [0x01, 0x00];
        let mut af = AdaptationField::new(&mut data[..]).unwrap();
        assert!(af.write_pcr(Pcr::default()).is_none());
    }
}
