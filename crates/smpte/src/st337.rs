//! SMPTE ST 337 non-PCM data burst preamble, 16-bit mode.
//!
//! A burst starts with four 16-bit words: the sync words Pa and Pb, the
//! burst information Pc and the burst length Pd in bits. Data types follow
//! SMPTE ST 338.

use bitfield::layout;
use memchr::memmem;

use crate::{Result, SmpteError};

pub const S337_PA: u16 = 0xF872;
pub const S337_PB: u16 = 0x4E1F;
pub const S337_PREAMBLE_SIZE: usize = 8;

const SYNC: [u8; 4] = [0xF8, 0x72, 0x4E, 0x1F];

layout! {
    /// Burst preamble Pa, Pb, Pc and Pd.
    pub struct BurstPreamble[S337_PREAMBLE_SIZE] {
        pa, set_pa: u16 = (0, 0, 16);
        pb, set_pb: u16 = (2, 0, 16);
        /// Pc bits 13..=15.
        data_stream_number, set_data_stream_number: u8 = (4, 0, 3);
        /// Pc bits 8..=12.
        data_type_dependent, set_data_type_dependent: u8 = (4, 3, 5);
        /// Pc bit 7.
        error_flag, set_error_flag: bool = (5, 0, 1);
        /// Pc bits 5..=6.
        data_mode, set_data_mode: u8 = (5, 1, 2);
        /// Pc bits 0..=4.
        data_type_code, set_data_type_code: u8 = (5, 3, 5);
        /// Pd: burst payload length in bits.
        length_bits, set_length_bits: u16 = (6, 0, 16);
    }
}

/// Payload carried by a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Null,
    Ac3,
    TimeStamp,
    Pause,
    Mpeg1Layer1,
    /// MPEG-1 layer 2 or 3, or MPEG-2 without extension.
    Mpeg1Layer23,
    Mpeg2Extension,
    Mpeg2Aac,
    Mpeg2Layer1LowSampleRate,
    Mpeg2Layer23LowSampleRate,
    Eac3,
    Utility,
    Klv,
    DolbyE,
    Captioning,
    UserDefined,
    Extended,
    Reserved(u8),
}

impl From<u8> for DataType {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Null,
            1 => Self::Ac3,
            2 => Self::TimeStamp,
            3 => Self::Pause,
            4 => Self::Mpeg1Layer1,
            5 => Self::Mpeg1Layer23,
            6 => Self::Mpeg2Extension,
            7 => Self::Mpeg2Aac,
            8 => Self::Mpeg2Layer1LowSampleRate,
            9 => Self::Mpeg2Layer23LowSampleRate,
            16 => Self::Eac3,
            26 => Self::Utility,
            27 => Self::Klv,
            28 => Self::DolbyE,
            29 => Self::Captioning,
            30 => Self::UserDefined,
            31 => Self::Extended,
            other => Self::Reserved(other),
        }
    }
}

/// Sample width of the carrying AES3 channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Bits16,
    Bits20,
    Bits24,
    Reserved,
}

impl From<u8> for DataMode {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Bits16,
            1 => Self::Bits20,
            2 => Self::Bits24,
            _ => Self::Reserved,
        }
    }
}

/// Offset of the first 16-bit aligned preamble in `data`.
pub fn find_preamble(data: &[u8]) -> Option<usize> {
    memmem::find_iter(data, &SYNC).find(|offset| offset % 2 == 0)
}

impl<B: AsRef<[u8]>> BurstPreamble<B> {
    /// Wrap `buf` after checking the sync words, 16-bit mode and that the
    /// payload fits.
    pub fn parse(buf: B) -> Result<Self> {
        let burst = Self::new(buf)?;
        let sync = ((burst.pa() as u32) << 16) | burst.pb() as u32;
        if burst.pa() != S337_PA || burst.pb() != S337_PB {
            return Err(SmpteError::InvalidSync(sync));
        }
        if burst.data_mode() != 0 {
            return Err(SmpteError::UnsupportedDataMode(burst.data_mode()));
        }
        let needed = burst.burst_len();
        let available = burst.as_bytes().len();
        if needed > available {
            return Err(SmpteError::Overrun { needed, available });
        }
        Ok(burst)
    }

    pub fn data_type(&self) -> DataType {
        DataType::from(self.data_type_code())
    }

    pub fn mode(&self) -> DataMode {
        DataMode::from(self.data_mode())
    }

    /// Pd rounded up to whole bytes.
    pub fn payload_len(&self) -> usize {
        (self.length_bits() as usize).div_ceil(8)
    }

    /// Preamble and payload.
    pub fn burst_len(&self) -> usize {
        S337_PREAMBLE_SIZE + self.payload_len()
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.as_bytes().get(S337_PREAMBLE_SIZE..self.burst_len())
    }

    /// Sync words match, 16-bit mode, and the payload fits.
    pub fn validate(&self) -> bool {
        self.pa() == S337_PA
            && self.pb() == S337_PB
            && self.mode() == DataMode::Bits16
            && self.burst_len() <= self.as_bytes().len()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BurstPreamble<B> {
    /// Sync words, a 16-bit mode burst of `data_type` carrying
    /// `length_bits` bits, stream 0 and no error.
    pub fn init(&mut self, data_type: u8, length_bits: u16) {
        self.set_pa(S337_PA);
        self.set_pb(S337_PB);
        self.as_bytes_mut()[4..6].fill(0);
        self.set_data_type_code(data_type);
        self.set_length_bits(length_bits);
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    fn burst() -> Vec<u8> {
        let mut bytes = vec![0xF8, 0x72, 0x4E, 0x1F, 0x21, 0x01, 0x00, 0x3C];
        bytes.extend_from_slice(&[0x0B, 0x77, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        bytes
    }

    #[test]
    fn test_fields() {
        let bytes = burst();
        let preamble = BurstPreamble::parse(&bytes[..]).unwrap();
        assert_eq!(preamble.data_stream_number(), 1);
        assert_eq!(preamble.data_type_dependent(), 1);
        assert!(!preamble.error_flag());
        assert_eq!(preamble.mode(), DataMode::Bits16);
        assert_eq!(preamble.data_type(), DataType::Ac3);
        assert_eq!(preamble.length_bits(), 60);
        assert_eq!(preamble.payload_len(), 8);
        assert_eq!(preamble.payload().map(|p| &p[..2]), Some(&[0x0B, 0x77][..]));
        assert!(preamble.validate());
    }

    #[test]
    fn test_rejects() {
        let mut bytes = burst();
        bytes[3] = 0x1E;
        assert_eq!(
            BurstPreamble::parse(&bytes[..]).unwrap_err(),
            SmpteError::InvalidSync(0xF872_4E1E)
        );

        let mut bytes = burst();
        bytes[5] = 0x21;
        assert_eq!(
            BurstPreamble::parse(&bytes[..]).unwrap_err(),
            SmpteError::UnsupportedDataMode(1)
        );

        let bytes = burst();
        assert_eq!(
            BurstPreamble::parse(&bytes[..15]).unwrap_err(),
            SmpteError::Overrun {
                needed: 16,
                available: 15
            }
        );
        assert!(!BurstPreamble::new(&bytes[..15]).unwrap().validate());
    }

    #[test]
    fn test_find_preamble_is_aligned() {
        let mut data = vec![0x00, 0xF8, 0x72, 0x4E, 0x1F, 0x00];
        assert_eq!(find_preamble(&data), None);
        data.extend_from_slice(&burst());
        assert_eq!(find_preamble(&data), Some(6));
    }

    #[test]
    fn test_init() {
        let mut bytes = [0xFFu8; 8];
        let mut preamble = BurstPreamble::new(&mut bytes[..]).unwrap();
        preamble.init(28, 0x1000);
        assert_eq!(preamble.data_type(), DataType::DolbyE);
        assert_eq!(bytes, [0xF8, 0x72, 0x4E, 0x1F, 0x00, 0x1C, 0x10, 0x00]);
        assert_eq!(DataType::from(12), DataType::Reserved(12));
    }
}
