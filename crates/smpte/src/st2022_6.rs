//! SMPTE ST 2022-6 high bit rate media transport (HBRMT) payload header.

use bitfield::{GatedLayout, layout};

use crate::{Result, SmpteError};

pub const HBRMT_HEADER_SIZE: usize = 8;
pub const HBRMT_TIMESTAMP_SIZE: usize = 4;
/// Bytes of SDI data in every datagram.
pub const HBRMT_DATA_SIZE: usize = 1376;

const TIMESTAMP: usize = 0;
const EXTENSION: usize = 1;

layout! {
    /// HBRMT payload header.
    pub struct HbrmtHeader[HBRMT_HEADER_SIZE] {
        /// Header extension length in 32-bit words.
        ext, set_ext: u8 = (0, 0, 4);
        /// Video source format fields are present.
        f, set_f: bool = (0, 4, 1);
        /// Video source ID: 0 primary, 1 protect.
        vsid, set_vsid: u8 = (0, 5, 3);
        /// Frame counter, modulo 256.
        frcount, set_frcount: u8 = (1, 0, 8);
        /// Reference for time stamp.
        r, set_r: u8 = (2, 0, 2);
        /// Video payload scrambling.
        s, set_s: u8 = (2, 2, 2);
        fec, set_fec: u8 = (2, 4, 3);
        /// Clock frequency of the video timestamp, 0 when absent.
        cf, set_cf: u8 = (2, 7, 4);
        reserve, set_reserve: u8 = (3, 3, 5);
        map, set_map: u8 = (4, 0, 4);
        frame, set_frame: u8 = (4, 4, 8);
        frate, set_frate: u8 = (5, 4, 8);
        sample, set_sample: u8 = (6, 4, 4);
        fmt_reserve, set_fmt_reserve: u8 = (7, 0, 8);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockFrequency {
    None,
    Mhz27,
    Mhz148_5,
    Mhz148_5Over1001,
    Mhz297,
    Mhz297Over1001,
    Reserved(u8),
}

impl From<u8> for ClockFrequency {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Mhz27,
            2 => Self::Mhz148_5,
            3 => Self::Mhz148_5Over1001,
            4 => Self::Mhz297,
            5 => Self::Mhz297Over1001,
            other => Self::Reserved(other),
        }
    }
}

impl<B: AsRef<[u8]>> HbrmtHeader<B> {
    pub fn clock_frequency(&self) -> ClockFrequency {
        ClockFrequency::from(self.cf())
    }

    fn resolve(&self) -> GatedLayout<2> {
        GatedLayout::resolve(
            HBRMT_HEADER_SIZE,
            [
                (self.cf() != 0, HBRMT_TIMESTAMP_SIZE),
                (true, self.ext() as usize * 4),
            ],
        )
    }

    /// Fixed header, timestamp and extension words.
    pub fn header_len(&self) -> usize {
        self.resolve().end()
    }

    pub fn video_timestamp(&self) -> Option<u32> {
        self.resolve()
            .slice(self.as_bytes(), TIMESTAMP, HBRMT_TIMESTAMP_SIZE)
            .map(|ts| u32::from_be_bytes([ts[0], ts[1], ts[2], ts[3]]))
    }

    /// Header extension words, empty when `ext` is zero.
    pub fn extension(&self) -> Option<&[u8]> {
        self.resolve()
            .slice(self.as_bytes(), EXTENSION, self.ext() as usize * 4)
    }

    /// SDI data following the header.
    pub fn payload(&self) -> Option<&[u8]> {
        self.as_bytes().get(self.header_len()..)
    }

    /// Known video source ID, FEC mode and clock frequency, and exactly
    /// [`HBRMT_DATA_SIZE`] bytes of data after the header.
    pub fn validate(&self) -> bool {
        self.vsid() <= 1
            && self.fec() <= 2
            && !matches!(self.clock_frequency(), ClockFrequency::Reserved(_))
            && self.payload().map(<[u8]>::len) == Some(HBRMT_DATA_SIZE)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> HbrmtHeader<B> {
    /// Store the video timestamp, which needs a non-zero clock frequency.
    pub fn set_video_timestamp(&mut self, timestamp: u32) -> Result<()> {
        let layout = self.resolve();
        let offset = layout
            .offset(TIMESTAMP)
            .ok_or(SmpteError::InvalidLength(0))?;
        let available = self.as_bytes().len();
        let slot = self
            .as_bytes_mut()
            .get_mut(offset..offset + HBRMT_TIMESTAMP_SIZE)
            .ok_or(SmpteError::Overrun {
                needed: offset + HBRMT_TIMESTAMP_SIZE,
                available,
            })?;
        slot.copy_from_slice(&timestamp.to_be_bytes());
        Ok(())
    }
}
