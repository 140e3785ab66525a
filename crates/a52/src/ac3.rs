//! AC-3 sync information and the leading bit stream information fields
//! (A/52 section 5.4.1 and 5.4.2).

use bitfield::{BitField, layout};

use crate::crc::crc16;
use crate::{A52_SYNCWORD, A52Error, AC3_MAX_BSID, Result, acmod_channels};

/// Syncinfo (5 bytes) plus bsid, bsmod and acmod.
pub const AC3_HEADER_SIZE: usize = 7;

/// Nominal bit rates in kbit/s, indexed by `frmsizecod >> 1`.
pub(crate) const BIT_RATES: [u16; 19] = [
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 448, 512, 576, 640,
];

/// 16-bit words per sync frame at 44.1 kHz for even frmsizecod; odd codes
/// carry one more word.
const WORDS_44K: [u16; 19] = [
    69, 87, 104, 121, 139, 174, 208, 243, 278, 348, 417, 487, 557, 696, 835, 975, 1114, 1253, 1393,
];

layout! {
    /// AC-3 sync frame header.
    pub struct Ac3SyncFrame[AC3_HEADER_SIZE] {
        syncword, set_syncword: u16 = (0, 0, 16);
        crc1, set_crc1: u16 = (2, 0, 16);
        /// Sample rate code: 48, 44.1 or 32 kHz; 3 is reserved.
        fscod, set_fscod: u8 = (4, 0, 2);
        frmsizecod, set_frmsizecod: u8 = (4, 2, 6);
        bsid, set_bsid: u8 = (5, 0, 5);
        bsmod, set_bsmod: u8 = (5, 5, 3);
        acmod, set_acmod: u8 = (6, 0, 3);
    }
}

impl<B: AsRef<[u8]>> Ac3SyncFrame<B> {
    /// Wrap `buf` after checking the syncword, sample rate, frame size code
    /// and bsid.
    pub fn parse(buf: B) -> Result<Self> {
        let frame = Self::new(buf)?;
        if frame.syncword() != A52_SYNCWORD {
            return Err(A52Error::InvalidSyncword(frame.syncword()));
        }
        if frame.fscod() == 3 {
            return Err(A52Error::ReservedSampleRate);
        }
        if frame.frmsizecod() as usize >= BIT_RATES.len() * 2 {
            return Err(A52Error::InvalidFrameSizeCode(frame.frmsizecod()));
        }
        if frame.bsid() > AC3_MAX_BSID {
            return Err(A52Error::UnsupportedBsid(frame.bsid()));
        }
        Ok(frame)
    }

    pub fn sample_rate(&self) -> Option<u32> {
        match self.fscod() {
            0 => Some(48_000),
            1 => Some(44_100),
            2 => Some(32_000),
            _ => None,
        }
    }

    /// Nominal bit rate in kbit/s.
    pub fn bit_rate(&self) -> Option<u16> {
        BIT_RATES.get(self.frmsizecod() as usize >> 1).copied()
    }

    /// Size of the whole sync frame in bytes, from fscod and frmsizecod.
    pub fn frame_size(&self) -> Option<usize> {
        let code = self.frmsizecod() as usize;
        let rate = *BIT_RATES.get(code >> 1)? as usize;
        let words = match self.fscod() {
            0 => rate * 2,
            1 => WORDS_44K[code >> 1] as usize + (code & 1),
            2 => rate * 3,
            _ => return None,
        };
        Some(words * 2)
    }

    /// lfeon, whose position depends on which mix level fields acmod
    /// brings in. `None` when the buffer ends first.
    pub fn lfeon(&self) -> Option<bool> {
        let acmod = self.acmod();
        let mut bit = 6 * 8 + 3;
        if acmod & 1 != 0 && acmod != 1 {
            bit += 2; // cmixlev
        }
        if acmod & 4 != 0 {
            bit += 2; // surmixlev
        }
        if acmod == 2 {
            bit += 2; // dsurmod
        }
        BitField::flag(bit / 8, (bit % 8) as u8)
            .get(self.as_bytes())
            .ok()
            .map(|value| value != 0)
    }

    /// Full-bandwidth channels plus the LFE channel when present.
    pub fn channels(&self) -> u8 {
        acmod_channels(self.acmod()) + u8::from(self.lfeon().unwrap_or(false))
    }

    /// The complete sync frame, `None` when the buffer is shorter than the
    /// size the header announces.
    pub fn frame(&self) -> Option<&[u8]> {
        self.as_bytes().get(..self.frame_size()?)
    }

    /// Header fields are legal. Does not require the whole frame.
    pub fn validate(&self) -> bool {
        self.syncword() == A52_SYNCWORD
            && self.frame_size().is_some()
            && self.bsid() <= AC3_MAX_BSID
    }

    /// crc2 closes the frame: the CRC over everything after the syncword
    /// must be zero.
    pub fn check_crc2(&self) -> bool {
        self.frame().is_some_and(|frame| crc16(&frame[2..]) == 0)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Ac3SyncFrame<B> {
    /// Recompute crc2 into the last two bytes of the frame.
    pub fn set_crc2(&mut self) -> Result<()> {
        let size = self.frame_size().ok_or(A52Error::ReservedSampleRate)?;
        let available = self.as_bytes().len();
        if available < size {
            return Err(bitfield::FieldError::OutOfBounds {
                needed: size,
                available,
            }
            .into());
        }
        let frame = &mut self.as_bytes_mut()[..size];
        let crc = crc16(&frame[2..size - 2]);
        frame[size - 2..].copy_from_slice(&crc.to_be_bytes());
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // 48 kHz, 448 kbit/s, bsid 8, 3/2 with LFE
    const HEADER: [u8; 7] = [0x0B, 0x77, 0x00, 0x00, 0x1E, 0x40, 0xE1];

    #[test]
    fn test_header_fields() {
        let frame = Ac3SyncFrame::parse(&HEADER[..]).unwrap();
        assert_eq!(frame.sample_rate(), Some(48_000));
        assert_eq!(frame.bit_rate(), Some(448));
        assert_eq!(frame.frame_size(), Some(1792));
        assert_eq!(frame.bsid(), 8);
        assert_eq!(frame.bsmod(), 0);
        assert_eq!(frame.acmod(), 7);
        assert_eq!(frame.lfeon(), Some(true));
        assert_eq!(frame.channels(), 6);
        assert!(frame.validate());
        assert!(frame.frame().is_none());
    }

    #[test]
    fn test_frame_sizes() {
        let mut header = HEADER;
        // 44.1 kHz, odd code adds one word
        header[4] = 0x5F;
        let frame = Ac3SyncFrame::new(&header[..]).unwrap();
        assert_eq!(frame.frame_size(), Some(1952));

        header[4] = 0x80; // 32 kHz, 32 kbit/s
        assert_eq!(Ac3SyncFrame::new(&header[..]).unwrap().frame_size(), Some(192));

        header[4] = 0x26; // 48 kHz, frmsizecod 38
        assert_eq!(Ac3SyncFrame::new(&header[..]).unwrap().frame_size(), None);
        assert_eq!(
            Ac3SyncFrame::parse(&header[..]).unwrap_err(),
            A52Error::InvalidFrameSizeCode(38)
        );
    }

    #[test]
    fn test_parse_rejects() {
        let mut header = HEADER;
        header[0] = 0x0C;
        assert_eq!(
            Ac3SyncFrame::parse(&header[..]).unwrap_err(),
            A52Error::InvalidSyncword(0x0C77)
        );

        let mut header = HEADER;
        header[4] = 0xDC;
        assert_eq!(
            Ac3SyncFrame::parse(&header[..]).unwrap_err(),
            A52Error::ReservedSampleRate
        );

        let mut header = HEADER;
        header[5] = 16 << 3;
        assert_eq!(
            Ac3SyncFrame::parse(&header[..]).unwrap_err(),
            A52Error::UnsupportedBsid(16)
        );

        assert!(matches!(
            Ac3SyncFrame::parse(&HEADER[..5]),
            Err(A52Error::Field(_))
        ));
    }

    #[test]
    fn test_lfeon_position() {
        // 2/0: dsurmod only
        let frame = Ac3SyncFrame::new(&[0x0B, 0x77, 0, 0, 0x1C, 0x40, 0b010_00_1_00][..]).unwrap();
        assert_eq!(frame.lfeon(), Some(true));
        // 1/0: no mix levels
        let frame = Ac3SyncFrame::new(&[0x0B, 0x77, 0, 0, 0x1C, 0x40, 0b001_1_0000][..]).unwrap();
        assert_eq!(frame.lfeon(), Some(true));
        assert_eq!(frame.channels(), 2);
        // 3/2, flag clear
        let frame = Ac3SyncFrame::new(&[0x0B, 0x77, 0, 0, 0x1C, 0x40, 0xE0][..]).unwrap();
        assert_eq!(frame.lfeon(), Some(false));
    }

    #[test]
    fn test_crc2() {
        let mut bytes = vec![0u8; 192];
        bytes[..7].copy_from_slice(&[0x0B, 0x77, 0, 0, 0x80, 0x40, 0x40]);
        bytes[100] = 0x5A;
        let mut frame = Ac3SyncFrame::parse(&mut bytes[..]).unwrap();
        assert!(!frame.check_crc2());
        frame.set_crc2().unwrap();
        assert!(frame.check_crc2());

        bytes[50] ^= 1;
        assert!(!Ac3SyncFrame::new(&bytes[..]).unwrap().check_crc2());
    }

    proptest! {
        #[test]
        fn prop_bsid_set_keeps_bsmod(bsid in 0u8..32, bsmod in 0u8..8) {
            let mut header = HEADER;
            let mut frame = Ac3SyncFrame::new(&mut header[..]).unwrap();
            frame.set_bsmod(bsmod);
            frame.set_bsid(bsid);
            prop_assert_eq!(frame.bsid(), bsid);
            prop_assert_eq!(frame.bsmod(), bsmod);
            prop_assert_eq!(frame.frmsizecod(), 0x1E);
        }
    }
}
