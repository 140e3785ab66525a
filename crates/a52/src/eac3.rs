//! Enhanced AC-3 sync frame header (A/52 Annex E, section E.1.2).

use bitfield::layout;

use crate::{A52_SYNCWORD, A52Error, EAC3_MAX_BSID, EAC3_MIN_BSID, Result, acmod_channels};

pub const EAC3_HEADER_SIZE: usize = 7;

/// Stream types carried in strmtyp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Independent,
    Dependent,
    /// AC-3 converted to the Annex E syntax.
    Converted,
    Reserved,
}

impl From<u8> for StreamType {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::Independent,
            1 => Self::Dependent,
            2 => Self::Converted,
            _ => Self::Reserved,
        }
    }
}

layout! {
    /// E-AC-3 sync frame header up to dialnorm.
    pub struct Eac3SyncFrame[EAC3_HEADER_SIZE] {
        syncword, set_syncword: u16 = (0, 0, 16);
        strmtyp, set_strmtyp: u8 = (2, 0, 2);
        substreamid, set_substreamid: u8 = (2, 2, 3);
        /// Frame size in 16-bit words, minus one.
        frmsiz, set_frmsiz: u16 = (2, 5, 11);
        fscod, set_fscod: u8 = (4, 0, 2);
        /// fscod2 when fscod is 3, numblkscod otherwise.
        numblkscod, set_numblkscod: u8 = (4, 2, 2);
        acmod, set_acmod: u8 = (4, 4, 3);
        lfeon, set_lfeon: bool = (4, 7, 1);
        bsid, set_bsid: u8 = (5, 0, 5);
        dialnorm, set_dialnorm: u8 = (5, 5, 5);
        compre, set_compre: bool = (6, 2, 1);
    }
}

impl<B: AsRef<[u8]>> Eac3SyncFrame<B> {
    /// Wrap `buf` after checking the syncword, sample rate and bsid.
    pub fn parse(buf: B) -> Result<Self> {
        let frame = Self::new(buf)?;
        if frame.syncword() != A52_SYNCWORD {
            return Err(A52Error::InvalidSyncword(frame.syncword()));
        }
        if frame.sample_rate().is_none() {
            return Err(A52Error::ReservedSampleRate);
        }
        if !(EAC3_MIN_BSID..=EAC3_MAX_BSID).contains(&frame.bsid()) {
            return Err(A52Error::UnsupportedBsid(frame.bsid()));
        }
        Ok(frame)
    }

    pub fn stream_type(&self) -> StreamType {
        self.strmtyp().into()
    }

    /// Reduced sample rate code, present only when fscod is 3.
    pub fn fscod2(&self) -> Option<u8> {
        (self.fscod() == 3).then(|| self.numblkscod())
    }

    pub fn sample_rate(&self) -> Option<u32> {
        match (self.fscod(), self.numblkscod()) {
            (0, _) => Some(48_000),
            (1, _) => Some(44_100),
            (2, _) => Some(32_000),
            (_, 0) => Some(24_000),
            (_, 1) => Some(22_050),
            (_, 2) => Some(16_000),
            _ => None,
        }
    }

    /// Audio blocks per frame; reduced sample rates always carry six.
    pub fn blocks(&self) -> u8 {
        if self.fscod() == 3 {
            return 6;
        }
        [1, 2, 3, 6][self.numblkscod() as usize]
    }

    /// Size of the whole sync frame in bytes.
    pub fn frame_size(&self) -> usize {
        (self.frmsiz() as usize + 1) * 2
    }

    pub fn channels(&self) -> u8 {
        acmod_channels(self.acmod()) + u8::from(self.lfeon())
    }

    pub fn frame(&self) -> Option<&[u8]> {
        self.as_bytes().get(..self.frame_size())
    }

    pub fn validate(&self) -> bool {
        self.syncword() == A52_SYNCWORD
            && self.sample_rate().is_some()
            && (EAC3_MIN_BSID..=EAC3_MAX_BSID).contains(&self.bsid())
            && self.stream_type() != StreamType::Reserved
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    // independent substream 0, 1536 bytes, 48 kHz, 6 blocks, 3/2 + LFE
    const HEADER: [u8; 7] = [0x0B, 0x77, 0x02, 0xFF, 0x3F, 0x80, 0x00];

    #[test]
    fn test_header_fields() {
        let frame = Eac3SyncFrame::parse(&HEADER[..]).unwrap();
        assert_eq!(frame.stream_type(), StreamType::Independent);
        assert_eq!(frame.substreamid(), 0);
        assert_eq!(frame.frmsiz(), 0x2FF);
        assert_eq!(frame.frame_size(), 1536);
        assert_eq!(frame.sample_rate(), Some(48_000));
        assert_eq!(frame.fscod2(), None);
        assert_eq!(frame.blocks(), 6);
        assert_eq!(frame.channels(), 6);
        assert_eq!(frame.bsid(), 16);
        assert!(frame.validate());
    }

    #[test]
    fn test_reduced_sample_rate() {
        let mut header = HEADER;
        let mut frame = Eac3SyncFrame::new(&mut header[..]).unwrap();
        frame.set_fscod(3);
        frame.set_numblkscod(1);
        assert_eq!(frame.fscod2(), Some(1));
        assert_eq!(frame.sample_rate(), Some(22_050));
        assert_eq!(frame.blocks(), 6);

        frame.set_numblkscod(3);
        assert_eq!(frame.sample_rate(), None);
        assert!(!frame.validate());
        assert_eq!(
            Eac3SyncFrame::parse(&header[..]).unwrap_err(),
            A52Error::ReservedSampleRate
        );
    }

    #[test]
    fn test_setters_share_bytes() {
        let mut header = HEADER;
        let mut frame = Eac3SyncFrame::new(&mut header[..]).unwrap();
        frame.set_strmtyp(1);
        frame.set_substreamid(5);
        assert_eq!(frame.frmsiz(), 0x2FF);
        frame.set_frmsiz(0x7FF);
        assert_eq!(frame.substreamid(), 5);
        assert_eq!(frame.stream_type(), StreamType::Dependent);
        assert_eq!(frame.frame_size(), 4096);
        frame.set_dialnorm(31);
        assert_eq!(frame.bsid(), 16);
        assert!(!frame.compre());
        assert_eq!(&header[2..7], &[0x6F, 0xFF, 0x3F, 0x87, 0xC0]);
    }

    #[test]
    fn test_rejects_ac3_bsid() {
        let mut header = HEADER;
        header[5] = 8 << 3;
        assert_eq!(
            Eac3SyncFrame::parse(&header[..]).unwrap_err(),
            A52Error::UnsupportedBsid(8)
        );
    }
}
