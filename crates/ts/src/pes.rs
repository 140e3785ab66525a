use bitfield::{BitField, layout};

use crate::{Result, TsError};

/// Video stream ID range (0xE0..=0xEF)
pub const STREAM_ID_VIDEO_MIN: u8 = 0xE0;
/// Video stream ID range (0xE0..=0xEF)
pub const STREAM_ID_VIDEO_MAX: u8 = 0xEF;
/// Audio stream ID range (0xC0..=0xDF)
pub const STREAM_ID_AUDIO_MIN: u8 = 0xC0;
/// Audio stream ID range (0xC0..=0xDF)
pub const STREAM_ID_AUDIO_MAX: u8 = 0xDF;
/// Private stream 1
pub const STREAM_ID_PRIVATE_1: u8 = 0xBD;
/// Private stream 2
pub const STREAM_ID_PRIVATE_2: u8 = 0xBF;
/// Padding stream
pub const STREAM_ID_PADDING: u8 = 0xBE;

pub const PES_HEADER_SIZE: usize = 6;
/// Header size including the optional-header flags and length bytes.
pub const PES_HEADER_SIZE_OPTIONAL: usize = 9;
pub const PES_TIMESTAMP_SIZE: usize = 5;

const MARKER_BITS: BitField = BitField::new(6, 0, 2);
const SCRAMBLING: BitField = BitField::new(6, 2, 2);
const DATA_ALIGNMENT: BitField = BitField::flag(6, 5);
const PTS_DTS_FLAGS: BitField = BitField::new(7, 0, 2);
const HEADER_DATA_LENGTH: BitField = BitField::bytes(8, 1);

/// Timestamp pieces inside its 5-byte slot.
const TS_PREFIX: BitField = BitField::new(0, 0, 4);
const TS_HIGH: BitField = BitField::new(0, 4, 3);
const TS_MID: BitField = BitField::new(1, 0, 15);
const TS_LOW: BitField = BitField::new(3, 0, 15);
const TS_MARKERS: [BitField; 3] = [
    BitField::flag(0, 7),
    BitField::flag(2, 7),
    BitField::flag(4, 7),
];

/// Whether a stream_id carries the optional PES header (ISO/IEC 13818-1
/// Table 2-18).
pub fn has_optional_header(stream_id: u8) -> bool {
    !matches!(
        stream_id,
        0xBC   // program_stream_map
        | 0xBE // padding_stream
        | 0xBF // private_stream_2
        | 0xF0 // ECM_stream
        | 0xF1 // EMM_stream
        | 0xFF // program_stream_directory
        | 0xF2 // DSMCC_stream
        | 0xF8 // ITU-T Rec. H.222.1 type E
    )
}

fn read_timestamp(slot: &[u8]) -> u64 {
    (TS_HIGH.read(slot) << 30) | (TS_MID.read(slot) << 15) | TS_LOW.read(slot)
}

fn write_timestamp(slot: &mut [u8], prefix: u8, ts: u64) {
    TS_PREFIX.write(slot, prefix as u64);
    TS_HIGH.write(slot, ts >> 30);
    TS_MID.write(slot, ts >> 15);
    TS_LOW.write(slot, ts);
    for marker in TS_MARKERS {
        marker.write(slot, 1);
    }
}

fn timestamp_markers_ok(slot: &[u8]) -> bool {
    TS_MARKERS.iter().all(|marker| marker.read(slot) == 1)
}

layout! {
    /// PES packet header (ISO/IEC 13818-1 2.4.3.6).
    pub struct PesHeader[PES_HEADER_SIZE] {
        start_code, set_start_code: u32 = (0, 0, 24);
        stream_id, set_stream_id: u8 = (3, 0, 8);
        packet_length, set_packet_length: u16 = (4, 0, 16);
    }
}

impl<B: AsRef<[u8]>> PesHeader<B> {
    /// Wrap `data` after checking the start code prefix.
    pub fn parse(data: B) -> Result<Self> {
        let header = PesHeader::new(data)?;
        if header.start_code() != 0x00_0001 {
            return Err(TsError::InvalidPesStartCode);
        }
        Ok(header)
    }

    /// The stream carries the optional header and the buffer holds its
    /// fixed part.
    pub fn has_optional_header(&self) -> bool {
        has_optional_header(self.stream_id())
            && self.as_bytes().len() >= PES_HEADER_SIZE_OPTIONAL
    }

    fn optional(&self, field: BitField) -> Option<u64> {
        self.has_optional_header()
            .then(|| field.read(self.as_bytes()))
    }

    pub fn scrambling(&self) -> Option<u8> {
        self.optional(SCRAMBLING).map(|v| v as u8)
    }

    pub fn data_alignment(&self) -> bool {
        self.optional(DATA_ALIGNMENT) == Some(1)
    }

    pub fn header_data_length(&self) -> Option<u8> {
        self.optional(HEADER_DATA_LENGTH).map(|v| v as u8)
    }

    pub fn has_pts(&self) -> bool {
        self.optional(PTS_DTS_FLAGS).is_some_and(|flags| flags & 0b10 != 0)
    }

    pub fn has_dts(&self) -> bool {
        self.optional(PTS_DTS_FLAGS) == Some(0b11)
    }

    fn timestamp_slot(&self, index: usize) -> Option<&[u8]> {
        let start = PES_HEADER_SIZE_OPTIONAL + index * PES_TIMESTAMP_SIZE;
        self.as_bytes().get(start..start + PES_TIMESTAMP_SIZE)
    }

    pub fn pts(&self) -> Option<u64> {
        if !self.has_pts() {
            return None;
        }
        self.timestamp_slot(0).map(read_timestamp)
    }

    pub fn dts(&self) -> Option<u64> {
        if !self.has_dts() {
            return None;
        }
        self.timestamp_slot(1).map(read_timestamp)
    }

    /// Offset of the elementary stream data.
    pub fn payload_offset(&self) -> usize {
        match self.header_data_length() {
            Some(length) => PES_HEADER_SIZE_OPTIONAL + length as usize,
            None => PES_HEADER_SIZE,
        }
    }

    /// Start code, marker bits, PTS/DTS flags and header length agree with
    /// each other and with the buffer.
    pub fn validate(&self) -> bool {
        if self.start_code() != 0x00_0001 {
            return false;
        }
        if !has_optional_header(self.stream_id()) {
            return true;
        }
        let data = self.as_bytes();
        if data.len() < PES_HEADER_SIZE_OPTIONAL || MARKER_BITS.read(data) != 0b10 {
            return false;
        }
        let header_length = HEADER_DATA_LENGTH.read(data) as usize;
        if PES_HEADER_SIZE_OPTIONAL + header_length > data.len() {
            return false;
        }
        let timestamps = match PTS_DTS_FLAGS.read(data) {
            0b00 => 0,
            0b10 => 1,
            0b11 => 2,
            _ => return false,
        };
        if header_length < timestamps * PES_TIMESTAMP_SIZE {
            return false;
        }
        (0..timestamps).all(|i| self.timestamp_slot(i).is_some_and(timestamp_markers_ok))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> PesHeader<B> {
    /// Write the start code and stream id; other header bytes are left
    /// alone.
    pub fn init(&mut self, stream_id: u8) {
        self.set_start_code(0x00_0001);
        self.set_stream_id(stream_id);
        if has_optional_header(stream_id) && self.as_bytes().len() >= PES_HEADER_SIZE_OPTIONAL {
            let data = self.as_bytes_mut();
            data[6] = 0x80;
            data[7] = 0x00;
            data[8] = 0x00;
        }
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let actual = self.as_bytes().len();
        if actual < needed {
            return Err(TsError::InsufficientData {
                expected: needed,
                actual,
            });
        }
        Ok(())
    }

    pub fn set_data_alignment(&mut self, aligned: bool) -> Result<()> {
        self.ensure(PES_HEADER_SIZE_OPTIONAL)?;
        DATA_ALIGNMENT.write(self.as_bytes_mut(), aligned as u64);
        Ok(())
    }

    pub fn set_header_data_length(&mut self, length: u8) -> Result<()> {
        self.ensure(PES_HEADER_SIZE_OPTIONAL)?;
        MARKER_BITS.write(self.as_bytes_mut(), 0b10);
        HEADER_DATA_LENGTH.write(self.as_bytes_mut(), length as u64);
        Ok(())
    }

    /// Store a PTS and set its flag. The header data length is not touched.
    pub fn set_pts(&mut self, pts: u64) -> Result<()> {
        self.ensure(PES_HEADER_SIZE_OPTIONAL + PES_TIMESTAMP_SIZE)?;
        let both = self.has_dts();
        let data = self.as_bytes_mut();
        PTS_DTS_FLAGS.write(data, if both { 0b11 } else { 0b10 });
        let slot = &mut data[PES_HEADER_SIZE_OPTIONAL..];
        write_timestamp(slot, if both { 0b0011 } else { 0b0010 }, pts);
        Ok(())
    }

    /// Store a DTS. A PTS must already be present.
    pub fn set_dts(&mut self, dts: u64) -> Result<()> {
        self.ensure(PES_HEADER_SIZE_OPTIONAL + 2 * PES_TIMESTAMP_SIZE)?;
        if !self.has_pts() {
            return Err(TsError::InvalidPtsDtsFlags(0b01));
        }
        let data = self.as_bytes_mut();
        PTS_DTS_FLAGS.write(data, 0b11);
        TS_PREFIX.write(&mut data[PES_HEADER_SIZE_OPTIONAL..], 0b0011);
        write_timestamp(
            &mut data[PES_HEADER_SIZE_OPTIONAL + PES_TIMESTAMP_SIZE..],
            0b0001,
            dts,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_timestamps() {
        let data = [0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0x00, 0x00];
        let header = PesHeader::parse(&data[..]).unwrap();
        assert_eq!(header.stream_id(), 0xE0);
        assert!(header.validate());
        assert_eq!(header.pts(), None);
        assert_eq!(header.payload_offset(), 9);
    }

    #[test]
    fn test_bad_start_code() {
        let data = [0x00, 0x00, 0x02, 0xE0, 0x00, 0x00];
        assert!(matches!(
            PesHeader::parse(&data[..]),
            Err(TsError::InvalidPesStartCode)
        ));
    }

    #[test]
    fn test_pts_known_bytes() {
        // PTS = 90000: 0x21 0x00 0x05 0xBF 0x21
        let data = [
            0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0x80, 0x05, 0x21, 0x00, 0x05, 0xBF, 0x21,
        ];
        let header = PesHeader::parse(&data[..]).unwrap();
        assert!(header.validate());
        assert_eq!(header.pts(), Some(90_000));
        assert_eq!(header.dts(), None);
        assert_eq!(header.payload_offset(), 14);
    }

    #[test]
    fn test_write_pts_dts() {
        let mut data = [0u8; 19];
        let mut header = PesHeader::new(&mut data[..]).unwrap();
        header.init(0xE0);
        header.set_header_data_length(10).unwrap();
        header.set_pts(0x1_2345_6789).unwrap();
        header.set_dts(0x0_9876_5432).unwrap();
        assert!(header.validate());
        assert_eq!(header.pts(), Some(0x1_2345_6789));
        assert_eq!(header.dts(), Some(0x0_9876_5432));
        assert_eq!(data[9] >> 4, 0b0011);
        assert_eq!(data[14] >> 4, 0b0001);
    }

    #[test]
    fn test_header_length_too_short_for_pts() {
        let mut data = [0u8; 14];
        let mut header = PesHeader::new(&mut data[..]).unwrap();
        header.init(0xC0);
        header.set_header_data_length(2).unwrap();
        header.set_pts(1234).unwrap();
        assert!(!header.validate());
    }

    #[test]
    fn test_padding_stream_has_no_optional_header() {
        let data = [0x00, 0x00, 0x01, STREAM_ID_PADDING, 0x00, 0x04, 0xFF, 0xFF, 0xFF, 0xFF];
        let header = PesHeader::parse(&data[..]).unwrap();
        assert!(header.validate());
        assert_eq!(header.payload_offset(), PES_HEADER_SIZE);
        assert_eq!(header.header_data_length(), None);
    }
}
