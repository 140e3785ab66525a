use bitfield::{BitField, LengthField, RecordLayout, layout};

use crate::crc32::{mpeg2_crc32, validate_section_crc32};
use crate::{Result, TsError};

pub const PSI_HEADER_SIZE: usize = 3;
pub const PSI_HEADER_SIZE_SYNTAX1: usize = 8;
pub const PSI_CRC_SIZE: usize = 4;
/// Largest `section_length` of an MPEG-defined PSI table.
pub const PSI_MAX_SIZE: usize = 1021;
/// Largest `section_length` of a private (DVB SI, SCTE) section.
pub const PSI_PRIVATE_MAX_SIZE: usize = 4093;
pub const PSI_MAX_SECTIONS: usize = 256;

/// `section_length` counts the bytes following it.
pub const SECTION_RECORD: RecordLayout =
    RecordLayout::new(PSI_HEADER_SIZE, LengthField::bits(BitField::new(1, 4, 12)));

layout! {
    /// Short section header common to every PSI/SI section.
    pub struct Section[PSI_HEADER_SIZE] {
        table_id, set_table_id: u8 = (0, 0, 8);
        syntax_indicator, set_syntax_indicator: bool = (1, 0, 1);
        private_indicator, set_private_indicator: bool = (1, 1, 1);
        section_length, set_section_length: u16 = (1, 4, 12);
    }
}

impl<B: AsRef<[u8]>> Section<B> {
    /// Header plus `section_length`.
    pub fn length(&self) -> usize {
        PSI_HEADER_SIZE + self.section_length() as usize
    }

    /// The section's own bytes, trimmed to its declared length.
    pub fn bytes(&self) -> Option<&[u8]> {
        SECTION_RECORD.split(self.as_bytes())
    }

    /// Declared length fits the buffer and the private maximum, and a long
    /// section has room for its header and CRC.
    pub fn validate(&self) -> bool {
        let section_length = self.section_length() as usize;
        if section_length > PSI_PRIVATE_MAX_SIZE || self.length() > self.as_bytes().len() {
            return false;
        }
        !self.syntax_indicator()
            || section_length >= PSI_HEADER_SIZE_SYNTAX1 - PSI_HEADER_SIZE + PSI_CRC_SIZE
    }

    /// CRC over the declared bytes runs to zero.
    pub fn check_crc(&self) -> bool {
        self.bytes().is_some_and(validate_section_crc32)
    }
}

layout! {
    /// Long-form section header (`section_syntax_indicator == 1`).
    pub struct TableSection[PSI_HEADER_SIZE_SYNTAX1] {
        table_id, set_table_id: u8 = (0, 0, 8);
        syntax_indicator, set_syntax_indicator: bool = (1, 0, 1);
        private_indicator, set_private_indicator: bool = (1, 1, 1);
        section_length, set_section_length: u16 = (1, 4, 12);
        table_id_extension, set_table_id_extension: u16 = (3, 0, 16);
        version, set_version: u8 = (5, 2, 5);
        current_next, set_current_next: bool = (5, 7, 1);
        section_number, set_section_number: u8 = (6, 0, 8);
        last_section_number, set_last_section_number: u8 = (7, 0, 8);
    }
}

impl<'a> TableSection<&'a [u8]> {
    /// Wrap a long-form section, checking the syntax indicator and that the
    /// declared length fits.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let section = TableSection::new(data)?;
        if !section.syntax_indicator() {
            return Err(TsError::ShortSection(section.table_id()));
        }
        if section.length() > data.len() {
            return Err(TsError::InsufficientData {
                expected: section.length(),
                actual: data.len(),
            });
        }
        Ok(section)
    }

    /// Payload between the long header and the CRC, borrowed for the
    /// buffer's lifetime.
    pub fn payload_bytes(&self) -> Option<&'a [u8]> {
        let end = self.length().checked_sub(PSI_CRC_SIZE)?;
        self.into_inner().get(PSI_HEADER_SIZE_SYNTAX1..end)
    }
}

impl<B: AsRef<[u8]>> TableSection<B> {
    pub fn length(&self) -> usize {
        PSI_HEADER_SIZE + self.section_length() as usize
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        SECTION_RECORD.split(self.as_bytes())
    }

    /// Payload between the long header and the CRC.
    pub fn payload(&self) -> Option<&[u8]> {
        let end = self.length().checked_sub(PSI_CRC_SIZE)?;
        self.as_bytes().get(PSI_HEADER_SIZE_SYNTAX1..end)
    }

    /// Stored CRC-32 trailer.
    pub fn crc(&self) -> Option<u32> {
        let end = self.length();
        let trailer = self.as_bytes().get(end.checked_sub(PSI_CRC_SIZE)?..end)?;
        Some(u32::from_be_bytes(trailer.try_into().ok()?))
    }

    pub fn check_crc(&self) -> bool {
        self.bytes().is_some_and(validate_section_crc32)
    }

    /// Structural checks against `max_section_length`: long form, declared
    /// length fits, header and CRC fit, section number not past the last.
    pub fn validate_with(&self, max_section_length: usize) -> bool {
        let section_length = self.section_length() as usize;
        self.syntax_indicator()
            && section_length <= max_section_length
            && section_length >= PSI_HEADER_SIZE_SYNTAX1 - PSI_HEADER_SIZE + PSI_CRC_SIZE
            && self.length() <= self.as_bytes().len()
            && self.section_number() <= self.last_section_number()
    }

    /// [`TableSection::validate_with`] at the private section maximum.
    pub fn validate(&self) -> bool {
        self.validate_with(PSI_PRIVATE_MAX_SIZE)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> TableSection<B> {
    /// Write a long-form header for section 0 of 0 with an empty payload.
    pub fn init(&mut self, table_id: u8, table_id_extension: u16, version: u8) {
        let bytes = self.as_bytes_mut();
        bytes[..PSI_HEADER_SIZE_SYNTAX1].fill(0);
        // reserved bits
        BitField::new(1, 2, 2).write(bytes, 0b11);
        BitField::new(5, 0, 2).write(bytes, 0b11);
        self.set_table_id(table_id);
        self.set_syntax_indicator(true);
        self.set_table_id_extension(table_id_extension);
        self.set_version(version);
        self.set_current_next(true);
        self.set_section_length((PSI_HEADER_SIZE_SYNTAX1 - PSI_HEADER_SIZE + PSI_CRC_SIZE) as u16);
    }

    /// Declare a payload of `length` bytes between header and CRC.
    pub fn set_payload_length(&mut self, length: usize) -> Result<()> {
        let section_length = length + PSI_HEADER_SIZE_SYNTAX1 - PSI_HEADER_SIZE + PSI_CRC_SIZE;
        if section_length > PSI_PRIVATE_MAX_SIZE {
            return Err(TsError::InvalidSectionLength(section_length as u16));
        }
        self.set_section_length(section_length as u16);
        Ok(())
    }

    /// Writable payload.
    pub fn payload_mut(&mut self) -> Option<&mut [u8]> {
        let end = self.length().checked_sub(PSI_CRC_SIZE)?;
        self.as_bytes_mut().get_mut(PSI_HEADER_SIZE_SYNTAX1..end)
    }

    /// Compute and store the CRC-32 trailer over the declared bytes.
    pub fn set_crc(&mut self) -> Result<()> {
        let end = self.length();
        let available = self.as_bytes().len();
        if end > available {
            return Err(TsError::InsufficientData {
                expected: end,
                actual: available,
            });
        }
        if (self.section_length() as usize) < PSI_CRC_SIZE {
            return Err(TsError::InvalidSectionLength(self.section_length()));
        }
        let crc_start = end - PSI_CRC_SIZE;
        let crc = mpeg2_crc32(&self.as_bytes()[..crc_start]);
        self.as_bytes_mut()[crc_start..end].copy_from_slice(&crc.to_be_bytes());
        Ok(())
    }
}

/// Build a complete long-form section around `payload`.
pub fn build_section(
    table_id: u8,
    table_id_extension: u16,
    version: u8,
    section_number: u8,
    last_section_number: u8,
    payload: &[u8],
) -> Result<Vec<u8>> {
    let mut data = vec![0u8; PSI_HEADER_SIZE_SYNTAX1 + payload.len() + PSI_CRC_SIZE];
    let mut section = TableSection::new(&mut data[..])?;
    section.init(table_id, table_id_extension, version);
    section.set_section_number(section_number);
    section.set_last_section_number(last_section_number);
    section.set_payload_length(payload.len())?;
    if let Some(dst) = section.payload_mut() {
        dst.copy_from_slice(payload);
    }
    section.set_crc()?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    // PAT: tsid 1, version 0, one program 1 -> PMT PID 0x100
    const PAT: [u8; 16] = [
        0x00, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00, 0x00, 0x01, 0xE1, 0x00, 0x00, 0x00, 0x00,
        0x00,
    ];

    fn pat_with_crc() -> Vec<u8> {
        let mut data = PAT.to_vec();
        let mut section = TableSection::new(&mut data[..]).unwrap();
        section.set_crc().unwrap();
        data
    }

    #[test]
    fn test_header_fields() {
        let data = pat_with_crc();
        let section = TableSection::parse(&data).unwrap();
        assert_eq!(section.table_id(), 0x00);
        assert!(section.syntax_indicator());
        assert_eq!(section.section_length(), 13);
        assert_eq!(section.length(), 16);
        assert_eq!(section.table_id_extension(), 1);
        assert_eq!(section.version(), 0);
        assert!(section.current_next());
        assert_eq!(section.section_number(), 0);
        assert_eq!(section.last_section_number(), 0);
        assert_eq!(section.payload(), Some(&[0x00, 0x01, 0xE1, 0x00][..]));
        assert!(section.validate_with(PSI_MAX_SIZE));
        assert!(section.check_crc());
    }

    #[test]
    fn test_crc_detects_corruption() {
        let mut data = pat_with_crc();
        data[9] ^= 0x02;
        let section = TableSection::parse(&data).unwrap();
        assert!(section.validate());
        assert!(!section.check_crc());
    }

    #[test]
    fn test_length_bounds() {
        let data = pat_with_crc();
        assert!(matches!(
            TableSection::parse(&data[..15]),
            Err(TsError::InsufficientData {
                expected: 16,
                actual: 15
            })
        ));
        let short = Section::new(&data[..15]).unwrap();
        assert!(!short.validate());
        assert!(Section::new(&data[..]).unwrap().validate());
    }

    #[test]
    fn test_long_section_needs_room_for_crc() {
        let data = [0x00, 0xB0, 0x04, 0, 0, 0, 0, 0];
        let section = Section::new(&data[..]).unwrap();
        assert!(!section.validate());
    }

    #[test]
    fn test_build_section() {
        let data = build_section(0x42, 0x1234, 5, 1, 2, &[0xAA, 0xBB]).unwrap();
        let section = TableSection::parse(&data).unwrap();
        assert_eq!(section.table_id(), 0x42);
        assert_eq!(section.table_id_extension(), 0x1234);
        assert_eq!(section.version(), 5);
        assert_eq!(section.section_number(), 1);
        assert_eq!(section.last_section_number(), 2);
        assert_eq!(section.payload_bytes(), Some(&[0xAA, 0xBB][..]));
        assert!(section.validate());
        assert!(section.check_crc());
        assert_eq!(&data[..3], &[0x42, 0xB0, 0x0B]);
    }

    #[test]
    fn test_section_number_past_last_invalid() {
        let data = build_section(0x42, 1, 0, 3, 2, &[]).unwrap();
        assert!(!TableSection::parse(&data).unwrap().validate());
    }
}
