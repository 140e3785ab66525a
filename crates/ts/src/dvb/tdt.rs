//! Time and Date Table and Time Offset Table. Both are short-form sections
//! carrying the current UTC time; the TOT adds a descriptor loop and a CRC.

use bitfield::{BitField, layout};
use chrono::NaiveDateTime;

use super::time::{UTC_TIME_SIZE, decode_utc_time, encode_utc_time};
use crate::crc32::{mpeg2_crc32, validate_section_crc32};
use crate::descriptor::{DESCRIPTOR_LIST_RECORD, Descriptors, descriptor_list};
use crate::psi::section::{PSI_CRC_SIZE, PSI_HEADER_SIZE, SECTION_RECORD};
use crate::{Result, TsError};

pub const TDT_TABLE_ID: u8 = 0x70;
pub const TOT_TABLE_ID: u8 = 0x73;
pub const TDT_SIZE: usize = PSI_HEADER_SIZE + UTC_TIME_SIZE;
/// TOT up to and including the descriptor loop length.
pub const TOT_HEADER_SIZE: usize = TDT_SIZE + 2;

fn utc_field(bytes: &[u8]) -> Option<NaiveDateTime> {
    decode_utc_time(&bytes[PSI_HEADER_SIZE..TDT_SIZE])
}

fn write_utc(bytes: &mut [u8], time: NaiveDateTime) -> Result<()> {
    let encoded = encode_utc_time(time)
        .ok_or_else(|| TsError::OutOfRange(format!("UTC time {time}")))?;
    bytes[PSI_HEADER_SIZE..TDT_SIZE].copy_from_slice(&encoded);
    Ok(())
}

fn init_short_header(bytes: &mut [u8], table_id: u8, section_length: u16) {
    bytes[0] = table_id;
    // syntax 0, reserved_future_use 1, reserved 11
    BitField::new(1, 0, 4).write(bytes, 0b0111);
    BitField::new(1, 4, 12).write(bytes, section_length as u64);
}

layout! {
    /// Time and Date Table (table id 0x70).
    pub struct Tdt[TDT_SIZE] {
        table_id, set_table_id: u8 = (0, 0, 8);
        syntax_indicator, set_syntax_indicator: bool = (1, 0, 1);
        section_length, set_section_length: u16 = (1, 4, 12);
        utc_mjd, set_utc_mjd: u16 = (3, 0, 16);
    }
}

impl<B: AsRef<[u8]>> Tdt<B> {
    /// Current UTC time, `None` when undefined.
    pub fn utc_time(&self) -> Option<NaiveDateTime> {
        utc_field(self.as_bytes())
    }

    /// Table id 0x70, short form, `section_length` of exactly 5.
    pub fn validate(&self) -> bool {
        self.table_id() == TDT_TABLE_ID
            && !self.syntax_indicator()
            && self.section_length() as usize == UTC_TIME_SIZE
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Tdt<B> {
    pub fn init(&mut self) {
        init_short_header(self.as_bytes_mut(), TDT_TABLE_ID, UTC_TIME_SIZE as u16);
    }

    pub fn set_utc_time(&mut self, time: NaiveDateTime) -> Result<()> {
        write_utc(self.as_bytes_mut(), time)
    }
}

layout! {
    /// Time Offset Table (table id 0x73).
    pub struct Tot[TOT_HEADER_SIZE] {
        table_id, set_table_id: u8 = (0, 0, 8);
        syntax_indicator, set_syntax_indicator: bool = (1, 0, 1);
        section_length, set_section_length: u16 = (1, 4, 12);
        utc_mjd, set_utc_mjd: u16 = (3, 0, 16);
        descriptors_length, set_descriptors_length: u16 = (8, 4, 12);
    }
}

impl<B: AsRef<[u8]>> Tot<B> {
    pub fn utc_time(&self) -> Option<NaiveDateTime> {
        utc_field(self.as_bytes())
    }

    pub fn length(&self) -> usize {
        PSI_HEADER_SIZE + self.section_length() as usize
    }

    /// The descriptor loop, `None` when its length runs past the buffer.
    pub fn descriptors(&self) -> Option<Descriptors<'_>> {
        descriptor_list(self.as_bytes().get(TDT_SIZE..)?)
    }

    pub fn check_crc(&self) -> bool {
        SECTION_RECORD
            .split(self.as_bytes())
            .is_some_and(validate_section_crc32)
    }

    /// Short form, the descriptor loop ends exactly at the CRC, the
    /// descriptors fill it and the CRC checks out.
    pub fn validate(&self) -> bool {
        let bytes = self.as_bytes();
        if self.table_id() != TOT_TABLE_ID
            || self.syntax_indicator()
            || self.length() > bytes.len()
        {
            return false;
        }
        let loop_end = TOT_HEADER_SIZE + self.descriptors_length() as usize;
        loop_end + PSI_CRC_SIZE == self.length()
            && self.descriptors().is_some_and(|descs| descs.validate())
            && self.check_crc()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Tot<B> {
    /// Write a header with an empty descriptor loop.
    pub fn init(&mut self) {
        let bytes = self.as_bytes_mut();
        init_short_header(bytes, TOT_TABLE_ID, (UTC_TIME_SIZE + 2 + PSI_CRC_SIZE) as u16);
        BitField::new(8, 0, 4).write(bytes, 0xF);
        BitField::new(8, 4, 12).write(bytes, 0);
    }

    pub fn set_utc_time(&mut self, time: NaiveDateTime) -> Result<()> {
        write_utc(self.as_bytes_mut(), time)
    }

    /// Declare `length` descriptor bytes and size the section around them.
    pub fn resize_descriptors(&mut self, length: usize) -> Result<()> {
        let total = TOT_HEADER_SIZE + length + PSI_CRC_SIZE;
        if total > self.as_bytes().len() {
            return Err(TsError::InsufficientData {
                expected: total,
                actual: self.as_bytes().len(),
            });
        }
        DESCRIPTOR_LIST_RECORD.set_declared_length(&mut self.as_bytes_mut()[TDT_SIZE..], length)?;
        self.set_section_length((total - PSI_HEADER_SIZE) as u16);
        Ok(())
    }

    /// Writable descriptor bytes.
    pub fn descriptors_mut(&mut self) -> Option<&mut [u8]> {
        let end = TOT_HEADER_SIZE + self.descriptors_length() as usize;
        self.as_bytes_mut().get_mut(TOT_HEADER_SIZE..end)
    }

    pub fn set_crc(&mut self) -> Result<()> {
        let end = self.length();
        if end > self.as_bytes().len() || end < TOT_HEADER_SIZE + PSI_CRC_SIZE {
            return Err(TsError::InvalidSectionLength(self.section_length()));
        }
        let crc = mpeg2_crc32(&self.as_bytes()[..end - PSI_CRC_SIZE]);
        self.as_bytes_mut()[end - PSI_CRC_SIZE..end].copy_from_slice(&crc.to_be_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_tdt() {
        let data = [0x70, 0x70, 0x05, 0xC0, 0x79, 0x21, 0x00, 0x00];
        let tdt = Tdt::new(&data[..]).unwrap();
        assert!(tdt.validate());
        let time = tdt.utc_time().unwrap();
        assert_eq!(time.date(), NaiveDate::from_ymd_opt(1993, 10, 13).unwrap());
        assert_eq!(time.hour(), 21);
        assert_eq!(time.minute(), 0);

        let mut built = [0u8; TDT_SIZE];
        let mut tdt = Tdt::new(&mut built[..]).unwrap();
        tdt.init();
        tdt.set_utc_time(time).unwrap();
        assert_eq!(built, data);
    }

    #[test]
    fn test_tdt_bad_length() {
        let data = [0x70, 0x70, 0x06, 0xC0, 0x79, 0x21, 0x00, 0x00, 0x00];
        assert!(!Tdt::new(&data[..]).unwrap().validate());
    }

    fn tot(descs: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; TOT_HEADER_SIZE + descs.len() + PSI_CRC_SIZE];
        let mut tot = Tot::new(&mut data[..]).unwrap();
        tot.init();
        tot.set_utc_time(
            NaiveDate::from_ymd_opt(2024, 2, 29)
                .unwrap()
                .and_hms_opt(6, 30, 0)
                .unwrap(),
        )
        .unwrap();
        tot.resize_descriptors(descs.len()).unwrap();
        tot.descriptors_mut().unwrap().copy_from_slice(descs);
        tot.set_crc().unwrap();
        data
    }

    #[test]
    fn test_tot() {
        // local time offset, one region
        let lto = [
            0x58, 0x0D, b'F', b'R', b'A', 0x02, 0x01, 0x00, 0xDD, 0x1F, 0x01, 0x00, 0x00, 0x01,
            0x00,
        ];
        let data = tot(&lto);
        let tot = Tot::new(&data[..]).unwrap();
        assert!(tot.validate());
        assert_eq!(tot.utc_time().unwrap().hour(), 6);
        assert_eq!(tot.descriptors().unwrap().nth(0).unwrap().tag(), 0x58);
    }

    #[test]
    fn test_tot_corrupt() {
        let mut data = tot(&[0x52, 0x01, 0x07]);
        assert!(Tot::new(&data[..]).unwrap().validate());

        // loop length no longer reaches the CRC
        data[9] = 0x02;
        assert!(!Tot::new(&data[..]).unwrap().validate());
        data[9] = 0x03;

        let last = data.len() - 1;
        data[last] ^= 0x01;
        assert!(!Tot::new(&data[..]).unwrap().validate());
    }
}
