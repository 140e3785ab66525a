//! SCTE-35 splice_info_section.
//!
//! The section header is a fixed view; the splice command that follows is
//! decoded into owned values since its layout depends on several flags.

use bitfield::{BitField, layout};

use crate::crc32::{mpeg2_crc32, validate_section_crc32};
use crate::descriptor::{Descriptors, descriptors};
use crate::psi::section::{PSI_CRC_SIZE, PSI_HEADER_SIZE, PSI_PRIVATE_MAX_SIZE, SECTION_RECORD};
use crate::{Result, TsError};

/// SCTE-35 table ID
pub const SCTE35_TABLE_ID: u8 = 0xFC;

/// SCTE-35 registration format identifier
pub const SCTE35_FORMAT_IDENTIFIER: [u8; 4] = *b"CUEI";

pub const SCTE35_HEADER_SIZE: usize = 14;

/// `splice_command_length` of legacy senders that leave it unspecified.
pub const SPLICE_COMMAND_LENGTH_UNKNOWN: u16 = 0xFFF;

const SPLICE_TIME_SIZE: usize = 5;
const BREAK_DURATION_SIZE: usize = 5;

/// SCTE-35 splice command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceCommandType {
    SpliceNull,
    SpliceSchedule,
    SpliceInsert,
    TimeSignal,
    BandwidthReservation,
    PrivateCommand,
    Unknown(u8),
}

impl From<u8> for SpliceCommandType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => SpliceCommandType::SpliceNull,
            0x04 => SpliceCommandType::SpliceSchedule,
            0x05 => SpliceCommandType::SpliceInsert,
            0x06 => SpliceCommandType::TimeSignal,
            0x07 => SpliceCommandType::BandwidthReservation,
            0xFF => SpliceCommandType::PrivateCommand,
            v => SpliceCommandType::Unknown(v),
        }
    }
}

impl From<SpliceCommandType> for u8 {
    fn from(value: SpliceCommandType) -> Self {
        match value {
            SpliceCommandType::SpliceNull => 0x00,
            SpliceCommandType::SpliceSchedule => 0x04,
            SpliceCommandType::SpliceInsert => 0x05,
            SpliceCommandType::TimeSignal => 0x06,
            SpliceCommandType::BandwidthReservation => 0x07,
            SpliceCommandType::PrivateCommand => 0xFF,
            SpliceCommandType::Unknown(v) => v,
        }
    }
}

/// Decoded splice command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceCommand {
    SpliceNull,
    SpliceInsert(SpliceInsert),
    TimeSignal(TimeSignal),
    BandwidthReservation,
    Other(Vec<u8>),
}

/// One component of a component-level splice insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpliceComponent {
    pub component_tag: u8,
    pub splice_time: Option<u64>,
}

/// SCTE-35 splice insert command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpliceInsert {
    pub splice_event_id: u32,
    pub splice_event_cancel_indicator: bool,
    pub out_of_network_indicator: bool,
    pub program_splice_flag: bool,
    pub splice_immediate_flag: bool,
    pub splice_time: Option<u64>,
    pub components: Vec<SpliceComponent>,
    pub duration: Option<BreakDuration>,
    pub unique_program_id: u16,
    pub avail_num: u8,
    pub avails_expected: u8,
}

/// Break duration in a splice insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakDuration {
    pub auto_return: bool,
    /// Duration in 90kHz ticks (33-bit)
    pub duration: u64,
}

/// SCTE-35 time signal command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignal {
    pub splice_time: Option<u64>,
}

fn short(what: &str) -> TsError {
    TsError::InvalidScte35(format!("{what} truncated"))
}

fn read_33(data: &[u8]) -> u64 {
    BitField::new(0, 7, 33).read(data)
}

fn write_33(out: &mut Vec<u8>, flag: u8, value: u64) {
    let value = value & 0x1_FFFF_FFFF;
    out.push(flag | 0x7E | (value >> 32) as u8);
    out.extend_from_slice(&(value as u32).to_be_bytes());
}

/// Decode a splice_time() structure. Returns the PTS and bytes consumed.
fn decode_splice_time(data: &[u8]) -> Result<(Option<u64>, usize)> {
    let first = *data.first().ok_or_else(|| short("splice_time"))?;
    if first & 0x80 == 0 {
        return Ok((None, 1));
    }
    let bytes = data.get(..SPLICE_TIME_SIZE).ok_or_else(|| short("splice_time"))?;
    Ok((Some(read_33(bytes)), SPLICE_TIME_SIZE))
}

fn encode_splice_time(out: &mut Vec<u8>, time: Option<u64>) {
    match time {
        Some(pts) => write_33(out, 0x80, pts),
        None => out.push(0x7F),
    }
}

fn decode_break_duration(data: &[u8]) -> Result<BreakDuration> {
    let bytes = data
        .get(..BREAK_DURATION_SIZE)
        .ok_or_else(|| short("break_duration"))?;
    Ok(BreakDuration {
        auto_return: bytes[0] & 0x80 != 0,
        duration: read_33(bytes),
    })
}

impl TimeSignal {
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let (splice_time, consumed) = decode_splice_time(data)?;
        Ok((Self { splice_time }, consumed))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SPLICE_TIME_SIZE);
        encode_splice_time(&mut out, self.splice_time);
        out
    }
}

impl SpliceInsert {
    /// Decode a splice_insert() command. Returns the command and bytes
    /// consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let header = data.get(..5).ok_or_else(|| short("splice_insert"))?;
        let mut insert = SpliceInsert {
            splice_event_id: u32::from_be_bytes([header[0], header[1], header[2], header[3]]),
            splice_event_cancel_indicator: header[4] & 0x80 != 0,
            ..Default::default()
        };
        if insert.splice_event_cancel_indicator {
            return Ok((insert, 5));
        }

        let flags = *data.get(5).ok_or_else(|| short("splice_insert flags"))?;
        insert.out_of_network_indicator = flags & 0x80 != 0;
        insert.program_splice_flag = flags & 0x40 != 0;
        let duration_flag = flags & 0x20 != 0;
        insert.splice_immediate_flag = flags & 0x10 != 0;

        let mut offset = 6;
        if insert.program_splice_flag {
            if !insert.splice_immediate_flag {
                let (time, consumed) = decode_splice_time(&data[offset..])?;
                insert.splice_time = time;
                offset += consumed;
            }
        } else {
            let count = *data.get(offset).ok_or_else(|| short("component_count"))?;
            offset += 1;
            for _ in 0..count {
                let component_tag = *data.get(offset).ok_or_else(|| short("component"))?;
                offset += 1;
                let mut splice_time = None;
                if !insert.splice_immediate_flag {
                    let (time, consumed) = decode_splice_time(&data[offset..])?;
                    splice_time = time;
                    offset += consumed;
                }
                insert.components.push(SpliceComponent {
                    component_tag,
                    splice_time,
                });
            }
        }

        if duration_flag {
            insert.duration = Some(decode_break_duration(&data[offset..])?);
            offset += BREAK_DURATION_SIZE;
        }

        let tail = data
            .get(offset..offset + 4)
            .ok_or_else(|| short("unique_program_id"))?;
        insert.unique_program_id = u16::from_be_bytes([tail[0], tail[1]]);
        insert.avail_num = tail[2];
        insert.avails_expected = tail[3];
        Ok((insert, offset + 4))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.splice_event_id.to_be_bytes().to_vec();
        if self.splice_event_cancel_indicator {
            out.push(0xFF);
            return out;
        }
        out.push(0x7F);
        let mut flags = 0x0F;
        if self.out_of_network_indicator {
            flags |= 0x80;
        }
        if self.program_splice_flag {
            flags |= 0x40;
        }
        if self.duration.is_some() {
            flags |= 0x20;
        }
        if self.splice_immediate_flag {
            flags |= 0x10;
        }
        out.push(flags);

        if self.program_splice_flag {
            if !self.splice_immediate_flag {
                encode_splice_time(&mut out, self.splice_time);
            }
        } else {
            out.push(self.components.len() as u8);
            for component in &self.components {
                out.push(component.component_tag);
                if !self.splice_immediate_flag {
                    encode_splice_time(&mut out, component.splice_time);
                }
            }
        }
        if let Some(duration) = self.duration {
            let flag = if duration.auto_return { 0x80 } else { 0x00 };
            write_33(&mut out, flag, duration.duration);
        }
        out.extend_from_slice(&self.unique_program_id.to_be_bytes());
        out.push(self.avail_num);
        out.push(self.avails_expected);
        out
    }
}

impl SpliceCommand {
    /// Decode the command of `command_type` at the start of `data`.
    /// Returns the command and bytes consumed; commands this crate does not
    /// model take all of `data`.
    pub fn decode(command_type: SpliceCommandType, data: &[u8]) -> Result<(Self, usize)> {
        match command_type {
            SpliceCommandType::SpliceNull => Ok((SpliceCommand::SpliceNull, 0)),
            SpliceCommandType::BandwidthReservation => {
                Ok((SpliceCommand::BandwidthReservation, 0))
            }
            SpliceCommandType::SpliceInsert => {
                SpliceInsert::decode(data).map(|(insert, n)| (SpliceCommand::SpliceInsert(insert), n))
            }
            SpliceCommandType::TimeSignal => {
                TimeSignal::decode(data).map(|(signal, n)| (SpliceCommand::TimeSignal(signal), n))
            }
            _ => Ok((SpliceCommand::Other(data.to_vec()), data.len())),
        }
    }

    /// Whether the length of this command type can be found by decoding it.
    fn self_delimiting(command_type: SpliceCommandType) -> bool {
        matches!(
            command_type,
            SpliceCommandType::SpliceNull
                | SpliceCommandType::BandwidthReservation
                | SpliceCommandType::SpliceInsert
                | SpliceCommandType::TimeSignal
        )
    }
}

layout! {
    /// splice_info_section header, up to and including the command type.
    pub struct SpliceInfoSection[SCTE35_HEADER_SIZE] {
        table_id, set_table_id: u8 = (0, 0, 8);
        syntax_indicator, set_syntax_indicator: bool = (1, 0, 1);
        private_indicator, set_private_indicator: bool = (1, 1, 1);
        sap_type, set_sap_type: u8 = (1, 2, 2);
        section_length, set_section_length: u16 = (1, 4, 12);
        protocol_version, set_protocol_version: u8 = (3, 0, 8);
        encrypted_packet, set_encrypted_packet: bool = (4, 0, 1);
        encryption_algorithm, set_encryption_algorithm: u8 = (4, 1, 6);
        /// 90 kHz ticks added to every splice time in the section.
        pts_adjustment, set_pts_adjustment: u64 = (4, 7, 33);
        cw_index, set_cw_index: u8 = (9, 0, 8);
        tier, set_tier: u16 = (10, 0, 12);
        splice_command_length, set_splice_command_length: u16 = (11, 4, 12);
        splice_command_type_raw, set_splice_command_type_raw: u8 = (13, 0, 8);
    }
}

impl<'a> SpliceInfoSection<&'a [u8]> {
    /// Wrap a section, checking the table id and that the declared length
    /// fits `data`. The view is trimmed to the declared length.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let header = SpliceInfoSection::new(data)?;
        if header.table_id() != SCTE35_TABLE_ID {
            return Err(TsError::InvalidTableId {
                expected: SCTE35_TABLE_ID,
                actual: header.table_id(),
            });
        }
        let section = SECTION_RECORD
            .split(data)
            .ok_or(TsError::InsufficientData {
                expected: header.length(),
                actual: data.len(),
            })?;
        Ok(SpliceInfoSection::new(section)?)
    }
}

impl<B: AsRef<[u8]>> SpliceInfoSection<B> {
    /// Header plus `section_length`.
    pub fn length(&self) -> usize {
        PSI_HEADER_SIZE + self.section_length() as usize
    }

    fn section(&self) -> Option<&[u8]> {
        SECTION_RECORD.split(self.as_bytes())
    }

    fn body_end(&self) -> Option<usize> {
        self.length().checked_sub(PSI_CRC_SIZE)
    }

    pub fn splice_command_type(&self) -> SpliceCommandType {
        self.splice_command_type_raw().into()
    }

    fn command_len(&self) -> Option<usize> {
        let declared = self.splice_command_length();
        if declared != SPLICE_COMMAND_LENGTH_UNKNOWN {
            return Some(declared as usize);
        }
        let command_type = self.splice_command_type();
        if !SpliceCommand::self_delimiting(command_type) {
            return None;
        }
        let body = self.section()?.get(SCTE35_HEADER_SIZE..self.body_end()?)?;
        SpliceCommand::decode(command_type, body)
            .ok()
            .map(|(_, consumed)| consumed)
    }

    /// Command bytes. With a legacy unspecified length, the length comes
    /// from decoding the command.
    pub fn command(&self) -> Option<&[u8]> {
        let end = SCTE35_HEADER_SIZE + self.command_len()?;
        if end > self.body_end()? {
            return None;
        }
        self.section()?.get(SCTE35_HEADER_SIZE..end)
    }

    pub fn splice_command(&self) -> Result<SpliceCommand> {
        let command = self
            .command()
            .ok_or_else(|| TsError::InvalidScte35("splice command past section end".into()))?;
        SpliceCommand::decode(self.splice_command_type(), command).map(|(command, _)| command)
    }

    fn descriptor_loop_offset(&self) -> Option<usize> {
        Some(SCTE35_HEADER_SIZE + self.command_len()?)
    }

    pub fn descriptor_loop_length(&self) -> Option<u16> {
        let offset = self.descriptor_loop_offset()?;
        if offset + 2 > self.body_end()? {
            return None;
        }
        Some(BitField::bytes(offset, 2).read(self.section()?) as u16)
    }

    /// Splice descriptors; they share the tag and length header of MPEG
    /// descriptors.
    pub fn descriptors(&self) -> Option<Descriptors<'_>> {
        let start = self.descriptor_loop_offset()? + 2;
        let end = start + self.descriptor_loop_length()? as usize;
        if end > self.body_end()? {
            return None;
        }
        Some(descriptors(self.section()?.get(start..end)?))
    }

    pub fn crc(&self) -> Option<u32> {
        let section = self.section()?;
        let start = self.body_end()?;
        Some(BitField::bytes(start, PSI_CRC_SIZE).read(section) as u32)
    }

    pub fn check_crc(&self) -> bool {
        self.section().is_some_and(validate_section_crc32)
    }

    /// Table id, short-form header, bounded lengths, a decodable command,
    /// a well-formed descriptor loop before the CRC, and the CRC.
    ///
    /// Encrypted sections are checked up to the command, which is
    /// ciphertext.
    pub fn validate(&self) -> bool {
        if self.table_id() != SCTE35_TABLE_ID
            || self.syntax_indicator()
            || self.private_indicator()
            || self.section_length() as usize > PSI_PRIVATE_MAX_SIZE
            || self.section().is_none()
            || self.length() < SCTE35_HEADER_SIZE + 2 + PSI_CRC_SIZE
        {
            return false;
        }
        if !self.check_crc() {
            return false;
        }
        if self.encrypted_packet() {
            return true;
        }
        self.splice_command().is_ok()
            && self
                .descriptors()
                .is_some_and(|descriptors| descriptors.validate())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SpliceInfoSection<B> {
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
        let crc_start = end - PSI_CRC_SIZE;
        let crc = mpeg2_crc32(&self.as_bytes()[..crc_start]);
        self.as_bytes_mut()[crc_start..end].copy_from_slice(&crc.to_be_bytes());
        Ok(())
    }
}

/// Build an unencrypted splice_info_section with tier 0xFFF.
pub fn build_splice_info(
    pts_adjustment: u64,
    command_type: SpliceCommandType,
    command: &[u8],
    descriptor_loop: &[u8],
) -> Result<Vec<u8>> {
    if command.len() >= SPLICE_COMMAND_LENGTH_UNKNOWN as usize || descriptor_loop.len() > 0xFFFF {
        return Err(TsError::OutOfRange(format!(
            "splice command of {} bytes, descriptors of {} bytes",
            command.len(),
            descriptor_loop.len()
        )));
    }
    let total = SCTE35_HEADER_SIZE + command.len() + 2 + descriptor_loop.len() + PSI_CRC_SIZE;
    let section_length = total - PSI_HEADER_SIZE;
    if section_length > PSI_PRIVATE_MAX_SIZE {
        return Err(TsError::InvalidSectionLength(section_length as u16));
    }

    let mut data = vec![0u8; total];
    let mut section = SpliceInfoSection::new(&mut data[..])?;
    section.set_table_id(SCTE35_TABLE_ID);
    section.set_sap_type(0b11);
    section.set_section_length(section_length as u16);
    section.set_pts_adjustment(pts_adjustment & 0x1_FFFF_FFFF);
    section.set_tier(0xFFF);
    section.set_splice_command_length(command.len() as u16);
    section.set_splice_command_type_raw(command_type.into());

    let mut offset = SCTE35_HEADER_SIZE;
    data[offset..offset + command.len()].copy_from_slice(command);
    offset += command.len();
    data[offset..offset + 2].copy_from_slice(&(descriptor_loop.len() as u16).to_be_bytes());
    offset += 2;
    data[offset..offset + descriptor_loop.len()].copy_from_slice(descriptor_loop);

    SpliceInfoSection::new(&mut data[..])?.set_crc()?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time_signal_section(pts: u64) -> Vec<u8> {
        let command = TimeSignal {
            splice_time: Some(pts),
        }
        .encode();
        build_splice_info(0, SpliceCommandType::TimeSignal, &command, &[]).unwrap()
    }

    #[test]
    fn test_scte35_time_signal() {
        let data = time_signal_section(90000);
        let section = SpliceInfoSection::parse(&data).unwrap();
        assert!(section.validate());
        assert_eq!(section.table_id(), SCTE35_TABLE_ID);
        assert_eq!(section.protocol_version(), 0);
        assert!(!section.encrypted_packet());
        assert_eq!(section.tier(), 0xFFF);
        assert_eq!(section.splice_command_length(), 5);
        assert_eq!(section.splice_command_type(), SpliceCommandType::TimeSignal);
        assert_eq!(
            section.splice_command().unwrap(),
            SpliceCommand::TimeSignal(TimeSignal {
                splice_time: Some(90000)
            })
        );
        assert_eq!(section.descriptors().unwrap().count(), 0);
    }

    #[test]
    fn test_scte35_splice_null() {
        let data = build_splice_info(0, SpliceCommandType::SpliceNull, &[], &[]).unwrap();
        assert_eq!(&data[..3], &[0xFC, 0x30, 0x11]);
        let section = SpliceInfoSection::parse(&data).unwrap();
        assert!(section.validate());
        assert_eq!(section.splice_command().unwrap(), SpliceCommand::SpliceNull);
    }

    #[test]
    fn test_scte35_splice_insert() {
        let insert = SpliceInsert {
            splice_event_id: 1,
            out_of_network_indicator: true,
            program_splice_flag: true,
            splice_time: Some(0),
            duration: Some(BreakDuration {
                auto_return: true,
                duration: 2_700_000,
            }),
            unique_program_id: 7,
            avail_num: 1,
            avails_expected: 2,
            ..Default::default()
        };
        let command = insert.encode();
        assert_eq!(command.len(), 20);
        let data = build_splice_info(0, SpliceCommandType::SpliceInsert, &command, &[]).unwrap();
        let section = SpliceInfoSection::parse(&data).unwrap();
        assert!(section.validate());
        assert_eq!(
            section.splice_command().unwrap(),
            SpliceCommand::SpliceInsert(insert)
        );
    }

    #[test]
    fn test_component_splice_insert() {
        let insert = SpliceInsert {
            splice_event_id: 0x4800_0008,
            components: vec![
                SpliceComponent {
                    component_tag: 1,
                    splice_time: Some(0x1_0000_0000),
                },
                SpliceComponent {
                    component_tag: 2,
                    splice_time: None,
                },
            ],
            ..Default::default()
        };
        let command = insert.encode();
        let (decoded, consumed) = SpliceInsert::decode(&command).unwrap();
        assert_eq!(decoded, insert);
        assert_eq!(consumed, command.len());
    }

    #[test]
    fn test_cancelled_insert_is_short() {
        let insert = SpliceInsert {
            splice_event_id: 9,
            splice_event_cancel_indicator: true,
            ..Default::default()
        };
        assert_eq!(insert.encode(), vec![0, 0, 0, 9, 0xFF]);
        assert_eq!(SpliceInsert::decode(&insert.encode()).unwrap().1, 5);
    }

    #[test]
    fn test_legacy_command_length() {
        let mut data = time_signal_section(45000);
        data[11] |= 0x0F;
        data[12] = 0xFF;
        let mut section = SpliceInfoSection::new(&mut data[..]).unwrap();
        section.set_crc().unwrap();

        let section = SpliceInfoSection::parse(&data).unwrap();
        assert_eq!(
            section.splice_command_length(),
            SPLICE_COMMAND_LENGTH_UNKNOWN
        );
        assert_eq!(section.command().map(<[u8]>::len), Some(5));
        assert!(section.validate());
    }

    #[test]
    fn test_descriptor_loop() {
        // avail_descriptor: tag 0, identifier CUEI, provider_avail_id 0x135
        let avail = [0x00, 0x08, b'C', b'U', b'E', b'I', 0x00, 0x00, 0x01, 0x35];
        let data = build_splice_info(0, SpliceCommandType::SpliceNull, &[], &avail).unwrap();
        let section = SpliceInfoSection::parse(&data).unwrap();
        assert!(section.validate());
        assert_eq!(section.descriptor_loop_length(), Some(10));
        let loop_ = section.descriptors().unwrap();
        assert_eq!(loop_.count(), 1);
        assert_eq!(loop_.nth(0).unwrap().tag(), 0x00);
    }

    #[test]
    fn test_validate_rejects() {
        let mut data = time_signal_section(90000);
        data[20] ^= 0x01;
        assert!(!SpliceInfoSection::parse(&data).unwrap().validate());

        // command length past the descriptor loop
        let mut data = time_signal_section(90000);
        data[12] = 0x20;
        let mut section = SpliceInfoSection::new(&mut data[..]).unwrap();
        section.set_crc().unwrap();
        let section = SpliceInfoSection::parse(&data).unwrap();
        assert!(section.command().is_none());
        assert!(!section.validate());
    }

    #[test]
    fn test_scte35_invalid_table_id() {
        let data = vec![0x00; 20];
        assert!(matches!(
            SpliceInfoSection::parse(&data),
            Err(TsError::InvalidTableId { actual: 0x00, .. })
        ));
        let data = [0xFC, 0x30, 0x40, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(SpliceInfoSection::parse(&data).is_err());
    }

    #[test]
    fn test_pts_adjustment() {
        let data =
            build_splice_info(0x1_2345_6789, SpliceCommandType::SpliceNull, &[], &[]).unwrap();
        let section = SpliceInfoSection::parse(&data).unwrap();
        assert_eq!(section.pts_adjustment(), 0x1_2345_6789);
        assert!(section.validate());
    }
}
