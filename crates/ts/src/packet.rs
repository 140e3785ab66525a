use bitfield::layout;

use crate::adaptation_field::{ADAPTATION_FIELD_RECORD, AdaptationField};
use crate::{Result, TsError};

pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const TS_SYNC_BYTE: u8 = 0x47;
/// Largest payload: a packet with no adaptation field.
pub const TS_MAX_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - TS_HEADER_SIZE;

/// PAT PID (always 0x0000)
pub const PID_PAT: u16 = 0x0000;
/// CAT PID (always 0x0001)
pub const PID_CAT: u16 = 0x0001;
/// TSDT PID
pub const PID_TSDT: u16 = 0x0002;
/// DVB NIT PID
pub const PID_NIT: u16 = 0x0010;
/// DVB SDT and BAT PID
pub const PID_SDT: u16 = 0x0011;
/// DVB EIT PID
pub const PID_EIT: u16 = 0x0012;
/// DVB RST PID
pub const PID_RST: u16 = 0x0013;
/// DVB TDT and TOT PID
pub const PID_TDT: u16 = 0x0014;
/// NULL PID (always 0x1FFF)
pub const PID_NULL: u16 = 0x1FFF;

layout! {
    /// MPEG-2 transport packet (ISO/IEC 13818-1 2.4.3.2).
    ///
    /// The view needs only the four header bytes; [`TsPacket::parse`] also
    /// insists on a full 188-byte packet and a valid sync byte.
    pub struct TsPacket[TS_HEADER_SIZE] {
        sync_byte, set_sync_byte: u8 = (0, 0, 8);
        transport_error, set_transport_error: bool = (1, 0, 1);
        unit_start, set_unit_start: bool = (1, 1, 1);
        transport_priority, set_transport_priority: bool = (1, 2, 1);
        pid, set_pid: u16 = (1, 3, 13);
        scrambling, set_scrambling: u8 = (3, 0, 2);
        has_adaptation, set_has_adaptation: bool = (3, 2, 1);
        has_payload, set_has_payload: bool = (3, 3, 1);
        continuity_counter, set_continuity_counter: u8 = (3, 4, 4);
    }
}

impl<'a> TsPacket<&'a [u8]> {
    /// Wrap exactly one 188-byte packet.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() != TS_PACKET_SIZE {
            return Err(TsError::InvalidPacketSize(data.len()));
        }
        let packet = TsPacket::new(data)?;
        if packet.sync_byte() != TS_SYNC_BYTE {
            return Err(TsError::InvalidSyncByte(packet.sync_byte()));
        }
        Ok(packet)
    }

    /// Payload bytes, borrowed for the lifetime of the underlying buffer.
    pub fn payload_bytes(&self) -> Option<&'a [u8]> {
        let offset = self.payload_offset()?;
        self.into_inner().get(offset..)
    }
}

impl<B: AsRef<[u8]>> TsPacket<B> {
    /// Sync byte present and the adaptation field, if any, inside the packet.
    pub fn validate(&self) -> bool {
        if self.sync_byte() != TS_SYNC_BYTE {
            return false;
        }
        if !self.has_adaptation() {
            return true;
        }
        self.as_bytes()
            .get(TS_HEADER_SIZE..)
            .is_some_and(|rest| ADAPTATION_FIELD_RECORD.validate(rest))
    }

    /// Value of the adaptation_field_length byte, if the packet has one.
    pub fn adaptation_length(&self) -> Option<u8> {
        if !self.has_adaptation() {
            return None;
        }
        self.as_bytes().get(TS_HEADER_SIZE).copied()
    }

    /// Adaptation field view, absent when the field is zero-length (a single
    /// stuffing byte) or runs past the packet.
    pub fn adaptation_field(&self) -> Option<AdaptationField<&[u8]>> {
        let length = self.adaptation_length()? as usize;
        if length == 0 {
            return None;
        }
        let end = TS_HEADER_SIZE + 1 + length;
        AdaptationField::new(self.as_bytes().get(TS_HEADER_SIZE..end)?).ok()
    }

    pub fn has_random_access_indicator(&self) -> bool {
        self.adaptation_field()
            .is_some_and(|af| af.random_access())
    }

    pub fn has_discontinuity(&self) -> bool {
        self.adaptation_field()
            .is_some_and(|af| af.discontinuity())
    }

    /// Offset of the payload, `None` when the packet has no payload or the
    /// adaptation field consumes the whole packet.
    pub fn payload_offset(&self) -> Option<usize> {
        if !self.has_payload() {
            return None;
        }
        let offset = match self.adaptation_length() {
            Some(length) => TS_HEADER_SIZE + 1 + length as usize,
            None if self.has_adaptation() => return None,
            None => TS_HEADER_SIZE,
        };
        (offset < self.as_bytes().len()).then_some(offset)
    }

    pub fn payload(&self) -> Option<&[u8]> {
        let offset = self.payload_offset()?;
        self.as_bytes().get(offset..)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> TsPacket<B> {
    /// Reset the header to a sync byte, PID 0, no flags.
    pub fn init(&mut self) {
        let bytes = self.as_bytes_mut();
        bytes[..TS_HEADER_SIZE].copy_from_slice(&[TS_SYNC_BYTE, 0, 0, 0]);
    }

    /// Give the packet an adaptation field of `length` bytes after the
    /// length byte, with all its flags cleared.
    pub fn set_adaptation_length(&mut self, length: u8) -> Result<()> {
        let needed = TS_HEADER_SIZE + 1 + length as usize;
        let available = self.as_bytes().len();
        if needed > available {
            return Err(TsError::InsufficientData {
                expected: needed,
                actual: available,
            });
        }
        self.set_has_adaptation(true);
        let bytes = self.as_bytes_mut();
        bytes[TS_HEADER_SIZE] = length;
        if length > 0 {
            bytes[TS_HEADER_SIZE + 1] = 0;
            bytes[TS_HEADER_SIZE + 2..needed].fill(0xFF);
        }
        Ok(())
    }

    /// Writable adaptation field, if present and non-empty.
    pub fn adaptation_field_mut(&mut self) -> Option<AdaptationField<&mut [u8]>> {
        let length = self.adaptation_length()? as usize;
        if length == 0 {
            return None;
        }
        let end = TS_HEADER_SIZE + 1 + length;
        AdaptationField::new(self.as_bytes_mut().get_mut(TS_HEADER_SIZE..end)?).ok()
    }

    /// Payload bytes, writable.
    pub fn payload_mut(&mut self) -> Option<&mut [u8]> {
        let offset = self.payload_offset()?;
        self.as_bytes_mut().get_mut(offset..)
    }

    /// Fill the payload area with stuffing bytes.
    pub fn pad(&mut self) {
        if let Some(payload) = self.payload_mut() {
            payload.fill(0xFF);
        }
    }
}

/// Continuity counter status for a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuityStatus {
    /// First packet seen for this PID
    Initial,
    /// Continuity is correct
    Ok,
    /// Discontinuity detected
    Discontinuity { expected: u8, actual: u8 },
    /// Duplicate packet (same CC as previous)
    Duplicate,
}

/// Continuity counter handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContinuityMode {
    /// Do not evaluate continuity counters.
    #[default]
    Disabled,
    /// Validate continuity counters and continue parsing while reporting issues.
    Warn,
    /// Validate continuity counters and fail parsing on the first issue.
    Strict,
}

/// Compare a packet's counter against the previous one on its PID.
///
/// The counter advances only on packets with a payload; packets without one
/// must repeat it. One duplicate of a payload packet is allowed.
pub fn check_continuity(last_cc: Option<u8>, has_payload: bool, cc: u8) -> ContinuityStatus {
    let Some(last_cc) = last_cc else {
        return ContinuityStatus::Initial;
    };
    if !has_payload {
        return if cc == last_cc {
            ContinuityStatus::Ok
        } else {
            ContinuityStatus::Discontinuity {
                expected: last_cc,
                actual: cc,
            }
        };
    }
    let expected = (last_cc + 1) & 0x0F;
    if cc == expected {
        ContinuityStatus::Ok
    } else if cc == last_cc {
        ContinuityStatus::Duplicate
    } else {
        ContinuityStatus::Discontinuity {
            expected,
            actual: cc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with_header(header: [u8; 4]) -> Vec<u8> {
        let mut data = vec![0xFFu8; TS_PACKET_SIZE];
        data[..4].copy_from_slice(&header);
        data
    }

    #[test]
    fn test_header_fields() {
        let data = packet_with_header([0x47, 0x41, 0x00, 0x10]);
        let packet = TsPacket::parse(&data).unwrap();
        assert_eq!(packet.sync_byte(), 0x47);
        assert!(packet.validate());
        assert!(packet.unit_start());
        assert!(!packet.transport_error());
        assert_eq!(packet.pid(), 0x0100);
        assert!(packet.has_payload());
        assert!(!packet.has_adaptation());
        assert_eq!(packet.continuity_counter(), 0);
        assert_eq!(packet.payload_offset(), Some(4));
        assert_eq!(packet.payload_bytes().map(<[u8]>::len), Some(184));
    }

    #[test]
    fn test_set_pid_keeps_flags() {
        let mut data = [0x47, 0x41, 0x00, 0x10];
        let mut packet = TsPacket::new(&mut data[..]).unwrap();
        packet.set_pid(0x1FFF);
        assert_eq!(data, [0x47, 0x5F, 0xFF, 0x10]);

        let mut data = [0x47, 0x01, 0x00, 0x10];
        TsPacket::new(&mut data[..]).unwrap().set_pid(0x1FFF);
        assert_eq!(data, [0x47, 0x1F, 0xFF, 0x10]);
    }

    #[test]
    fn test_parse_rejects() {
        let mut data = packet_with_header([0x46, 0x00, 0x00, 0x10]);
        assert!(matches!(
            TsPacket::parse(&data),
            Err(TsError::InvalidSyncByte(0x46))
        ));
        data.truncate(187);
        assert!(matches!(
            TsPacket::parse(&data),
            Err(TsError::InvalidPacketSize(187))
        ));
    }

    #[test]
    fn test_adaptation_and_payload() {
        let mut data = vec![0u8; TS_PACKET_SIZE];
        let mut packet = TsPacket::new(&mut data[..]).unwrap();
        packet.init();
        packet.set_pid(0x0100);
        packet.set_has_payload(true);
        packet.set_adaptation_length(7).unwrap();
        {
            let mut af = packet.adaptation_field_mut().unwrap();
            af.set_random_access(true);
            af.set_pcr_flag(true);
            af.write_pcr(crate::Pcr {
                base: 90_000,
                extension: 0,
            })
            .unwrap();
        }
        packet.pad();

        let packet = TsPacket::parse(&data).unwrap();
        assert!(packet.validate());
        assert!(packet.has_random_access_indicator());
        assert_eq!(packet.adaptation_length(), Some(7));
        assert_eq!(packet.payload_offset(), Some(12));
        assert_eq!(
            packet.adaptation_field().and_then(|af| af.pcr()).map(|p| p.base),
            Some(90_000)
        );
        assert!(packet.payload().unwrap().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_adaptation_overrun_invalid() {
        let mut data = packet_with_header([0x47, 0x00, 0x00, 0x30]);
        data[4] = 184;
        let packet = TsPacket::parse(&data).unwrap();
        assert!(!packet.validate());
        assert_eq!(packet.payload_offset(), None);

        data[4] = 183;
        let packet = TsPacket::parse(&data).unwrap();
        assert!(packet.validate());
        assert_eq!(packet.payload_offset(), None);
    }

    #[test]
    fn test_continuity() {
        assert_eq!(check_continuity(None, true, 3), ContinuityStatus::Initial);
        assert_eq!(check_continuity(Some(3), true, 4), ContinuityStatus::Ok);
        assert_eq!(check_continuity(Some(15), true, 0), ContinuityStatus::Ok);
        assert_eq!(check_continuity(Some(3), true, 3), ContinuityStatus::Duplicate);
        assert_eq!(
            check_continuity(Some(3), true, 6),
            ContinuityStatus::Discontinuity {
                expected: 4,
                actual: 6
            }
        );
        assert_eq!(check_continuity(Some(3), false, 3), ContinuityStatus::Ok);
    }
}
