//! SMPTE RDD 8 subtitling distribution packet (OP-47), which carries up to
//! five WST teletext packets in VANC.
//!
//! ```text
//! identifier 0x51 0x15 | length | format code | 5 packet descriptors
//! 45-byte teletext packet * n
//! footer 0x74 | sequence counter (16) | checksum
//! ```
//!
//! The length counts the whole packet, and all of its bytes sum to zero
//! modulo 256.

use bitfield::layout;

use crate::{Result, SmpteError};

pub const RDD8_IDENTIFIER: u16 = 0x5115;
pub const RDD8_HEADER_SIZE: usize = 9;
pub const RDD8_DESCRIPTORS: usize = 5;
pub const RDD8_TELETEXT_SIZE: usize = 45;
pub const RDD8_FOOTER_ID: u8 = 0x74;
/// Footer id, sequence counter and checksum.
pub const RDD8_FOOTER_SIZE: usize = 4;
pub const RDD8_FORMAT_WST: u8 = 0x02;

const DESCRIPTOR_OFFSET: usize = 4;

layout! {
    /// Subtitling distribution packet header.
    pub struct SubtitlePacket[RDD8_HEADER_SIZE] {
        identifier, set_identifier: u16 = (0, 0, 16);
        length, set_length: u8 = (2, 0, 8);
        format_code, set_format_code: u8 = (3, 0, 8);
    }
}

layout! {
    /// Placement of one teletext packet in the VBI.
    pub struct PacketDescriptor[1] {
        odd_field, set_odd_field: bool = (0, 0, 1);
        reserved, set_reserved: u8 = (0, 1, 2);
        /// Zero when the slot carries no packet.
        line_number, set_line_number: u8 = (0, 3, 5);
    }
}

impl<B: AsRef<[u8]>> PacketDescriptor<B> {
    pub fn is_present(&self) -> bool {
        self.line_number() != 0
    }
}

fn byte_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

impl<B: AsRef<[u8]>> SubtitlePacket<B> {
    /// Wrap `buf` after checking identifier, length, footer and checksum.
    pub fn parse(buf: B) -> Result<Self> {
        let packet = Self::new(buf)?;
        packet.check()?;
        Ok(packet)
    }

    fn check(&self) -> Result<()> {
        if self.identifier() != RDD8_IDENTIFIER {
            return Err(SmpteError::InvalidSync(self.identifier() as u32));
        }
        let len = self.packet_len();
        if len != self.expected_len() {
            return Err(SmpteError::InvalidLength(len));
        }
        let available = self.as_bytes().len();
        if len > available {
            return Err(SmpteError::Overrun {
                needed: len,
                available,
            });
        }
        match self.footer() {
            Some(RDD8_FOOTER_ID) => {}
            other => return Err(SmpteError::InvalidFooter(other.unwrap_or_default())),
        }
        if !self.check_checksum() {
            return Err(SmpteError::ChecksumMismatch {
                stored: self.checksum().unwrap_or_default() as u16,
                computed: self.compute_checksum().unwrap_or_default() as u16,
            });
        }
        Ok(())
    }

    pub fn descriptor(&self, n: usize) -> Option<PacketDescriptor<&[u8]>> {
        if n >= RDD8_DESCRIPTORS {
            return None;
        }
        let offset = DESCRIPTOR_OFFSET + n;
        PacketDescriptor::new(&self.as_bytes()[offset..offset + 1]).ok()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = PacketDescriptor<&[u8]>> + '_ {
        (0..RDD8_DESCRIPTORS).filter_map(|n| self.descriptor(n))
    }

    /// Teletext packets announced by the descriptors.
    pub fn packet_count(&self) -> usize {
        self.descriptors().filter(|d| d.is_present()).count()
    }

    /// Length implied by the descriptors.
    pub fn expected_len(&self) -> usize {
        RDD8_HEADER_SIZE + self.packet_count() * RDD8_TELETEXT_SIZE + RDD8_FOOTER_SIZE
    }

    /// Length declared in the header.
    pub fn packet_len(&self) -> usize {
        self.length() as usize
    }

    pub fn teletext_packet(&self, n: usize) -> Option<&[u8]> {
        if n >= self.packet_count() {
            return None;
        }
        let offset = RDD8_HEADER_SIZE + n * RDD8_TELETEXT_SIZE;
        self.as_bytes().get(offset..offset + RDD8_TELETEXT_SIZE)
    }

    pub fn teletext_packets(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.packet_count()).map_while(|n| self.teletext_packet(n))
    }

    fn footer_bytes(&self) -> Option<&[u8]> {
        let len = self.packet_len();
        self.as_bytes()
            .get(len.checked_sub(RDD8_FOOTER_SIZE)?..len)
    }

    pub fn footer(&self) -> Option<u8> {
        self.footer_bytes().map(|footer| footer[0])
    }

    pub fn sequence_counter(&self) -> Option<u16> {
        self.footer_bytes()
            .map(|footer| u16::from_be_bytes([footer[1], footer[2]]))
    }

    pub fn checksum(&self) -> Option<u8> {
        self.footer_bytes().map(|footer| footer[3])
    }

    /// Checksum byte that makes the packet sum to zero.
    pub fn compute_checksum(&self) -> Option<u8> {
        let len = self.packet_len();
        let body = self.as_bytes().get(..len.checked_sub(1)?)?;
        Some(0u8.wrapping_sub(byte_sum(body)))
    }

    pub fn check_checksum(&self) -> bool {
        self.as_bytes()
            .get(..self.packet_len())
            .is_some_and(|packet| byte_sum(packet) == 0)
    }

    /// Identifier, length matching the descriptors, footer and checksum
    /// are all correct.
    pub fn validate(&self) -> bool {
        self.check().is_ok()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SubtitlePacket<B> {
    /// Header of an empty packet in `format_code`.
    pub fn init(&mut self, format_code: u8) {
        self.set_identifier(RDD8_IDENTIFIER);
        self.set_format_code(format_code);
        self.as_bytes_mut()[DESCRIPTOR_OFFSET..RDD8_HEADER_SIZE].fill(0);
        self.set_length((RDD8_HEADER_SIZE + RDD8_FOOTER_SIZE) as u8);
    }

    pub fn set_descriptor(&mut self, n: usize, odd_field: bool, line_number: u8) -> Result<()> {
        if n >= RDD8_DESCRIPTORS {
            return Err(SmpteError::InvalidLength(n));
        }
        let offset = DESCRIPTOR_OFFSET + n;
        let mut descriptor = PacketDescriptor::new(&mut self.as_bytes_mut()[offset..offset + 1])?;
        descriptor.set_odd_field(odd_field);
        descriptor.set_line_number(line_number);
        Ok(())
    }

    pub fn teletext_packet_mut(&mut self, n: usize) -> Option<&mut [u8]> {
        if n >= self.packet_count() {
            return None;
        }
        let offset = RDD8_HEADER_SIZE + n * RDD8_TELETEXT_SIZE;
        self.as_bytes_mut().get_mut(offset..offset + RDD8_TELETEXT_SIZE)
    }

    /// Write length, footer, sequence counter and checksum once the
    /// descriptors and teletext packets are in place.
    pub fn finish(&mut self, sequence_counter: u16) -> Result<()> {
        let len = self.expected_len();
        let available = self.as_bytes().len();
        if len > available {
            return Err(SmpteError::Overrun {
                needed: len,
                available,
            });
        }
        self.set_length(len as u8);
        let footer = &mut self.as_bytes_mut()[len - RDD8_FOOTER_SIZE..len];
        footer[0] = RDD8_FOOTER_ID;
        footer[1..3].copy_from_slice(&sequence_counter.to_be_bytes());
        footer[3] = 0;
        let checksum = self.compute_checksum().unwrap_or_default();
        self.as_bytes_mut()[len - 1] = checksum;
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    fn teletext_line(fill: u8) -> [u8; RDD8_TELETEXT_SIZE] {
        let mut line = [fill; RDD8_TELETEXT_SIZE];
        line[..3].copy_from_slice(&[0x55, 0x55, 0x27]);
        line
    }

    fn build(lines: &[(bool, u8)], counter: u16) -> Vec<u8> {
        let mut bytes = vec![0u8; 13 + RDD8_TELETEXT_SIZE * RDD8_DESCRIPTORS];
        let mut packet = SubtitlePacket::new(&mut bytes[..]).unwrap();
        packet.init(RDD8_FORMAT_WST);
        for (n, (odd, line)) in lines.iter().enumerate() {
            packet.set_descriptor(n, *odd, *line).unwrap();
            packet
                .teletext_packet_mut(n)
                .unwrap()
                .copy_from_slice(&teletext_line(n as u8 + 1));
        }
        packet.finish(counter).unwrap();
        let len = packet.packet_len();
        bytes.truncate(len);
        bytes
    }

    #[test]
    fn test_built_packet() {
        let bytes = build(&[(true, 21), (false, 20)], 0x0102);
        assert_eq!(bytes.len(), 103);
        assert_eq!(&bytes[..9], &[0x51, 0x15, 103, 0x02, 0x95, 0x14, 0, 0, 0]);

        let packet = SubtitlePacket::parse(&bytes[..]).unwrap();
        assert_eq!(packet.packet_count(), 2);
        let descriptor = packet.descriptor(0).unwrap();
        assert!(descriptor.odd_field());
        assert_eq!(descriptor.line_number(), 21);
        assert!(!packet.descriptor(1).unwrap().odd_field());
        assert!(!packet.descriptor(2).unwrap().is_present());
        assert!(packet.descriptor(5).is_none());

        let lines: Vec<_> = packet.teletext_packets().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], &teletext_line(2)[..]);
        assert_eq!(packet.teletext_packet(2), None);
        assert_eq!(packet.footer(), Some(RDD8_FOOTER_ID));
        assert_eq!(packet.sequence_counter(), Some(0x0102));
        assert_eq!(packet.checksum(), packet.compute_checksum());
        assert!(packet.validate());
    }

    #[test]
    fn test_empty_packet() {
        let bytes = build(&[], 0);
        assert_eq!(bytes.len(), 13);
        let packet = SubtitlePacket::parse(&bytes[..]).unwrap();
        assert_eq!(packet.packet_count(), 0);
        assert_eq!(packet.teletext_packets().count(), 0);
    }

    #[test]
    fn test_rejects() {
        let bytes = build(&[(true, 7)], 9);

        let mut corrupt = bytes.clone();
        corrupt[20] ^= 0x01;
        assert!(matches!(
            SubtitlePacket::parse(&corrupt[..]),
            Err(SmpteError::ChecksumMismatch { .. })
        ));

        let mut corrupt = bytes.clone();
        corrupt[6] = 0x08;
        assert_eq!(
            SubtitlePacket::parse(&corrupt[..]).unwrap_err(),
            SmpteError::InvalidLength(58)
        );

        let mut corrupt = bytes.clone();
        corrupt[54] = 0x75;
        assert_eq!(
            SubtitlePacket::parse(&corrupt[..]).unwrap_err(),
            SmpteError::InvalidFooter(0x75)
        );

        let mut corrupt = bytes.clone();
        corrupt[1] = 0x16;
        assert_eq!(
            SubtitlePacket::parse(&corrupt[..]).unwrap_err(),
            SmpteError::InvalidSync(0x5116)
        );

        assert!(matches!(
            SubtitlePacket::parse(&bytes[..57]),
            Err(SmpteError::Overrun { needed: 58, .. })
        ));
    }
}
