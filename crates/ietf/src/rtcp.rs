//! RTCP packet header and extended reports (RFC 3550 section 6.4, RFC 3611
//! section 2 to 4.5).
//!
//! RTCP packets and XR report blocks both count their length in 32-bit
//! words, so a compound packet and the block list of an XR packet are walked
//! the same way.

use bitfield::{BitField, LengthField, RecordLayout, RecordSeq, layout};

use crate::{IetfError, Result};

pub const RTCP_HEADER_SIZE: usize = 4;
pub const RTCP_VERSION: u8 = 2;
pub const RTCP_PT_XR: u8 = 207;
pub const XR_HEADER_SIZE: usize = 8;

/// Block types of RFC 3611 section 4.
pub const XR_BLOCK_RRT: u8 = 4;
pub const XR_BLOCK_DLRR: u8 = 5;

/// Length field: 32-bit words minus one, so the words after the header.
pub const RTCP_PACKET_RECORD: RecordLayout =
    RecordLayout::new(RTCP_HEADER_SIZE, LengthField::units(BitField::bytes(2, 2), 4));
/// Report block: the length counts words after the 4-byte block header.
pub const XR_BLOCK_RECORD: RecordLayout =
    RecordLayout::new(4, LengthField::units(BitField::bytes(2, 2), 4));
pub const DLRR_SUB_BLOCK: RecordLayout = RecordLayout::fixed(12);

layout! {
    /// Common RTCP header.
    pub struct RtcpHeader[RTCP_HEADER_SIZE] {
        version, set_version: u8 = (0, 0, 2);
        padding, set_padding: bool = (0, 2, 1);
        /// Reception report count or subtype, per packet type.
        count, set_count: u8 = (0, 3, 5);
        packet_type, set_packet_type: u8 = (1, 0, 8);
        length, set_length: u16 = (2, 0, 16);
    }
}

/// The packets of a compound RTCP packet.
pub fn compound(data: &[u8]) -> RecordSeq<'_> {
    RecordSeq::new(&RTCP_PACKET_RECORD, data)
}

layout! {
    /// Extended report packet header.
    pub struct XrPacket[XR_HEADER_SIZE] {
        version, set_version: u8 = (0, 0, 2);
        padding, set_padding: bool = (0, 2, 1);
        reserved, set_reserved: u8 = (0, 3, 5);
        packet_type, set_packet_type: u8 = (1, 0, 8);
        length, set_length: u16 = (2, 0, 16);
        ssrc, set_ssrc: u32 = (4, 0, 32);
    }
}

impl<B: AsRef<[u8]>> XrPacket<B> {
    pub fn parse(buf: B) -> Result<Self> {
        let packet = Self::new(buf)?;
        if packet.version() != RTCP_VERSION {
            return Err(IetfError::InvalidVersion(packet.version()));
        }
        if packet.packet_type() != RTCP_PT_XR {
            return Err(IetfError::InvalidPayloadType(packet.packet_type()));
        }
        Ok(packet)
    }

    /// Packet bytes up to its declared length.
    pub fn packet(&self) -> Option<&[u8]> {
        RTCP_PACKET_RECORD.split(self.as_bytes())
    }

    /// Report blocks; empty when the packet overruns the buffer.
    pub fn blocks(&self) -> RecordSeq<'_> {
        let blocks = self
            .packet()
            .and_then(|packet| packet.get(XR_HEADER_SIZE..))
            .unwrap_or_default();
        RecordSeq::new(&XR_BLOCK_RECORD, blocks)
    }

    /// First block of `block_type`.
    pub fn find_block(&self, block_type: u8) -> Option<&[u8]> {
        self.blocks().iter().find(|block| block[0] == block_type)
    }

    /// Version 2 XR packet inside the buffer, blocks filling it exactly,
    /// and RRT and DLRR blocks of the right length.
    pub fn validate(&self) -> bool {
        if self.version() != RTCP_VERSION || self.packet_type() != RTCP_PT_XR {
            return false;
        }
        let Some(packet) = self.packet() else {
            return false;
        };
        if packet.len() < XR_HEADER_SIZE {
            return false;
        }
        let blocks = self.blocks();
        blocks.validate()
            && blocks.iter().all(|block| match block[0] {
                XR_BLOCK_RRT => RrtBlock::new(block).is_ok_and(|rrt| rrt.validate()),
                XR_BLOCK_DLRR => DlrrBlock::new(block).is_ok_and(|dlrr| dlrr.validate()),
                _ => true,
            })
    }
}

layout! {
    /// Receiver reference time report block.
    pub struct RrtBlock[12] {
        block_type, set_block_type: u8 = (0, 0, 8);
        reserved, set_reserved: u8 = (1, 0, 8);
        block_length, set_block_length: u16 = (2, 0, 16);
        ntp_msw, set_ntp_msw: u32 = (4, 0, 32);
        ntp_lsw, set_ntp_lsw: u32 = (8, 0, 32);
    }
}

impl<B: AsRef<[u8]>> RrtBlock<B> {
    /// 64-bit NTP timestamp.
    pub fn ntp_timestamp(&self) -> u64 {
        ((self.ntp_msw() as u64) << 32) | self.ntp_lsw() as u64
    }

    pub fn validate(&self) -> bool {
        self.block_type() == XR_BLOCK_RRT && self.block_length() == 2
    }
}

layout! {
    /// DLRR report block header; 12-byte sub-blocks follow.
    pub struct DlrrBlock[4] {
        block_type, set_block_type: u8 = (0, 0, 8);
        reserved, set_reserved: u8 = (1, 0, 8);
        block_length, set_block_length: u16 = (2, 0, 16);
    }
}

layout! {
    /// One receiver of a DLRR block.
    pub struct DlrrSubBlock[12] {
        ssrc, set_ssrc: u32 = (0, 0, 32);
        last_rr, set_last_rr: u32 = (4, 0, 32);
        delay_since_last_rr, set_delay_since_last_rr: u32 = (8, 0, 32);
    }
}

impl<B: AsRef<[u8]>> DlrrBlock<B> {
    pub fn sub_blocks(&self) -> impl Iterator<Item = DlrrSubBlock<&[u8]>> {
        let data = XR_BLOCK_RECORD
            .split(self.as_bytes())
            .map(|block| &block[4..])
            .unwrap_or_default();
        RecordSeq::new(&DLRR_SUB_BLOCK, data)
            .iter()
            .filter_map(|bytes| DlrrSubBlock::new(bytes).ok())
    }

    pub fn validate(&self) -> bool {
        self.block_type() == XR_BLOCK_DLRR
            && self.block_length() % 3 == 0
            && XR_BLOCK_RECORD.validate(self.as_bytes())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> XrPacket<B> {
    /// Set the length field from the block bytes that follow the header.
    pub fn set_blocks_length(&mut self, blocks_len: usize) -> Result<()> {
        let declared = XR_HEADER_SIZE - RTCP_HEADER_SIZE + blocks_len;
        RTCP_PACKET_RECORD.set_declared_length(self.as_bytes_mut(), declared)?;
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    fn xr_packet() -> Vec<u8> {
        let mut bytes = vec![0x80, 207, 0x00, 0x00, 0x11, 0x22, 0x33, 0x44];
        bytes.extend([XR_BLOCK_RRT, 0, 0x00, 0x02, 0xE0, 0x00, 0x00, 0x01, 0x80, 0, 0, 0]);
        bytes.extend([XR_BLOCK_DLRR, 0, 0x00, 0x03]);
        bytes.extend([0, 0, 0, 9, 0, 0, 0, 1, 0, 0, 0, 2]);
        bytes.extend([0x42, 0, 0x00, 0x00]); // unknown type, no payload
        let blocks_len = bytes.len() - XR_HEADER_SIZE;
        XrPacket::new(&mut bytes[..])
            .unwrap()
            .set_blocks_length(blocks_len)
            .unwrap();
        bytes
    }

    #[test]
    fn test_xr_blocks() {
        let bytes = xr_packet();
        assert_eq!(&bytes[2..4], &[0x00, 0x09]);
        let xr = XrPacket::parse(&bytes[..]).unwrap();
        assert_eq!(xr.ssrc(), 0x1122_3344);
        assert_eq!(xr.blocks().count(), 3);
        assert!(xr.validate());

        let rrt = RrtBlock::new(xr.find_block(XR_BLOCK_RRT).unwrap()).unwrap();
        assert_eq!(rrt.ntp_timestamp(), 0xE000_0001_8000_0000);

        let dlrr = DlrrBlock::new(xr.find_block(XR_BLOCK_DLRR).unwrap()).unwrap();
        let receivers: Vec<_> = dlrr
            .sub_blocks()
            .map(|sub| (sub.ssrc(), sub.last_rr(), sub.delay_since_last_rr()))
            .collect();
        assert_eq!(receivers, vec![(9, 1, 2)]);
    }

    #[test]
    fn test_xr_block_corruption() {
        let mut bytes = xr_packet();
        // RRT claims three words: walk no longer lands on the packet end
        bytes[11] = 0x03;
        let xr = XrPacket::parse(&bytes[..]).unwrap();
        assert!(!xr.validate());

        let mut bytes = xr_packet();
        bytes[23] = 0x02; // DLRR of two words
        assert!(!XrPacket::parse(&bytes[..]).unwrap().validate());
    }

    #[test]
    fn test_xr_rejects() {
        let mut bytes = xr_packet();
        bytes[1] = 200;
        assert_eq!(
            XrPacket::parse(&bytes[..]).unwrap_err(),
            IetfError::InvalidPayloadType(200)
        );

        let mut bytes = xr_packet();
        bytes[3] += 1;
        let xr = XrPacket::parse(&bytes[..]).unwrap();
        assert!(xr.packet().is_none());
        assert_eq!(xr.blocks().count(), 0);
        assert!(!xr.validate());
    }

    #[test]
    fn test_compound() {
        let mut data = vec![0x80, 200, 0x00, 0x01, 0, 0, 0, 1];
        data.extend(xr_packet());
        let packets = compound(&data);
        assert_eq!(packets.count(), 2);
        assert!(packets.validate());
        let second = RtcpHeader::new(packets.nth(1).unwrap()).unwrap();
        assert_eq!(second.packet_type(), RTCP_PT_XR);

        data.pop();
        assert!(!compound(&data).validate());
        assert_eq!(compound(&data).count(), 1);
    }
}
