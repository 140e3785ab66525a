//! IPv4 header (RFC 791 section 3.1) and the Internet checksum (RFC 1071).

use std::net::Ipv4Addr;

use bitfield::{BitField, LengthField, RecordLayout, layout};

use crate::{IetfError, Result};

pub const IPV4_HEADER_SIZE: usize = 20;
pub const IPV4_VERSION: u8 = 4;
pub const IPPROTO_UDP: u8 = 17;

/// IHL counts the whole header, options included, in 32-bit words.
pub const IPV4_HEADER_RECORD: RecordLayout =
    RecordLayout::new(0, LengthField::units(BitField::new(0, 4, 4), 4));

layout! {
    /// IPv4 header.
    pub struct Ipv4Header[IPV4_HEADER_SIZE] {
        version, set_version: u8 = (0, 0, 4);
        ihl, set_ihl: u8 = (0, 4, 4);
        dscp, set_dscp: u8 = (1, 0, 6);
        ecn, set_ecn: u8 = (1, 6, 2);
        total_length, set_total_length: u16 = (2, 0, 16);
        identification, set_identification: u16 = (4, 0, 16);
        reserved_flag, set_reserved_flag: bool = (6, 0, 1);
        dont_fragment, set_dont_fragment: bool = (6, 1, 1);
        more_fragments, set_more_fragments: bool = (6, 2, 1);
        /// In units of 8 bytes.
        fragment_offset, set_fragment_offset: u16 = (6, 3, 13);
        ttl, set_ttl: u8 = (8, 0, 8);
        protocol, set_protocol: u8 = (9, 0, 8);
        checksum, set_checksum: u16 = (10, 0, 16);
        source_raw, set_source_raw: u32 = (12, 0, 32);
        destination_raw, set_destination_raw: u32 = (16, 0, 32);
    }
}

/// One's complement sum of 16-bit words, folded to 16 bits. An odd
/// trailing byte is padded with zero.
fn ones_complement_sum(data: &[u8]) -> u16 {
    let mut sum: u32 = data
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]) as u32)
        .sum();
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum as u16
}

/// Internet checksum (RFC 1071) of `data`.
pub fn internet_checksum(data: &[u8]) -> u16 {
    !ones_complement_sum(data)
}

impl<B: AsRef<[u8]>> Ipv4Header<B> {
    /// Wrap `buf` after checking version, IHL, lengths and checksum.
    pub fn parse(buf: B) -> Result<Self> {
        let header = Self::new(buf)?;
        if header.version() != IPV4_VERSION {
            return Err(IetfError::InvalidVersion(header.version()));
        }
        if header.ihl() < 5 || !IPV4_HEADER_RECORD.validate(header.as_bytes()) {
            return Err(IetfError::InvalidHeaderLength(header.ihl()));
        }
        let computed = header.compute_checksum();
        if computed != header.checksum() {
            return Err(IetfError::ChecksumMismatch {
                stored: header.checksum(),
                computed,
            });
        }
        if !header.validate() {
            return Err(IetfError::Overrun {
                header: header.header_len(),
                padding: 0,
                available: header.as_bytes().len(),
            });
        }
        Ok(header)
    }

    pub fn header_len(&self) -> usize {
        self.ihl() as usize * 4
    }

    pub fn source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.source_raw())
    }

    pub fn destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.destination_raw())
    }

    pub fn options(&self) -> Option<&[u8]> {
        self.as_bytes().get(IPV4_HEADER_SIZE..self.header_len())
    }

    /// Payload bounded by the total length.
    pub fn payload(&self) -> Option<&[u8]> {
        let total = self.total_length() as usize;
        if total < self.header_len() {
            return None;
        }
        self.as_bytes().get(self.header_len()..total)
    }

    /// Checksum over the header with the checksum field taken as zero.
    pub fn compute_checksum(&self) -> u16 {
        let len = self.header_len().max(IPV4_HEADER_SIZE);
        let Some(header) = self.as_bytes().get(..len) else {
            return 0;
        };
        let head = ones_complement_sum(&header[..10]) as u32;
        let tail = ones_complement_sum(&header[12..]) as u32;
        let mut sum = head + tail;
        if sum > 0xFFFF {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
        !(sum as u16)
    }

    /// Summing the header including the stored checksum gives zero.
    pub fn check_checksum(&self) -> bool {
        self.as_bytes()
            .get(..self.header_len())
            .is_some_and(|header| internet_checksum(header) == 0)
    }

    /// Version 4, IHL of at least five words inside the buffer, a total
    /// length covering the header and inside the buffer, the reserved flag
    /// clear and a correct checksum.
    pub fn validate(&self) -> bool {
        let available = self.as_bytes().len();
        let total = self.total_length() as usize;
        self.version() == IPV4_VERSION
            && self.ihl() >= 5
            && IPV4_HEADER_RECORD.validate(self.as_bytes())
            && total >= self.header_len()
            && total <= available
            && !self.reserved_flag()
            && self.check_checksum()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Ipv4Header<B> {
    /// Five-word header, version 4, TTL 64 and everything else zero.
    pub fn init(&mut self) {
        self.as_bytes_mut()[..IPV4_HEADER_SIZE].fill(0);
        self.set_version(IPV4_VERSION);
        self.set_ihl(5);
        self.set_ttl(64);
    }

    pub fn set_source(&mut self, address: Ipv4Addr) {
        self.set_source_raw(u32::from(address));
    }

    pub fn set_destination(&mut self, address: Ipv4Addr) {
        self.set_destination_raw(u32::from(address));
    }

    /// Recompute and store the header checksum.
    pub fn update_checksum(&mut self) {
        let checksum = self.compute_checksum();
        self.set_checksum(checksum);
    }
}
