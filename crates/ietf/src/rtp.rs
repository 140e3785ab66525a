//! RTP fixed header, CSRC list, header extension and padding (RFC 3550
//! section 5.1 and 5.3.1).

use bitfield::{BitField, LengthField, RecordLayout, layout};

use crate::{IetfError, Result};

pub const RTP_HEADER_SIZE: usize = 12;
pub const RTP_VERSION: u8 = 2;

/// Header extension: 16-bit profile data, 16-bit length in 32-bit words.
pub const RTP_EXTENSION_RECORD: RecordLayout =
    RecordLayout::new(4, LengthField::units(BitField::bytes(2, 2), 4));

layout! {
    /// RTP packet. Fields past the fixed header are reached through the
    /// methods, which check the CSRC count and extension length first.
    pub struct RtpHeader[RTP_HEADER_SIZE] {
        version, set_version: u8 = (0, 0, 2);
        padding, set_padding: bool = (0, 2, 1);
        extension, set_extension: bool = (0, 3, 1);
        csrc_count, set_csrc_count: u8 = (0, 4, 4);
        marker, set_marker: bool = (1, 0, 1);
        payload_type, set_payload_type: u8 = (1, 1, 7);
        sequence_number, set_sequence_number: u16 = (2, 0, 16);
        timestamp, set_timestamp: u32 = (4, 0, 32);
        ssrc, set_ssrc: u32 = (8, 0, 32);
    }
}

impl<B: AsRef<[u8]>> RtpHeader<B> {
    /// Wrap `buf` after checking the version and that the CSRC list,
    /// extension and padding fit.
    pub fn parse(buf: B) -> Result<Self> {
        let packet = Self::new(buf)?;
        if packet.version() != RTP_VERSION {
            return Err(IetfError::InvalidVersion(packet.version()));
        }
        if !packet.validate() {
            return Err(IetfError::Overrun {
                header: packet.header_len().unwrap_or(usize::MAX),
                padding: packet.padding_len().unwrap_or(0),
                available: packet.as_bytes().len(),
            });
        }
        Ok(packet)
    }

    /// CSRC `n`, `None` past the count or the buffer.
    pub fn csrc(&self, n: usize) -> Option<u32> {
        if n >= self.csrc_count() as usize {
            return None;
        }
        BitField::bytes(RTP_HEADER_SIZE + 4 * n, 4)
            .get(self.as_bytes())
            .ok()
            .map(|value| value as u32)
    }

    fn extension_offset(&self) -> usize {
        RTP_HEADER_SIZE + 4 * self.csrc_count() as usize
    }

    /// Profile-defined 16 bits and data of the header extension.
    pub fn header_extension(&self) -> Option<(u16, &[u8])> {
        if !self.extension() {
            return None;
        }
        let record = RTP_EXTENSION_RECORD.split(self.as_bytes().get(self.extension_offset()..)?)?;
        Some((u16::from_be_bytes([record[0], record[1]]), &record[4..]))
    }

    /// Fixed header, CSRC list and extension. `None` when the extension
    /// header is cut off.
    pub fn header_len(&self) -> Option<usize> {
        let mut len = self.extension_offset();
        if self.extension() {
            len += RTP_EXTENSION_RECORD.occupied_length(self.as_bytes().get(len..)?)?;
        }
        Some(len)
    }

    /// Padding bytes counted by the last byte of the packet.
    pub fn padding_len(&self) -> Option<usize> {
        if !self.padding() {
            return Some(0);
        }
        self.as_bytes().last().map(|&count| count as usize)
    }

    pub fn payload(&self) -> Option<&[u8]> {
        if !self.validate() {
            return None;
        }
        let bytes = self.as_bytes();
        let end = bytes.len() - self.padding_len()?;
        bytes.get(self.header_len()?..end)
    }

    /// Version 2, headers inside the packet, and padding (at least one
    /// byte when flagged) between the headers and the end.
    pub fn validate(&self) -> bool {
        let available = self.as_bytes().len();
        let (Some(header), Some(padding)) = (self.header_len(), self.padding_len()) else {
            return false;
        };
        self.version() == RTP_VERSION
            && !(self.padding() && padding == 0)
            && header + padding <= available
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> RtpHeader<B> {
    /// Reset the fixed header to version 2 with every other field zero.
    pub fn init(&mut self) {
        self.as_bytes_mut()[..RTP_HEADER_SIZE].fill(0);
        self.set_version(RTP_VERSION);
    }

    /// Write CSRC `n`; the count must already cover it.
    pub fn set_csrc(&mut self, n: usize, value: u32) -> Result<()> {
        if n >= self.csrc_count() as usize {
            return Err(bitfield::FieldError::OutOfBounds {
                needed: n + 1,
                available: self.csrc_count() as usize,
            }
            .into());
        }
        BitField::bytes(RTP_HEADER_SIZE + 4 * n, 4).set(self.as_bytes_mut(), value as u64)?;
        Ok(())
    }

    /// Write the extension header for `data_len` bytes of extension data,
    /// a multiple of four.
    pub fn set_header_extension(&mut self, profile: u16, data_len: usize) -> Result<()> {
        let offset = self.extension_offset();
        let available = self.as_bytes().len();
        let record = self
            .as_bytes_mut()
            .get_mut(offset..)
            .ok_or(bitfield::FieldError::OutOfBounds {
                needed: offset + 4,
                available,
            })?;
        BitField::bytes(0, 2).set(record, profile as u64)?;
        RTP_EXTENSION_RECORD.set_declared_length(record, data_len)?;
        self.set_extension(true);
        Ok(())
    }
}
