//! RTP payload header for uncompressed video (RFC 4175 section 4.3).
//!
//! A 16-bit extended sequence number is followed by one 6-byte header per
//! scan line segment; each header's continuation bit says whether another
//! header follows. The segment data comes after the last header, in header
//! order.

use bitfield::layout;

use crate::{IetfError, Result};

pub const EXTENDED_SEQUENCE_SIZE: usize = 2;
pub const LINE_HEADER_SIZE: usize = 6;

layout! {
    /// Line segment header.
    pub struct LineHeader[LINE_HEADER_SIZE] {
        length, set_length: u16 = (0, 0, 16);
        /// Second field of interlaced video.
        field, set_field: bool = (2, 0, 1);
        line_number, set_line_number: u16 = (2, 1, 15);
        continuation, set_continuation: bool = (4, 0, 1);
        offset, set_offset: u16 = (4, 1, 15);
    }
}

/// A payload with its line headers resolved.
#[derive(Debug, Clone)]
pub struct RawVideoPayload<'a> {
    bytes: &'a [u8],
    headers: usize,
}

impl<'a> RawVideoPayload<'a> {
    /// Walk the line headers until one has the continuation bit clear.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let mut headers = 0;
        loop {
            let offset = EXTENDED_SEQUENCE_SIZE + headers * LINE_HEADER_SIZE;
            let available = bytes.len();
            let header = bytes
                .get(offset..)
                .ok_or(bitfield::FieldError::OutOfBounds {
                    needed: offset + LINE_HEADER_SIZE,
                    available,
                })
                .and_then(LineHeader::new)?;
            headers += 1;
            if !header.continuation() {
                break;
            }
        }
        Ok(Self { bytes, headers })
    }

    pub fn extended_sequence_number(&self) -> u16 {
        u16::from_be_bytes([self.bytes[0], self.bytes[1]])
    }

    /// Full 32-bit sequence number given the RTP header's low 16 bits.
    pub fn sequence_number(&self, rtp_sequence: u16) -> u32 {
        ((self.extended_sequence_number() as u32) << 16) | rtp_sequence as u32
    }

    pub fn line_count(&self) -> usize {
        self.headers
    }

    pub fn line(&self, n: usize) -> Option<LineHeader<&'a [u8]>> {
        if n >= self.headers {
            return None;
        }
        let offset = EXTENDED_SEQUENCE_SIZE + n * LINE_HEADER_SIZE;
        LineHeader::new(&self.bytes[offset..offset + LINE_HEADER_SIZE]).ok()
    }

    fn data_offset(&self) -> usize {
        EXTENDED_SEQUENCE_SIZE + self.headers * LINE_HEADER_SIZE
    }

    /// Line headers paired with their segment data. Stops at the first
    /// segment running past the payload.
    pub fn segments(&self) -> impl Iterator<Item = (LineHeader<&'a [u8]>, &'a [u8])> + '_ {
        let mut data = &self.bytes[self.data_offset()..];
        (0..self.headers).map_while(move |n| {
            let header = self.line(n)?;
            let len = header.length() as usize;
            if len > data.len() {
                return None;
            }
            let (segment, rest) = data.split_at(len);
            data = rest;
            Some((header, segment))
        })
    }

    /// Segment lengths add up to no more than the data present.
    pub fn validate(&self) -> bool {
        let total: usize = (0..self.headers)
            .filter_map(|n| self.line(n))
            .map(|header| header.length() as usize)
            .sum();
        total <= self.bytes.len() - self.data_offset()
    }
}

/// Reject payloads whose line headers do not fit.
pub fn check(bytes: &[u8]) -> Result<()> {
    let payload = RawVideoPayload::parse(bytes)?;
    if payload.validate() {
        Ok(())
    } else {
        Err(IetfError::Overrun {
            header: payload.data_offset(),
            padding: 0,
            available: bytes.len(),
        })
    }
}
