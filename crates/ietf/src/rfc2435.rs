//! RTP payload header for JPEG-compressed video (RFC 2435 section 3.1).
//!
//! The 8-byte main header may be followed by a restart marker header (types
//! 64 to 127) and, in the first fragment of a frame with dynamic tables
//! (Q of 128 and above), a quantization table header with its tables.

use bitfield::{BitField, LengthField, RecordLayout, layout};

use crate::{IetfError, Result};

pub const JPEG_HEADER_SIZE: usize = 8;
pub const RESTART_HEADER_SIZE: usize = 4;
/// Restart count of intervals not aligned with packet boundaries.
pub const UNALIGNED_RESTART_COUNT: u16 = 0x3FFF;

/// Quantization table header: MBZ, precision, then a 16-bit byte count.
pub const QUANTIZATION_TABLE_RECORD: RecordLayout =
    RecordLayout::new(4, LengthField::bits(BitField::bytes(2, 2)));

layout! {
    /// JPEG main header.
    pub struct JpegHeader[JPEG_HEADER_SIZE] {
        type_specific, set_type_specific: u8 = (0, 0, 8);
        fragment_offset, set_fragment_offset: u32 = (1, 0, 24);
        jpeg_type, set_jpeg_type: u8 = (4, 0, 8);
        q, set_q: u8 = (5, 0, 8);
        /// Width in 8-pixel blocks.
        width_blocks, set_width_blocks: u8 = (6, 0, 8);
        height_blocks, set_height_blocks: u8 = (7, 0, 8);
    }
}

impl<B: AsRef<[u8]>> JpegHeader<B> {
    pub fn width(&self) -> u32 {
        self.width_blocks() as u32 * 8
    }

    pub fn height(&self) -> u32 {
        self.height_blocks() as u32 * 8
    }

    pub fn has_restart_header(&self) -> bool {
        (64..128).contains(&self.jpeg_type())
    }

    /// Tables travel in-band in the first fragment.
    pub fn has_quantization_tables(&self) -> bool {
        self.q() >= 128 && self.fragment_offset() == 0
    }
}

layout! {
    /// Restart marker header.
    pub struct RestartHeader[RESTART_HEADER_SIZE] {
        restart_interval, set_restart_interval: u16 = (0, 0, 16);
        first, set_first: bool = (2, 0, 1);
        last, set_last: bool = (2, 1, 1);
        restart_count, set_restart_count: u16 = (2, 2, 14);
    }
}

layout! {
    /// Quantization table header; the tables follow.
    pub struct QuantizationTableHeader[4] {
        mbz, set_mbz: u8 = (0, 0, 8);
        /// One bit per table, set for 16-bit tables.
        precision, set_precision: u8 = (1, 0, 8);
        length, set_length: u16 = (2, 0, 16);
    }
}

/// A JPEG RTP payload split into its headers and scan data.
#[derive(Debug, Clone, Copy)]
pub struct JpegPayload<'a> {
    pub header: JpegHeader<&'a [u8]>,
    pub restart: Option<RestartHeader<&'a [u8]>>,
    pub quantization: Option<QuantizationTableHeader<&'a [u8]>>,
    pub data: &'a [u8],
}

impl<'a> JpegPayload<'a> {
    /// Resolve the optional headers once; fails when one of them or the
    /// table data runs past the payload.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let header = JpegHeader::new(payload)?;
        let mut offset = JPEG_HEADER_SIZE;
        let restart = if header.has_restart_header() {
            let restart = RestartHeader::new(&payload[offset..])?;
            offset += RESTART_HEADER_SIZE;
            Some(restart)
        } else {
            None
        };
        let quantization = if header.has_quantization_tables() {
            let rest = &payload[offset..];
            let occupied = QUANTIZATION_TABLE_RECORD
                .split(rest)
                .ok_or(bitfield::FieldError::OutOfBounds {
                    needed: QUANTIZATION_TABLE_RECORD.occupied_length(rest).unwrap_or(4),
                    available: rest.len(),
                })?
                .len();
            let tables = QuantizationTableHeader::new(&rest[..occupied])?;
            offset += occupied;
            Some(tables)
        } else {
            None
        };
        Ok(Self {
            header,
            restart,
            quantization,
            data: &payload[offset..],
        })
    }

    /// Table bytes after the quantization table header.
    pub fn tables(&self) -> Option<&'a [u8]> {
        self.quantization.map(|q| &q.into_inner()[4..])
    }

    /// MBZ clear, and the unaligned restart count 0x3FFF only together
    /// with both the F and L bits.
    pub fn validate(&self) -> bool {
        self.quantization.is_none_or(|q| q.mbz() == 0)
            && self.restart.is_none_or(|r| {
                r.restart_count() != UNALIGNED_RESTART_COUNT || (r.first() && r.last())
            })
    }
}

/// Quantization table byte count for `precision` and `count` tables of 64
/// entries.
pub fn tables_len(precision: u8, count: usize) -> Result<usize> {
    if count > 8 {
        return Err(IetfError::InvalidHeaderLength(count as u8));
    }
    Ok((0..count)
        .map(|table| if precision & (1 << table) != 0 { 128 } else { 64 })
        .sum())
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_main_header_only() {
        let bytes = [0x00, 0x00, 0x10, 0x00, 0x01, 0x50, 0x50, 0x3C, 0xFF, 0xD8];
        let jpeg = JpegPayload::parse(&bytes).unwrap();
        assert_eq!(jpeg.header.fragment_offset(), 0x1000);
        assert_eq!(jpeg.header.jpeg_type(), 1);
        assert_eq!(jpeg.header.q(), 80);
        assert_eq!(jpeg.header.width(), 640);
        assert_eq!(jpeg.header.height(), 480);
        assert!(jpeg.restart.is_none());
        assert!(jpeg.quantization.is_none());
        assert_eq!(jpeg.data, &[0xFF, 0xD8]);
        assert!(jpeg.validate());
    }

    #[test]
    fn test_restart_and_tables() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x00, 0x41, 0xFF, 0x28, 0x1E];
        bytes.extend([0x00, 0x08, 0xC0, 0x05]); // interval 8, F L, count 5
        bytes.extend([0x00, 0x00, 0x00, 0x80]); // two 8-bit tables
        bytes.extend(vec![0x11; tables_len(0, 2).unwrap()]);
        bytes.extend([0xAA, 0xBB]);

        let jpeg = JpegPayload::parse(&bytes).unwrap();
        let restart = jpeg.restart.unwrap();
        assert_eq!(restart.restart_interval(), 8);
        assert!(restart.first());
        assert!(restart.last());
        assert_eq!(restart.restart_count(), 5);
        assert_eq!(jpeg.quantization.unwrap().length(), 128);
        assert_eq!(jpeg.tables().unwrap().len(), 128);
        assert_eq!(jpeg.data, &[0xAA, 0xBB]);
        assert!(jpeg.validate());

        bytes[10] = 0x7F;
        bytes[11] = 0xFF;
        assert!(!JpegPayload::parse(&bytes).unwrap().validate());
        bytes[10] = 0xFF;
        assert!(JpegPayload::parse(&bytes).unwrap().validate());
    }

    #[test]
    fn test_truncated_tables() {
        let mut bytes = vec![0x00, 0x00, 0x00, 0x00, 0x01, 0xFF, 0x28, 0x1E];
        bytes.extend([0x00, 0x00, 0x00, 0x80]);
        bytes.extend(vec![0x11; 127]);
        assert!(JpegPayload::parse(&bytes).is_err());

        // later fragments carry no tables
        bytes[3] = 0x01;
        let jpeg = JpegPayload::parse(&bytes).unwrap();
        assert!(jpeg.quantization.is_none());
        assert_eq!(jpeg.data.len(), 131);
    }

    #[test]
    fn test_tables_len() {
        assert_eq!(tables_len(0b01, 2).unwrap(), 192);
        assert!(tables_len(0, 9).is_err());
    }
}
