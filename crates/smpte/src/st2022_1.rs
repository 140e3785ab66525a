//! SMPTE ST 2022-1 FEC header, carried after the RTP header of every FEC
//! packet in a column or row stream.

use bitfield::layout;

pub const FEC_HEADER_SIZE: usize = 16;
/// Largest number of columns (L) or rows (D) in the FEC matrix.
pub const FEC_MAX_DIMENSION: u8 = 20;
pub const FEC_MIN_ROWS: u8 = 4;
pub const FEC_MAX_MATRIX: u16 = 100;

layout! {
    /// FEC header (RFC 2733 header extended by ST 2022-1).
    pub struct FecHeader[FEC_HEADER_SIZE] {
        /// Low 16 bits of the first protected sequence number.
        snbase_low, set_snbase_low: u16 = (0, 0, 16);
        length_recovery, set_length_recovery: u16 = (2, 0, 16);
        /// Extension flag, always set under ST 2022-1.
        extension, set_extension: bool = (4, 0, 1);
        pt_recovery, set_pt_recovery: u8 = (4, 1, 7);
        mask, set_mask: u32 = (5, 0, 24);
        ts_recovery, set_ts_recovery: u32 = (8, 0, 32);
        /// Reserved for header extension, zero.
        n, set_n: bool = (12, 0, 1);
        /// Clear for column FEC, set for row FEC.
        d, set_d: bool = (12, 1, 1);
        fec_type, set_fec_type: u8 = (12, 2, 3);
        index, set_index: u8 = (12, 5, 3);
        offset, set_offset: u8 = (13, 0, 8);
        na, set_na: u8 = (14, 0, 8);
        snbase_ext, set_snbase_ext: u8 = (15, 0, 8);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FecDirection {
    Column,
    Row,
}

impl<B: AsRef<[u8]>> FecHeader<B> {
    pub fn direction(&self) -> FecDirection {
        if self.d() {
            FecDirection::Row
        } else {
            FecDirection::Column
        }
    }

    /// 24-bit base sequence number.
    pub fn snbase(&self) -> u32 {
        ((self.snbase_ext() as u32) << 16) | self.snbase_low() as u32
    }

    /// RTP sequence numbers of the media packets this packet protects.
    pub fn protected(&self) -> impl Iterator<Item = u16> + '_ {
        let base = self.snbase_low();
        let step = self.offset() as u16;
        (0..self.na() as u16).map(move |k| base.wrapping_add(k.wrapping_mul(step)))
    }

    /// Extension flag set, XOR type and index zero, and a matrix within
    /// bounds: a column packet has offset L in 1..=20 and NA D in 4..=20
    /// with L * D at most 100, a row packet has offset 1 and NA L in 1..=20.
    pub fn validate(&self) -> bool {
        if !self.extension() || self.n() || self.fec_type() != 0 || self.index() != 0 {
            return false;
        }
        let (offset, na) = (self.offset(), self.na());
        match self.direction() {
            FecDirection::Column => {
                (1..=FEC_MAX_DIMENSION).contains(&offset)
                    && (FEC_MIN_ROWS..=FEC_MAX_DIMENSION).contains(&na)
                    && offset as u16 * na as u16 <= FEC_MAX_MATRIX
            }
            FecDirection::Row => offset == 1 && (1..=FEC_MAX_DIMENSION).contains(&na),
        }
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> FecHeader<B> {
    /// Zeroed header with the extension flag set.
    pub fn init(&mut self) {
        self.as_bytes_mut()[..FEC_HEADER_SIZE].fill(0);
        self.set_extension(true);
    }

    pub fn set_snbase(&mut self, snbase: u32) {
        self.set_snbase_low(snbase as u16);
        self.set_snbase_ext((snbase >> 16) as u8);
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    const COLUMN: [u8; 16] = [
        0xFF, 0xFE, 0x05, 0x40, 0xA1, 0x00, 0x00, 0x00, 0x12, 0x34, 0x56, 0x78, 0x00, 0x05,
        0x04, 0x01,
    ];

    #[test]
    fn test_fields() {
        let header = FecHeader::new(&COLUMN[..]).unwrap();
        assert_eq!(header.snbase_low(), 0xFFFE);
        assert_eq!(header.snbase(), 0x01FFFE);
        assert_eq!(header.length_recovery(), 0x0540);
        assert!(header.extension());
        assert_eq!(header.pt_recovery(), 0x21);
        assert_eq!(header.mask(), 0);
        assert_eq!(header.ts_recovery(), 0x1234_5678);
        assert_eq!(header.direction(), FecDirection::Column);
        assert_eq!((header.offset(), header.na()), (5, 4));
        assert_eq!(
            header.protected().collect::<Vec<_>>(),
            vec![0xFFFE, 0x0003, 0x0008, 0x000D]
        );
        assert!(header.validate());
    }

    #[test]
    fn test_matrix_bounds() {
        let mut bytes = COLUMN;
        let mut header = FecHeader::new(&mut bytes[..]).unwrap();
        header.set_na(3);
        assert!(!header.validate());
        header.set_na(20);
        header.set_offset(6);
        assert!(!header.validate());
        header.set_offset(5);
        assert!(header.validate());

        header.set_d(true);
        assert!(!header.validate());
        header.set_offset(1);
        header.set_na(5);
        assert!(header.validate());
        assert_eq!(header.direction(), FecDirection::Row);

        header.set_extension(false);
        assert!(!header.validate());
    }

    #[test]
    fn test_init() {
        let mut bytes = [0xFFu8; 16];
        let mut header = FecHeader::new(&mut bytes[..]).unwrap();
        header.init();
        header.set_snbase(0x00AB_CDEF);
        assert_eq!(header.snbase(), 0xAB_CDEF);
        assert_eq!(&bytes[..5], &[0xCD, 0xEF, 0x00, 0x00, 0x80]);
        assert_eq!(bytes[15], 0xAB);
    }
}
