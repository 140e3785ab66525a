//! SMPTE ST 291-1 ancillary data packets.
//!
//! Every ANC word is 10 bits wide and sits right-aligned in a 16-bit
//! big-endian container. The packet opens with the ancillary data flag
//! (0x000 0x3FF 0x3FF), then DID, SDID (or DBN) and DC words whose bit 8 is
//! the even parity of bits 0..=7 and bit 9 its inverse, DC user data words
//! and a checksum word.

use bitfield::{BitField, layout};

use crate::{Result, SmpteError};

pub const ANC_WORD_SIZE: usize = 2;
/// ADF, DID, SDID and DC.
pub const ANC_HEADER_WORDS: usize = 6;
pub const ANC_HEADER_SIZE: usize = ANC_HEADER_WORDS * ANC_WORD_SIZE;
pub const ANC_DATA_FLAG: [u16; 3] = [0x000, 0x3FF, 0x3FF];

const WORD_MASK: u16 = 0x3FF;

layout! {
    /// Header words of an ANC packet.
    pub struct AncPacket[ANC_HEADER_SIZE] {
        adf0, set_adf0: u16 = (0, 6, 10);
        adf1, set_adf1: u16 = (2, 6, 10);
        adf2, set_adf2: u16 = (4, 6, 10);
        did_word, set_did_word: u16 = (6, 6, 10);
        sdid_word, set_sdid_word: u16 = (8, 6, 10);
        dc_word, set_dc_word: u16 = (10, 6, 10);
    }
}

/// `value` with even parity in bit 8 and its inverse in bit 9.
pub fn with_parity(value: u8) -> u16 {
    let parity = (value.count_ones() & 1) as u16;
    ((parity ^ 1) << 9) | (parity << 8) | value as u16
}

/// Bits 8 and 9 of `word` agree with its low byte.
pub fn check_parity(word: u16) -> bool {
    word & WORD_MASK == with_parity(word as u8)
}

fn word_at(bytes: &[u8], index: usize) -> Option<u16> {
    let offset = index * ANC_WORD_SIZE;
    bytes
        .get(offset..offset + ANC_WORD_SIZE)
        .map(|word| u16::from_be_bytes([word[0], word[1]]) & WORD_MASK)
}

impl<B: AsRef<[u8]>> AncPacket<B> {
    /// Wrap `buf` after checking the data flag, parity, length and
    /// checksum.
    pub fn parse(buf: B) -> Result<Self> {
        let packet = Self::new(buf)?;
        packet.check()?;
        Ok(packet)
    }

    fn check(&self) -> Result<()> {
        if [self.adf0(), self.adf1(), self.adf2()] != ANC_DATA_FLAG {
            return Err(SmpteError::InvalidAncillaryDataFlag);
        }
        for (word, value) in [
            ("DID", self.did_word()),
            ("SDID", self.sdid_word()),
            ("DC", self.dc_word()),
        ] {
            if !check_parity(value) {
                return Err(SmpteError::Parity { word, value });
            }
        }
        let needed = self.packet_len();
        let available = self.as_bytes().len();
        if needed > available {
            return Err(SmpteError::Overrun { needed, available });
        }
        let stored = self.checksum().unwrap_or_default();
        let computed = self.compute_checksum().unwrap_or_default();
        if stored != computed {
            return Err(SmpteError::ChecksumMismatch { stored, computed });
        }
        Ok(())
    }

    pub fn did(&self) -> u8 {
        self.did_word() as u8
    }

    /// Secondary data identifier of a type 2 packet, data block number of a
    /// type 1 packet.
    pub fn sdid(&self) -> u8 {
        self.sdid_word() as u8
    }

    /// Type 1 packets have DID bit 7 set and carry a data block number.
    pub fn is_type1(&self) -> bool {
        self.did() & 0x80 != 0
    }

    /// Number of user data words.
    pub fn dc(&self) -> usize {
        self.dc_word() as u8 as usize
    }

    /// Header, user data words and checksum, in bytes.
    pub fn packet_len(&self) -> usize {
        (ANC_HEADER_WORDS + self.dc() + 1) * ANC_WORD_SIZE
    }

    pub fn user_data_word(&self, n: usize) -> Option<u16> {
        if n >= self.dc() {
            return None;
        }
        word_at(self.as_bytes(), ANC_HEADER_WORDS + n)
    }

    /// User data words present in the buffer.
    pub fn user_data_words(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.dc()).map_while(|n| self.user_data_word(n))
    }

    /// Stored checksum word.
    pub fn checksum(&self) -> Option<u16> {
        word_at(self.as_bytes(), ANC_HEADER_WORDS + self.dc())
    }

    /// Nine-bit sum of DID through the last user data word, bit 9 the
    /// inverse of bit 8. `None` when the user data runs past the buffer.
    pub fn compute_checksum(&self) -> Option<u16> {
        let first = ANC_HEADER_WORDS - 3;
        let mut sum: u16 = 0;
        for index in first..ANC_HEADER_WORDS + self.dc() {
            sum = sum.wrapping_add(word_at(self.as_bytes(), index)? & 0x1FF);
        }
        let sum = sum & 0x1FF;
        Some(sum | ((!sum & 0x100) << 1))
    }

    pub fn check_checksum(&self) -> bool {
        matches!(
            (self.checksum(), self.compute_checksum()),
            (Some(stored), Some(computed)) if stored == computed
        )
    }

    /// Data flag, parity, length and checksum are all correct.
    pub fn validate(&self) -> bool {
        self.check().is_ok()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> AncPacket<B> {
    /// Write the data flag, identifiers and an empty user data count.
    pub fn init(&mut self, did: u8, sdid: u8) {
        self.set_adf0(ANC_DATA_FLAG[0]);
        self.set_adf1(ANC_DATA_FLAG[1]);
        self.set_adf2(ANC_DATA_FLAG[2]);
        self.set_did(did);
        self.set_sdid(sdid);
        self.set_dc(0);
    }

    pub fn set_did(&mut self, did: u8) {
        self.set_did_word(with_parity(did));
    }

    pub fn set_sdid(&mut self, sdid: u8) {
        self.set_sdid_word(with_parity(sdid));
    }

    pub fn set_dc(&mut self, dc: u8) {
        self.set_dc_word(with_parity(dc));
    }

    /// Store a raw 10-bit user data word.
    pub fn set_user_data_word(&mut self, n: usize, word: u16) -> Result<()> {
        if n >= self.dc() {
            return Err(SmpteError::InvalidLength(n));
        }
        let field = BitField::new((ANC_HEADER_WORDS + n) * ANC_WORD_SIZE, 6, 10);
        field.set(self.as_bytes_mut(), (word & WORD_MASK) as u64)?;
        Ok(())
    }

    /// Store eight-bit user data with parity, set DC and the checksum.
    pub fn set_user_data(&mut self, data: &[u8]) -> Result<()> {
        let dc = u8::try_from(data.len()).map_err(|_| SmpteError::InvalidLength(data.len()))?;
        let needed = (ANC_HEADER_WORDS + data.len() + 1) * ANC_WORD_SIZE;
        let available = self.as_bytes().len();
        if needed > available {
            return Err(SmpteError::Overrun { needed, available });
        }
        self.set_dc(dc);
        for (n, value) in data.iter().enumerate() {
            self.set_user_data_word(n, with_parity(*value))?;
        }
        self.update_checksum()
    }

    /// Recompute and store the checksum word.
    pub fn update_checksum(&mut self) -> Result<()> {
        let needed = self.packet_len();
        let available = self.as_bytes().len();
        let checksum = self
            .compute_checksum()
            .filter(|_| needed <= available)
            .ok_or(SmpteError::Overrun { needed, available })?;
        let field = BitField::new(needed - ANC_WORD_SIZE, 6, 10);
        field.set(self.as_bytes_mut(), checksum as u64)?;
        Ok(())
    }
}
