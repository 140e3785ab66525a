//! CRC-32/MPEG-2 (ITU-T H.222.0 Annex A).
//!
//! Polynomial 0x04C11DB7, initial value 0xFFFFFFFF, no reflection and no
//! final XOR. This is not the zlib CRC-32.

const POLYNOMIAL: u32 = 0x04C1_1DB7;

const TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// Incremental CRC-32/MPEG-2 digest.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    pub const fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            let index = ((self.state >> 24) ^ byte as u32) as usize;
            self.state = (self.state << 8) ^ TABLE[index];
        }
    }

    pub fn finish(&self) -> u32 {
        self.state
    }
}

/// CRC-32/MPEG-2 of `data`.
pub fn mpeg2_crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finish()
}

/// A section whose trailing 4 bytes hold its CRC runs to a zero remainder.
pub fn validate_section_crc32(section: &[u8]) -> bool {
    section.len() >= 4 && mpeg2_crc32(section) == 0
}
