//! ATSC A/52 audio: AC-3 and Enhanced AC-3 (Annex E) sync frame headers,
//! plus the ATSC program map descriptors announcing them.
//!
//! AC-3 and E-AC-3 share the 0x0B77 syncword; the bitstream identification
//! (`bsid`) in the sixth byte tells them apart. [`probe`] reads it so the
//! caller can pick the matching view.
//!
//! ## License
//!
//! This project is licensed under the MIT or Apache-2.0 license. You can
//! choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unsafe_code)]

pub mod ac3;
mod crc;
pub mod descriptors;
pub mod eac3;
pub mod error;

pub use ac3::Ac3SyncFrame;
pub use crc::crc16;
pub use descriptors::{Ac3AudioStreamDescriptor, Eac3AudioDescriptor, register};
pub use eac3::Eac3SyncFrame;
pub use error::{A52Error, Result};

/// Value of the first 16 bits of every A/52 sync frame.
pub const A52_SYNCWORD: u16 = 0x0B77;

/// Highest bsid an AC-3 decoder accepts; 11 to 16 select the Annex E
/// syntax.
pub const AC3_MAX_BSID: u8 = 10;
pub const EAC3_MIN_BSID: u8 = 11;
pub const EAC3_MAX_BSID: u8 = 16;

/// Which header syntax a sync frame uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Ac3,
    Eac3,
}

/// Identify the syntax of the sync frame starting at `data[0]`, `None`
/// when the syncword is missing or the bsid is unknown.
pub fn probe(data: &[u8]) -> Option<Syntax> {
    if data.len() < 6 || u16::from_be_bytes([data[0], data[1]]) != A52_SYNCWORD {
        return None;
    }
    match data[5] >> 3 {
        0..=AC3_MAX_BSID => Some(Syntax::Ac3),
        EAC3_MIN_BSID..=EAC3_MAX_BSID => Some(Syntax::Eac3),
        _ => None,
    }
}

/// Channel count implied by acmod, without the LFE channel.
pub fn acmod_channels(acmod: u8) -> u8 {
    const CHANNELS: [u8; 8] = [2, 1, 2, 3, 3, 4, 4, 5];
    CHANNELS[(acmod & 0x07) as usize]
}

/// Human-readable channel configuration of acmod.
pub fn acmod_name(acmod: u8) -> &'static str {
    match acmod & 0x07 {
        0 => "1+1",
        1 => "1/0",
        2 => "2/0",
        3 => "3/0",
        4 => "2/1",
        5 => "3/1",
        6 => "2/2",
        _ => "3/2",
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_probe() {
        assert_eq!(probe(&[0x0B, 0x77, 0, 0, 0x1C, 0x40]), Some(Syntax::Ac3));
        assert_eq!(probe(&[0x0B, 0x77, 0x02, 0xFF, 0x3F, 0x80]), Some(Syntax::Eac3));
        assert_eq!(probe(&[0x0B, 0x77, 0, 0, 0, 0xF8]), None);
        assert_eq!(probe(&[0x0B, 0x78, 0, 0, 0, 0x40]), None);
        assert_eq!(probe(&[0x0B, 0x77]), None);
    }

    #[test]
    fn test_acmod() {
        assert_eq!(acmod_channels(0), 2);
        assert_eq!(acmod_channels(7), 5);
        assert_eq!(acmod_name(2), "2/0");
    }
}
