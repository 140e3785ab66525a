//! SMPTE packet formats found next to broadcast video.
//!
//! - [`st291`]: ancillary data packets as 10-bit words
//! - [`st337`]: non-PCM audio burst preamble in 16-bit mode
//! - [`st2022_1`]: FEC header for MPEG-2 TS over RTP
//! - [`st2022_6`]: HBRMT payload header for SDI over RTP
//! - [`rdd8`]: OP-47 subtitling distribution packets
//!
//! ## License
//!
//! This project is licensed under the MIT or Apache-2.0 license. You can
//! choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(unsafe_code)]

pub mod error;
pub mod rdd8;
pub mod st2022_1;
pub mod st2022_6;
pub mod st291;
pub mod st337;

pub use error::{Result, SmpteError};
pub use rdd8::{PacketDescriptor, SubtitlePacket};
pub use st2022_1::{FecDirection, FecHeader};
pub use st2022_6::{ClockFrequency, HbrmtHeader};
pub use st291::{AncPacket, check_parity, with_parity};
pub use st337::{BurstPreamble, DataMode, DataType, find_preamble};
