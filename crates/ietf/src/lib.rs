//! IETF packet headers: RTP (RFC 3550) and the payload headers of RFC 2250
//! (MPEG video and audio), RFC 2435 (JPEG) and RFC 4175 (uncompressed
//! video), RTCP extended reports (RFC 3611) and the IPv4 header (RFC 791).
//!
//! Every header that carries its own length is a record: the RTP header
//! extension and RTCP packets count 32-bit words, XR report blocks too,
//! and IPv4 counts its header in words through IHL. The views check those
//! lengths against the bytes they were given before handing out payload.
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
pub mod ipv4;
pub mod rfc2250;
pub mod rfc2435;
pub mod rfc4175;
pub mod rtcp;
pub mod rtp;

pub use error::{IetfError, Result};
pub use ipv4::{Ipv4Header, internet_checksum};
pub use rfc2250::{Mpeg2VideoExtension, MpegAudioHeader, MpegVideoHeader};
pub use rfc2435::{JpegHeader, JpegPayload, QuantizationTableHeader, RestartHeader};
pub use rfc4175::{LineHeader, RawVideoPayload};
pub use rtcp::{DlrrBlock, RtcpHeader, RrtBlock, XrPacket};
pub use rtp::RtpHeader;
