//! ID3v2 tags: the tag header with its synchsafe size, the extended header
//! and footer, and the frames packed up to the padding.
//!
//! Frames are variable-length records whose size sits in their own header,
//! so the frame area is walked like any other record sequence. The walk
//! stops at the first zero byte where a frame id should start; everything
//! from there to the end of the tag must be padding.
//!
//! Text and URL frames share two encodings; COMM, PRIV, TXXX and WXXX have
//! views of their own in [`frames`]. [`writer`] serialises ID3v2.4 frames
//! and tags.
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
pub mod frame;
pub mod frames;
pub mod tag;
pub mod text;
pub mod writer;

pub use error::{Id3Error, Result};
pub use frame::{Frame, FrameHeader};
pub use frames::{
    CommentFrame, DecodedFrame, PrivateFrame, TextFrame, UrlFrame, UserTextFrame, UserUrlFrame,
    decode_frame,
};
pub use tag::{Tag, TagHeader, find_tag};
pub use text::TextEncoding;
