//! Serialise ID3v2.4 frames and tags.

use bitfield::synchsafe_encode;

use crate::frame::{FRAME_HEADER_SIZE, FrameHeader, is_valid_frame_id};
use crate::tag::{TAG_HEADER_SIZE, TagHeader};
use crate::text::TextEncoding;
use crate::{Id3Error, Result};

/// Frame header with a synchsafe size followed by `body`.
pub fn build_frame(id: [u8; 4], body: &[u8]) -> Result<Vec<u8>> {
    if !is_valid_frame_id(&id) {
        return Err(Id3Error::InvalidFrameId(id));
    }
    let mut bytes = vec![0u8; FRAME_HEADER_SIZE];
    let mut header = FrameHeader::new(&mut bytes[..])?;
    header.set_id(id)?;
    header.set_size(body.len())?;
    bytes.extend_from_slice(body);
    Ok(bytes)
}

/// Text information frame holding `values`, separated by terminators.
pub fn text_frame(id: [u8; 4], encoding: TextEncoding, values: &[&str]) -> Result<Vec<u8>> {
    if id[0] != b'T' || &id == b"TXXX" {
        return Err(Id3Error::InvalidFrameId(id));
    }
    let mut body = vec![u8::from(encoding)];
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            body.resize(body.len() + encoding.unit(), 0);
        }
        body.extend(encoding.encode(value)?);
    }
    build_frame(id, &body)
}

pub fn url_frame(id: [u8; 4], url: &str) -> Result<Vec<u8>> {
    if id[0] != b'W' || &id == b"WXXX" {
        return Err(Id3Error::InvalidFrameId(id));
    }
    build_frame(id, &TextEncoding::Latin1.encode(url)?)
}

pub fn comment_frame(
    encoding: TextEncoding,
    language: [u8; 3],
    description: &str,
    text: &str,
) -> Result<Vec<u8>> {
    let mut body = vec![u8::from(encoding)];
    body.extend_from_slice(&language);
    body.extend(encoding.encode_terminated(description)?);
    body.extend(encoding.encode(text)?);
    build_frame(*b"COMM", &body)
}

pub fn user_text_frame(encoding: TextEncoding, description: &str, value: &str) -> Result<Vec<u8>> {
    let mut body = vec![u8::from(encoding)];
    body.extend(encoding.encode_terminated(description)?);
    body.extend(encoding.encode(value)?);
    build_frame(*b"TXXX", &body)
}

pub fn user_url_frame(encoding: TextEncoding, description: &str, url: &str) -> Result<Vec<u8>> {
    let mut body = vec![u8::from(encoding)];
    body.extend(encoding.encode_terminated(description)?);
    body.extend(TextEncoding::Latin1.encode(url)?);
    build_frame(*b"WXXX", &body)
}

pub fn private_frame(owner: &str, data: &[u8]) -> Result<Vec<u8>> {
    let mut body = TextEncoding::Latin1.encode_terminated(owner)?;
    body.extend_from_slice(data);
    build_frame(*b"PRIV", &body)
}

/// ID3v2.4 tag made of `frames` and `padding` zero bytes.
pub fn build_tag(frames: &[Vec<u8>], padding: usize) -> Result<Vec<u8>> {
    let size = frames.iter().map(Vec::len).sum::<usize>() + padding;
    if synchsafe_encode(size).is_none() {
        return Err(bitfield::FieldError::LengthNotEncodable(size).into());
    }
    let mut bytes = Vec::with_capacity(TAG_HEADER_SIZE + size);
    bytes.resize(TAG_HEADER_SIZE, 0);
    let mut header = TagHeader::new(&mut bytes[..])?;
    header.init();
    header.set_size(size)?;
    for frame in frames {
        bytes.extend_from_slice(frame);
    }
    bytes.resize(TAG_HEADER_SIZE + size, 0);
    Ok(bytes)
}
