//! ID3v2 tag header, extended header, footer and the frame area.

use bitfield::{FieldError, LengthField, RecordLayout, RecordSeq, layout, synchsafe_decode};
use memchr::memmem;

use crate::frame::{Frame, frame_record, frame_seq, frames_end};
use crate::{Id3Error, Result};

pub const TAG_HEADER_SIZE: usize = 10;
pub const TAG_FOOTER_SIZE: usize = 10;
pub const TAG_IDENTIFIER: [u8; 3] = *b"ID3";
pub const FOOTER_IDENTIFIER: [u8; 3] = *b"3DI";

/// The tag size excludes the header and the footer.
pub const TAG_RECORD: RecordLayout = RecordLayout::new(TAG_HEADER_SIZE, LengthField::Synchsafe(6));

layout! {
    /// ID3v2 tag header; the footer repeats it behind "3DI".
    pub struct TagHeader[TAG_HEADER_SIZE] {
        version, set_version: u8 = (3, 0, 8);
        revision, set_revision: u8 = (4, 0, 8);
        unsynchronisation, set_unsynchronisation: bool = (5, 0, 1);
        extended_header, set_extended_header: bool = (5, 1, 1);
        experimental, set_experimental: bool = (5, 2, 1);
        footer_present, set_footer_present: bool = (5, 3, 1);
        reserved_flags, set_reserved_flags: u8 = (5, 4, 4);
    }
}

impl<B: AsRef<[u8]>> TagHeader<B> {
    pub fn identifier(&self) -> [u8; 3] {
        let bytes = self.as_bytes();
        [bytes[0], bytes[1], bytes[2]]
    }

    /// Bytes between header and footer.
    pub fn size(&self) -> Option<usize> {
        TAG_RECORD.declared_length(self.as_bytes())
    }

    /// Header, frames, padding and footer.
    pub fn total_size(&self) -> Option<usize> {
        let footer = if self.footer_present() {
            TAG_FOOTER_SIZE
        } else {
            0
        };
        TAG_RECORD
            .occupied_length(self.as_bytes())
            .map(|occupied| occupied + footer)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> TagHeader<B> {
    /// Write an empty ID3v2.4 header.
    pub fn init(&mut self) {
        let bytes = self.as_bytes_mut();
        bytes[..3].copy_from_slice(&TAG_IDENTIFIER);
        bytes[3..TAG_HEADER_SIZE].copy_from_slice(&[4, 0, 0, 0, 0, 0, 0]);
    }

    pub fn set_size(&mut self, size: usize) -> Result<()> {
        TAG_RECORD.set_declared_length(self.as_bytes_mut(), size)?;
        Ok(())
    }
}

/// A complete tag, trimmed to its declared size.
#[derive(Debug, Clone, Copy)]
pub struct Tag<'a> {
    header: TagHeader<&'a [u8]>,
    bytes: &'a [u8],
}

impl<'a> Tag<'a> {
    /// Wrap the tag starting at `data[0]`. Versions 2.3 and 2.4 are read;
    /// 2.3 tags using whole-tag unsynchronisation are refused.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let header = TagHeader::new(data)?;
        if header.identifier() != TAG_IDENTIFIER {
            return Err(Id3Error::InvalidMagic);
        }
        match header.version() {
            4 => {}
            3 if header.unsynchronisation() => return Err(Id3Error::UnsynchronisedTag),
            3 => {}
            other => return Err(Id3Error::UnsupportedVersion(other)),
        }
        let total = header.total_size().ok_or(Id3Error::InvalidSynchsafe)?;
        let bytes = data.get(..total).ok_or(FieldError::OutOfBounds {
            needed: total,
            available: data.len(),
        })?;
        Ok(Self {
            header: TagHeader::new(bytes)?,
            bytes,
        })
    }

    pub fn header(&self) -> &TagHeader<&'a [u8]> {
        &self.header
    }

    pub fn version(&self) -> u8 {
        self.header.version()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Extended header, frames and padding.
    fn body(&self) -> &'a [u8] {
        let size = self.header.size().unwrap_or_default();
        &self.bytes[TAG_HEADER_SIZE..TAG_HEADER_SIZE + size]
    }

    /// Extended header when flagged, `None` if absent or overrunning the
    /// tag. Version 2.4 counts the size field in the size, 2.3 does not.
    pub fn extended_header(&self) -> Option<&'a [u8]> {
        if !self.header.extended_header() {
            return None;
        }
        let body = self.body();
        let size_bytes: [u8; 4] = body.get(..4)?.try_into().ok()?;
        let size = if self.version() == 4 {
            synchsafe_decode(size_bytes)?
        } else {
            u32::from_be_bytes(size_bytes) as usize + 4
        };
        if size < 6 {
            return None;
        }
        body.get(..size)
    }

    /// Frames followed by padding.
    pub fn frame_area(&self) -> &'a [u8] {
        let skip = self.extended_header().map_or(0, <[u8]>::len);
        self.body().get(skip..).unwrap_or_default()
    }

    /// Raw frames up to the padding.
    pub fn frames(&self) -> RecordSeq<'a> {
        frame_seq(frame_record(self.version()), self.frame_area())
    }

    /// Frames with a valid id.
    pub fn iter_frames(&self) -> impl Iterator<Item = Frame<'a>> + 'a {
        let version = self.version();
        self.frames()
            .iter()
            .filter_map(move |bytes| Frame::parse(bytes, version).ok())
    }

    /// First frame called `id`.
    pub fn find_frame(&self, id: &[u8; 4]) -> Option<Frame<'a>> {
        self.iter_frames().find(|frame| &frame.id() == id)
    }

    pub fn padding(&self) -> &'a [u8] {
        let area = self.frame_area();
        &area[frames_end(frame_record(self.version()), area)..]
    }

    pub fn footer(&self) -> Option<&'a [u8]> {
        if !self.header.footer_present() {
            return None;
        }
        self.bytes.get(self.bytes.len() - TAG_FOOTER_SIZE..)
    }

    /// Every structural rule of the tag holds: known flags only, the
    /// extended header fits, frames fill the area up to padding made of
    /// zero bytes, every frame id is valid, and a footer mirrors the header
    /// with no padding before it.
    pub fn validate(&self) -> bool {
        let header = &self.header;
        if header.reserved_flags() != 0 || header.revision() == 0xFF {
            return false;
        }
        if header.extended_header() && self.extended_header().is_none() {
            return false;
        }
        let version = self.version();
        let frames = self.frames();
        if !frames.validate()
            || !frames
                .iter()
                .all(|bytes| Frame::parse(bytes, version).is_ok())
        {
            return false;
        }
        let padding = self.padding();
        if padding.iter().any(|&b| b != 0) {
            return false;
        }
        match self.footer() {
            None => true,
            Some(footer) => {
                version == 4
                    && padding.is_empty()
                    && footer[..3] == FOOTER_IDENTIFIER
                    && footer[3..] == self.bytes[3..TAG_HEADER_SIZE]
            }
        }
    }
}

/// Offset of the first parseable tag in `data`.
pub fn find_tag(data: &[u8]) -> Option<usize> {
    memmem::find_iter(data, &TAG_IDENTIFIER).find(|&offset| Tag::parse(&data[offset..]).is_ok())
}
