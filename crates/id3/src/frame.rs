//! Frame headers and the walk over the frames of a tag.

use std::borrow::Cow;

use bitfield::{BitField, LengthField, RecordLayout, RecordSeq, layout, synchsafe_decode};

use crate::{Id3Error, Result};

pub const FRAME_HEADER_SIZE: usize = 10;

/// ID3v2.4 frame: the size after the header is a synchsafe integer.
pub const FRAME_RECORD_V24: RecordLayout =
    RecordLayout::new(FRAME_HEADER_SIZE, LengthField::Synchsafe(4));
/// ID3v2.3 frame: the size is a plain 32-bit integer.
pub const FRAME_RECORD_V23: RecordLayout =
    RecordLayout::new(FRAME_HEADER_SIZE, LengthField::bits(BitField::bytes(4, 4)));

/// Frame record layout used by tags of major `version`.
pub fn frame_record(version: u8) -> &'static RecordLayout {
    if version == 3 {
        &FRAME_RECORD_V23
    } else {
        &FRAME_RECORD_V24
    }
}

layout! {
    /// ID3v2.4 frame header.
    pub struct FrameHeader[FRAME_HEADER_SIZE] {
        tag_alter_preservation, set_tag_alter_preservation: bool = (8, 1, 1);
        file_alter_preservation, set_file_alter_preservation: bool = (8, 2, 1);
        read_only, set_read_only: bool = (8, 3, 1);
        grouping, set_grouping: bool = (9, 1, 1);
        compression, set_compression: bool = (9, 4, 1);
        encryption, set_encryption: bool = (9, 5, 1);
        unsynchronisation, set_unsynchronisation: bool = (9, 6, 1);
        data_length_indicator, set_data_length_indicator: bool = (9, 7, 1);
    }
}

/// Four upper case letters or digits.
pub fn is_valid_frame_id(id: &[u8]) -> bool {
    id.len() == 4 && id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

impl<B: AsRef<[u8]>> FrameHeader<B> {
    pub fn id(&self) -> [u8; 4] {
        let bytes = self.as_bytes();
        [bytes[0], bytes[1], bytes[2], bytes[3]]
    }

    /// Declared body size, `None` when a size byte has its top bit set.
    pub fn size(&self) -> Option<usize> {
        FRAME_RECORD_V24.declared_length(self.as_bytes())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> FrameHeader<B> {
    pub fn set_id(&mut self, id: [u8; 4]) -> Result<()> {
        if !is_valid_frame_id(&id) {
            return Err(Id3Error::InvalidFrameId(id));
        }
        self.as_bytes_mut()[..4].copy_from_slice(&id);
        Ok(())
    }

    /// Write the body size as a synchsafe integer.
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        FRAME_RECORD_V24.set_declared_length(self.as_bytes_mut(), size)?;
        Ok(())
    }
}

/// One frame, bounded by its declared size.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    header: FrameHeader<&'a [u8]>,
    body: &'a [u8],
    version: u8,
}

impl<'a> Frame<'a> {
    /// Wrap the frame starting at `data[0]` in a tag of major `version`.
    pub fn parse(data: &'a [u8], version: u8) -> Result<Self> {
        let header = FrameHeader::new(data)?;
        let record = frame_record(version);
        let occupied = record
            .occupied_length(data)
            .ok_or(Id3Error::InvalidSynchsafe)?;
        let bytes = data.get(..occupied).ok_or(bitfield::FieldError::OutOfBounds {
            needed: occupied,
            available: data.len(),
        })?;
        if !is_valid_frame_id(&header.id()) {
            return Err(Id3Error::InvalidFrameId(header.id()));
        }
        Ok(Self {
            header: FrameHeader::new(bytes)?,
            body: &bytes[FRAME_HEADER_SIZE..],
            version,
        })
    }

    pub fn id(&self) -> [u8; 4] {
        self.header.id()
    }

    pub fn header(&self) -> &FrameHeader<&'a [u8]> {
        &self.header
    }

    /// Header and body.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.header.into_inner()
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Text information frame (T***, not TXXX).
    pub fn is_text(&self) -> bool {
        let id = self.id();
        id[0] == b'T' && &id != b"TXXX"
    }

    /// URL link frame (W***, not WXXX).
    pub fn is_url(&self) -> bool {
        let id = self.id();
        id[0] == b'W' && &id != b"WXXX"
    }

    /// The body with the data length indicator stripped and frame
    /// unsynchronisation undone. Flags are only read in version 2.4.
    pub fn content(&self) -> Result<Cow<'a, [u8]>> {
        if self.version != 4 {
            return Ok(Cow::Borrowed(self.body));
        }
        if self.header.compression() || self.header.encryption() {
            return Err(Id3Error::OpaqueFrame(self.id()));
        }
        let mut body = self.body;
        if self.header.data_length_indicator() {
            let indicator: [u8; 4] = body
                .get(..4)
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or(Id3Error::InvalidSynchsafe)?;
            synchsafe_decode(indicator).ok_or(Id3Error::InvalidSynchsafe)?;
            body = &body[4..];
        }
        if self.header.unsynchronisation() {
            return Ok(Cow::Owned(resynchronise(body)));
        }
        Ok(Cow::Borrowed(body))
    }
}

/// Undo unsynchronisation: drop every 0x00 that follows 0xFF.
pub fn resynchronise(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut previous = 0u8;
    for &byte in bytes {
        if !(previous == 0xFF && byte == 0x00) {
            out.push(byte);
        }
        previous = byte;
    }
    out
}

/// Offset where padding starts in a frame area: the first zero byte where
/// a frame id is expected, or the first frame that overruns the area.
pub fn frames_end(record: &RecordLayout, area: &[u8]) -> usize {
    let mut offset = 0;
    while offset < area.len() && area[offset] != 0 {
        match record.occupied_length(&area[offset..]) {
            Some(occupied) if offset + occupied <= area.len() => offset += occupied,
            _ => break,
        }
    }
    offset
}

/// Frames packed in `area` up to the padding.
pub fn frame_seq<'a>(record: &'a RecordLayout, area: &'a [u8]) -> RecordSeq<'a> {
    RecordSeq::new(record, &area[..frames_end(record, area)])
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    fn frame(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; FRAME_HEADER_SIZE];
        let mut header = FrameHeader::new(&mut bytes[..]).unwrap();
        header.set_id(*id).unwrap();
        header.set_size(body.len()).unwrap();
        bytes.extend_from_slice(body);
        bytes
    }

    #[test]
    fn test_header() {
        let bytes = frame(b"TIT2", &[0; 200]);
        assert_eq!(&bytes[..8], b"TIT2\x00\x00\x01\x48");
        let parsed = Frame::parse(&bytes, 4).unwrap();
        assert_eq!(parsed.id(), *b"TIT2");
        assert_eq!(parsed.body().len(), 200);
        assert!(parsed.is_text());
        assert!(!parsed.is_url());

        let mut bad = bytes.clone();
        bad[7] = 0x80;
        assert_eq!(Frame::parse(&bad, 4).unwrap_err(), Id3Error::InvalidSynchsafe);
        // the same size bytes are a plain integer in version 2.3
        let mut long = bytes.clone();
        long.resize(FRAME_HEADER_SIZE + 0x148, 0);
        assert_eq!(Frame::parse(&long, 3).unwrap().body().len(), 0x148);
        assert!(Frame::parse(&bytes, 3).is_err());
    }

    #[test]
    fn test_rejects_bad_id_and_overrun() {
        assert_eq!(
            Frame::parse(&frame(b"TIT2", b"x")[..10], 4).unwrap_err(),
            Id3Error::Field(bitfield::FieldError::OutOfBounds {
                needed: 11,
                available: 10
            })
        );
        let mut bytes = frame(b"TIT2", b"x");
        bytes[0] = b't';
        assert_eq!(
            Frame::parse(&bytes, 4).unwrap_err(),
            Id3Error::InvalidFrameId(*b"tIT2")
        );
        let mut header = FrameHeader::new(&mut bytes[..]).unwrap();
        assert!(header.set_id(*b"TI 2").is_err());
    }

    #[test]
    fn test_content_flags() {
        let mut bytes = frame(b"PRIV", &[0, 0, 0, 3, 0xFF, 0x00, 0xE0]);
        let mut header = FrameHeader::new(&mut bytes[..]).unwrap();
        header.set_data_length_indicator(true);
        header.set_unsynchronisation(true);
        assert_eq!(bytes[9], 0x03);
        let parsed = Frame::parse(&bytes, 4).unwrap();
        assert_eq!(parsed.content().unwrap().into_owned(), vec![0xFF, 0xE0]);

        let mut header = FrameHeader::new(&mut bytes[..]).unwrap();
        header.set_encryption(true);
        assert_eq!(
            Frame::parse(&bytes, 4).unwrap().content().unwrap_err(),
            Id3Error::OpaqueFrame(*b"PRIV")
        );
    }

    #[test]
    fn test_walk_stops_at_padding() {
        let mut area = frame(b"TIT2", b"\0a");
        area.extend(frame(b"TPE1", b"\0b"));
        let frames_len = area.len();
        area.extend([0u8; 8]);
        assert_eq!(frames_end(&FRAME_RECORD_V24, &area), frames_len);

        let seq = frame_seq(&FRAME_RECORD_V24, &area);
        assert_eq!(seq.count(), 2);
        assert!(seq.validate());
        assert_eq!(&seq.nth(1).unwrap()[..4], b"TPE1");
        assert!(seq.nth(2).is_none());
    }

    #[test]
    fn test_walk_stops_at_overrun() {
        let mut area = frame(b"TIT2", b"\0a");
        let first = area.len();
        area.extend(frame(b"TPE1", b"\0b"));
        area[first + 7] = 0x7F;
        assert_eq!(frames_end(&FRAME_RECORD_V24, &area), first);
        assert_eq!(frame_seq(&FRAME_RECORD_V24, &area).count(), 1);
    }

    #[test]
    fn test_resynchronise() {
        assert_eq!(resynchronise(&[0xFF, 0x00, 0x00, 0xFF, 0xFB]), [0xFF, 0x00, 0xFF, 0xFB]);
    }
}
