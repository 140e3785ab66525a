//! Descriptor loops: `[tag][length][payload]` records packed back-to-back.

use bitfield::{BitField, LengthField, RecordLayout, RecordSeq, Records, layout};

use crate::{Result, TsError};

/// Size of the tag and length bytes.
pub const DESCRIPTOR_HEADER_SIZE: usize = 2;
/// Largest payload a length byte can declare.
pub const DESCRIPTOR_MAX_SIZE: usize = 255;

/// A descriptor declares its payload length in its second byte.
pub const DESCRIPTOR_RECORD: RecordLayout =
    RecordLayout::new(DESCRIPTOR_HEADER_SIZE, LengthField::bits(BitField::bytes(1, 1)));

/// A descriptor list prefixed by 4 reserved bits and a 12-bit byte count.
pub const DESCRIPTOR_LIST_RECORD: RecordLayout =
    RecordLayout::new(2, LengthField::bits(BitField::new(0, 4, 12)));

layout! {
    /// Generic descriptor header.
    pub struct Descriptor[DESCRIPTOR_HEADER_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
    }
}

impl<B: AsRef<[u8]>> Descriptor<B> {
    /// Bytes after the header, bounded by the declared length.
    pub fn payload(&self) -> Option<&[u8]> {
        let end = DESCRIPTOR_HEADER_SIZE + self.length() as usize;
        self.as_bytes().get(DESCRIPTOR_HEADER_SIZE..end)
    }

    /// Header plus declared payload.
    pub fn occupied_length(&self) -> usize {
        DESCRIPTOR_HEADER_SIZE + self.length() as usize
    }

    /// The declared payload fits inside the buffer.
    pub fn validate(&self) -> bool {
        DESCRIPTOR_RECORD.validate(self.as_bytes())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Descriptor<B> {
    /// Write the tag and a zero length.
    pub fn init(&mut self, tag: u8) {
        self.set_tag(tag);
        self.set_length(0);
    }

    /// Writable payload bytes.
    pub fn payload_mut(&mut self) -> Option<&mut [u8]> {
        let end = DESCRIPTOR_HEADER_SIZE + self.length() as usize;
        self.as_bytes_mut().get_mut(DESCRIPTOR_HEADER_SIZE..end)
    }
}

/// Walk a bounded descriptor loop.
pub fn descriptors(data: &[u8]) -> Descriptors<'_> {
    Descriptors {
        seq: RecordSeq::new(&DESCRIPTOR_RECORD, data),
    }
}

/// Descriptors packed inside a bounded range.
#[derive(Debug, Clone, Copy)]
pub struct Descriptors<'a> {
    seq: RecordSeq<'a>,
}

impl<'a> Descriptors<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.seq.as_bytes()
    }

    pub fn iter(&self) -> DescriptorIter<'a> {
        DescriptorIter {
            records: self.seq.iter(),
        }
    }

    /// Descriptor `n`, walking from the start of the loop.
    pub fn nth(&self, n: usize) -> Option<Descriptor<&'a [u8]>> {
        self.seq.nth(n).and_then(|record| Descriptor::new(record).ok())
    }

    /// The `n`th descriptor carrying `tag`.
    pub fn find(&self, tag: u8, n: usize) -> Option<Descriptor<&'a [u8]>> {
        self.iter().filter(|desc| desc.tag() == tag).nth(n)
    }

    pub fn count(&self) -> usize {
        self.seq.count()
    }

    /// Offset just past the last well-formed descriptor.
    pub fn walked_len(&self) -> usize {
        self.seq.walked_len()
    }

    /// The descriptors fill the range exactly.
    pub fn validate(&self) -> bool {
        self.seq.validate()
    }
}

impl<'a> IntoIterator for &Descriptors<'a> {
    type Item = Descriptor<&'a [u8]>;
    type IntoIter = DescriptorIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the well-formed descriptors of a loop.
#[derive(Debug, Clone)]
pub struct DescriptorIter<'a> {
    records: Records<'a>,
}

impl<'a> Iterator for DescriptorIter<'a> {
    type Item = Descriptor<&'a [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .next()
            .and_then(|record| Descriptor::new(record).ok())
    }
}

/// Descriptors behind a 12-bit length prefix at the start of `data`, or
/// `None` when the declared length runs past `data`.
pub fn descriptor_list(data: &[u8]) -> Option<Descriptors<'_>> {
    let body = DESCRIPTOR_LIST_RECORD.split(data)?;
    Some(descriptors(&body[2..]))
}

layout! {
    /// Descriptor loop prefixed by a 12-bit length, as found in PMT, NIT,
    /// BAT, TOT and SCTE-35 sections.
    pub struct DescriptorList[2] {
        length, set_length: u16 = (0, 4, 12);
    }
}

impl<B: AsRef<[u8]>> DescriptorList<B> {
    /// Prefix plus declared descriptor bytes.
    pub fn occupied_length(&self) -> usize {
        2 + self.length() as usize
    }

    /// The descriptors, or `None` when the declared length runs past the
    /// buffer.
    pub fn descriptors(&self) -> Option<Descriptors<'_>> {
        descriptor_list(self.as_bytes())
    }

    /// The declared length fits and the descriptors fill it exactly.
    pub fn validate(&self) -> bool {
        self.descriptors().is_some_and(|descs| descs.validate())
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> DescriptorList<B> {
    /// Set the reserved bits and a zero length.
    pub fn init(&mut self) {
        BitField::new(0, 0, 4).write(self.as_bytes_mut(), 0xF);
        self.set_length(0);
    }

    /// Declare `length` descriptor bytes, rejecting lengths past the buffer
    /// or wider than 12 bits.
    pub fn set_descriptors_length(&mut self, length: usize) -> Result<()> {
        let available = self.as_bytes().len() - 2;
        if length > available {
            return Err(TsError::InsufficientData {
                expected: length + 2,
                actual: self.as_bytes().len(),
            });
        }
        DESCRIPTOR_LIST_RECORD.set_declared_length(self.as_bytes_mut(), length)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_loop() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&[0x05, 0x04, b'C', b'U', b'E', b'I']);
        data.extend_from_slice(&[0x0A, 0x04, b'e', b'n', b'g', 0x00]);
        data.extend_from_slice(&[0x52, 0x01, 0x07]);
        data
    }

    #[test]
    fn test_single_descriptor_bounds() {
        let data = [0x40, 0x03, b'A', b'B', b'C'];
        let descs = descriptors(&data);
        assert!(descs.validate());
        assert_eq!(descs.nth(0).unwrap().payload(), Some(&b"ABC"[..]));

        let data = [0x40, 0x04, b'A', b'B', b'C'];
        let descs = descriptors(&data);
        assert!(!descs.validate());
        assert!(descs.nth(0).is_none());
        assert!(!Descriptor::new(&data[..]).unwrap().validate());
    }

    #[test]
    fn test_walk_and_find() {
        let data = sample_loop();
        let descs = descriptors(&data);
        assert!(descs.validate());
        assert_eq!(descs.count(), 3);
        assert_eq!(descs.nth(2).unwrap().tag(), 0x52);
        assert!(descs.nth(3).is_none());
        assert_eq!(descs.find(0x0A, 0).unwrap().payload(), Some(&b"eng\0"[..]));
        assert!(descs.find(0x0A, 1).is_none());
        let tags: Vec<u8> = descs.iter().map(|d| d.tag()).collect();
        assert_eq!(tags, vec![0x05, 0x0A, 0x52]);
    }

    #[test]
    fn test_empty_loop() {
        let descs = descriptors(&[]);
        assert!(descs.validate());
        assert_eq!(descs.count(), 0);
    }

    #[test]
    fn test_truncated_header() {
        let descs = descriptors(&[0x05]);
        assert!(!descs.validate());
        assert_eq!(descs.count(), 0);
    }

    #[test]
    fn test_descriptor_list() {
        let mut data = vec![0xF0, 0x00];
        data.extend_from_slice(&sample_loop());
        let mut list = DescriptorList::new(&mut data[..]).unwrap();
        list.set_descriptors_length(15).unwrap();
        assert_eq!(data[0], 0xF0);
        assert_eq!(data[1], 15);

        let list = DescriptorList::new(&data[..]).unwrap();
        assert!(list.validate());
        assert_eq!(list.occupied_length(), 17);
        assert_eq!(list.descriptors().unwrap().count(), 3);

        // one byte short of the last descriptor
        let list = DescriptorList::new(&data[..16]).unwrap();
        assert!(list.descriptors().is_none());
        assert!(!list.validate());
    }

    #[test]
    fn test_descriptor_list_rejects_oversize() {
        let mut data = [0u8; 4];
        let mut list = DescriptorList::new(&mut data[..]).unwrap();
        list.init();
        assert!(list.set_descriptors_length(3).is_err());
        assert!(list.set_descriptors_length(2).is_ok());
        assert_eq!(data, [0xF0, 0x02, 0x00, 0x00]);
    }

    #[test]
    fn test_write_descriptor() {
        let mut data = [0u8; 6];
        let mut desc = Descriptor::new(&mut data[..]).unwrap();
        desc.init(0x05);
        desc.set_length(4);
        desc.payload_mut().unwrap().copy_from_slice(b"CUEI");
        assert_eq!(data, [0x05, 0x04, b'C', b'U', b'E', b'I']);
    }
}
