use std::ops::Range;

use crate::RecordLayout;

/// Records of one [`RecordLayout`] packed back-to-back in a bounded range.
///
/// There is no index in the wire format, so [`RecordSeq::nth`] walks from the
/// start every time; iterate with [`RecordSeq::iter`] to visit all records in
/// a single pass. A record whose declared length runs past the bound ends the
/// walk and is never handed out.
#[derive(Debug, Clone, Copy)]
pub struct RecordSeq<'a> {
    layout: &'a RecordLayout,
    data: &'a [u8],
}

impl<'a> RecordSeq<'a> {
    /// Sequence over the whole of `data`.
    pub fn new(layout: &'a RecordLayout, data: &'a [u8]) -> Self {
        Self { layout, data }
    }

    /// The bounded range.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Layout of each record.
    pub fn layout(&self) -> &'a RecordLayout {
        self.layout
    }

    /// Byte range of record `n` inside [`RecordSeq::as_bytes`].
    pub fn nth_range(&self, n: usize) -> Option<Range<usize>> {
        self.ranges().nth(n)
    }

    /// Record `n`, or `None` if the walk hits the bound or a corrupt
    /// length first.
    pub fn nth(&self, n: usize) -> Option<&'a [u8]> {
        self.nth_range(n).map(|range| &self.data[range])
    }

    /// Records in order.
    pub fn iter(&self) -> Records<'a> {
        Records {
            ranges: self.ranges(),
            data: self.data,
        }
    }

    /// Ranges of the records in order.
    pub fn ranges(&self) -> RecordRanges<'a> {
        RecordRanges {
            layout: self.layout,
            data: self.data,
            pos: 0,
        }
    }

    /// Number of records reachable before the bound or a corrupt record.
    pub fn count(&self) -> usize {
        self.ranges().count()
    }

    /// Offset just past the last well-formed record.
    pub fn walked_len(&self) -> usize {
        self.ranges().last().map_or(0, |range| range.end)
    }

    /// True only if the records fill the range exactly: no record overruns
    /// the bound and no unparsed bytes trail the last record.
    pub fn validate(&self) -> bool {
        let mut ranges = self.ranges();
        for _ in ranges.by_ref() {}
        ranges.pos == self.data.len()
    }
}

impl<'a> IntoIterator for &RecordSeq<'a> {
    type Item = &'a [u8];
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the byte ranges of a [`RecordSeq`].
#[derive(Debug, Clone)]
pub struct RecordRanges<'a> {
    layout: &'a RecordLayout,
    data: &'a [u8],
    pos: usize,
}

impl Iterator for RecordRanges<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.data.get(self.pos..)?;
        if rest.is_empty() {
            return None;
        }
        let occupied = self.layout.occupied_length(rest)?;
        if occupied == 0 || occupied > rest.len() {
            return None;
        }
        let start = self.pos;
        self.pos += occupied;
        Some(start..self.pos)
    }
}

/// Iterator over the records of a [`RecordSeq`].
#[derive(Debug, Clone)]
pub struct Records<'a> {
    ranges: RecordRanges<'a>,
    data: &'a [u8],
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.ranges.next().map(|range| &self.data[range])
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::{BitField, LengthField};

    const DESCRIPTOR: RecordLayout =
        RecordLayout::new(2, LengthField::bits(BitField::bytes(1, 1)));

    fn three_descriptors() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&[0x40, 0x03, b'A', b'B', b'C']);
        data.extend_from_slice(&[0x52, 0x01, 0x07]);
        data.extend_from_slice(&[0x0A, 0x04, b'e', b'n', b'g', 0x00]);
        data
    }

    #[test]
    fn test_single_descriptor_fills_bound() {
        let data = [0x40, 0x03, b'A', b'B', b'C'];
        assert!(RecordSeq::new(&DESCRIPTOR, &data).validate());

        let data = [0x40, 0x04, b'A', b'B', b'C'];
        let seq = RecordSeq::new(&DESCRIPTOR, &data);
        assert!(!seq.validate());
        assert_eq!(seq.nth(0), None);
    }

    #[test]
    fn test_sequence_completeness() {
        let data = three_descriptors();
        let seq = RecordSeq::new(&DESCRIPTOR, &data);
        assert!(seq.validate());
        assert_eq!(seq.count(), 3);
        assert_eq!(seq.nth(0), Some(&data[0..5]));
        assert_eq!(seq.nth(1), Some(&data[5..8]));
        assert_eq!(seq.nth(2), Some(&data[8..14]));
        assert_eq!(seq.nth(3), None);
        assert_eq!(seq.nth_range(2), Some(8..14));
        assert_eq!(seq.walked_len(), 14);
    }

    #[test]
    fn test_sequence_corruption_stops_walk() {
        let mut data = three_descriptors();
        // second descriptor now claims more bytes than remain
        data[6] = 0x20;
        let seq = RecordSeq::new(&DESCRIPTOR, &data);
        assert!(!seq.validate());
        assert!(seq.nth(0).is_some());
        assert_eq!(seq.nth(1), None);
        assert_eq!(seq.nth(2), None);
        assert_eq!(seq.iter().count(), 1);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut data = three_descriptors();
        data.push(0x40);
        let seq = RecordSeq::new(&DESCRIPTOR, &data);
        assert_eq!(seq.count(), 3);
        assert!(!seq.validate());
    }

    #[test]
    fn test_empty_sequence_is_valid() {
        let seq = RecordSeq::new(&DESCRIPTOR, &[]);
        assert!(seq.validate());
        assert_eq!(seq.nth(0), None);
    }

    #[test]
    fn test_fixed_records() {
        let layout = RecordLayout::fixed(4);
        let data = [0u8; 12];
        let seq = RecordSeq::new(&layout, &data);
        assert!(seq.validate());
        assert_eq!(seq.count(), 3);
        assert!(!RecordSeq::new(&layout, &data[..10]).validate());
    }
}
