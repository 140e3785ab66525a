/// Offsets of optional fields that follow each other in a fixed order, each
/// present only when its gating flag is set.
///
/// A present field starts right after the present fields before it, so the
/// offset of field `i` is `start` plus the sizes of the present fields
/// `0..i`. Resolve once from the flags, then read every field through the
/// resolved offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatedLayout<const N: usize> {
    offsets: [Option<usize>; N],
    end: usize,
}

impl<const N: usize> GatedLayout<N> {
    /// Lay out `fields`, each a `(present, size)` pair, starting at `start`.
    pub fn resolve(start: usize, fields: [(bool, usize); N]) -> Self {
        let mut offsets = [None; N];
        let mut end = start;
        for (slot, (present, size)) in offsets.iter_mut().zip(fields) {
            if present {
                *slot = Some(end);
                end += size;
            }
        }
        Self { offsets, end }
    }

    /// Offset of field `index`, `None` when absent.
    pub fn offset(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied().flatten()
    }

    /// Offset just past the last present field.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of present fields.
    pub fn present(&self) -> usize {
        self.offsets.iter().filter(|offset| offset.is_some()).count()
    }

    /// Bytes of field `index` inside `buf`, `None` when absent or when
    /// `buf` ends before the field does.
    pub fn slice<'a>(&self, buf: &'a [u8], index: usize, size: usize) -> Option<&'a [u8]> {
        let offset = self.offset(index)?;
        buf.get(offset..offset + size)
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_skip_absent_fields() {
        let layout = GatedLayout::resolve(3, [(true, 1), (false, 2), (true, 2), (true, 1)]);
        assert_eq!(layout.offset(0), Some(3));
        assert_eq!(layout.offset(1), None);
        assert_eq!(layout.offset(2), Some(4));
        assert_eq!(layout.offset(3), Some(6));
        assert_eq!(layout.offset(4), None);
        assert_eq!(layout.end(), 7);
        assert_eq!(layout.present(), 3);
    }

    #[test]
    fn test_slice_bounds() {
        let layout = GatedLayout::resolve(1, [(true, 2)]);
        assert_eq!(layout.slice(&[0, 1, 2], 0, 2), Some(&[1, 2][..]));
        assert_eq!(layout.slice(&[0, 1], 0, 2), None);
    }
}
