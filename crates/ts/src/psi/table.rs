use std::fmt;
use std::marker::PhantomData;

use bitfield::RecordSeq;
use bytes::Bytes;
use tracing::{debug, trace};

use super::section::{PSI_MAX_SECTIONS, TableSection};

/// The sections of one table version, collected by section number.
///
/// Sections are stored whole, CRC included. A section whose version,
/// table id or table-id-extension disagrees with what is already held
/// starts a new table.
pub struct PsiTable {
    sections: Vec<Option<Bytes>>,
}

impl Default for PsiTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PsiTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PsiTable")
            .field("table_id", &self.table_id())
            .field("version", &self.version())
            .field("last_section", &self.last_section())
            .field("held", &self.sections.iter().flatten().count())
            .finish()
    }
}

impl PsiTable {
    pub fn new() -> Self {
        Self {
            sections: vec![None; PSI_MAX_SECTIONS],
        }
    }

    fn first(&self) -> Option<TableSection<&[u8]>> {
        self.sections
            .iter()
            .flatten()
            .next()
            .and_then(|section| TableSection::new(&section[..]).ok())
    }

    pub fn table_id(&self) -> Option<u8> {
        self.first().map(|s| s.table_id())
    }

    pub fn table_id_extension(&self) -> Option<u16> {
        self.first().map(|s| s.table_id_extension())
    }

    pub fn version(&self) -> Option<u8> {
        self.first().map(|s| s.version())
    }

    pub fn last_section(&self) -> Option<u8> {
        self.first().map(|s| s.last_section_number())
    }

    /// Add a section. Returns true once every section `0..=last` of one
    /// version is held.
    ///
    /// Sections that are malformed or not yet applicable
    /// (`current_next_indicator == 0`) are ignored.
    pub fn insert(&mut self, section: Bytes) -> bool {
        let Ok(view) = TableSection::parse(&section[..]) else {
            debug!(len = section.len(), "ignoring unparsable section");
            return self.is_complete();
        };
        if !view.validate() {
            debug!(table_id = view.table_id(), "ignoring malformed section");
            return self.is_complete();
        }
        if !view.current_next() {
            trace!(table_id = view.table_id(), "ignoring next-version section");
            return self.is_complete();
        }

        let (table_id, extension, version, last) = (
            view.table_id(),
            view.table_id_extension(),
            view.version(),
            view.last_section_number(),
        );
        let number = view.section_number() as usize;
        if let Some(first) = self.first()
            && (first.table_id() != table_id
                || first.table_id_extension() != extension
                || first.version() != version
                || first.last_section_number() != last)
        {
            debug!(
                table_id,
                extension,
                old_version = first.version(),
                new_version = version,
                "table changed, dropping held sections"
            );
            self.clear();
        }
        self.sections[number] = Some(section);
        self.is_complete()
    }

    /// Every section `0..=last_section` is held.
    pub fn is_complete(&self) -> bool {
        match self.last_section() {
            Some(last) => self.sections[..=last as usize].iter().all(Option::is_some),
            None => false,
        }
    }

    /// Section `n`, if held.
    pub fn get(&self, n: u8) -> Option<&Bytes> {
        self.sections[n as usize].as_ref()
    }

    /// Held sections in section-number order.
    pub fn sections(&self) -> impl Iterator<Item = &[u8]> {
        self.sections.iter().flatten().map(|section| &section[..])
    }

    /// Both tables hold the same version with identical section bytes.
    pub fn compare(&self, other: &PsiTable) -> bool {
        self.version() == other.version()
            && self.last_section() == other.last_section()
            && self.sections.iter().zip(&other.sections).all(|(a, b)| a == b)
    }

    pub fn clear(&mut self) {
        self.sections.iter_mut().for_each(|section| *section = None);
    }
}

/// How the records of one table type are laid out and keyed.
pub trait TableSyntax {
    const NAME: &'static str;
    /// Largest `section_length` this table allows.
    const MAX_SECTION_LENGTH: usize;

    /// Key identifying a record across the sections of a table.
    type Key: Copy + PartialEq + fmt::Debug;

    fn accepts(table_id: u8) -> bool;

    /// The record loop of one section, or `None` when the fields bounding
    /// it run past the section.
    fn records(section: &[u8]) -> Option<RecordSeq<'_>>;

    /// Key of a well-formed record, `None` for tables whose records carry
    /// no key.
    fn key(record: &[u8]) -> Option<Self::Key>;

    /// Whether a second record with the key of `first` is acceptable.
    fn same_target(_first: &[u8], _other: &[u8]) -> bool {
        false
    }

    /// Table-specific checks on one section: nested descriptor loops,
    /// loops that must end at the CRC.
    fn validate_section(_section: &[u8]) -> bool {
        true
    }
}

/// One section of a `T` table on its own: long form within the table's
/// size limit, good CRC, record loop filling its bound, table-specific
/// checks passing.
pub fn validate_section<T: TableSyntax>(section: &[u8]) -> bool {
    let Ok(view) = TableSection::parse(section) else {
        return false;
    };
    T::accepts(view.table_id())
        && view.validate_with(T::MAX_SECTION_LENGTH)
        && view.check_crc()
        && T::records(section).is_some_and(|records| records.validate())
        && T::validate_section(section)
}

/// A table spread over several sections of the same table id and
/// table-id-extension.
pub struct SectionTable<'a, T> {
    sections: Vec<&'a [u8]>,
    _syntax: PhantomData<T>,
}

impl<T> Clone for SectionTable<'_, T> {
    fn clone(&self) -> Self {
        Self {
            sections: self.sections.clone(),
            _syntax: PhantomData,
        }
    }
}

impl<T: TableSyntax> fmt::Debug for SectionTable<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionTable")
            .field("table", &T::NAME)
            .field("sections", &self.sections.len())
            .finish()
    }
}

impl<'a, T: TableSyntax> SectionTable<'a, T> {
    /// Sections are put in section-number order; ones whose header does
    /// not parse go last.
    pub fn new(sections: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut sections: Vec<&'a [u8]> = sections.into_iter().collect();
        sections.sort_by_key(|section| {
            TableSection::new(*section).map_or(usize::MAX, |view| view.section_number() as usize)
        });
        Self {
            sections,
            _syntax: PhantomData,
        }
    }

    /// View over a collected table.
    pub fn from_psi(table: &'a PsiTable) -> Self {
        Self::new(table.sections())
    }

    pub fn sections(&self) -> &[&'a [u8]] {
        &self.sections
    }

    /// Records of every section, in section then wire order.
    pub fn records(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.sections
            .iter()
            .filter_map(|&section| T::records(section))
            .flat_map(|seq| seq.iter())
    }

    /// First record whose key matches.
    pub fn find_record(&self, key: T::Key) -> Option<&'a [u8]> {
        self.records().find(|record| T::key(record) == Some(key))
    }

    fn validate_sections(&self) -> bool {
        let Some(first) = self
            .sections
            .first()
            .and_then(|section| TableSection::new(*section).ok())
        else {
            return false;
        };
        let mut seen = [false; PSI_MAX_SECTIONS];
        self.sections.iter().all(|&section| {
            if !validate_section::<T>(section) {
                return false;
            }
            let Ok(view) = TableSection::new(section) else {
                return false;
            };
            let number = view.section_number() as usize;
            let duplicate = std::mem::replace(&mut seen[number], true);
            !duplicate
                && view.table_id() == first.table_id()
                && view.table_id_extension() == first.table_id_extension()
                && view.version() == first.version()
                && view.last_section_number() == first.last_section_number()
        })
    }

    /// Every section is well formed with a good CRC, every record loop
    /// fills its bound exactly, and every key resolves to the record
    /// carrying it (or, where the table allows, to one with the same
    /// target).
    pub fn validate(&self) -> bool {
        if !self.validate_sections() {
            return false;
        }
        self.records().all(|record| {
            let Some(key) = T::key(record) else {
                return true;
            };
            match self.find_record(key) {
                Some(first) => {
                    std::ptr::eq(first.as_ptr(), record.as_ptr()) || T::same_target(first, record)
                }
                None => false,
            }
        })
    }
}
