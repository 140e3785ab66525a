use bitfield::{BitField, RecordLayout, RecordSeq, layout};

use super::section::{PSI_MAX_SIZE, TableSection};
use super::table::{SectionTable, TableSyntax};

pub const PAT_TABLE_ID: u8 = 0x00;
pub const PAT_PROGRAM_SIZE: usize = 4;
pub const PAT_PROGRAM_RECORD: RecordLayout = RecordLayout::fixed(PAT_PROGRAM_SIZE);

layout! {
    /// One program_number / PID pair of a PAT.
    pub struct PatProgram[PAT_PROGRAM_SIZE] {
        number, set_number: u16 = (0, 0, 16);
        /// PMT PID, or the network PID for program 0.
        pid, set_pid: u16 = (2, 3, 13);
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> PatProgram<B> {
    pub fn init(&mut self, number: u16, pid: u16) {
        BitField::new(2, 0, 3).write(self.as_bytes_mut(), 0b111);
        self.set_number(number);
        self.set_pid(pid);
    }
}

/// Program Association Table (table id 0x00), keyed by program number.
///
/// A program number may appear more than once only if every occurrence
/// points at the same PID.
#[derive(Debug, Clone, Copy)]
pub struct Pat;

impl TableSyntax for Pat {
    const NAME: &'static str = "PAT";
    const MAX_SECTION_LENGTH: usize = PSI_MAX_SIZE;
    type Key = u16;

    fn accepts(table_id: u8) -> bool {
        table_id == PAT_TABLE_ID
    }

    fn records(section: &[u8]) -> Option<RecordSeq<'_>> {
        let payload = TableSection::parse(section).ok()?.payload_bytes()?;
        Some(RecordSeq::new(&PAT_PROGRAM_RECORD, payload))
    }

    fn key(record: &[u8]) -> Option<u16> {
        PatProgram::new(record).ok().map(|program| program.number())
    }

    fn same_target(first: &[u8], other: &[u8]) -> bool {
        match (PatProgram::new(first), PatProgram::new(other)) {
            (Ok(a), Ok(b)) => a.pid() == b.pid(),
            _ => false,
        }
    }
}

pub type PatTable<'a> = SectionTable<'a, Pat>;

impl<'a> SectionTable<'a, Pat> {
    /// Transport stream id carried in the table-id-extension.
    pub fn tsid(&self) -> Option<u16> {
        let first = self.sections().first()?;
        TableSection::new(*first).ok().map(|s| s.table_id_extension())
    }

    pub fn programs(&self) -> impl Iterator<Item = PatProgram<&'a [u8]>> + '_ {
        self.records()
            .filter_map(|record| PatProgram::new(record).ok())
    }

    pub fn find_program(&self, number: u16) -> Option<PatProgram<&'a [u8]>> {
        self.find_record(number)
            .and_then(|record| PatProgram::new(record).ok())
    }

    /// PID of the NIT, announced as program 0.
    pub fn nit_pid(&self) -> Option<u16> {
        self.find_program(0).map(|program| program.pid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::section::build_section;
    use crate::psi::table::validate_section;

    fn pat_section(number: u8, last: u8, programs: &[(u16, u16)]) -> Vec<u8> {
        let mut payload = vec![0u8; programs.len() * PAT_PROGRAM_SIZE];
        for (chunk, &(program, pid)) in payload.chunks_mut(PAT_PROGRAM_SIZE).zip(programs) {
            PatProgram::new(chunk).unwrap().init(program, pid);
        }
        build_section(PAT_TABLE_ID, 1, 0, number, last, &payload).unwrap()
    }

    #[test]
    fn test_single_section() {
        let section = pat_section(0, 0, &[(0, 0x0010), (1, 0x0100), (2, 0x0200)]);
        assert_eq!(&section[8..12], &[0x00, 0x00, 0xE0, 0x10]);
        assert!(validate_section::<Pat>(&section));

        let table = PatTable::new([&section[..]]);
        assert!(table.validate());
        assert_eq!(table.tsid(), Some(1));
        assert_eq!(table.nit_pid(), Some(0x0010));
        assert_eq!(table.find_program(2).map(|p| p.pid()), Some(0x0200));
        assert!(table.find_program(3).is_none());
        assert_eq!(table.programs().count(), 3);
    }

    #[test]
    fn test_duplicate_program_with_different_pid() {
        let s0 = pat_section(0, 1, &[(1, 0x0100)]);
        let s1 = pat_section(1, 1, &[(1, 0x0101)]);
        let table = PatTable::new([&s0[..], &s1[..]]);
        assert!(!table.validate());
    }

    #[test]
    fn test_duplicate_program_with_same_pid() {
        let s0 = pat_section(0, 1, &[(1, 0x0100), (2, 0x0200)]);
        let s1 = pat_section(1, 1, &[(1, 0x0100), (3, 0x0300)]);
        let table = PatTable::new([&s0[..], &s1[..]]);
        assert!(table.validate());
        assert_eq!(table.find_program(3).map(|p| p.pid()), Some(0x0300));
    }

    #[test]
    fn test_sections_sorted_by_number() {
        let s0 = pat_section(0, 1, &[(1, 0x0100)]);
        let s1 = pat_section(1, 1, &[(1, 0x0100), (2, 0x0200)]);
        let table = PatTable::new([&s1[..], &s0[..]]);
        assert_eq!(table.sections()[0], &s0[..]);
        let first = table.find_record(1).unwrap();
        assert!(std::ptr::eq(first.as_ptr(), s0[8..].as_ptr()));
        assert_eq!(
            table.programs().map(|p| p.number()).collect::<Vec<_>>(),
            vec![1, 1, 2]
        );
        assert!(table.validate());
    }

    #[test]
    fn test_partial_record_fails() {
        let mut payload = vec![0u8; 6];
        PatProgram::new(&mut payload[..4]).unwrap().init(1, 0x100);
        let section = build_section(PAT_TABLE_ID, 1, 0, 0, 0, &payload).unwrap();
        assert!(!validate_section::<Pat>(&section));
    }

    #[test]
    fn test_mismatched_sections() {
        let s0 = pat_section(0, 1, &[(1, 0x0100)]);
        let s1 = pat_section(0, 1, &[(2, 0x0200)]);
        // two sections claiming number 0
        assert!(!PatTable::new([&s0[..], &s1[..]]).validate());
        assert!(!PatTable::new(std::iter::empty()).validate());
    }

    #[test]
    fn test_bad_crc_fails() {
        let mut section = pat_section(0, 0, &[(1, 0x0100)]);
        let last = section.len() - 1;
        section[last] ^= 0xFF;
        assert!(!PatTable::new([&section[..]]).validate());
    }
}
