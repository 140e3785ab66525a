use bitfield::RecordSeq;

use super::section::{PSI_MAX_SIZE, TableSection};
use super::table::{SectionTable, TableSyntax};
use crate::descriptor::{DESCRIPTOR_RECORD, Descriptor};

pub const CAT_TABLE_ID: u8 = 0x01;

/// Conditional Access Table (table id 0x01): a bare descriptor loop, no
/// keyed records.
#[derive(Debug, Clone, Copy)]
pub struct Cat;

impl TableSyntax for Cat {
    const NAME: &'static str = "CAT";
    const MAX_SECTION_LENGTH: usize = PSI_MAX_SIZE;
    type Key = ();

    fn accepts(table_id: u8) -> bool {
        table_id == CAT_TABLE_ID
    }

    fn records(section: &[u8]) -> Option<RecordSeq<'_>> {
        let payload = TableSection::parse(section).ok()?.payload_bytes()?;
        Some(RecordSeq::new(&DESCRIPTOR_RECORD, payload))
    }

    fn key(_record: &[u8]) -> Option<()> {
        None
    }
}

pub type CatTable<'a> = SectionTable<'a, Cat>;

impl<'a> SectionTable<'a, Cat> {
    pub fn descriptors(&self) -> impl Iterator<Item = Descriptor<&'a [u8]>> + '_ {
        self.records()
            .filter_map(|record| Descriptor::new(record).ok())
    }
}
