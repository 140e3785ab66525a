use bitfield::RecordSeq;

use super::nit::{NIT_TS_RECORD, NitTs, network_loops, ts_key, validate_network_loops};
use crate::descriptor::Descriptors;
use crate::psi::section::{PSI_MAX_SIZE, TableSection};
use crate::psi::table::{SectionTable, TableSyntax};

pub const BAT_TABLE_ID: u8 = 0x4A;

/// Bouquet Association Table (table id 0x4A). Laid out like the NIT with
/// the bouquet id in the table-id-extension.
#[derive(Debug, Clone, Copy)]
pub struct Bat;

impl TableSyntax for Bat {
    const NAME: &'static str = "BAT";
    const MAX_SECTION_LENGTH: usize = PSI_MAX_SIZE;
    type Key = (u16, u16);

    fn accepts(table_id: u8) -> bool {
        table_id == BAT_TABLE_ID
    }

    fn records(section: &[u8]) -> Option<RecordSeq<'_>> {
        network_loops(section).map(|loops| RecordSeq::new(&NIT_TS_RECORD, loops.transport_streams))
    }

    fn key(record: &[u8]) -> Option<(u16, u16)> {
        ts_key(record)
    }

    fn validate_section(section: &[u8]) -> bool {
        validate_network_loops(section)
    }
}

pub type BatTable<'a> = SectionTable<'a, Bat>;

impl<'a> SectionTable<'a, Bat> {
    pub fn bouquet_id(&self) -> Option<u16> {
        TableSection::new(*self.sections().first()?)
            .ok()
            .map(|s| s.table_id_extension())
    }

    pub fn bouquet_descriptors(&self) -> impl Iterator<Item = Descriptors<'a>> + '_ {
        self.sections()
            .iter()
            .filter_map(|&section| network_loops(section).map(|loops| loops.descriptors))
    }

    pub fn transport_streams(&self) -> impl Iterator<Item = NitTs<&'a [u8]>> + '_ {
        self.records().filter_map(|record| NitTs::new(record).ok())
    }

    pub fn find_ts(&self, tsid: u16, onid: u16) -> Option<NitTs<&'a [u8]>> {
        self.find_record((tsid, onid))
            .and_then(|record| NitTs::new(record).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dvb::nit::tests::{network_payload, ts_entry};
    use crate::psi::section::build_section;

    #[test]
    fn test_bat() {
        let name = [0x47, 0x02, b'B', b'Q'];
        let payload = network_payload(&name, &[ts_entry(3, 4, &[])]);
        let section = build_section(BAT_TABLE_ID, 0x1234, 1, 0, 0, &payload).unwrap();
        let table = BatTable::new([&section[..]]);
        assert!(table.validate());
        assert_eq!(table.bouquet_id(), Some(0x1234));
        assert_eq!(
            table.bouquet_descriptors().next().unwrap().nth(0).unwrap().tag(),
            0x47
        );
        assert!(table.find_ts(3, 4).is_some());

        // a NIT table id is not a BAT
        let section = build_section(0x40, 0x1234, 1, 0, 0, &payload).unwrap();
        assert!(!BatTable::new([&section[..]]).validate());
    }
}
