use bitfield::{BitField, LengthField, RecordLayout, RecordSeq, layout};

use crate::descriptor::{
    DESCRIPTOR_LIST_RECORD, Descriptors, descriptor_list, descriptors,
};
use crate::psi::section::{PSI_MAX_SIZE, TableSection};
use crate::psi::table::{SectionTable, TableSyntax};

pub const NIT_TABLE_ID_ACTUAL: u8 = 0x40;
pub const NIT_TABLE_ID_OTHER: u8 = 0x41;
pub const NIT_TS_SIZE: usize = 6;
pub const NIT_TS_RECORD: RecordLayout =
    RecordLayout::new(NIT_TS_SIZE, LengthField::bits(BitField::new(4, 4, 12)));

layout! {
    /// Transport stream entry of a NIT or BAT.
    pub struct NitTs[NIT_TS_SIZE] {
        tsid, set_tsid: u16 = (0, 0, 16);
        onid, set_onid: u16 = (2, 0, 16);
        descriptors_length, set_descriptors_length: u16 = (4, 4, 12);
    }
}

impl<B: AsRef<[u8]>> NitTs<B> {
    pub fn descriptors(&self) -> Option<Descriptors<'_>> {
        NIT_TS_RECORD
            .split(self.as_bytes())
            .map(|record| descriptors(&record[NIT_TS_SIZE..]))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> NitTs<B> {
    pub fn init(&mut self, tsid: u16, onid: u16) {
        self.set_tsid(tsid);
        self.set_onid(onid);
        BitField::new(4, 0, 4).write(self.as_bytes_mut(), 0xF);
        self.set_descriptors_length(0);
    }
}

/// First-loop descriptors and the transport stream loop of a NIT or BAT
/// section. The two loops must end exactly at the CRC.
pub(crate) struct NetworkLoops<'a> {
    pub descriptors: Descriptors<'a>,
    pub transport_streams: &'a [u8],
    pub exact: bool,
}

pub(crate) fn network_loops(section: &[u8]) -> Option<NetworkLoops<'_>> {
    let payload = TableSection::parse(section).ok()?.payload_bytes()?;
    let first = descriptor_list(payload)?;
    let ts_loop_start = 2 + first.as_bytes().len();
    let rest = payload.get(ts_loop_start..)?;
    let ts_loop = DESCRIPTOR_LIST_RECORD.split(rest)?;
    Some(NetworkLoops {
        descriptors: first,
        transport_streams: &ts_loop[2..],
        exact: ts_loop.len() == rest.len(),
    })
}

pub(crate) fn validate_network_loops(section: &[u8]) -> bool {
    let Some(loops) = network_loops(section) else {
        return false;
    };
    loops.exact
        && loops.descriptors.validate()
        && RecordSeq::new(&NIT_TS_RECORD, loops.transport_streams)
            .iter()
            .all(|record| descriptors(&record[NIT_TS_SIZE..]).validate())
}

pub(crate) fn ts_key(record: &[u8]) -> Option<(u16, u16)> {
    NitTs::new(record).ok().map(|ts| (ts.tsid(), ts.onid()))
}

/// Network Information Table (table ids 0x40 and 0x41), transport streams
/// keyed by transport stream id and original network id.
#[derive(Debug, Clone, Copy)]
pub struct Nit;

impl TableSyntax for Nit {
    const NAME: &'static str = "NIT";
    const MAX_SECTION_LENGTH: usize = PSI_MAX_SIZE;
    type Key = (u16, u16);

    fn accepts(table_id: u8) -> bool {
        matches!(table_id, NIT_TABLE_ID_ACTUAL | NIT_TABLE_ID_OTHER)
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

pub type NitTable<'a> = SectionTable<'a, Nit>;

impl<'a> SectionTable<'a, Nit> {
    pub fn network_id(&self) -> Option<u16> {
        TableSection::new(*self.sections().first()?)
            .ok()
            .map(|s| s.table_id_extension())
    }

    /// Network descriptors of every section, in order.
    pub fn network_descriptors(&self) -> impl Iterator<Item = Descriptors<'a>> + '_ {
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
pub(crate) mod tests {
    use super::*;
    use crate::psi::section::build_section;
    use crate::psi::table::validate_section;

    pub(crate) fn ts_entry(tsid: u16, onid: u16, descs: &[u8]) -> Vec<u8> {
        let mut record = vec![0u8; NIT_TS_SIZE];
        let mut view = NitTs::new(&mut record[..]).unwrap();
        view.init(tsid, onid);
        view.set_descriptors_length(descs.len() as u16);
        record.extend_from_slice(descs);
        record
    }

    pub(crate) fn network_payload(first: &[u8], entries: &[Vec<u8>]) -> Vec<u8> {
        let ts_len: usize = entries.iter().map(Vec::len).sum();
        let mut payload = vec![0xF0 | (first.len() >> 8) as u8, first.len() as u8];
        payload.extend_from_slice(first);
        payload.extend_from_slice(&[0xF0 | (ts_len >> 8) as u8, ts_len as u8]);
        for entry in entries {
            payload.extend_from_slice(entry);
        }
        payload
    }

    #[test]
    fn test_nit_lookup() {
        let name = [0x40, 0x03, b'N', b'E', b'T'];
        let payload = network_payload(
            &name,
            &[
                ts_entry(1, 0x233A, &[0x41, 0x03, 0x10, 0x44, 0x01]),
                ts_entry(2, 0x233A, &[]),
            ],
        );
        let section = build_section(NIT_TABLE_ID_ACTUAL, 0x3001, 0, 0, 0, &payload).unwrap();
        assert!(validate_section::<Nit>(&section));

        let table = NitTable::new([&section[..]]);
        assert!(table.validate());
        assert_eq!(table.network_id(), Some(0x3001));
        assert_eq!(table.network_descriptors().next().unwrap().count(), 1);
        assert_eq!(table.transport_streams().count(), 2);
        let ts = table.find_ts(1, 0x233A).unwrap();
        assert_eq!(ts.descriptors().unwrap().nth(0).unwrap().tag(), 0x41);
        assert!(table.find_ts(1, 0x0001).is_none());
    }

    #[test]
    fn test_duplicate_ts_across_sections() {
        let s0 = build_section(
            NIT_TABLE_ID_ACTUAL,
            1,
            0,
            0,
            1,
            &network_payload(&[], &[ts_entry(1, 1, &[])]),
        )
        .unwrap();
        let s1 = build_section(
            NIT_TABLE_ID_ACTUAL,
            1,
            0,
            1,
            1,
            &network_payload(&[], &[ts_entry(1, 1, &[])]),
        )
        .unwrap();
        assert!(!NitTable::new([&s0[..], &s1[..]]).validate());

        let s1 = build_section(
            NIT_TABLE_ID_ACTUAL,
            1,
            0,
            1,
            1,
            &network_payload(&[], &[ts_entry(1, 2, &[])]),
        )
        .unwrap();
        assert!(NitTable::new([&s0[..], &s1[..]]).validate());
    }

    #[test]
    fn test_trailing_bytes_after_ts_loop() {
        let mut payload = network_payload(&[], &[ts_entry(1, 1, &[])]);
        payload.push(0x00);
        let section = build_section(NIT_TABLE_ID_ACTUAL, 1, 0, 0, 0, &payload).unwrap();
        assert!(!validate_section::<Nit>(&section));
    }

    #[test]
    fn test_wrong_table_id() {
        let payload = network_payload(&[], &[]);
        let section = build_section(0x42, 1, 0, 0, 0, &payload).unwrap();
        assert!(!validate_section::<Nit>(&section));
    }
}
