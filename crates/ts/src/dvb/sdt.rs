use bitfield::{BitField, LengthField, RecordLayout, RecordSeq, layout};

use crate::descriptor::{Descriptors, descriptors};
use crate::psi::section::{PSI_HEADER_SIZE_SYNTAX1, PSI_MAX_SIZE, TableSection};
use crate::psi::table::{SectionTable, TableSyntax};

pub const SDT_TABLE_ID_ACTUAL: u8 = 0x42;
pub const SDT_TABLE_ID_OTHER: u8 = 0x46;
pub const SDT_HEADER_SIZE: usize = PSI_HEADER_SIZE_SYNTAX1 + 3;
pub const SDT_SERVICE_SIZE: usize = 5;
pub const SDT_SERVICE_RECORD: RecordLayout =
    RecordLayout::new(SDT_SERVICE_SIZE, LengthField::bits(BitField::new(3, 4, 12)));

layout! {
    /// Fields following the long header of an SDT section.
    pub struct SdtHeader[SDT_HEADER_SIZE] {
        tsid, set_tsid: u16 = (3, 0, 16);
        onid, set_onid: u16 = (8, 0, 16);
    }
}

layout! {
    /// Service entry of an SDT.
    pub struct SdtService[SDT_SERVICE_SIZE] {
        service_id, set_service_id: u16 = (0, 0, 16);
        eit_schedule, set_eit_schedule: bool = (2, 6, 1);
        eit_present_following, set_eit_present_following: bool = (2, 7, 1);
        running_status, set_running_status: u8 = (3, 0, 3);
        free_ca_mode, set_free_ca_mode: bool = (3, 3, 1);
        descriptors_length, set_descriptors_length: u16 = (3, 4, 12);
    }
}

impl<B: AsRef<[u8]>> SdtService<B> {
    pub fn descriptors(&self) -> Option<Descriptors<'_>> {
        SDT_SERVICE_RECORD
            .split(self.as_bytes())
            .map(|record| descriptors(&record[SDT_SERVICE_SIZE..]))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SdtService<B> {
    pub fn init(&mut self, service_id: u16) {
        let bytes = self.as_bytes_mut();
        bytes[..SDT_SERVICE_SIZE].fill(0);
        BitField::new(2, 0, 6).write(bytes, 0x3F);
        self.set_service_id(service_id);
    }
}

/// Running status values shared by SDT services and EIT events.
pub fn running_status_name(status: u8) -> &'static str {
    match status {
        0 => "undefined",
        1 => "not running",
        2 => "starts in a few seconds",
        3 => "pausing",
        4 => "running",
        5 => "service off-air",
        _ => "reserved",
    }
}

fn services(section: &[u8]) -> Option<&[u8]> {
    let payload = TableSection::parse(section).ok()?.payload_bytes()?;
    payload.get(SDT_HEADER_SIZE - PSI_HEADER_SIZE_SYNTAX1..)
}

/// Service Description Table (table ids 0x42 and 0x46), services keyed by
/// service id.
#[derive(Debug, Clone, Copy)]
pub struct Sdt;

impl TableSyntax for Sdt {
    const NAME: &'static str = "SDT";
    const MAX_SECTION_LENGTH: usize = PSI_MAX_SIZE;
    type Key = u16;

    fn accepts(table_id: u8) -> bool {
        matches!(table_id, SDT_TABLE_ID_ACTUAL | SDT_TABLE_ID_OTHER)
    }

    fn records(section: &[u8]) -> Option<RecordSeq<'_>> {
        services(section).map(|data| RecordSeq::new(&SDT_SERVICE_RECORD, data))
    }

    fn key(record: &[u8]) -> Option<u16> {
        SdtService::new(record).ok().map(|s| s.service_id())
    }

    fn validate_section(section: &[u8]) -> bool {
        services(section).is_some_and(|data| {
            RecordSeq::new(&SDT_SERVICE_RECORD, data)
                .iter()
                .all(|record| descriptors(&record[SDT_SERVICE_SIZE..]).validate())
        })
    }
}

pub type SdtTable<'a> = SectionTable<'a, Sdt>;

impl<'a> SectionTable<'a, Sdt> {
    fn header(&self) -> Option<SdtHeader<&'a [u8]>> {
        SdtHeader::new(*self.sections().first()?).ok()
    }

    pub fn tsid(&self) -> Option<u16> {
        self.header().map(|h| h.tsid())
    }

    pub fn onid(&self) -> Option<u16> {
        self.header().map(|h| h.onid())
    }

    pub fn services(&self) -> impl Iterator<Item = SdtService<&'a [u8]>> + '_ {
        self.records().filter_map(|record| SdtService::new(record).ok())
    }

    pub fn find_service(&self, service_id: u16) -> Option<SdtService<&'a [u8]>> {
        self.find_record(service_id)
            .and_then(|record| SdtService::new(record).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::section::build_section;

    fn service(id: u16, running: u8, descs: &[u8]) -> Vec<u8> {
        let mut record = vec![0u8; SDT_SERVICE_SIZE];
        let mut view = SdtService::new(&mut record[..]).unwrap();
        view.init(id);
        view.set_eit_present_following(true);
        view.set_running_status(running);
        view.set_descriptors_length(descs.len() as u16);
        record.extend_from_slice(descs);
        record
    }

    fn sdt_section(number: u8, last: u8, services: &[Vec<u8>]) -> Vec<u8> {
        let mut payload = vec![0x00, 0x01, 0xFF];
        for s in services {
            payload.extend_from_slice(s);
        }
        build_section(SDT_TABLE_ID_ACTUAL, 0x0044, 0, number, last, &payload).unwrap()
    }

    #[test]
    fn test_service_fields() {
        let desc = [0x48, 0x05, 0x01, 0x01, b'P', 0x01, b'S'];
        let section = sdt_section(0, 0, &[service(0x1001, 4, &desc)]);
        let table = SdtTable::new([&section[..]]);
        assert!(table.validate());
        assert_eq!(table.tsid(), Some(0x0044));
        assert_eq!(table.onid(), Some(0x0001));

        let s = table.find_service(0x1001).unwrap();
        assert!(s.eit_present_following());
        assert!(!s.eit_schedule());
        assert_eq!(s.running_status(), 4);
        assert_eq!(running_status_name(s.running_status()), "running");
        assert!(!s.free_ca_mode());
        assert_eq!(s.descriptors().unwrap().count(), 1);
        assert_eq!(&section[11..14], &[0x10, 0x01, 0xFD]);
    }

    #[test]
    fn test_duplicate_service_id() {
        let s0 = sdt_section(0, 1, &[service(1, 4, &[])]);
        let s1 = sdt_section(1, 1, &[service(1, 4, &[])]);
        assert!(!SdtTable::new([&s0[..], &s1[..]]).validate());

        let s1 = sdt_section(1, 1, &[service(2, 4, &[])]);
        let table = SdtTable::new([&s0[..], &s1[..]]);
        assert!(table.validate());
        assert_eq!(table.services().count(), 2);
    }

    #[test]
    fn test_service_descriptor_overrun() {
        let section = sdt_section(0, 0, &[service(1, 4, &[0x48, 0x09, 0x01])]);
        assert!(!SdtTable::new([&section[..]]).validate());
    }
}
