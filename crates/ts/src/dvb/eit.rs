use bitfield::{BitField, LengthField, RecordLayout, RecordSeq, layout};
use chrono::{NaiveDateTime, TimeDelta};

use super::time::{decode_duration, decode_utc_time};
use crate::descriptor::{Descriptors, descriptors};
use crate::psi::section::{PSI_HEADER_SIZE_SYNTAX1, PSI_PRIVATE_MAX_SIZE, TableSection};
use crate::psi::table::{SectionTable, TableSyntax};

/// Present/following, actual transport stream.
pub const EIT_TABLE_ID_PF_ACTUAL: u8 = 0x4E;
/// Present/following, other transport stream.
pub const EIT_TABLE_ID_PF_OTHER: u8 = 0x4F;
pub const EIT_TABLE_ID_SCHED_ACTUAL_FIRST: u8 = 0x50;
pub const EIT_TABLE_ID_SCHED_ACTUAL_LAST: u8 = 0x5F;
pub const EIT_TABLE_ID_SCHED_OTHER_FIRST: u8 = 0x60;
pub const EIT_TABLE_ID_SCHED_OTHER_LAST: u8 = 0x6F;

pub const EIT_HEADER_SIZE: usize = PSI_HEADER_SIZE_SYNTAX1 + 6;
pub const EIT_EVENT_SIZE: usize = 12;
pub const EIT_EVENT_RECORD: RecordLayout =
    RecordLayout::new(EIT_EVENT_SIZE, LengthField::bits(BitField::new(10, 4, 12)));

layout! {
    /// Fields following the long header of an EIT section.
    pub struct EitHeader[EIT_HEADER_SIZE] {
        service_id, set_service_id: u16 = (3, 0, 16);
        tsid, set_tsid: u16 = (8, 0, 16);
        onid, set_onid: u16 = (10, 0, 16);
        segment_last_section_number, set_segment_last_section_number: u8 = (12, 0, 8);
        last_table_id, set_last_table_id: u8 = (13, 0, 8);
    }
}

layout! {
    /// Event entry of an EIT.
    pub struct EitEvent[EIT_EVENT_SIZE] {
        event_id, set_event_id: u16 = (0, 0, 16);
        start_mjd, set_start_mjd: u16 = (2, 0, 16);
        /// BCD hh:mm:ss of the start time.
        start_hms, set_start_hms: u32 = (4, 0, 24);
        /// BCD hh:mm:ss.
        duration_bcd, set_duration_bcd: u32 = (7, 0, 24);
        running_status, set_running_status: u8 = (10, 0, 3);
        free_ca_mode, set_free_ca_mode: bool = (10, 3, 1);
        descriptors_length, set_descriptors_length: u16 = (10, 4, 12);
    }
}

impl<B: AsRef<[u8]>> EitEvent<B> {
    /// Start time in UTC, `None` when undefined or not valid BCD.
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        decode_utc_time(&self.as_bytes()[2..7])
    }

    pub fn duration(&self) -> Option<TimeDelta> {
        let bytes = &self.as_bytes()[7..10];
        decode_duration([bytes[0], bytes[1], bytes[2]])
    }

    pub fn descriptors(&self) -> Option<Descriptors<'_>> {
        EIT_EVENT_RECORD
            .split(self.as_bytes())
            .map(|record| descriptors(&record[EIT_EVENT_SIZE..]))
    }
}

fn events(section: &[u8]) -> Option<&[u8]> {
    let payload = TableSection::parse(section).ok()?.payload_bytes()?;
    payload.get(EIT_HEADER_SIZE - PSI_HEADER_SIZE_SYNTAX1..)
}

/// Event Information Table (table ids 0x4E to 0x6F), events keyed by event
/// id.
#[derive(Debug, Clone, Copy)]
pub struct Eit;

impl TableSyntax for Eit {
    const NAME: &'static str = "EIT";
    const MAX_SECTION_LENGTH: usize = PSI_PRIVATE_MAX_SIZE;
    type Key = u16;

    fn accepts(table_id: u8) -> bool {
        (EIT_TABLE_ID_PF_ACTUAL..=EIT_TABLE_ID_SCHED_OTHER_LAST).contains(&table_id)
    }

    fn records(section: &[u8]) -> Option<RecordSeq<'_>> {
        events(section).map(|data| RecordSeq::new(&EIT_EVENT_RECORD, data))
    }

    fn key(record: &[u8]) -> Option<u16> {
        EitEvent::new(record).ok().map(|e| e.event_id())
    }

    fn validate_section(section: &[u8]) -> bool {
        let header_ok = EitHeader::new(section).is_ok_and(|header| {
            header.segment_last_section_number() >= TableSection::new(section)
                .map_or(0, |s| s.section_number())
        });
        header_ok
            && events(section).is_some_and(|data| {
                RecordSeq::new(&EIT_EVENT_RECORD, data)
                    .iter()
                    .all(|record| descriptors(&record[EIT_EVENT_SIZE..]).validate())
            })
    }
}

pub type EitTable<'a> = SectionTable<'a, Eit>;

impl<'a> SectionTable<'a, Eit> {
    fn header(&self) -> Option<EitHeader<&'a [u8]>> {
        EitHeader::new(*self.sections().first()?).ok()
    }

    pub fn service_id(&self) -> Option<u16> {
        self.header().map(|h| h.service_id())
    }

    pub fn tsid(&self) -> Option<u16> {
        self.header().map(|h| h.tsid())
    }

    pub fn onid(&self) -> Option<u16> {
        self.header().map(|h| h.onid())
    }

    pub fn events(&self) -> impl Iterator<Item = EitEvent<&'a [u8]>> + '_ {
        self.records().filter_map(|record| EitEvent::new(record).ok())
    }

    pub fn find_event(&self, event_id: u16) -> Option<EitEvent<&'a [u8]>> {
        self.find_record(event_id)
            .and_then(|record| EitEvent::new(record).ok())
    }
}
