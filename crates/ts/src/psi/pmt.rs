use bitfield::{BitField, LengthField, RecordLayout, RecordSeq, layout};

use super::section::{PSI_HEADER_SIZE_SYNTAX1, PSI_MAX_SIZE, TableSection};
use super::table::{SectionTable, TableSyntax};
use crate::descriptor::{Descriptors, descriptor_list, descriptors};

pub const PMT_TABLE_ID: u8 = 0x02;
pub const PMT_HEADER_SIZE: usize = PSI_HEADER_SIZE_SYNTAX1 + 4;
pub const PMT_ES_SIZE: usize = 5;
pub const PMT_ES_RECORD: RecordLayout =
    RecordLayout::new(PMT_ES_SIZE, LengthField::bits(BitField::new(3, 4, 12)));

layout! {
    /// Fields following the long header of a PMT section.
    pub struct PmtHeader[PMT_HEADER_SIZE] {
        program_number, set_program_number: u16 = (3, 0, 16);
        pcr_pid, set_pcr_pid: u16 = (8, 3, 13);
        program_info_length, set_program_info_length: u16 = (10, 4, 12);
    }
}

layout! {
    /// Elementary stream entry of a PMT.
    pub struct PmtEs[PMT_ES_SIZE] {
        stream_type, set_stream_type: u8 = (0, 0, 8);
        pid, set_pid: u16 = (1, 3, 13);
        es_info_length, set_es_info_length: u16 = (3, 4, 12);
    }
}

impl<B: AsRef<[u8]>> PmtEs<B> {
    pub fn descriptors(&self) -> Option<Descriptors<'_>> {
        PMT_ES_RECORD
            .split(self.as_bytes())
            .map(|record| descriptors(&record[PMT_ES_SIZE..]))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> PmtEs<B> {
    pub fn init(&mut self, stream_type: u8, pid: u16) {
        let bytes = self.as_bytes_mut();
        BitField::new(1, 0, 3).write(bytes, 0b111);
        BitField::new(3, 0, 4).write(bytes, 0xF);
        self.set_stream_type(stream_type);
        self.set_pid(pid);
        self.set_es_info_length(0);
    }
}

/// Name of an ISO/IEC 13818-1 stream_type, with the common private
/// assignments.
pub fn stream_type_name(stream_type: u8) -> &'static str {
    match stream_type {
        0x01 => "MPEG-1 video",
        0x02 => "MPEG-2 video",
        0x03 => "MPEG-1 audio",
        0x04 => "MPEG-2 audio",
        0x05 => "private sections",
        0x06 => "PES private data",
        0x0F => "AAC ADTS",
        0x10 => "MPEG-4 visual",
        0x11 => "AAC LATM",
        0x15 => "metadata in PES",
        0x1B => "H.264",
        0x24 => "H.265",
        0x81 => "AC-3",
        0x86 => "SCTE-35",
        0x87 => "E-AC-3",
        0x80..=0xFF => "user private",
        _ => "reserved",
    }
}

/// Program map section body: program descriptors then the ES loop, which
/// must end at the CRC.
fn es_loop(section: &[u8]) -> Option<(Descriptors<'_>, &[u8])> {
    let payload = TableSection::parse(section).ok()?.payload_bytes()?;
    let program_info = descriptor_list(payload.get(2..)?)?;
    let es_start = 4 + program_info.as_bytes().len();
    Some((program_info, payload.get(es_start..)?))
}

/// Program Map Table (table id 0x02), one program per table-id-extension,
/// elementary streams keyed by PID.
#[derive(Debug, Clone, Copy)]
pub struct Pmt;

impl TableSyntax for Pmt {
    const NAME: &'static str = "PMT";
    const MAX_SECTION_LENGTH: usize = PSI_MAX_SIZE;
    type Key = u16;

    fn accepts(table_id: u8) -> bool {
        table_id == PMT_TABLE_ID
    }

    fn records(section: &[u8]) -> Option<RecordSeq<'_>> {
        let (_, streams) = es_loop(section)?;
        Some(RecordSeq::new(&PMT_ES_RECORD, streams))
    }

    fn key(record: &[u8]) -> Option<u16> {
        PmtEs::new(record).ok().map(|es| es.pid())
    }

    fn validate_section(section: &[u8]) -> bool {
        let Some((program_info, streams)) = es_loop(section) else {
            return false;
        };
        program_info.validate()
            && RecordSeq::new(&PMT_ES_RECORD, streams)
                .iter()
                .all(|record| descriptors(&record[PMT_ES_SIZE..]).validate())
    }
}

pub type PmtTable<'a> = SectionTable<'a, Pmt>;

impl<'a> SectionTable<'a, Pmt> {
    fn header(&self) -> Option<PmtHeader<&'a [u8]>> {
        PmtHeader::new(*self.sections().first()?).ok()
    }

    pub fn program_number(&self) -> Option<u16> {
        self.header().map(|h| h.program_number())
    }

    pub fn pcr_pid(&self) -> Option<u16> {
        self.header().map(|h| h.pcr_pid())
    }

    /// Program-level descriptors of the first section.
    pub fn program_descriptors(&self) -> Option<Descriptors<'a>> {
        es_loop(self.sections().first()?).map(|(descs, _)| descs)
    }

    pub fn streams(&self) -> impl Iterator<Item = PmtEs<&'a [u8]>> + '_ {
        self.records().filter_map(|record| PmtEs::new(record).ok())
    }

    pub fn find_es(&self, pid: u16) -> Option<PmtEs<&'a [u8]>> {
        self.find_record(pid).and_then(|record| PmtEs::new(record).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::section::build_section;
    use crate::psi::table::validate_section;

    fn es(stream_type: u8, pid: u16, descs: &[u8]) -> Vec<u8> {
        let mut record = vec![0u8; PMT_ES_SIZE];
        let mut view = PmtEs::new(&mut record[..]).unwrap();
        view.init(stream_type, pid);
        view.set_es_info_length(descs.len() as u16);
        record.extend_from_slice(descs);
        record
    }

    fn pmt_section(program_info: &[u8], streams: &[Vec<u8>]) -> Vec<u8> {
        let mut payload = vec![0xE1, 0x00, 0xF0, program_info.len() as u8];
        payload.extend_from_slice(program_info);
        for stream in streams {
            payload.extend_from_slice(stream);
        }
        build_section(PMT_TABLE_ID, 1, 0, 0, 0, &payload).unwrap()
    }

    #[test]
    fn test_pmt_fields() {
        let section = pmt_section(
            &[0x05, 0x04, b'C', b'U', b'E', b'I'],
            &[
                es(0x1B, 0x0100, &[]),
                es(0x0F, 0x0101, &[0x0A, 0x04, b'e', b'n', b'g', 0x00]),
            ],
        );
        assert!(validate_section::<Pmt>(&section));
        let table = PmtTable::new([&section[..]]);
        assert!(table.validate());
        assert_eq!(table.program_number(), Some(1));
        assert_eq!(table.pcr_pid(), Some(0x0100));
        assert_eq!(table.program_descriptors().unwrap().count(), 1);
        assert_eq!(table.streams().count(), 2);
        let audio = table.find_es(0x0101).unwrap();
        assert_eq!(audio.stream_type(), 0x0F);
        assert_eq!(stream_type_name(audio.stream_type()), "AAC ADTS");
        assert_eq!(audio.descriptors().unwrap().nth(0).unwrap().tag(), 0x0A);
    }

    #[test]
    fn test_duplicate_es_pid() {
        let section = pmt_section(&[], &[es(0x1B, 0x0100, &[]), es(0x0F, 0x0100, &[])]);
        assert!(validate_section::<Pmt>(&section));
        assert!(!PmtTable::new([&section[..]]).validate());
    }

    #[test]
    fn test_nested_descriptor_overrun() {
        // es_info_length covers 6 bytes but the descriptor claims 5 payload
        let section = pmt_section(&[], &[es(0x0F, 0x0101, &[0x0A, 0x05, b'e', b'n', b'g', 0x00])]);
        assert!(!validate_section::<Pmt>(&section));
    }

    #[test]
    fn test_program_info_overrun() {
        let mut payload = vec![0xE1, 0x00, 0xF0, 0x20];
        payload.extend_from_slice(&[0x05, 0x04, b'C', b'U', b'E', b'I']);
        let section = build_section(PMT_TABLE_ID, 1, 0, 0, 0, &payload).unwrap();
        assert!(!validate_section::<Pmt>(&section));
        assert!(PmtTable::new([&section[..]]).program_descriptors().is_none());
    }
}
