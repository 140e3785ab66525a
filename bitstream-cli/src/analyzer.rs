use std::io::{ErrorKind, Read};

use tracing::{debug, info};
use ts::reader::ReaderStats;
use ts::{DemuxEvent, PacketReader, PsiDemux, Registry};

use crate::config::Settings;
use crate::error::Result;
use crate::output::{Describer, TableReport};

/// Totals of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub stats: ReaderStats,
    pub tables: usize,
    pub malformed: usize,
}

/// Reads a transport stream, reassembles its tables and reports each one
/// as it completes.
pub struct Analyzer {
    reader: PacketReader,
    demux: PsiDemux,
    registry: Registry,
    descriptors: bool,
    chunk_size: usize,
}

impl Analyzer {
    pub fn new(settings: &Settings, descriptors: bool) -> Self {
        let mut registry = Registry::dvb();
        if settings.atsc {
            a52::register(&mut registry);
        }
        let mut demux = if settings.dvb {
            PsiDemux::dvb()
        } else {
            PsiDemux::new()
        };
        for &pid in &settings.pids {
            demux.add_pid(pid);
        }
        let reader = PacketReader::new().with_continuity_mode(settings.continuity.into());
        info!(
            descriptor_kinds = registry.len(),
            pids = demux.pids().count(),
            "analyzer ready"
        );
        Self {
            reader,
            demux,
            registry,
            descriptors,
            chunk_size: settings.chunk_size,
        }
    }

    /// Read `input` to the end, handing every report to `on_report`.
    pub fn run<R, F>(&mut self, mut input: R, mut on_report: F) -> Result<Summary>
    where
        R: Read,
        F: FnMut(&TableReport) -> Result<()>,
    {
        let mut chunk = vec![0u8; self.chunk_size];
        let mut pending = Vec::with_capacity(self.chunk_size * 2);
        let mut reports = Vec::new();
        let mut summary = Summary::default();

        loop {
            let read = match input.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            pending.extend_from_slice(&chunk[..read]);
            let consumed = self.feed(&pending, &mut reports)?;
            pending.drain(..consumed);

            for report in reports.drain(..) {
                summary.tables += 1;
                if !report.valid {
                    summary.malformed += 1;
                }
                on_report(&report)?;
            }
        }

        if !pending.is_empty() {
            debug!(bytes = pending.len(), "ignoring trailing partial packet");
        }
        summary.stats = self.reader.stats();
        info!(
            packets = summary.stats.packets,
            tables = summary.tables,
            malformed = summary.malformed,
            "finished"
        );
        Ok(summary)
    }

    fn feed(&mut self, data: &[u8], reports: &mut Vec<TableReport>) -> Result<usize> {
        let Self {
            reader,
            demux,
            registry,
            descriptors,
            ..
        } = self;
        let mut describer = Describer::new(registry, *descriptors);
        let consumed = reader.read(data, |packet| {
            demux.push(&packet, |event| {
                reports.push(match event {
                    DemuxEvent::Table { pid, table } => describer.table(pid, table),
                    DemuxEvent::Section { pid, section } => describer.section(pid, section),
                });
                Ok(())
            })
        })?;
        Ok(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Continuity;
    use ts::psi::build_section;
    use ts::{PID_PAT, TS_PACKET_SIZE};

    fn packet(pid: u16, cc: u8, section: &[u8]) -> Vec<u8> {
        let mut packet = vec![0xFF; TS_PACKET_SIZE];
        packet[0] = 0x47;
        packet[1] = 0x40 | (pid >> 8) as u8;
        packet[2] = pid as u8;
        packet[3] = 0x10 | (cc & 0x0F);
        packet[4] = 0x00;
        packet[5..5 + section.len()].copy_from_slice(section);
        packet
    }

    fn stream(es_descriptor: &[u8]) -> Vec<u8> {
        // program 1 -> PMT PID 0x100
        let pat = build_section(0x00, 1, 0, 0, 0, &[0x00, 0x01, 0xE1, 0x00]).unwrap();
        let mut pmt_payload = vec![0xE1, 0x01, 0xF0, 0x00, 0x81, 0xE1, 0x01, 0xF0];
        pmt_payload.push(es_descriptor.len() as u8);
        pmt_payload.extend_from_slice(es_descriptor);
        let pmt = build_section(0x02, 1, 3, 0, 0, &pmt_payload).unwrap();

        let mut data = vec![0x00, 0x12];
        data.extend(packet(PID_PAT, 0, &pat));
        data.extend(packet(0x100, 0, &pmt));
        data.extend(packet(PID_PAT, 1, &pat));
        data
    }

    fn settings(atsc: bool) -> Settings {
        Settings {
            chunk_size: 204,
            continuity: Continuity::Warn,
            pids: Vec::new(),
            dvb: false,
            atsc,
        }
    }

    fn collect(settings: &Settings, data: &[u8]) -> (Summary, Vec<TableReport>) {
        let mut reports = Vec::new();
        let summary = Analyzer::new(settings, true)
            .run(data, |report| {
                reports.push(report.clone());
                Ok(())
            })
            .unwrap();
        (summary, reports)
    }

    #[test]
    fn test_reports_pat_then_pmt() {
        let data = stream(&[0x81, 0x05, 0x08, 0x38, 0x40, 0x01, 0x02]);
        let (summary, reports) = collect(&settings(true), &data);

        assert_eq!(summary.stats.packets, 3);
        assert_eq!(summary.stats.skipped_bytes, 2);
        assert_eq!((summary.tables, summary.malformed), (2, 0));

        assert_eq!(reports[0].name, "PAT");
        assert_eq!(reports[0].pid, PID_PAT);
        assert!(reports[0].lines.contains(&"program 1 -> pmt pid 0x0100".to_string()));

        let pmt = &reports[1];
        assert_eq!((pmt.name, pmt.pid, pmt.version), ("PMT", 0x100, Some(3)));
        assert!(pmt.valid);
        assert!(pmt.lines[0].starts_with("program 1 pcr pid 0x0101"));
        assert!(pmt.lines[1].starts_with("es pid 0x0101 type 0x81"));
        assert!(pmt.lines[2].starts_with("  descriptor 0x81 ATSC AC-3 audio stream"));
        assert!(pmt.to_string().starts_with("pid 0x0100 table 0x02 PMT v3 [ok]\n"));
    }

    #[test]
    fn test_registry_extension_changes_validation() {
        let data = stream(&[0x81, 0x02, 0x08, 0x38]);

        let (summary, reports) = collect(&settings(true), &data);
        assert_eq!(summary.malformed, 1);
        assert!(!reports[1].valid);
        assert!(reports[1].lines[2].ends_with("[malformed]"));

        let (summary, reports) = collect(&settings(false), &data);
        assert_eq!(summary.malformed, 0);
        assert_eq!(reports[1].lines[2], "  descriptor 0x81 (4 bytes)");
    }

    #[test]
    fn test_strict_continuity_fails() {
        let mut data = stream(&[]);
        // second PAT packet repeats counter 0 with a payload
        data[2 + 2 * TS_PACKET_SIZE + 3] = 0x10;
        let mut settings = settings(false);
        assert!(
            Analyzer::new(&settings, false)
                .run(&data[..], |_| Ok(()))
                .is_ok()
        );
        settings.continuity = Continuity::Strict;
        assert!(
            Analyzer::new(&settings, false)
                .run(&data[..], |_| Ok(()))
                .is_err()
        );
    }
}
