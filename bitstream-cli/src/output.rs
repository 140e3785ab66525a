//! Text rendering and validation of completed tables.

use std::fmt;

use ts::descriptor::Descriptors;
use ts::dvb::{
    Bat, BatTable, Eit, EitTable, Nit, NitTable, Sdt, SdtTable, TDT_TABLE_ID, TOT_TABLE_ID, Tdt,
    Tot, running_status_name,
};
use ts::psi::{
    Cat, CatTable, Pat, PatTable, Pmt, PmtTable, TableSection, TableSyntax, stream_type_name,
};
use ts::scte35::SCTE35_TABLE_ID;
use ts::{PsiTable, Registry, SectionTable, SpliceInfoSection};

/// One completed table, or one short-form section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub pid: u16,
    pub table_id: u8,
    pub name: &'static str,
    pub version: Option<u8>,
    pub valid: bool,
    pub lines: Vec<String>,
}

impl TableReport {
    pub fn headline(&self) -> String {
        let version = self
            .version
            .map_or_else(String::new, |version| format!(" v{version}"));
        let status = if self.valid { "ok" } else { "MALFORMED" };
        format!(
            "pid {:#06x} table {:#04x} {}{} [{}]",
            self.pid, self.table_id, self.name, version, status
        )
    }
}

impl fmt::Display for TableReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.headline())?;
        for line in &self.lines {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

/// Renders tables, checking them and their descriptors against a registry.
pub struct Describer<'r> {
    registry: &'r Registry,
    descriptors: bool,
    lines: Vec<String>,
    valid: bool,
}

impl<'r> Describer<'r> {
    /// With `descriptors` unset the loops are still validated but not
    /// listed.
    pub fn new(registry: &'r Registry, descriptors: bool) -> Self {
        Self {
            registry,
            descriptors,
            lines: Vec::new(),
            valid: true,
        }
    }

    fn line(&mut self, depth: usize, text: String) {
        self.lines.push(format!("{}{text}", "  ".repeat(depth)));
    }

    fn descriptor_loop(&mut self, depth: usize, descriptors: Option<Descriptors<'_>>) {
        let Some(descriptors) = descriptors else {
            self.valid = false;
            self.line(depth, "descriptor loop overruns its record".to_string());
            return;
        };
        if !descriptors.validate() {
            self.valid = false;
            self.line(depth, "descriptor loop does not fill its length".to_string());
        }
        for descriptor in descriptors.iter() {
            self.descriptor(depth, descriptor.into_inner());
        }
    }

    fn descriptor(&mut self, depth: usize, bytes: &[u8]) {
        let valid = self.registry.validate(bytes);
        self.valid &= valid;
        if !self.descriptors && valid {
            return;
        }
        let tag = bytes.first().copied().unwrap_or_default();
        let mut text = match self.registry.describe(bytes) {
            Some((name, fields)) => fields.into_iter().fold(
                format!("descriptor {tag:#04x} {name}"),
                |text, (key, value)| format!("{text} {key}={value}"),
            ),
            None => format!("descriptor {tag:#04x} ({} bytes)", bytes.len()),
        };
        if !valid {
            text.push_str(" [malformed]");
        }
        self.line(depth, text);
    }

    fn finish(
        &mut self,
        pid: u16,
        table_id: u8,
        name: &'static str,
        version: Option<u8>,
    ) -> TableReport {
        let report = TableReport {
            pid,
            table_id,
            name,
            version,
            valid: self.valid,
            lines: std::mem::take(&mut self.lines),
        };
        self.valid = true;
        report
    }

    fn check<T: TableSyntax>(&mut self, table: &SectionTable<'_, T>) -> &'static str {
        self.valid &= table.validate();
        T::NAME
    }

    /// Validate and render a table that has every section.
    pub fn table(&mut self, pid: u16, table: &PsiTable) -> TableReport {
        let table_id = table.table_id().unwrap_or_default();
        let name = if Pat::accepts(table_id) {
            self.pat(&PatTable::from_psi(table))
        } else if Cat::accepts(table_id) {
            self.cat(&CatTable::from_psi(table))
        } else if Pmt::accepts(table_id) {
            self.pmt(&PmtTable::from_psi(table))
        } else if Nit::accepts(table_id) {
            self.nit(&NitTable::from_psi(table))
        } else if Bat::accepts(table_id) {
            self.bat(&BatTable::from_psi(table))
        } else if Sdt::accepts(table_id) {
            self.sdt(&SdtTable::from_psi(table))
        } else if Eit::accepts(table_id) {
            self.eit(&EitTable::from_psi(table))
        } else {
            self.valid &= table
                .sections()
                .all(|section| TableSection::parse(section).is_ok_and(|s| s.check_crc()));
            "private"
        };
        self.finish(pid, table_id, name, table.version())
    }

    /// Validate and render a short-form section.
    pub fn section(&mut self, pid: u16, section: &[u8]) -> TableReport {
        let table_id = section.first().copied().unwrap_or_default();
        let name = match table_id {
            TDT_TABLE_ID => {
                match Tdt::new(section) {
                    Ok(tdt) => {
                        self.valid &= tdt.validate();
                        self.time_line(tdt.utc_time());
                    }
                    Err(_) => self.valid = false,
                }
                "TDT"
            }
            TOT_TABLE_ID => {
                match Tot::new(section) {
                    Ok(tot) => {
                        self.valid &= tot.validate();
                        self.time_line(tot.utc_time());
                        self.descriptor_loop(0, tot.descriptors());
                    }
                    Err(_) => self.valid = false,
                }
                "TOT"
            }
            SCTE35_TABLE_ID => {
                self.splice(section);
                "SCTE-35"
            }
            _ => "short section",
        };
        self.finish(pid, table_id, name, None)
    }

    fn time_line(&mut self, time: Option<impl fmt::Display>) {
        let text = time.map_or_else(
            || "utc_time undefined".to_string(),
            |time| format!("utc_time {time}"),
        );
        self.line(0, text);
    }

    fn splice(&mut self, section: &[u8]) {
        let splice = match SpliceInfoSection::parse(section) {
            Ok(splice) => splice,
            Err(e) => {
                self.valid = false;
                self.line(0, e.to_string());
                return;
            }
        };
        self.valid &= splice.validate();
        self.line(
            0,
            format!(
                "{:?} pts_adjustment={} tier={:#05x}",
                splice.splice_command_type(),
                splice.pts_adjustment(),
                splice.tier()
            ),
        );
        match splice.splice_command() {
            Ok(command) => self.line(1, format!("{command:?}")),
            Err(e) => self.line(1, format!("undecoded command: {e}")),
        }
        if let Some(descriptors) = splice.descriptors() {
            self.line(1, format!("{} splice descriptor(s)", descriptors.count()));
        }
    }

    fn pat(&mut self, table: &PatTable<'_>) -> &'static str {
        if let Some(tsid) = table.tsid() {
            self.line(0, format!("transport_stream_id {tsid}"));
        }
        for program in table.programs() {
            let text = match program.number() {
                0 => format!("network pid {:#06x}", program.pid()),
                number => format!("program {number} -> pmt pid {:#06x}", program.pid()),
            };
            self.line(0, text);
        }
        self.check(table)
    }

    fn cat(&mut self, table: &CatTable<'_>) -> &'static str {
        for descriptor in table.descriptors() {
            self.descriptor(0, descriptor.into_inner());
        }
        self.check(table)
    }

    fn pmt(&mut self, table: &PmtTable<'_>) -> &'static str {
        if let (Some(program), Some(pcr_pid)) = (table.program_number(), table.pcr_pid()) {
            self.line(0, format!("program {program} pcr pid {pcr_pid:#06x}"));
        }
        self.descriptor_loop(0, table.program_descriptors());
        for es in table.streams() {
            self.line(
                0,
                format!(
                    "es pid {:#06x} type {:#04x} {}",
                    es.pid(),
                    es.stream_type(),
                    stream_type_name(es.stream_type())
                ),
            );
            self.descriptor_loop(1, es.descriptors());
        }
        self.check(table)
    }

    fn nit(&mut self, table: &NitTable<'_>) -> &'static str {
        if let Some(network_id) = table.network_id() {
            self.line(0, format!("network_id {network_id}"));
        }
        for descriptors in table.network_descriptors() {
            self.descriptor_loop(0, Some(descriptors));
        }
        for ts in table.transport_streams() {
            self.line(0, format!("ts {} onid {}", ts.tsid(), ts.onid()));
            self.descriptor_loop(1, ts.descriptors());
        }
        self.check(table)
    }

    fn bat(&mut self, table: &BatTable<'_>) -> &'static str {
        if let Some(bouquet_id) = table.bouquet_id() {
            self.line(0, format!("bouquet_id {bouquet_id}"));
        }
        for descriptors in table.bouquet_descriptors() {
            self.descriptor_loop(0, Some(descriptors));
        }
        for ts in table.transport_streams() {
            self.line(0, format!("ts {} onid {}", ts.tsid(), ts.onid()));
            self.descriptor_loop(1, ts.descriptors());
        }
        self.check(table)
    }

    fn sdt(&mut self, table: &SdtTable<'_>) -> &'static str {
        if let (Some(tsid), Some(onid)) = (table.tsid(), table.onid()) {
            self.line(0, format!("ts {tsid} onid {onid}"));
        }
        for service in table.services() {
            self.line(
                0,
                format!(
                    "service {} {}{}",
                    service.service_id(),
                    running_status_name(service.running_status()),
                    if service.free_ca_mode() { " scrambled" } else { "" }
                ),
            );
            self.descriptor_loop(1, service.descriptors());
        }
        self.check(table)
    }

    fn eit(&mut self, table: &EitTable<'_>) -> &'static str {
        if let Some(service_id) = table.service_id() {
            self.line(0, format!("service {service_id}"));
        }
        for event in table.events() {
            let start = event
                .start_time()
                .map_or_else(|| "undefined".to_string(), |t| t.to_string());
            let duration = event
                .duration()
                .map_or_else(|| "undefined".to_string(), |d| format!("{}s", d.num_seconds()));
            self.line(
                0,
                format!("event {} start {start} duration {duration}", event.event_id()),
            );
            self.descriptor_loop(1, event.descriptors());
        }
        self.check(table)
    }
}
