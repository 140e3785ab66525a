//! Packet framing over a raw byte stream, and PSI demultiplexing of the
//! packets it yields.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use memchr::memchr_iter;
use tracing::{debug, trace, warn};

use crate::descriptors::{RegistrationDescriptor, TAG_REGISTRATION};
use crate::packet::{
    ContinuityMode, ContinuityStatus, PID_CAT, PID_EIT, PID_NIT, PID_NULL, PID_PAT, PID_SDT,
    PID_TDT, TS_PACKET_SIZE, TS_SYNC_BYTE, TsPacket, check_continuity,
};
use crate::psi::section::Section;
use crate::psi::{PAT_TABLE_ID, PMT_TABLE_ID, PatTable, PmtTable, PsiTable, SectionAssembler, TableSection};
use crate::scte35::SCTE35_FORMAT_IDENTIFIER;
use crate::{Result, TsError};

const PID_SPACE: usize = 0x2000;

/// Stream type of SCTE-35 splice information.
const STREAM_TYPE_SCTE35: u8 = 0x86;

/// Packet framing of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFormat {
    /// Plain 188-byte packets.
    Ts188,
    /// Blu-ray M2TS: a 4-byte timestamp before each packet.
    M2ts192,
    /// 188-byte packets followed by 16 bytes of Reed-Solomon parity.
    Ts204,
}

impl PacketFormat {
    pub const ALL: [PacketFormat; 3] = [
        PacketFormat::Ts188,
        PacketFormat::M2ts192,
        PacketFormat::Ts204,
    ];

    pub const fn packet_size(self) -> usize {
        match self {
            Self::Ts188 => 188,
            Self::M2ts192 => 192,
            Self::Ts204 => 204,
        }
    }

    pub const fn sync_offset(self) -> usize {
        match self {
            Self::Ts188 => 0,
            Self::M2ts192 => 4,
            Self::Ts204 => 0,
        }
    }
}

/// Whether a packet of `format` starts at `offset`: a sync byte where the
/// format puts it, and another one a packet later if the data reaches that
/// far.
fn packet_starts_at(data: &[u8], offset: usize, format: PacketFormat) -> bool {
    let packet_size = format.packet_size();
    if offset + packet_size > data.len() {
        return false;
    }
    let first_sync = offset + format.sync_offset();
    if data[first_sync] != TS_SYNC_BYTE {
        return false;
    }
    data.get(first_sync + packet_size)
        .is_none_or(|&byte| byte == TS_SYNC_BYTE)
}

/// First offset at which a whole packet of some format starts.
pub fn find_sync(data: &[u8]) -> Option<(usize, PacketFormat)> {
    for sync_pos in memchr_iter(TS_SYNC_BYTE, data) {
        for format in PacketFormat::ALL {
            let Some(offset) = sync_pos.checked_sub(format.sync_offset()) else {
                continue;
            };
            if packet_starts_at(data, offset, format) {
                return Some((offset, format));
            }
        }
    }
    None
}

/// Counters kept by a [`PacketReader`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReaderStats {
    pub packets: usize,
    pub resyncs: usize,
    pub skipped_bytes: usize,
    pub transport_errors: usize,
    pub duplicates: usize,
    pub discontinuities: usize,
}

/// Splits a byte stream into transport packets.
///
/// The packet format is detected on the first sync and kept until a packet
/// boundary no longer lines up, at which point the reader searches for
/// sync again.
#[derive(Debug)]
pub struct PacketReader {
    format: Option<PacketFormat>,
    continuity_mode: ContinuityMode,
    last_cc: Vec<Option<u8>>,
    stats: ReaderStats,
}

impl Default for PacketReader {
    fn default() -> Self {
        Self {
            format: None,
            continuity_mode: ContinuityMode::Disabled,
            last_cc: vec![None; PID_SPACE],
            stats: ReaderStats::default(),
        }
    }
}

impl PacketReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set continuity counter handling mode.
    pub fn with_continuity_mode(mut self, mode: ContinuityMode) -> Self {
        self.continuity_mode = mode;
        self
    }

    /// Format locked on by the last sync, if any.
    pub fn format(&self) -> Option<PacketFormat> {
        self.format
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Forget the locked format and continuity state.
    pub fn reset(&mut self) {
        self.format = None;
        self.last_cc.iter_mut().for_each(|cc| *cc = None);
        self.stats = ReaderStats::default();
    }

    /// Hand every whole packet in `data` to `on_packet`.
    ///
    /// Returns the number of bytes consumed. The rest is a partial packet
    /// (or unsynchronised bytes) to prepend to the next chunk.
    pub fn read<'a, F>(&mut self, data: &'a [u8], mut on_packet: F) -> Result<usize>
    where
        F: FnMut(TsPacket<&'a [u8]>) -> Result<()>,
    {
        let mut offset = 0;
        while offset < data.len() {
            let rest = &data[offset..];
            let format = match self.format {
                Some(format) if rest.len() < format.packet_size() => break,
                // locked: the packet's own sync byte is enough
                Some(format) if rest[format.sync_offset()] == TS_SYNC_BYTE => format,
                _ => {
                    let Some((skip, format)) = find_sync(rest) else {
                        // keep at most one packet's worth for the next call
                        let keep = PacketFormat::Ts204.packet_size().min(rest.len());
                        self.stats.skipped_bytes += rest.len() - keep;
                        offset = data.len() - keep;
                        break;
                    };
                    if skip > 0 || self.format.is_some_and(|locked| locked != format) {
                        debug!(skip, ?format, "resynchronised");
                        self.stats.resyncs += 1;
                    }
                    self.stats.skipped_bytes += skip;
                    self.format = Some(format);
                    offset += skip;
                    format
                }
            };

            let start = offset + format.sync_offset();
            let packet = TsPacket::parse(&data[start..start + TS_PACKET_SIZE])?;
            offset += format.packet_size();
            self.stats.packets += 1;
            if packet.transport_error() {
                self.stats.transport_errors += 1;
                trace!(pid = packet.pid(), "transport error indicator set");
            }
            self.track_continuity(&packet)?;
            on_packet(packet)?;
        }
        Ok(offset)
    }

    fn track_continuity(&mut self, packet: &TsPacket<&[u8]>) -> Result<()> {
        let pid = packet.pid();
        if self.continuity_mode == ContinuityMode::Disabled || pid == PID_NULL {
            return Ok(());
        }
        let cc = packet.continuity_counter();
        let last = &mut self.last_cc[pid as usize];
        let status = check_continuity(*last, packet.has_payload(), cc);
        if status != ContinuityStatus::Duplicate {
            *last = Some(cc);
        }

        match status {
            ContinuityStatus::Initial | ContinuityStatus::Ok => Ok(()),
            ContinuityStatus::Duplicate => {
                self.stats.duplicates += 1;
                if self.continuity_mode == ContinuityMode::Strict {
                    return Err(TsError::DuplicatePacket { pid, cc });
                }
                warn!(pid, cc, "duplicate packet");
                Ok(())
            }
            ContinuityStatus::Discontinuity { expected, actual } => {
                if packet.has_discontinuity() {
                    trace!(pid, "signalled discontinuity");
                    return Ok(());
                }
                self.stats.discontinuities += 1;
                if self.continuity_mode == ContinuityMode::Strict {
                    return Err(TsError::ContinuityError {
                        pid,
                        expected,
                        actual,
                    });
                }
                warn!(pid, expected, actual, "continuity error");
                Ok(())
            }
        }
    }
}

/// What a [`PsiDemux`] reports.
#[derive(Debug)]
pub enum DemuxEvent<'a> {
    /// Every section of a new table version has arrived.
    Table { pid: u16, table: &'a PsiTable },
    /// A short-form section: TDT, TOT, SCTE-35 splice info.
    Section { pid: u16, section: &'a [u8] },
}

#[derive(Debug, Default)]
struct TableSlot {
    table: PsiTable,
    reported: Option<u8>,
}

/// Why a PID is tracked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Origin {
    #[default]
    Configured,
    /// Listed in the current PAT.
    Program,
    /// SCTE-35 stream of some PMT.
    Splice,
}

#[derive(Debug, Default)]
struct PidState {
    assembler: SectionAssembler,
    tables: HashMap<(u8, u16), TableSlot>,
    origin: Origin,
}

/// PIDs a completed table points at.
enum Follow {
    None,
    Programs(Vec<u16>),
    Splice(Vec<u16>),
}

/// Reassembles sections on the PIDs it tracks and collects them into
/// tables, following the PAT to every PMT and each PMT to its SCTE-35
/// streams.
#[derive(Debug)]
pub struct PsiDemux {
    pids: HashMap<u16, PidState>,
}

impl Default for PsiDemux {
    fn default() -> Self {
        Self::with_pids([PID_PAT])
    }
}

impl PsiDemux {
    /// Track the PAT only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the PAT and the DVB SI PIDs.
    pub fn dvb() -> Self {
        Self::with_pids([PID_PAT, PID_CAT, PID_NIT, PID_SDT, PID_EIT, PID_TDT])
    }

    pub fn with_pids(pids: impl IntoIterator<Item = u16>) -> Self {
        let mut demux = Self {
            pids: HashMap::new(),
        };
        for pid in pids {
            demux.add_pid(pid);
        }
        demux
    }

    /// Start tracking `pid`. Returns false if it already was.
    pub fn add_pid(&mut self, pid: u16) -> bool {
        if self.pids.contains_key(&pid) {
            return false;
        }
        self.pids.insert(pid, PidState::default());
        true
    }

    fn discover(&mut self, pid: u16, origin: Origin) {
        if let Entry::Vacant(entry) = self.pids.entry(pid) {
            debug!(pid, ?origin, "tracking PID");
            entry.insert(PidState {
                origin,
                ..Default::default()
            });
        }
    }

    pub fn is_tracked(&self, pid: u16) -> bool {
        self.pids.contains_key(&pid)
    }

    pub fn pids(&self) -> impl Iterator<Item = u16> + '_ {
        self.pids.keys().copied()
    }

    /// Drop every partial section and collected table.
    pub fn reset(&mut self) {
        self.pids.retain(|_, state| state.origin == Origin::Configured);
        for state in self.pids.values_mut() {
            state.assembler.reset();
            state.tables.clear();
        }
    }

    /// Feed one packet. Packets on untracked PIDs, scrambled packets and
    /// packets flagged with a transport error are ignored.
    pub fn push<F>(&mut self, packet: &TsPacket<&[u8]>, mut on_event: F) -> Result<()>
    where
        F: FnMut(DemuxEvent<'_>) -> Result<()>,
    {
        let pid = packet.pid();
        let Some(state) = self.pids.get_mut(&pid) else {
            return Ok(());
        };
        if packet.transport_error() || packet.scrambling() != 0 {
            trace!(pid, "skipping unusable packet");
            return Ok(());
        }
        let Some(payload) = packet.payload() else {
            return Ok(());
        };

        let mut follow = Follow::None;
        for section in state.assembler.push(packet.unit_start(), payload) {
            let Ok(header) = Section::new(&section[..]) else {
                continue;
            };
            if !header.syntax_indicator() {
                on_event(DemuxEvent::Section {
                    pid,
                    section: &section,
                })?;
                continue;
            }
            let Ok(long) = TableSection::new(&section[..]) else {
                continue;
            };
            let key = (long.table_id(), long.table_id_extension());

            let slot = state.tables.entry(key).or_default();
            if !slot.table.insert(section) {
                continue;
            }
            let version = slot.table.version();
            if slot.reported == version {
                continue;
            }
            slot.reported = version;
            debug!(pid, table_id = key.0, extension = key.1, ?version, "table complete");

            match key.0 {
                PAT_TABLE_ID => follow = follow_pat(&slot.table),
                PMT_TABLE_ID => follow = follow_pmt(&slot.table),
                _ => {}
            }
            on_event(DemuxEvent::Table {
                pid,
                table: &slot.table,
            })?;
        }

        match follow {
            Follow::None => {}
            Follow::Programs(pids) => {
                // a new PAT version replaces the programs of the old one
                self.pids
                    .retain(|pid, state| state.origin != Origin::Program || pids.contains(pid));
                pids.into_iter()
                    .for_each(|pid| self.discover(pid, Origin::Program));
            }
            Follow::Splice(pids) => pids
                .into_iter()
                .for_each(|pid| self.discover(pid, Origin::Splice)),
        }
        Ok(())
    }
}

fn follow_pat(table: &PsiTable) -> Follow {
    let pat = PatTable::from_psi(table);
    if !pat.validate() {
        debug!("not following invalid PAT");
        return Follow::None;
    }
    let mut pids: Vec<u16> = pat.programs().map(|program| program.pid()).collect();
    pids.sort_unstable();
    pids.dedup();
    Follow::Programs(pids)
}

fn is_splice_stream(stream_type: u8, descriptors: Option<crate::descriptor::Descriptors<'_>>) -> bool {
    if stream_type == STREAM_TYPE_SCTE35 {
        return true;
    }
    descriptors.is_some_and(|descs| {
        descs.iter().any(|desc| {
            desc.tag() == TAG_REGISTRATION
                && RegistrationDescriptor::new(desc.into_inner()).is_ok_and(|registration| {
                    registration.validate()
                        && registration.format_identifier_bytes() == SCTE35_FORMAT_IDENTIFIER
                })
        })
    })
}

fn follow_pmt(table: &PsiTable) -> Follow {
    let pmt = PmtTable::from_psi(table);
    if !pmt.validate() {
        debug!("not following invalid PMT");
        return Follow::None;
    }
    let pids: Vec<u16> = pmt
        .streams()
        .filter(|es| is_splice_stream(es.stream_type(), es.descriptors()))
        .map(|es| es.pid())
        .collect();
    if pids.is_empty() {
        Follow::None
    } else {
        Follow::Splice(pids)
    }
}
