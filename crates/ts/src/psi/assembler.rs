use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use super::section::{PSI_HEADER_SIZE, PSI_PRIVATE_MAX_SIZE, Section};

/// Rebuilds sections from the payloads of consecutive TS packets on one
/// PID.
///
/// A section may start anywhere after the pointer field of a packet with
/// `payload_unit_start_indicator` set and may span several packets. A
/// `0xFF` table id marks stuffing up to the end of the packet.
#[derive(Debug, Default)]
pub struct SectionAssembler {
    buffer: BytesMut,
    synced: bool,
}

impl SectionAssembler {
    /// Upper bound on buffered bytes before the assembler gives up on the
    /// current section.
    const MAX_BUFFER_SIZE: usize = 64 * 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// Forget any partial section and wait for the next unit start.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.synced = false;
    }

    /// Bytes of the section currently being rebuilt.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one packet payload and return the sections it completes.
    pub fn push(&mut self, unit_start: bool, payload: &[u8]) -> Vec<Bytes> {
        let mut sections = Vec::new();
        if payload.is_empty() {
            return sections;
        }

        if !unit_start {
            if self.synced {
                self.append(payload, &mut sections);
            } else {
                trace!(len = payload.len(), "skipping payload before first unit start");
            }
            return sections;
        }

        let pointer_end = 1 + payload[0] as usize;
        if pointer_end > payload.len() {
            debug!(pointer = payload[0], "pointer field past end of payload");
            self.reset();
            return sections;
        }

        // tail of the previous section
        if pointer_end > 1 && self.synced {
            self.append(&payload[1..pointer_end], &mut sections);
        }
        if !self.buffer.is_empty() {
            debug!(
                dropped = self.buffer.len(),
                "discarding unfinished section at unit start"
            );
            self.buffer.clear();
        }

        self.synced = true;
        self.append(&payload[pointer_end..], &mut sections);
        sections
    }

    fn append(&mut self, data: &[u8], sections: &mut Vec<Bytes>) {
        if !self.synced {
            return;
        }
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > Self::MAX_BUFFER_SIZE {
            debug!(len = self.buffer.len(), "section buffer overflow");
            self.reset();
            return;
        }

        loop {
            match self.buffer.first() {
                None => break,
                Some(0xFF) => {
                    // stuffing runs to the end of the packet
                    self.buffer.clear();
                    self.synced = false;
                    break;
                }
                Some(_) => {}
            }
            if self.buffer.len() < PSI_HEADER_SIZE {
                break;
            }
            let (section_length, length) = match Section::new(&self.buffer[..]) {
                Ok(header) => (header.section_length() as usize, header.length()),
                Err(_) => break,
            };
            if section_length > PSI_PRIVATE_MAX_SIZE {
                debug!(section_length, "invalid section length, resyncing");
                self.reset();
                break;
            }
            if self.buffer.len() < length {
                break;
            }
            sections.push(self.buffer.split_to(length).freeze());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::section::build_section;

    fn payloads(section: &[u8], chunk: usize) -> Vec<(bool, Vec<u8>)> {
        let mut out = Vec::new();
        for (i, part) in section.chunks(chunk).enumerate() {
            let mut payload = Vec::new();
            if i == 0 {
                payload.push(0);
            }
            payload.extend_from_slice(part);
            out.push((i == 0, payload));
        }
        out
    }

    #[test]
    fn test_single_packet_section() {
        let section = build_section(0x00, 1, 0, 0, 0, &[0x00, 0x01, 0xE1, 0x00]).unwrap();
        let mut payload = vec![0x00];
        payload.extend_from_slice(&section);
        payload.resize(184, 0xFF);

        let mut assembler = SectionAssembler::new();
        let sections = assembler.push(true, &payload);
        assert_eq!(sections.len(), 1);
        assert_eq!(&sections[0][..], &section[..]);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_section_across_packets() {
        let section = build_section(0x42, 1, 0, 0, 0, &[0x5A; 400]).unwrap();
        let mut assembler = SectionAssembler::new();
        let mut done = Vec::new();
        for (unit_start, payload) in payloads(&section, 183) {
            done.extend(assembler.push(unit_start, &payload));
        }
        assert_eq!(done.len(), 1);
        assert_eq!(&done[0][..], &section[..]);
    }

    #[test]
    fn test_pointer_field_completes_previous() {
        let first = build_section(0x42, 1, 0, 0, 1, &[0x11; 200]).unwrap();
        let second = build_section(0x42, 1, 0, 1, 1, &[0x22; 10]).unwrap();

        let mut assembler = SectionAssembler::new();
        let mut p1 = vec![0x00];
        p1.extend_from_slice(&first[..150]);
        assert!(assembler.push(true, &p1).is_empty());

        let tail = &first[150..];
        let mut p2 = vec![tail.len() as u8];
        p2.extend_from_slice(tail);
        p2.extend_from_slice(&second);
        p2.resize(184, 0xFF);
        let sections = assembler.push(true, &p2);
        assert_eq!(sections.len(), 2);
        assert_eq!(&sections[0][..], &first[..]);
        assert_eq!(&sections[1][..], &second[..]);
    }

    #[test]
    fn test_waits_for_unit_start() {
        let section = build_section(0x42, 1, 0, 0, 0, &[1, 2, 3]).unwrap();
        let mut assembler = SectionAssembler::new();
        assert!(assembler.push(false, &section).is_empty());
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_bad_pointer_resets() {
        let mut assembler = SectionAssembler::new();
        assert!(assembler.push(true, &[0x10, 0x00]).is_empty());
        assert!(assembler.push(false, &[0x00, 0xB0, 0x0D]).is_empty());
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_stuffing_stops_section_parsing() {
        let mut assembler = SectionAssembler::new();
        assert!(assembler.push(true, &[0x00, 0xFF, 0xFF]).is_empty());
        // continuation without a new unit start is ignored
        assert!(assembler.push(false, &[0x00, 0xB0, 0x0D]).is_empty());
        assert_eq!(assembler.pending(), 0);
    }
}
