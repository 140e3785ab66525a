//! ATSC descriptors announcing A/52 elementary streams in a PMT: the AC-3
//! audio stream descriptor (A/52 Annex A) and the E-AC-3 audio descriptor
//! (A/52 Annex G). Both end in optional fields whose presence depends on
//! earlier flags, so their tails are resolved in one step before reading.

use bitfield::{GatedLayout, layout};
use ts::descriptor::DESCRIPTOR_RECORD;
use ts::descriptors::registry::{DescribedFields, StaticKind, raw_fields};
use ts::Registry;

use crate::ac3::BIT_RATES;

pub const TAG_ATSC_AC3_AUDIO_STREAM: u8 = 0x81;
pub const TAG_ATSC_EAC3_AUDIO: u8 = 0xCC;

layout! {
    /// AC-3 audio stream descriptor (tag 0x81), mandatory part.
    pub struct Ac3AudioStreamDescriptor[5] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        sample_rate_code, set_sample_rate_code: u8 = (2, 0, 3);
        bsid, set_bsid: u8 = (2, 3, 5);
        /// Top bit set: the rate is an upper limit rather than exact.
        bit_rate_code, set_bit_rate_code: u8 = (3, 0, 6);
        surround_mode, set_surround_mode: u8 = (3, 6, 2);
        bsmod, set_bsmod: u8 = (4, 0, 3);
        num_channels, set_num_channels: u8 = (4, 3, 4);
        full_svc, set_full_svc: bool = (4, 7, 1);
    }
}

/// Service information byte following the language codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceInfo {
    /// Main audio service (bsmod below 2).
    Main { priority: u8, mainid: u8 },
    /// Associated service: one bit per main service it goes with.
    Associated { asvcflags: u8 },
}

/// Optional trailing fields of an AC-3 audio stream descriptor. The
/// descriptor may stop after any of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioStreamTail<'a> {
    pub langcod: Option<u8>,
    /// Second language code of a 1+1 (dual mono) stream.
    pub langcod2: Option<u8>,
    pub service: Option<ServiceInfo>,
    /// Text and whether it is ISO 8859-1 (`true`) or UTF-16.
    pub text: Option<(&'a [u8], bool)>,
    pub language: Option<[u8; 3]>,
    pub language_2: Option<[u8; 3]>,
    pub additional_info: &'a [u8],
}

struct Cursor<'a> {
    rest: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Option<u8> {
        let (&first, rest) = self.rest.split_first()?;
        self.rest = rest;
        Some(first)
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.rest.len() {
            return None;
        }
        let (head, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(head)
    }

    fn code(&mut self) -> Option<[u8; 3]> {
        self.take(3)?.try_into().ok()
    }
}

impl<B: AsRef<[u8]>> Ac3AudioStreamDescriptor<B> {
    /// Sample rate in Hz for the exact codes 0 to 2.
    pub fn sample_rate(&self) -> Option<u32> {
        match self.sample_rate_code() {
            0 => Some(48_000),
            1 => Some(44_100),
            2 => Some(32_000),
            _ => None,
        }
    }

    /// Bit rate in kbit/s and whether it is only an upper limit.
    pub fn bit_rate(&self) -> Option<(u16, bool)> {
        let code = self.bit_rate_code();
        let rate = *BIT_RATES.get((code & 0x1F) as usize)?;
        Some((rate, code & 0x20 != 0))
    }

    /// Walk the optional fields. `None` when a text length or a language
    /// flag points past the declared length.
    pub fn tail(&self) -> Option<AudioStreamTail<'_>> {
        let record = DESCRIPTOR_RECORD.split(self.as_bytes())?;
        let mut cursor = Cursor {
            rest: record.get(5..)?,
        };
        let mut tail = AudioStreamTail::default();

        let Some(langcod) = cursor.byte() else {
            return Some(tail);
        };
        tail.langcod = Some(langcod);
        if self.num_channels() == 0 {
            let Some(langcod2) = cursor.byte() else {
                return Some(tail);
            };
            tail.langcod2 = Some(langcod2);
        }

        let Some(service) = cursor.byte() else {
            return Some(tail);
        };
        tail.service = Some(if self.bsmod() < 2 {
            ServiceInfo::Main {
                priority: (service >> 3) & 0x03,
                mainid: service & 0x07,
            }
        } else {
            ServiceInfo::Associated { asvcflags: service }
        });

        let Some(text_header) = cursor.byte() else {
            return Some(tail);
        };
        let text = cursor.take((text_header >> 1) as usize)?;
        tail.text = Some((text, text_header & 0x01 != 0));

        let Some(language_flags) = cursor.byte() else {
            return Some(tail);
        };
        if language_flags & 0x80 != 0 {
            tail.language = Some(cursor.code()?);
        }
        if language_flags & 0x40 != 0 {
            tail.language_2 = Some(cursor.code()?);
        }
        tail.additional_info = cursor.rest;
        Some(tail)
    }

    pub fn validate(&self) -> bool {
        self.tag() == TAG_ATSC_AC3_AUDIO_STREAM && self.length() >= 3 && self.tail().is_some()
    }
}

layout! {
    /// E-AC-3 audio descriptor (tag 0xCC), flags and fixed fields.
    pub struct Eac3AudioDescriptor[5] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        bsid_flag, set_bsid_flag: bool = (2, 1, 1);
        mainid_flag, set_mainid_flag: bool = (2, 2, 1);
        asvc_flag, set_asvc_flag: bool = (2, 3, 1);
        mixinfoexists, set_mixinfoexists: bool = (2, 4, 1);
        substream1_flag, set_substream1_flag: bool = (2, 5, 1);
        substream2_flag, set_substream2_flag: bool = (2, 6, 1);
        substream3_flag, set_substream3_flag: bool = (2, 7, 1);
        full_service_flag, set_full_service_flag: bool = (3, 1, 1);
        audio_service_type, set_audio_service_type: u8 = (3, 2, 3);
        number_of_channels, set_number_of_channels: u8 = (3, 5, 3);
        language_flag, set_language_flag: bool = (4, 0, 1);
        language_flag_2, set_language_flag_2: bool = (4, 1, 1);
        /// Meaningful only when `bsid_flag` is set.
        bsid_bits, set_bsid_bits: u8 = (4, 3, 5);
    }
}

const MAINID: usize = 0;
const ASVC: usize = 1;
const SUBSTREAM: usize = 2;
const LANGUAGE: usize = 5;
const LANGUAGE_2: usize = 6;
const SUBSTREAM_LANGUAGE: usize = 7;

impl<B: AsRef<[u8]>> Eac3AudioDescriptor<B> {
    /// Offsets of mainid, asvc, substream1..3, language, language_2 and
    /// the three substream languages.
    pub fn resolve(&self) -> GatedLayout<10> {
        let substreams = [
            self.substream1_flag(),
            self.substream2_flag(),
            self.substream3_flag(),
        ];
        GatedLayout::resolve(
            5,
            [
                (self.mainid_flag(), 1),
                (self.asvc_flag(), 1),
                (substreams[0], 1),
                (substreams[1], 1),
                (substreams[2], 1),
                (self.language_flag(), 3),
                (self.language_flag_2(), 3),
                (substreams[0], 3),
                (substreams[1], 3),
                (substreams[2], 3),
            ],
        )
    }

    fn gated(&self, index: usize, size: usize) -> Option<&[u8]> {
        let record = DESCRIPTOR_RECORD.split(self.as_bytes())?;
        self.resolve().slice(record, index, size)
    }

    pub fn bsid(&self) -> Option<u8> {
        self.bsid_flag().then(|| self.bsid_bits())
    }

    /// Priority and main service id.
    pub fn mainid(&self) -> Option<(u8, u8)> {
        let byte = self.gated(MAINID, 1)?[0];
        Some(((byte >> 3) & 0x03, byte & 0x07))
    }

    pub fn asvc(&self) -> Option<u8> {
        self.gated(ASVC, 1).map(|bytes| bytes[0])
    }

    /// Substream `n` (1 to 3).
    pub fn substream(&self, n: usize) -> Option<u8> {
        if !(1..=3).contains(&n) {
            return None;
        }
        self.gated(SUBSTREAM + n - 1, 1).map(|bytes| bytes[0])
    }

    pub fn language(&self) -> Option<[u8; 3]> {
        self.gated(LANGUAGE, 3)?.try_into().ok()
    }

    pub fn language_2(&self) -> Option<[u8; 3]> {
        self.gated(LANGUAGE_2, 3)?.try_into().ok()
    }

    /// Language of substream `n` (1 to 3).
    pub fn substream_language(&self, n: usize) -> Option<[u8; 3]> {
        if !(1..=3).contains(&n) {
            return None;
        }
        self.gated(SUBSTREAM_LANGUAGE + n - 1, 3)?.try_into().ok()
    }

    pub fn additional_info(&self) -> Option<&[u8]> {
        let record = DESCRIPTOR_RECORD.split(self.as_bytes())?;
        record.get(self.resolve().end()..)
    }

    /// The declared length covers the fixed fields and every flagged one.
    pub fn validate(&self) -> bool {
        self.tag() == TAG_ATSC_EAC3_AUDIO
            && DESCRIPTOR_RECORD
                .split(self.as_bytes())
                .is_some_and(|record| record.len() >= self.resolve().end())
    }
}

fn sample_rate_name(code: u8) -> &'static str {
    match code {
        0 => "48 kHz",
        1 => "44.1 kHz",
        2 => "32 kHz",
        4 => "48 or 44.1 kHz",
        5 => "48 or 32 kHz",
        6 => "44.1 or 32 kHz",
        7 => "48, 44.1 or 32 kHz",
        _ => "reserved",
    }
}

fn describe_audio_stream(d: &[u8]) -> DescribedFields {
    let Ok(view) = Ac3AudioStreamDescriptor::new(d) else {
        return Vec::new();
    };
    let mut fields = raw_fields(view.field_values());
    fields.push(("sample_rate", sample_rate_name(view.sample_rate_code()).to_string()));
    if let Some((rate, limit)) = view.bit_rate() {
        let qualifier = if limit { "up to " } else { "" };
        fields.push(("bit_rate", format!("{qualifier}{rate} kbit/s")));
    }
    if let Some(tail) = view.tail() {
        match tail.service {
            Some(ServiceInfo::Main { priority, mainid }) => {
                fields.push(("priority", priority.to_string()));
                fields.push(("mainid", mainid.to_string()));
            }
            Some(ServiceInfo::Associated { asvcflags }) => {
                fields.push(("asvcflags", format!("{asvcflags:#04x}")));
            }
            None => {}
        }
        if let Some(language) = tail.language {
            fields.push(("language", String::from_utf8_lossy(&language).into_owned()));
        }
        if let Some(language) = tail.language_2 {
            fields.push(("language_2", String::from_utf8_lossy(&language).into_owned()));
        }
    }
    fields
}

fn describe_eac3_audio(d: &[u8]) -> DescribedFields {
    let Ok(view) = Eac3AudioDescriptor::new(d) else {
        return Vec::new();
    };
    let mut fields = vec![
        ("full_service", view.full_service_flag().to_string()),
        ("audio_service_type", view.audio_service_type().to_string()),
        ("number_of_channels", view.number_of_channels().to_string()),
        ("mixinfoexists", view.mixinfoexists().to_string()),
    ];
    if let Some(bsid) = view.bsid() {
        fields.push(("bsid", bsid.to_string()));
    }
    if let Some((priority, mainid)) = view.mainid() {
        fields.push(("priority", priority.to_string()));
        fields.push(("mainid", mainid.to_string()));
    }
    if let Some(asvc) = view.asvc() {
        fields.push(("asvc", asvc.to_string()));
    }
    for (n, name) in [(1, "substream1"), (2, "substream2"), (3, "substream3")] {
        if let Some(value) = view.substream(n) {
            fields.push((name, format!("{value:#04x}")));
        }
    }
    if let Some(language) = view.language() {
        fields.push(("language", String::from_utf8_lossy(&language).into_owned()));
    }
    fields
}

fn validate_audio_stream(d: &[u8]) -> bool {
    Ac3AudioStreamDescriptor::new(d).is_ok_and(|view| view.validate())
}

fn validate_eac3_audio(d: &[u8]) -> bool {
    Eac3AudioDescriptor::new(d).is_ok_and(|view| view.validate())
}

/// Add the ATSC A/52 descriptor kinds to `registry`.
pub fn register(registry: &mut Registry) -> &mut Registry {
    registry
        .register(StaticKind::new(
            TAG_ATSC_AC3_AUDIO_STREAM,
            "ATSC AC-3 audio stream",
            validate_audio_stream,
            describe_audio_stream,
        ))
        .register(StaticKind::new(
            TAG_ATSC_EAC3_AUDIO,
            "ATSC E-AC-3 audio",
            validate_eac3_audio,
            describe_eac3_audio,
        ))
}
