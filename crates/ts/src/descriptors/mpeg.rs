//! Descriptors defined by ISO/IEC 13818-1.

use bitfield::{BitField, GatedLayout, RecordLayout, RecordSeq, layout};

use super::{
    EXTENSION_HEVC_TIMING_HRD, TAG_CA, TAG_ISO_639_LANGUAGE, TAG_MPEG_EXTENSION, TAG_REGISTRATION,
    payload_of,
};

layout! {
    /// Registration descriptor (tag 0x05).
    pub struct RegistrationDescriptor[6] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        format_identifier, set_format_identifier: u32 = (2, 0, 32);
    }
}

impl<B: AsRef<[u8]>> RegistrationDescriptor<B> {
    /// Four-character code such as `CUEI` or `HEVC`.
    pub fn format_identifier_bytes(&self) -> [u8; 4] {
        self.format_identifier().to_be_bytes()
    }

    pub fn additional_info(&self) -> Option<&[u8]> {
        payload_of(self.as_bytes(), TAG_REGISTRATION).and_then(|payload| payload.get(4..))
    }

    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_REGISTRATION).is_some_and(|p| p.len() >= 4)
    }
}

layout! {
    /// Conditional access descriptor (tag 0x09).
    pub struct CaDescriptor[6] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        ca_system_id, set_ca_system_id: u16 = (2, 0, 16);
        ca_pid, set_ca_pid: u16 = (4, 3, 13);
    }
}

impl<B: AsRef<[u8]>> CaDescriptor<B> {
    pub fn private_data(&self) -> Option<&[u8]> {
        payload_of(self.as_bytes(), TAG_CA).and_then(|payload| payload.get(4..))
    }

    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_CA).is_some_and(|p| p.len() >= 4)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> CaDescriptor<B> {
    /// Header for a descriptor without private data.
    pub fn init(&mut self, ca_system_id: u16, ca_pid: u16) {
        self.set_tag(TAG_CA);
        self.set_length(4);
        BitField::new(4, 0, 3).write(self.as_bytes_mut(), 0b111);
        self.set_ca_system_id(ca_system_id);
        self.set_ca_pid(ca_pid);
    }
}

pub const ISO_639_ENTRY_SIZE: usize = 4;
pub const ISO_639_ENTRY_RECORD: RecordLayout = RecordLayout::fixed(ISO_639_ENTRY_SIZE);

layout! {
    /// One language of an ISO 639 language descriptor.
    pub struct Iso639Entry[ISO_639_ENTRY_SIZE] {
        audio_type, set_audio_type: u8 = (3, 0, 8);
    }
}

impl<B: AsRef<[u8]>> Iso639Entry<B> {
    pub fn language(&self) -> [u8; 3] {
        let bytes = self.as_bytes();
        [bytes[0], bytes[1], bytes[2]]
    }
}

/// Meaning of an ISO 639 `audio_type`.
pub fn audio_type_name(audio_type: u8) -> &'static str {
    match audio_type {
        0x00 => "undefined",
        0x01 => "clean effects",
        0x02 => "hearing impaired",
        0x03 => "visual impaired commentary",
        0x80..=0xFF => "user private",
        _ => "reserved",
    }
}

layout! {
    /// ISO 639 language descriptor (tag 0x0A).
    pub struct Iso639Descriptor[2] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
    }
}

impl<B: AsRef<[u8]>> Iso639Descriptor<B> {
    pub fn entries(&self) -> impl Iterator<Item = Iso639Entry<&[u8]>> {
        let payload = payload_of(self.as_bytes(), TAG_ISO_639_LANGUAGE).unwrap_or_default();
        RecordSeq::new(&ISO_639_ENTRY_RECORD, payload)
            .iter()
            .filter_map(|entry| Iso639Entry::new(entry).ok())
    }

    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_ISO_639_LANGUAGE)
            .is_some_and(|p| p.len() % ISO_639_ENTRY_SIZE == 0)
    }
}

layout! {
    /// HEVC timing and HRD descriptor (tag 0x3F, extension 0x03).
    pub struct HevcTimingHrdDescriptor[4] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        extension_tag, set_extension_tag: u8 = (2, 0, 8);
        hrd_management_valid, set_hrd_management_valid: bool = (3, 0, 1);
        picture_and_timing_info_present, set_picture_and_timing_info_present: bool = (3, 7, 1);
    }
}

const HEVC_N_K: usize = 1;
const HEVC_TICK: usize = 2;

impl<B: AsRef<[u8]>> HevcTimingHrdDescriptor<B> {
    /// The 90 kHz flag, when the picture and timing info is present and
    /// its byte lies inside the declared length.
    pub fn is_90khz(&self) -> Option<bool> {
        if !self.picture_and_timing_info_present() {
            return None;
        }
        let payload = payload_of(self.as_bytes(), TAG_MPEG_EXTENSION)?;
        payload.get(2).map(|b| b & 0x80 != 0)
    }

    /// Offsets of the flags byte, `N`/`K` and `num_units_in_tick`. A
    /// missing 90 kHz byte counts as a set flag.
    pub fn resolve(&self) -> GatedLayout<3> {
        let timing = self.picture_and_timing_info_present();
        let has_n_k = timing && self.is_90khz() == Some(false);
        GatedLayout::resolve(4, [(timing, 1), (has_n_k, 8), (timing, 4)])
    }

    fn read_u32(&self, offset: usize) -> Option<u32> {
        let end = payload_of(self.as_bytes(), TAG_MPEG_EXTENSION)?.len() + 2;
        if offset + 4 > end {
            return None;
        }
        Some(BitField::bytes(offset, 4).read(self.as_bytes()) as u32)
    }

    /// `N` and `K` of the 27 MHz to 90 kHz ratio, absent in 90 kHz mode.
    pub fn n_k(&self) -> Option<(u32, u32)> {
        let offset = self.resolve().offset(HEVC_N_K)?;
        Some((self.read_u32(offset)?, self.read_u32(offset + 4)?))
    }

    pub fn num_units_in_tick(&self) -> Option<u32> {
        let offset = self.resolve().offset(HEVC_TICK)?;
        self.read_u32(offset)
    }

    /// Extension tag 0x03 and every flagged field inside the declared
    /// length.
    pub fn validate(&self) -> bool {
        let Some(payload) = payload_of(self.as_bytes(), TAG_MPEG_EXTENSION) else {
            return false;
        };
        payload.len() >= 2
            && self.extension_tag() == EXTENSION_HEVC_TIMING_HRD
            && self.resolve().end() <= payload.len() + 2
    }
}
