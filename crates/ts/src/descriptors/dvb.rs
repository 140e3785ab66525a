//! Descriptors defined by EN 300 468.

use bitfield::{BcdField, RecordLayout, layout};
use chrono::{NaiveDateTime, TimeDelta};

use super::{
    TAG_CABLE_DELIVERY, TAG_COMPONENT, TAG_LOCAL_TIME_OFFSET, TAG_NETWORK_NAME,
    TAG_PARENTAL_RATING, TAG_SATELLITE_DELIVERY, TAG_SERVICE, TAG_SERVICE_LIST, TAG_SHORT_EVENT,
    TAG_STREAM_IDENTIFIER, TAG_SUBTITLING, TAG_TELETEXT, TAG_TERRESTRIAL_DELIVERY, entries,
    entries_valid, payload_of, string_at, write_string,
};
use crate::descriptor::{DESCRIPTOR_HEADER_SIZE, DESCRIPTOR_MAX_SIZE};
use crate::dvb::time::{UTC_TIME_SIZE, decode_bcd_hms, decode_utc_time};
use crate::{Result, TsError};

fn language_at(bytes: &[u8], offset: usize) -> [u8; 3] {
    [bytes[offset], bytes[offset + 1], bytes[offset + 2]]
}

/// Write a declared length computed from the sub-fields, refusing lengths a
/// single byte cannot carry.
fn store_length(bytes: &mut [u8], length: usize) -> Result<()> {
    if length > DESCRIPTOR_MAX_SIZE {
        return Err(TsError::OutOfRange(format!("descriptor length {length}")));
    }
    bytes[1] = length as u8;
    Ok(())
}

layout! {
    /// Network name descriptor (tag 0x40).
    pub struct NetworkNameDescriptor[DESCRIPTOR_HEADER_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
    }
}

impl<B: AsRef<[u8]>> NetworkNameDescriptor<B> {
    /// Name bytes in the DVB character coding of the first byte.
    pub fn name(&self) -> Option<&[u8]> {
        payload_of(self.as_bytes(), TAG_NETWORK_NAME)
    }

    pub fn validate(&self) -> bool {
        self.name().is_some()
    }
}

pub const SERVICE_LIST_ENTRY_SIZE: usize = 3;
pub const SERVICE_LIST_ENTRY_RECORD: RecordLayout = RecordLayout::fixed(SERVICE_LIST_ENTRY_SIZE);

layout! {
    /// One service of a service list descriptor.
    pub struct ServiceListEntry[SERVICE_LIST_ENTRY_SIZE] {
        service_id, set_service_id: u16 = (0, 0, 16);
        service_type, set_service_type: u8 = (2, 0, 8);
    }
}

layout! {
    /// Service list descriptor (tag 0x41).
    pub struct ServiceListDescriptor[DESCRIPTOR_HEADER_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
    }
}

impl<B: AsRef<[u8]>> ServiceListDescriptor<B> {
    pub fn services(&self) -> impl Iterator<Item = ServiceListEntry<&[u8]>> {
        entries(self.as_bytes(), TAG_SERVICE_LIST, &SERVICE_LIST_ENTRY_RECORD)
            .filter_map(|entry| ServiceListEntry::new(entry).ok())
    }

    pub fn validate(&self) -> bool {
        entries_valid(self.as_bytes(), TAG_SERVICE_LIST, SERVICE_LIST_ENTRY_SIZE)
    }
}

/// Size of the satellite, cable and terrestrial delivery descriptors.
pub const DELIVERY_DESCRIPTOR_SIZE: usize = DESCRIPTOR_HEADER_SIZE + 11;

const SATELLITE_FREQUENCY: BcdField = BcdField::new(2, 0, 8);
const SATELLITE_ORBITAL_POSITION: BcdField = BcdField::new(6, 0, 4);
const DELIVERY_SYMBOL_RATE: BcdField = BcdField::new(9, 0, 7);
const CABLE_FREQUENCY: BcdField = BcdField::new(2, 0, 8);

layout! {
    /// Satellite delivery system descriptor (tag 0x43).
    pub struct SatelliteDeliveryDescriptor[DELIVERY_DESCRIPTOR_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        /// Raw BCD, eight digits in units of 10 kHz.
        frequency_bcd, set_frequency_bcd: u32 = (2, 0, 32);
        /// Raw BCD, four digits in units of 0.1 degree.
        orbital_position_bcd, set_orbital_position_bcd: u16 = (6, 0, 16);
        east, set_east: bool = (8, 0, 1);
        polarization, set_polarization: u8 = (8, 1, 2);
        roll_off, set_roll_off: u8 = (8, 3, 2);
        dvb_s2, set_dvb_s2: bool = (8, 5, 1);
        modulation_type, set_modulation_type: u8 = (8, 6, 2);
        /// Raw BCD, seven digits in units of 100 symbols/s.
        symbol_rate_bcd, set_symbol_rate_bcd: u32 = (9, 0, 28);
        fec_inner, set_fec_inner: u8 = (12, 4, 4);
    }
}

impl<B: AsRef<[u8]>> SatelliteDeliveryDescriptor<B> {
    /// Frequency in kHz.
    pub fn frequency_khz(&self) -> Option<u64> {
        SATELLITE_FREQUENCY.get(self.as_bytes()).ok().map(|f| f * 10)
    }

    /// Orbital position in tenths of a degree.
    pub fn orbital_position(&self) -> Option<u64> {
        SATELLITE_ORBITAL_POSITION.get(self.as_bytes()).ok()
    }

    /// Symbol rate in symbols/s.
    pub fn symbol_rate(&self) -> Option<u64> {
        DELIVERY_SYMBOL_RATE.get(self.as_bytes()).ok().map(|s| s * 100)
    }

    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_SATELLITE_DELIVERY)
            .is_some_and(|p| p.len() == DELIVERY_DESCRIPTOR_SIZE - DESCRIPTOR_HEADER_SIZE)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SatelliteDeliveryDescriptor<B> {
    pub fn set_frequency_khz(&mut self, khz: u64) -> Result<()> {
        Ok(SATELLITE_FREQUENCY.set(self.as_bytes_mut(), khz / 10)?)
    }

    pub fn set_orbital_position(&mut self, tenths: u64) -> Result<()> {
        Ok(SATELLITE_ORBITAL_POSITION.set(self.as_bytes_mut(), tenths)?)
    }

    pub fn set_symbol_rate(&mut self, rate: u64) -> Result<()> {
        Ok(DELIVERY_SYMBOL_RATE.set(self.as_bytes_mut(), rate / 100)?)
    }
}

pub fn polarization_name(polarization: u8) -> &'static str {
    match polarization {
        0 => "linear horizontal",
        1 => "linear vertical",
        2 => "circular left",
        _ => "circular right",
    }
}

layout! {
    /// Cable delivery system descriptor (tag 0x44).
    pub struct CableDeliveryDescriptor[DELIVERY_DESCRIPTOR_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        /// Raw BCD, eight digits in units of 100 Hz.
        frequency_bcd, set_frequency_bcd: u32 = (2, 0, 32);
        fec_outer, set_fec_outer: u8 = (7, 4, 4);
        modulation, set_modulation: u8 = (8, 0, 8);
        symbol_rate_bcd, set_symbol_rate_bcd: u32 = (9, 0, 28);
        fec_inner, set_fec_inner: u8 = (12, 4, 4);
    }
}

impl<B: AsRef<[u8]>> CableDeliveryDescriptor<B> {
    /// Frequency in Hz.
    pub fn frequency_hz(&self) -> Option<u64> {
        CABLE_FREQUENCY.get(self.as_bytes()).ok().map(|f| f * 100)
    }

    pub fn symbol_rate(&self) -> Option<u64> {
        DELIVERY_SYMBOL_RATE.get(self.as_bytes()).ok().map(|s| s * 100)
    }

    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_CABLE_DELIVERY)
            .is_some_and(|p| p.len() == DELIVERY_DESCRIPTOR_SIZE - DESCRIPTOR_HEADER_SIZE)
    }
}

pub fn cable_modulation_name(modulation: u8) -> &'static str {
    match modulation {
        0x00 => "not defined",
        0x01 => "16-QAM",
        0x02 => "32-QAM",
        0x03 => "64-QAM",
        0x04 => "128-QAM",
        0x05 => "256-QAM",
        _ => "reserved",
    }
}

layout! {
    /// Terrestrial delivery system descriptor (tag 0x5A).
    pub struct TerrestrialDeliveryDescriptor[DELIVERY_DESCRIPTOR_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        /// Units of 10 Hz.
        centre_frequency, set_centre_frequency: u32 = (2, 0, 32);
        bandwidth, set_bandwidth: u8 = (6, 0, 3);
        priority, set_priority: bool = (6, 3, 1);
        time_slicing_indicator, set_time_slicing_indicator: bool = (6, 4, 1);
        mpe_fec_indicator, set_mpe_fec_indicator: bool = (6, 5, 1);
        constellation, set_constellation: u8 = (7, 0, 2);
        hierarchy_information, set_hierarchy_information: u8 = (7, 2, 3);
        code_rate_hp, set_code_rate_hp: u8 = (7, 5, 3);
        code_rate_lp, set_code_rate_lp: u8 = (8, 0, 3);
        guard_interval, set_guard_interval: u8 = (8, 3, 2);
        transmission_mode, set_transmission_mode: u8 = (8, 5, 2);
        other_frequency, set_other_frequency: bool = (8, 7, 1);
    }
}

impl<B: AsRef<[u8]>> TerrestrialDeliveryDescriptor<B> {
    pub fn frequency_hz(&self) -> u64 {
        self.centre_frequency() as u64 * 10
    }

    /// Channel bandwidth in MHz.
    pub fn bandwidth_mhz(&self) -> Option<u8> {
        match self.bandwidth() {
            0 => Some(8),
            1 => Some(7),
            2 => Some(6),
            3 => Some(5),
            _ => None,
        }
    }

    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_TERRESTRIAL_DELIVERY)
            .is_some_and(|p| p.len() == DELIVERY_DESCRIPTOR_SIZE - DESCRIPTOR_HEADER_SIZE)
    }
}

layout! {
    /// Service descriptor (tag 0x48): service type, then provider and
    /// service names each behind a length byte.
    pub struct ServiceDescriptor[4] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        service_type, set_service_type: u8 = (2, 0, 8);
        provider_name_length, set_provider_name_length: u8 = (3, 0, 8);
    }
}

impl<B: AsRef<[u8]>> ServiceDescriptor<B> {
    fn end(&self) -> usize {
        DESCRIPTOR_HEADER_SIZE + self.length() as usize
    }

    pub fn provider_name(&self) -> Option<&[u8]> {
        string_at(self.as_bytes(), 3, self.end())
    }

    pub fn service_name(&self) -> Option<&[u8]> {
        let offset = 4 + self.provider_name_length() as usize;
        string_at(self.as_bytes(), offset, self.end())
    }

    /// Both names fit inside the declared length.
    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_SERVICE).is_some()
            && self.provider_name().is_some()
            && self.service_name().is_some()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> ServiceDescriptor<B> {
    /// Write the header with two empty names.
    pub fn init(&mut self, service_type: u8) -> Result<()> {
        let bytes = self.as_bytes_mut();
        let available = bytes.len();
        let Some(rest) = bytes.get_mut(..5) else {
            return Err(TsError::InsufficientData {
                expected: 5,
                actual: available,
            });
        };
        rest.copy_from_slice(&[TAG_SERVICE, 3, service_type, 0, 0]);
        Ok(())
    }

    /// Write the provider name. The service name must be written after.
    pub fn set_provider_name(&mut self, name: &[u8]) -> Result<()> {
        write_string(self.as_bytes_mut(), 3, name).map(|_| ())
    }

    /// Write the service name after the current provider name.
    pub fn set_service_name(&mut self, name: &[u8]) -> Result<()> {
        let offset = 4 + self.provider_name_length() as usize;
        write_string(self.as_bytes_mut(), offset, name).map(|_| ())
    }

    /// Recompute the declared length from the two names.
    pub fn set_length_from_fields(&mut self) -> Result<()> {
        let service_offset = 4 + self.provider_name_length() as usize;
        let service_len = *self.as_bytes().get(service_offset).ok_or(
            TsError::InsufficientData {
                expected: service_offset + 1,
                actual: self.as_bytes().len(),
            },
        )? as usize;
        let end = service_offset + 1 + service_len;
        store_length(self.as_bytes_mut(), end - DESCRIPTOR_HEADER_SIZE)
    }
}

pub fn service_type_name(service_type: u8) -> &'static str {
    match service_type {
        0x01 => "digital television",
        0x02 => "digital radio sound",
        0x03 => "teletext",
        0x0A => "advanced codec digital radio sound",
        0x11 => "MPEG-2 HD digital television",
        0x16 => "advanced codec SD digital television",
        0x19 => "advanced codec HD digital television",
        0x1F => "HEVC digital television",
        _ => "other",
    }
}

layout! {
    /// Short event descriptor (tag 0x4D): language, event name and text.
    pub struct ShortEventDescriptor[6] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        event_name_length, set_event_name_length: u8 = (5, 0, 8);
    }
}

impl<B: AsRef<[u8]>> ShortEventDescriptor<B> {
    fn end(&self) -> usize {
        DESCRIPTOR_HEADER_SIZE + self.length() as usize
    }

    pub fn language(&self) -> [u8; 3] {
        language_at(self.as_bytes(), 2)
    }

    pub fn event_name(&self) -> Option<&[u8]> {
        string_at(self.as_bytes(), 5, self.end())
    }

    pub fn text(&self) -> Option<&[u8]> {
        let offset = 6 + self.event_name_length() as usize;
        string_at(self.as_bytes(), offset, self.end())
    }

    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_SHORT_EVENT).is_some_and(|p| p.len() >= 5)
            && self.event_name().is_some()
            && self.text().is_some()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> ShortEventDescriptor<B> {
    /// Write the header with a language and two empty strings.
    pub fn init(&mut self, language: [u8; 3]) -> Result<()> {
        let bytes = self.as_bytes_mut();
        let available = bytes.len();
        let Some(head) = bytes.get_mut(..7) else {
            return Err(TsError::InsufficientData {
                expected: 7,
                actual: available,
            });
        };
        head[0] = TAG_SHORT_EVENT;
        head[1] = 5;
        head[2..5].copy_from_slice(&language);
        head[5] = 0;
        head[6] = 0;
        Ok(())
    }

    pub fn set_language(&mut self, language: [u8; 3]) {
        self.as_bytes_mut()[2..5].copy_from_slice(&language);
    }

    /// Write the event name. The text must be written after.
    pub fn set_event_name(&mut self, name: &[u8]) -> Result<()> {
        write_string(self.as_bytes_mut(), 5, name).map(|_| ())
    }

    pub fn set_text(&mut self, text: &[u8]) -> Result<()> {
        let offset = 6 + self.event_name_length() as usize;
        write_string(self.as_bytes_mut(), offset, text).map(|_| ())
    }

    /// Recompute the declared length from the name and text.
    pub fn set_length_from_fields(&mut self) -> Result<()> {
        let text_offset = 6 + self.event_name_length() as usize;
        let text_len = *self.as_bytes().get(text_offset).ok_or(
            TsError::InsufficientData {
                expected: text_offset + 1,
                actual: self.as_bytes().len(),
            },
        )? as usize;
        let end = text_offset + 1 + text_len;
        store_length(self.as_bytes_mut(), end - DESCRIPTOR_HEADER_SIZE)
    }
}

layout! {
    /// Component descriptor (tag 0x50).
    pub struct ComponentDescriptor[8] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        stream_content_ext, set_stream_content_ext: u8 = (2, 0, 4);
        stream_content, set_stream_content: u8 = (2, 4, 4);
        component_type, set_component_type: u8 = (3, 0, 8);
        component_tag, set_component_tag: u8 = (4, 0, 8);
    }
}

impl<B: AsRef<[u8]>> ComponentDescriptor<B> {
    pub fn language(&self) -> [u8; 3] {
        language_at(self.as_bytes(), 5)
    }

    pub fn text(&self) -> Option<&[u8]> {
        payload_of(self.as_bytes(), TAG_COMPONENT).and_then(|p| p.get(6..))
    }

    pub fn validate(&self) -> bool {
        self.text().is_some()
    }
}

layout! {
    /// Stream identifier descriptor (tag 0x52).
    pub struct StreamIdentifierDescriptor[3] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        component_tag, set_component_tag: u8 = (2, 0, 8);
    }
}

impl<B: AsRef<[u8]>> StreamIdentifierDescriptor<B> {
    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_STREAM_IDENTIFIER).is_some_and(|p| p.len() == 1)
    }
}

pub const PARENTAL_RATING_ENTRY_SIZE: usize = 4;
pub const PARENTAL_RATING_ENTRY_RECORD: RecordLayout =
    RecordLayout::fixed(PARENTAL_RATING_ENTRY_SIZE);

layout! {
    /// One country of a parental rating descriptor.
    pub struct ParentalRatingEntry[PARENTAL_RATING_ENTRY_SIZE] {
        rating, set_rating: u8 = (3, 0, 8);
    }
}

impl<B: AsRef<[u8]>> ParentalRatingEntry<B> {
    pub fn country(&self) -> [u8; 3] {
        language_at(self.as_bytes(), 0)
    }

    /// Minimum age, for ratings 0x01 to 0x0F.
    pub fn minimum_age(&self) -> Option<u8> {
        match self.rating() {
            rating @ 0x01..=0x0F => Some(rating + 3),
            _ => None,
        }
    }
}

layout! {
    /// Parental rating descriptor (tag 0x55).
    pub struct ParentalRatingDescriptor[DESCRIPTOR_HEADER_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
    }
}

impl<B: AsRef<[u8]>> ParentalRatingDescriptor<B> {
    pub fn ratings(&self) -> impl Iterator<Item = ParentalRatingEntry<&[u8]>> {
        entries(self.as_bytes(), TAG_PARENTAL_RATING, &PARENTAL_RATING_ENTRY_RECORD)
            .filter_map(|entry| ParentalRatingEntry::new(entry).ok())
    }

    pub fn validate(&self) -> bool {
        entries_valid(self.as_bytes(), TAG_PARENTAL_RATING, PARENTAL_RATING_ENTRY_SIZE)
    }
}

pub const TELETEXT_ENTRY_SIZE: usize = 5;
pub const TELETEXT_ENTRY_RECORD: RecordLayout = RecordLayout::fixed(TELETEXT_ENTRY_SIZE);

layout! {
    /// One page of a teletext descriptor.
    pub struct TeletextEntry[TELETEXT_ENTRY_SIZE] {
        teletext_type, set_teletext_type: u8 = (3, 0, 5);
        magazine_number, set_magazine_number: u8 = (3, 5, 3);
        page_number, set_page_number: u8 = (4, 0, 8);
    }
}

impl<B: AsRef<[u8]>> TeletextEntry<B> {
    pub fn language(&self) -> [u8; 3] {
        language_at(self.as_bytes(), 0)
    }
}

pub fn teletext_type_name(teletext_type: u8) -> &'static str {
    match teletext_type {
        0x01 => "initial page",
        0x02 => "subtitle page",
        0x03 => "additional information page",
        0x04 => "programme schedule page",
        0x05 => "hearing impaired subtitle page",
        _ => "reserved",
    }
}

layout! {
    /// Teletext descriptor (tag 0x56).
    pub struct TeletextDescriptor[DESCRIPTOR_HEADER_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
    }
}

impl<B: AsRef<[u8]>> TeletextDescriptor<B> {
    pub fn pages(&self) -> impl Iterator<Item = TeletextEntry<&[u8]>> {
        entries(self.as_bytes(), TAG_TELETEXT, &TELETEXT_ENTRY_RECORD)
            .filter_map(|entry| TeletextEntry::new(entry).ok())
    }

    pub fn validate(&self) -> bool {
        entries_valid(self.as_bytes(), TAG_TELETEXT, TELETEXT_ENTRY_SIZE)
    }
}

pub const LOCAL_TIME_OFFSET_ENTRY_SIZE: usize = 13;
pub const LOCAL_TIME_OFFSET_ENTRY_RECORD: RecordLayout =
    RecordLayout::fixed(LOCAL_TIME_OFFSET_ENTRY_SIZE);

layout! {
    /// One region of a local time offset descriptor.
    pub struct LocalTimeOffsetEntry[LOCAL_TIME_OFFSET_ENTRY_SIZE] {
        country_region_id, set_country_region_id: u8 = (3, 0, 6);
        /// Set for offsets west of Greenwich.
        negative, set_negative: bool = (3, 7, 1);
        /// BCD hh:mm.
        offset_bcd, set_offset_bcd: u16 = (4, 0, 16);
        next_offset_bcd, set_next_offset_bcd: u16 = (11, 0, 16);
    }
}

impl<B: AsRef<[u8]>> LocalTimeOffsetEntry<B> {
    pub fn country(&self) -> [u8; 3] {
        language_at(self.as_bytes(), 0)
    }

    fn signed(&self, bcd: u16) -> Option<TimeDelta> {
        let [h, m] = bcd.to_be_bytes();
        let (hours, minutes, _) = decode_bcd_hms([h, m, 0])?;
        let minutes = hours as i64 * 60 + minutes as i64;
        let offset = TimeDelta::try_minutes(minutes)?;
        Some(if self.negative() { -offset } else { offset })
    }

    pub fn local_time_offset(&self) -> Option<TimeDelta> {
        self.signed(self.offset_bcd())
    }

    /// UTC time at which the next offset applies.
    pub fn time_of_change(&self) -> Option<NaiveDateTime> {
        decode_utc_time(&self.as_bytes()[6..6 + UTC_TIME_SIZE])
    }

    pub fn next_time_offset(&self) -> Option<TimeDelta> {
        self.signed(self.next_offset_bcd())
    }
}

layout! {
    /// Local time offset descriptor (tag 0x58).
    pub struct LocalTimeOffsetDescriptor[DESCRIPTOR_HEADER_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
    }
}

impl<B: AsRef<[u8]>> LocalTimeOffsetDescriptor<B> {
    pub fn regions(&self) -> impl Iterator<Item = LocalTimeOffsetEntry<&[u8]>> {
        entries(self.as_bytes(), TAG_LOCAL_TIME_OFFSET, &LOCAL_TIME_OFFSET_ENTRY_RECORD)
            .filter_map(|entry| LocalTimeOffsetEntry::new(entry).ok())
    }

    pub fn validate(&self) -> bool {
        entries_valid(self.as_bytes(), TAG_LOCAL_TIME_OFFSET, LOCAL_TIME_OFFSET_ENTRY_SIZE)
    }
}

pub const SUBTITLING_ENTRY_SIZE: usize = 8;
pub const SUBTITLING_ENTRY_RECORD: RecordLayout = RecordLayout::fixed(SUBTITLING_ENTRY_SIZE);

layout! {
    /// One subtitle stream of a subtitling descriptor.
    pub struct SubtitlingEntry[SUBTITLING_ENTRY_SIZE] {
        subtitling_type, set_subtitling_type: u8 = (3, 0, 8);
        composition_page_id, set_composition_page_id: u16 = (4, 0, 16);
        ancillary_page_id, set_ancillary_page_id: u16 = (6, 0, 16);
    }
}

impl<B: AsRef<[u8]>> SubtitlingEntry<B> {
    pub fn language(&self) -> [u8; 3] {
        language_at(self.as_bytes(), 0)
    }
}

layout! {
    /// Subtitling descriptor (tag 0x59).
    pub struct SubtitlingDescriptor[DESCRIPTOR_HEADER_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
    }
}

impl<B: AsRef<[u8]>> SubtitlingDescriptor<B> {
    pub fn subtitles(&self) -> impl Iterator<Item = SubtitlingEntry<&[u8]>> {
        entries(self.as_bytes(), TAG_SUBTITLING, &SUBTITLING_ENTRY_RECORD)
            .filter_map(|entry| SubtitlingEntry::new(entry).ok())
    }

    pub fn validate(&self) -> bool {
        entries_valid(self.as_bytes(), TAG_SUBTITLING, SUBTITLING_ENTRY_SIZE)
    }
}
