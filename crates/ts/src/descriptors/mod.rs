//! Typed views over individual descriptors, and a registry mapping tags to
//! their validate and describe capability.

pub mod audio;
pub mod dvb;
pub mod mpeg;
pub mod registry;

use bitfield::{RecordLayout, RecordSeq, Records};

use crate::descriptor::{DESCRIPTOR_HEADER_SIZE, DESCRIPTOR_RECORD};
use crate::{Result, TsError};

pub use audio::{AacDescriptor, Ac3Descriptor, Ac4Descriptor, DtsDescriptor, Eac3Descriptor};
pub use dvb::{
    CableDeliveryDescriptor, ComponentDescriptor, LocalTimeOffsetDescriptor,
    NetworkNameDescriptor, ParentalRatingDescriptor, SatelliteDeliveryDescriptor,
    ServiceDescriptor, ServiceListDescriptor, ShortEventDescriptor, StreamIdentifierDescriptor,
    SubtitlingDescriptor, TeletextDescriptor, TerrestrialDeliveryDescriptor,
};
pub use mpeg::{CaDescriptor, HevcTimingHrdDescriptor, Iso639Descriptor, RegistrationDescriptor};
pub use registry::{DescriptorKind, DescribedFields, Registry, StaticKind};

pub const TAG_REGISTRATION: u8 = 0x05;
pub const TAG_CA: u8 = 0x09;
pub const TAG_ISO_639_LANGUAGE: u8 = 0x0A;
/// ISO/IEC 13818-1 extension descriptor.
pub const TAG_MPEG_EXTENSION: u8 = 0x3F;
pub const TAG_NETWORK_NAME: u8 = 0x40;
pub const TAG_SERVICE_LIST: u8 = 0x41;
pub const TAG_SATELLITE_DELIVERY: u8 = 0x43;
pub const TAG_CABLE_DELIVERY: u8 = 0x44;
pub const TAG_SERVICE: u8 = 0x48;
pub const TAG_SHORT_EVENT: u8 = 0x4D;
pub const TAG_COMPONENT: u8 = 0x50;
pub const TAG_STREAM_IDENTIFIER: u8 = 0x52;
pub const TAG_PARENTAL_RATING: u8 = 0x55;
pub const TAG_TELETEXT: u8 = 0x56;
pub const TAG_LOCAL_TIME_OFFSET: u8 = 0x58;
pub const TAG_SUBTITLING: u8 = 0x59;
pub const TAG_TERRESTRIAL_DELIVERY: u8 = 0x5A;
pub const TAG_AC3: u8 = 0x6A;
pub const TAG_EAC3: u8 = 0x7A;
pub const TAG_DTS: u8 = 0x7B;
pub const TAG_AAC: u8 = 0x7C;
/// EN 300 468 extension descriptor.
pub const TAG_DVB_EXTENSION: u8 = 0x7F;

/// Extension tag of the HEVC timing and HRD descriptor under 0x3F.
pub const EXTENSION_HEVC_TIMING_HRD: u8 = 0x03;
/// Extension tag of the AC-4 descriptor under 0x7F.
pub const EXTENSION_AC4: u8 = 0x15;

/// Payload of a descriptor carrying `tag`, bounded by its declared length.
/// `None` when the tag differs or the length runs past `descriptor`.
pub fn payload_of(descriptor: &[u8], tag: u8) -> Option<&[u8]> {
    if *descriptor.first()? != tag {
        return None;
    }
    DESCRIPTOR_RECORD
        .split(descriptor)
        .map(|record| &record[DESCRIPTOR_HEADER_SIZE..])
}

/// Fixed-size entries packed in the payload of a descriptor.
pub(crate) fn entries<'a>(descriptor: &'a [u8], tag: u8, entry: &'static RecordLayout) -> Records<'a> {
    let payload = payload_of(descriptor, tag).unwrap_or_default();
    RecordSeq::new(entry, payload).iter()
}

/// The payload is a whole number of `entry_size` entries.
pub(crate) fn entries_valid(descriptor: &[u8], tag: u8, entry_size: usize) -> bool {
    payload_of(descriptor, tag).is_some_and(|payload| payload.len() % entry_size == 0)
}

/// Bytes of the length-prefixed string whose length byte sits at `offset`,
/// `None` when the string runs past `end`.
pub(crate) fn string_at(bytes: &[u8], offset: usize, end: usize) -> Option<&[u8]> {
    let end = end.min(bytes.len());
    if offset >= end {
        return None;
    }
    let len = bytes[offset] as usize;
    bytes.get(offset + 1..offset + 1 + len).filter(|_| offset + 1 + len <= end)
}

/// Write a length byte and `value` at `offset`, returning the offset just
/// past the string.
pub(crate) fn write_string(bytes: &mut [u8], offset: usize, value: &[u8]) -> Result<usize> {
    let end = offset + 1 + value.len();
    if value.len() > u8::MAX as usize {
        return Err(TsError::OutOfRange(format!("string of {} bytes", value.len())));
    }
    if end > bytes.len() {
        return Err(TsError::InsufficientData {
            expected: end,
            actual: bytes.len(),
        });
    }
    bytes[offset] = value.len() as u8;
    bytes[offset + 1..end].copy_from_slice(value);
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_of() {
        let data = [0x52, 0x01, 0x07, 0xFF];
        assert_eq!(payload_of(&data, 0x52), Some(&[0x07][..]));
        assert_eq!(payload_of(&data, 0x53), None);
        assert_eq!(payload_of(&[0x52, 0x05, 0x00], 0x52), None);
        assert_eq!(payload_of(&[], 0x52), None);
    }

    #[test]
    fn test_string_bounds() {
        let data = [0x02, b'a', b'b', 0x03, b'c'];
        assert_eq!(string_at(&data, 0, 5), Some(&b"ab"[..]));
        assert_eq!(string_at(&data, 0, 2), None);
        assert_eq!(string_at(&data, 3, 5), None);
        assert_eq!(string_at(&data, 5, 5), None);

        let mut out = [0u8; 4];
        assert_eq!(write_string(&mut out, 0, b"xyz").unwrap(), 4);
        assert_eq!(out, [0x03, b'x', b'y', b'z']);
        assert!(write_string(&mut out, 1, b"xyz").is_err());
    }
}
