//! Tag-to-kind registry used to validate and dump descriptor loops without a
//! switch over every known tag at each call site.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use super::audio::{AacDescriptor, Ac3Descriptor, Ac4Descriptor, DtsDescriptor, Eac3Descriptor};
use super::dvb::{
    CableDeliveryDescriptor, ComponentDescriptor, LocalTimeOffsetDescriptor,
    NetworkNameDescriptor, ParentalRatingDescriptor, SatelliteDeliveryDescriptor,
    ServiceDescriptor, ServiceListDescriptor, ShortEventDescriptor, StreamIdentifierDescriptor,
    SubtitlingDescriptor, TeletextDescriptor, TerrestrialDeliveryDescriptor, cable_modulation_name,
    polarization_name, service_type_name, teletext_type_name,
};
use super::mpeg::{
    CaDescriptor, HevcTimingHrdDescriptor, Iso639Descriptor, RegistrationDescriptor,
    audio_type_name,
};
use super::{
    EXTENSION_AC4, EXTENSION_HEVC_TIMING_HRD, TAG_AAC, TAG_AC3, TAG_CA, TAG_CABLE_DELIVERY,
    TAG_COMPONENT, TAG_DTS, TAG_DVB_EXTENSION, TAG_EAC3, TAG_ISO_639_LANGUAGE,
    TAG_LOCAL_TIME_OFFSET, TAG_MPEG_EXTENSION, TAG_NETWORK_NAME, TAG_PARENTAL_RATING,
    TAG_REGISTRATION, TAG_SATELLITE_DELIVERY, TAG_SERVICE, TAG_SERVICE_LIST, TAG_SHORT_EVENT,
    TAG_STREAM_IDENTIFIER, TAG_SUBTITLING, TAG_TELETEXT, TAG_TERRESTRIAL_DELIVERY,
};
use crate::descriptor::{DESCRIPTOR_RECORD, Descriptors};
use crate::dvb::text::dvb_text;

/// Named field values of one descriptor, in wire order.
pub type DescribedFields = Vec<(&'static str, String)>;

/// What the registry knows about one descriptor tag.
pub trait DescriptorKind: Send + Sync {
    fn tag(&self) -> u8;

    /// Extension tag for kinds living under 0x3F or 0x7F.
    fn extension(&self) -> Option<u8> {
        None
    }

    fn name(&self) -> &'static str;

    /// Format-specific checks on a descriptor whose tag matches. The
    /// declared length has already been checked against the buffer.
    fn validate(&self, descriptor: &[u8]) -> bool;

    fn describe(&self, descriptor: &[u8]) -> DescribedFields;
}

/// A [`DescriptorKind`] assembled from plain functions.
#[derive(Clone, Copy)]
pub struct StaticKind {
    tag: u8,
    extension: Option<u8>,
    name: &'static str,
    validate: fn(&[u8]) -> bool,
    describe: fn(&[u8]) -> DescribedFields,
}

impl StaticKind {
    pub const fn new(
        tag: u8,
        name: &'static str,
        validate: fn(&[u8]) -> bool,
        describe: fn(&[u8]) -> DescribedFields,
    ) -> Self {
        Self {
            tag,
            extension: None,
            name,
            validate,
            describe,
        }
    }

    pub const fn with_extension(mut self, extension: u8) -> Self {
        self.extension = Some(extension);
        self
    }
}

impl fmt::Debug for StaticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKind")
            .field("tag", &format_args!("{:#04x}", self.tag))
            .field("extension", &self.extension)
            .field("name", &self.name)
            .finish()
    }
}

impl DescriptorKind for StaticKind {
    fn tag(&self) -> u8 {
        self.tag
    }

    fn extension(&self) -> Option<u8> {
        self.extension
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn validate(&self, descriptor: &[u8]) -> bool {
        (self.validate)(descriptor)
    }

    fn describe(&self, descriptor: &[u8]) -> DescribedFields {
        (self.describe)(descriptor)
    }
}

type KindKey = (u8, Option<u8>);

fn is_extension_tag(tag: u8) -> bool {
    matches!(tag, TAG_MPEG_EXTENSION | TAG_DVB_EXTENSION)
}

fn key_of(descriptor: &[u8]) -> Option<KindKey> {
    let tag = *descriptor.first()?;
    if is_extension_tag(tag) {
        let record = DESCRIPTOR_RECORD.split(descriptor)?;
        return Some((tag, record.get(2).copied()));
    }
    Some((tag, None))
}

/// Descriptor kinds by tag (and extension tag). Built once, then shared.
#[derive(Default)]
pub struct Registry {
    kinds: HashMap<KindKey, Box<dyn DescriptorKind>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds.len())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every MPEG and DVB descriptor this crate has a view for.
    pub fn dvb() -> Self {
        let mut registry = Self::new();
        for kind in DVB_KINDS {
            registry.register(*kind);
        }
        registry
    }

    /// Add a kind, replacing any previous one for the same tag.
    pub fn register<K: DescriptorKind + 'static>(&mut self, kind: K) -> &mut Self {
        let key = (kind.tag(), kind.extension());
        if let Some(previous) = self.kinds.insert(key, Box::new(kind)) {
            trace!(tag = key.0, name = previous.name(), "replaced descriptor kind");
        }
        self
    }

    pub fn get(&self, tag: u8, extension: Option<u8>) -> Option<&dyn DescriptorKind> {
        self.kinds.get(&(tag, extension)).map(|kind| kind.as_ref())
    }

    /// Kind of the descriptor at the start of `descriptor`.
    pub fn lookup(&self, descriptor: &[u8]) -> Option<&dyn DescriptorKind> {
        let (tag, extension) = key_of(descriptor)?;
        self.get(tag, extension)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// The declared length fits, and a known kind accepts the payload.
    /// Unknown tags only need the length check.
    pub fn validate(&self, descriptor: &[u8]) -> bool {
        if !DESCRIPTOR_RECORD.validate(descriptor) {
            return false;
        }
        self.lookup(descriptor)
            .is_none_or(|kind| kind.validate(descriptor))
    }

    /// The loop is well formed and every descriptor in it validates.
    pub fn validate_loop(&self, descriptors: &Descriptors<'_>) -> bool {
        descriptors.validate()
            && descriptors
                .iter()
                .all(|descriptor| self.validate(descriptor.into_inner()))
    }

    /// Name and fields of a known descriptor.
    pub fn describe(&self, descriptor: &[u8]) -> Option<(&'static str, DescribedFields)> {
        let kind = self.lookup(descriptor)?;
        Some((kind.name(), kind.describe(descriptor)))
    }
}

/// Raw fixed fields of a view, without the tag and length.
pub fn raw_fields(values: impl Iterator<Item = (&'static str, u64)>) -> DescribedFields {
    values
        .filter(|(name, _)| !matches!(*name, "tag" | "length"))
        .map(|(name, value)| (name, value.to_string()))
        .collect()
}

fn bcd_value(value: Option<u64>) -> String {
    value.map_or_else(|| "invalid BCD".to_string(), |v| v.to_string())
}

fn code(bytes: [u8; 3]) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

fn describe_registration(d: &[u8]) -> DescribedFields {
    RegistrationDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        vec![(
            "format_identifier",
            String::from_utf8_lossy(&view.format_identifier_bytes()).into_owned(),
        )]
    })
}

fn describe_ca(d: &[u8]) -> DescribedFields {
    CaDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        vec![
            ("ca_system_id", format!("{:#06x}", view.ca_system_id())),
            ("ca_pid", format!("{:#06x}", view.ca_pid())),
        ]
    })
}

fn describe_iso639(d: &[u8]) -> DescribedFields {
    Iso639Descriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        view.entries()
            .map(|entry| {
                (
                    "language",
                    format!("{} ({})", code(entry.language()), audio_type_name(entry.audio_type())),
                )
            })
            .collect()
    })
}

fn describe_hevc_timing(d: &[u8]) -> DescribedFields {
    HevcTimingHrdDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        let mut fields = vec![("hrd_management_valid", view.hrd_management_valid().to_string())];
        if let Some(is_90khz) = view.is_90khz() {
            fields.push(("90khz", is_90khz.to_string()));
        }
        if let Some((n, k)) = view.n_k() {
            fields.push(("n", n.to_string()));
            fields.push(("k", k.to_string()));
        }
        if let Some(tick) = view.num_units_in_tick() {
            fields.push(("num_units_in_tick", tick.to_string()));
        }
        fields
    })
}

fn describe_network_name(d: &[u8]) -> DescribedFields {
    NetworkNameDescriptor::new(d)
        .ok()
        .and_then(|view| view.name().map(dvb_text))
        .map(|name| vec![("name", name)])
        .unwrap_or_default()
}

fn describe_service_list(d: &[u8]) -> DescribedFields {
    ServiceListDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        view.services()
            .map(|s| {
                (
                    "service",
                    format!("{} ({})", s.service_id(), service_type_name(s.service_type())),
                )
            })
            .collect()
    })
}

fn describe_satellite(d: &[u8]) -> DescribedFields {
    SatelliteDeliveryDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        vec![
            ("frequency_khz", bcd_value(view.frequency_khz())),
            ("orbital_position", bcd_value(view.orbital_position())),
            ("east", view.east().to_string()),
            ("polarization", polarization_name(view.polarization()).to_string()),
            ("dvb_s2", view.dvb_s2().to_string()),
            ("symbol_rate", bcd_value(view.symbol_rate())),
            ("fec_inner", view.fec_inner().to_string()),
        ]
    })
}

fn describe_cable(d: &[u8]) -> DescribedFields {
    CableDeliveryDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        vec![
            ("frequency_hz", bcd_value(view.frequency_hz())),
            ("modulation", cable_modulation_name(view.modulation()).to_string()),
            ("symbol_rate", bcd_value(view.symbol_rate())),
            ("fec_inner", view.fec_inner().to_string()),
        ]
    })
}

fn describe_terrestrial(d: &[u8]) -> DescribedFields {
    TerrestrialDeliveryDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        let mut fields = vec![("frequency_hz", view.frequency_hz().to_string())];
        fields.extend(raw_fields(view.field_values()).into_iter().skip(1));
        fields
    })
}

fn describe_service(d: &[u8]) -> DescribedFields {
    ServiceDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        vec![
            ("service_type", service_type_name(view.service_type()).to_string()),
            ("provider", view.provider_name().map(dvb_text).unwrap_or_default()),
            ("name", view.service_name().map(dvb_text).unwrap_or_default()),
        ]
    })
}

fn describe_short_event(d: &[u8]) -> DescribedFields {
    ShortEventDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        vec![
            ("language", code(view.language())),
            ("name", view.event_name().map(dvb_text).unwrap_or_default()),
            ("text", view.text().map(dvb_text).unwrap_or_default()),
        ]
    })
}

fn describe_component(d: &[u8]) -> DescribedFields {
    ComponentDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        let mut fields = raw_fields(view.field_values());
        fields.push(("language", code(view.language())));
        fields.push(("text", view.text().map(dvb_text).unwrap_or_default()));
        fields
    })
}

fn describe_stream_identifier(d: &[u8]) -> DescribedFields {
    StreamIdentifierDescriptor::new(d)
        .map(|view| raw_fields(view.field_values()))
        .unwrap_or_default()
}

fn describe_parental_rating(d: &[u8]) -> DescribedFields {
    ParentalRatingDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        view.ratings()
            .map(|r| {
                let age = r
                    .minimum_age()
                    .map_or_else(|| format!("rating {:#04x}", r.rating()), |age| format!("{age}+"));
                ("rating", format!("{} {age}", code(r.country())))
            })
            .collect()
    })
}

fn describe_teletext(d: &[u8]) -> DescribedFields {
    TeletextDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        view.pages()
            .map(|p| {
                (
                    "page",
                    format!(
                        "{} {} magazine {} page {:02x}",
                        code(p.language()),
                        teletext_type_name(p.teletext_type()),
                        p.magazine_number(),
                        p.page_number()
                    ),
                )
            })
            .collect()
    })
}

fn describe_local_time_offset(d: &[u8]) -> DescribedFields {
    LocalTimeOffsetDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        view.regions()
            .map(|r| {
                let minutes = r.local_time_offset().map(|o| o.num_minutes());
                let change = r.time_of_change().map(|t| t.to_string());
                (
                    "region",
                    format!(
                        "{}/{} offset {:?} min, change at {:?}",
                        code(r.country()),
                        r.country_region_id(),
                        minutes,
                        change
                    ),
                )
            })
            .collect()
    })
}

fn describe_subtitling(d: &[u8]) -> DescribedFields {
    SubtitlingDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        view.subtitles()
            .map(|s| {
                (
                    "subtitle",
                    format!(
                        "{} type {:#04x} composition {} ancillary {}",
                        code(s.language()),
                        s.subtitling_type(),
                        s.composition_page_id(),
                        s.ancillary_page_id()
                    ),
                )
            })
            .collect()
    })
}

fn push_opt(fields: &mut DescribedFields, name: &'static str, value: Option<u8>) {
    if let Some(value) = value {
        fields.push((name, value.to_string()));
    }
}

fn describe_ac3(d: &[u8]) -> DescribedFields {
    Ac3Descriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        let mut fields = Vec::new();
        push_opt(&mut fields, "component_type", view.component_type());
        push_opt(&mut fields, "bsid", view.bsid());
        push_opt(&mut fields, "mainid", view.mainid());
        push_opt(&mut fields, "asvc", view.asvc());
        fields
    })
}

fn describe_eac3(d: &[u8]) -> DescribedFields {
    Eac3Descriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        let mut fields = vec![("mixinfoexists", view.mixinfoexists().to_string())];
        push_opt(&mut fields, "component_type", view.component_type());
        push_opt(&mut fields, "bsid", view.bsid());
        push_opt(&mut fields, "mainid", view.mainid());
        push_opt(&mut fields, "asvc", view.asvc());
        push_opt(&mut fields, "substream1", view.substream(1));
        push_opt(&mut fields, "substream2", view.substream(2));
        push_opt(&mut fields, "substream3", view.substream(3));
        fields
    })
}

fn describe_dts(d: &[u8]) -> DescribedFields {
    DtsDescriptor::new(d)
        .map(|view| raw_fields(view.field_values()))
        .unwrap_or_default()
}

fn describe_aac(d: &[u8]) -> DescribedFields {
    AacDescriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        let mut fields = vec![(
            "profile_and_level",
            format!("{:#04x}", view.profile_and_level()),
        )];
        push_opt(&mut fields, "aac_type", view.aac_type());
        fields
    })
}

fn describe_ac4(d: &[u8]) -> DescribedFields {
    Ac4Descriptor::new(d).map_or_else(|_| Vec::new(), |view| {
        let mut fields = Vec::new();
        if let Some(enabled) = view.dialog_enhancement_enabled() {
            fields.push(("dialog_enhancement", enabled.to_string()));
        }
        push_opt(&mut fields, "channel_mode", view.channel_mode());
        if let Some(toc) = view.toc() {
            fields.push(("toc_length", toc.len().to_string()));
        }
        fields
    })
}

macro_rules! validate_with {
    ($view:ident) => {
        |d: &[u8]| $view::new(d).is_ok_and(|view| view.validate())
    };
}

static DVB_KINDS: &[StaticKind] = &[
    StaticKind::new(TAG_REGISTRATION, "registration", validate_with!(RegistrationDescriptor), describe_registration),
    StaticKind::new(TAG_CA, "conditional access", validate_with!(CaDescriptor), describe_ca),
    StaticKind::new(TAG_ISO_639_LANGUAGE, "ISO 639 language", validate_with!(Iso639Descriptor), describe_iso639),
    StaticKind::new(TAG_MPEG_EXTENSION, "HEVC timing and HRD", validate_with!(HevcTimingHrdDescriptor), describe_hevc_timing)
        .with_extension(EXTENSION_HEVC_TIMING_HRD),
    StaticKind::new(TAG_NETWORK_NAME, "network name", validate_with!(NetworkNameDescriptor), describe_network_name),
    StaticKind::new(TAG_SERVICE_LIST, "service list", validate_with!(ServiceListDescriptor), describe_service_list),
    StaticKind::new(TAG_SATELLITE_DELIVERY, "satellite delivery system", validate_with!(SatelliteDeliveryDescriptor), describe_satellite),
    StaticKind::new(TAG_CABLE_DELIVERY, "cable delivery system", validate_with!(CableDeliveryDescriptor), describe_cable),
    StaticKind::new(TAG_SERVICE, "service", validate_with!(ServiceDescriptor), describe_service),
    StaticKind::new(TAG_SHORT_EVENT, "short event", validate_with!(ShortEventDescriptor), describe_short_event),
    StaticKind::new(TAG_COMPONENT, "component", validate_with!(ComponentDescriptor), describe_component),
    StaticKind::new(TAG_STREAM_IDENTIFIER, "stream identifier", validate_with!(StreamIdentifierDescriptor), describe_stream_identifier),
    StaticKind::new(TAG_PARENTAL_RATING, "parental rating", validate_with!(ParentalRatingDescriptor), describe_parental_rating),
    StaticKind::new(TAG_TELETEXT, "teletext", validate_with!(TeletextDescriptor), describe_teletext),
    StaticKind::new(TAG_LOCAL_TIME_OFFSET, "local time offset", validate_with!(LocalTimeOffsetDescriptor), describe_local_time_offset),
    StaticKind::new(TAG_SUBTITLING, "subtitling", validate_with!(SubtitlingDescriptor), describe_subtitling),
    StaticKind::new(TAG_TERRESTRIAL_DELIVERY, "terrestrial delivery system", validate_with!(TerrestrialDeliveryDescriptor), describe_terrestrial),
    StaticKind::new(TAG_AC3, "AC-3", validate_with!(Ac3Descriptor), describe_ac3),
    StaticKind::new(TAG_EAC3, "Enhanced AC-3", validate_with!(Eac3Descriptor), describe_eac3),
    StaticKind::new(TAG_DTS, "DTS", validate_with!(DtsDescriptor), describe_dts),
    StaticKind::new(TAG_AAC, "AAC", validate_with!(AacDescriptor), describe_aac),
    StaticKind::new(TAG_DVB_EXTENSION, "AC-4", validate_with!(Ac4Descriptor), describe_ac4)
        .with_extension(EXTENSION_AC4),
];
