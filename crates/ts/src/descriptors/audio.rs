//! Audio codec descriptors of EN 300 468 Annex D and G. Several carry
//! optional one-byte fields gated by flags in their first payload byte, so
//! the position of a field depends on which earlier ones are present.

use bitfield::{GatedLayout, layout};

use super::{EXTENSION_AC4, TAG_AAC, TAG_AC3, TAG_DVB_EXTENSION, TAG_DTS, TAG_EAC3, payload_of};

/// Tag, length and the flags byte.
pub const AC3_HEADER_SIZE: usize = 3;

layout! {
    /// AC-3 descriptor (tag 0x6A).
    pub struct Ac3Descriptor[AC3_HEADER_SIZE] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        component_type_flag, set_component_type_flag: bool = (2, 0, 1);
        bsid_flag, set_bsid_flag: bool = (2, 1, 1);
        mainid_flag, set_mainid_flag: bool = (2, 2, 1);
        asvc_flag, set_asvc_flag: bool = (2, 3, 1);
    }
}

const AC3_COMPONENT_TYPE: usize = 0;
const AC3_BSID: usize = 1;
const AC3_MAINID: usize = 2;
const AC3_ASVC: usize = 3;

impl<B: AsRef<[u8]>> Ac3Descriptor<B> {
    /// Offsets of component_type, bsid, mainid and asvc.
    pub fn resolve(&self) -> GatedLayout<4> {
        GatedLayout::resolve(
            AC3_HEADER_SIZE,
            [
                (self.component_type_flag(), 1),
                (self.bsid_flag(), 1),
                (self.mainid_flag(), 1),
                (self.asvc_flag(), 1),
            ],
        )
    }

    fn gated(&self, index: usize) -> Option<u8> {
        let payload = payload_of(self.as_bytes(), TAG_AC3)?;
        let offset = self.resolve().offset(index)?;
        payload.get(offset - 2).copied()
    }

    pub fn component_type(&self) -> Option<u8> {
        self.gated(AC3_COMPONENT_TYPE)
    }

    pub fn bsid(&self) -> Option<u8> {
        self.gated(AC3_BSID)
    }

    pub fn mainid(&self) -> Option<u8> {
        self.gated(AC3_MAINID)
    }

    pub fn asvc(&self) -> Option<u8> {
        self.gated(AC3_ASVC)
    }

    /// Bytes after the last flagged field.
    pub fn additional_info(&self) -> Option<&[u8]> {
        let payload = payload_of(self.as_bytes(), TAG_AC3)?;
        payload.get(self.resolve().end() - 2..)
    }

    /// The declared length covers the flags byte and every flagged field.
    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_AC3)
            .is_some_and(|payload| payload.len() + 2 >= self.resolve().end())
    }
}

layout! {
    /// Enhanced AC-3 descriptor (tag 0x7A).
    pub struct Eac3Descriptor[3] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        component_type_flag, set_component_type_flag: bool = (2, 0, 1);
        bsid_flag, set_bsid_flag: bool = (2, 1, 1);
        mainid_flag, set_mainid_flag: bool = (2, 2, 1);
        asvc_flag, set_asvc_flag: bool = (2, 3, 1);
        mixinfoexists, set_mixinfoexists: bool = (2, 4, 1);
        substream1_flag, set_substream1_flag: bool = (2, 5, 1);
        substream2_flag, set_substream2_flag: bool = (2, 6, 1);
        substream3_flag, set_substream3_flag: bool = (2, 7, 1);
    }
}

impl<B: AsRef<[u8]>> Eac3Descriptor<B> {
    /// Offsets of component_type, bsid, mainid, asvc and the three
    /// substream bytes. `mixinfoexists` gates no field.
    pub fn resolve(&self) -> GatedLayout<7> {
        GatedLayout::resolve(
            3,
            [
                (self.component_type_flag(), 1),
                (self.bsid_flag(), 1),
                (self.mainid_flag(), 1),
                (self.asvc_flag(), 1),
                (self.substream1_flag(), 1),
                (self.substream2_flag(), 1),
                (self.substream3_flag(), 1),
            ],
        )
    }

    fn gated(&self, index: usize) -> Option<u8> {
        let payload = payload_of(self.as_bytes(), TAG_EAC3)?;
        let offset = self.resolve().offset(index)?;
        payload.get(offset - 2).copied()
    }

    pub fn component_type(&self) -> Option<u8> {
        self.gated(0)
    }

    pub fn bsid(&self) -> Option<u8> {
        self.gated(1)
    }

    pub fn mainid(&self) -> Option<u8> {
        self.gated(2)
    }

    pub fn asvc(&self) -> Option<u8> {
        self.gated(3)
    }

    /// Substream `n` (1 to 3).
    pub fn substream(&self, n: usize) -> Option<u8> {
        (1..=3).contains(&n).then(|| self.gated(3 + n)).flatten()
    }

    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_EAC3)
            .is_some_and(|payload| payload.len() + 2 >= self.resolve().end())
    }
}

layout! {
    /// DTS descriptor (tag 0x7B).
    pub struct DtsDescriptor[7] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        sample_rate_code, set_sample_rate_code: u8 = (2, 0, 4);
        bit_rate_code, set_bit_rate_code: u8 = (2, 4, 6);
        nblks, set_nblks: u8 = (3, 2, 7);
        fsize, set_fsize: u16 = (4, 1, 14);
        surround_mode, set_surround_mode: u8 = (5, 7, 6);
        lfe_flag, set_lfe_flag: bool = (6, 5, 1);
        extended_surround_flag, set_extended_surround_flag: u8 = (6, 6, 2);
    }
}

impl<B: AsRef<[u8]>> DtsDescriptor<B> {
    /// Sample rate in Hz, `None` for reserved codes.
    pub fn sample_rate(&self) -> Option<u32> {
        match self.sample_rate_code() {
            1 => Some(8_000),
            2 => Some(16_000),
            3 => Some(32_000),
            6 => Some(11_025),
            7 => Some(22_050),
            8 => Some(44_100),
            11 => Some(12_000),
            12 => Some(24_000),
            13 => Some(48_000),
            _ => None,
        }
    }

    pub fn additional_info(&self) -> Option<&[u8]> {
        payload_of(self.as_bytes(), TAG_DTS).and_then(|p| p.get(5..))
    }

    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_DTS).is_some_and(|p| p.len() >= 5)
    }
}

layout! {
    /// AAC descriptor (tag 0x7C). Only the profile and level byte is
    /// mandatory.
    pub struct AacDescriptor[3] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        profile_and_level, set_profile_and_level: u8 = (2, 0, 8);
    }
}

impl<B: AsRef<[u8]>> AacDescriptor<B> {
    fn flags(&self) -> Option<u8> {
        payload_of(self.as_bytes(), TAG_AAC)?.get(1).copied()
    }

    pub fn aac_type_flag(&self) -> bool {
        self.flags().is_some_and(|flags| flags & 0x80 != 0)
    }

    pub fn saoc_de_flag(&self) -> bool {
        self.flags().is_some_and(|flags| flags & 0x40 != 0)
    }

    /// Offset of `AAC_type` after the flags byte, when flagged.
    pub fn resolve(&self) -> GatedLayout<2> {
        let has_flags = self.flags().is_some();
        GatedLayout::resolve(3, [(has_flags, 1), (self.aac_type_flag(), 1)])
    }

    pub fn aac_type(&self) -> Option<u8> {
        let offset = self.resolve().offset(1)?;
        payload_of(self.as_bytes(), TAG_AAC)?.get(offset - 2).copied()
    }

    pub fn additional_info(&self) -> Option<&[u8]> {
        payload_of(self.as_bytes(), TAG_AAC)?.get(self.resolve().end() - 2..)
    }

    pub fn validate(&self) -> bool {
        payload_of(self.as_bytes(), TAG_AAC)
            .is_some_and(|payload| !payload.is_empty() && payload.len() + 2 >= self.resolve().end())
    }
}

layout! {
    /// AC-4 descriptor (tag 0x7F, extension 0x15).
    pub struct Ac4Descriptor[4] {
        tag, set_tag: u8 = (0, 0, 8);
        length, set_length: u8 = (1, 0, 8);
        extension_tag, set_extension_tag: u8 = (2, 0, 8);
        config_flag, set_config_flag: bool = (3, 0, 1);
        toc_flag, set_toc_flag: bool = (3, 1, 1);
    }
}

impl<B: AsRef<[u8]>> Ac4Descriptor<B> {
    fn payload(&self) -> Option<&[u8]> {
        payload_of(self.as_bytes(), TAG_DVB_EXTENSION)
    }

    /// Offsets of the config byte and the TOC length byte.
    pub fn resolve(&self) -> GatedLayout<2> {
        GatedLayout::resolve(4, [(self.config_flag(), 1), (self.toc_flag(), 1)])
    }

    fn config(&self) -> Option<u8> {
        let offset = self.resolve().offset(0)?;
        self.payload()?.get(offset - 2).copied()
    }

    pub fn dialog_enhancement_enabled(&self) -> Option<bool> {
        self.config().map(|config| config & 0x80 != 0)
    }

    pub fn channel_mode(&self) -> Option<u8> {
        self.config().map(|config| (config >> 5) & 0x03)
    }

    /// The DSI table of contents, bounded by its own length byte and the
    /// declared length.
    pub fn toc(&self) -> Option<&[u8]> {
        let offset = self.resolve().offset(1)? - 2;
        let payload = self.payload()?;
        let len = *payload.get(offset)? as usize;
        payload.get(offset + 1..offset + 1 + len)
    }

    fn end(&self) -> Option<usize> {
        let layout = self.resolve();
        let toc_len = if self.toc_flag() { self.toc()?.len() } else { 0 };
        Some(layout.end() + toc_len)
    }

    pub fn additional_info(&self) -> Option<&[u8]> {
        let end = self.end()?;
        self.payload()?.get(end - 2..)
    }

    pub fn validate(&self) -> bool {
        let Some(payload) = self.payload() else {
            return false;
        };
        payload.len() >= 2
            && self.extension_tag() == EXTENSION_AC4
            && self.end().is_some_and(|end| end <= payload.len() + 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// AC-3 descriptor with the given flag nibble, a full set of optional
    /// bytes 0xA0.. and `extra` bytes of additional info, with the
    /// declared length covering only the flagged fields plus `extra`.
    fn ac3(flags: u8, extra: usize) -> Vec<u8> {
        let present = flags.count_ones() as usize;
        let mut data = vec![TAG_AC3, (1 + present + extra) as u8, flags << 4];
        data.extend((0..present as u8).map(|i| 0xA0 + i));
        data.extend(std::iter::repeat_n(0xEE, extra));
        data
    }

    #[test]
    fn test_ac3_all_flag_combinations() {
        for flags in 0u8..16 {
            let data = ac3(flags, 0);
            let desc = Ac3Descriptor::new(&data[..]).unwrap();
            let layout = desc.resolve();
            // bit 3 of the nibble is component_type, bit 0 is asvc
            for index in 0..4 {
                let present = flags & (0x8 >> index) != 0;
                let earlier = (flags >> (4 - index)).count_ones() as usize;
                let expected = present.then_some(AC3_HEADER_SIZE + earlier);
                assert_eq!(layout.offset(index), expected, "flags {flags:04b} field {index}");
            }
            assert_eq!(layout.end(), AC3_HEADER_SIZE + flags.count_ones() as usize);
            assert!(desc.validate(), "flags {flags:04b}");

            let values = [desc.component_type(), desc.bsid(), desc.mainid(), desc.asvc()];
            let mut next = 0xA0;
            for (index, value) in values.into_iter().enumerate() {
                if flags & (0x8 >> index) != 0 {
                    assert_eq!(value, Some(next));
                    next += 1;
                } else {
                    assert_eq!(value, None);
                }
            }

            // one byte short of the flagged fields
            if flags != 0 {
                let mut short = data.clone();
                short[1] -= 1;
                short.pop();
                assert!(!Ac3Descriptor::new(&short[..]).unwrap().validate());
            }
        }
    }

    #[test]
    fn test_ac3_additional_info() {
        let data = ac3(0b0100, 2);
        let desc = Ac3Descriptor::new(&data[..]).unwrap();
        assert!(desc.validate());
        assert_eq!(desc.bsid(), Some(0xA0));
        assert_eq!(desc.additional_info(), Some(&[0xEE, 0xEE][..]));
    }

    #[test]
    fn test_eac3_substreams() {
        // bsid and substream3 flagged, mixinfoexists carries no byte
        let data = [TAG_EAC3, 0x03, 0b0100_1001, 0x10, 0x33];
        let desc = Eac3Descriptor::new(&data[..]).unwrap();
        assert!(desc.validate());
        assert!(desc.mixinfoexists());
        assert_eq!(desc.bsid(), Some(0x10));
        assert_eq!(desc.substream(1), None);
        assert_eq!(desc.substream(3), Some(0x33));
        assert_eq!(desc.substream(4), None);

        let short = [TAG_EAC3, 0x02, 0b0100_1001, 0x10];
        assert!(!Eac3Descriptor::new(&short[..]).unwrap().validate());
    }

    #[test]
    fn test_dts() {
        let mut data = [0u8; 7];
        let mut desc = DtsDescriptor::new(&mut data[..]).unwrap();
        desc.set_tag(TAG_DTS);
        desc.set_length(5);
        desc.set_sample_rate_code(13);
        desc.set_bit_rate_code(0x0F);
        desc.set_nblks(15);
        desc.set_fsize(2012);
        desc.set_surround_mode(9);
        desc.set_lfe_flag(true);
        desc.set_extended_surround_flag(2);
        let desc = DtsDescriptor::new(&data[..]).unwrap();
        assert!(desc.validate());
        assert_eq!(desc.sample_rate(), Some(48_000));
        assert_eq!(desc.bit_rate_code(), 0x0F);
        assert_eq!(desc.nblks(), 15);
        assert_eq!(desc.fsize(), 2012);
        assert_eq!(desc.surround_mode(), 9);
        assert!(desc.lfe_flag());
        assert_eq!(desc.extended_surround_flag(), 2);
    }

    #[test]
    fn test_aac() {
        let bare = [TAG_AAC, 0x01, 0x58];
        let desc = AacDescriptor::new(&bare[..]).unwrap();
        assert!(desc.validate());
        assert!(!desc.aac_type_flag());
        assert_eq!(desc.aac_type(), None);

        let typed = [TAG_AAC, 0x04, 0x58, 0x80, 0x03, 0x99];
        let desc = AacDescriptor::new(&typed[..]).unwrap();
        assert!(desc.validate());
        assert_eq!(desc.aac_type(), Some(0x03));
        assert_eq!(desc.additional_info(), Some(&[0x99][..]));

        let truncated = [TAG_AAC, 0x02, 0x58, 0x80];
        assert!(!AacDescriptor::new(&truncated[..]).unwrap().validate());
    }

    #[test]
    fn test_ac4() {
        // config and TOC present, TOC of 2 bytes
        let data = [TAG_DVB_EXTENSION, 0x06, EXTENSION_AC4, 0xC0, 0xC0, 0x02, 0x11, 0x22];
        let desc = Ac4Descriptor::new(&data[..]).unwrap();
        assert!(desc.validate());
        assert_eq!(desc.dialog_enhancement_enabled(), Some(true));
        assert_eq!(desc.channel_mode(), Some(2));
        assert_eq!(desc.toc(), Some(&[0x11, 0x22][..]));

        // TOC length past the declared length
        let bad = [TAG_DVB_EXTENSION, 0x05, EXTENSION_AC4, 0x40, 0x03, 0x11, 0x22];
        let desc = Ac4Descriptor::new(&bad[..]).unwrap();
        assert_eq!(desc.toc(), None);
        assert!(!desc.validate());

        let no_options = [TAG_DVB_EXTENSION, 0x02, EXTENSION_AC4, 0x00];
        let desc = Ac4Descriptor::new(&no_options[..]).unwrap();
        assert!(desc.validate());
        assert_eq!(desc.channel_mode(), None);
    }
}
