//! RTP payload headers for MPEG-1/2 elementary streams (RFC 2250 section
//! 3.4 to 3.5).

use bitfield::layout;

pub const MPEG_VIDEO_HEADER_SIZE: usize = 4;
pub const MPEG2_VIDEO_EXTENSION_SIZE: usize = 4;
pub const MPEG_AUDIO_HEADER_SIZE: usize = 4;

/// Picture coding types of the P field.
pub const PICTURE_TYPE_I: u8 = 1;
pub const PICTURE_TYPE_P: u8 = 2;
pub const PICTURE_TYPE_B: u8 = 3;
pub const PICTURE_TYPE_D: u8 = 4;

layout! {
    /// MPEG video-specific header.
    pub struct MpegVideoHeader[MPEG_VIDEO_HEADER_SIZE] {
        mbz, set_mbz: u8 = (0, 0, 5);
        /// An MPEG-2 video-specific header extension follows.
        t, set_t: bool = (0, 5, 1);
        temporal_reference, set_temporal_reference: u16 = (0, 6, 10);
        active_n, set_active_n: bool = (2, 0, 1);
        new_picture_header, set_new_picture_header: bool = (2, 1, 1);
        sequence_header_present, set_sequence_header_present: bool = (2, 2, 1);
        beginning_of_slice, set_beginning_of_slice: bool = (2, 3, 1);
        end_of_slice, set_end_of_slice: bool = (2, 4, 1);
        picture_type, set_picture_type: u8 = (2, 5, 3);
        full_backward_vector, set_full_backward_vector: bool = (3, 0, 1);
        backward_f_code, set_backward_f_code: u8 = (3, 1, 3);
        full_forward_vector, set_full_forward_vector: bool = (3, 4, 1);
        forward_f_code, set_forward_f_code: u8 = (3, 5, 3);
    }
}

impl<B: AsRef<[u8]>> MpegVideoHeader<B> {
    /// Video-specific header plus the MPEG-2 extension when T is set.
    pub fn header_len(&self) -> usize {
        MPEG_VIDEO_HEADER_SIZE + if self.t() { MPEG2_VIDEO_EXTENSION_SIZE } else { 0 }
    }

    pub fn extension(&self) -> Option<Mpeg2VideoExtension<&[u8]>> {
        if !self.t() {
            return None;
        }
        Mpeg2VideoExtension::new(self.as_bytes().get(MPEG_VIDEO_HEADER_SIZE..)?).ok()
    }

    /// Slice data after the headers.
    pub fn payload(&self) -> Option<&[u8]> {
        self.as_bytes().get(self.header_len()..)
    }

    /// MBZ bits clear, a defined picture type, and the extension present
    /// when announced.
    pub fn validate(&self) -> bool {
        self.mbz() == 0
            && (PICTURE_TYPE_I..=PICTURE_TYPE_D).contains(&self.picture_type())
            && self.as_bytes().len() >= self.header_len()
    }
}

layout! {
    /// MPEG-2 video-specific header extension.
    pub struct Mpeg2VideoExtension[MPEG2_VIDEO_EXTENSION_SIZE] {
        /// Unused, must be zero.
        x, set_x: bool = (0, 0, 1);
        /// A further extension is present.
        e, set_e: bool = (0, 1, 1);
        f_code_0_0, set_f_code_0_0: u8 = (0, 2, 4);
        f_code_0_1, set_f_code_0_1: u8 = (0, 6, 4);
        f_code_1_0, set_f_code_1_0: u8 = (1, 2, 4);
        f_code_1_1, set_f_code_1_1: u8 = (1, 6, 4);
        intra_dc_precision, set_intra_dc_precision: u8 = (2, 2, 2);
        picture_structure, set_picture_structure: u8 = (2, 4, 2);
        top_field_first, set_top_field_first: bool = (2, 6, 1);
        frame_predictive_frame_dct, set_frame_predictive_frame_dct: bool = (2, 7, 1);
        concealment_motion_vectors, set_concealment_motion_vectors: bool = (3, 0, 1);
        q_scale_type, set_q_scale_type: bool = (3, 1, 1);
        intra_vlc_format, set_intra_vlc_format: bool = (3, 2, 1);
        alternate_scan, set_alternate_scan: bool = (3, 3, 1);
        repeat_first_field, set_repeat_first_field: bool = (3, 4, 1);
        chroma_420_type, set_chroma_420_type: bool = (3, 5, 1);
        progressive_frame, set_progressive_frame: bool = (3, 6, 1);
        composite_display_flag, set_composite_display_flag: bool = (3, 7, 1);
    }
}

layout! {
    /// MPEG audio-specific header.
    pub struct MpegAudioHeader[MPEG_AUDIO_HEADER_SIZE] {
        mbz, set_mbz: u16 = (0, 0, 16);
        /// Byte offset of this payload inside the audio frame.
        fragment_offset, set_fragment_offset: u16 = (2, 0, 16);
    }
}

impl<B: AsRef<[u8]>> MpegAudioHeader<B> {
    pub fn payload(&self) -> &[u8] {
        &self.as_bytes()[MPEG_AUDIO_HEADER_SIZE..]
    }

    pub fn validate(&self) -> bool {
        self.mbz() == 0
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_video_header() {
        // TR 513, T set, S and B, P picture, FFV 1 FFC 3
        let bytes = [0x06, 0x01, 0x32, 0x0B, 0x44, 0xA5, 0x9C, 0x01, 0xAB];
        let video = MpegVideoHeader::new(&bytes[..]).unwrap();
        assert!(video.t());
        assert_eq!(video.temporal_reference(), 513);
        assert!(video.sequence_header_present());
        assert!(video.beginning_of_slice());
        assert!(!video.end_of_slice());
        assert_eq!(video.picture_type(), PICTURE_TYPE_P);
        assert!(video.full_forward_vector());
        assert_eq!(video.forward_f_code(), 3);
        assert_eq!(video.header_len(), 8);
        assert_eq!(video.payload(), Some(&[0xAB][..]));
        assert!(video.validate());

        let ext = video.extension().unwrap();
        assert!(!ext.x());
        assert!(ext.e());
        assert_eq!(ext.f_code_0_0(), 1);
        assert_eq!(ext.f_code_0_1(), 2);
        assert_eq!(ext.f_code_1_0(), 9);
        assert_eq!(ext.f_code_1_1(), 6);
        assert_eq!(ext.intra_dc_precision(), 1);
        assert_eq!(ext.picture_structure(), 3);
        assert!(!ext.top_field_first());
        assert!(!ext.frame_predictive_frame_dct());
        assert!(!ext.concealment_motion_vectors());
        assert!(ext.composite_display_flag());
    }

    #[test]
    fn test_video_validate() {
        let mut bytes = [0x06, 0x01, 0x32, 0x0B];
        assert!(!MpegVideoHeader::new(&bytes[..]).unwrap().validate());
        assert!(MpegVideoHeader::new(&bytes[..]).unwrap().extension().is_none());
        bytes[0] = 0x02;
        assert!(MpegVideoHeader::new(&bytes[..]).unwrap().validate());
        bytes[2] = 0x30;
        assert!(!MpegVideoHeader::new(&bytes[..]).unwrap().validate());
        bytes[2] = 0x32;
        bytes[0] = 0x82;
        assert!(!MpegVideoHeader::new(&bytes[..]).unwrap().validate());
    }

    #[test]
    fn test_audio_header() {
        let mut bytes = [0u8; 6];
        let mut audio = MpegAudioHeader::new(&mut bytes[..]).unwrap();
        audio.set_fragment_offset(0x0180);
        assert!(audio.validate());
        assert_eq!(audio.payload().len(), 2);
        assert_eq!(bytes[..4], [0, 0, 0x01, 0x80]);
    }
}
