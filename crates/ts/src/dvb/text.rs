//! Text of DVB strings: the character table selector of EN 300 468 Annex A
//! and the control codes shared by every table.

use std::borrow::Cow;

use encoding_rs::{
    BIG5, EUC_KR, Encoding, GBK, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, ISO_8859_6,
    ISO_8859_7, ISO_8859_8, ISO_8859_10, ISO_8859_13, ISO_8859_14, ISO_8859_15, UTF_8, UTF_16BE,
    WINDOWS_874, WINDOWS_1252, WINDOWS_1254,
};

/// Line break control code of single-byte tables.
const CR_LF: u8 = 0x8A;
/// Control codes of multi-byte tables live at U+E080..=U+E09F.
const WIDE_CONTROLS: std::ops::RangeInclusive<char> = '\u{E080}'..='\u{E09F}';
const WIDE_CR_LF: char = '\u{E08A}';

/// Upper half of the ISO/IEC 6937 default table, from 0xA0. The
/// non-spacing diacritics at 0xC1..=0xCF are handled by [`combining_mark`].
#[rustfmt::skip]
const ISO_6937_HIGH: [char; 96] = [
    '\u{A0}', '¡', '¢', '£', '$', '¥', '#', '§', '¤', '‘', '“', '«', '←', '↑', '→', '↓',
    '°', '±', '²', '³', '×', 'µ', '¶', '·', '÷', '’', '”', '»', '¼', '½', '¾', '¿',
    '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}',
    '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}',
    '―', '¹', '®', '©', '™', '♪', '¬', '¦', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '\u{FFFD}', '⅛', '⅜', '⅝', '⅞',
    'Ω', 'Æ', 'Đ', 'ª', 'Ħ', '\u{FFFD}', 'Ĳ', 'Ŀ', 'Ł', 'Ø', 'Œ', 'º', 'Þ', 'Ŧ', 'Ŋ', 'ŉ',
    'ĸ', 'æ', 'đ', 'ð', 'ħ', 'ı', 'ĳ', 'ŀ', 'ł', 'ø', 'œ', 'ß', 'þ', 'ŧ', 'ŋ', '\u{AD}',
];

/// Table a string is coded in. `None` is the ISO/IEC 6937 default.
fn iso_8859(part: u8) -> Option<&'static Encoding> {
    // 8859-1, -9 and -11 decode through their Windows supersets once the
    // C1 range has been stripped.
    Some(match part {
        1 => WINDOWS_1252,
        2 => ISO_8859_2,
        3 => ISO_8859_3,
        4 => ISO_8859_4,
        5 => ISO_8859_5,
        6 => ISO_8859_6,
        7 => ISO_8859_7,
        8 => ISO_8859_8,
        9 => WINDOWS_1254,
        10 => ISO_8859_10,
        11 => WINDOWS_874,
        13 => ISO_8859_13,
        14 => ISO_8859_14,
        15 => ISO_8859_15,
        _ => return None,
    })
}

/// Split the character table selector off a DVB string.
///
/// Reserved or unsupported selectors are skipped and the text is read with
/// the default table.
pub fn character_table(bytes: &[u8]) -> (Option<&'static Encoding>, &[u8]) {
    match bytes.first() {
        Some(0x10) => {
            let table = match bytes.get(1..3) {
                Some(&[0x00, part]) => iso_8859(part),
                _ => None,
            };
            (table, bytes.get(3..).unwrap_or_default())
        }
        Some(&selector @ 0x01..=0x0B) => (iso_8859(selector + 4), &bytes[1..]),
        Some(0x11) => (Some(UTF_16BE), &bytes[1..]),
        Some(0x12) => (Some(EUC_KR), &bytes[1..]),
        Some(0x13) => (Some(GBK), &bytes[1..]),
        Some(0x14) => (Some(BIG5), &bytes[1..]),
        Some(0x15) => (Some(UTF_8), &bytes[1..]),
        Some(0x00..=0x1F) => (None, &bytes[1..]),
        _ => (None, bytes),
    }
}

/// Decode a DVB string to text. Control code 0x8A becomes a line break,
/// the other control codes are dropped.
pub fn dvb_text(bytes: &[u8]) -> String {
    match character_table(bytes) {
        (None, body) => decode_iso_6937(body),
        (Some(encoding), body) if encoding.is_single_byte() => {
            let body = strip_controls(body);
            encoding
                .decode_without_bom_handling(&body)
                .0
                .into_owned()
        }
        (Some(encoding), body) => {
            let (text, _) = encoding.decode_without_bom_handling(body);
            text.chars()
                .filter_map(|c| match c {
                    WIDE_CR_LF => Some('\n'),
                    c if WIDE_CONTROLS.contains(&c) => None,
                    c => Some(c),
                })
                .collect()
        }
    }
}

fn strip_controls(bytes: &[u8]) -> Cow<'_, [u8]> {
    if !bytes.iter().any(|b| (0x80..=0x9F).contains(b)) {
        return Cow::Borrowed(bytes);
    }
    Cow::Owned(
        bytes
            .iter()
            .filter_map(|&b| match b {
                CR_LF => Some(b'\n'),
                0x80..=0x9F => None,
                b => Some(b),
            })
            .collect(),
    )
}

/// Combining character of an ISO/IEC 6937 non-spacing diacritic.
fn combining_mark(byte: u8) -> Option<char> {
    Some(match byte {
        0xC1 => '\u{300}',
        0xC2 => '\u{301}',
        0xC3 => '\u{302}',
        0xC4 => '\u{303}',
        0xC5 => '\u{304}',
        0xC6 => '\u{306}',
        0xC7 => '\u{307}',
        0xC8 => '\u{308}',
        0xCA => '\u{30A}',
        0xCB => '\u{327}',
        0xCD => '\u{30B}',
        0xCE => '\u{328}',
        0xCF => '\u{30C}',
        _ => return None,
    })
}

fn iso_6937_char(byte: u8) -> Option<char> {
    match byte {
        0x00..=0x7F => Some(byte as char),
        CR_LF => Some('\n'),
        0x80..=0x9F => None,
        _ => Some(ISO_6937_HIGH[(byte - 0xA0) as usize]),
    }
}

/// Diacritics precede their base letter; the result carries the base
/// followed by the Unicode combining mark.
fn decode_iso_6937(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    let mut bytes = bytes.iter().copied();
    while let Some(byte) = bytes.next() {
        match combining_mark(byte) {
            Some(mark) => {
                if let Some(base) = bytes.next().and_then(iso_6937_char) {
                    text.push(base);
                    text.push(mark);
                }
            }
            None => text.extend(iso_6937_char(byte)),
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        assert_eq!(dvb_text(b"plain"), "plain");
        assert_eq!(dvb_text(b"Caf\xC2e"), "Cafe\u{301}");
        assert_eq!(dvb_text(b"\xA3 5\x8Anext\x86"), "£ 5\nnext");
        // a diacritic with nothing after it is dropped
        assert_eq!(dvb_text(b"a\xC8"), "a");
    }

    #[test]
    fn test_single_byte_selectors() {
        assert_eq!(dvb_text(b"\x05Caf\xe9"), "Café");
        assert_eq!(dvb_text(b"\x01\xB4\xD0"), "Да");
        assert_eq!(dvb_text(b"\x10\x00\x02\xB9"), "š");
        assert_eq!(dvb_text(b"\x10\x00\x01ABC"), "ABC");
        assert_eq!(dvb_text(b"\x0BOne\x8ATwo"), "One\nTwo");
    }

    #[test]
    fn test_multi_byte_selectors() {
        assert_eq!(dvb_text(&[0x11, 0x00, 0x41, 0x00, 0x42]), "AB");
        assert_eq!(dvb_text(&[0x11, 0x00, 0x41, 0xE0, 0x8A, 0x00, 0x42]), "A\nB");
        assert_eq!(dvb_text(b"\x15Caf\xC3\xA9"), "Café");
    }

    #[test]
    fn test_selector_split() {
        assert_eq!(character_table(b"\x10\x00"), (None, &b""[..]));
        assert_eq!(character_table(b"\x08xy"), (None, &b"xy"[..]));
        let (table, body) = character_table(b"\x14ab");
        assert_eq!(table.map(Encoding::name), Some("Big5"));
        assert_eq!(body, b"ab");
    }
}
