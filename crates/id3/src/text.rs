//! Text encodings of ID3v2.4 frames and terminator-separated strings.

use std::borrow::Cow;

use encoding_rs::{UTF_8, UTF_16BE, mem};

use crate::{Id3Error, Result};

/// Encoding byte leading every text-bearing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// ISO-8859-1, terminated by 0x00.
    Latin1,
    /// UTF-16 starting with a byte order mark, terminated by 0x00 0x00.
    Utf16,
    /// UTF-16 big endian without BOM.
    Utf16Be,
    Utf8,
}

impl TryFrom<u8> for TextEncoding {
    type Error = Id3Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Latin1),
            1 => Ok(Self::Utf16),
            2 => Ok(Self::Utf16Be),
            3 => Ok(Self::Utf8),
            other => Err(Id3Error::UnknownEncoding(other)),
        }
    }
}

impl From<TextEncoding> for u8 {
    fn from(value: TextEncoding) -> Self {
        match value {
            TextEncoding::Latin1 => 0,
            TextEncoding::Utf16 => 1,
            TextEncoding::Utf16Be => 2,
            TextEncoding::Utf8 => 3,
        }
    }
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            Self::Latin1 => "ISO-8859-1",
            Self::Utf16 => "UTF-16",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf8 => "UTF-8",
        }
    }

    /// Bytes of the string terminator, which is also the code unit size.
    pub fn unit(self) -> usize {
        match self {
            Self::Utf16 | Self::Utf16Be => 2,
            Self::Latin1 | Self::Utf8 => 1,
        }
    }

    /// Position of the first terminator, aligned to the code unit.
    fn terminator(self, bytes: &[u8]) -> Option<usize> {
        match self.unit() {
            1 => memchr::memchr(0, bytes),
            _ => bytes
                .chunks_exact(2)
                .position(|unit| unit == [0, 0])
                .map(|index| index * 2),
        }
    }

    /// Split a terminated string off the front of `bytes`, returning the
    /// string without its terminator and what follows it.
    pub fn split_terminated(self, bytes: &[u8]) -> Result<(&[u8], &[u8])> {
        let end = self.terminator(bytes).ok_or(Id3Error::MissingTerminator)?;
        Ok((&bytes[..end], &bytes[end + self.unit()..]))
    }

    /// Every terminator-separated string of `bytes`. A trailing terminator
    /// does not start another string.
    pub fn split_all(self, bytes: &[u8]) -> Vec<&[u8]> {
        let mut values = Vec::new();
        let mut rest = bytes;
        while let Some(end) = self.terminator(rest) {
            values.push(&rest[..end]);
            rest = &rest[end + self.unit()..];
        }
        if !rest.is_empty() && !(self.unit() == 2 && rest.len() == 1) {
            values.push(rest);
        }
        values
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        let text: Cow<'_, str> = match self {
            Self::Latin1 => mem::decode_latin1(bytes),
            // BOM sniffing picks little endian when the mark says so
            Self::Utf16 => UTF_16BE.decode(bytes).0,
            Self::Utf16Be => UTF_16BE.decode_without_bom_handling(bytes).0,
            Self::Utf8 => UTF_8.decode(bytes).0,
        };
        text.into_owned()
    }

    /// Encode `text` without terminator; UTF-16 gets a big endian BOM.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Latin1 => {
                if !mem::is_str_latin1(text) {
                    return Err(Id3Error::Unencodable(self.name()));
                }
                Ok(mem::encode_latin1_lossy(text).into_owned())
            }
            Self::Utf16 => Ok([0xFE, 0xFF]
                .into_iter()
                .chain(text.encode_utf16().flat_map(u16::to_be_bytes))
                .collect()),
            Self::Utf16Be => Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect()),
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
        }
    }

    /// Encode `text` followed by the terminator.
    pub fn encode_terminated(self, text: &str) -> Result<Vec<u8>> {
        let mut bytes = self.encode(text)?;
        bytes.resize(bytes.len() + self.unit(), 0);
        Ok(bytes)
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        assert_eq!(TextEncoding::Latin1.decode(b"Caf\xe9"), "Café");
        assert_eq!(TextEncoding::Utf16.decode(&[0xFF, 0xFE, b'h', 0, b'i', 0]), "hi");
        assert_eq!(TextEncoding::Utf16.decode(&[0xFE, 0xFF, 0, b'h', 0, b'i']), "hi");
        assert_eq!(TextEncoding::Utf16Be.decode(&[0, b'o', 0, b'k']), "ok");
        assert_eq!(TextEncoding::Utf8.decode("żółw".as_bytes()), "żółw");
    }

    #[test]
    fn test_encode() {
        assert_eq!(TextEncoding::Latin1.encode("Café").unwrap(), b"Caf\xe9");
        assert_eq!(
            TextEncoding::Latin1.encode("żółw"),
            Err(Id3Error::Unencodable("ISO-8859-1"))
        );
        assert_eq!(
            TextEncoding::Utf16.encode_terminated("a").unwrap(),
            [0xFE, 0xFF, 0, b'a', 0, 0]
        );
        let encoded = TextEncoding::Utf16.encode("żółw").unwrap();
        assert_eq!(TextEncoding::Utf16.decode(&encoded), "żółw");
    }

    #[test]
    fn test_utf16_terminator_is_aligned() {
        // 0x00 0x00 straddling two code units is not a terminator
        let bytes = [0, b'a', 0x01, 0, 0, b'b', 0, 0, 0, b'c'];
        let (first, rest) = TextEncoding::Utf16Be.split_terminated(&bytes).unwrap();
        assert_eq!(first, &[0, b'a', 0x01, 0, 0, b'b']);
        assert_eq!(rest, &[0, b'c']);
    }

    #[test]
    fn test_split_all() {
        assert_eq!(
            TextEncoding::Latin1.split_all(b"Rock\0Pop\0"),
            vec![&b"Rock"[..], &b"Pop"[..]]
        );
        assert_eq!(TextEncoding::Utf8.split_all(b"one"), vec![&b"one"[..]]);
        assert!(TextEncoding::Latin1.split_all(b"").is_empty());
        assert_eq!(
            TextEncoding::Latin1.split_terminated(b"no end"),
            Err(Id3Error::MissingTerminator)
        );
    }

    #[test]
    fn test_encoding_byte() {
        assert_eq!(TextEncoding::try_from(1), Ok(TextEncoding::Utf16));
        assert_eq!(TextEncoding::try_from(4), Err(Id3Error::UnknownEncoding(4)));
        assert_eq!(u8::from(TextEncoding::Utf8), 3);
    }
}
