//! Bodies of the frames sharing the two generic encodings (text and URL
//! link frames) and of COMM, PRIV, TXXX and WXXX.
//!
//! The typed views borrow frame content as returned by
//! [`Frame::content`](crate::Frame::content); [`decode_frame`] turns a frame
//! into owned values in one go.

use crate::frame::Frame;
use crate::text::TextEncoding;
use crate::{Id3Error, Result};

fn split_encoding(content: &[u8]) -> Result<(TextEncoding, &[u8])> {
    let (&first, rest) = content.split_first().ok_or(Id3Error::MissingTerminator)?;
    Ok((TextEncoding::try_from(first)?, rest))
}

/// Drop one trailing terminator, if any.
fn trim_terminator(encoding: TextEncoding, bytes: &[u8]) -> &[u8] {
    let unit = encoding.unit();
    if bytes.len() >= unit
        && bytes.len() % unit == 0
        && bytes[bytes.len() - unit..].iter().all(|&b| b == 0)
    {
        &bytes[..bytes.len() - unit]
    } else {
        bytes
    }
}

/// Latin-1 text up to the first NUL.
fn latin1_until_nul(bytes: &[u8]) -> &[u8] {
    memchr::memchr(0, bytes).map_or(bytes, |end| &bytes[..end])
}

/// Text information frame: one or more NUL-separated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFrame<'a> {
    pub encoding: TextEncoding,
    pub text: &'a [u8],
}

impl<'a> TextFrame<'a> {
    pub fn parse(content: &'a [u8]) -> Result<Self> {
        let (encoding, text) = split_encoding(content)?;
        Ok(Self { encoding, text })
    }

    pub fn values(&self) -> Vec<String> {
        self.encoding
            .split_all(self.text)
            .into_iter()
            .map(|value| self.encoding.decode(value))
            .collect()
    }
}

/// URL link frame: an ISO-8859-1 URL with no encoding byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlFrame<'a> {
    pub url: &'a [u8],
}

impl<'a> UrlFrame<'a> {
    pub fn parse(content: &'a [u8]) -> Self {
        Self {
            url: latin1_until_nul(content),
        }
    }

    pub fn url(&self) -> String {
        TextEncoding::Latin1.decode(self.url)
    }
}

/// COMM: language, short description and the comment itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentFrame<'a> {
    pub encoding: TextEncoding,
    pub language: [u8; 3],
    pub description: &'a [u8],
    pub text: &'a [u8],
}

impl<'a> CommentFrame<'a> {
    pub fn parse(content: &'a [u8]) -> Result<Self> {
        let (encoding, rest) = split_encoding(content)?;
        let language: [u8; 3] = rest
            .get(..3)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(Id3Error::MissingTerminator)?;
        let (description, text) = encoding.split_terminated(&rest[3..])?;
        Ok(Self {
            encoding,
            language,
            description,
            text: trim_terminator(encoding, text),
        })
    }

    pub fn description(&self) -> String {
        self.encoding.decode(self.description)
    }

    pub fn text(&self) -> String {
        self.encoding.decode(self.text)
    }
}

/// TXXX: a described user-defined text value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserTextFrame<'a> {
    pub encoding: TextEncoding,
    pub description: &'a [u8],
    pub value: &'a [u8],
}

impl<'a> UserTextFrame<'a> {
    pub fn parse(content: &'a [u8]) -> Result<Self> {
        let (encoding, rest) = split_encoding(content)?;
        let (description, value) = encoding.split_terminated(rest)?;
        Ok(Self {
            encoding,
            description,
            value: trim_terminator(encoding, value),
        })
    }

    pub fn description(&self) -> String {
        self.encoding.decode(self.description)
    }

    pub fn value(&self) -> String {
        self.encoding.decode(self.value)
    }
}

/// WXXX: a described URL. Only the description follows the encoding
/// byte; the URL is always ISO-8859-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserUrlFrame<'a> {
    pub encoding: TextEncoding,
    pub description: &'a [u8],
    pub url: &'a [u8],
}

impl<'a> UserUrlFrame<'a> {
    pub fn parse(content: &'a [u8]) -> Result<Self> {
        let (encoding, rest) = split_encoding(content)?;
        let (description, url) = encoding.split_terminated(rest)?;
        Ok(Self {
            encoding,
            description,
            url: latin1_until_nul(url),
        })
    }

    pub fn description(&self) -> String {
        self.encoding.decode(self.description)
    }

    pub fn url(&self) -> String {
        TextEncoding::Latin1.decode(self.url)
    }
}

/// PRIV: owner identifier and opaque data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivateFrame<'a> {
    pub owner: &'a [u8],
    pub data: &'a [u8],
}

impl<'a> PrivateFrame<'a> {
    pub fn parse(content: &'a [u8]) -> Result<Self> {
        let (owner, data) = TextEncoding::Latin1.split_terminated(content)?;
        Ok(Self { owner, data })
    }

    pub fn owner(&self) -> String {
        TextEncoding::Latin1.decode(self.owner)
    }
}

/// Owned decoding of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFrame {
    Text(Vec<String>),
    Url(String),
    Comment {
        language: String,
        description: String,
        text: String,
    },
    UserText {
        description: String,
        value: String,
    },
    UserUrl {
        description: String,
        url: String,
    },
    Private {
        owner: String,
        data: Vec<u8>,
    },
    /// A frame without a typed view.
    Other(Vec<u8>),
}

/// Decode `frame` according to its id.
pub fn decode_frame(frame: &Frame<'_>) -> Result<DecodedFrame> {
    let content = frame.content()?;
    let content: &[u8] = &content;
    let decoded = match &frame.id() {
        b"COMM" => {
            let comment = CommentFrame::parse(content)?;
            DecodedFrame::Comment {
                language: TextEncoding::Latin1.decode(&comment.language),
                description: comment.description(),
                text: comment.text(),
            }
        }
        b"TXXX" => {
            let user = UserTextFrame::parse(content)?;
            DecodedFrame::UserText {
                description: user.description(),
                value: user.value(),
            }
        }
        b"WXXX" => {
            let user = UserUrlFrame::parse(content)?;
            DecodedFrame::UserUrl {
                description: user.description(),
                url: user.url(),
            }
        }
        b"PRIV" => {
            let private = PrivateFrame::parse(content)?;
            DecodedFrame::Private {
                owner: private.owner(),
                data: private.data.to_vec(),
            }
        }
        _ if frame.is_text() => DecodedFrame::Text(TextFrame::parse(content)?.values()),
        _ if frame.is_url() => DecodedFrame::Url(UrlFrame::parse(content).url()),
        _ => DecodedFrame::Other(content.to_vec()),
    };
    Ok(decoded)
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_text_values() {
        let frame = TextFrame::parse(b"\x03Rock\0Pop\0").unwrap();
        assert_eq!(frame.values(), vec!["Rock", "Pop"]);

        let utf16 = [0x01, 0xFF, 0xFE, b'h', 0, b'i', 0, 0, 0];
        assert_eq!(TextFrame::parse(&utf16).unwrap().values(), vec!["hi"]);
        assert_eq!(TextFrame::parse(b"\x09x"), Err(Id3Error::UnknownEncoding(9)));
    }

    #[test]
    fn test_comment() {
        let content = b"\x00engshort\0the comment\0";
        let comment = CommentFrame::parse(content).unwrap();
        assert_eq!(&comment.language, b"eng");
        assert_eq!(comment.description(), "short");
        assert_eq!(comment.text(), "the comment");

        assert_eq!(CommentFrame::parse(b"\x00en"), Err(Id3Error::MissingTerminator));
        assert_eq!(
            CommentFrame::parse(b"\x00engno terminator"),
            Err(Id3Error::MissingTerminator)
        );
    }

    #[test]
    fn test_comment_utf16() {
        let mut content = vec![0x02];
        content.extend_from_slice(b"deu");
        content.extend_from_slice(&[0, b'd', 0, 0]);
        content.extend_from_slice(&[0, 0xFC, 0, b'x']);
        let comment = CommentFrame::parse(&content).unwrap();
        assert_eq!(comment.description(), "d");
        assert_eq!(comment.text(), "üx");
    }

    #[test]
    fn test_user_frames() {
        let text = UserTextFrame::parse(b"\x03REPLAYGAIN\0-6.5 dB").unwrap();
        assert_eq!(text.description(), "REPLAYGAIN");
        assert_eq!(text.value(), "-6.5 dB");

        let mut content = vec![0x01, 0xFE, 0xFF, 0, b'h', 0, 0];
        content.extend_from_slice(b"http://example.com");
        let url = UserUrlFrame::parse(&content).unwrap();
        assert_eq!(url.description(), "h");
        assert_eq!(url.url(), "http://example.com");
    }

    #[test]
    fn test_private_and_url() {
        let private = PrivateFrame::parse(b"com.apple.streaming\0\x00\x01\x02").unwrap();
        assert_eq!(private.owner(), "com.apple.streaming");
        assert_eq!(private.data, &[0, 1, 2]);

        assert_eq!(UrlFrame::parse(b"http://a\0junk").url(), "http://a");
    }
}
