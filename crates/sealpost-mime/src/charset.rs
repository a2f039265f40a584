//! Character sets for subjects and bodies.

use crate::message::TransferEncoding;
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::fmt;

/// Character set a subject or body is encoded in.
///
/// `Ascii` bodies travel as quoted-printable; every other charset is sent as
/// base64 of the charset-encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// 7-bit US-ASCII.
    Ascii,
    /// Any charset known to `encoding_rs`.
    Encoding(&'static Encoding),
}

impl Charset {
    /// UTF-8.
    pub const UTF_8: Self = Self::Encoding(encoding_rs::UTF_8);

    /// Looks up a charset by its WHATWG label (`"utf-8"`, `"iso-8859-1"`, ...).
    ///
    /// `"us-ascii"` and `"ascii"` map to [`Charset::Ascii`].
    #[must_use]
    pub fn for_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("us-ascii") || label.eq_ignore_ascii_case("ascii") {
            return Some(Self::Ascii);
        }
        Encoding::for_label(label.as_bytes()).map(Self::Encoding)
    }

    /// Returns true for plain ASCII.
    #[must_use]
    pub const fn is_ascii(self) -> bool {
        matches!(self, Self::Ascii)
    }

    /// Lowercase MIME name, as used in `charset=` parameters and encoded-words.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Ascii => "us-ascii".to_string(),
            Self::Encoding(encoding) => encoding.output_encoding().name().to_lowercase(),
        }
    }

    /// Encodes text into this charset.
    ///
    /// ASCII passes the UTF-8 bytes through untouched so that quoted-printable
    /// escapes any non-ASCII byte instead of losing it.
    #[must_use]
    pub fn encode(self, text: &str) -> Cow<'_, [u8]> {
        match self {
            Self::Ascii => Cow::Borrowed(text.as_bytes()),
            Self::Encoding(encoding) => encoding.encode(text).0,
        }
    }

    /// Transfer encoding used for a body in this charset.
    #[must_use]
    pub const fn transfer_encoding(self) -> TransferEncoding {
        match self {
            Self::Ascii => TransferEncoding::QuotedPrintable,
            Self::Encoding(_) => TransferEncoding::Base64,
        }
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
