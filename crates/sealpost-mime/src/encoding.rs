//! Transfer encodings: Base64, Quoted-Printable and RFC 2047 encoded-words.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Maximum encoded line length (RFC 2045 section 6.7).
pub const MAX_LINE_LENGTH: usize = 76;

/// Raw bytes per wrapped Base64 line (57 bytes encode to 76 characters).
pub const BASE64_LINE_BYTES: usize = MAX_LINE_LENGTH / 4 * 3;

/// Encodes data as Base64 without line breaks.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 split into lines of at most 76 characters.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> Vec<String> {
    data.chunks(BASE64_LINE_BYTES).map(encode_base64).collect()
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Builds an RFC 2047 encoded-word (`=?charset?B?...?=`) from bytes already
/// encoded in `charset`. The result never contains a line break.
#[must_use]
pub fn encode_word(data: &[u8], charset: &str) -> String {
    format!("=?{charset}?B?{}?=", encode_base64(data))
}

#[derive(Debug, Clone, Copy)]
enum Token {
    Literal(u8),
    Escaped(u8),
}

impl Token {
    const fn width(self) -> usize {
        match self {
            Self::Literal(_) => 1,
            Self::Escaped(_) => 3,
        }
    }

    const fn is_break_after(self) -> bool {
        matches!(self, Self::Literal(b' ' | b'\t') | Self::Escaped(_))
    }

    fn push_to(self, out: &mut String) {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        match self {
            Self::Literal(byte) => out.push(char::from(byte)),
            Self::Escaped(byte) => {
                out.push('=');
                out.push(char::from(HEX[usize::from(byte >> 4)]));
                out.push(char::from(HEX[usize::from(byte & 0x0F)]));
            }
        }
    }
}

const fn is_literal(byte: u8) -> bool {
    matches!(byte, 33..=60 | 62..=126 | b' ' | b'\t')
}

/// Encodes bytes using Quoted-Printable (RFC 2045).
///
/// Bytes outside `33..=60` and `62..=126` become `=XX`, except space, tab,
/// CR and LF which pass through. Lines longer than [`MAX_LINE_LENGTH`] are
/// folded with a trailing `=` soft break, cut after the last whitespace or
/// escape that still fits, otherwise at the last position that does not split
/// an escape.
#[must_use]
pub fn encode_quoted_printable(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + data.len() / 2);
    let mut line = Vec::new();

    for &byte in data {
        match byte {
            b'\r' | b'\n' => {
                fold_line(&line, &mut out);
                line.clear();
                out.push(char::from(byte));
            }
            b if is_literal(b) => line.push(Token::Literal(b)),
            b => line.push(Token::Escaped(b)),
        }
    }
    fold_line(&line, &mut out);

    out
}

fn line_width(tokens: &[Token]) -> usize {
    tokens.iter().map(|t| t.width()).sum()
}

fn fold_line(tokens: &[Token], out: &mut String) {
    let mut start = 0;
    while line_width(&tokens[start..]) > MAX_LINE_LENGTH {
        let cut = start + break_point(&tokens[start..]);
        for token in &tokens[start..cut] {
            token.push_to(out);
        }
        out.push_str("=\r\n");
        start = cut;
    }
    for token in &tokens[start..] {
        token.push_to(out);
    }
}

/// Number of leading tokens to keep on the current line, leaving room for the
/// soft-break `=`.
fn break_point(tokens: &[Token]) -> usize {
    let budget = MAX_LINE_LENGTH - 1;
    let mut width = 0;
    let mut fit = 0;
    let mut preferred = 0;

    for (i, token) in tokens.iter().enumerate() {
        if width + token.width() > budget {
            break;
        }
        width += token.width();
        fit = i + 1;

        let next_escaped = matches!(tokens.get(i + 1), Some(Token::Escaped(_)));
        if token.is_break_after() || next_escaped {
            preferred = fit;
        }
    }

    if preferred > 0 { preferred } else { fit }
}

const fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}

/// Decodes Quoted-Printable text (RFC 2045) back into bytes.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        // Soft line break
        if bytes.get(i + 1..i + 3) == Some(b"\r\n".as_slice()) {
            i += 3;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'\n') {
            i += 2;
            continue;
        }

        let byte = match bytes.get(i + 1..i + 3) {
            Some(&[hi, lo]) => hex_value(hi)
                .zip(hex_value(lo))
                .map(|(hi, lo)| (hi << 4) | lo)
                .ok_or_else(|| Error::InvalidEncoding(format!("Invalid hex at offset {i}")))?,
            _ => {
                return Err(Error::InvalidEncoding(
                    "Incomplete escape sequence".to_string(),
                ));
            }
        };
        result.push(byte);
        i += 3;
    }

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn physical_lines(encoded: &str) -> Vec<&str> {
        encoded.split(['\r', '\n']).collect()
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_lines_wrap_at_76() {
        let data = vec![0xAB_u8; 200];
        let lines = encode_base64_lines(&data);
        assert_eq!(lines.len(), 4);
        assert!(lines[..3].iter().all(|l| l.len() == MAX_LINE_LENGTH));
        assert_eq!(decode_base64(&lines.concat()).unwrap(), data);
    }

    #[test]
    fn test_quoted_printable_plain_ascii() {
        assert_eq!(encode_quoted_printable(b"Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_escapes() {
        assert_eq!(encode_quoted_printable(b"a=b"), "a=3Db");
        assert_eq!(encode_quoted_printable("Héllo".as_bytes()), "H=C3=A9llo");
        assert_eq!(encode_quoted_printable(b"\x00\x7f"), "=00=7F");
    }

    #[test]
    fn test_quoted_printable_keeps_whitespace_and_line_breaks() {
        assert_eq!(encode_quoted_printable(b"a b\tc\r\nd"), "a b\tc\r\nd");
    }

    #[test]
    fn test_fold_exactly_76_is_untouched() {
        let line = "x".repeat(76);
        assert_eq!(encode_quoted_printable(line.as_bytes()), line);
    }

    #[test]
    fn test_fold_77_hard_breaks() {
        let line = "x".repeat(77);
        let encoded = encode_quoted_printable(line.as_bytes());
        assert_eq!(encoded, format!("{}=\r\n{}", "x".repeat(75), "xx"));
    }

    #[test]
    fn test_fold_prefers_last_whitespace() {
        let text = format!("{} {}", "a".repeat(60), "b".repeat(30));
        let encoded = encode_quoted_printable(text.as_bytes());
        assert_eq!(encoded, format!("{} =\r\n{}", "a".repeat(60), "b".repeat(30)));
    }

    #[test]
    fn test_fold_leading_whitespace_is_a_break() {
        let text = format!(" {}", "c".repeat(90));
        let encoded = encode_quoted_printable(text.as_bytes());
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines[0], " =");
        assert_eq!(lines[1], format!("{}=", "c".repeat(75)));
        assert_eq!(lines[2], "c".repeat(15));
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text.as_bytes());
    }

    #[test]
    fn test_fold_never_splits_escape() {
        let text = "é".repeat(40);
        let encoded = encode_quoted_printable(text.as_bytes());
        for line in physical_lines(&encoded).into_iter().filter(|l| !l.is_empty()) {
            assert!(line.len() <= MAX_LINE_LENGTH);
            let content = line.strip_suffix('=').unwrap_or(line);
            assert_eq!(content.len() % 3, 0, "escape split in {line:?}");
        }
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text.as_bytes());
    }

    #[test]
    fn test_quoted_printable_decode() {
        assert_eq!(decode_quoted_printable("Hello, World!").unwrap(), b"Hello, World!");
        assert_eq!(decode_quoted_printable("H=C3=A9llo").unwrap(), "Héllo".as_bytes());
        assert_eq!(decode_quoted_printable("h=c3=a9").unwrap(), "hé".as_bytes());
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable("Hello=\r\nWorld").unwrap(), b"HelloWorld");
        assert_eq!(decode_quoted_printable("Hello=\nWorld").unwrap(), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_decode_errors() {
        assert!(decode_quoted_printable("abc=4").is_err());
        assert!(decode_quoted_printable("abc=ZZ").is_err());
    }

    #[test]
    fn test_encode_word() {
        let word = encode_word("Héllo".as_bytes(), "utf-8");
        assert_eq!(word, "=?utf-8?B?SMOpbGxv?=");
    }

    proptest! {
        #[test]
        fn prop_quoted_printable_round_trip(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let encoded = encode_quoted_printable(&data);
            prop_assert_eq!(decode_quoted_printable(&encoded).unwrap(), data);
        }

        #[test]
        fn prop_quoted_printable_line_bound(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let encoded = encode_quoted_printable(&data);
            for line in physical_lines(&encoded) {
                prop_assert!(line.len() <= MAX_LINE_LENGTH, "line too long: {:?}", line);
            }
        }

        #[test]
        fn prop_quoted_printable_is_ascii(data in proptest::collection::vec(any::<u8>(), 0..200)) {
            prop_assert!(encode_quoted_printable(&data).is_ascii());
        }
    }
}
