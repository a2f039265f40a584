//! SMTP response parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Maximum reply line length accepted before the server is considered broken.
const MAX_LINE_LENGTH: u64 = 64 * 1024;

/// Maximum number of lines in one multi-line reply.
const MAX_REPLY_LINES: usize = 1024;

/// Parses an SMTP reply from response lines.
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// # Errors
///
/// Returns an error if the reply is malformed.
pub fn parse_reply<S: AsRef<str>>(lines: &[S]) -> Result<Reply> {
    let Some(first) = lines.first().map(AsRef::as_ref) else {
        return Err(Error::Protocol("Empty reply".into()));
    };

    let code = first
        .get(0..3)
        .filter(|c| c.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(|| Error::Protocol(format!("Invalid reply code: {first}")))?;

    let mut message = Vec::with_capacity(lines.len());
    for line in lines.iter().map(AsRef::as_ref) {
        if !line.starts_with(&first[0..3]) {
            return Err(Error::Protocol(format!(
                "Reply code changed mid-reply: {line}"
            )));
        }
        if line.len() == 3 {
            message.push(String::new());
            continue;
        }
        // Skip code and separator (e.g., "250-" or "250 ")
        match line.get(4..) {
            Some(text) => message.push(text.to_string()),
            None => return Err(Error::Protocol(format!("Malformed reply line: {line}"))),
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

/// Checks if a line is the last line of a multi-line reply.
///
/// Multi-line replies use `-` separator for continuation and ` ` for the last
/// line. A bare code (`250`) also ends the reply.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.len() == 3 || (line.len() >= 4 && line.as_bytes()[3] == b' ')
}

/// Reads one complete (possibly multi-line) reply.
///
/// Blank lines between replies are skipped.
///
/// # Errors
///
/// Returns an error on I/O failure, if the peer closes the connection before
/// the reply is complete, or if the reply is malformed.
pub async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Reply> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = (&mut *reader)
            .take(MAX_LINE_LENGTH)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Err(Error::Protocol("Connection closed by server".into()));
        }
        if !buf.ends_with(b"\n") && n as u64 >= MAX_LINE_LENGTH {
            return Err(Error::Protocol("Reply line too long".into()));
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(line);
        lines.push(line.to_string());
        if is_last {
            break;
        }
        if lines.len() >= MAX_REPLY_LINES {
            return Err(Error::Protocol("Reply has too many lines".into()));
        }
    }

    parse_reply(&lines)
}
