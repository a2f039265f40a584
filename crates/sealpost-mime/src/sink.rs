//! Destination for encoded message lines.

use crate::error::Result;
use std::future::Future;

/// Receives the encoded message one line at a time.
///
/// Lines are passed without their terminator; the sink appends CRLF. An SMTP
/// sink is also responsible for transparency (dot-stuffing).
pub trait MessageSink: Send {
    /// Writes one line followed by CRLF.
    fn write_line(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;
}

impl MessageSink for Vec<u8> {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.extend_from_slice(line.as_bytes());
        self.extend_from_slice(b"\r\n");
        Ok(())
    }
}

/// Splits text into lines on CRLF, LF or a lone CR.
pub(crate) fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find(['\r', '\n']) {
            Some(pos) => {
                let skip = if current[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&current[pos + skip..]);
                Some(&current[..pos])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}
