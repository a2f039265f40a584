//! MIME body encoder.
//!
//! Turns a [`MailMessage`] into the line stream sent after `DATA`: the header
//! block, the multipart structure, the transfer-encoded body and the
//! attachment parts.

use crate::attachment::{Placement, write_attachments};
use crate::charset::Charset;
use crate::content_type::ContentType;
use crate::encoding::{encode_base64_lines, encode_quoted_printable};
use crate::error::Result;
use crate::header::Headers;
use crate::message::{MailMessage, TransferEncoding};
use crate::sink::{MessageSink, split_lines};
use chrono::{DateTime, Utc};

/// Boundary of the outer `multipart/mixed` level.
pub const MIXED_BOUNDARY: &str = "=_sealpost_mixed";
/// Boundary of the `multipart/related` level.
pub const RELATED_BOUNDARY: &str = "=_sealpost_related";
/// Boundary of the `multipart/alternative` level.
pub const ALTERNATIVE_BOUNDARY: &str = "=_sealpost_alternative";

/// Default `X-Mailer` value.
pub const DEFAULT_MAILER: &str = concat!("sealpost/", env!("CARGO_PKG_VERSION"));

const PREAMBLE: &str = "This is a multi-part message in MIME format.";
const FALLBACK_NOTICE: &str =
    "If you can see this, then your email client does not support MHTML messages.";

/// MIME layout chosen for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    /// The body alone.
    SinglePart,
    /// A text body followed by every attachment.
    Mixed,
    /// An HTML body inside `multipart/related`.
    Related {
        /// The HTML is wrapped in `multipart/alternative` with a plain-text
        /// notice, and inline attachments follow it.
        alternative: bool,
        /// The related part is wrapped in `multipart/mixed` for attachments.
        mixed: bool,
    },
}

impl Structure {
    /// Selects the layout from the body kind and attachment placements.
    ///
    /// Inline attachments only make sense next to an HTML body; with a text
    /// body they are sent as ordinary mixed parts.
    #[must_use]
    pub fn select(message: &MailMessage) -> Self {
        let inline = message.attachment_count(Placement::Inline) > 0;
        let attached = message.attachment_count(Placement::Attached) > 0;

        if message.is_html {
            Self::Related {
                alternative: inline,
                mixed: attached,
            }
        } else if inline || attached {
            Self::Mixed
        } else {
            Self::SinglePart
        }
    }
}

/// Writes messages as MIME line streams.
#[derive(Debug, Clone)]
pub struct MessageEncoder {
    mailer: String,
    date: Option<DateTime<Utc>>,
}

impl Default for MessageEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAILER)
    }
}

impl MessageEncoder {
    /// Creates an encoder stamping `X-Mailer` with `mailer`.
    #[must_use]
    pub fn new(mailer: impl Into<String>) -> Self {
        Self {
            mailer: mailer.into(),
            date: None,
        }
    }

    /// Fixes the `Date` header instead of using the current time.
    #[must_use]
    pub const fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Encodes the whole message into a byte buffer with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment cannot be read.
    pub async fn encode(&self, message: &MailMessage) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(message, &mut out).await?;
        Ok(out)
    }

    /// Writes headers, body and attachments to `sink`.
    ///
    /// The end-of-data marker is not written.
    ///
    /// # Errors
    ///
    /// Returns an error if an attachment cannot be read or the sink fails.
    pub async fn write_to<S: MessageSink>(&self, message: &MailMessage, sink: &mut S) -> Result<()> {
        let date = self.date.unwrap_or_else(Utc::now);
        for line in Headers::for_message(message, &self.mailer, date).lines() {
            sink.write_line(&line).await?;
        }

        let body = ContentType::new("text", if message.is_html { "html" } else { "plain" })
            .with_parameter("charset", message.body_charset.name());

        match Structure::select(message) {
            Structure::SinglePart => write_body(sink, message, &body).await,
            Structure::Mixed => {
                open_multipart(sink, "mixed", MIXED_BOUNDARY, true).await?;
                sink.write_line(&format!("--{MIXED_BOUNDARY}")).await?;
                write_body(sink, message, &body).await?;
                write_attachments(sink, &message.attachments, None, MIXED_BOUNDARY).await?;
                sink.write_line(&format!("--{MIXED_BOUNDARY}--")).await
            }
            Structure::Related { alternative, mixed } => {
                if mixed {
                    open_multipart(sink, "mixed", MIXED_BOUNDARY, true).await?;
                    sink.write_line(&format!("--{MIXED_BOUNDARY}")).await?;
                }
                open_multipart(sink, "related", RELATED_BOUNDARY, !mixed).await?;
                sink.write_line(&format!("--{RELATED_BOUNDARY}")).await?;

                if alternative {
                    open_multipart(sink, "alternative", ALTERNATIVE_BOUNDARY, false).await?;
                    sink.write_line(&format!("--{ALTERNATIVE_BOUNDARY}")).await?;
                    write_body(sink, message, &body).await?;
                    sink.write_line(&format!("--{ALTERNATIVE_BOUNDARY}")).await?;
                    write_fallback_notice(sink).await?;
                    sink.write_line(&format!("--{ALTERNATIVE_BOUNDARY}--")).await?;
                    sink.write_line("").await?;
                    write_attachments(
                        sink,
                        &message.attachments,
                        Some(Placement::Inline),
                        RELATED_BOUNDARY,
                    )
                    .await?;
                } else {
                    write_body(sink, message, &body).await?;
                }
                sink.write_line(&format!("--{RELATED_BOUNDARY}--")).await?;

                if mixed {
                    sink.write_line("").await?;
                    write_attachments(
                        sink,
                        &message.attachments,
                        Some(Placement::Attached),
                        MIXED_BOUNDARY,
                    )
                    .await?;
                    sink.write_line(&format!("--{MIXED_BOUNDARY}--")).await?;
                }
                Ok(())
            }
        }
    }
}

async fn open_multipart<S: MessageSink>(
    sink: &mut S,
    sub_type: &str,
    boundary: &str,
    preamble: bool,
) -> Result<()> {
    let content_type = ContentType::multipart(sub_type, boundary);
    sink.write_line(&format!("Content-Type: {content_type}")).await?;
    sink.write_line("").await?;
    if preamble {
        sink.write_line(PREAMBLE).await?;
        sink.write_line("").await?;
    }
    Ok(())
}

async fn write_body<S: MessageSink>(
    sink: &mut S,
    message: &MailMessage,
    content_type: &ContentType,
) -> Result<()> {
    let charset = message.body_charset;
    let encoding = charset.transfer_encoding();
    sink.write_line(&format!("Content-Type: {content_type}")).await?;
    sink.write_line(&format!("Content-Transfer-Encoding: {encoding}"))
        .await?;
    sink.write_line("").await?;

    for line in encode_body(&message.body, charset) {
        sink.write_line(&line).await?;
    }
    Ok(())
}

async fn write_fallback_notice<S: MessageSink>(sink: &mut S) -> Result<()> {
    let content_type = ContentType::text_plain(Charset::Ascii);
    sink.write_line(&format!("Content-Type: {content_type}")).await?;
    sink.write_line(&format!(
        "Content-Transfer-Encoding: {}",
        TransferEncoding::SevenBit
    ))
    .await?;
    sink.write_line("").await?;
    sink.write_line(FALLBACK_NOTICE).await
}

/// Transfer-encodes a body into wire lines (without terminators).
///
/// ASCII bodies are quoted-printable, anything else is base64 of the
/// charset-encoded bytes wrapped at 76 columns.
#[must_use]
pub fn encode_body(body: &str, charset: Charset) -> Vec<String> {
    let bytes = charset.encode(body);
    match charset.transfer_encoding() {
        TransferEncoding::QuotedPrintable => split_lines(&encode_quoted_printable(&bytes))
            .map(str::to_string)
            .collect(),
        TransferEncoding::Base64 | TransferEncoding::SevenBit => encode_base64_lines(&bytes),
    }
}
