//! # sealpost-mime
//!
//! Outgoing mail message model and MIME encoder.
//!
//! ## Features
//!
//! - **Message model**: sender, recipients, subject, body and attachments
//! - **Charsets**: any `encoding_rs` charset for subjects and bodies
//! - **Encoding**: Base64, Quoted-Printable with 76-column folding, RFC 2047 subjects
//! - **Structure**: single part, mixed, related and alternative layouts
//! - **Attachments**: streamed from files or memory as base64 parts
//!
//! ## Quick Start
//!
//! ```ignore
//! use sealpost_mime::{Attachment, Charset, MailMessage, MessageEncoder};
//!
//! let message = MailMessage::new()
//!     .from("sender@example.com")
//!     .to("recipient@example.com")
//!     .subject("Report")
//!     .text_body("See attached.")
//!     .body_charset(Charset::Ascii)
//!     .attach(Attachment::from_file("report.pdf"));
//!
//! message.validate()?;
//! let bytes = MessageEncoder::default().encode(&message).await?;
//! ```
//!
//! Any [`MessageSink`] can receive the encoded lines; the SMTP client uses one
//! that writes straight into the `DATA` stream.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod charset;
mod content_type;
mod encoder;
mod error;
mod header;
mod message;
mod sink;

pub mod encoding;

pub use attachment::{Attachment, AttachmentSource, Placement, write_attachments};
pub use charset::Charset;
pub use content_type::{ContentType, escape_quoted};
pub use encoder::{
    ALTERNATIVE_BOUNDARY, DEFAULT_MAILER, MIXED_BOUNDARY, MessageEncoder, RELATED_BOUNDARY,
    Structure, encode_body,
};
pub use error::{Error, Result};
pub use header::{DATE_FORMAT, Headers, encode_subject};
pub use message::{MailMessage, Mailbox, TransferEncoding};
pub use sink::MessageSink;
