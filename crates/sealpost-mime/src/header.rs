//! Top-level header block.

use crate::charset::Charset;
use crate::encoding::encode_word;
use crate::message::{Mailbox, MailMessage};
use chrono::{DateTime, Utc};
use std::fmt;

/// `Date` header layout, always in GMT.
pub const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Address lists fold after the `;` that would take a line past this width.
const FOLD_WIDTH: usize = 78;

/// Ordered collection of header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header field.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Gets the first value for a header (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets all values for a header.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns an iterator over all fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns each field rendered as `Name: value`.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|(name, value)| format!("{name}: {value}"))
    }

    /// Builds the header block of an outgoing message.
    ///
    /// Field order: `X-Mailer`, `Date`, `From`, `To`, `Cc`, `Bcc`, one
    /// `Reply-To` per address, `Subject`, `MIME-Version`. Address lists are
    /// joined with `;` and folded onto continuation lines.
    #[must_use]
    pub fn for_message(message: &MailMessage, mailer: &str, date: DateTime<Utc>) -> Self {
        let mut headers = Self::new();
        headers.add("X-Mailer", mailer);
        headers.add("Date", date.format(DATE_FORMAT).to_string());
        if let Some(from) = &message.from {
            headers.add("From", from.to_string());
        }
        headers.add("To", join("To", &message.to));
        if !message.cc.is_empty() {
            headers.add("Cc", join("Cc", &message.cc));
        }
        if !message.bcc.is_empty() {
            headers.add("Bcc", join("Bcc", &message.bcc));
        }
        for reply_to in &message.reply_to {
            headers.add("Reply-To", reply_to.to_string());
        }
        headers.add(
            "Subject",
            encode_subject(&message.subject, message.subject_charset),
        );
        headers.add("MIME-Version", "1.0");
        headers
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

/// Joins `mailboxes` with `;`, starting a folded line before any mailbox
/// that would overflow [`FOLD_WIDTH`].
fn join(name: &str, mailboxes: &[Mailbox]) -> String {
    let mut value = String::new();
    let mut width = name.len() + 2;
    for (i, mailbox) in mailboxes.iter().enumerate() {
        let mailbox = mailbox.to_string();
        if i > 0 {
            value.push(';');
            width += 1;
            if width + mailbox.len() > FOLD_WIDTH {
                value.push_str("\r\n ");
                width = 1;
            }
        }
        width += mailbox.len();
        value.push_str(&mailbox);
    }
    value
}

/// Encodes a subject for the `Subject` header.
///
/// ASCII subjects pass through unchanged; any other charset produces a single
/// base64 encoded-word with no line breaks.
#[must_use]
pub fn encode_subject(subject: &str, charset: Charset) -> String {
    if charset.is_ascii() {
        subject.to_string()
    } else {
        encode_word(&charset.encode(subject), &charset.name())
    }
}
