//! Mail message value model.

use crate::attachment::{Attachment, Placement};
use crate::charset::Charset;
use crate::content_type::escape_quoted;
use crate::encoding::encode_word;
use crate::error::{Error, Result};
use std::fmt;

/// Content-Transfer-Encoding of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// An address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mailbox {
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub address: String,
}

impl Mailbox {
    /// Creates a mailbox without a display name.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl From<&str> for Mailbox {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Mailbox {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) if name.is_ascii() => {
                write!(f, "\"{}\" <{}>", escape_quoted(name), self.address)
            }
            Some(name) => write!(
                f,
                "{} <{}>",
                encode_word(name.as_bytes(), "utf-8"),
                self.address
            ),
            None => f.write_str(&self.address),
        }
    }
}

/// An outgoing mail message.
///
/// Recipients are delivered in `to`, `cc`, `bcc` order. Attachments keep the
/// order they were added in.
#[derive(Debug, Clone, Default)]
pub struct MailMessage {
    /// Sender.
    pub from: Option<Mailbox>,
    /// Primary recipients.
    pub to: Vec<Mailbox>,
    /// Carbon-copy recipients.
    pub cc: Vec<Mailbox>,
    /// Blind carbon-copy recipients.
    pub bcc: Vec<Mailbox>,
    /// Reply-To addresses.
    pub reply_to: Vec<Mailbox>,
    /// Subject line.
    pub subject: String,
    /// Charset the subject is encoded in.
    pub subject_charset: Charset,
    /// Body text.
    pub body: String,
    /// Whether `body` is HTML.
    pub is_html: bool,
    /// Charset the body is encoded in.
    pub body_charset: Charset,
    /// Attachments.
    pub attachments: Vec<Attachment>,
}

impl MailMessage {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.from = Some(mailbox.into());
        self
    }

    /// Adds a `To` recipient.
    #[must_use]
    pub fn to(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.to.push(mailbox.into());
        self
    }

    /// Adds a `Cc` recipient.
    #[must_use]
    pub fn cc(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.cc.push(mailbox.into());
        self
    }

    /// Adds a `Bcc` recipient.
    #[must_use]
    pub fn bcc(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.bcc.push(mailbox.into());
        self
    }

    /// Adds a `Reply-To` address.
    #[must_use]
    pub fn reply_to(mut self, mailbox: impl Into<Mailbox>) -> Self {
        self.reply_to.push(mailbox.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the subject charset.
    #[must_use]
    pub const fn subject_charset(mut self, charset: Charset) -> Self {
        self.subject_charset = charset;
        self
    }

    /// Sets a plain-text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self.is_html = false;
        self
    }

    /// Sets an HTML body.
    #[must_use]
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self.is_html = true;
        self
    }

    /// Sets the body charset.
    #[must_use]
    pub const fn body_charset(mut self, charset: Charset) -> Self {
        self.body_charset = charset;
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Every envelope recipient in delivery order.
    pub fn recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    /// Number of attachments with the given placement.
    #[must_use]
    pub fn attachment_count(&self, placement: Placement) -> usize {
        self.attachments
            .iter()
            .filter(|a| a.placement == placement)
            .count()
    }

    /// Checks that the message can be sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSender`] when there is no sender address,
    /// [`Error::MissingRecipient`] when there is no `To` recipient, and
    /// [`Error::InvalidHeader`] when the subject or a mailbox would break
    /// its header line.
    pub fn validate(&self) -> Result<()> {
        if self
            .from
            .as_ref()
            .is_none_or(|from| from.address.trim().is_empty())
        {
            return Err(Error::MissingSender);
        }
        if self.to.is_empty() {
            return Err(Error::MissingRecipient);
        }

        if has_line_break(&self.subject) {
            return Err(Error::InvalidHeader("Subject"));
        }
        let fields = [
            ("From", self.from.as_slice()),
            ("To", self.to.as_slice()),
            ("Cc", self.cc.as_slice()),
            ("Bcc", self.bcc.as_slice()),
            ("Reply-To", self.reply_to.as_slice()),
        ];
        for (field, mailboxes) in fields {
            if mailboxes.iter().any(|m| {
                has_line_break(&m.address) || m.name.as_deref().is_some_and(has_line_break)
            }) {
                return Err(Error::InvalidHeader(field));
            }
        }
        Ok(())
    }
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}
