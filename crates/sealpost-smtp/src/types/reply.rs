//! Server replies.

use std::fmt;

/// A complete server reply: one code and one or more text lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit code shared by every line.
    pub code: ReplyCode,
    /// Text of each line with the `NNN-`/`NNN ` prefix removed.
    pub message: Vec<String>,
}

impl Reply {
    /// Creates a reply.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Vec is not const-compatible
    pub fn new(code: ReplyCode, message: Vec<String>) -> Self {
        Self { code, message }
    }

    /// Returns the class of the reply code.
    #[must_use]
    pub const fn class(&self) -> ReplyClass {
        self.code.class()
    }

    /// Joins the text lines with `\n`.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            return write!(f, "{}", self.code);
        }
        write!(f, "{} {}", self.code, self.message.join(" / "))
    }
}

/// First digit of a reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyClass {
    /// 2xx: the command completed.
    Positive,
    /// 3xx: the server waits for more input.
    Intermediate,
    /// 4xx: failed now, may succeed later.
    Transient,
    /// 5xx: failed, do not repeat unchanged.
    Permanent,
    /// Anything outside 200..=599.
    Unknown,
}

/// Three-digit SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 greeting, or ready to start TLS.
    pub const SERVICE_READY: Self = Self(220);
    /// 221 closing the channel after QUIT.
    pub const CLOSING: Self = Self(221);
    /// 235 authentication succeeded.
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250 completed.
    pub const OK: Self = Self(250);
    /// 251 recipient not local, will forward.
    pub const FORWARD: Self = Self(251);
    /// 334 send the next credential line.
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 send the message, end with `.`.
    pub const START_DATA: Self = Self(354);
    /// 421 service shutting down.
    pub const SERVICE_UNAVAILABLE: Self = Self(421);
    /// 450 mailbox busy.
    pub const MAILBOX_BUSY: Self = Self(450);
    /// 454 TLS temporarily unavailable.
    pub const TLS_UNAVAILABLE: Self = Self(454);
    /// 500 command not recognised.
    pub const SYNTAX_ERROR: Self = Self(500);
    /// 521 host does not accept mail.
    pub const NO_MAIL_ACCEPTED: Self = Self(521);
    /// 535 credentials rejected.
    pub const AUTH_FAILED: Self = Self(535);
    /// 550 mailbox unavailable.
    pub const MAILBOX_UNAVAILABLE: Self = Self(550);

    /// Wraps a numeric code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the class given by the first digit.
    #[must_use]
    pub const fn class(self) -> ReplyClass {
        match self.0 {
            200..=299 => ReplyClass::Positive,
            300..=399 => ReplyClass::Intermediate,
            400..=499 => ReplyClass::Transient,
            500..=599 => ReplyClass::Permanent,
            _ => ReplyClass::Unknown,
        }
    }

    /// 2xx.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self.class(), ReplyClass::Positive)
    }

    /// 4xx.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self.class(), ReplyClass::Transient)
    }

    /// 5xx.
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self.class(), ReplyClass::Permanent)
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

impl From<u16> for ReplyCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_class() {
        assert_eq!(ReplyCode::AUTH_SUCCESS.class(), ReplyClass::Positive);
        assert_eq!(ReplyCode::START_DATA.class(), ReplyClass::Intermediate);
        assert_eq!(ReplyCode::TLS_UNAVAILABLE.class(), ReplyClass::Transient);
        assert_eq!(ReplyCode::NO_MAIL_ACCEPTED.class(), ReplyClass::Permanent);
        assert_eq!(ReplyCode::new(99).class(), ReplyClass::Unknown);
        assert_eq!(ReplyCode::new(600).class(), ReplyClass::Unknown);

        assert!(ReplyCode::FORWARD.is_success());
        assert!(ReplyCode::MAILBOX_BUSY.is_transient());
        assert!(!ReplyCode::OK.is_permanent());
    }

    #[test]
    fn test_display_pads() {
        assert_eq!(ReplyCode::SYNTAX_ERROR.to_string(), "500");
        assert_eq!(ReplyCode::new(7).to_string(), "007");
        assert_eq!(ReplyCode::from(251), ReplyCode::FORWARD);
    }

    #[test]
    fn test_message_text() {
        let reply = Reply::new(
            ReplyCode::SERVICE_READY,
            vec!["mail.example.com ESMTP".into(), "Ready".into()],
        );
        assert_eq!(reply.message_text(), "mail.example.com ESMTP\nReady");
        assert_eq!(reply.class(), ReplyClass::Positive);
        assert_eq!(reply.to_string(), "220 mail.example.com ESMTP / Ready");
        assert_eq!(Reply::new(ReplyCode::OK, vec![]).to_string(), "250");
    }
}
