//! SMTP commands.

use crate::types::Address;
use std::fmt;

/// SMTP command.
///
/// `Display` renders the wire form without the trailing CRLF; the transport
/// appends it.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH LOGIN - Begin LOGIN authentication
    AuthLogin {
        /// Announce plaintext credentials (`AUTH LOGIN PLAIN`)
        plain: bool,
    },
    /// A credential line sent during authentication
    AuthResponse(String),
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// `.` - End of message data
    EndOfData,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Returns the line to write to logs, with credentials masked.
    #[must_use]
    pub fn log_line(&self) -> String {
        match self {
            Self::AuthResponse(_) => "<credentials>".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Helo { hostname } => write!(f, "HELO {hostname}"),
            Self::Ehlo { hostname } => write!(f, "EHLO {hostname}"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::AuthLogin { plain: false } => f.write_str("AUTH LOGIN"),
            Self::AuthLogin { plain: true } => f.write_str("AUTH LOGIN PLAIN"),
            Self::AuthResponse(line) => f.write_str(line),
            Self::MailFrom { from } => write!(f, "MAIL FROM:<{from}>"),
            Self::RcptTo { to } => write!(f, "RCPT TO:<{to}>"),
            Self::Data => f.write_str("DATA"),
            Self::EndOfData => f.write_str("."),
            Self::Quit => f.write_str("QUIT"),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({})", self.log_line())
    }
}
