//! Error types for SMTP operations.

use crate::auth::AuthFailure;
use crate::interpreter::{Diagnostic, Step};
use crate::types::ReplyCode;
use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Hostname cannot be used for TLS server name verification.
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    /// Opening the connection failed.
    #[error("Could not connect to {host}:{port}: {source}")]
    Connect {
        /// Server hostname.
        host: String,
        /// Server port.
        port: u16,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },

    /// A connect, read or write did not finish in time.
    #[error("Operation timed out")]
    Timeout,

    /// Protocol error (malformed or unexpected response).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration is incomplete or invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Another operation is running on this session.
    #[error("Session is busy, please try later")]
    Busy,

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// A step received a reply outside its accepted set.
    #[error("{step} rejected with {code}: {diagnostic}")]
    Rejected {
        /// Step that failed.
        step: Step,
        /// Reply code.
        code: ReplyCode,
        /// Explanation of the code for this step.
        diagnostic: Diagnostic,
        /// Server text.
        reply: String,
    },

    /// Authentication failed.
    #[error("Authentication failed at {step} ({failure}) with {code}: {diagnostic}")]
    Auth {
        /// Round that was refused.
        step: Step,
        /// Failure class.
        failure: AuthFailure,
        /// Explanation of the code for this round.
        diagnostic: Diagnostic,
        /// Final reply code.
        code: ReplyCode,
        /// Server text.
        reply: String,
    },

    /// STARTTLS was requested but the server does not offer it.
    #[error("Server does not advertise STARTTLS")]
    TlsNotAdvertised,

    /// Neither STARTTLS nor implicit TLS could be established.
    #[error("No secure connection mode is supported by the server")]
    NoSecureMode,

    /// Message encoding failed.
    #[error("Message error: {0}")]
    Mime(#[from] sealpost_mime::Error),
}

impl Error {
    /// Returns the reply code carried by this error, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ReplyCode> {
        match self {
            Self::Rejected { code, .. } | Self::Auth { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        match self.code() {
            Some(code) => code.is_permanent(),
            None => false,
        }
    }

    /// Returns true if this is a transient error (4xx or timeout).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self.code() {
            Some(code) => code.is_transient(),
            None => matches!(self, Self::Timeout),
        }
    }

    /// Returns true if the error was detected before any network activity.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::InvalidAddress(_)
                | Self::Mime(
                    sealpost_mime::Error::MissingSender
                        | sealpost_mime::Error::MissingRecipient
                        | sealpost_mime::Error::InvalidHeader(_)
                )
        )
    }

    /// Recovers a transport error that travelled through the message sink.
    pub(crate) fn from_mime(err: sealpost_mime::Error) -> Self {
        match err {
            sealpost_mime::Error::Sink(inner) => match inner.downcast::<Self>() {
                Ok(err) => *err,
                Err(inner) => Self::Mime(sealpost_mime::Error::Sink(inner)),
            },
            other => Self::Mime(other),
        }
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}
