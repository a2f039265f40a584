//! Error types for MIME operations.

use std::io;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Message has no sender address.
    #[error("There is no sender for the message")]
    MissingSender,

    /// Message has no `To` recipient.
    #[error("Specify at least one recipient for the message")]
    MissingRecipient,

    /// A header value contains a line break.
    #[error("The {0} header must not contain line breaks")]
    InvalidHeader(&'static str),

    /// Attachment source could not be read.
    #[error("Attachment {name}: {source}")]
    Attachment {
        /// Attachment display name.
        name: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The sink receiving the encoded message failed.
    #[error("Message sink failed: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps a sink failure.
    pub fn sink(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Sink(Box::new(err))
    }
}
