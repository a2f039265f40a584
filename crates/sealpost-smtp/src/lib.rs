//! # sealpost-smtp
//!
//! SMTP submission client for sending one message per connection.
//!
//! ## Features
//!
//! - **Security modes**: plain, implicit TLS (port 465), STARTTLS (port 587),
//!   and probing for whichever one the server supports
//! - **Authentication**: `AUTH LOGIN` with base64 or raw credential lines
//! - **Reply interpretation**: per-step accepted codes with readable diagnostics
//! - **Streaming**: MIME messages from [`sealpost_mime`] are written straight
//!   into the `DATA` phase, dot-stuffed, without building the whole message
//! - **Pluggable transport**: the session runs over any [`connection::Connector`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use sealpost_smtp::{AuthMode, MailMessage, Security, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> sealpost_smtp::Result<()> {
//!     let config = SessionConfig::builder("smtp.example.com")
//!         .security(Security::StartTls)
//!         .auth(AuthMode::Base64, "user@example.com", "password")
//!         .build();
//!     let session = Session::new(config);
//!
//!     let message = MailMessage::new()
//!         .from("user@example.com")
//!         .to("recipient@example.com")
//!         .subject("Hello")
//!         .text_body("Hello, World!");
//!
//!     session.send_mail(&message).await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`auth`]: LOGIN authentication
//! - [`command`]: SMTP command builders
//! - [`connection`]: Transport and connector traits, TCP/TLS implementation
//! - [`interpreter`]: Reply interpretation per protocol step
//! - [`parser`]: Reply parser
//! - [`session`]: Session controller
//! - [`types`]: Core SMTP types (addresses, capabilities, replies)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod command;
mod config;
pub mod connection;
mod error;
pub mod interpreter;
pub mod parser;
pub mod session;
pub mod types;

pub use auth::{AuthFailure, AuthOutcome};
pub use config::{
    AuthMode, ConfigBuilder, Credentials, DEFAULT_CLIENT_NAME, DEFAULT_TIMEOUT, Security,
    SessionConfig,
};
pub use error::{Error, Result};
pub use interpreter::{Category, Diagnostic, Outcome, Step};
pub use session::{Completion, CompletionObserver, Session};
pub use types::{Address, AuthMechanism, Capabilities, Reply, ReplyClass, ReplyCode};

pub use sealpost_mime::{Attachment, Charset, MailMessage, Mailbox};
