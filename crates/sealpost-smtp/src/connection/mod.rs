//! Transport connections.
//!
//! The session talks to the server only through [`Transport`], and opens
//! connections only through [`Connector`]. [`TcpConnector`] is the production
//! implementation; any `AsyncRead + AsyncWrite` stream can be driven with
//! [`StreamTransport`].

mod stream;

pub use stream::{SmtpStream, StreamTransport, TcpConnector, TcpTransport};

use crate::config::Security;
use crate::error::Result;
use crate::types::Reply;
use std::future::Future;
use std::time::Duration;

/// An open SMTP connection.
pub trait Transport: Send {
    /// Sends one command line; CRLF is appended.
    fn send_command(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Sends raw bytes with no terminator.
    fn send_data(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Reads one complete, possibly multi-line, reply.
    fn get_reply(&mut self) -> impl Future<Output = Result<Reply>> + Send;

    /// Upgrades the open connection to TLS in place.
    fn switch_to_tls(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Closes the connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Returns true while the connection is usable.
    fn is_connected(&self) -> bool;
}

/// Opens transports.
pub trait Connector: Send + Sync + 'static {
    /// Transport produced by this connector.
    type Transport: Transport + 'static;

    /// Connects to `host:port`.
    ///
    /// With [`Security::Implicit`] TLS is established before returning; every
    /// other mode starts in clear text.
    fn connect(
        &self,
        host: &str,
        port: u16,
        security: Security,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;
}
