//! Low-level SMTP stream handling.

use super::{Connector, Transport};
use crate::config::{DEFAULT_TIMEOUT, Security};
use crate::error::{Error, Result};
use crate::parser::read_reply;
use crate::types::Reply;
use rustls::pki_types::ServerName;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// SMTP stream (TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(TcpStream),
    /// TLS-encrypted connection.
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl SmtpStream {
    /// Returns true if the stream is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl AsyncRead for SmtpStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SmtpStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Line-oriented transport over any byte stream, with every read and write
/// bounded by a timeout.
///
/// TLS upgrade is not available; use [`TcpTransport`] for that.
#[derive(Debug)]
pub struct StreamTransport<S> {
    reader: BufReader<S>,
    timeout: Duration,
    open: bool,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps a stream with the default timeout.
    pub fn new(stream: S) -> Self {
        Self::with_timeout(stream, DEFAULT_TIMEOUT)
    }

    /// Wraps a stream with the given timeout.
    pub fn with_timeout(stream: S, timeout: Duration) -> Self {
        Self {
            reader: BufReader::new(stream),
            timeout,
            open: true,
        }
    }

    /// Returns the underlying stream, dropping unread buffered input.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }

    /// Returns a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        let result = timeout(self.timeout, async {
            stream.write_all(data).await?;
            stream.flush().await
        })
        .await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.open = false;
                Err(e.into())
            }
            Err(elapsed) => {
                self.open = false;
                Err(elapsed.into())
            }
        }
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_command(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 2);
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(b"\r\n");
        self.write(&data).await
    }

    async fn send_data(&mut self, data: &[u8]) -> Result<()> {
        self.write(data).await
    }

    async fn get_reply(&mut self) -> Result<Reply> {
        let result = timeout(self.timeout, read_reply(&mut self.reader)).await;
        match result {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                self.open = false;
                Err(e)
            }
            Err(elapsed) => {
                self.open = false;
                Err(elapsed.into())
            }
        }
    }

    async fn switch_to_tls(&mut self) -> Result<()> {
        Err(Error::Protocol(
            "TLS upgrade is not available on this transport".into(),
        ))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        timeout(self.timeout, self.reader.get_mut().shutdown()).await??;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open
    }
}

/// Transport over TCP with optional TLS.
pub struct TcpTransport {
    inner: Option<StreamTransport<SmtpStream>>,
    host: String,
    timeout: Duration,
    tls: TlsConnector,
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransport")
            .field("host", &self.host)
            .field("connected", &self.is_connected())
            .field("tls", &self.is_tls())
            .finish_non_exhaustive()
    }
}

impl TcpTransport {
    /// Returns true if the connection is encrypted.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.inner.as_ref().is_some_and(|t| t.get_ref().is_tls())
    }

    fn stream(&mut self) -> Result<&mut StreamTransport<SmtpStream>> {
        self.inner
            .as_mut()
            .ok_or_else(|| Error::Protocol("Connection is closed".into()))
    }
}

impl Transport for TcpTransport {
    async fn send_command(&mut self, line: &str) -> Result<()> {
        self.stream()?.send_command(line).await
    }

    async fn send_data(&mut self, data: &[u8]) -> Result<()> {
        self.stream()?.send_data(data).await
    }

    async fn get_reply(&mut self) -> Result<Reply> {
        self.stream()?.get_reply().await
    }

    async fn switch_to_tls(&mut self) -> Result<()> {
        let tcp = match self.inner.take().map(StreamTransport::into_inner) {
            Some(SmtpStream::Tcp(tcp)) => tcp,
            Some(tls @ SmtpStream::Tls(_)) => {
                self.inner = Some(StreamTransport::with_timeout(tls, self.timeout));
                return Err(Error::Protocol("Already using TLS".into()));
            }
            None => return Err(Error::Protocol("Connection is closed".into())),
        };

        let tls = handshake(&self.tls, &self.host, tcp, self.timeout).await?;
        self.inner = Some(StreamTransport::with_timeout(tls, self.timeout));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(mut stream) => stream.close().await,
            None => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.as_ref().is_some_and(Transport::is_connected)
    }
}

/// Opens [`TcpTransport`]s, verifying servers against the webpki roots unless
/// another TLS configuration is supplied.
#[derive(Clone)]
pub struct TcpConnector {
    tls: TlsConnector,
}

impl fmt::Debug for TcpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpConnector").finish_non_exhaustive()
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpConnector {
    /// Creates a connector trusting the webpki root certificates.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tls: create_tls_connector(),
        }
    }

    /// Creates a connector with a custom rustls client configuration.
    #[must_use]
    pub fn with_tls_config(config: Arc<ClientConfig>) -> Self {
        Self {
            tls: TlsConnector::from(config),
        }
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(
        &self,
        host: &str,
        port: u16,
        security: Security,
        io_timeout: Duration,
    ) -> Result<TcpTransport> {
        let tcp = timeout(io_timeout, TcpStream::connect((host, port)))
            .await?
            .map_err(|source| Error::Connect {
                host: host.to_string(),
                port,
                source,
            })?;
        tracing::debug!(host, port, ?security, "connected");

        let stream = if security == Security::Implicit {
            handshake(&self.tls, host, tcp, io_timeout).await?
        } else {
            SmtpStream::Tcp(tcp)
        };

        Ok(TcpTransport {
            inner: Some(StreamTransport::with_timeout(stream, io_timeout)),
            host: host.to_string(),
            timeout: io_timeout,
            tls: self.tls.clone(),
        })
    }
}

async fn handshake(
    connector: &TlsConnector,
    host: &str,
    tcp: TcpStream,
    io_timeout: Duration,
) -> Result<SmtpStream> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::InvalidHostname(host.to_string()))?;

    let tls = timeout(io_timeout, connector.connect(server_name, tcp))
        .await?
        .map_err(tls_error)?;
    tracing::debug!(host, "TLS established");
    Ok(SmtpStream::Tls(Box::new(tls)))
}

/// Recovers the rustls error that tokio-rustls wraps in `io::Error`.
fn tls_error(err: io::Error) -> Error {
    match err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
    {
        Some(tls) => Error::Tls(tls.clone()),
        None => Error::Io(err),
    }
}

/// Creates a TLS connector with the webpki root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_command_and_reply() {
        let mock = Builder::new()
            .write(b"EHLO localhost\r\n")
            .read(b"250-mx.example.com\r\n250 STARTTLS\r\n")
            .build();
        let mut transport = StreamTransport::new(mock);

        transport.send_command("EHLO localhost").await.unwrap();
        let reply = transport.get_reply().await.unwrap();
        assert_eq!(reply.message, vec!["mx.example.com", "STARTTLS"]);
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_send_data_is_raw() {
        let mock = Builder::new().write(b"Subject: x\r\n").build();
        let mut transport = StreamTransport::new(mock);
        transport.send_data(b"Subject: x\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_eof_marks_disconnected() {
        let mut transport = StreamTransport::new(Builder::new().build());
        assert!(transport.get_reply().await.is_err());
        assert!(!transport.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let mock = Builder::new().wait(Duration::from_secs(10)).build();
        let mut transport = StreamTransport::with_timeout(mock, Duration::from_secs(1));

        let err = transport.get_reply().await.unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_stream_transport_cannot_upgrade() {
        let mut transport = StreamTransport::new(Builder::new().build());
        assert!(matches!(
            transport.switch_to_tls().await,
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_handshake_error_keeps_tls_cause() {
        let err = io::Error::new(
            io::ErrorKind::InvalidData,
            rustls::Error::General("bad certificate".into()),
        );
        assert!(matches!(
            tls_error(err),
            Error::Tls(rustls::Error::General(ref m)) if m == "bad certificate"
        ));

        let err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(tls_error(err), Error::Io(_)));
    }

    #[test]
    fn test_tls_connector_builds() {
        let _connector = TcpConnector::new();
    }
}
