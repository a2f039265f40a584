//! SMTP session controller.
//!
//! A [`Session`] owns one configuration and runs one operation at a time.
//! Every operation opens a fresh connection, walks greeting, HELO/EHLO,
//! optional STARTTLS and optional authentication, and always ends with a
//! best-effort `QUIT` and close, whether it succeeded or not.
//!
//! ```text
//! Disconnected ─ connect ─→ Connected ─ 220 ─→ Greeted ─ HELO/EHLO ─→ Helloed
//!                                                                       │
//!              ┌──────────── STARTTLS + EHLO (StartTls, Auto) ──────────┤
//!              ↓                                                        ↓
//!         TlsUpgraded ───────────── AUTH (optional) ──────────────→ Ready
//!                                                                       │
//! Disconnected ←─ QUIT ←─ 250 ←─ . ←─ DATA ←─ RCPT TO* ←─ MAIL FROM ────┘
//! ```

mod notify;
mod sink;

pub use notify::{Completion, CompletionObserver};
pub use sink::DataSink;

use crate::auth::authenticate;
use crate::command::Command;
use crate::config::{Security, SessionConfig};
use crate::connection::{Connector, TcpConnector, Transport};
use crate::error::{Error, Result};
use crate::interpreter::{Outcome, Step, interpret};
use crate::types::{Address, Capabilities, Reply, ReplyCode};
use notify::CancelGuard;
use sealpost_mime::{MailMessage, MessageEncoder};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Connection state for the operation in progress.
struct State<T> {
    transport: Option<T>,
    capabilities: Capabilities,
    last_reply: Option<Reply>,
}

impl<T: Transport> State<T> {
    fn new() -> Self {
        Self {
            transport: None,
            capabilities: Capabilities::default(),
            last_reply: None,
        }
    }

    fn transport(&mut self) -> Result<&mut T> {
        self.transport
            .as_mut()
            .ok_or_else(|| Error::Protocol("Connection is closed".into()))
    }

    async fn send(&mut self, command: &Command) -> Result<()> {
        debug!(command = %command.log_line(), "sending");
        self.transport()?.send_command(&command.to_string()).await
    }

    async fn reply(&mut self) -> Result<Reply> {
        let reply = self.transport()?.get_reply().await?;
        debug!(code = %reply.code, "reply");
        self.last_reply = Some(reply.clone());
        Ok(reply)
    }

    /// Reads a reply and checks it against `step`.
    async fn expect(&mut self, step: Step) -> Result<Reply> {
        let reply = self.reply().await?;
        match interpret(step, &reply) {
            Outcome::Success => Ok(reply),
            Outcome::SoftFailure(diagnostic) | Outcome::HardFailure(diagnostic) => {
                warn!(%step, code = %reply.code, %diagnostic, "step rejected");
                Err(Error::Rejected {
                    step,
                    code: reply.code,
                    diagnostic,
                    reply: reply.message_text(),
                })
            }
        }
    }

    async fn execute(&mut self, command: &Command, step: Step) -> Result<Reply> {
        self.send(command).await?;
        self.expect(step).await
    }

    /// Sends `EHLO` and replaces the capabilities with what it advertises.
    async fn extended_hello(&mut self, hostname: &str) -> Result<()> {
        let reply = self
            .execute(
                &Command::Ehlo {
                    hostname: hostname.to_string(),
                },
                Step::ExtendedHello,
            )
            .await?;
        self.capabilities = Capabilities::from_ehlo(reply.message.get(1..).unwrap_or_default());
        debug!(capabilities = ?self.capabilities, "negotiated");
        Ok(())
    }

    /// Sends `QUIT` if the connection is still usable, then closes it.
    ///
    /// Failures are logged and swallowed; the transport is always dropped.
    async fn teardown(&mut self) {
        let Some(mut transport) = self.transport.take() else {
            return;
        };

        if transport.is_connected() {
            debug!(command = %Command::Quit, "sending");
            let quit = async {
                transport.send_command(&Command::Quit.to_string()).await?;
                transport.get_reply().await
            };
            match quit.await {
                Ok(reply) if reply.code == ReplyCode::CLOSING => debug!(code = %reply.code, "reply"),
                Ok(reply) => debug!(code = %reply.code, "unexpected QUIT reply"),
                Err(e) => warn!(error = %e, "QUIT failed"),
            }
        }

        if let Err(e) = transport.close().await {
            debug!(error = %e, "close failed");
        }
    }
}

/// SMTP client session.
///
/// Cloning is cheap; clones share the same busy state, so at most one
/// operation runs across all of them.
pub struct Session<C: Connector = TcpConnector> {
    config: Arc<SessionConfig>,
    connector: Arc<C>,
    observer: Option<Arc<dyn CompletionObserver>>,
    state: Arc<Mutex<State<C::Transport>>>,
}

impl Session {
    /// Creates a session that connects over TCP.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self::with_connector(config, TcpConnector::new())
    }
}

impl<C: Connector> Session<C> {
    /// Creates a session that opens connections with `connector`.
    #[must_use]
    pub fn with_connector(config: SessionConfig, connector: C) -> Self {
        Self {
            config: Arc::new(config),
            connector: Arc::new(connector),
            observer: None,
            state: Arc::new(Mutex::new(State::new())),
        }
    }

    /// Registers an observer for operation outcomes.
    #[must_use]
    pub fn with_observer(mut self, observer: impl CompletionObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns true while an operation is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.try_lock().is_err()
    }

    /// Returns the capabilities negotiated by the last handshake.
    pub async fn capabilities(&self) -> Capabilities {
        self.state.lock().await.capabilities.clone()
    }

    /// Returns the last reply read by the last operation.
    pub async fn last_reply(&self) -> Option<Reply> {
        self.state.lock().await.last_reply.clone()
    }

    /// Connects, runs the handshake with the configured security, and quits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] before any network activity if the
    /// configuration is invalid, [`Error::Busy`] if another operation is
    /// running, and otherwise the error of the failing step.
    pub async fn test_connection(&self) -> Result<()> {
        self.config.validate()?;
        let mut state = self.lock()?;
        let guard = CancelGuard::new(self.observer.clone());

        let result = self.probe(&mut state, self.config.security).await;
        guard.disarm();

        if result.is_ok() {
            info!(host = %self.config.host, port = self.config.port, "connection test passed");
        }
        self.notify(&state, &result);
        result
    }

    /// Finds a secure mode the server supports on the configured port.
    ///
    /// STARTTLS is tried first, then implicit TLS. The configured security
    /// mode is not changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSecureMode`] if neither probe succeeds, and the
    /// same configuration and busy errors as [`Session::test_connection`].
    pub async fn detect_security(&self) -> Result<Security> {
        self.config.validate()?;
        let mut state = self.lock()?;
        let guard = CancelGuard::new(self.observer.clone());

        let result = match self.probe(&mut state, Security::Auto).await {
            Ok(()) => Ok(Security::StartTls),
            Err(e) => {
                debug!(error = %e, "STARTTLS probe failed");
                match self.probe(&mut state, Security::Implicit).await {
                    Ok(()) => Ok(Security::Implicit),
                    Err(e) => {
                        debug!(error = %e, "implicit TLS probe failed");
                        Err(Error::NoSecureMode)
                    }
                }
            }
        };
        guard.disarm();

        if let Ok(security) = &result {
            info!(host = %self.config.host, ?security, "detected secure mode");
        }
        self.notify(&state, &result);
        result
    }

    /// Sends `message`.
    ///
    /// The sender and every recipient are checked before connecting.
    /// Recipients are sent in To, Cc, Bcc order; any refused recipient aborts
    /// the transaction before `DATA`.
    ///
    /// # Errors
    ///
    /// Returns a configuration, address or message error before any network
    /// activity, [`Error::Busy`] if another operation is running, and
    /// otherwise the error of the failing step.
    pub async fn send_mail(&self, message: &MailMessage) -> Result<()> {
        self.config.validate()?;
        message.validate()?;
        let sender = match &message.from {
            Some(from) => Address::try_from(from)?,
            None => return Err(sealpost_mime::Error::MissingSender.into()),
        };
        let recipients = message
            .recipients()
            .map(Address::try_from)
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.lock()?;
        let guard = CancelGuard::new(self.observer.clone());

        let result = self.transaction(&mut state, message, sender, recipients).await;
        state.teardown().await;
        guard.disarm();

        if result.is_ok() {
            info!(host = %self.config.host, recipients = message.recipients().count(), "message sent");
        }
        self.notify(&state, &result);
        result
    }

    /// Runs [`Session::send_mail`] on a tokio worker.
    pub fn spawn_send(&self, message: MailMessage) -> JoinHandle<Result<()>> {
        let session = self.clone();
        tokio::spawn(async move { session.send_mail(&message).await })
    }

    fn lock(&self) -> Result<MutexGuard<'_, State<C::Transport>>> {
        self.state.try_lock().map_err(|_| Error::Busy)
    }

    /// Handshake followed by teardown.
    async fn probe(&self, state: &mut State<C::Transport>, security: Security) -> Result<()> {
        let result = self.handshake(state, security).await;
        state.teardown().await;
        result
    }

    async fn handshake(&self, state: &mut State<C::Transport>, security: Security) -> Result<()> {
        let config = &self.config;
        state.transport = None;
        state.capabilities = Capabilities::default();
        state.last_reply = None;

        debug!(host = %config.host, port = config.port, ?security, "connecting");
        let transport = self
            .connector
            .connect(&config.host, config.port, security, config.timeout)
            .await?;
        state.transport = Some(transport);

        state.expect(Step::Greeting).await?;

        if config.uses_ehlo(security) {
            state.extended_hello(&config.client_name).await?;
        } else {
            state
                .execute(
                    &Command::Helo {
                        hostname: config.client_name.clone(),
                    },
                    Step::Hello,
                )
                .await?;
        }

        if security.wants_starttls() {
            if !state.capabilities.starttls {
                warn!(host = %config.host, "STARTTLS not advertised");
                return Err(Error::TlsNotAdvertised);
            }
            state.execute(&Command::StartTls, Step::StartTls).await?;
            state.transport()?.switch_to_tls().await?;
            state.capabilities = Capabilities::default();
            state.extended_hello(&config.client_name).await?;
        }

        if let Some(credentials) = &config.credentials {
            let transport = state.transport()?;
            if let Some(outcome) = authenticate(transport, config.auth, credentials).await? {
                state.last_reply = Some(outcome.reply.clone());
                if let (Some(failure), Some(diagnostic)) =
                    (outcome.failure(), outcome.diagnostic())
                {
                    warn!(
                        step = %outcome.step,
                        code = %outcome.reply.code,
                        %failure,
                        "authentication failed"
                    );
                    return Err(Error::Auth {
                        step: outcome.step,
                        failure,
                        diagnostic,
                        code: outcome.reply.code,
                        reply: outcome.reply.message_text(),
                    });
                }
                debug!("authenticated");
            }
        }

        info!(host = %config.host, ?security, "handshake complete");
        Ok(())
    }

    async fn transaction(
        &self,
        state: &mut State<C::Transport>,
        message: &MailMessage,
        sender: Address,
        recipients: Vec<Address>,
    ) -> Result<()> {
        self.handshake(state, self.config.security).await?;

        state
            .execute(&Command::MailFrom { from: sender }, Step::MailFrom)
            .await?;
        for to in recipients {
            state.execute(&Command::RcptTo { to }, Step::RcptTo).await?;
        }
        state.execute(&Command::Data, Step::Data).await?;

        let encoder = MessageEncoder::new(self.config.mailer.clone());
        let mut sink = DataSink::new(state.transport()?);
        encoder
            .write_to(message, &mut sink)
            .await
            .map_err(Error::from_mime)?;
        sink.finish().await?;

        state.execute(&Command::EndOfData, Step::Message).await?;
        Ok(())
    }

    fn notify<V>(&self, state: &State<C::Transport>, result: &Result<V>) {
        if let Some(observer) = &self.observer {
            observer.completed(&Completion {
                cancelled: false,
                error: result.as_ref().err(),
                last_reply: state.last_reply.as_ref(),
            });
        }
    }
}

impl<C: Connector> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            connector: Arc::clone(&self.connector),
            observer: self.observer.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<C: Connector> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}
