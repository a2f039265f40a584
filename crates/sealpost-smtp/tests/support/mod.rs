//! Scripted SMTP server for session tests.
//!
//! Each connection replays a fixed list of replies and records everything the
//! client sends, so tests can assert on the exact command sequence.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sealpost_smtp::connection::{Connector, Transport};
use sealpost_smtp::parser::parse_reply;
use sealpost_smtp::{Completion, Error, Reply, Result, Security};
use tokio::sync::Notify;

/// What the server does with the next connection attempt.
#[derive(Debug, Clone)]
pub enum Script {
    /// Refuse the connection.
    Refuse,
    /// Accept and answer with these replies in order.
    ///
    /// Multi-line replies are written with `\r\n` between lines.
    Replies(Vec<&'static str>),
}

#[derive(Debug, Default)]
struct ServerState {
    scripts: VecDeque<Script>,
    connects: Vec<Security>,
    sent: Vec<String>,
    data: Vec<u8>,
    tls_upgrades: usize,
    closes: usize,
}

/// Shared handle to the scripted server.
#[derive(Debug, Clone, Default)]
pub struct Server {
    state: Arc<Mutex<ServerState>>,
    gate: Option<Arc<Notify>>,
}

impl Server {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        let server = Self::default();
        server.state.lock().unwrap().scripts.extend(scripts);
        server
    }

    /// Makes every connect wait until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn push(&self, script: Script) {
        self.state.lock().unwrap().scripts.push_back(script);
    }

    pub fn connector(&self) -> ScriptedConnector {
        ScriptedConnector {
            server: self.clone(),
        }
    }

    /// Command lines sent by the client, across all connections.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Raw message data sent after DATA.
    pub fn data(&self) -> String {
        String::from_utf8(self.state.lock().unwrap().data.clone()).unwrap()
    }

    pub fn connects(&self) -> Vec<Security> {
        self.state.lock().unwrap().connects.clone()
    }

    pub fn tls_upgrades(&self) -> usize {
        self.state.lock().unwrap().tls_upgrades
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }
}

/// Connector handing out scripted transports.
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    server: Server,
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(
        &self,
        host: &str,
        port: u16,
        security: Security,
        _timeout: Duration,
    ) -> Result<ScriptedTransport> {
        if let Some(gate) = &self.server.gate {
            gate.notified().await;
        }

        let script = {
            let mut state = self.server.state.lock().unwrap();
            state.connects.push(security);
            state.scripts.pop_front().unwrap_or(Script::Refuse)
        };

        match script {
            Script::Refuse => Err(Error::Connect {
                host: host.to_string(),
                port,
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            }),
            Script::Replies(replies) => Ok(ScriptedTransport {
                server: self.server.clone(),
                replies: replies.into(),
                open: true,
            }),
        }
    }
}

/// One scripted connection.
#[derive(Debug)]
pub struct ScriptedTransport {
    server: Server,
    replies: VecDeque<&'static str>,
    open: bool,
}

impl ScriptedTransport {
    fn check_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::Protocol("Connection is closed".into()))
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send_command(&mut self, line: &str) -> Result<()> {
        self.check_open()?;
        self.server.state.lock().unwrap().sent.push(line.to_string());
        Ok(())
    }

    async fn send_data(&mut self, data: &[u8]) -> Result<()> {
        self.check_open()?;
        self.server.state.lock().unwrap().data.extend_from_slice(data);
        Ok(())
    }

    async fn get_reply(&mut self) -> Result<Reply> {
        self.check_open()?;
        let Some(text) = self.replies.pop_front() else {
            self.open = false;
            return Err(Error::Protocol("Connection closed by server".into()));
        };
        let lines: Vec<&str> = text.split("\r\n").collect();
        parse_reply(&lines)
    }

    async fn switch_to_tls(&mut self) -> Result<()> {
        self.check_open()?;
        self.server.state.lock().unwrap().tls_upgrades += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        self.server.state.lock().unwrap().closes += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open
    }
}

/// What an observer saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub cancelled: bool,
    pub error: Option<String>,
    pub last_code: Option<u16>,
}

/// Observer recording every completion.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
    pub fn observer(&self) -> impl Fn(&Completion<'_>) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |completion: &Completion<'_>| {
            seen.lock().unwrap().push(Seen {
                cancelled: completion.cancelled,
                error: completion.error.map(ToString::to_string),
                last_code: completion.last_reply.map(|r| r.code.as_u16()),
            });
        }
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
