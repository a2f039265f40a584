//! Session configuration types.

use crate::error::{Error, Result};
use std::fmt;
use std::time::Duration;

/// Default I/O and connect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(200);

/// Default name sent with HELO/EHLO.
pub const DEFAULT_CLIENT_NAME: &str = "localhost";

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Security {
    /// No encryption (port 25). **Not recommended for production.**
    None,
    /// TLS from the first byte (port 465).
    Implicit,
    /// Start with plaintext, upgrade with STARTTLS (port 587).
    StartTls,
    /// Upgrade with STARTTLS; fails if the server does not offer it.
    #[default]
    Auto,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::Implicit => 465,
            Self::StartTls | Self::Auto => 587,
        }
    }

    /// Returns true if the session upgrades with STARTTLS.
    #[must_use]
    pub const fn wants_starttls(self) -> bool {
        matches!(self, Self::StartTls | Self::Auto)
    }
}

/// How credentials are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthMode {
    /// No authentication.
    #[default]
    None,
    /// `AUTH LOGIN` with base64 username and password lines.
    Base64,
    /// `AUTH LOGIN PLAIN` with raw username and password lines.
    PlainText,
}

/// Username and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SMTP session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Authentication mode.
    pub auth: AuthMode,
    /// Credentials for `auth`.
    pub credentials: Option<Credentials>,
    /// Connect and per-I/O timeout.
    pub timeout: Duration,
    /// Name sent with HELO/EHLO.
    pub client_name: String,
    /// `X-Mailer` header value.
    pub mailer: String,
}

impl SessionConfig {
    /// Creates a configuration with [`Security::Auto`] on port 587 and no
    /// authentication.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// Checks the configuration before any network activity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty host, port 0, missing
    /// credentials when authentication is requested, or control characters
    /// in anything sent as a command line.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("There is no host address for the mail server".into()));
        }
        if self.port == 0 {
            return Err(Error::Config("Port must not be 0".into()));
        }
        if self.client_name.trim().is_empty() || has_control(&self.client_name) {
            return Err(Error::Config(
                "The client name must be a single non-empty line".into(),
            ));
        }
        if has_control(&self.mailer) {
            return Err(Error::Config("The mailer name must be a single line".into()));
        }
        if self.auth != AuthMode::None {
            let Some(credentials) = &self.credentials else {
                return Err(Error::Config(
                    "Credentials are required when authentication is enabled".into(),
                ));
            };
            if credentials.username.trim().is_empty() {
                return Err(Error::Config(
                    "A user name is required when authentication is enabled".into(),
                ));
            }
            if credentials.password.trim().is_empty() {
                return Err(Error::Config(
                    "A password is required when authentication is enabled".into(),
                ));
            }
            if has_control(&credentials.username) || has_control(&credentials.password) {
                return Err(Error::Config(
                    "Credentials must not contain control characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Returns true if a handshake with `security` uses EHLO rather than
    /// HELO.
    #[must_use]
    pub fn uses_ehlo(&self, security: Security) -> bool {
        self.auth != AuthMode::None || security.wants_starttls()
    }
}

fn has_control(value: &str) -> bool {
    value.contains(char::is_control)
}

/// Builder for session configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    auth: AuthMode,
    credentials: Option<Credentials>,
    timeout: Duration,
    client_name: String,
    mailer: String,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            auth: AuthMode::None,
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            mailer: sealpost_mime::DEFAULT_MAILER.to_string(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Enables authentication with the given mode and credentials.
    #[must_use]
    pub fn auth(mut self, mode: AuthMode, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = mode;
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Sets the authentication mode without touching credentials.
    #[must_use]
    pub const fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth = mode;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the HELO/EHLO name.
    #[must_use]
    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Sets the `X-Mailer` value.
    #[must_use]
    pub fn mailer(mut self, mailer: impl Into<String>) -> Self {
        self.mailer = mailer.into();
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        SessionConfig {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            auth: self.auth,
            credentials: self.credentials,
            timeout: self.timeout,
            client_name: self.client_name,
            mailer: self.mailer,
        }
    }
}
