//! Extension negotiation from EHLO replies.

use std::fmt;

/// SASL authentication mechanism advertised by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthMechanism {
    /// LOGIN - legacy base64 username/password
    Login,
    /// PLAIN - plaintext authentication
    Plain,
    /// NTLM - Windows challenge-response
    Ntlm,
    /// GSSAPI - Kerberos
    Gssapi,
    /// `WDIGEST` - Windows digest
    WDigest,
    /// CRAM-MD5 - challenge-response
    CramMd5,
    /// `XOAUTH2` - `OAuth2` (Google/Microsoft)
    XOAuth2,
}

impl AuthMechanism {
    /// Parses an authentication mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "LOGIN" => Some(Self::Login),
            "PLAIN" => Some(Self::Plain),
            "NTLM" => Some(Self::Ntlm),
            "GSSAPI" => Some(Self::Gssapi),
            "WDIGEST" => Some(Self::WDigest),
            "CRAM-MD5" => Some(Self::CramMd5),
            "XOAUTH2" => Some(Self::XOAuth2),
            _ => None,
        }
    }

    /// Returns the mechanism name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "LOGIN",
            Self::Plain => "PLAIN",
            Self::Ntlm => "NTLM",
            Self::Gssapi => "GSSAPI",
            Self::WDigest => "WDIGEST",
            Self::CramMd5 => "CRAM-MD5",
            Self::XOAuth2 => "XOAUTH2",
        }
    }
}

impl fmt::Display for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server capabilities of the current connection.
///
/// Rebuilt from scratch on every EHLO; a fresh connection starts empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// STARTTLS is advertised.
    pub starttls: bool,
    /// Delivery status notifications are advertised.
    pub dsn: bool,
    /// Internationalized addresses (SMTPUTF8) are advertised.
    pub smtp_utf8: bool,
    /// Advertised AUTH mechanisms in server order.
    pub auth: Vec<AuthMechanism>,
    /// Maximum message size from SIZE, if a limit was given.
    pub max_size: Option<usize>,
}

impl Capabilities {
    /// Builds capabilities from EHLO lines.
    ///
    /// The first line of an EHLO reply is the server greeting; pass only the
    /// lines after it. Lines may still carry their `250-`/`250 ` prefix.
    #[must_use]
    pub fn from_ehlo<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut capabilities = Self::default();
        for line in lines {
            capabilities.apply(line.as_ref());
        }
        capabilities
    }

    /// Returns true if `mechanism` was advertised.
    #[must_use]
    pub fn supports_auth(&self, mechanism: AuthMechanism) -> bool {
        self.auth.contains(&mechanism)
    }

    fn apply(&mut self, line: &str) {
        let mut tokens = strip_code(line)
            .split([' ', '='])
            .filter(|t| !t.is_empty());
        let Some(keyword) = tokens.next() else {
            return;
        };

        match keyword.to_uppercase().as_str() {
            "AUTH" => {
                for mechanism in tokens.filter_map(AuthMechanism::parse) {
                    if !self.auth.contains(&mechanism) {
                        self.auth.push(mechanism);
                    }
                }
            }
            "DSN" => self.dsn = true,
            "STARTTLS" => self.starttls = true,
            "SMTPUTF8" => self.smtp_utf8 = true,
            "SIZE" => {
                self.max_size = tokens.next().and_then(|s| s.parse().ok()).filter(|&n| n > 0);
            }
            _ => {}
        }
    }
}

fn strip_code(line: &str) -> &str {
    let bytes = line.as_bytes();
    if bytes.len() >= 4 && bytes[..3].iter().all(u8::is_ascii_digit) && matches!(bytes[3], b'-' | b' ')
    {
        &line[4..]
    } else {
        line
    }
}
