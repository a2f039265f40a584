//! LOGIN authentication.
//!
//! Two variants are supported: `AUTH LOGIN` followed by base64 username and
//! password lines, and `AUTH LOGIN PLAIN` followed by the raw lines. Each
//! round must be answered with 334 before the next line is sent, and the
//! exchange succeeds only if the reply to the password is 235.

use crate::command::Command;
use crate::config::{AuthMode, Credentials};
use crate::connection::Transport;
use crate::error::Result;
use crate::interpreter::{Diagnostic, Step, interpret};
use crate::types::{Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

/// Why an authentication attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuthFailure {
    /// The server does not support the requested LOGIN variant.
    MechanismNotSupported,
    /// The username or password is incorrect.
    CredentialsRejected,
    /// The server hit an error while authenticating.
    ServerError,
    /// Any other refusal.
    Failed,
}

impl AuthFailure {
    /// Classifies the reply `code` that ended the exchange at `step`.
    ///
    /// Syntax errors mean an unsupported mechanism only as the answer to the
    /// `AUTH LOGIN` announce.
    #[must_use]
    pub const fn classify(step: Step, code: ReplyCode) -> Self {
        match (step, code.as_u16()) {
            (Step::AuthLogin, 500 | 501 | 504) => Self::MechanismNotSupported,
            (_, 535) => Self::CredentialsRejected,
            (_, 400..=499) => Self::ServerError,
            _ => Self::Failed,
        }
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MechanismNotSupported => {
                "server does not support this authentication type, check the auth mode"
            }
            Self::CredentialsRejected => "the username or password is incorrect",
            Self::ServerError => "the server reported an error",
            Self::Failed => "authentication failed",
        })
    }
}

/// Result of an authentication exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    /// The password round was answered with 235.
    pub success: bool,
    /// Round that produced `reply`.
    pub step: Step,
    /// The last reply received.
    pub reply: Reply,
}

impl AuthOutcome {
    /// Returns the failure class, or `None` on success.
    #[must_use]
    pub const fn failure(&self) -> Option<AuthFailure> {
        if self.success {
            None
        } else {
            Some(AuthFailure::classify(self.step, self.reply.code))
        }
    }

    /// Returns the diagnostic for the failing round, or `None` on success.
    #[must_use]
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        interpret(self.step, &self.reply).diagnostic().cloned()
    }
}

/// Runs the LOGIN exchange for `mode`.
///
/// Returns `Ok(None)` for [`AuthMode::None`]. Transport failures are errors;
/// a refusal by the server is an unsuccessful [`AuthOutcome`].
///
/// # Errors
///
/// Returns an error if sending or reading fails.
pub async fn authenticate<T: Transport>(
    transport: &mut T,
    mode: AuthMode,
    credentials: &Credentials,
) -> Result<Option<AuthOutcome>> {
    let (announce, username, password) = match mode {
        AuthMode::None => return Ok(None),
        AuthMode::Base64 => (
            Command::AuthLogin { plain: false },
            STANDARD.encode(credentials.username.as_bytes()),
            STANDARD.encode(credentials.password.as_bytes()),
        ),
        AuthMode::PlainText => (
            Command::AuthLogin { plain: true },
            credentials.username.clone(),
            credentials.password.clone(),
        ),
    };

    let rounds = [
        (announce, Step::AuthLogin),
        (Command::AuthResponse(username), Step::AuthUsername),
        (Command::AuthResponse(password), Step::AuthPassword),
    ];

    let mut last = None;
    for (command, step) in rounds {
        let reply = exchange(transport, &command).await?;
        let success = step.accepts(reply.code);
        if !success || step == Step::AuthPassword {
            last = Some(AuthOutcome {
                success,
                step,
                reply,
            });
            break;
        }
    }
    Ok(last)
}

async fn exchange<T: Transport>(transport: &mut T, command: &Command) -> Result<Reply> {
    tracing::debug!(command = %command.log_line(), "sending");
    transport.send_command(&command.to_string()).await?;
    let reply = transport.get_reply().await?;
    tracing::debug!(code = %reply.code, "auth reply");
    Ok(reply)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::connection::StreamTransport;
    use tokio_test::io::Builder;

    fn credentials() -> Credentials {
        Credentials::new("user", "secret")
    }

    #[test]
    fn test_classify() {
        let announce = |code| AuthFailure::classify(Step::AuthLogin, ReplyCode::new(code));
        assert_eq!(announce(501), AuthFailure::MechanismNotSupported);
        assert_eq!(announce(504), AuthFailure::MechanismNotSupported);
        assert_eq!(announce(500), AuthFailure::MechanismNotSupported);
        assert_eq!(announce(530), AuthFailure::Failed);
        assert_eq!(announce(454), AuthFailure::ServerError);

        let password = |code| AuthFailure::classify(Step::AuthPassword, ReplyCode::new(code));
        assert_eq!(password(535), AuthFailure::CredentialsRejected);
        assert_eq!(password(501), AuthFailure::Failed);
        assert_eq!(password(504), AuthFailure::Failed);
        assert_eq!(password(454), AuthFailure::ServerError);
        assert_eq!(password(534), AuthFailure::Failed);
        assert_eq!(
            AuthFailure::classify(Step::AuthUsername, ReplyCode::new(500)),
            AuthFailure::Failed
        );
    }

    #[tokio::test]
    async fn test_base64_success() {
        let mock = Builder::new()
            .write(b"AUTH LOGIN\r\n")
            .read(b"334 VXNlcm5hbWU6\r\n")
            .write(b"dXNlcg==\r\n")
            .read(b"334 UGFzc3dvcmQ6\r\n")
            .write(b"c2VjcmV0\r\n")
            .read(b"235 2.7.0 Authentication successful\r\n")
            .build();
        let mut transport = StreamTransport::new(mock);

        let outcome = authenticate(&mut transport, AuthMode::Base64, &credentials())
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.step, Step::AuthPassword);
        assert_eq!(outcome.failure(), None);
        assert_eq!(outcome.diagnostic(), None);
    }

    #[tokio::test]
    async fn test_plaintext_sends_raw_lines() {
        let mock = Builder::new()
            .write(b"AUTH LOGIN PLAIN\r\n")
            .read(b"334 go\r\n")
            .write(b"user\r\n")
            .read(b"334 go\r\n")
            .write(b"secret\r\n")
            .read(b"535 5.7.8 bad credentials\r\n")
            .build();
        let mut transport = StreamTransport::new(mock);

        let outcome = authenticate(&mut transport, AuthMode::PlainText, &credentials())
            .await
            .unwrap()
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.failure(), Some(AuthFailure::CredentialsRejected));
    }

    #[tokio::test]
    async fn test_syntax_error_aborts_before_credentials() {
        let mock = Builder::new()
            .write(b"AUTH LOGIN\r\n")
            .read(b"504 5.5.4 Unrecognized authentication type\r\n")
            .build();
        let mut transport = StreamTransport::new(mock);

        let outcome = authenticate(&mut transport, AuthMode::Base64, &credentials())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.step, Step::AuthLogin);
        assert_eq!(outcome.failure(), Some(AuthFailure::MechanismNotSupported));
    }

    #[tokio::test]
    async fn test_syntax_error_after_password_is_not_a_mechanism_problem() {
        let mock = Builder::new()
            .write(b"AUTH LOGIN\r\n")
            .read(b"334 VXNlcm5hbWU6\r\n")
            .write(b"dXNlcg==\r\n")
            .read(b"334 UGFzc3dvcmQ6\r\n")
            .write(b"c2VjcmV0\r\n")
            .read(b"501 5.5.2 cannot decode response\r\n")
            .build();
        let mut transport = StreamTransport::new(mock);

        let outcome = authenticate(&mut transport, AuthMode::Base64, &credentials())
            .await
            .unwrap()
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.step, Step::AuthPassword);
        assert_eq!(outcome.failure(), Some(AuthFailure::Failed));
        assert_eq!(
            outcome.diagnostic().unwrap().message,
            "A general error happened during authentication"
        );
    }

    #[tokio::test]
    async fn test_credentials_withheld_unless_server_continues() {
        // Any write beyond the announce would fail the mock.
        let mock = Builder::new()
            .write(b"AUTH LOGIN\r\n")
            .read(b"530 5.7.0 Must issue a STARTTLS command first\r\n")
            .build();
        let mut transport = StreamTransport::new(mock);

        let outcome = authenticate(&mut transport, AuthMode::Base64, &credentials())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.step, Step::AuthLogin);
        assert_eq!(outcome.failure(), Some(AuthFailure::Failed));
        assert!(outcome.diagnostic().unwrap().message.contains("secure connection"));
    }

    #[tokio::test]
    async fn test_rejected_username_stops_before_password() {
        let mock = Builder::new()
            .write(b"AUTH LOGIN PLAIN\r\n")
            .read(b"334 go\r\n")
            .write(b"user\r\n")
            .read(b"535 5.7.8 unknown user\r\n")
            .build();
        let mut transport = StreamTransport::new(mock);

        let outcome = authenticate(&mut transport, AuthMode::PlainText, &credentials())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.step, Step::AuthUsername);
        assert_eq!(outcome.failure(), Some(AuthFailure::CredentialsRejected));
    }

    #[tokio::test]
    async fn test_none_is_a_no_op() {
        let mut transport = StreamTransport::new(Builder::new().build());
        let outcome = authenticate(&mut transport, AuthMode::None, &credentials())
            .await
            .unwrap();
        assert!(outcome.is_none());
    }
}
