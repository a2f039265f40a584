//! Reply interpretation per protocol step.
//!
//! Each step accepts its own set of codes. Failures are looked up in a
//! per-step table for a readable diagnostic; codes missing from the table
//! fall back to the server's own text.

use crate::types::{Reply, ReplyCode};
use std::fmt;

/// Protocol step a reply answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Server greeting after connect.
    Greeting,
    /// `HELO`.
    Hello,
    /// `EHLO`.
    ExtendedHello,
    /// `STARTTLS`.
    StartTls,
    /// `AUTH LOGIN` announce.
    AuthLogin,
    /// Username line of the LOGIN exchange.
    AuthUsername,
    /// Password line of the LOGIN exchange.
    AuthPassword,
    /// `MAIL FROM`.
    MailFrom,
    /// `RCPT TO`.
    RcptTo,
    /// `DATA`.
    Data,
    /// End of message data (`.`).
    Message,
}

impl Step {
    /// Codes that count as success for this step.
    #[must_use]
    pub const fn accepted(self) -> &'static [u16] {
        match self {
            Self::Greeting => &[220],
            Self::Hello | Self::ExtendedHello | Self::MailFrom | Self::Message => &[250],
            Self::StartTls => &[220, 250],
            Self::AuthLogin | Self::AuthUsername => &[334],
            Self::AuthPassword => &[235],
            Self::RcptTo => &[250, 251],
            Self::Data => &[354, 250],
        }
    }

    /// Returns true if `code` is a success for this step.
    #[must_use]
    pub fn accepts(self, code: ReplyCode) -> bool {
        self.accepted().contains(&code.as_u16())
    }

    fn failures(self) -> &'static [(u16, Category, &'static str)] {
        use Category::{Authentication, Mailbox, Sequence, Server, Syntax};

        const SERVICE_UNAVAILABLE: (u16, Category, &str) =
            (421, Server, "Service not available, closing transmission channel");
        const SYNTAX_PARAMETERS: (u16, Category, &str) =
            (501, Syntax, "Syntax error in parameters or arguments");
        const SYNTAX_COMMAND: (u16, Category, &str) =
            (500, Syntax, "Syntax error, command unrecognised");
        const LOCAL_ERROR: (u16, Category, &str) =
            (451, Server, "Requested action aborted: local error in processing");
        const INSUFFICIENT_STORAGE: (u16, Category, &str) =
            (452, Server, "Requested action not taken: insufficient system storage");
        const EXCEEDED_STORAGE: (u16, Category, &str) = (
            552,
            Mailbox,
            "Requested mail action aborted: exceeded storage allocation",
        );
        const BAD_SEQUENCE: (u16, Category, &str) = (503, Sequence, "Bad sequence of commands");
        const AUTH_TEMPORARY: (u16, Category, &str) =
            (454, Server, "Temporary authentication failure");
        const AUTH_GENERAL: &str = "A general error happened during authentication";
        const TRANSACTION_FAILED: (u16, Category, &str) = (554, Server, "Transaction failed");

        match self {
            Self::Greeting => &[SERVICE_UNAVAILABLE],
            Self::Hello => &[
                SERVICE_UNAVAILABLE,
                (521, Server, "Host does not accept mail"),
                (504, Syntax, "Command parameter not implemented"),
                SYNTAX_PARAMETERS,
                SYNTAX_COMMAND,
            ],
            Self::ExtendedHello => &[
                SERVICE_UNAVAILABLE,
                (502, Syntax, "Command not implemented"),
                (504, Syntax, "Command parameter not implemented"),
                SYNTAX_PARAMETERS,
                SYNTAX_COMMAND,
            ],
            Self::StartTls => &[
                (454, Server, "TLS not available due to temporary reason"),
                SYNTAX_PARAMETERS,
                SYNTAX_COMMAND,
            ],
            Self::AuthLogin => &[
                (
                    500,
                    Authentication,
                    "Server does not support this authentication type",
                ),
                (
                    501,
                    Authentication,
                    "Server does not support this authentication type",
                ),
                (
                    504,
                    Authentication,
                    "Server does not support this authentication type",
                ),
                (530, Authentication, "Server requires a secure connection first"),
                (538, Authentication, "Server requires encryption for this mechanism"),
                AUTH_TEMPORARY,
                BAD_SEQUENCE,
            ],
            Self::AuthUsername | Self::AuthPassword => &[
                (
                    535,
                    Authentication,
                    "Authentication failed: the username or password is incorrect",
                ),
                (534, Authentication, "Authentication mechanism is too weak"),
                (500, Authentication, AUTH_GENERAL),
                (501, Authentication, AUTH_GENERAL),
                AUTH_TEMPORARY,
            ],
            Self::MailFrom => &[
                SERVICE_UNAVAILABLE,
                LOCAL_ERROR,
                INSUFFICIENT_STORAGE,
                EXCEEDED_STORAGE,
                SYNTAX_PARAMETERS,
                SYNTAX_COMMAND,
            ],
            Self::RcptTo => &[
                SERVICE_UNAVAILABLE,
                (450, Mailbox, "Requested mail action not taken: mailbox unavailable"),
                LOCAL_ERROR,
                INSUFFICIENT_STORAGE,
                (502, Syntax, "Command not implemented"),
                BAD_SEQUENCE,
                (521, Server, "Host does not accept mail"),
                (550, Mailbox, "Requested action not taken: mailbox unavailable"),
                (551, Mailbox, "User not local"),
                EXCEEDED_STORAGE,
                (553, Mailbox, "Requested action not taken: mailbox name not allowed"),
                SYNTAX_PARAMETERS,
                SYNTAX_COMMAND,
            ],
            Self::Data => &[
                SERVICE_UNAVAILABLE,
                LOCAL_ERROR,
                INSUFFICIENT_STORAGE,
                BAD_SEQUENCE,
                EXCEEDED_STORAGE,
                TRANSACTION_FAILED,
                SYNTAX_PARAMETERS,
                SYNTAX_COMMAND,
            ],
            Self::Message => &[
                SERVICE_UNAVAILABLE,
                LOCAL_ERROR,
                INSUFFICIENT_STORAGE,
                EXCEEDED_STORAGE,
                TRANSACTION_FAILED,
            ],
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Greeting => "greeting",
            Self::Hello => "HELO",
            Self::ExtendedHello => "EHLO",
            Self::StartTls => "STARTTLS",
            Self::AuthLogin => "AUTH LOGIN",
            Self::AuthUsername => "AUTH username",
            Self::AuthPassword => "AUTH password",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Data => "DATA",
            Self::Message => "end of data",
        })
    }
}

/// Broad class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// The server did not understand a command or its arguments.
    Syntax,
    /// Credentials or mechanism were refused.
    Authentication,
    /// A mailbox was refused or is over quota.
    Mailbox,
    /// The server cannot serve the request.
    Server,
    /// Commands were sent out of order.
    Sequence,
}

/// Human-readable explanation of a failed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Failure class.
    pub category: Category,
    /// Explanation.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of interpreting a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The code is in the step's accepted set.
    Success,
    /// A 4xx code; the same request may succeed later.
    SoftFailure(Diagnostic),
    /// Any other code.
    HardFailure(Diagnostic),
}

impl Outcome {
    /// Returns true for [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the diagnostic of a failure.
    #[must_use]
    pub const fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Success => None,
            Self::SoftFailure(d) | Self::HardFailure(d) => Some(d),
        }
    }
}

/// Classifies `reply` as the answer to `step`.
#[must_use]
pub fn interpret(step: Step, reply: &Reply) -> Outcome {
    if step.accepts(reply.code) {
        return Outcome::Success;
    }

    let code = reply.code.as_u16();
    let diagnostic = step
        .failures()
        .iter()
        .find(|(c, _, _)| *c == code)
        .map_or_else(
            || fallback(step, reply),
            |&(_, category, message)| Diagnostic {
                category,
                message: message.to_string(),
            },
        );

    if reply.code.is_transient() {
        Outcome::SoftFailure(diagnostic)
    } else {
        Outcome::HardFailure(diagnostic)
    }
}

fn fallback(step: Step, reply: &Reply) -> Diagnostic {
    let category = match step {
        Step::AuthLogin | Step::AuthUsername | Step::AuthPassword => Category::Authentication,
        Step::RcptTo => Category::Mailbox,
        _ => Category::Server,
    };
    let text = reply.message_text();
    let message = if text.trim().is_empty() {
        format!("Unexpected reply {} to {step}", reply.code)
    } else {
        text
    };
    Diagnostic { category, message }
}
