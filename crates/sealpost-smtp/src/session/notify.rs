//! Completion notification.

use crate::error::Error;
use crate::types::Reply;
use std::sync::Arc;

/// Outcome of one session operation, as seen by a [`CompletionObserver`].
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    /// The operation's future was dropped before it finished.
    pub cancelled: bool,
    /// Why the operation failed, if it did.
    pub error: Option<&'a Error>,
    /// The last reply read from the server during the operation.
    pub last_reply: Option<&'a Reply>,
}

impl Completion<'_> {
    /// Returns true if the operation finished without error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !self.cancelled && self.error.is_none()
    }
}

/// Receives one [`Completion`] per network operation.
///
/// Configuration and busy errors are returned to the caller only; they never
/// reach the observer.
pub trait CompletionObserver: Send + Sync {
    /// Called when an operation finishes or is cancelled.
    fn completed(&self, completion: &Completion<'_>);
}

impl<F> CompletionObserver for F
where
    F: Fn(&Completion<'_>) + Send + Sync,
{
    fn completed(&self, completion: &Completion<'_>) {
        self(completion);
    }
}

/// Reports a cancellation if dropped while still armed.
pub(super) struct CancelGuard {
    observer: Option<Arc<dyn CompletionObserver>>,
}

impl CancelGuard {
    pub(super) fn new(observer: Option<Arc<dyn CompletionObserver>>) -> Self {
        Self { observer }
    }

    pub(super) fn disarm(mut self) {
        self.observer = None;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if let Some(observer) = self.observer.take() {
            tracing::debug!("operation cancelled");
            observer.completed(&Completion {
                cancelled: true,
                error: None,
                last_reply: None,
            });
        }
    }
}
