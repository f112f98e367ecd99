//! Cooperative, single-resolution cancellation.
//!
//! A [`CancelToken`] is shared between the caller and the transport adapter.
//! The first [`Canceler::cancel`] call stores the reason; every later check
//! observes that same reason, and later `cancel` calls do nothing.
//!
//! ```
//! use courier::CancelToken;
//!
//! let source = CancelToken::source();
//! assert!(source.token.throw_if_requested().is_ok());
//!
//! source.canceler.cancel("navigated away");
//! source.canceler.cancel("ignored");
//!
//! let reason = source.token.throw_if_requested().unwrap_err();
//! assert_eq!(reason.message(), "navigated away");
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::Notify;

/// The reason a request was cancelled.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Cancel {
    message: String,
}

impl Cancel {
    /// Creates a reason with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the cancellation message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Default for Cancel {
    fn default() -> Self {
        Self::new("canceled")
    }
}

struct Shared {
    reason: OnceLock<Cancel>,
    notify: Notify,
}

/// The observing side of a cancellation signal.
#[derive(Clone)]
pub struct CancelToken {
    shared: Arc<Shared>,
}

/// The triggering side of a cancellation signal.
#[derive(Clone)]
pub struct Canceler {
    shared: Arc<Shared>,
}

/// A token paired with the canceler that resolves it.
#[derive(Clone, Debug)]
pub struct CancelTokenSource {
    pub token: CancelToken,
    pub canceler: Canceler,
}

impl CancelToken {
    /// Creates a token, handing its canceler to `executor`.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Canceler),
    {
        let shared = Arc::new(Shared {
            reason: OnceLock::new(),
            notify: Notify::new(),
        });
        executor(Canceler {
            shared: Arc::clone(&shared),
        });
        Self { shared }
    }

    /// Creates a token together with its canceler.
    pub fn source() -> CancelTokenSource {
        let token = CancelToken::new(|_| {});
        let canceler = Canceler {
            shared: Arc::clone(&token.shared),
        };
        CancelTokenSource { token, canceler }
    }

    /// Fails with the stored reason if cancellation was requested.
    pub fn throw_if_requested(&self) -> Result<(), Cancel> {
        match self.shared.reason.get() {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    /// Returns the stored reason, if cancelled.
    pub fn reason(&self) -> Option<&Cancel> {
        self.shared.reason.get()
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.shared.reason.get().is_some()
    }

    /// Waits until cancellation is requested and returns the reason.
    pub async fn cancelled(&self) -> Cancel {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(reason) = self.shared.reason.get() {
                return reason.clone();
            }
            notified.await;
        }
    }
}

impl Canceler {
    /// Requests cancellation. Returns `false` if the token was already cancelled.
    pub fn cancel(&self, message: impl Into<String>) -> bool {
        self.resolve(Cancel::new(message))
    }

    /// Requests cancellation with the default reason.
    pub fn cancel_default(&self) -> bool {
        self.resolve(Cancel::default())
    }

    fn resolve(&self, reason: Cancel) -> bool {
        if self.shared.reason.set(reason).is_err() {
            return false;
        }
        tracing::debug!("Cancellation requested");
        self.shared.notify.notify_waiters();
        true
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("reason", &self.reason())
            .finish()
    }
}

impl fmt::Debug for Canceler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceler")
            .field("cancelled", &self.shared.reason.get().is_some())
            .finish()
    }
}
