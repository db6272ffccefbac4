use std::{future::Future, time::Duration};

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Why a call context stopped a call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Cancellation {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Per-call cancellation token and optional deadline.
///
/// Every suspension point of a call (rate limiter wait, backoff sleep,
/// HTTP round trip, body read) races against this context.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context that never fires unless its token is cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context driven by an existing token, e.g. a child of a shutdown token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Adds a deadline `timeout` from now. An earlier deadline is kept.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or_else(far_future);
        self.with_deadline(deadline)
    }

    /// Adds an absolute deadline. An earlier deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels the context and every call currently racing against it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the reason the context has already fired, if any.
    pub fn check(&self) -> Result<(), Cancellation> {
        if self.token.is_cancelled() {
            return Err(Cancellation::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Cancellation::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the context fires.
    pub async fn done(&self) -> Cancellation {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => Cancellation::Canceled,
                    _ = sleep_until(deadline) => Cancellation::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                Cancellation::Canceled
            }
        }
    }

    /// Drives `fut` to completion unless the context fires first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancellation> {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            output = fut => Ok(output),
        }
    }
}

fn far_future() -> Instant {
    // ~30 years, same horizon tokio uses for "never".
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}
