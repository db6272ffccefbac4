use std::{error::Error as StdError, io, time::Duration};

use reqwest::StatusCode;

/// Exponential backoff parameters. No jitter: the sequence is a pure
/// function of the policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
}

impl BackoffPolicy {
    /// Returns `current × multiplier`, clamped to `max`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        let next = current.as_nanos() as f64 * self.multiplier;
        if !next.is_finite() || next >= self.max.as_nanos() as f64 {
            return self.max;
        }
        // `as` saturates, negative multipliers land on zero.
        Duration::from_nanos(next as u64).min(self.max)
    }

    /// Iterates the delays slept before retry 1, 2, 3, ...
    pub fn delays(&self) -> Backoff {
        Backoff {
            policy: *self,
            current: None,
        }
    }
}

/// Infinite iterator over backoff delays of one logical call.
#[derive(Clone, Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Option<Duration>,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = match self.current {
            None => self.policy.initial,
            Some(current) => self.policy.next_backoff(current),
        };
        self.current = Some(delay);
        Some(delay)
    }
}

/// Statuses worth retrying: rate limiting and gateway/server hiccups.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Transport failures worth retrying.
///
/// Only timeouts and refused/reset/timed-out sockets qualify. DNS, TLS and
/// other I/O failures are terminal.
pub fn is_transient_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || has_transient_io_cause(err)
}

/// Walks the source chain looking for a socket-level fault.
pub(crate) fn has_transient_io_cause(err: &(dyn StdError + 'static)) -> bool {
    let mut cause: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(current) = cause {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::TimedOut
            ) {
                return true;
            }
        }
        cause = current.source();
    }
    false
}
