//! Pluggable sink for debug-mode request/response logging.
//!
//! The client only forwards messages here when debug mode is on. Retry and
//! attempt bookkeeping is always emitted as `tracing` events regardless.

use std::fmt;

/// Receives debug messages from a client.
pub trait Logger: Send + Sync {
    fn log(&self, message: fmt::Arguments<'_>);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _message: fmt::Arguments<'_>) {}
}

/// Forwards messages as `tracing` debug events under the `wormly_http` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: fmt::Arguments<'_>) {
        tracing::debug!(target: "wormly_http", "{message}");
    }
}
