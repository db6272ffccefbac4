//! `wormly-http` is an async client for the Wormly monitoring API.
//!
//! Every call goes through one executor that paces requests with a shared
//! rate limiter and retries transient failures with exponential backoff:
//! - [`WormlyClient::command`] for form-encoded API commands
//! - [`WormlyClient::execute`] for arbitrary prepared requests
//!
//! Typed operations live on capability traits implemented by the client:
//! [`HostApi`], [`SensorHttpApi`], [`ScheduledDowntimeApi`] and
//! [`GlobalAlertMuteApi`].
//!
//! ```no_run
//! use wormly_http::{CallContext, HostApi, WormlyClient};
//!
//! # async fn run() -> wormly_http::Result<()> {
//! let client = WormlyClient::from_env()?;
//! let ctx = CallContext::new();
//! if let Some(host) = client.find_host(&ctx, 42).await? {
//!     println!("{} enabled={}", host.name, host.enabled);
//! }
//! # Ok(())
//! # }
//! ```

mod alert_mute;
mod client;
mod context;
mod decode;
mod downtime;
mod error;
mod host;
mod limiter;
mod logger;
mod options;
mod params;
mod retry;
mod sensor_http;
mod types;
mod wire;

pub use alert_mute::GlobalAlertMuteApi;
pub use client::{ClientBuilder, WormlyClient, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
pub use context::{CallContext, Cancellation};
pub use downtime::ScheduledDowntimeApi;
pub use error::WormlyError;
pub use host::{HostApi, DEFAULT_TEST_INTERVAL};
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use options::{parse_duration, ClientOptions};
pub use params::Params;
pub use retry::{is_transient_status, is_transient_transport, Backoff, BackoffPolicy};
pub use sensor_http::SensorHttpApi;
pub use types::{
    DowntimeSchedule, Host, NewSensorHttp, ScheduledDowntimePeriod, SensorHttp, SensorType,
};
pub use wire::{Ack, Envelope};

#[cfg(any(test, feature = "mock"))]
pub use alert_mute::MockGlobalAlertMuteApi;
#[cfg(any(test, feature = "mock"))]
pub use downtime::MockScheduledDowntimeApi;
#[cfg(any(test, feature = "mock"))]
pub use host::MockHostApi;
#[cfg(any(test, feature = "mock"))]
pub use sensor_http::MockSensorHttpApi;

pub type Result<T> = std::result::Result<T, WormlyError>;
