use crate::Cancellation;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum WormlyError {
    /// The call context fired before the rate limiter granted a slot.
    #[error("rate limiter wait failed: {0}")]
    RateLimiterWait(Cancellation),
    /// The call context fired during a backoff sleep or an in-flight request.
    #[error("request cancelled: {0}")]
    Cancelled(Cancellation),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// Retryable HTTP status (429 or 5xx gateway/server errors).
    #[error("HTTP {status}: {reason}")]
    TransientStatus { status: u16, reason: String },
    /// Non-success, non-retryable HTTP status with raw response body.
    #[error("API request failed with status {status}: {body}")]
    Http { status: u16, body: String },
    /// Every attempt failed with a transient error.
    #[error("request failed after {retries} retries: {source}")]
    RetriesExhausted {
        retries: u32,
        #[source]
        source: Box<WormlyError>,
    },
    /// Response body is not valid JSON or does not match the target shape.
    #[error("failed to decode response: {0}")]
    Json(#[source] serde_json::Error),
    /// Wire value could not be normalized into its typed form.
    #[error("decode error: {0}")]
    Decode(String),
    /// Nonzero `errorcode` in the response envelope.
    #[error("API returned error code {code}: {message}")]
    Api { code: i64, message: String },
    /// The requested entity does not exist upstream.
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: String },
    /// An operation-level failure wrapping its cause.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<WormlyError>,
    },
    /// The outbound request could not be prepared.
    #[error("failed to create request: {0}")]
    Request(String),
    /// Invalid or missing configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl WormlyError {
    pub(crate) fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through context and retry wrappers.
    pub fn root(&self) -> &WormlyError {
        match self {
            Self::Context { source, .. } | Self::RetriesExhausted { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the underlying failure is a transport or socket timeout.
    pub fn is_timeout(&self) -> bool {
        match self.root() {
            Self::Transport(err) => err.is_timeout(),
            Self::Cancelled(Cancellation::DeadlineExceeded)
            | Self::RateLimiterWait(Cancellation::DeadlineExceeded) => true,
            _ => false,
        }
    }

    /// True when the call was stopped by its context.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.root(),
            Self::Cancelled(_) | Self::RateLimiterWait(_)
        )
    }

    /// True when the failure means the entity is absent upstream.
    ///
    /// Read paths use this to treat a resource as gone instead of failing.
    pub fn is_not_found(&self) -> bool {
        match self.root() {
            Self::NotFound { .. } => true,
            Self::Http { status, .. } => *status == 404,
            Self::Api { message, .. } => message.to_ascii_lowercase().contains("not found"),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Cancellation, WormlyError};

    #[test]
    fn not_found_is_seen_through_context() {
        let err = WormlyError::NotFound {
            entity: "host",
            id: "7".to_owned(),
        }
        .context("failed to get host");

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "failed to get host: host with ID 7 not found");
    }

    #[test]
    fn http_404_counts_as_not_found() {
        let err = WormlyError::Http {
            status: 404,
            body: "gone".to_owned(),
        };
        assert!(err.is_not_found());

        let err = WormlyError::Http {
            status: 400,
            body: "bad".to_owned(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn deadline_through_retry_wrapper_is_timeout() {
        let err = WormlyError::RetriesExhausted {
            retries: 2,
            source: Box::new(WormlyError::Cancelled(Cancellation::DeadlineExceeded)),
        }
        .context("failed to delete host");

        assert!(err.is_timeout());
        assert!(err.is_cancelled());
    }

    #[test]
    fn api_error_message_format() {
        let err = WormlyError::Api {
            code: 3,
            message: "Invalid hostid".to_owned(),
        };
        assert_eq!(err.to_string(), "API returned error code 3: Invalid hostid");
        assert!(!err.is_not_found());
    }
}
