use std::{collections::BTreeMap, fmt, sync::Arc};

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    limiter::RateLimiter,
    logger::{Logger, NoopLogger, TracingLogger},
    retry::{is_transient_status, is_transient_transport},
    wire::Envelope,
    CallContext, ClientOptions, Params, Result, WormlyError,
};

pub const DEFAULT_BASE_URL: &str = "https://api.wormly.com";
pub const DEFAULT_USER_AGENT: &str = concat!("wormly-http/", env!("CARGO_PKG_VERSION"));

/// Rate-limited, retrying client for the Wormly command API.
///
/// Clones share one rate limiter. Construct one client at startup and hand
/// clones to every consumer to keep the process under the configured rate.
#[derive(Clone)]
pub struct WormlyClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    user_agent: String,
    options: ClientOptions,
    limiter: Arc<RateLimiter>,
    logger: Arc<dyn Logger>,
}

impl fmt::Debug for WormlyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WormlyClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("options", &self.options)
            .finish()
    }
}

/// Assembles a [`WormlyClient`].
pub struct ClientBuilder {
    api_key: String,
    base_url: String,
    user_agent: String,
    options: ClientOptions,
    http: Option<reqwest::Client>,
    logger: Option<Arc<dyn Logger>>,
}

impl ClientBuilder {
    /// Endpoint every command is posted to. Defaults to [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses an existing transport instead of building one from
    /// [`ClientOptions::timeout`].
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Sink for debug-mode logging. Without one, debug output is discarded.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Builds the client. Options are taken as given; see
    /// [`ClientOptions::validate`].
    pub fn build(self) -> Result<WormlyClient> {
        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(self.options.timeout)
                .build()
                .map_err(WormlyError::Transport)?,
        };

        Ok(WormlyClient {
            http,
            api_key: self.api_key,
            base_url: self.base_url,
            user_agent: self.user_agent,
            limiter: Arc::new(RateLimiter::new(self.options.requests_per_second)),
            options: self.options,
            logger: self.logger.unwrap_or_else(|| Arc::new(NoopLogger)),
        })
    }
}

impl WormlyClient {
    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            options: ClientOptions::default(),
            http: None,
            logger: None,
        }
    }

    /// Creates a client with default endpoint and options.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).build()
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `WORMLY_API_KEY` (required)
    /// - `WORMLY_BASE_URL`, `WORMLY_USER_AGENT` (optional)
    /// - everything [`ClientOptions::from_env`] reads
    ///
    /// Debug mode logs through [`TracingLogger`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use wormly_http::WormlyClient;
    ///
    /// let client = WormlyClient::from_env().expect("missing WORMLY_API_KEY");
    /// ```
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`WormlyClient::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let api_key = read("WORMLY_API_KEY").ok_or_else(|| {
            WormlyError::Config("WORMLY_API_KEY must be set to authenticate".to_owned())
        })?;
        let options = ClientOptions::from_lookup(&lookup)?;

        let mut builder = Self::builder(api_key).options(options.clone());
        if let Some(base_url) = read("WORMLY_BASE_URL") {
            builder = builder.base_url(base_url);
        }
        if let Some(user_agent) = read("WORMLY_USER_AGENT") {
            builder = builder.user_agent(user_agent);
        }
        if options.debug {
            builder = builder.logger(Arc::new(TracingLogger));
        }
        builder.build()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Forwards `message` to the logger when debug mode is on.
    pub fn debug_log(&self, message: fmt::Arguments<'_>) {
        if self.options.debug {
            self.logger.log(format_args!("[DEBUG] {message}"));
        }
    }

    /// Runs a form-encoded API command and decodes the JSON response.
    ///
    /// The payload carries `cmd`, `key` and `response=json`, then `params`
    /// (which overwrite on key collision). Non-2xx statuses that are not
    /// retried become [`WormlyError::Http`]; a body that does not decode
    /// as `T` is [`WormlyError::Json`] and is never retried.
    pub async fn command<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        command: &str,
        params: &Params,
    ) -> Result<T> {
        if command.trim().is_empty() {
            return Err(WormlyError::Request(
                "command name must not be empty".to_owned(),
            ));
        }

        let mut form: BTreeMap<&str, &str> = BTreeMap::new();
        form.insert("cmd", command);
        form.insert("key", &self.api_key);
        form.insert("response", "json");
        form.extend(params.iter());

        self.debug_log(format_args!(
            "Wormly API request - command: {command}, params: {params:?}"
        ));

        let request = self
            .http
            .post(&self.base_url)
            .header(header::USER_AGENT, &self.user_agent)
            .form(&form)
            .build()
            .map_err(|err| WormlyError::Request(err.to_string()))?;

        let response = self.send_with_retry(ctx, request, command).await?;
        let status = response.status();
        let body = ctx
            .run(response.bytes())
            .await
            .map_err(WormlyError::Cancelled)?
            .map_err(WormlyError::Transport)?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            self.debug_log(format_args!(
                "API request failed with status {}: {body}",
                status.as_u16()
            ));
            return Err(WormlyError::Http {
                status: status.as_u16(),
                body,
            });
        }

        if self.options.debug {
            self.debug_log(format_args!(
                "Wormly API response: {}",
                String::from_utf8_lossy(&body)
            ));
        }

        serde_json::from_slice(&body).map_err(WormlyError::Json)
    }

    /// Runs `command`, checks the envelope's `errorcode` and returns its
    /// payload. Executor failures are wrapped with `context`.
    pub(crate) async fn envelope<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        command: &str,
        params: &Params,
        context: &str,
    ) -> Result<T> {
        let envelope: Envelope<T> = self
            .command(ctx, command, params)
            .await
            .map_err(|err| err.context(context))?;
        if envelope.errorcode != 0 {
            self.debug_log(format_args!(
                "{command} API error response: errorcode={} message={:?}",
                envelope.errorcode, envelope.message
            ));
        }
        envelope.into_result()
    }

    /// Sends a prepared request with rate limiting and retries.
    ///
    /// `Authorization: Bearer <key>`, `User-Agent` and
    /// `Content-Type: application/json` are added only when absent. Any
    /// non-retryable status (including 4xx) is returned as a response, not
    /// an error. Requests with streaming bodies cannot be retried and are
    /// rejected when retries are enabled.
    pub async fn execute(
        &self,
        ctx: &CallContext,
        mut request: reqwest::Request,
    ) -> Result<reqwest::Response> {
        self.inject_default_headers(request.headers_mut())?;
        let label = format!("{} {}", request.method(), request.url().path());
        self.send_with_retry(ctx, request, &label).await
    }

    fn inject_default_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        if !headers.contains_key(header::AUTHORIZATION) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| WormlyError::Request("API key is not a valid header value".to_owned()))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        if !headers.contains_key(header::USER_AGENT) {
            let value = HeaderValue::from_str(&self.user_agent).map_err(|_| {
                WormlyError::Request("user agent is not a valid header value".to_owned())
            })?;
            headers.insert(header::USER_AGENT, value);
        }
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        Ok(())
    }

    /// Retry loop shared by both request paths.
    ///
    /// Every attempt, retries included, waits for the rate limiter first.
    /// Transient failures sleep the current backoff and go again until
    /// `max_retries` is spent; anything else ends the call at once.
    async fn send_with_retry(
        &self,
        ctx: &CallContext,
        request: reqwest::Request,
        label: &str,
    ) -> Result<reqwest::Response> {
        let max_retries = self.options.max_retries;
        let mut delays = self.options.backoff_policy().delays();
        let mut template = Some(request);
        let mut attempt = 0u32;

        loop {
            let outbound = if attempt < max_retries {
                template.as_ref().and_then(reqwest::Request::try_clone)
            } else {
                template.take()
            }
            .ok_or_else(|| {
                WormlyError::Request("request body cannot be replayed for retries".to_owned())
            })?;

            self.limiter
                .acquire(ctx)
                .await
                .map_err(WormlyError::RateLimiterWait)?;

            debug!(request = label, attempt, max_retries, "sending request");

            let outcome = ctx
                .run(self.http.execute(outbound))
                .await
                .map_err(WormlyError::Cancelled)?;

            let failure = match outcome {
                Ok(response) if is_transient_status(response.status()) => {
                    let status = response.status();
                    // Dropping the response releases the connection before we sleep.
                    drop(response);
                    WormlyError::TransientStatus {
                        status: status.as_u16(),
                        reason: status.canonical_reason().unwrap_or("Unknown").to_owned(),
                    }
                }
                Ok(response) => return Ok(response),
                Err(err) if is_transient_transport(&err) => WormlyError::Transport(err),
                Err(err) => return Err(WormlyError::Transport(err)),
            };

            if attempt >= max_retries {
                warn!(
                    request = label,
                    attempts = attempt + 1,
                    error = %failure,
                    "retries exhausted"
                );
                return Err(WormlyError::RetriesExhausted {
                    retries: max_retries,
                    source: Box::new(failure),
                });
            }

            let delay = delays.next().unwrap_or(self.options.max_backoff);
            debug!(
                request = label,
                attempt,
                backoff_ms = delay.as_millis() as u64,
                error = %failure,
                "retrying after transient error"
            );
            self.debug_log(format_args!(
                "Transient error: {failure}. Retrying in {delay:?}"
            ));

            ctx.run(tokio::time::sleep(delay))
                .await
                .map_err(WormlyError::Cancelled)?;
            attempt += 1;
        }
    }
}
