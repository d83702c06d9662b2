//! HTTP transport for the scrape paths
//!
//! Every scrape request funnels through one retrying, rate-limited client
//! so pacing and retry policy live in a single place. The auth module
//! builds its own cookie-jar clients and stays off this path.
//!
//! Credentials are plain headers here (a cookie header on the request);
//! nothing at this layer knows how they were obtained.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::error::{is_retryable_status, Error, Result};
use crate::types::BackoffType;

/// Settings for [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Prefix for relative request paths
    pub base_url: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries allowed after the initial attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Ceiling on the retry delay
    pub max_backoff: Duration,
    /// How the retry delay grows across attempts
    pub backoff_type: BackoffType,
    /// Pacing applied before every attempt; `None` disables it
    pub rate_limit: Option<RateLimiterConfig>,
    /// Headers attached to every request
    pub default_headers: HashMap<String, String>,
    /// User agent presented to the site
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: HashMap::new(),
            user_agent: format!("{}/{}", crate::NAME, env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Start building a config from the defaults
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for [`HttpClientConfig`]
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Prefix relative request paths with `url`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Retries allowed after the initial attempt
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Retry delay growth, starting delay, and ceiling
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Pace requests with `config`
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Send requests as fast as callers ask for them
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Attach `key: value` to every request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// User agent presented to the site
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Finish the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Per-request additions to a client call
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters appended to the URL
    pub query: HashMap<String, String>,
    /// Headers for this request only
    pub headers: HashMap<String, String>,
    /// JSON body
    pub body: Option<Value>,
    /// Urlencoded form body; outranks `body` when both are set
    pub form: Option<HashMap<String, String>>,
}

impl RequestConfig {
    /// An empty request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Attach a header to this request
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Send `body` as JSON
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a field to the urlencoded form body
    #[must_use]
    pub fn form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// What became of one attempt
enum Outcome {
    /// Hand the response to the caller
    Done(Response),
    /// Worth another attempt; `wait` overrides the backoff schedule
    Retry { error: Error, wait: Option<Duration> },
    /// Retrying cannot help
    Fail(Error),
}

/// Retrying, rate-limited HTTP client
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// A client with the default configuration
    pub fn new() -> Self {
        Self::with_config(HttpClientConfig::default())
    }

    /// A client with the given configuration
    pub fn with_config(config: HttpClientConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("client settings are static");

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Self {
            client,
            config,
            rate_limiter,
        }
    }

    /// GET `path`
    pub async fn get(&self, path: &str) -> Result<Response> {
        self.send(Method::GET, path, RequestConfig::new()).await
    }

    /// GET `path` with query parameters or headers attached
    pub async fn get_with_config(&self, path: &str, config: RequestConfig) -> Result<Response> {
        self.send(Method::GET, path, config).await
    }

    /// GET `path` and read the body as text
    pub async fn get_text(&self, path: &str, config: RequestConfig) -> Result<String> {
        let response = self.send(Method::GET, path, config).await?;
        Ok(response.text().await?)
    }

    /// POST a JSON body to `path`
    pub async fn post(&self, path: &str, body: Value) -> Result<Response> {
        self.send(Method::POST, path, RequestConfig::new().json(body))
            .await
    }

    /// POST to `path` with the full request config
    pub async fn post_with_config(&self, path: &str, config: RequestConfig) -> Result<Response> {
        self.send(Method::POST, path, config).await
    }

    /// Send one request, retrying transient failures
    ///
    /// Every attempt waits for the rate limiter first. A retryable status
    /// burns a retry and backs off (a rate-limited response waits out the
    /// server's hint instead); any other non-success status fails
    /// immediately with the body attached.
    pub async fn send(&self, method: Method, path: &str, config: RequestConfig) -> Result<Response> {
        let url = self.absolute(path);
        let retries = self.config.max_retries;

        for attempt in 0..=retries {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            let outcome = match self.prepare(&method, &url, &config).send().await {
                Ok(response) => classify_response(response).await,
                Err(error) => classify_transport(error, self.config.timeout),
            };

            match outcome {
                Outcome::Done(response) => {
                    debug!(%method, url = %url, attempt, "request succeeded");
                    return Ok(response);
                }
                Outcome::Fail(error) => return Err(error),
                Outcome::Retry { error, wait } => {
                    if attempt == retries {
                        return Err(error);
                    }
                    let delay = wait.unwrap_or_else(|| self.backoff_delay(attempt));
                    warn!(
                        %method,
                        url = %url,
                        attempt,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(Error::MaxRetriesExceeded {
            max_retries: retries,
        })
    }

    /// Assemble one attempt without sending it
    fn prepare(
        &self,
        method: &Method,
        url: &str,
        config: &RequestConfig,
    ) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method.clone(), url);
        for (key, value) in &self.config.default_headers {
            request = request.header(key.as_str(), value.as_str());
        }
        for (key, value) in &config.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if !config.query.is_empty() {
            request = request.query(&config.query);
        }
        if let Some(form) = &config.form {
            request = request.form(form);
        } else if let Some(body) = &config.body {
            request = request.json(body);
        }
        request
    }

    /// Resolve `path` against the base URL; absolute URLs pass through
    fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }

    /// The delay scheduled before retry number `attempt + 1`
    pub(crate) fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => self.config.initial_backoff * 2u32.saturating_pow(attempt),
        };
        delay.min(self.config.max_backoff)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Sort a received response into done, retry, or fail
async fn classify_response(response: Response) -> Outcome {
    let status = response.status();
    if status.is_success() {
        return Outcome::Done(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let wait = retry_after_hint(&response);
        return Outcome::Retry {
            error: Error::RateLimited {
                retry_after_seconds: wait.as_secs(),
            },
            wait: Some(wait),
        };
    }

    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let error = Error::http_status(code, body);
    if is_retryable_status(code) {
        Outcome::Retry { error, wait: None }
    } else {
        Outcome::Fail(error)
    }
}

/// Sort a connection-level failure into retry or fail
fn classify_transport(error: reqwest::Error, timeout: Duration) -> Outcome {
    if error.is_timeout() {
        return Outcome::Retry {
            error: Error::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            },
            wait: None,
        };
    }
    if error.is_connect() {
        return Outcome::Retry {
            error: Error::Http(error),
            wait: None,
        };
    }
    Outcome::Fail(Error::Http(error))
}

/// The pause a rate-limited response asks for, defaulting to a minute
fn retry_after_hint(response: &Response) -> Duration {
    let seconds = response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(60);
    Duration::from_secs(seconds)
}
