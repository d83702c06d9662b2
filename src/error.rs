//! Error types for tubefeed
//!
//! One crate-wide [`enum@Error`] covers collection access, credential
//! handling, scraping, and transport. Every public API returns the
//! [`Result`] alias defined here.

use thiserror::Error;

/// The main error type for tubefeed
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Collection Errors
    // ============================================================================
    #[error("Index {index} out of range: collection exhausted after {len} items")]
    OutOfRange { index: usize, len: usize },

    #[error("No further pages to fetch: the collection is already exhausted")]
    Exhausted,

    #[error("No match within the first {limit} items searched")]
    SearchExhausted { limit: usize },

    // ============================================================================
    // Credential Errors
    // ============================================================================
    #[error("Credential error: {message}")]
    Credentials { message: String },

    #[error("Authentication required: {message}")]
    AuthRequired { message: String },

    #[error("Authentication invalid: {message}")]
    AuthInvalid { message: String },

    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    // ============================================================================
    // Scrape Errors
    // ============================================================================
    #[error("Failed to scrape page: {message}")]
    Scrape { message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create an out-of-range error
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::OutOfRange { index, len }
    }

    /// Create a credential error
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    /// Create an auth-required error
    pub fn auth_required(message: impl Into<String>) -> Self {
        Self::AuthRequired {
            message: message.into(),
        }
    }

    /// Create an auth-invalid error
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::AuthInvalid {
            message: message.into(),
        }
    }

    /// Create a token refresh error
    pub fn token_refresh(message: impl Into<String>) -> Self {
        Self::TokenRefresh {
            message: message.into(),
        }
    }

    /// Create a scrape error
    pub fn scrape(message: impl Into<String>) -> Self {
        Self::Scrape {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Only transport-level failures qualify. Auth and scrape failures never
    /// do: retrying them with the same inputs cannot succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if this error signals missing or rejected credentials
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Error::AuthRequired { .. } | Error::AuthInvalid { .. } | Error::TokenRefresh { .. }
        )
    }
}

/// Whether a status code is worth retrying
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for tubefeed
pub type Result<T> = std::result::Result<T, Error>;

/// Attach a caller-side prefix to any error convertible into [`enum@Error`]
pub trait ResultExt<T> {
    /// Prefix the error with a fixed message
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Prefix the error with a lazily built message
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
