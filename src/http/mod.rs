//! HTTP layer shared by the scraping backends.
//!
//! Wraps a [`reqwest::Client`] with the behaviors every feed request
//! needs: retries with configurable backoff, token-bucket request
//! pacing, and per-request header/query/body shaping.

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
