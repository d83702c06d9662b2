//! Assembling credentials from the places people actually have them

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

use super::types::Credentials;

/// Matches the cookie header inside a browser "copy as cURL" paste
static CURL_COOKIE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)'cookie: (.*?)'").unwrap());

/// Builder for [`Credentials`]
///
/// Accepts a cookie header as a literal string, from a file holding one, or
/// extracted from a "copy as cURL" command (pasted or in a file). The last
/// input wins when several are given.
#[derive(Debug, Default)]
pub struct CredentialsBuilder {
    cookies: Option<String>,
}

impl CredentialsBuilder {
    /// Start an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a literal cookie header
    #[must_use]
    pub fn cookies(mut self, header: impl Into<String>) -> Self {
        self.cookies = Some(header.into());
        self
    }

    /// Read the cookie header from a file
    pub async fn cookies_from_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        self.cookies = Some(contents.trim().to_string());
        Ok(self)
    }

    /// Extract the cookie header from a "copy as cURL" command
    pub fn cookies_from_curl(mut self, curl: &str) -> Result<Self> {
        let captures = CURL_COOKIE_REGEX.captures(curl).ok_or_else(|| {
            Error::credentials("no 'cookie: ...' header found in the cURL command")
        })?;
        self.cookies = Some(captures[1].to_string());
        Ok(self)
    }

    /// Extract the cookie header from a file holding a "copy as cURL"
    /// command
    pub async fn cookies_from_curl_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        self.cookies_from_curl(&contents)
    }

    /// Build the credentials
    pub fn build(self) -> Result<Credentials> {
        let cookies = self
            .cookies
            .ok_or_else(|| Error::credentials("no cookie input provided"))?;
        Ok(Credentials::new(cookies))
    }
}
