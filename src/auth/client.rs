//! OAuth client for the account hosts
//!
//! Implements the two exchanges the credential layer needs: refresh token
//! to access token, and access token to site cookies.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

use crate::creds::{TokenExchanger, TokenSink};
use crate::error::{Error, Result};

use super::types::{AccessInfo, OauthConfig, TokenResponse};

/// Client for the OAuth and session endpoints
pub struct AuthClient {
    config: OauthConfig,
    http: Client,
}

impl AuthClient {
    /// Create a client for the configured endpoints
    pub fn new(config: OauthConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    /// Create a client with a custom HTTP client
    pub fn with_client(config: OauthConfig, http: Client) -> Self {
        Self { config, http }
    }

    /// The consent URL a user visits to obtain an authorization code
    ///
    /// Requests offline access with forced consent so the resulting code
    /// can be exchanged for a refresh token.
    pub fn auth_code_url(&self) -> Result<String> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            [
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", self.config.scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchange a one-time authorization code for a refresh token plus the
    /// first access credential
    pub async fn exchange_auth_code(&self, code: &str) -> Result<(String, AccessInfo)> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ];
        let raw = self.post_token_form(&form).await?;
        let refresh = raw.refresh_token.clone().ok_or_else(|| {
            Error::token_refresh("token endpoint returned no refresh_token for the code exchange")
        })?;
        Ok((refresh, raw.into_access_info()))
    }

    async fn post_token_form(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await?;
        let response = Self::ensure_success(response, "token request").await?;
        Ok(response.json::<TokenResponse>().await?)
    }

    async fn ensure_success(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::token_refresh(format!(
            "{what} failed with status {}: {body}",
            status.as_u16()
        )))
    }
}

#[async_trait]
impl TokenExchanger for AuthClient {
    async fn refresh_access(&self, refresh_token: &str) -> Result<AccessInfo> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];
        let raw = self.post_token_form(&form).await?;
        debug!("exchanged refresh token for a fresh access credential");
        Ok(raw.into_access_info())
    }

    /// Walk the session endpoints to turn an access token into the cookie
    /// header the site accepts
    async fn cookies_for_access(&self, access: &AccessInfo) -> Result<String> {
        let jar = Arc::new(Jar::default());
        let session = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        // One-time session token issued against the Bearer credential
        let response = session
            .get(&self.config.session_login_url)
            .bearer_auth(&access.access_token)
            .send()
            .await?;
        let response = Self::ensure_success(response, "session login").await?;
        let session_token = response.text().await?.trim().to_string();
        if session_token.is_empty() {
            return Err(Error::token_refresh(
                "session login returned an empty session token",
            ));
        }

        // The merge endpoint expects the account cookies a first visit sets
        let warmup = session.get(&self.config.session_merge_url).send().await?;
        Self::ensure_success(warmup, "session warm-up").await?;

        let merged = session
            .get(&self.config.session_merge_url)
            .query(&[("source", crate::NAME), ("uberauth", session_token.as_str())])
            .send()
            .await?;
        Self::ensure_success(merged, "session merge").await?;

        // Visiting the site itself completes the jar
        let site = session.get(&self.config.site_url).send().await?;
        Self::ensure_success(site, "site cookie fetch").await?;

        let site_url = Url::parse(&self.config.site_url)?;
        let header = jar
            .cookies(&site_url)
            .ok_or_else(|| Error::token_refresh("no cookies issued for the site"))?;
        let cookies = header
            .to_str()
            .map_err(|_| Error::token_refresh("cookie header is not valid UTF-8"))?
            .to_string();
        debug!(
            cookie_bytes = cookies.len(),
            "derived site cookies from access token"
        );
        Ok(cookies)
    }
}

/// Persists access credentials to a JSON file
///
/// Writes go to a temp file first and are renamed into place, so a crash
/// cannot leave a half-written credential behind.
pub struct FileTokenSink {
    path: PathBuf,
}

impl FileTokenSink {
    /// Create a sink writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load a previously persisted access credential
    ///
    /// `Ok(None)` when nothing has been persisted yet.
    pub async fn load(&self) -> Result<Option<AccessInfo>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

#[async_trait]
impl TokenSink for FileTokenSink {
    async fn persist(&self, access: &AccessInfo) -> Result<()> {
        let contents = serde_json::to_string_pretty(access)?;
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}
