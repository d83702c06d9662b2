//! Auth configuration and token types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth2 endpoints and client identity for the token exchange flows
///
/// `client_id`/`client_secret` always come from the caller; the endpoint
/// defaults point at the site's public account hosts and are overridable
/// for tests and self-hosted frontends.
#[derive(Debug, Clone)]
pub struct OauthConfig {
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Consent page shown to the user
    pub auth_url: String,
    /// Token exchange endpoint
    pub token_url: String,
    /// Redirect target for the out-of-band code flow
    pub redirect_uri: String,
    /// Requested scope
    pub scope: String,
    /// Endpoint issuing a one-time session token for a Bearer access token
    pub session_login_url: String,
    /// Endpoint merging a session token into browser cookies
    pub session_merge_url: String,
    /// The site whose cookie header is ultimately wanted
    pub site_url: String,
}

impl OauthConfig {
    /// Config for the public account hosts with the given client identity
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            scope: "https://www.googleapis.com/auth/youtube".to_string(),
            session_login_url:
                "https://accounts.google.com/accounts/OAuthLogin?source=tubefeed&issueuberauth=1"
                    .to_string(),
            session_merge_url: "https://accounts.google.com/MergeSession".to_string(),
            site_url: "https://www.youtube.com".to_string(),
        }
    }

    /// Point every endpoint at `base` (wiremock, self-hosted frontends)
    #[must_use]
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.auth_url = format!("{base}/o/oauth2/v2/auth");
        self.token_url = format!("{base}/token");
        self.session_login_url = format!("{base}/accounts/OAuthLogin");
        self.session_merge_url = format!("{base}/MergeSession");
        self.site_url = base.to_string();
        self
    }
}

/// A short-lived access credential with its expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessInfo {
    /// The access token
    pub access_token: String,
    /// When the token expires; `None` means never
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessInfo {
    /// Create an access credential
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Create a credential that expires in N seconds from now
    pub fn expires_in(access_token: impl Into<String>, seconds: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(seconds)),
        }
    }

    /// Check if the credential is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}

/// Wire shape of a token endpoint response
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Convert into an [`AccessInfo`] anchored at the current time
    pub(super) fn into_access_info(self) -> AccessInfo {
        match self.expires_in {
            Some(seconds) => AccessInfo::expires_in(self.access_token, seconds),
            None => AccessInfo::new(self.access_token, None),
        }
    }
}
