//! Refresh-token backed credentials

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::auth::AccessInfo;
use crate::error::Result;

use super::source::CredentialSource;
use super::types::Credentials;

/// Exchanges tokens with the identity provider
///
/// The seam between [`RefreshingCredentials`] and the network: production
/// code uses [`AuthClient`](crate::auth::AuthClient), tests substitute a
/// stub.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchange the long-lived refresh secret for a fresh access credential
    async fn refresh_access(&self, refresh_token: &str) -> Result<AccessInfo>;

    /// Derive the cookie header the site accepts from an access credential
    async fn cookies_for_access(&self, access: &AccessInfo) -> Result<String>;
}

/// Receives freshly exchanged access credentials for persistence
#[async_trait]
pub trait TokenSink: Send + Sync {
    /// Persist `access` so a later process can resume without re-exchanging
    async fn persist(&self, access: &AccessInfo) -> Result<()>;
}

/// Credentials derived on demand from a long-lived refresh secret
///
/// Holds the refresh secret privately (no API exposes it) plus an optional
/// cached access credential with its own expiry. `get` exchanges the secret
/// only when the cached access credential is missing or expired; concurrent
/// callers finding it expired serialize on one in-flight exchange and the
/// winner's result serves them all, so each expiry cycle costs exactly one
/// exchange. The cookie header handed to callers is derived from the access
/// credential on every `get`; wrap this source with
/// [`cached`](super::cached) when that derivation is itself expensive.
pub struct RefreshingCredentials {
    refresh_token: String,
    exchanger: Arc<dyn TokenExchanger>,
    sink: Option<Arc<dyn TokenSink>>,
    access: RwLock<Option<AccessInfo>>,
}

impl RefreshingCredentials {
    /// Create a source around a refresh secret
    pub fn new(refresh_token: impl Into<String>, exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            exchanger,
            sink: None,
            access: RwLock::new(None),
        }
    }

    /// Seed the source with a previously persisted access credential
    ///
    /// Used until it expires, saving the first exchange.
    #[must_use]
    pub fn with_access(self, access: AccessInfo) -> Self {
        Self {
            access: RwLock::new(Some(access)),
            ..self
        }
    }

    /// Persist every freshly exchanged access credential to `sink`
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TokenSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Get a non-expired access credential, exchanging the refresh secret
    /// if needed
    async fn valid_access(&self) -> Result<AccessInfo> {
        {
            let access = self.access.read().await;
            if let Some(access) = access.as_ref() {
                if !access.is_expired() {
                    return Ok(access.clone());
                }
            }
        }

        let mut cached = self.access.write().await;

        // Double-check after acquiring the write lock: another caller may
        // have finished the exchange while we waited on it
        if let Some(access) = cached.as_ref() {
            if !access.is_expired() {
                return Ok(access.clone());
            }
        }

        debug!("access credential missing or expired; exchanging refresh token");
        let fresh = self.exchanger.refresh_access(&self.refresh_token).await?;
        if let Some(sink) = &self.sink {
            // A persistence hiccup costs one extra exchange next run; it
            // must not block access now
            if let Err(err) = sink.persist(&fresh).await {
                warn!(error = %err, "failed to persist refreshed access credential");
            }
        }
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}

#[async_trait]
impl CredentialSource for RefreshingCredentials {
    async fn get(&self) -> Result<Option<Credentials>> {
        let access = self.valid_access().await?;
        let cookies = self.exchanger.cookies_for_access(&access).await?;
        Ok(Some(Credentials::new(cookies)))
    }
}
