//! Credential source trait and the basic sources

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;

use super::types::Credentials;

/// Something that can produce credentials for remote requests
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Resolve credentials; `None` means anonymous access
    async fn get(&self) -> Result<Option<Credentials>>;

    /// Accept updated credentials back (e.g. rotated cookies)
    ///
    /// Sources with nothing to update ignore the call; this default does.
    async fn set(&self, _creds: Credentials) -> Result<()> {
        Ok(())
    }

    /// Check if wrapping this source in [`CachedCredentials`] would add
    /// anything
    ///
    /// Already-cached sources and the anonymous source answer `false`, which
    /// is how [`cached`] stays idempotent without inspecting concrete types.
    fn needs_cache_layer(&self) -> bool {
        true
    }
}

/// Anonymous access: no credentials, ever
pub struct NoCredentials;

#[async_trait]
impl CredentialSource for NoCredentials {
    async fn get(&self) -> Result<Option<Credentials>> {
        Ok(None)
    }

    fn needs_cache_layer(&self) -> bool {
        false
    }
}

/// A fixed credential value
pub struct StaticCredentials {
    value: Credentials,
}

impl StaticCredentials {
    /// Create a source that always yields `value`
    pub fn new(value: Credentials) -> Self {
        Self { value }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn get(&self) -> Result<Option<Credentials>> {
        Ok(Some(self.value.clone()))
    }
}

struct CacheEntry {
    value: Credentials,
    expires_at: DateTime<Utc>,
}

/// Caches another source's credentials for a fixed window
///
/// The wrapped source is queried at most once per window; `set` updates the
/// cache immediately and still hands the value down for persistence. An
/// anonymous answer is not cached, so a source that later gains credentials
/// is picked up on the next call.
pub struct CachedCredentials {
    inner: Arc<dyn CredentialSource>,
    cache: RwLock<Option<CacheEntry>>,
    ttl: Duration,
}

impl CachedCredentials {
    /// Cache `inner` for one day per resolved value
    pub fn new(inner: Arc<dyn CredentialSource>) -> Self {
        Self::with_ttl(inner, Duration::days(1))
    }

    /// Cache `inner` with a custom expiry window
    pub fn with_ttl(inner: Arc<dyn CredentialSource>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: RwLock::new(None),
            ttl,
        }
    }

    fn entry(&self, value: Credentials) -> CacheEntry {
        CacheEntry {
            value,
            expires_at: Utc::now() + self.ttl,
        }
    }
}

#[async_trait]
impl CredentialSource for CachedCredentials {
    async fn get(&self) -> Result<Option<Credentials>> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref() {
                if Utc::now() < entry.expires_at {
                    return Ok(Some(entry.value.clone()));
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refilled the cache while we waited
        if let Some(entry) = cache.as_ref() {
            if Utc::now() < entry.expires_at {
                return Ok(Some(entry.value.clone()));
            }
        }

        debug!("credential cache empty or expired; querying wrapped source");
        match self.inner.get().await? {
            Some(value) => {
                *cache = Some(self.entry(value.clone()));
                Ok(Some(value))
            }
            None => {
                *cache = None;
                Ok(None)
            }
        }
    }

    async fn set(&self, creds: Credentials) -> Result<()> {
        {
            let mut cache = self.cache.write().await;
            *cache = Some(self.entry(creds.clone()));
        }
        self.inner.set(creds).await
    }

    fn needs_cache_layer(&self) -> bool {
        false
    }
}

/// Add a caching layer to `source` unless it would be redundant
///
/// Returns the same handle when the source reports that caching adds
/// nothing (already cached, or anonymous), so composing repeatedly is safe.
pub fn cached(source: Arc<dyn CredentialSource>) -> Arc<dyn CredentialSource> {
    if source.needs_cache_layer() {
        Arc::new(CachedCredentials::new(source))
    } else {
        source
    }
}
