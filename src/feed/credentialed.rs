//! Credential resolution for page sources
//!
//! Bridges a credential-requiring fetcher into the plain [`PageSource`]
//! contract: the feed's credential source is resolved exactly once, on the
//! first fetch, and the result rides along on every page request after
//! that.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::creds::{CredentialSource, Credentials};
use crate::error::{Error, Result};

use super::types::{Page, PageSource, PageToken};

/// A page fetcher whose requests carry credentials
///
/// `creds` is `None` for anonymous access. A fetcher that cannot serve the
/// request anonymously reports [`Error::AuthRequired`]; one whose
/// credentials are rejected reports [`Error::AuthInvalid`]. "No more pages"
/// is still [`Page::next_token`] being `None`, never an error.
#[async_trait]
pub trait CredentialedFetch<T, K>: Send + Sync {
    /// Fetch one page of the collection on behalf of `creds`
    async fn fetch_page(
        &self,
        creds: Option<&Credentials>,
        token: Option<&K>,
    ) -> Result<Page<T, K>>;
}

/// Adapts a [`CredentialedFetch`] into a [`PageSource`]
///
/// The credential source is queried once per source instance, not per
/// fetch and not globally: concurrent first fetches collapse onto a single
/// resolution, and every later fetch reuses the resolved value. Views
/// derived from the owning feed share this source, so they inherit the
/// resolved credentials too.
pub struct CredentialedSource<T, K> {
    credentials: Arc<dyn CredentialSource>,
    resolved: OnceCell<Option<Credentials>>,
    fetch: Arc<dyn CredentialedFetch<T, K>>,
}

impl<T, K> CredentialedSource<T, K> {
    /// Create a source resolving `credentials` lazily for `fetch`
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        fetch: Arc<dyn CredentialedFetch<T, K>>,
    ) -> Self {
        Self {
            credentials,
            resolved: OnceCell::new(),
            fetch,
        }
    }
}

#[async_trait]
impl<T, K> PageSource<T, K> for CredentialedSource<T, K>
where
    T: Send + Sync + 'static,
    K: PageToken,
{
    async fn fetch_page(&self, token: Option<&K>) -> Result<Page<T, K>> {
        let creds = self
            .resolved
            .get_or_try_init(|| async {
                let resolved = self.credentials.get().await?;
                debug!(present = resolved.is_some(), "resolved feed credentials");
                Ok::<_, Error>(resolved)
            })
            .await?;
        self.fetch.fetch_page(creds.as_ref(), token).await
    }
}
