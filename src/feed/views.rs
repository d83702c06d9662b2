//! Page sources backing derived views
//!
//! A view created by [`Feed::filter`](super::Feed::filter) or
//! [`Feed::take`](super::Feed::take) is an ordinary feed whose source wraps
//! the base feed's source. The wrappers reshape pages in flight; the base
//! feed never sees the view's fetches. Deriving a view from a view copies
//! these wrappers (and any live state inside them) instead of sharing them,
//! so chained views spend their own budgets.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;

use super::types::{detach, Page, PageSource, PageToken};

/// Drops items failing the predicate from each page
///
/// The continuation token passes through untouched, so a page whose items
/// are all filtered out still advances the cursor and the feed keeps
/// scanning past it.
pub(super) struct FilterSource<T, K> {
    inner: Arc<dyn PageSource<T, K>>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T, K> FilterSource<T, K> {
    pub(super) fn new(
        inner: Arc<dyn PageSource<T, K>>,
        predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    ) -> Self {
        Self { inner, predicate }
    }
}

#[async_trait]
impl<T, K> PageSource<T, K> for FilterSource<T, K>
where
    T: Send + Sync + 'static,
    K: PageToken,
{
    async fn fetch_page(&self, token: Option<&K>) -> Result<Page<T, K>> {
        let mut page = self.inner.fetch_page(token).await?;
        page.items.retain(|item| (self.predicate)(item));
        Ok(page)
    }

    async fn detached(&self) -> Option<Arc<dyn PageSource<T, K>>> {
        // The predicate is shared; the wrapped source may hold per-view
        // state and is detached in turn.
        Some(Arc::new(Self::new(
            detach(&self.inner).await,
            Arc::clone(&self.predicate),
        )))
    }
}

/// Caps the total number of items a view will ever hand out
///
/// `remaining` counts how many items the owning view may still accept. The
/// page that reaches the cap is truncated and stripped of its continuation
/// token, exhausting the view locally while the remote collection goes on.
/// Exactly one feed fetches through a given cap: views derived from a take
/// view get a detached copy, never this counter.
pub(super) struct CappedSource<T, K> {
    inner: Arc<dyn PageSource<T, K>>,
    remaining: Mutex<usize>,
}

impl<T, K> CappedSource<T, K> {
    pub(super) fn new(inner: Arc<dyn PageSource<T, K>>, remaining: usize) -> Self {
        Self {
            inner,
            remaining: Mutex::new(remaining),
        }
    }
}

#[async_trait]
impl<T, K> PageSource<T, K> for CappedSource<T, K>
where
    T: Send + Sync + 'static,
    K: PageToken,
{
    async fn fetch_page(&self, token: Option<&K>) -> Result<Page<T, K>> {
        let mut page = self.inner.fetch_page(token).await?;
        let mut remaining = self.remaining.lock().await;
        if page.items.len() >= *remaining {
            page.items.truncate(*remaining);
            page.next_token = None;
        }
        *remaining -= page.items.len();
        Ok(page)
    }

    async fn detached(&self) -> Option<Arc<dyn PageSource<T, K>>> {
        // Snapshot the budget; the copy spends it independently.
        let remaining = *self.remaining.lock().await;
        Some(Arc::new(Self::new(detach(&self.inner).await, remaining)))
    }
}
