//! The lazy cached feed
//!
//! Implements fetch-on-demand reads, bounded and approximate slicing,
//! lazy searches, derived views and stream iteration over any
//! [`PageSource`].

use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use async_stream::try_stream;
use futures::Stream;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::creds::CredentialSource;
use crate::error::{Error, Result};

use super::credentialed::{CredentialedFetch, CredentialedSource};
use super::types::{detach, Cursor, Page, PageSource, PageToken, DEFAULT_PAGE_SIZE_HINT};
use super::views::{CappedSource, FilterSource};

/// Cached items plus the position the next fetch resumes from
struct FeedState<T, K> {
    items: Vec<T>,
    cursor: Cursor<K>,
}

/// A lazily populated, append-only cached view of a paginated remote
/// collection
///
/// Reads that land inside the cache are answered without touching the
/// network; reads past it fetch pages one at a time until the index is
/// covered or the backend reports the end. Fetched pages are appended
/// whole, so concurrent readers never observe a partially applied page, and
/// concurrent reads that need the same page collapse onto a single fetch.
///
/// A feed is exhausted once the backend stops returning continuation
/// tokens; from then on out-of-range reads fail fast with
/// [`Error::OutOfRange`] and no further requests are made.
pub struct Feed<T, K> {
    source: Arc<dyn PageSource<T, K>>,
    state: RwLock<FeedState<T, K>>,
    /// Serializes fetches; the in-flight handle concurrent readers wait on
    fetch_gate: Mutex<()>,
    page_size_hint: usize,
}

impl<T, K> Feed<T, K>
where
    T: Clone + Send + Sync + 'static,
    K: PageToken,
{
    /// Create a feed over a page source
    pub fn new(source: Arc<dyn PageSource<T, K>>) -> Self {
        Self {
            source,
            state: RwLock::new(FeedState {
                items: Vec::new(),
                cursor: Cursor::Unknown,
            }),
            fetch_gate: Mutex::new(()),
            page_size_hint: DEFAULT_PAGE_SIZE_HINT,
        }
    }

    /// Create a feed over a credentialed fetcher
    ///
    /// The credential source is resolved once, on the first fetch, and the
    /// resolved credentials are reused for the lifetime of this feed (and
    /// of any views derived from it).
    pub fn with_credentials(
        credentials: Arc<dyn CredentialSource>,
        fetch: Arc<dyn CredentialedFetch<T, K>>,
    ) -> Self {
        Self::new(Arc::new(CredentialedSource::new(credentials, fetch)))
    }

    /// Override the advisory page size used by approximate slicing
    #[must_use]
    pub fn with_page_size_hint(mut self, hint: usize) -> Self {
        self.page_size_hint = hint.max(1);
        self
    }

    /// Number of items fetched so far
    pub async fn cached_len(&self) -> usize {
        self.state.read().await.items.len()
    }

    /// Check if further fetches may yield more items
    pub async fn has_more(&self) -> bool {
        self.state.read().await.cursor.has_more()
    }

    /// Get the item at `index`, fetching pages as needed
    ///
    /// Indexes inside the cache never trigger a fetch. An index past the
    /// end of an exhausted collection fails with [`Error::OutOfRange`].
    pub async fn get(&self, index: usize) -> Result<T> {
        loop {
            let observed = {
                let state = self.state.read().await;
                if let Some(item) = state.items.get(index) {
                    return Ok(item.clone());
                }
                if state.cursor.is_exhausted() {
                    return Err(Error::out_of_range(index, state.items.len()));
                }
                state.items.len()
            };
            match self.fetch_beyond(observed).await {
                // Raced with a concurrent fetch of the final page; the next
                // pass over the cache reports out-of-range.
                Err(Error::Exhausted) => {}
                fetched => fetched?,
            }
        }
    }

    /// Find the first item matching `predicate`, fetching as needed
    ///
    /// `Ok(None)` when the collection exhausts without a match.
    pub async fn find(&self, predicate: impl FnMut(&T) -> bool) -> Result<Option<T>> {
        match self.find_index(predicate).await? {
            Some(index) => Ok(Some(self.get(index).await?)),
            None => Ok(None),
        }
    }

    /// Find the index of the first item matching `predicate`
    ///
    /// `Ok(None)` when the collection exhausts without a match.
    pub async fn find_index(&self, mut predicate: impl FnMut(&T) -> bool) -> Result<Option<usize>> {
        let mut index = 0;
        loop {
            let item = match self.get(index).await {
                Err(Error::OutOfRange { .. }) => return Ok(None),
                fetched => fetched?,
            };
            if predicate(&item) {
                return Ok(Some(index));
            }
            index += 1;
        }
    }

    /// Find the first item of `other` (in `other`'s order) that is present
    /// anywhere in this feed
    ///
    /// Equality is decided by `equals(candidate_from_self, item_from_other)`.
    /// One approximate page is prefetched from both feeds concurrently
    /// before scanning. Either feed running out ends the scan; a miss is
    /// `Ok(None)`, never an error.
    pub async fn find_first_member_of<K2, F>(
        &self,
        other: &Feed<T, K2>,
        equals: F,
    ) -> Result<Option<T>>
    where
        K2: PageToken,
        F: Fn(&T, &T) -> bool,
    {
        tokio::try_join!(self.prefetch(), other.prefetch())?;

        let mut other_index = 0;
        loop {
            let needle = match other.get(other_index).await {
                Err(Error::OutOfRange { .. }) => return Ok(None),
                fetched => fetched?,
            };
            let mut index = 0;
            loop {
                let item = match self.get(index).await {
                    Err(Error::OutOfRange { .. }) => break,
                    fetched => fetched?,
                };
                if equals(&item, &needle) {
                    return Ok(Some(item));
                }
                index += 1;
            }
            other_index += 1;
        }
    }

    /// Copy out a range of the collection
    ///
    /// With a bounded end (`2..5`) the whole range is forced into the cache
    /// first; an end past an exhausted collection surfaces
    /// [`Error::OutOfRange`]. With an unbounded end (`2..`) the result is
    /// approximate: if about half a page past `start` is already cached the
    /// cached prefix is returned as-is, otherwise at most one page is
    /// fetched. An unbounded slice never crawls the whole collection.
    pub async fn slice(&self, range: impl RangeBounds<usize>) -> Result<Vec<T>> {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        match range.end_bound() {
            Bound::Included(&e) => self.slice_bounded(start, e + 1).await,
            Bound::Excluded(&e) => self.slice_bounded(start, e).await,
            Bound::Unbounded => self.slice_approximate(start).await,
        }
    }

    async fn slice_bounded(&self, start: usize, end: usize) -> Result<Vec<T>> {
        if end <= start {
            return Ok(Vec::new());
        }
        self.get(end - 1).await?;
        let state = self.state.read().await;
        Ok(state.items[start..end].to_vec())
    }

    async fn slice_approximate(&self, start: usize) -> Result<Vec<T>> {
        let fast_end = start + self.page_size_hint / 2;
        let observed = {
            let state = self.state.read().await;
            if fast_end < state.items.len() {
                return Ok(state.items[start..fast_end].to_vec());
            }
            if state.cursor.is_exhausted() {
                return Ok(Self::tail(&state.items, start));
            }
            state.items.len()
        };
        match self.fetch_beyond(observed).await {
            Ok(()) | Err(Error::Exhausted) => {}
            Err(err) => return Err(err),
        }
        let state = self.state.read().await;
        Ok(Self::tail(&state.items, start))
    }

    fn tail(items: &[T], start: usize) -> Vec<T> {
        items[start.min(items.len())..].to_vec()
    }

    /// Derive a view containing only items matching `predicate`
    ///
    /// The view starts from the matching part of the already cached prefix
    /// and this feed's current cursor, then pages further independently:
    /// later fetches by the view never touch this feed's cache, cursor, or
    /// (when this feed is itself a view) its source's budget.
    pub async fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        let predicate: Arc<dyn Fn(&T) -> bool + Send + Sync> = Arc::new(predicate);
        let state = self.state.read().await;
        let items: Vec<T> = state
            .items
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect();
        Self {
            source: Arc::new(FilterSource::new(
                detach(&self.source).await,
                Arc::clone(&predicate),
            )),
            state: RwLock::new(FeedState {
                items,
                cursor: state.cursor.clone(),
            }),
            fetch_gate: Mutex::new(()),
            page_size_hint: self.page_size_hint,
        }
    }

    /// Derive a view of at most the first `count` items
    ///
    /// If the cache already holds `count` items the view is complete on
    /// creation and will never fetch. Otherwise it resumes from this feed's
    /// current cursor and truncates the page that reaches the cap, marking
    /// itself exhausted even though the remote collection goes on. The base
    /// feed is never touched by the view's fetches, and views derived from
    /// this one spend a copy of the cap, never the cap itself.
    pub async fn take(&self, count: usize) -> Self {
        let state = self.state.read().await;
        let items: Vec<T> = state.items.iter().take(count).cloned().collect();
        let cursor = if items.len() == count {
            Cursor::Exhausted
        } else {
            state.cursor.clone()
        };
        let remaining = count - items.len();
        Self {
            source: Arc::new(CappedSource::new(detach(&self.source).await, remaining)),
            state: RwLock::new(FeedState { items, cursor }),
            fetch_gate: Mutex::new(()),
            page_size_hint: self.page_size_hint,
        }
    }

    /// Iterate the collection from the start as an async stream
    ///
    /// Each call restarts at index zero over the same growing cache, so
    /// re-iterating is cheap: items fetched by an earlier pass are re-read
    /// from the cache and only the part past it is fetched. Reaching the
    /// end terminates the stream normally; any other failure is yielded as
    /// the final item.
    pub fn stream(&self) -> impl Stream<Item = Result<T>> + '_ {
        try_stream! {
            let mut index = 0;
            loop {
                let item = match self.get(index).await {
                    Err(Error::OutOfRange { .. }) => break,
                    fetched => fetched?,
                };
                yield item;
                index += 1;
            }
        }
    }

    /// Warm the cache with one approximate page
    async fn prefetch(&self) -> Result<()> {
        self.slice(0..).await.map(|_| ())
    }

    /// Fetch exactly one page past the cache
    ///
    /// `observed_len` is the cache length the caller last saw. The fetch
    /// gate serializes fetches; once acquired, the cache is re-checked and
    /// the fetch is skipped when another task already grew it past the
    /// caller's position. Calling this on an exhausted feed is a bug and
    /// fails with [`Error::Exhausted`].
    pub(super) async fn fetch_beyond(&self, observed_len: usize) -> Result<()> {
        let _inflight = self.fetch_gate.lock().await;

        let token = {
            let state = self.state.read().await;
            if state.items.len() > observed_len {
                return Ok(());
            }
            match &state.cursor {
                Cursor::Exhausted => return Err(Error::Exhausted),
                Cursor::Unknown => None,
                Cursor::Resume(token) => Some(token.clone()),
            }
        };

        let Page { items, next_token } = self.source.fetch_page(token.as_ref()).await?;
        let fetched = items.len();

        let mut state = self.state.write().await;
        state.items.extend(items);
        state.cursor = match next_token {
            Some(next) if !next.is_terminal() => Cursor::Resume(next),
            _ => Cursor::Exhausted,
        };
        debug!(
            fetched,
            cached = state.items.len(),
            has_more = state.cursor.has_more(),
            "appended page"
        );
        Ok(())
    }
}
