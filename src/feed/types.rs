//! Feed types and traits
//!
//! Defines the page, token and cursor abstractions shared by every feed
//! backend.

use std::sync::Arc;

use crate::error::Result;
use async_trait::async_trait;

/// Advisory page size used by the approximate slice heuristic.
///
/// Backends are free to return pages of any size; nothing here enforces it.
pub const DEFAULT_PAGE_SIZE_HINT: usize = 50;

/// One fetched page of a remote collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T, K> {
    /// Items in server order
    pub items: Vec<T>,
    /// Token resuming after this page; `None` means the collection ends here
    pub next_token: Option<K>,
}

impl<T, K> Page<T, K> {
    /// Create a final page (no continuation)
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    /// Create a page followed by more
    pub fn with_next(items: Vec<T>, next_token: K) -> Self {
        Self {
            items,
            next_token: Some(next_token),
        }
    }

    /// Check if another page can be requested after this one
    pub fn has_next(&self) -> bool {
        self.next_token.is_some()
    }
}

/// A continuation token handed back by a backend
///
/// Tokens are opaque to the feed except for one question: can this token
/// actually resume pagination? Some backends signal "no more pages" with a
/// degenerate token (an empty string) instead of omitting it; `is_terminal`
/// lets the feed normalize both forms to the same exhausted cursor.
pub trait PageToken: Clone + Send + Sync + 'static {
    /// Check if this token is a "no more pages" marker rather than a real
    /// resume position
    fn is_terminal(&self) -> bool {
        false
    }
}

impl PageToken for String {
    fn is_terminal(&self) -> bool {
        self.is_empty()
    }
}

impl PageToken for usize {}

/// Pagination cursor for a feed
///
/// Transitions are monotonic: `Unknown` to zero or more `Resume` states to
/// `Exhausted`, never backwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor<K> {
    /// No fetch attempted yet; the collection may hold anything
    Unknown,
    /// Continue fetching from this token
    Resume(K),
    /// The backend reported no further pages
    Exhausted,
}

impl<K> Cursor<K> {
    /// Check if further fetches can yield more items
    pub fn has_more(&self) -> bool {
        !matches!(self, Self::Exhausted)
    }

    /// Check if the collection is known to be fully fetched
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// The page-fetch capability a feed paginates through
///
/// `None` requests the first page; `Some(token)` resumes after a previous
/// page. Implementations must treat each call as a pure request: the same
/// token may be fetched more than once (by a base feed and by views derived
/// from it), and "no more pages" is expressed through
/// [`Page::next_token`], never as an error.
#[async_trait]
pub trait PageSource<T, K>: Send + Sync {
    /// Fetch one page of the collection
    async fn fetch_page(&self, token: Option<&K>) -> Result<Page<T, K>>;

    /// A copy of this source for a newly derived view
    ///
    /// A source carrying live per-view pagination state (a take view's
    /// remaining budget) returns a duplicate with that state copied, so
    /// the derived view spends its own copy and never the budget of the
    /// view it came from. `None` means there is no per-view state and the
    /// source is shared as-is; credential-resolving sources stay shared
    /// this way, so derived views reuse the already resolved credentials.
    async fn detached(&self) -> Option<Arc<dyn PageSource<T, K>>> {
        None
    }
}

/// The source a derived view fetches through: a detached copy when the
/// source carries per-view state, the shared source otherwise
pub(super) async fn detach<T, K>(source: &Arc<dyn PageSource<T, K>>) -> Arc<dyn PageSource<T, K>> {
    match source.detached().await {
        Some(copy) => copy,
        None => Arc::clone(source),
    }
}
