//! Tests for the lazy feed

use super::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use pretty_assertions::assert_eq;

use crate::creds::{CredentialSource, Credentials};
use crate::error::{Error, Result};

/// Page source serving a fixed script of pages, keyed by continuation token
struct ScriptedSource {
    pages: HashMap<Option<String>, Page<i32, String>>,
    fetches: AtomicUsize,
    delay_ms: u64,
}

impl ScriptedSource {
    fn new(script: Vec<(Option<&str>, Vec<i32>, Option<&str>)>) -> Arc<Self> {
        Self::with_delay(script, 0)
    }

    fn with_delay(script: Vec<(Option<&str>, Vec<i32>, Option<&str>)>, delay_ms: u64) -> Arc<Self> {
        let pages = script
            .into_iter()
            .map(|(token, items, next)| {
                (
                    token.map(str::to_string),
                    Page {
                        items,
                        next_token: next.map(str::to_string),
                    },
                )
            })
            .collect();
        Arc::new(Self {
            pages,
            fetches: AtomicUsize::new(0),
            delay_ms,
        })
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource<i32, String> for ScriptedSource {
    async fn fetch_page(&self, token: Option<&String>) -> Result<Page<i32, String>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        match self.pages.get(&token.cloned()) {
            Some(page) => Ok(page.clone()),
            None => panic!("unscripted token: {token:?}"),
        }
    }
}

/// One good page, then failures
struct FailingSource {
    fetches: AtomicUsize,
}

#[async_trait]
impl PageSource<i32, String> for FailingSource {
    async fn fetch_page(&self, _token: Option<&String>) -> Result<Page<i32, String>> {
        let call = self.fetches.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            Ok(Page::with_next(vec![1, 2], "t1".to_string()))
        } else {
            Err(Error::scrape("backend failure"))
        }
    }
}

/// Items 1-9 across three pages of three
fn nine_items() -> Arc<ScriptedSource> {
    ScriptedSource::new(vec![
        (None, vec![1, 2, 3], Some("t1")),
        (Some("t1"), vec![4, 5, 6], Some("t2")),
        (Some("t2"), vec![7, 8, 9], None),
    ])
}

#[test]
fn test_page_helpers() {
    let last: Page<i32, String> = Page::new(vec![1]);
    assert!(!last.has_next());

    let more = Page::with_next(vec![1], "t1".to_string());
    assert!(more.has_next());
}

#[test]
fn test_string_token_terminal_when_empty() {
    assert!(String::new().is_terminal());
    assert!(!"t1".to_string().is_terminal());
}

#[test]
fn test_cursor_transitions() {
    assert!(Cursor::<String>::Unknown.has_more());
    assert!(Cursor::Resume("t1".to_string()).has_more());
    assert!(Cursor::<String>::Exhausted.is_exhausted());
    assert!(!Cursor::<String>::Exhausted.has_more());
}

#[tokio::test]
async fn test_get_fetches_pages_on_demand() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    assert_eq!(feed.get(0).await.unwrap(), 1);
    assert_eq!(feed.get(2).await.unwrap(), 3);
    assert_eq!(source.fetch_count(), 1);

    assert_eq!(feed.get(3).await.unwrap(), 4);
    assert_eq!(source.fetch_count(), 2);

    assert_eq!(feed.get(8).await.unwrap(), 9);
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(feed.cached_len().await, 9);
    assert!(!feed.has_more().await);
}

#[tokio::test]
async fn test_get_inside_cache_never_refetches() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    feed.get(1).await.unwrap();
    feed.get(1).await.unwrap();
    feed.get(0).await.unwrap();

    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_get_past_end_is_out_of_range() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let err = feed.get(100).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 100, len: 9 }));
    assert_eq!(source.fetch_count(), 3);

    // Once exhausted, out-of-range reads are answered without fetching
    let err = feed.get(100).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { .. }));
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn test_empty_collection() {
    let source = ScriptedSource::new(vec![(None, vec![], None)]);
    let feed = Feed::new(source.clone());

    let err = feed.get(0).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 0, len: 0 }));
    assert_eq!(source.fetch_count(), 1);

    feed.get(0).await.unwrap_err();
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_empty_continuation_token_means_exhausted() {
    let source = ScriptedSource::new(vec![(None, vec![1, 2], Some(""))]);
    let feed = Feed::new(source.clone());

    let err = feed.get(2).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 2, len: 2 }));
    assert_eq!(source.fetch_count(), 1);
    assert!(!feed.has_more().await);
}

#[tokio::test]
async fn test_find_fetches_until_match() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let found = feed.find(|v| *v == 5).await.unwrap();
    assert_eq!(found, Some(5));
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_find_miss_is_none_not_an_error() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let found = feed.find(|v| *v == 42).await.unwrap();
    assert_eq!(found, None);
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn test_find_index() {
    let feed = Feed::new(nine_items());

    assert_eq!(feed.find_index(|v| v % 4 == 0).await.unwrap(), Some(3));
    assert_eq!(feed.find_index(|v| *v < 0).await.unwrap(), None);
}

#[tokio::test]
async fn test_slice_bounded_forces_exact_range() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let slice = feed.slice(2..5).await.unwrap();
    assert_eq!(slice, vec![3, 4, 5]);
    assert_eq!(source.fetch_count(), 2);

    // A range already inside the cache costs nothing
    let slice = feed.slice(0..2).await.unwrap();
    assert_eq!(slice, vec![1, 2]);
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_slice_bounded_inclusive_end() {
    let feed = Feed::new(nine_items());

    let slice = feed.slice(2..=4).await.unwrap();
    assert_eq!(slice, vec![3, 4, 5]);
}

#[tokio::test]
async fn test_slice_bounded_empty_range() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let slice = feed.slice(3..3).await.unwrap();
    assert!(slice.is_empty());
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_slice_bounded_past_end() {
    let feed = Feed::new(nine_items());

    let err = feed.slice(7..12).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { .. }));
}

#[tokio::test]
async fn test_slice_unbounded_fast_path_skips_fetch() {
    let source = nine_items();
    let feed = Feed::new(source.clone()).with_page_size_hint(4);

    feed.get(5).await.unwrap();
    assert_eq!(source.fetch_count(), 2);

    // fast end = 3 + 4/2 = 5, strictly inside the 6 cached items
    let slice = feed.slice(3..).await.unwrap();
    assert_eq!(slice, vec![4, 5]);
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_slice_unbounded_boundary_fetches_one_page() {
    let source = nine_items();
    let feed = Feed::new(source.clone()).with_page_size_hint(4);

    feed.get(5).await.unwrap();

    // fast end = 4 + 4/2 = 6 equals the cached length, so the fast path
    // does not apply and exactly one page is fetched
    let slice = feed.slice(4..).await.unwrap();
    assert_eq!(slice, vec![5, 6, 7, 8, 9]);
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn test_slice_unbounded_fetches_at_most_once() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    // More pages exist, but an unbounded slice never crawls
    let slice = feed.slice(0..).await.unwrap();
    assert_eq!(slice, vec![1, 2, 3]);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_slice_unbounded_on_exhausted_returns_tail() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    feed.get(8).await.unwrap();

    let slice = feed.slice(4..).await.unwrap();
    assert_eq!(slice, vec![5, 6, 7, 8, 9]);

    // Past the end of an exhausted feed the tail is simply empty
    let slice = feed.slice(20..).await.unwrap();
    assert!(slice.is_empty());
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn test_concurrent_gets_share_one_fetch() {
    let source = ScriptedSource::with_delay(
        vec![
            (None, vec![1, 2, 3], Some("t1")),
            (Some("t1"), vec![4, 5, 6], None),
        ],
        20,
    );
    let feed = Feed::new(source.clone());

    let (a, b) = tokio::join!(feed.get(0), feed.get(2));
    assert_eq!(a.unwrap(), 1);
    assert_eq!(b.unwrap(), 3);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_concurrent_reads_past_empty_end() {
    let source = ScriptedSource::with_delay(vec![(None, vec![], None)], 10);
    let feed = Feed::new(source.clone());

    // Both tasks race to fetch the final (empty) page; the loser must see
    // out-of-range, not a spurious error
    let (a, b) = tokio::join!(feed.get(0), feed.get(0));
    assert!(matches!(a.unwrap_err(), Error::OutOfRange { .. }));
    assert!(matches!(b.unwrap_err(), Error::OutOfRange { .. }));
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_fetch_beyond_exhausted_is_an_error() {
    let source = ScriptedSource::new(vec![(None, vec![1], None)]);
    let feed = Feed::new(source.clone());

    feed.get(0).await.unwrap();
    assert!(!feed.has_more().await);

    let err = feed.fetch_beyond(feed.cached_len().await).await.unwrap_err();
    assert!(matches!(err, Error::Exhausted));
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_filter_view_starts_from_cached_prefix() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    feed.get(5).await.unwrap();
    assert_eq!(source.fetch_count(), 2);

    let evens = feed.filter(|v| v % 2 == 0).await;
    assert_eq!(evens.cached_len().await, 3);

    // Reads inside the inherited prefix cost nothing
    assert_eq!(evens.get(0).await.unwrap(), 2);
    assert_eq!(evens.get(2).await.unwrap(), 6);
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_filter_view_fetches_independently() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    feed.get(5).await.unwrap();
    let evens = feed.filter(|v| v % 2 == 0).await;

    // The view pages past its prefix without touching the base cache
    assert_eq!(evens.get(3).await.unwrap(), 8);
    assert_eq!(source.fetch_count(), 3);
    assert_eq!(feed.cached_len().await, 6);

    // The base fetches the same page again for itself later
    assert_eq!(feed.get(6).await.unwrap(), 7);
    assert_eq!(source.fetch_count(), 4);
}

#[tokio::test]
async fn test_filter_view_with_no_matches_exhausts() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let none = feed.filter(|v| *v > 100).await;
    let err = none.get(0).await.unwrap_err();

    assert!(matches!(err, Error::OutOfRange { index: 0, len: 0 }));
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn test_take_view_complete_from_cache_never_fetches() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    feed.get(0).await.unwrap();
    assert_eq!(source.fetch_count(), 1);

    let first_two = feed.take(2).await;
    assert!(!first_two.has_more().await);
    assert_eq!(first_two.get(1).await.unwrap(), 2);

    let err = first_two.get(2).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 2, len: 2 }));
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_take_view_caps_fetched_pages() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let first_four = feed.take(4).await;
    assert_eq!(first_four.get(3).await.unwrap(), 4);
    assert_eq!(source.fetch_count(), 2);

    // The view is locally exhausted at the cap even though the remote
    // collection goes on
    let err = first_four.get(4).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 4, len: 4 }));
    assert_eq!(source.fetch_count(), 2);

    // The base feed never saw any of it
    assert_eq!(feed.cached_len().await, 0);
    assert!(feed.has_more().await);
}

#[tokio::test]
async fn test_take_view_unaffected_by_its_derived_views() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let first_five = feed.take(5).await;
    let evens = first_five.filter(|v| v % 2 == 0).await;

    // Fully consume the derived view; it spends a copy of the cap
    assert_eq!(evens.slice(0..2).await.unwrap(), vec![2, 4]);
    let err = evens.get(2).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 2, len: 2 }));
    assert_eq!(source.fetch_count(), 2);

    // The take view still owes all five items and pages for itself
    assert_eq!(first_five.get(0).await.unwrap(), 1);
    assert_eq!(first_five.slice(0..5).await.unwrap(), vec![1, 2, 3, 4, 5]);
    assert_eq!(source.fetch_count(), 4);

    let err = first_five.get(5).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 5, len: 5 }));

    // The base feed saw none of it
    assert_eq!(feed.cached_len().await, 0);
    assert!(feed.has_more().await);
}

#[tokio::test]
async fn test_take_of_take_spends_its_own_budget() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let first_five = feed.take(5).await;
    let first_two = first_five.take(2).await;

    assert_eq!(first_two.slice(0..2).await.unwrap(), vec![1, 2]);
    let err = first_two.get(2).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 2, len: 2 }));
    assert_eq!(source.fetch_count(), 1);

    // The outer view's consumption left the inner view's cap whole
    assert_eq!(first_five.slice(0..5).await.unwrap(), vec![1, 2, 3, 4, 5]);
    let err = first_five.get(5).await.unwrap_err();
    assert!(matches!(err, Error::OutOfRange { index: 5, len: 5 }));
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn test_take_zero_is_empty() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let nothing = feed.take(0).await;
    let err = nothing.get(0).await.unwrap_err();

    assert!(matches!(err, Error::OutOfRange { index: 0, len: 0 }));
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn test_stream_yields_everything_in_order() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let items: Vec<i32> = feed.stream().try_collect().await.unwrap();
    assert_eq!(items, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn test_stream_reiterates_from_cache() {
    let source = nine_items();
    let feed = Feed::new(source.clone());

    let first: Vec<i32> = feed.stream().try_collect().await.unwrap();
    let second: Vec<i32> = feed.stream().try_collect().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn test_stream_surfaces_fetch_failures() {
    let source = Arc::new(FailingSource {
        fetches: AtomicUsize::new(0),
    });
    let feed = Feed::new(source);

    let stream = feed.stream();
    tokio::pin!(stream);

    assert_eq!(stream.next().await.unwrap().unwrap(), 1);
    assert_eq!(stream.next().await.unwrap().unwrap(), 2);
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(err.to_string().contains("backend failure"));
}

#[tokio::test]
async fn test_find_first_member_of() {
    let history_source = ScriptedSource::new(vec![
        (None, vec![10, 11, 12], Some("h1")),
        (Some("h1"), vec![13, 14, 15], None),
    ]);
    let playlist_source = ScriptedSource::new(vec![
        (None, vec![99, 13, 42], Some("p1")),
        (Some("p1"), vec![7], None),
    ]);
    let history = Feed::new(history_source.clone());
    let playlist = Feed::new(playlist_source.clone());

    // 13 is the first history entry that is also in the playlist
    let found = playlist
        .find_first_member_of(&history, |a, b| a == b)
        .await
        .unwrap();
    assert_eq!(found, Some(13));

    // A second identical search is answered entirely from both caches
    let history_fetches = history_source.fetch_count();
    let playlist_fetches = playlist_source.fetch_count();
    let again = playlist
        .find_first_member_of(&history, |a, b| a == b)
        .await
        .unwrap();
    assert_eq!(again, Some(13));
    assert_eq!(history_source.fetch_count(), history_fetches);
    assert_eq!(playlist_source.fetch_count(), playlist_fetches);
}

#[tokio::test]
async fn test_find_first_member_of_prefetches_both_sides() {
    let history_source = ScriptedSource::with_delay(vec![(None, vec![1, 2], None)], 20);
    let playlist_source = ScriptedSource::with_delay(vec![(None, vec![2, 3], None)], 20);
    let history = Feed::new(history_source.clone());
    let playlist = Feed::new(playlist_source.clone());

    let start = std::time::Instant::now();
    let found = playlist
        .find_first_member_of(&history, |a, b| a == b)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(found, Some(2));
    assert_eq!(history_source.fetch_count(), 1);
    assert_eq!(playlist_source.fetch_count(), 1);
    // Sequential prefetches would take at least twice the per-page delay
    assert!(elapsed < std::time::Duration::from_millis(35), "{elapsed:?}");
}

#[tokio::test]
async fn test_find_first_member_of_miss_is_none() {
    let history = Feed::new(ScriptedSource::new(vec![(None, vec![1, 2], None)]));
    let playlist = Feed::new(ScriptedSource::new(vec![(None, vec![8, 9], None)]));

    let found = playlist
        .find_first_member_of(&history, |a, b| a == b)
        .await
        .unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn test_find_first_member_of_empty_other() {
    let history = Feed::new(ScriptedSource::new(vec![(None, vec![], None)]));
    let playlist = Feed::new(ScriptedSource::new(vec![(None, vec![1], None)]));

    let found = playlist
        .find_first_member_of(&history, |a, b| a == b)
        .await
        .unwrap();
    assert_eq!(found, None);
}

/// Credential source that counts how often it is resolved
struct CountingCreds {
    resolutions: AtomicUsize,
}

#[async_trait]
impl CredentialSource for CountingCreds {
    async fn get(&self) -> Result<Option<Credentials>> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Credentials::new("SID=feed-test")))
    }
}

/// Credentialed fetcher that records the credentials each request carried
struct RecordingFetch {
    pages: HashMap<Option<String>, Page<i32, String>>,
    seen: Mutex<Vec<Option<String>>>,
}

impl RecordingFetch {
    fn new(script: Vec<(Option<&str>, Vec<i32>, Option<&str>)>) -> Arc<Self> {
        let pages = script
            .into_iter()
            .map(|(token, items, next)| {
                (
                    token.map(str::to_string),
                    Page {
                        items,
                        next_token: next.map(str::to_string),
                    },
                )
            })
            .collect();
        Arc::new(Self {
            pages,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CredentialedFetch<i32, String> for RecordingFetch {
    async fn fetch_page(
        &self,
        creds: Option<&Credentials>,
        token: Option<&String>,
    ) -> Result<Page<i32, String>> {
        self.seen
            .lock()
            .unwrap()
            .push(creds.map(|c| c.cookies().to_string()));
        match self.pages.get(&token.cloned()) {
            Some(page) => Ok(page.clone()),
            None => panic!("unscripted token: {token:?}"),
        }
    }
}

#[tokio::test]
async fn test_credentials_resolved_once_per_feed() {
    let creds = Arc::new(CountingCreds {
        resolutions: AtomicUsize::new(0),
    });
    let fetch = RecordingFetch::new(vec![
        (None, vec![1, 2], Some("t1")),
        (Some("t1"), vec![3, 4], None),
    ]);
    let feed = Feed::with_credentials(creds.clone(), fetch.clone());

    feed.get(0).await.unwrap();
    feed.get(3).await.unwrap();

    assert_eq!(creds.resolutions.load(Ordering::SeqCst), 1);
    let seen = fetch.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|c| c.as_deref() == Some("SID=feed-test")));
}

#[tokio::test]
async fn test_views_inherit_resolved_credentials() {
    let creds = Arc::new(CountingCreds {
        resolutions: AtomicUsize::new(0),
    });
    let fetch = RecordingFetch::new(vec![
        (None, vec![1, 2], Some("t1")),
        (Some("t1"), vec![3, 4], None),
    ]);
    let feed = Feed::with_credentials(creds.clone(), fetch.clone());

    feed.get(0).await.unwrap();
    let view = feed.take(4).await;
    view.get(3).await.unwrap();

    assert_eq!(creds.resolutions.load(Ordering::SeqCst), 1);
}
