//! Watch history feed
//!
//! The signed-in account's watch history as a lazy feed, most recent
//! first, read by scraping the history page of the web frontend.

use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;

use crate::creds::CredentialSource;
use crate::error::Result;
use crate::feed::{Feed, Page};
use crate::scrape::{
    text_from_node, ScrapeClient, ScrapeToken, SectionNode, SectionSource, DEFAULT_BASE_URL,
};
use crate::types::Video;

/// Path of the history page on the frontend
const HISTORY_PATH: &str = "/feed/history";

/// The account's watch history, most recently watched first
///
/// The history page is per-account: anonymous requests get a sign-in
/// prompt instead of a feed, surfaced as [`Error::AuthRequired`] on the
/// first read.
///
/// [`Error::AuthRequired`]: crate::error::Error::AuthRequired
pub struct WatchHistory {
    feed: Feed<Video, ScrapeToken>,
}

impl WatchHistory {
    /// Open the watch history of the account `credentials` signs in as
    pub fn new(credentials: Arc<dyn CredentialSource>) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    /// Open a watch history served from a different frontend
    pub fn with_base_url(
        credentials: Arc<dyn CredentialSource>,
        base_url: impl Into<String>,
    ) -> Self {
        let client = Arc::new(ScrapeClient::new(base_url));
        let source = SectionSource::new(client, HISTORY_PATH, parse_history_section);
        Self::from_feed(Feed::with_credentials(credentials, Arc::new(source)))
    }

    /// Wrap an existing feed of history entries
    pub fn from_feed(feed: Feed<Video, ScrapeToken>) -> Self {
        Self { feed }
    }

    /// The underlying feed
    pub fn feed(&self) -> &Feed<Video, ScrapeToken> {
        &self.feed
    }

    /// Derive a history view keeping only entries matching `predicate`
    pub async fn filter(
        &self,
        predicate: impl Fn(&Video) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::from_feed(self.feed.filter(predicate).await)
    }

    /// Derive a history view of at most the `count` most recent entries
    pub async fn take(&self, count: usize) -> Self {
        Self::from_feed(self.feed.take(count).await)
    }
}

impl Deref for WatchHistory {
    type Target = Feed<Video, ScrapeToken>;

    fn deref(&self) -> &Self::Target {
        &self.feed
    }
}

/// Parse one history section: a flat list of video renderers
///
/// Renderers of other kinds (ads, shelf headers) are skipped.
fn parse_history_section(section: &SectionNode) -> Result<Page<Video, ScrapeToken>> {
    let items = section
        .contents
        .iter()
        .filter_map(parse_video_renderer)
        .collect();
    Ok(Page {
        items,
        next_token: section.next_token(),
    })
}

fn parse_video_renderer(item: &Value) -> Option<Video> {
    let renderer = item.get("videoRenderer")?;
    Some(Video {
        id: renderer.get("videoId")?.as_str()?.to_string(),
        title: text_from_node(renderer.get("title")),
        description: text_from_node(renderer.get("descriptionSnippet")),
    })
}
