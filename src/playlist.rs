//! Playlist feeds
//!
//! A playlist's entries as a lazy feed, in playlist order, read by
//! scraping the playlist page. Public playlists work anonymously;
//! private ones need the owning account's credentials.

use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;

use crate::creds::CredentialSource;
use crate::error::{Error, Result};
use crate::feed::{Feed, Page};
use crate::history::WatchHistory;
use crate::scrape::{
    text_from_node, ScrapeClient, ScrapeToken, SectionNode, SectionSource, DEFAULT_BASE_URL,
};
use crate::types::Video;

/// How far back [`Playlist::most_recently_played`] searches the history
/// unless told otherwise
pub const DEFAULT_SEARCH_LIMIT: usize = 200;

/// One playlist's entries, in playlist order
pub struct Playlist {
    feed: Feed<Video, ScrapeToken>,
}

impl Playlist {
    /// Open the playlist `id` on behalf of `credentials`
    pub fn new(credentials: Arc<dyn CredentialSource>, id: &str) -> Self {
        Self::with_base_url(credentials, id, DEFAULT_BASE_URL)
    }

    /// Open a playlist served from a different frontend
    pub fn with_base_url(
        credentials: Arc<dyn CredentialSource>,
        id: &str,
        base_url: impl Into<String>,
    ) -> Self {
        let client = Arc::new(ScrapeClient::new(base_url));
        let source = SectionSource::new(
            client,
            format!("/playlist?list={id}"),
            parse_playlist_section,
        );
        Self::from_feed(Feed::with_credentials(credentials, Arc::new(source)))
    }

    /// Wrap an existing feed of playlist entries
    pub fn from_feed(feed: Feed<Video, ScrapeToken>) -> Self {
        Self { feed }
    }

    /// The underlying feed
    pub fn feed(&self) -> &Feed<Video, ScrapeToken> {
        &self.feed
    }

    /// Derive a playlist view keeping only entries matching `predicate`
    pub async fn filter(
        &self,
        predicate: impl Fn(&Video) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::from_feed(self.feed.filter(predicate).await)
    }

    /// Derive a playlist view of at most the first `count` entries
    pub async fn take(&self, count: usize) -> Self {
        Self::from_feed(self.feed.take(count).await)
    }

    /// Find the playlist entry the account played most recently
    ///
    /// Scans the `limit` most recent history entries, newest first, for
    /// the first one that is also a playlist entry, and returns the
    /// playlist's copy of it. Fails with [`Error::SearchExhausted`] when
    /// none of them matches: a playlist last played further back than
    /// `limit` entries looks the same as one never played at all.
    pub async fn most_recently_played(
        &self,
        history: &WatchHistory,
        limit: usize,
    ) -> Result<Video> {
        let recent = history.take(limit).await;
        self.feed
            .find_first_member_of(recent.feed(), |entry, played| entry.id == played.id)
            .await?
            .ok_or(Error::SearchExhausted { limit })
    }
}

impl Deref for Playlist {
    type Target = Feed<Video, ScrapeToken>;

    fn deref(&self) -> &Self::Target {
        &self.feed
    }
}

/// Parse one playlist section
///
/// On the initial page the entries sit one level deeper than history
/// entries do: the section holds a single `playlistVideoListRenderer`
/// whose contents (and continuation) are the real ones. Continuation
/// pages hand back the entry renderers directly.
fn parse_playlist_section(section: &SectionNode) -> Result<Page<Video, ScrapeToken>> {
    let unwrapped;
    let section = match section
        .contents
        .first()
        .and_then(|item| item.get("playlistVideoListRenderer"))
    {
        Some(inner) => {
            unwrapped = SectionNode::from_value(inner)
                .ok_or_else(|| Error::scrape("playlist video list carries no contents"))?;
            &unwrapped
        }
        None => section,
    };

    let items = section
        .contents
        .iter()
        .filter_map(parse_playlist_renderer)
        .collect();
    Ok(Page {
        items,
        next_token: section.next_token(),
    })
}

fn parse_playlist_renderer(item: &Value) -> Option<Video> {
    let renderer = item.get("playlistVideoRenderer")?;
    Some(Video {
        id: renderer.get("videoId")?.as_str()?.to_string(),
        title: text_from_node(renderer.get("title")),
        description: text_from_node(renderer.get("descriptionSnippet")),
    })
}
