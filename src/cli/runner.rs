//! CLI runner - executes commands

use std::sync::Arc;

use futures::TryStreamExt;
use tracing::debug;

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::creds::{CredentialSource, CredentialsBuilder, NoCredentials, StaticCredentials};
use crate::error::Result;
use crate::history::WatchHistory;
use crate::playlist::Playlist;
use crate::types::Video;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::History { limit } => self.history(*limit).await,
            Commands::Playlist { id, limit } => self.playlist(id, *limit).await,
            Commands::Resume {
                playlist_id,
                search_limit,
            } => self.resume(playlist_id, *search_limit).await,
        }
    }

    /// Resolve the credential source from the cookie flags
    async fn credentials(&self) -> Result<Arc<dyn CredentialSource>> {
        let builder = if let Some(header) = &self.cli.cookies {
            CredentialsBuilder::new().cookies(header)
        } else if let Some(path) = &self.cli.cookies_file {
            CredentialsBuilder::new().cookies_from_file(path).await?
        } else if let Some(path) = &self.cli.curl_file {
            CredentialsBuilder::new().cookies_from_curl_file(path).await?
        } else {
            debug!("no cookie input, browsing anonymously");
            return Ok(Arc::new(NoCredentials));
        };
        Ok(Arc::new(StaticCredentials::new(builder.build()?)))
    }

    /// Print the most recent watch-history entries
    async fn history(&self, limit: usize) -> Result<()> {
        let creds = self.credentials().await?;
        let history = WatchHistory::with_base_url(creds, &self.cli.base_url);

        let recent = history.take(limit).await;
        let entries: Vec<Video> = recent.stream().try_collect().await?;
        self.print_entries(&entries);
        Ok(())
    }

    /// Print a playlist's entries
    async fn playlist(&self, id: &str, limit: usize) -> Result<()> {
        let creds = self.credentials().await?;
        let playlist = Playlist::with_base_url(creds, id, &self.cli.base_url);

        let head = playlist.take(limit).await;
        let entries: Vec<Video> = head.stream().try_collect().await?;
        self.print_entries(&entries);
        Ok(())
    }

    /// Find the playlist entry played most recently
    async fn resume(&self, playlist_id: &str, search_limit: usize) -> Result<()> {
        let creds = self.credentials().await?;
        let history = WatchHistory::with_base_url(Arc::clone(&creds), &self.cli.base_url);
        let playlist = Playlist::with_base_url(creds, playlist_id, &self.cli.base_url);

        let entry = playlist.most_recently_played(&history, search_limit).await?;
        self.print_entry(&entry);
        Ok(())
    }

    /// Print a list of entries in the selected format
    fn print_entries(&self, entries: &[Video]) {
        match self.cli.format {
            OutputFormat::Json => {
                for entry in entries {
                    println!("{}", serde_json::to_string(entry).unwrap_or_default());
                }
            }
            OutputFormat::Pretty => {
                for (index, entry) in entries.iter().enumerate() {
                    println!("{:>3}. {} ({})", index + 1, entry.title, entry.id);
                    if !entry.description.is_empty() {
                        println!("     {}", entry.description);
                    }
                }
            }
        }
    }

    /// Print a single entry in the selected format
    fn print_entry(&self, entry: &Video) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(entry).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{} ({})", entry.title, entry.id);
                if !entry.description.is_empty() {
                    println!("    {}", entry.description);
                }
            }
        }
    }
}
