//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::scrape::DEFAULT_BASE_URL;

/// Lazy feeds over a video site's watch history and playlists
#[derive(Parser, Debug)]
#[command(name = "tubefeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Cookie header to sign in with
    #[arg(long, global = true, value_name = "HEADER")]
    pub cookies: Option<String>,

    /// File holding the cookie header
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "cookies")]
    pub cookies_file: Option<PathBuf>,

    /// File holding a browser "copy as cURL" paste to take cookies from
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        conflicts_with_all = ["cookies", "cookies_file"]
    )]
    pub curl_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// Frontend to scrape
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL, value_name = "URL")]
    pub base_url: String,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print recent watch-history entries (requires credentials)
    History {
        /// Entries to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Print a playlist's entries
    Playlist {
        /// Playlist identifier (the `list=` URL parameter)
        id: String,

        /// Entries to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Find the playlist entry played most recently (requires credentials)
    Resume {
        /// Playlist identifier (the `list=` URL parameter)
        playlist_id: String,

        /// History entries to search, newest first
        #[arg(long, default_value = "200")]
        search_limit: usize,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one entry per line)
    Json,
    /// Human-readable output
    Pretty,
}
