//! CLI module
//!
//! Command-line interface for browsing scraped feeds.
//!
//! # Commands
//!
//! - `history` - Print recent watch-history entries
//! - `playlist` - Print a playlist's entries
//! - `resume` - Find the playlist entry played most recently

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
