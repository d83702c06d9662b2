//! Scrape adapter for the site's web frontend
//!
//! # Overview
//!
//! Collections without a public API are read the way a browser reads
//! them: fetch the page markup, pull the embedded initial data blob, walk
//! it to the item section, then page onward through the continuation API
//! the frontend itself uses. The moving parts:
//!
//! - [`markup`](self): extractors for the data blob and per-session
//!   config values hidden in page scripts
//! - [`SectionNode`]: the extracted item section, normalized across the
//!   frontend's three generations of continuation shapes
//! - [`ScrapeClient`]: drives markup loads and continuation requests,
//!   carrying harvested session parameters between them
//! - [`SectionSource`]: adapts one scraped collection into feed pages
//!
//! Everything here deals in raw `serde_json::Value` renderers; turning
//! renderers into typed items is the attached parser's job.

mod client;
mod markup;
mod section;
mod source;

pub use client::{ScrapeClient, DEFAULT_BASE_URL};
pub use section::{text_from_node, ScrapeToken, SectionNode};
pub use source::{SectionParser, SectionSource};
