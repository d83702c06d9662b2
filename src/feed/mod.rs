//! Lazy paginated collections
//!
//! # Overview
//!
//! A [`Feed`] is a lazily populated view of a server-paginated remote
//! collection. Items fetched so far are cached in order and never evicted;
//! a pagination cursor remembers where the next fetch resumes. Reads that
//! stay inside the cache never touch the network, reads past it fetch just
//! enough pages to answer.
//!
//! Remote backends implement [`PageSource`] (or [`CredentialedFetch`] when
//! requests need credentials) and hand the feed one page per call. Derived
//! views created by [`Feed::filter`] and [`Feed::take`] share the already
//! fetched prefix but page further on their own, leaving the base feed
//! untouched.

mod credentialed;
mod lazy;
mod types;
mod views;

pub use credentialed::{CredentialedFetch, CredentialedSource};
pub use lazy::Feed;
pub use types::{Cursor, Page, PageSource, PageToken, DEFAULT_PAGE_SIZE_HINT};

#[cfg(test)]
mod tests;
