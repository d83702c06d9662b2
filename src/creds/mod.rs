//! Credential sources
//!
//! # Overview
//!
//! Feeds authenticate through a [`CredentialSource`]: something that can
//! produce (and optionally accept back) an opaque [`Credentials`] value.
//! Four sources cover the practical cases:
//!
//! - [`NoCredentials`]: anonymous access
//! - [`StaticCredentials`]: a fixed cookie header (from a file, a pasted
//!   cURL command, or a literal)
//! - [`CachedCredentials`]: wraps another source and re-queries it at most
//!   once per expiry window
//! - [`RefreshingCredentials`]: holds a long-lived refresh secret and
//!   exchanges it for short-lived access credentials on demand, one
//!   exchange per expiry cycle no matter how many callers race
//!
//! Use [`cached`] to add the caching layer without worrying about double
//! wrapping.

mod builder;
mod refresh;
mod source;
mod types;

pub use builder::CredentialsBuilder;
pub use refresh::{RefreshingCredentials, TokenExchanger, TokenSink};
pub use source::{cached, CachedCredentials, CredentialSource, NoCredentials, StaticCredentials};
pub use types::Credentials;

#[cfg(test)]
mod tests;
