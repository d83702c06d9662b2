//! Token exchange and cookie derivation
//!
//! # Overview
//!
//! The site trusts cookies, not OAuth tokens, so durable access takes two
//! hops: exchange a long-lived refresh token for a short-lived access
//! token, then walk the account session endpoints to turn that access token
//! into a cookie header. [`AuthClient`] implements both hops and plugs into
//! [`RefreshingCredentials`](crate::creds::RefreshingCredentials) as its
//! [`TokenExchanger`](crate::creds::TokenExchanger).
//!
//! [`FileTokenSink`] persists exchanged access tokens across runs.

mod client;
mod types;

pub use client::{AuthClient, FileTokenSink};
pub use types::{AccessInfo, OauthConfig};
