//! Extracting data from scraped page markup
//!
//! The web app embeds everything a client needs in its HTML: the initial
//! data blob, per-session config tokens and the innertube API parameters.
//! All of it lives on minified single-line scripts, so the extractors here
//! find a marker and parse a single JSON value from it rather than trying
//! to regex-match a whole object literal.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// Older pages assign the blob to a `window` property
static INITIAL_DATA_WINDOW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"window\["ytInitialData"\]\s*=\s*"#).unwrap());

/// Newer pages declare it as a plain script variable
static INITIAL_DATA_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var ytInitialData\s*=\s*").unwrap());

static IDENTITY_TOKEN: LazyLock<Regex> = LazyLock::new(|| config_token_regex("ID_TOKEN"));
static XSRF_TOKEN: LazyLock<Regex> = LazyLock::new(|| config_token_regex("XSRF_TOKEN"));

static INNERTUBE_KEY_LOWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""innertubeApiKey":"([^"]+)""#).unwrap());
static INNERTUBE_KEY_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":"([^"]+)""#).unwrap());
static INNERTUBE_VERSION_LOWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""innertubeContextClientVersion":"([^"]+)""#).unwrap());
static INNERTUBE_VERSION_UPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_CLIENT_VERSION":"([^"]+)""#).unwrap());

static SAPISID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"SAPISID=([^;]+)").unwrap());

/// Config tokens appear either quoted or as an explicit `null`
fn config_token_regex(name: &str) -> Regex {
    Regex::new(&format!(r#"['"]{name}['"][,: ]+(?:null|"([^"]+)")"#)).unwrap()
}

/// Extract the initial data blob from page markup
pub(super) fn initial_data(html: &str) -> Result<Value> {
    json_after(html, &INITIAL_DATA_WINDOW)
        .or_else(|| json_after(html, &INITIAL_DATA_VAR))
        .ok_or_else(|| Error::scrape("no initial data blob in page markup"))
}

/// Parse one JSON value starting right after `marker`
fn json_after(html: &str, marker: &Regex) -> Option<Value> {
    let found = marker.find(html)?;
    let mut stream = serde_json::Deserializer::from_str(&html[found.end()..]).into_iter();
    stream.next()?.ok()
}

/// The per-session identity token, if this page advertised one
pub(super) fn identity_token(html: &str) -> Option<String> {
    config_token(&IDENTITY_TOKEN, html)
}

/// The anti-forgery token used by legacy continuations
pub(super) fn xsrf_token(html: &str) -> Option<String> {
    config_token(&XSRF_TOKEN, html)
}

fn config_token(regex: &Regex, html: &str) -> Option<String> {
    let captures = regex.captures(html)?;
    // No capture group means the config held an explicit null
    let token = captures.get(1)?;
    Some(token.as_str().replace("\\u003d", "="))
}

/// Innertube API key, checking both config spellings
pub(super) fn innertube_api_key(html: &str) -> Option<String> {
    first_capture(&INNERTUBE_KEY_LOWER, html).or_else(|| first_capture(&INNERTUBE_KEY_UPPER, html))
}

/// Innertube client version, checking both config spellings
pub(super) fn innertube_client_version(html: &str) -> Option<String> {
    first_capture(&INNERTUBE_VERSION_LOWER, html)
        .or_else(|| first_capture(&INNERTUBE_VERSION_UPPER, html))
}

fn first_capture(regex: &Regex, html: &str) -> Option<String> {
    regex
        .captures(html)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// Derive the request authorization hash from the session cookies
///
/// The site accepts `SAPISIDHASH {millis}_{sha1}` where the digest covers
/// `"{millis} {sapisid} {origin}"`. `None` when the cookie header carries
/// no SAPISID, in which case the request goes out unauthorized.
pub(super) fn session_hash(cookies: &str, origin: &str) -> Option<String> {
    let sapisid = SAPISID.captures(cookies)?.get(1)?.as_str();
    let epoch = chrono::Utc::now().timestamp_millis();

    let mut hasher = Sha1::new();
    hasher.update(format!("{epoch} {sapisid} {origin}").as_bytes());
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Some(format!("{epoch}_{hex}"))
}
