//! Tests for the credential sources

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;

use crate::auth::AccessInfo;
use crate::error::Result;

/// Wrapped source that counts how often it is consulted
struct CountingSource {
    value: Option<Credentials>,
    gets: AtomicUsize,
    sets: Mutex<Vec<Credentials>>,
}

impl CountingSource {
    fn some(cookies: &str) -> Self {
        Self {
            value: Some(Credentials::new(cookies)),
            gets: AtomicUsize::new(0),
            sets: Mutex::new(Vec::new()),
        }
    }

    fn none() -> Self {
        Self {
            value: None,
            gets: AtomicUsize::new(0),
            sets: Mutex::new(Vec::new()),
        }
    }

    fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for CountingSource {
    async fn get(&self) -> Result<Option<Credentials>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.value.clone())
    }

    async fn set(&self, creds: Credentials) -> Result<()> {
        self.sets.lock().unwrap().push(creds);
        Ok(())
    }
}

/// Exchanger that counts exchanges and derivations, with a small delay so
/// concurrent callers genuinely overlap
struct StubExchanger {
    exchanges: AtomicUsize,
    derivations: AtomicUsize,
}

impl StubExchanger {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            exchanges: AtomicUsize::new(0),
            derivations: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TokenExchanger for StubExchanger {
    async fn refresh_access(&self, refresh_token: &str) -> Result<AccessInfo> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        Ok(AccessInfo::expires_in(
            format!("access-for-{refresh_token}"),
            3600,
        ))
    }

    async fn cookies_for_access(&self, access: &AccessInfo) -> Result<String> {
        self.derivations.fetch_add(1, Ordering::SeqCst);
        Ok(format!("SID={}", access.access_token))
    }
}

struct RecordingSink {
    persisted: Mutex<Vec<AccessInfo>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            persisted: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TokenSink for RecordingSink {
    async fn persist(&self, access: &AccessInfo) -> Result<()> {
        self.persisted.lock().unwrap().push(access.clone());
        Ok(())
    }
}

#[test]
fn test_credentials_debug_redacts_value() {
    let creds = Credentials::new("SID=super-secret-cookie");
    let debug = format!("{creds:?}");

    assert!(!debug.contains("super-secret-cookie"), "leaked: {debug}");
    assert!(debug.contains("bytes"), "no length marker: {debug}");
}

#[tokio::test]
async fn test_no_credentials_is_anonymous() {
    let source = NoCredentials;

    assert!(source.get().await.unwrap().is_none());
    assert!(!source.needs_cache_layer());

    // set has nothing to do but must not fail
    source.set(Credentials::new("SID=abc")).await.unwrap();
}

#[tokio::test]
async fn test_static_credentials_yields_fixed_value() {
    let source = StaticCredentials::new(Credentials::new("SID=abc"));

    let first = source.get().await.unwrap().unwrap();
    let second = source.get().await.unwrap().unwrap();
    assert_eq!(first.cookies(), "SID=abc");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_cached_queries_inner_once_per_window() {
    let inner = Arc::new(CountingSource::some("SID=abc"));
    let cache = CachedCredentials::new(inner.clone());

    let first = cache.get().await.unwrap().unwrap();
    let second = cache.get().await.unwrap().unwrap();

    assert_eq!(first.cookies(), "SID=abc");
    assert_eq!(first, second);
    assert_eq!(inner.get_count(), 1);
}

#[tokio::test]
async fn test_cached_requeries_after_window_expires() {
    let inner = Arc::new(CountingSource::some("SID=abc"));
    let cache = CachedCredentials::with_ttl(inner.clone(), Duration::zero());

    cache.get().await.unwrap();
    cache.get().await.unwrap();

    assert_eq!(inner.get_count(), 2);
}

#[tokio::test]
async fn test_cached_does_not_cache_anonymous_answers() {
    let inner = Arc::new(CountingSource::none());
    let cache = CachedCredentials::new(inner.clone());

    assert!(cache.get().await.unwrap().is_none());
    assert!(cache.get().await.unwrap().is_none());

    // An absent answer must not be pinned for the whole window
    assert_eq!(inner.get_count(), 2);
}

#[tokio::test]
async fn test_cached_set_updates_cache_and_delegates() {
    let inner = Arc::new(CountingSource::some("SID=old"));
    let cache = CachedCredentials::new(inner.clone());

    cache.set(Credentials::new("SID=new")).await.unwrap();

    // The updated value is served from cache without consulting the inner
    // source, and the inner source still saw the update
    let got = cache.get().await.unwrap().unwrap();
    assert_eq!(got.cookies(), "SID=new");
    assert_eq!(inner.get_count(), 0);

    let sets = inner.sets.lock().unwrap();
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].cookies(), "SID=new");
}

#[tokio::test]
async fn test_cached_composition_is_idempotent() {
    let base: Arc<dyn CredentialSource> = Arc::new(StaticCredentials::new(Credentials::new("a=1")));

    let once = cached(base);
    let twice = cached(once.clone());
    assert!(Arc::ptr_eq(&once, &twice));

    // Anonymous sources gain nothing from caching either
    let anonymous: Arc<dyn CredentialSource> = Arc::new(NoCredentials);
    let wrapped = cached(anonymous.clone());
    assert!(Arc::ptr_eq(&anonymous, &wrapped));
}

#[tokio::test]
async fn test_refreshing_exchanges_once_for_concurrent_callers() {
    let exchanger = StubExchanger::new();
    let creds = RefreshingCredentials::new("refresh-1", exchanger.clone());

    let (a, b) = tokio::join!(creds.get(), creds.get());

    let a = a.unwrap().unwrap();
    let b = b.unwrap().unwrap();
    assert_eq!(a.cookies(), "SID=access-for-refresh-1");
    assert_eq!(a, b);
    assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refreshing_uses_valid_seed_without_exchange() {
    let exchanger = StubExchanger::new();
    let creds = RefreshingCredentials::new("refresh-1", exchanger.clone())
        .with_access(AccessInfo::expires_in("seed-token", 3600));

    let got = creds.get().await.unwrap().unwrap();

    assert_eq!(got.cookies(), "SID=seed-token");
    assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_refreshing_replaces_expired_seed() {
    let exchanger = StubExchanger::new();
    let creds = RefreshingCredentials::new("refresh-1", exchanger.clone())
        .with_access(AccessInfo::expires_in("stale-token", -60));

    let got = creds.get().await.unwrap().unwrap();

    assert_eq!(got.cookies(), "SID=access-for-refresh-1");
    assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refreshing_persists_through_sink() {
    let exchanger = StubExchanger::new();
    let sink = RecordingSink::new();
    let creds = RefreshingCredentials::new("refresh-1", exchanger).with_sink(sink.clone());

    creds.get().await.unwrap();

    let persisted = sink.persisted.lock().unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].access_token, "access-for-refresh-1");
}

#[tokio::test]
async fn test_refreshing_set_is_a_noop() {
    let exchanger = StubExchanger::new();
    let creds = RefreshingCredentials::new("refresh-1", exchanger.clone());

    creds.set(Credentials::new("SID=pushed")).await.unwrap();

    // The pushed value is ignored; access still comes from the exchange
    let got = creds.get().await.unwrap().unwrap();
    assert_eq!(got.cookies(), "SID=access-for-refresh-1");
}

#[tokio::test]
async fn test_cached_refreshing_derives_cookies_once_per_window() {
    let exchanger = StubExchanger::new();
    let refreshing: Arc<dyn CredentialSource> =
        Arc::new(RefreshingCredentials::new("refresh-1", exchanger.clone()));
    let source = cached(refreshing);

    source.get().await.unwrap();
    source.get().await.unwrap();

    assert_eq!(exchanger.exchanges.load(Ordering::SeqCst), 1);
    assert_eq!(exchanger.derivations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_builder_literal_cookies() {
    let creds = CredentialsBuilder::new()
        .cookies("SID=abc; HSID=def")
        .build()
        .unwrap();

    assert_eq!(creds.cookies(), "SID=abc; HSID=def");
}

#[tokio::test]
async fn test_builder_cookies_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cookies.txt");
    std::fs::write(&path, "SID=abc; HSID=def\n").unwrap();

    let creds = CredentialsBuilder::new()
        .cookies_from_file(&path)
        .await
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(creds.cookies(), "SID=abc; HSID=def");
}

#[tokio::test]
async fn test_builder_cookies_from_curl() {
    let curl = concat!(
        "curl 'https://www.youtube.com/feed/history' \\\n",
        "  -H 'accept: text/html' \\\n",
        "  -H 'Cookie: SID=abc; HSID=def' \\\n",
        "  -H 'user-agent: Mozilla/5.0'",
    );

    let creds = CredentialsBuilder::new()
        .cookies_from_curl(curl)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(creds.cookies(), "SID=abc; HSID=def");
}

#[tokio::test]
async fn test_builder_curl_without_cookie_header() {
    let result = CredentialsBuilder::new().cookies_from_curl("curl 'https://example.com'");

    assert!(result.is_err());
    let err = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(err.contains("no 'cookie: ...' header"), "unexpected: {err}");
}

#[tokio::test]
async fn test_builder_cookies_from_curl_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("request.curl");
    std::fs::write(&path, "curl 'https://x' -H 'cookie: SID=from-file'").unwrap();

    let creds = CredentialsBuilder::new()
        .cookies_from_curl_file(&path)
        .await
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(creds.cookies(), "SID=from-file");
}

#[test]
fn test_builder_requires_some_input() {
    let result = CredentialsBuilder::new().build();

    assert!(result.is_err());
    let err = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(err.contains("no cookie input"), "unexpected: {err}");
}
