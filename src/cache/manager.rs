//! Cache manager for indicator payloads
//!
//! Provides a `CacheStore` that serves fresh payloads from disk, fetches when
//! they are stale, and falls back to stale data whenever a fetch fails or the
//! provider rejects the request.

use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use tracing::{debug, info, warn};

use super::store::{CacheDocument, FileStore, KeyValueStore};
use crate::data::ProviderPayload;

/// Time-to-live for indicator payloads in hours
pub const INDICATOR_TTL_HOURS: i64 = 24;

/// File name of the indicator cache document
pub const INDICATOR_CACHE_FILE: &str = "indicators.json";

/// How freshness is judged for a key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FreshnessPolicy {
    /// Every key shares the document timestamp, so refetching one key renews
    /// all of them for the rest of the TTL window
    #[default]
    DocumentWide,
    /// Each key is judged by its own fetch time; keys without one are stale
    PerKey,
}

/// Returns the XDG-compliant cache directory (`~/.cache/econpulse/` on Linux)
///
/// Returns `None` if the directory cannot be determined (e.g., no home directory).
pub fn default_cache_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "econpulse")?;
    Some(project_dirs.cache_dir().to_path_buf())
}

/// TTL cache with stale-on-error fallback for indicator payloads
#[derive(Debug, Clone)]
pub struct CacheStore<S = FileStore> {
    store: S,
    ttl: Duration,
    policy: FreshnessPolicy,
}

impl CacheStore<FileStore> {
    /// Creates a CacheStore using the XDG cache directory
    pub fn new() -> Option<Self> {
        default_cache_dir().map(Self::with_dir)
    }

    /// Creates a CacheStore whose document lives in the given directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self::with_store(FileStore::new(cache_dir.join(INDICATOR_CACHE_FILE)))
    }
}

impl<S: KeyValueStore> CacheStore<S> {
    /// Wraps an arbitrary key-value store
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            ttl: Duration::hours(INDICATOR_TTL_HOURS),
            policy: FreshnessPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FreshnessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the payload for `key`, fetching only when the cache is stale
    ///
    /// # Returns
    /// * `Some(ProviderPayload::Ok)` - fresh cached data, newly fetched data,
    ///   or stale data served because the fetch failed or was rejected
    /// * `Some(ProviderPayload::RateLimited | Malformed)` - the rejected
    ///   payload, unchanged, when no stale data exists
    /// * `None` - the fetch failed and nothing was cached
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Option<ProviderPayload>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ProviderPayload, E>>,
        E: Display,
    {
        self.get_or_fetch_at(key, Utc::now(), fetch).await
    }

    /// Same as `get_or_fetch`, evaluated at the given instant
    pub async fn get_or_fetch_at<F, Fut, E>(
        &self,
        key: &str,
        now: DateTime<Utc>,
        fetch: F,
    ) -> Option<ProviderPayload>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ProviderPayload, E>>,
        E: Display,
    {
        let document = self.store.get_all().await;

        if self.is_fresh(&document, key, now) {
            if let Some(cached) = document.data.get(key) {
                debug!(key, "serving fresh cached payload");
                return Some(ProviderPayload::Ok(cached.clone()));
            }
        }

        match fetch().await {
            Ok(ProviderPayload::Ok(value)) => {
                // Write failures must not cost us the data we just fetched
                if let Err(e) = self.store.put(key, value.clone(), now).await {
                    warn!(key, error = %e, "failed to persist fetched payload");
                } else {
                    info!(key, "cached fresh payload");
                }
                Some(ProviderPayload::Ok(value))
            }
            Ok(rejected) => match self.stale(key).await {
                Some(stale) => {
                    warn!(key, "provider rejected request, serving stale payload");
                    Some(stale)
                }
                None => {
                    warn!(key, "provider rejected request and nothing is cached");
                    Some(rejected)
                }
            },
            Err(e) => {
                let stale = self.stale(key).await;
                warn!(key, error = %e, has_stale = stale.is_some(), "fetch failed");
                stale
            }
        }
    }

    /// Whether the cached value for `key` is still within its TTL
    fn is_fresh(&self, document: &CacheDocument, key: &str, now: DateTime<Utc>) -> bool {
        let written = match self.policy {
            FreshnessPolicy::DocumentWide => document.timestamp,
            FreshnessPolicy::PerKey => document.fetched_at.get(key).copied(),
        };
        written.is_some_and(|written| now - written < self.ttl)
    }

    /// Re-reads the store for a stale fallback, picking up other writers' data
    async fn stale(&self, key: &str) -> Option<ProviderPayload> {
        self.store.get(key).await.map(ProviderPayload::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn create_test_cache() -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheStore::with_dir(temp_dir.path().to_path_buf());
        (cache, temp_dir)
    }

    fn wti_payload(value: &str) -> Value {
        json!({"name": "WTI", "data": [{"date": "2024-01-01", "value": value}]})
    }

    async fn ok(value: Value) -> Result<ProviderPayload, String> {
        Ok(ProviderPayload::classify(value))
    }

    #[tokio::test]
    async fn test_missing_file_fetches_once_then_serves_cache() {
        let (cache, temp_dir) = create_test_cache();
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_fetch("wti", || {
                calls.fetch_add(1, Ordering::SeqCst);
                ok(wti_payload("70.5"))
            })
            .await;
        assert_eq!(first, Some(ProviderPayload::Ok(wti_payload("70.5"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(temp_dir.path().join(INDICATOR_CACHE_FILE).exists());

        let second = cache
            .get_or_fetch("wti", || {
                calls.fetch_add(1, Ordering::SeqCst);
                ok(wti_payload("99.0"))
            })
            .await;
        assert_eq!(second, Some(ProviderPayload::Ok(wti_payload("70.5"))));
        assert_eq!(calls.load(Ordering::SeqCst), 1, "fetch must not run within TTL");
    }

    #[tokio::test]
    async fn test_expired_cache_refetches() {
        let (cache, _temp_dir) = create_test_cache();
        let start = Utc::now();

        cache.get_or_fetch_at("wti", start, || ok(wti_payload("70.5"))).await;
        let later = start + Duration::hours(INDICATOR_TTL_HOURS);
        let result = cache.get_or_fetch_at("wti", later, || ok(wti_payload("72.0"))).await;

        assert_eq!(result, Some(ProviderPayload::Ok(wti_payload("72.0"))));
    }

    #[tokio::test]
    async fn test_rate_limited_fetch_serves_stale_data() {
        let (cache, _temp_dir) = create_test_cache();
        let start = Utc::now();
        cache.get_or_fetch_at("wti", start, || ok(wti_payload("70.5"))).await;

        let later = start + Duration::hours(25);
        let result = cache
            .get_or_fetch_at("wti", later, || ok(json!({"Note": "API call frequency exceeded"})))
            .await;

        assert_eq!(result, Some(ProviderPayload::Ok(wti_payload("70.5"))));
    }

    #[tokio::test]
    async fn test_rate_limited_without_stale_returns_payload_unchanged() {
        let (cache, temp_dir) = create_test_cache();
        let marker = json!({"Information": "rate limit"});

        let result = cache.get_or_fetch("wti", || ok(marker.clone())).await;

        assert_eq!(result, Some(ProviderPayload::RateLimited(marker)));
        assert!(
            !temp_dir.path().join(INDICATOR_CACHE_FILE).exists(),
            "rejected payloads must not be cached"
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_is_not_cached() {
        let (cache, _temp_dir) = create_test_cache();

        let result = cache.get_or_fetch("wti", || ok(json!({"name": "WTI"}))).await;

        assert!(matches!(result, Some(ProviderPayload::Malformed(_))));
        assert!(cache.store().get("wti").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_error_serves_stale_or_none() {
        let (cache, _temp_dir) = create_test_cache();

        let nothing = cache
            .get_or_fetch("wti", || async { Err::<ProviderPayload, _>("connection refused") })
            .await;
        assert!(nothing.is_none());

        let start = Utc::now();
        cache.get_or_fetch_at("wti", start, || ok(wti_payload("70.5"))).await;
        let later = start + Duration::hours(48);
        let stale = cache
            .get_or_fetch_at("wti", later, || async {
                Err::<ProviderPayload, _>("connection refused")
            })
            .await;
        assert_eq!(stale, Some(ProviderPayload::Ok(wti_payload("70.5"))));
    }

    #[tokio::test]
    async fn test_document_wide_timestamp_renews_all_keys() {
        let (cache, _temp_dir) = create_test_cache();
        let start = Utc::now();
        cache.get_or_fetch_at("wti", start, || ok(wti_payload("70.5"))).await;

        // Refreshing cpi 23 hours later rewrites the shared timestamp
        let refresh = start + Duration::hours(23);
        cache.get_or_fetch_at("cpi", refresh, || ok(json!({"data": []}))).await;

        // wti is now 30 hours old but still counts as fresh
        let later = start + Duration::hours(30);
        let calls = AtomicUsize::new(0);
        let result = cache
            .get_or_fetch_at("wti", later, || {
                calls.fetch_add(1, Ordering::SeqCst);
                ok(wti_payload("80.0"))
            })
            .await;

        assert_eq!(result, Some(ProviderPayload::Ok(wti_payload("70.5"))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_per_key_policy_judges_each_key() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheStore::with_dir(temp_dir.path().to_path_buf())
            .with_policy(FreshnessPolicy::PerKey);
        let start = Utc::now();
        cache.get_or_fetch_at("wti", start, || ok(wti_payload("70.5"))).await;

        let refresh = start + Duration::hours(23);
        cache.get_or_fetch_at("cpi", refresh, || ok(json!({"data": []}))).await;

        let later = start + Duration::hours(30);
        let result = cache.get_or_fetch_at("wti", later, || ok(wti_payload("80.0"))).await;

        assert_eq!(result, Some(ProviderPayload::Ok(wti_payload("80.0"))));
    }

    #[tokio::test]
    async fn test_fresh_document_without_key_fetches() {
        let (cache, _temp_dir) = create_test_cache();
        cache.get_or_fetch("wti", || ok(wti_payload("70.5"))).await;

        let calls = AtomicUsize::new(0);
        cache
            .get_or_fetch("cpi", || {
                calls.fetch_add(1, Ordering::SeqCst);
                ok(json!({"data": []}))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unwritable_cache_still_returns_fetched_data() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the cache directory should be makes every write fail
        let blocker = temp_dir.path().join("blocked");
        std::fs::write(&blocker, "not a directory").unwrap();
        let cache = CacheStore::with_dir(blocker);

        let result = cache.get_or_fetch("wti", || ok(wti_payload("70.5"))).await;

        assert_eq!(result, Some(ProviderPayload::Ok(wti_payload("70.5"))));
    }

    #[test]
    fn test_default_cache_dir_is_xdg_compliant() {
        if let Some(dir) = default_cache_dir() {
            assert!(dir.to_string_lossy().contains("econpulse"));
        }
        // Test passes if no home directory is available (e.g., in CI)
    }
}
