use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::http::FeatureSource;
use crate::features::registry;

const ANONYMOUS_KEY: &str = "anonymous";

struct CacheEntry {
    features: BTreeSet<String>,
    fetched_at: Duration,
    /// Filled from the built-in defaults after a failed fetch
    fallback: bool,
}

/// Per-session cache of the enabled feature set, keyed by user.
///
/// An entry is served until it is older than `ttl`. A failed fetch caches the minimal default set
/// and is retried on the next load.
pub struct EntitlementCache<S: FeatureSource> {
    source: S,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    user_id: Option<Uuid>,
    entries: HashMap<String, CacheEntry>,
}

impl<S: FeatureSource> EntitlementCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self::with_clock(source, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(source: S, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            ttl,
            user_id: None,
            entries: HashMap::new(),
        }
    }

    fn key(&self) -> String {
        self.user_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| ANONYMOUS_KEY.to_string())
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        !entry.fallback && self.clock.now().saturating_sub(entry.fetched_at) <= self.ttl
    }

    /// Switch the session user (login/logout). Cached entries are kept per user.
    pub fn set_user(&mut self, user_id: Option<Uuid>) {
        self.user_id = user_id;
    }

    /// Enabled features for the current user, fetching when missing or stale
    pub async fn load_features(&mut self) -> BTreeSet<String> {
        let key = self.key();
        if let Some(entry) = self.entries.get(&key) {
            if self.is_fresh(entry) {
                debug!("Feature cache hit for {}", key);
                return entry.features.clone();
            }
        }

        let entry = match self.source.fetch_enabled(self.user_id).await {
            Ok(features) => CacheEntry {
                features,
                fetched_at: self.clock.now(),
                fallback: false,
            },
            Err(e) => {
                warn!("Feature fetch for {} failed, using defaults: {}", key, e);
                CacheEntry {
                    features: registry::default_client_features(),
                    fetched_at: self.clock.now(),
                    fallback: true,
                }
            }
        };

        let features = entry.features.clone();
        self.entries.insert(key, entry);
        features
    }

    /// Core features are always on; anything else must be in the cached set.
    /// Does not fetch.
    pub fn is_feature_enabled(&self, name: &str) -> bool {
        if registry::is_core_feature(name) {
            return true;
        }
        self.entries
            .get(&self.key())
            .is_some_and(|entry| entry.features.contains(name))
    }

    /// Drop the current user's entry and fetch again
    pub async fn refresh_features(&mut self) -> BTreeSet<String> {
        self.entries.remove(&self.key());
        self.load_features().await
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    /// Whether the current entry came from the defaults after a failed fetch
    pub fn is_fallback(&self) -> bool {
        self.entries.get(&self.key()).is_some_and(|entry| entry.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::clock::ManualClock;
    use crate::client::ClientError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct FakeSource {
        calls: Arc<AtomicUsize>,
        failing: Arc<AtomicBool>,
        premium_user: Option<Uuid>,
    }

    #[async_trait]
    impl FeatureSource for FakeSource {
        async fn fetch_enabled(&self, user_id: Option<Uuid>) -> Result<BTreeSet<String>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(ClientError::Api {
                    status: 500,
                    message: "boom".into(),
                });
            }
            let mut set: BTreeSet<String> = ["dashboard", "pets", "expenses"].iter().map(|s| s.to_string()).collect();
            if user_id.is_some() && user_id == self.premium_user {
                set.insert("ai-vet".to_string());
            }
            Ok(set)
        }
    }

    fn cache(source: FakeSource) -> (EntitlementCache<FakeSource>, ManualClock) {
        let clock = ManualClock::new(1_000);
        let cache = EntitlementCache::with_clock(source, Duration::from_secs(300), Arc::new(clock.clone()));
        (cache, clock)
    }

    #[tokio::test]
    async fn serves_from_cache_within_ttl() {
        let source = FakeSource::default();
        let (mut cache, clock) = cache(source.clone());

        cache.load_features().await;
        clock.advance(Duration::from_secs(299));
        cache.load_features().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // Exactly ttl old is still fresh
        clock.advance(Duration::from_secs(1));
        cache.load_features().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(1));
        cache.load_features().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sub_second_ttl_still_caches() {
        let source = FakeSource::default();
        let clock = ManualClock::new(1_000);
        let mut cache =
            EntitlementCache::with_clock(source.clone(), Duration::from_millis(900), Arc::new(clock.clone()));

        cache.load_features().await;
        cache.load_features().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_millis(900));
        cache.load_features().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_millis(1));
        cache.load_features().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn core_features_are_always_enabled() {
        let (cache, _) = cache(FakeSource::default());
        // Nothing cached yet
        assert!(cache.is_feature_enabled("dashboard"));
        assert!(cache.is_feature_enabled("profile"));
        assert!(!cache.is_feature_enabled("expenses"));
    }

    #[tokio::test]
    async fn membership_follows_the_cached_set() {
        let (mut cache, _) = cache(FakeSource::default());
        cache.load_features().await;
        assert!(cache.is_feature_enabled("expenses"));
        assert!(!cache.is_feature_enabled("ai-vet"));
    }

    #[tokio::test]
    async fn failed_fetch_falls_back_to_defaults_and_retries() {
        let source = FakeSource::default();
        source.failing.store(true, Ordering::SeqCst);
        let (mut cache, _) = cache(source.clone());

        let features = cache.load_features().await;
        assert_eq!(features, registry::default_client_features());
        assert!(cache.is_fallback());
        assert!(cache.is_feature_enabled("reminders"));

        source.failing.store(false, Ordering::SeqCst);
        let features = cache.load_features().await;
        assert!(features.contains("expenses"));
        assert!(!cache.is_fallback());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn entries_are_keyed_by_user() {
        let premium = Uuid::new_v4();
        let source = FakeSource {
            premium_user: Some(premium),
            ..Default::default()
        };
        let (mut cache, _) = cache(source.clone());

        cache.load_features().await;
        assert!(!cache.is_feature_enabled("ai-vet"));

        cache.set_user(Some(premium));
        assert!(!cache.is_feature_enabled("ai-vet"));
        cache.load_features().await;
        assert!(cache.is_feature_enabled("ai-vet"));

        // Logging out returns to the anonymous entry without a fetch
        cache.set_user(None);
        cache.load_features().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_and_invalidate_force_fetches() {
        let source = FakeSource::default();
        let (mut cache, _) = cache(source.clone());

        cache.load_features().await;
        cache.refresh_features().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        cache.invalidate_all();
        assert!(!cache.is_feature_enabled("expenses"));
        cache.load_features().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }
}
