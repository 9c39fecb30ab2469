//! Cache storage.
//!
//! `CacheStore` is the get/set/remove surface over opaque values with a
//! per-entry time-to-live. It knows nothing about tags or invalidation.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::warn;

use super::config::CacheConfig;

const SOURCE: &str = "cache::store";
const METRIC_CACHE_EVICT: &str = "muster_cache_evict_total";

/// Opaque cached value; readers downcast to the type they stored.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Shared key/value storage with lazy time-to-live expiry.
///
/// Writes are visible to every caller as soon as the call returns. Removing an
/// absent key is a no-op.
pub trait CacheStore: Send + Sync {
    /// Returns the live value for `key`; expired entries read as absent.
    fn get(&self, key: &str) -> Option<CachedValue>;

    /// Stores `value` until `ttl` has elapsed from now.
    ///
    /// Returns the key of another entry dropped to make room, if any.
    fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> Option<String>;

    fn remove(&self, key: &str);

    /// Drops every expired entry and returns the removed keys.
    fn purge_expired(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct CacheEntry {
    value: CachedValue,
    /// `None` when the TTL overflows the clock; such entries never expire.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// In-process LRU store bounded by `CacheConfig::max_entries`.
pub struct MemoryStore {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryStore {
    /// Create a new store with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.max_entries_non_zero())),
        }
    }

    fn lock(&self, op: &'static str) -> MutexGuard<'_, LruCache<String, CacheEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    target_module = SOURCE,
                    lock_kind = "mutex.lock",
                    result = "poisoned_recovered",
                    hint = "entries may be stale after panic in another thread",
                    "Recovered from poisoned cache lock"
                );
                poisoned.into_inner()
            }
        }
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<CachedValue> {
        let now = Instant::now();
        let mut entries = self.lock("get");
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(Arc::clone(&entry.value)),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> Option<String> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        let (displaced, _) = self.lock("set").push(key.to_string(), entry)?;
        // `push` also hands back the old value when `key` was already present.
        if displaced == key {
            return None;
        }
        counter!(METRIC_CACHE_EVICT).increment(1);
        Some(displaced)
    }

    fn remove(&self, key: &str) {
        self.lock("remove").pop(key);
    }

    fn purge_expired(&self) -> Vec<String> {
        let now = Instant::now();
        let mut entries = self.lock("purge_expired");
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key.as_str());
        }
        expired
    }

    fn len(&self) -> usize {
        self.lock("len").len()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn value(text: &str) -> CachedValue {
        Arc::new(text.to_string())
    }

    fn read(store: &MemoryStore, key: &str) -> Option<String> {
        store
            .get(key)
            .and_then(|value| value.downcast::<String>().ok())
            .map(|value| value.as_ref().clone())
    }

    #[test]
    fn set_get_remove_roundtrip() {
        let store = MemoryStore::new(&CacheConfig::default());

        assert!(store.get("CategoryData").is_none());
        store.set("CategoryData", value("page"), Duration::from_secs(60));
        assert_eq!(read(&store, "CategoryData").as_deref(), Some("page"));

        store.remove("CategoryData");
        assert!(store.get("CategoryData").is_none());
    }

    #[test]
    fn removing_absent_key_is_noop() {
        let store = MemoryStore::new(&CacheConfig::default());
        store.remove("missing");
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_lazily_after_ttl() {
        let store = MemoryStore::new(&CacheConfig::default());
        store.set("k", value("v"), Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.get("k").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get("k").is_none());
        // The expired read also drops the entry.
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_expired_returns_dropped_keys() {
        let store = MemoryStore::new(&CacheConfig::default());
        store.set("short", value("a"), Duration::from_secs(10));
        store.set("long", value("b"), Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(11)).await;
        let purged = store.purge_expired();

        assert_eq!(purged, vec!["short".to_string()]);
        assert_eq!(store.len(), 1);
        assert!(store.get("long").is_some());
    }

    #[test]
    fn lru_bound_evicts_oldest_entry() {
        let config = CacheConfig {
            max_entries: 2,
            ..Default::default()
        };
        let store = MemoryStore::new(&config);
        let ttl = Duration::from_secs(60);

        assert_eq!(store.set("a", value("1"), ttl), None);
        assert_eq!(store.set("b", value("2"), ttl), None);
        assert_eq!(store.set("c", value("3"), ttl).as_deref(), Some("a"));

        assert!(store.get("a").is_none());
        assert!(store.get("b").is_some());
        assert!(store.get("c").is_some());
    }

    #[test]
    fn set_replaces_existing_value() {
        let store = MemoryStore::new(&CacheConfig::default());
        store.set("k", value("old"), Duration::from_secs(60));
        assert_eq!(store.set("k", value("new"), Duration::from_secs(60)), None);
        assert_eq!(read(&store, "k").as_deref(), Some("new"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = MemoryStore::new(&CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .lock()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.set("k", value("v"), Duration::from_secs(60));
        assert!(store.get("k").is_some());
    }
}
