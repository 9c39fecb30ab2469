//! Background expiry sweep.
//!
//! Lazy expiry on read keeps results correct on its own; the sweep only
//! bounds memory held by entries nobody reads again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::registry::TagRegistry;
use super::store::CacheStore;

/// Purge expired entries and forget their keys. Returns how many were purged.
pub fn sweep_once(store: &dyn CacheStore, registry: &TagRegistry) -> usize {
    let purged = store.purge_expired();
    if purged.is_empty() {
        return 0;
    }
    registry.prune(&purged, |key| store.get(key).is_some());
    debug!(cache = "sweep", purged = purged.len(), "Expired cache entries purged");
    purged.len()
}

/// Run [`sweep_once`] every `every` until the returned task is aborted.
pub fn spawn_sweeper(
    store: Arc<dyn CacheStore>,
    registry: Arc<TagRegistry>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // first tick is immediate
        loop {
            interval.tick().await;
            sweep_once(store.as_ref(), &registry);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::keys::Tag;
    use crate::cache::store::MemoryStore;

    const CATEGORY: Tag = Tag::from_static("CategoryData");

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_expired_keys_from_registry() {
        let store = MemoryStore::new(&CacheConfig::default());
        let registry = TagRegistry::new();
        store.set("short", Arc::new(()), Duration::from_secs(5));
        store.set("long", Arc::new(()), Duration::from_secs(500));
        registry.register(&CATEGORY, "short");
        registry.register(&CATEGORY, "long");

        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(sweep_once(&store, &registry), 1);
        let keys = registry.keys_of(&CATEGORY);
        assert!(!keys.contains("short"));
        assert!(keys.contains("long"));
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_sweeper_runs_on_interval() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new(&CacheConfig::default()));
        let registry = Arc::new(TagRegistry::new());
        store.set("k", Arc::new(()), Duration::from_secs(1));
        registry.register(&CATEGORY, "k");

        let handle = spawn_sweeper(store.clone(), registry.clone(), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(store.len(), 0);
        assert_eq!(registry.key_count(), 0);
        handle.abort();
    }
}
