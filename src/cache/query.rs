//! Read-through cache for paged and distinct list queries.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::{CompositeKey, CompositeKeyBuilder, KeyPart, Tag};
use super::page::{CompositePage, PageRows, PageWindow};
use super::registry::TagRegistry;
use super::store::{CacheStore, CachedValue};

const METRIC_CACHE_HIT: &str = "muster_cache_hit_total";
const METRIC_CACHE_MISS: &str = "muster_cache_miss_total";
const METRIC_STALE_POPULATE_SKIPPED: &str = "muster_cache_stale_populate_skipped_total";

/// "Get the cached result or compute and cache it" over a store and a registry.
///
/// A hit returns the stored value without touching the registry. A miss runs
/// the compute future, stores the result under the composite key and registers
/// the key under its tag. Compute errors are returned untouched and nothing is
/// cached for them.
pub struct PaginatedQueryCache {
    config: CacheConfig,
    keys: CompositeKeyBuilder,
    store: Arc<dyn CacheStore>,
    registry: Arc<TagRegistry>,
}

impl PaginatedQueryCache {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>, registry: Arc<TagRegistry>) -> Self {
        let keys = CompositeKeyBuilder::new(config.key_format);
        Self {
            config,
            keys,
            store,
            registry,
        }
    }

    /// Cached page lookup. The key is `tag`, the window index and size, then `filters`.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        tag: &Tag,
        window: PageWindow,
        filters: &[&dyn KeyPart],
        compute: F,
    ) -> Result<Arc<CompositePage<T>>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PageRows<T>, E>>,
    {
        let mut parts: Vec<&dyn KeyPart> = Vec::with_capacity(filters.len() + 2);
        parts.push(&window.index);
        parts.push(&window.size);
        parts.extend_from_slice(filters);
        let key = self.keys.build(tag, &parts);

        self.cached(tag, key, self.config.expiration, || async move {
            let rows = compute().await?;
            Ok::<_, E>(CompositePage::new(window, rows.total_records, rows.items))
        })
        .await
    }

    /// Cached unpaged, filterless list. Keyed by the bare tag.
    pub async fn get_or_compute_list<T, E, F, Fut>(
        &self,
        tag: &Tag,
        compute: F,
    ) -> Result<Arc<Vec<T>>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        let key = self.keys.build(tag, &[]);
        self.cached(tag, key, self.config.expiration, compute).await
    }

    /// Cached arbitrary value under `tag` and `parts`, with an explicit TTL.
    pub async fn get_or_compute_value<V, E, F, Fut>(
        &self,
        tag: &Tag,
        parts: &[&dyn KeyPart],
        ttl: Duration,
        compute: F,
    ) -> Result<Arc<V>, E>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key = self.keys.build(tag, parts);
        self.cached(tag, key, ttl, compute).await
    }

    async fn cached<V, E, F, Fut>(
        &self,
        tag: &Tag,
        key: CompositeKey,
        ttl: Duration,
        compute: F,
    ) -> Result<Arc<V>, E>
    where
        V: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if !self.config.enabled {
            return compute().await.map(Arc::new);
        }

        if let Some(hit) = self.lookup::<V>(tag, &key) {
            return Ok(hit);
        }

        counter!(METRIC_CACHE_MISS, "tag" => tag.to_string()).increment(1);
        debug!(cache = "query", tag = %tag, key = %key, outcome = "miss", "computing");

        let generation = self.registry.generation(tag);
        let value = Arc::new(compute().await?);

        let stored: CachedValue = value.clone();
        let mut evicted = None;
        let published = self
            .registry
            .register_if_current(tag, key.as_str(), generation, || {
                evicted = self.store.set(key.as_str(), stored, ttl);
            });
        // Pruning takes every tag entry in turn, so it must wait until ours is released.
        if let Some(evicted) = evicted {
            self.registry
                .prune([&evicted], |candidate| self.store.get(candidate).is_some());
            debug!(cache = "query", tag = %tag, key = %evicted, "evicted key forgotten");
        }
        if !published {
            counter!(METRIC_STALE_POPULATE_SKIPPED, "tag" => tag.to_string()).increment(1);
            debug!(
                cache = "query",
                tag = %tag,
                key = %key,
                "tag invalidated while computing; result not cached"
            );
        }

        Ok(value)
    }

    fn lookup<V: Any + Send + Sync>(&self, tag: &Tag, key: &CompositeKey) -> Option<Arc<V>> {
        let cached = self.store.get(key.as_str())?;
        match cached.downcast::<V>() {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT, "tag" => tag.to_string()).increment(1);
                debug!(cache = "query", tag = %tag, key = %key, outcome = "hit");
                Some(value)
            }
            Err(_) => {
                warn!(
                    cache = "query",
                    tag = %tag,
                    key = %key,
                    "cached value has an unexpected type; recomputing"
                );
                None
            }
        }
    }
}
