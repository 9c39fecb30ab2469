//! Tag invalidation.
//!
//! Called by write paths after the mutation succeeded and before the
//! response goes out.

use std::sync::Arc;

use metrics::counter;
use tracing::info;

use super::keys::Tag;
use super::registry::TagRegistry;
use super::store::CacheStore;

const METRIC_CACHE_INVALIDATED_KEYS: &str = "muster_cache_invalidated_keys_total";

/// Drops every cached entry registered under a tag.
pub struct CacheInvalidator {
    store: Arc<dyn CacheStore>,
    registry: Arc<TagRegistry>,
}

impl CacheInvalidator {
    pub fn new(store: Arc<dyn CacheStore>, registry: Arc<TagRegistry>) -> Self {
        Self { store, registry }
    }

    /// Remove every key under `tag` from the store, then the tag key itself.
    ///
    /// Never touches another tag. Returns the number of registered keys dropped.
    pub fn invalidate(&self, tag: &Tag) -> usize {
        let dropped = self.registry.clear_with(tag, |keys| {
            for key in keys {
                self.store.remove(key);
            }
            self.store.remove(tag.as_str());
        });

        let count = dropped.len();
        counter!(METRIC_CACHE_INVALIDATED_KEYS, "tag" => tag.to_string()).increment(count as u64);
        info!(cache = "invalidate", tag = %tag, dropped = count, "Cache tag invalidated");
        count
    }

    /// Invalidate each tag in turn.
    pub fn invalidate_all<'a>(&self, tags: impl IntoIterator<Item = &'a Tag>) -> usize {
        tags.into_iter().map(|tag| self.invalidate(tag)).sum()
    }
}
