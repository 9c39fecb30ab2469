//! Explicitly constructed cache service handed to repositories.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use super::config::CacheConfig;
use super::invalidator::CacheInvalidator;
use super::query::PaginatedQueryCache;
use super::registry::TagRegistry;
use super::store::{CacheStore, MemoryStore};
use super::sweeper::spawn_sweeper;

/// The read-through cache and its invalidator over one shared store and registry.
#[derive(Clone)]
pub struct CacheService {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
    registry: Arc<TagRegistry>,
    queries: Arc<PaginatedQueryCache>,
    invalidator: Arc<CacheInvalidator>,
}

impl CacheService {
    /// Build a service backed by an in-process [`MemoryStore`].
    pub fn new(config: CacheConfig) -> Self {
        let store = Arc::new(MemoryStore::new(&config));
        Self::with_store(config, store)
    }

    /// Build a service over a caller-supplied store.
    pub fn with_store(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        let registry = Arc::new(TagRegistry::new());
        let queries = Arc::new(PaginatedQueryCache::new(
            config.clone(),
            Arc::clone(&store),
            Arc::clone(&registry),
        ));
        let invalidator = Arc::new(CacheInvalidator::new(
            Arc::clone(&store),
            Arc::clone(&registry),
        ));
        Self {
            config,
            store,
            registry,
            queries,
            invalidator,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queries(&self) -> &PaginatedQueryCache {
        &self.queries
    }

    pub fn invalidator(&self) -> &CacheInvalidator {
        &self.invalidator
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<TagRegistry> {
        &self.registry
    }

    /// Start the expiry sweep when enabled; the caller aborts the handle on shutdown.
    pub fn start_sweeper(&self) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            return None;
        }
        let every = self.config.sweep_interval?;
        info!(
            cache = "sweep",
            interval_secs = every.as_secs(),
            "Starting cache expiry sweep"
        );
        Some(spawn_sweeper(
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            every,
        ))
    }
}
