//! Tag-based read-through cache.
//!
//! Paged and distinct list reads are cached under composite keys grouped by
//! tag; writes drop every key under the tags they touch.
//!
//! ```toml
//! [cache]
//! enabled = true
//! expiration_minutes = 30
//! max_entries = 10000
//! sweep_interval_seconds = 60
//! key_format = "delimited"
//! ```

mod config;
mod invalidator;
mod keys;
mod page;
mod query;
mod registry;
mod service;
mod store;
mod sweeper;

pub use config::CacheConfig;
pub use invalidator::CacheInvalidator;
pub use keys::{CompositeKey, CompositeKeyBuilder, KeyFormat, KeyPart, SentinelFilter, Tag};
pub use page::{CompositePage, PageRows, PageWindow};
pub use query::PaginatedQueryCache;
pub use registry::{Generation, TagRegistry};
pub use service::CacheService;
pub use store::{CacheStore, CachedValue, MemoryStore};
pub use sweeper::{spawn_sweeper, sweep_once};
