//! Cache configuration.
//!
//! Controls the query cache via the `[cache]` section of `muster.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use super::keys::KeyFormat;

// Default values for cache configuration
const DEFAULT_EXPIRATION_MINUTES: u64 = 30;
const DEFAULT_MAX_ENTRIES: usize = 10_000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Resolved cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every read computes and nothing is stored.
    pub enabled: bool,
    /// Process-wide time-to-live applied to every entry.
    pub expiration: Duration,
    /// Upper bound on live entries; least recently used entries go first.
    pub max_entries: usize,
    /// Cadence of the background expiry sweep; `None` disables it.
    pub sweep_interval: Option<Duration>,
    /// Composite key encoding.
    pub key_format: KeyFormat,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expiration: Duration::from_secs(DEFAULT_EXPIRATION_MINUTES * 60),
            max_entries: DEFAULT_MAX_ENTRIES,
            sweep_interval: Some(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)),
            key_format: KeyFormat::default(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            expiration: Duration::from_secs(settings.expiration_minutes.get() * 60),
            max_entries: settings.max_entries.get(),
            sweep_interval: settings.sweep_interval,
            key_format: settings.key_format,
        }
    }
}

impl CacheConfig {
    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}
