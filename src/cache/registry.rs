//! Tag registry.
//!
//! Tracks which composite keys are live under each tag so a write can drop
//! all of them at once. Each tag also carries a generation number that moves
//! forward on every clear; populating the cache is refused when the generation
//! observed before computing is no longer current.

use std::collections::HashSet;

use dashmap::DashMap;

use super::keys::Tag;

/// Monotonic per-tag counter, bumped on every clear.
pub type Generation = u64;

#[derive(Debug, Default)]
struct TagState {
    generation: Generation,
    keys: HashSet<String>,
}

/// Maps tags to the set of composite keys cached under them.
///
/// Every mutation of a tag's key-set happens under that tag's map entry, so
/// concurrent registrations for the same tag never lose each other's keys.
/// The registry may list keys whose store entry already expired; it never
/// misses a key that is live in the store.
#[derive(Debug, Default)]
pub struct TagRegistry {
    tags: DashMap<Tag, TagState>,
}

impl TagRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tags: DashMap::new(),
        }
    }

    /// Add `key` to the set tracked under `tag`.
    pub fn register(&self, tag: &Tag, key: &str) {
        self.tags
            .entry(tag.clone())
            .or_default()
            .keys
            .insert(key.to_string());
    }

    /// Run `publish` and register `key`, but only if `tag` is still at `generation`.
    ///
    /// Both happen while the tag entry is held, so a concurrent clear either
    /// runs before (and the publish is refused) or after (and sees the key).
    /// Returns whether the key was published.
    pub fn register_if_current<F>(
        &self,
        tag: &Tag,
        key: &str,
        generation: Generation,
        publish: F,
    ) -> bool
    where
        F: FnOnce(),
    {
        let mut state = self.tags.entry(tag.clone()).or_default();
        if state.generation != generation {
            return false;
        }
        publish();
        state.keys.insert(key.to_string());
        true
    }

    /// Current generation of `tag`; unknown tags are at zero.
    pub fn generation(&self, tag: &Tag) -> Generation {
        self.tags.get(tag).map_or(0, |state| state.generation)
    }

    /// Snapshot of the keys currently registered under `tag`.
    pub fn keys_of(&self, tag: &Tag) -> HashSet<String> {
        self.tags
            .get(tag)
            .map(|state| state.keys.clone())
            .unwrap_or_default()
    }

    /// Remove every key under `tag` and return them.
    ///
    /// Does not touch the store. Bumps the tag's generation.
    pub fn clear(&self, tag: &Tag) -> HashSet<String> {
        self.clear_with(tag, |_| {})
    }

    /// Like [`clear`](Self::clear), running `drop_keys` on the removed keys
    /// before the tag entry is released.
    pub fn clear_with<F>(&self, tag: &Tag, drop_keys: F) -> HashSet<String>
    where
        F: FnOnce(&HashSet<String>),
    {
        let mut state = self.tags.entry(tag.clone()).or_default();
        state.generation += 1;
        let keys = std::mem::take(&mut state.keys);
        drop_keys(&keys);
        keys
    }

    /// Forget `keys` under every tag, e.g. after the store expired them.
    ///
    /// `is_live` runs while each tag entry is held; keys it reports as live
    /// again (re-populated since they expired) stay registered.
    pub fn prune<'a, F>(&self, keys: impl IntoIterator<Item = &'a String>, is_live: F)
    where
        F: Fn(&str) -> bool,
    {
        let doomed: HashSet<&str> = keys.into_iter().map(String::as_str).collect();
        if doomed.is_empty() {
            return;
        }
        for mut state in self.tags.iter_mut() {
            state
                .keys
                .retain(|key| !doomed.contains(key.as_str()) || is_live(key));
        }
    }

    /// Get the number of tracked keys across all tags.
    pub fn key_count(&self) -> usize {
        self.tags.iter().map(|state| state.keys.len()).sum()
    }
}
