//! Dictionary-backed entity cache.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::cache::{CacheKey, EntityCache, EntityEntry};

/// An entity cache backed by a mutex-guarded map.
///
/// Entries persist until replaced or evacuated; expiry is enforced lazily by
/// [`EntityEntry::entity`] at read time, so an expired entry still serves
/// its version until something overwrites it. `evacuate(false)` sweeps
/// expired entries out of the map, `evacuate(true)` clears it.
#[derive(Debug, Default)]
pub struct DictCache {
    entries: Mutex<HashMap<CacheKey, EntityEntry>>,
}

impl DictCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl EntityCache for DictCache {
    fn get(&self, key: &CacheKey) -> Option<EntityEntry> {
        self.entries.lock().get(key).cloned()
    }

    fn update(&self, key: CacheKey, entry: EntityEntry) {
        self.entries.lock().insert(key, entry);
    }

    fn evacuate(&self, force: bool) {
        let mut entries = self.entries.lock();
        if force {
            tracing::debug!(entries = entries.len(), "clearing entity cache");
            entries.clear();
        } else {
            entries.retain(|_, entry| !entry.is_expired());
        }
    }
}
