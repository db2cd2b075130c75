//! Generation-stamped entity cache with O(1) forced invalidation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::cache::{CacheKey, EntityCache, EntityEntry};

/// An entity cache whose forced evacuation is a counter bump, not a scan.
///
/// Every entry is stamped with the generation current at insert time. A
/// forced evacuation increments the generation, instantly orphaning all
/// existing entries; orphaned and expired entries are then evicted lazily
/// when a read encounters them. `evacuate(false)` is a no-op.
#[derive(Debug, Default)]
pub struct ExpiringCache {
    generation: AtomicU64,
    entries: RwLock<HashMap<CacheKey, (EntityEntry, u64)>>,
}

impl ExpiringCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

impl EntityCache for ExpiringCache {
    fn get(&self, key: &CacheKey) -> Option<EntityEntry> {
        let current = self.generation.load(Ordering::Acquire);

        let stale = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some((entry, generation)) if *generation == current && !entry.is_expired() => {
                    return Some(entry.clone());
                }
                Some(_) => true,
                None => return None,
            }
        };

        // Evict under the write lock, re-checking in case a fresh entry
        // replaced the stale one in between.
        if stale {
            let mut entries = self.entries.write();
            if let Some((entry, generation)) = entries.get(key)
                && (*generation != current || entry.is_expired())
            {
                entries.remove(key);
            }
        }
        None
    }

    fn update(&self, key: CacheKey, entry: EntityEntry) {
        let current = self.generation.load(Ordering::Acquire);
        self.entries.write().insert(key, (entry, current));
    }

    fn evacuate(&self, force: bool) {
        if force {
            let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
            tracing::debug!(generation, "invalidated entity cache");
        }
    }
}
