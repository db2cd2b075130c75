//! The pluggable entity cache contract.
//!
//! Caches store fully-folded aggregate state keyed by kind and id, so a read
//! can skip replay and an append can learn the current version without
//! scanning the log. Entries are type-erased: one cache instance serves every
//! aggregate kind in the process.

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aggregate::Aggregate;
use crate::error::EntityExpired;
use crate::event::AggregateId;

/// Cache key: the aggregate's Rust type plus its id.
///
/// Including the `TypeId` keeps two aggregate kinds that happen to share an
/// id value from colliding in a shared cache instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    type_id: TypeId,
    id: AggregateId,
}

impl CacheKey {
    /// Key for aggregate kind `A` with the given id.
    pub fn of<A: Aggregate>(id: &AggregateId) -> Self {
        Self {
            type_id: TypeId::of::<A>(),
            id: id.clone(),
        }
    }

    /// Key for an aggregate instance.
    pub fn for_aggregate<A: Aggregate>(aggregate: &A) -> Self {
        Self::of::<A>(&aggregate.id())
    }

    /// The aggregate id half of the key.
    pub fn id(&self) -> &AggregateId {
        &self.id
    }
}

/// A cached aggregate: type-erased state, its version, and an expiry.
///
/// The version is the stream position of the last event folded into the
/// state, [`NEW_VERSION`](crate::NEW_VERSION) for an aggregate with no
/// events yet.
#[derive(Debug, Clone)]
pub struct EntityEntry {
    entity: Arc<dyn Any + Send + Sync>,
    version: i64,
    expires_at: Instant,
}

impl EntityEntry {
    /// Wrap an aggregate snapshot, valid for `ttl` from now.
    pub fn new<A: Aggregate>(entity: A, version: i64, ttl: Duration) -> Self {
        Self {
            entity: Arc::new(entity),
            version,
            expires_at: Instant::now() + ttl,
        }
    }

    /// The cached state, if the entry is still fresh.
    ///
    /// # Errors
    ///
    /// Returns [`EntityExpired`] once the entry's lifetime has elapsed; the
    /// caller falls back to replay. Distinct from a cache miss, which means
    /// no entry at all.
    pub fn entity(&self) -> Result<&Arc<dyn Any + Send + Sync>, EntityExpired> {
        if self.is_expired() {
            return Err(EntityExpired);
        }
        Ok(&self.entity)
    }

    /// The entry's version. Readable even after expiry: a stale version is
    /// still the latest one this process wrote, so appends may trust it.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Whether the entry's lifetime has elapsed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Tuning for cache implementations.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// How long an entry stays fresh after it is written.
    pub cache_period: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_period: Duration::from_secs(30 * 60),
        }
    }
}

/// A store for folded aggregate state shared across aggregate kinds.
///
/// Implementations must be safe under concurrent access. Built-in
/// implementations: [`DictCache`](crate::DictCache) and
/// [`ExpiringCache`](crate::ExpiringCache).
pub trait EntityCache: Send + Sync {
    /// Look up an entry. `None` means a miss; an expired entry may still be
    /// returned so callers can read its version.
    fn get(&self, key: &CacheKey) -> Option<EntityEntry>;

    /// Insert or replace the entry for a key, restarting its lifetime.
    fn update(&self, key: CacheKey, entry: EntityEntry);

    /// Drop entries. With `force` every entry goes; otherwise the
    /// implementation decides how much housekeeping to do (sweeping expired
    /// entries, or nothing at all).
    fn evacuate(&self, force: bool);
}
