//! The entity runtime: replay, append, cache, and fan-out in one façade.

use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::Aggregate;
use crate::cache::{CacheConfig, CacheKey, EntityCache, EntityEntry};
use crate::error::EntityError;
use crate::event::{AggregateId, NEW_VERSION, stream_name};
use crate::log::EventLog;
use crate::streamer::{EventStreamer, StreamedEvent};

/// Coordinates the event log, the entity cache, and the event streamer.
///
/// The store is the only write path: callers obtain aggregate state via
/// [`get_entity`](EntityStore::get_entity) and evolve it via
/// [`apply`](EntityStore::apply). There is no delete and no in-place update;
/// state only changes by appending events.
///
/// The log is required; cache and streamer are optional collaborators. With
/// no cache every read replays the stream and every append scans the log for
/// the current version. One store instance serves every aggregate kind.
pub struct EntityStore {
    log: Arc<dyn EventLog>,
    cache: Option<Arc<dyn EntityCache>>,
    streamer: Option<Arc<dyn EventStreamer>>,
    cache_period: Duration,
}

/// Builder for [`EntityStore`].
pub struct EntityStoreBuilder {
    log: Arc<dyn EventLog>,
    cache: Option<Arc<dyn EntityCache>>,
    streamer: Option<Arc<dyn EventStreamer>>,
    config: CacheConfig,
}

impl EntityStoreBuilder {
    /// Attach an entity cache.
    pub fn cache(mut self, cache: Arc<dyn EntityCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach a post-commit event streamer.
    pub fn streamer(mut self, streamer: Arc<dyn EventStreamer>) -> Self {
        self.streamer = Some(streamer);
        self
    }

    /// Override the cache tuning (entry lifetime).
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Finish building the store.
    pub fn build(self) -> EntityStore {
        EntityStore {
            log: self.log,
            cache: self.cache,
            streamer: self.streamer,
            cache_period: self.config.cache_period,
        }
    }
}

impl EntityStore {
    /// Start building a store over the given event log.
    pub fn builder(log: Arc<dyn EventLog>) -> EntityStoreBuilder {
        EntityStoreBuilder {
            log,
            cache: None,
            streamer: None,
            config: CacheConfig::default(),
        }
    }

    /// Store over the given log with no cache and no streamer.
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        Self::builder(log).build()
    }

    /// Get the current state of an aggregate by id.
    ///
    /// Serves a fresh cached copy when one exists; otherwise constructs the
    /// empty-state aggregate and replays its stream. A never-written id is
    /// not an error: it yields the empty-state aggregate, so "create" and
    /// "read" are the same operation.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Log`] if the stream cannot be read,
    /// [`EntityError::NoSerializer`] if a stored record names an event type
    /// the aggregate's registry does not know, and [`EntityError::Codec`] if
    /// a stored payload fails to decode. Replay never skips a record.
    pub async fn get_entity<A: Aggregate>(
        &self,
        id: impl Into<AggregateId>,
    ) -> Result<A, EntityError> {
        let id = id.into();

        if let Some(cache) = &self.cache {
            let key = CacheKey::of::<A>(&id);
            if let Some(entry) = cache.get(&key) {
                match entry.entity() {
                    Ok(any) => match any.downcast_ref::<A>() {
                        Some(entity) => {
                            tracing::debug!(
                                aggregate = A::AGGREGATE_TYPE,
                                %id,
                                version = entry.version(),
                                "serving entity from cache"
                            );
                            return Ok(entity.clone());
                        }
                        None => {
                            tracing::warn!(
                                aggregate = A::AGGREGATE_TYPE,
                                %id,
                                "cached entry holds the wrong type; replaying"
                            );
                        }
                    },
                    Err(_) => {
                        tracing::debug!(
                            aggregate = A::AGGREGATE_TYPE,
                            %id,
                            "cached entry expired; replaying"
                        );
                    }
                }
            }
        }

        let (entity, version) = self.replay::<A>(id).await?;
        self.cache_entity(&entity, version);
        Ok(entity)
    }

    /// Record one event against an aggregate.
    ///
    /// The pipeline: look up the event's serializer, compute the target
    /// version (cached version plus one, else one past the last logged
    /// record), serialize, append, fold the event into the caller's state,
    /// refresh the cache, and finally hand the event to the streamer.
    ///
    /// The aggregate is mutated only after the append succeeds, so a failed
    /// call leaves the caller's state untouched. Streamer failures are
    /// logged and swallowed; the event is already durable by then.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::NoSerializer`] if the event has no registry
    /// entry, [`EntityError::Codec`] if serialization fails, and
    /// [`EntityError::Log`] if the append or the version scan fails.
    pub async fn apply<A: Aggregate>(
        &self,
        aggregate: &mut A,
        event: A::Event,
    ) -> Result<(), EntityError> {
        let id = aggregate.id();
        let serializer =
            A::serializers()
                .for_event(&event)
                .ok_or_else(|| EntityError::NoSerializer {
                    aggregate: A::AGGREGATE_TYPE,
                    event_type: std::any::type_name::<A::Event>().to_owned(),
                })?;
        let event_type = serializer.event_type();

        let version = self.next_version::<A>(&id).await?;

        let payload = serializer
            .serialize(&event)
            .map_err(|source| EntityError::Codec {
                event_type: event_type.to_owned(),
                source,
            })?;

        let stream = stream_name(A::AGGREGATE_TYPE, &id);
        self.log
            .append_to_stream(&stream, event_type, version, payload)
            .await?;

        aggregate.apply(&event);
        self.cache_entity(aggregate, version);

        tracing::info!(
            aggregate = A::AGGREGATE_TYPE,
            %id,
            event_type,
            version,
            "recorded event"
        );

        if let Some(streamer) = &self.streamer {
            let streamed = StreamedEvent {
                key: id.clone(),
                aggregate_type: A::AGGREGATE_TYPE,
                event_type,
                event: Arc::new(event),
            };
            if let Err(error) = streamer.stream_event(streamed).await {
                tracing::warn!(
                    aggregate = A::AGGREGATE_TYPE,
                    %id,
                    event_type,
                    %error,
                    "event streamer failed; event is already committed"
                );
            }
        }

        Ok(())
    }

    /// Record a batch of events against an aggregate, in order.
    ///
    /// Each event runs the full [`apply`](EntityStore::apply) pipeline; the
    /// batch is not atomic. The first failure stops the batch, leaving the
    /// earlier events committed and folded.
    ///
    /// # Errors
    ///
    /// Same conditions as [`apply`](EntityStore::apply).
    pub async fn apply_all<A: Aggregate>(
        &self,
        aggregate: &mut A,
        events: impl IntoIterator<Item = A::Event>,
    ) -> Result<(), EntityError> {
        for event in events {
            self.apply(aggregate, event).await?;
        }
        Ok(())
    }

    /// Fold an aggregate's full stream into fresh state.
    ///
    /// Returns the state and the version of the last record folded,
    /// [`NEW_VERSION`] for an empty stream.
    async fn replay<A: Aggregate>(&self, id: AggregateId) -> Result<(A, i64), EntityError> {
        let stream = stream_name(A::AGGREGATE_TYPE, &id);
        let records = self.log.read_stream(&stream).await?;

        let mut entity = A::new(id.clone());
        let mut version = NEW_VERSION;
        let registry = A::serializers();
        for record in &records {
            let serializer =
                registry
                    .by_name(&record.event_type)
                    .ok_or_else(|| EntityError::NoSerializer {
                        aggregate: A::AGGREGATE_TYPE,
                        event_type: record.event_type.clone(),
                    })?;
            let event = serializer
                .deserialize(&record.payload)
                .map_err(|source| EntityError::Codec {
                    event_type: record.event_type.clone(),
                    source,
                })?;
            entity.apply(&event);
            version = record.version;
        }

        tracing::debug!(
            aggregate = A::AGGREGATE_TYPE,
            %id,
            events = records.len(),
            version,
            "replayed entity"
        );
        Ok((entity, version))
    }

    /// Compute the version the next append will create.
    ///
    /// A cached entry's version is trusted even if the state in it has
    /// expired; without one the log is scanned for its last record. Note the
    /// scan-and-append pair is not atomic across processes: the log does not
    /// reject duplicate versions, so multi-writer deployments must serialize
    /// appends per stream externally.
    async fn next_version<A: Aggregate>(&self, id: &AggregateId) -> Result<i64, EntityError> {
        if let Some(cache) = &self.cache {
            let key = CacheKey::of::<A>(id);
            if let Some(entry) = cache.get(&key) {
                return Ok(entry.version() + 1);
            }
        }

        let stream = stream_name(A::AGGREGATE_TYPE, id);
        let records = self.log.read_stream(&stream).await?;
        Ok(records.last().map_or(0, |record| record.version + 1))
    }

    /// Refresh the cache entry for an aggregate, restarting its lifetime.
    fn cache_entity<A: Aggregate>(&self, entity: &A, version: i64) {
        if let Some(cache) = &self.cache {
            let key = CacheKey::for_aggregate(entity);
            cache.update(key, EntityEntry::new(entity.clone(), version, self.cache_period));
        }
    }
}
