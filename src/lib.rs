//! An event-sourced entity runtime.
//!
//! State lives as append-only streams of events, one stream per aggregate
//! instance; current state is a pure fold of the stream. The runtime wires
//! four pieces together:
//!
//! - [`Aggregate`]: the contract a domain type implements (empty-state
//!   constructor, event enum, serializer table, fold function).
//! - [`EventLog`]: pluggable append-only storage, with an in-memory
//!   implementation ([`MemoryEventLog`]) and a framed binary file
//!   implementation ([`FileEventLog`]).
//! - [`EntityCache`]: optional folded-state caching ([`DictCache`],
//!   [`ExpiringCache`]) so reads skip replay and appends skip a log scan.
//! - [`EventStreamer`]: optional best-effort post-commit fan-out.
//!
//! [`EntityStore`] is the façade over all four.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, LazyLock};
//!
//! use entityfold::{
//!     Aggregate, AggregateId, EntityStore, EventSerializer, MemoryEventLog,
//!     SerializerRegistry,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Opened {
//!     owner: String,
//! }
//!
//! #[derive(Debug, Clone)]
//! enum AccountEvent {
//!     Opened(Opened),
//! }
//!
//! #[derive(Debug, Clone)]
//! struct Account {
//!     id: AggregateId,
//!     owner: String,
//! }
//!
//! static SERIALIZERS: LazyLock<SerializerRegistry<AccountEvent>> = LazyLock::new(|| {
//!     SerializerRegistry::new().with(EventSerializer::json(
//!         "AccountOpened",
//!         |e: &AccountEvent| match e {
//!             AccountEvent::Opened(inner) => Some(inner),
//!         },
//!         AccountEvent::Opened,
//!     ))
//! });
//!
//! impl Aggregate for Account {
//!     const AGGREGATE_TYPE: &'static str = "account";
//!     type Event = AccountEvent;
//!
//!     fn new(id: AggregateId) -> Self {
//!         Self { id, owner: String::new() }
//!     }
//!
//!     fn id(&self) -> AggregateId {
//!         self.id.clone()
//!     }
//!
//!     fn serializers() -> &'static SerializerRegistry<AccountEvent> {
//!         &SERIALIZERS
//!     }
//!
//!     fn apply(&mut self, event: &AccountEvent) {
//!         match event {
//!             AccountEvent::Opened(opened) => self.owner = opened.owner.clone(),
//!         }
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), entityfold::EntityError> {
//! let store = EntityStore::new(Arc::new(MemoryEventLog::new()));
//!
//! let mut account: Account = store.get_entity(AggregateId::Int(1)).await?;
//! store
//!     .apply(
//!         &mut account,
//!         AccountEvent::Opened(Opened { owner: "Jon".into() }),
//!     )
//!     .await?;
//! assert_eq!(account.owner, "Jon");
//!
//! let replayed: Account = store.get_entity(AggregateId::Int(1)).await?;
//! assert_eq!(replayed.owner, "Jon");
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod cache;
mod dict_cache;
mod error;
mod event;
mod expiring_cache;
mod file_log;
mod log;
mod memory_log;
mod serializer;
mod store;
mod streamer;

pub use aggregate::Aggregate;
pub use cache::{CacheConfig, CacheKey, EntityCache, EntityEntry};
pub use dict_cache::DictCache;
pub use error::{CodecError, EntityError, EntityExpired, LogError};
pub use event::{AggregateId, EventContainer, NEW_VERSION, stream_name};
pub use expiring_cache::ExpiringCache;
pub use file_log::FileEventLog;
pub use log::EventLog;
pub use memory_log::MemoryEventLog;
pub use serializer::{EventSerializer, SerializerRegistry};
pub use store::{EntityStore, EntityStoreBuilder};
pub use streamer::{EventStreamer, StreamedEvent};
