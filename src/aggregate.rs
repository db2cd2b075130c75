//! Aggregate trait: the contract between domain entities and the runtime.

use crate::event::AggregateId;
use crate::serializer::SerializerRegistry;

/// A domain aggregate whose state is derived solely from its event history.
///
/// The implementing type itself serves as the aggregate's state. State is
/// built by folding events through [`apply`](Aggregate::apply), either
/// during replay or when the runtime persists a new event.
///
/// # Associated Items
///
/// - `AGGREGATE_TYPE`: stable type name, the first half of the stream name.
/// - `Event`: the closed set of events this aggregate can record, modeled
///   as an enum so dispatch is an exhaustive match resolved at compile time.
///
/// # Contract
///
/// - [`new`](Aggregate::new) must produce a valid empty-state instance
///   carrying the given id; "create" and "read" are the same runtime
///   operation, differentiated only by whether events exist.
/// - [`id`](Aggregate::id) must return the same key for the lifetime of the
///   instance, and every instance of one aggregate kind must use the same
///   [`AggregateId`] variant.
/// - [`apply`](Aggregate::apply) must be total and deterministic: no I/O,
///   no clocks, no randomness. Replaying the same events in the same order
///   must always produce the same state.
/// - [`serializers`](Aggregate::serializers) must return a table built once
///   per aggregate kind (a `LazyLock` static) and registered for every
///   `Event` variant; a missing entry is a configuration bug surfaced as
///   [`EntityError::NoSerializer`](crate::EntityError).
pub trait Aggregate: Clone + Send + Sync + 'static {
    /// Identifies this aggregate kind (e.g. "person"). Used in stream names.
    const AGGREGATE_TYPE: &'static str;

    /// The closed set of events this aggregate records and applies.
    type Event: Send + Sync + 'static;

    /// Construct the empty-state aggregate with the given id.
    fn new(id: AggregateId) -> Self;

    /// The aggregate's key.
    fn id(&self) -> AggregateId;

    /// The shared, process-wide serializer table for this aggregate kind.
    fn serializers() -> &'static SerializerRegistry<Self::Event>;

    /// Fold one event into the state, mutating it in place.
    fn apply(&mut self, event: &Self::Event);
}
