//! Per-aggregate-kind serializer registry.
//!
//! Each aggregate kind owns one [`SerializerRegistry`], a read-only ordered
//! table mapping a stable event-type name to the concrete event shape it
//! stores. Registries are built once per aggregate kind (typically in a
//! `std::sync::LazyLock` static) and shared by reference across every
//! instance of that kind.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

/// One registry entry: a stable event-type name plus the closures that
/// serialize, deserialize, and recognize its concrete event shape.
///
/// The closures make the exchange format opaque to the rest of the runtime:
/// the reference constructor [`EventSerializer::json`] produces JSON via
/// `serde_json`, but any byte encoding satisfying
/// `deserialize(serialize(e)) == e` is a valid substitute.
pub struct EventSerializer<E> {
    event_type: &'static str,
    can_serialize: Box<dyn Fn(&E) -> bool + Send + Sync>,
    serialize: Box<dyn Fn(&E) -> Result<Vec<u8>, CodecError> + Send + Sync>,
    deserialize: Box<dyn Fn(&[u8]) -> Result<E, CodecError> + Send + Sync>,
}

impl<E> EventSerializer<E> {
    /// Build a JSON serializer entry for one variant of the event enum `E`.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The stable name stored in the log. Not required to
    ///   match the Rust type name.
    /// * `extract` - Projects the enum onto the variant's inner value,
    ///   returning `None` for every other variant. Doubles as the
    ///   `can_serialize` predicate.
    /// * `wrap` - Lifts a deserialized inner value back into the enum.
    ///
    /// # Examples
    ///
    /// ```
    /// use entityfold::EventSerializer;
    /// # #[derive(serde::Serialize, serde::Deserialize)]
    /// # struct Created { name: String }
    /// # enum PersonEvent { Created(Created) }
    /// let entry = EventSerializer::json(
    ///     "CreatePersonEvent",
    ///     |e: &PersonEvent| match e {
    ///         PersonEvent::Created(inner) => Some(inner),
    ///     },
    ///     PersonEvent::Created,
    /// );
    /// assert_eq!(entry.event_type(), "CreatePersonEvent");
    /// ```
    pub fn json<T>(
        event_type: &'static str,
        extract: fn(&E) -> Option<&T>,
        wrap: fn(T) -> E,
    ) -> Self
    where
        T: Serialize + DeserializeOwned + 'static,
        E: 'static,
    {
        Self {
            event_type,
            can_serialize: Box::new(move |event| extract(event).is_some()),
            serialize: Box::new(move |event| {
                let inner = extract(event).ok_or_else(|| {
                    CodecError::from(format!(
                        "event is not a '{event_type}'; registry lookup and entry disagree"
                    ))
                })?;
                serde_json::to_vec(inner).map_err(CodecError::from)
            }),
            deserialize: Box::new(move |payload| {
                serde_json::from_slice::<T>(payload)
                    .map(wrap)
                    .map_err(CodecError::from)
            }),
        }
    }

    /// The stable event-type name stored in the log for this entry.
    pub fn event_type(&self) -> &'static str {
        self.event_type
    }

    /// Whether this entry can serialize the given event value.
    pub fn can_serialize(&self, event: &E) -> bool {
        (self.can_serialize)(event)
    }

    /// Serialize an event value to its exchange payload.
    ///
    /// # Errors
    ///
    /// Returns the codec's error if encoding fails.
    pub fn serialize(&self, event: &E) -> Result<Vec<u8>, CodecError> {
        (self.serialize)(event)
    }

    /// Deserialize an exchange payload back into an event value.
    ///
    /// # Errors
    ///
    /// Returns the codec's error if the payload does not decode as this
    /// entry's event shape.
    pub fn deserialize(&self, payload: &[u8]) -> Result<E, CodecError> {
        (self.deserialize)(payload)
    }
}

impl<E> std::fmt::Debug for EventSerializer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSerializer")
            .field("event_type", &self.event_type)
            .finish()
    }
}

/// The ordered, immutable serializer table for one aggregate kind.
///
/// Lookup by stored type name drives replay; lookup by value drives
/// outgoing appends. A failed lookup is always a configuration bug
/// (a missing registration), never a data condition, and the runtime
/// surfaces it as [`EntityError::NoSerializer`](crate::EntityError).
#[derive(Debug, Default)]
pub struct SerializerRegistry<E> {
    entries: Vec<EventSerializer<E>>,
}

impl<E> SerializerRegistry<E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an entry, consuming and returning the registry for chaining.
    ///
    /// Entries are matched in registration order; registering two entries
    /// for the same concrete event shape leaves the first one effective.
    pub fn with(mut self, serializer: EventSerializer<E>) -> Self {
        self.entries.push(serializer);
        self
    }

    /// Find the entry whose stored type name matches `event_type`.
    ///
    /// Used when replaying records out of the log.
    pub fn by_name(&self, event_type: &str) -> Option<&EventSerializer<E>> {
        self.entries.iter().find(|s| s.event_type == event_type)
    }

    /// Find the entry that can serialize the given event value.
    ///
    /// Used when appending an outgoing event.
    pub fn for_event(&self, event: &E) -> Option<&EventSerializer<E>> {
        self.entries.iter().find(|s| s.can_serialize(event))
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
