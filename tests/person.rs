//! End-to-end scenarios over a realistic aggregate.
//!
//! `Person` exercises every part of the runtime at once: a UUID key, eight
//! event kinds, id-keyed address collections, both logs, and both caches.

use std::sync::{Arc, LazyLock};

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use entityfold::{
    Aggregate, AggregateId, DictCache, EntityCache, EntityStore, EventLog, EventSerializer,
    ExpiringCache, FileEventLog, MemoryEventLog, SerializerRegistry,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Address {
    id: i32,
    street_no: i32,
    street: String,
    city: String,
    state: String,
    postcode: String,
}

impl Address {
    fn oak_close() -> Self {
        Self {
            id: 1,
            street_no: 14,
            street: "Oak Close".into(),
            city: "Nunnawadding".into(),
            state: "Victoria".into(),
            postcode: "3123".into(),
        }
    }

    fn sample(id: i32, street_no: i32) -> Self {
        Self {
            id,
            street_no,
            street: "Main Street".into(),
            city: "Springfield".into(),
            state: "Illinois".into(),
            postcode: "12345".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CreatePerson {
    name: String,
    mobile_phone: String,
    email_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UpdateEmailAddress {
    email_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UpdateMobilePhone {
    mobile_phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SetAge {
    age: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AddressAdded {
    address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AddressRemoved {
    id: i32,
}

#[derive(Debug, Clone, PartialEq)]
enum PersonEvent {
    Created(CreatePerson),
    EmailUpdated(UpdateEmailAddress),
    MobileUpdated(UpdateMobilePhone),
    AgeSet(SetAge),
    PostalAdded(AddressAdded),
    PostalRemoved(AddressRemoved),
    StreetAdded(AddressAdded),
    StreetRemoved(AddressRemoved),
}

static SERIALIZERS: LazyLock<SerializerRegistry<PersonEvent>> = LazyLock::new(|| {
    SerializerRegistry::new()
        .with(EventSerializer::json(
            "CreatePersonEvent",
            |e: &PersonEvent| match e {
                PersonEvent::Created(inner) => Some(inner),
                _ => None,
            },
            PersonEvent::Created,
        ))
        .with(EventSerializer::json(
            "UpdateEmailAddress",
            |e: &PersonEvent| match e {
                PersonEvent::EmailUpdated(inner) => Some(inner),
                _ => None,
            },
            PersonEvent::EmailUpdated,
        ))
        .with(EventSerializer::json(
            "UpdateMobilePhone",
            |e: &PersonEvent| match e {
                PersonEvent::MobileUpdated(inner) => Some(inner),
                _ => None,
            },
            PersonEvent::MobileUpdated,
        ))
        .with(EventSerializer::json(
            "SetAgeEvent",
            |e: &PersonEvent| match e {
                PersonEvent::AgeSet(inner) => Some(inner),
                _ => None,
            },
            PersonEvent::AgeSet,
        ))
        .with(EventSerializer::json(
            "AddPostalAddress",
            |e: &PersonEvent| match e {
                PersonEvent::PostalAdded(inner) => Some(inner),
                _ => None,
            },
            PersonEvent::PostalAdded,
        ))
        .with(EventSerializer::json(
            "RemovePostalAddress",
            |e: &PersonEvent| match e {
                PersonEvent::PostalRemoved(inner) => Some(inner),
                _ => None,
            },
            PersonEvent::PostalRemoved,
        ))
        .with(EventSerializer::json(
            "AddStreetAddress",
            |e: &PersonEvent| match e {
                PersonEvent::StreetAdded(inner) => Some(inner),
                _ => None,
            },
            PersonEvent::StreetAdded,
        ))
        .with(EventSerializer::json(
            "RemoveStreetAddress",
            |e: &PersonEvent| match e {
                PersonEvent::StreetRemoved(inner) => Some(inner),
                _ => None,
            },
            PersonEvent::StreetRemoved,
        ))
});

#[derive(Debug, Clone, PartialEq)]
struct Person {
    id: AggregateId,
    name: String,
    email_address: String,
    mobile_phone: String,
    age: i64,
    postal_addresses: Vec<Address>,
    street_addresses: Vec<Address>,
}

impl Aggregate for Person {
    const AGGREGATE_TYPE: &'static str = "person";

    type Event = PersonEvent;

    fn new(id: AggregateId) -> Self {
        Self {
            id,
            name: String::new(),
            email_address: String::new(),
            mobile_phone: String::new(),
            age: -1,
            postal_addresses: Vec::new(),
            street_addresses: Vec::new(),
        }
    }

    fn id(&self) -> AggregateId {
        self.id.clone()
    }

    fn serializers() -> &'static SerializerRegistry<PersonEvent> {
        &SERIALIZERS
    }

    fn apply(&mut self, event: &PersonEvent) {
        match event {
            PersonEvent::Created(e) => {
                self.name = e.name.clone();
                self.mobile_phone = e.mobile_phone.clone();
                self.email_address = e.email_address.clone();
            }
            PersonEvent::EmailUpdated(e) => self.email_address = e.email_address.clone(),
            PersonEvent::MobileUpdated(e) => self.mobile_phone = e.mobile_phone.clone(),
            PersonEvent::AgeSet(e) => self.age = e.age,
            PersonEvent::PostalAdded(e) => {
                if !self.postal_addresses.iter().any(|a| a.id == e.address.id) {
                    self.postal_addresses.push(e.address.clone());
                }
            }
            PersonEvent::PostalRemoved(e) => {
                self.postal_addresses.retain(|a| a.id != e.id);
            }
            PersonEvent::StreetAdded(e) => {
                if !self.street_addresses.iter().any(|a| a.id == e.address.id) {
                    self.street_addresses.push(e.address.clone());
                }
            }
            PersonEvent::StreetRemoved(e) => {
                self.street_addresses.retain(|a| a.id != e.id);
            }
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// The reference scenario: create Johnny, move him to Oak Close, fix his
/// email address.
fn johnny_events() -> Vec<PersonEvent> {
    vec![
        PersonEvent::Created(CreatePerson {
            name: "Johnny".into(),
            mobile_phone: "0410003430".into(),
            email_address: "johnny@cash.com".into(),
        }),
        PersonEvent::PostalAdded(AddressAdded {
            address: Address::oak_close(),
        }),
        PersonEvent::EmailUpdated(UpdateEmailAddress {
            email_address: "jon@cash.org".into(),
        }),
    ]
}

/// Every (log, cache) combination the runtime supports out of the box.
fn stores(tmp: &tempfile::TempDir) -> Vec<EntityStore> {
    let new_cache = |kind: usize| -> Option<Arc<dyn EntityCache>> {
        match kind {
            0 => None,
            1 => Some(Arc::new(DictCache::new())),
            _ => Some(Arc::new(ExpiringCache::new())),
        }
    };

    let mut stores = Vec::new();
    for kind in 0..3 {
        let logs: [Arc<dyn EventLog>; 2] = [
            Arc::new(MemoryEventLog::new()),
            Arc::new(FileEventLog::new(tmp.path().join(format!("f{kind}")))),
        ];
        for log in logs {
            let mut builder = EntityStore::builder(log);
            if let Some(cache) = new_cache(kind) {
                builder = builder.cache(cache);
            }
            stores.push(builder.build());
        }
    }
    stores
}

#[tokio::test]
async fn johnny_scenario_converges_on_every_configuration() {
    init_tracing();
    let tmp = tempfile::tempdir().expect("temp dir");
    for store in stores(&tmp) {
        let id = AggregateId::Uuid(Uuid::new_v4());
        let mut person: Person = store
            .get_entity(id.clone())
            .await
            .expect("read should succeed");
        store
            .apply_all(&mut person, johnny_events())
            .await
            .expect("apply_all should succeed");

        for person in [
            person,
            store.get_entity(id).await.expect("read should succeed"),
        ] {
            assert_eq!(person.name, "Johnny");
            assert_eq!(person.mobile_phone, "0410003430");
            assert_eq!(person.email_address, "jon@cash.org");
            assert_eq!(person.postal_addresses.len(), 1);
            assert_eq!(person.postal_addresses[0].street_no, 14);
            assert_eq!(person.postal_addresses[0].street, "Oak Close");
            assert_eq!(person.postal_addresses[0].state, "Victoria");
        }
    }
}

#[tokio::test]
async fn replay_is_deterministic_across_stores() {
    let log = Arc::new(MemoryEventLog::new());
    let writer = EntityStore::new(log.clone());

    let id = AggregateId::Uuid(Uuid::new_v4());
    let mut person: Person = writer
        .get_entity(id.clone())
        .await
        .expect("read should succeed");
    writer
        .apply_all(&mut person, johnny_events())
        .await
        .expect("apply_all should succeed");

    let a: Person = EntityStore::new(log.clone())
        .get_entity(id.clone())
        .await
        .expect("read should succeed");
    let b: Person = EntityStore::new(log)
        .get_entity(id)
        .await
        .expect("read should succeed");
    assert_eq!(a, b);
    assert_eq!(a, person);
}

#[tokio::test]
async fn versions_are_dense_from_zero() {
    let log = Arc::new(MemoryEventLog::new());
    let store = EntityStore::new(log.clone());

    let id = AggregateId::Uuid(Uuid::new_v4());
    let mut person: Person = store
        .get_entity(id.clone())
        .await
        .expect("read should succeed");
    let events = johnny_events();
    let count = events.len() as i64;
    store
        .apply_all(&mut person, events)
        .await
        .expect("apply_all should succeed");

    let stream = format!("person_{id}");
    let records = log.read_stream(&stream).await.expect("read should succeed");
    let versions: Vec<i64> = records.iter().map(|r| r.version).collect();
    assert_eq!(versions, (0..count).collect::<Vec<_>>());
}

#[tokio::test]
async fn never_written_id_reads_as_empty_person() {
    let store = EntityStore::new(Arc::new(MemoryEventLog::new()));
    let person: Person = store
        .get_entity(AggregateId::Uuid(Uuid::new_v4()))
        .await
        .expect("read should succeed");

    assert_eq!(person.name, "");
    assert_eq!(person.age, -1);
    assert!(person.postal_addresses.is_empty());
}

#[tokio::test]
async fn aggregate_id_is_stable_through_its_lifetime() {
    let store = EntityStore::new(Arc::new(MemoryEventLog::new()));
    let id = AggregateId::Uuid(Uuid::new_v4());

    let mut person: Person = store
        .get_entity(id.clone())
        .await
        .expect("read should succeed");
    assert_eq!(person.id(), id);

    store
        .apply_all(&mut person, johnny_events())
        .await
        .expect("apply_all should succeed");
    assert_eq!(person.id(), id);
}

#[tokio::test]
async fn updating_mobile_phone_replaces_the_created_number() {
    let store = EntityStore::new(Arc::new(MemoryEventLog::new()));
    let id = AggregateId::Uuid(Uuid::new_v4());
    let mut person: Person = store
        .get_entity(id.clone())
        .await
        .expect("read should succeed");

    store
        .apply_all(
            &mut person,
            vec![
                PersonEvent::Created(CreatePerson {
                    name: "Johnny".into(),
                    mobile_phone: "0410003430".into(),
                    email_address: "johnny@cash.com".into(),
                }),
                PersonEvent::MobileUpdated(UpdateMobilePhone {
                    mobile_phone: "0410009999".into(),
                }),
            ],
        )
        .await
        .expect("apply_all should succeed");
    assert_eq!(person.mobile_phone, "0410009999");

    let replayed: Person = store.get_entity(id).await.expect("read should succeed");
    assert_eq!(replayed.mobile_phone, "0410009999");
    assert_eq!(replayed.name, "Johnny");
}

#[tokio::test]
async fn hundred_sequential_updates_keep_the_last_value() {
    let log = Arc::new(MemoryEventLog::new());
    let store = EntityStore::builder(log.clone())
        .cache(Arc::new(DictCache::new()))
        .build();

    let id = AggregateId::Uuid(Uuid::new_v4());
    let mut person: Person = store
        .get_entity(id.clone())
        .await
        .expect("read should succeed");

    let mut rng = rand::thread_rng();
    let mut last = 0i64;
    for _ in 0..100 {
        last = rng.gen_range(0..120);
        store
            .apply(&mut person, PersonEvent::AgeSet(SetAge { age: last }))
            .await
            .expect("apply should succeed");
    }
    assert_eq!(person.age, last);

    let replayed: Person = EntityStore::new(log.clone())
        .get_entity(id.clone())
        .await
        .expect("read should succeed");
    assert_eq!(replayed.age, last);

    let records = log
        .read_stream(&format!("person_{id}"))
        .await
        .expect("read should succeed");
    assert_eq!(records.len(), 100);
    assert_eq!(records.last().map(|r| r.version), Some(99));
}

#[tokio::test]
async fn forced_evacuation_exposes_foreign_appends() {
    let log = Arc::new(MemoryEventLog::new());
    let cache = Arc::new(DictCache::new());
    let store = EntityStore::builder(log.clone()).cache(cache.clone()).build();

    let id = AggregateId::Uuid(Uuid::new_v4());
    let mut person: Person = store
        .get_entity(id.clone())
        .await
        .expect("read should succeed");
    store
        .apply(
            &mut person,
            PersonEvent::Created(CreatePerson {
                name: "Jon".into(),
                mobile_phone: "0410003430".into(),
                email_address: "johnny@cash.com".into(),
            }),
        )
        .await
        .expect("apply should succeed");

    // Another writer appends directly to the shared log.
    let other = EntityStore::new(log);
    let mut theirs: Person = other
        .get_entity(id.clone())
        .await
        .expect("read should succeed");
    other
        .apply(
            &mut theirs,
            PersonEvent::EmailUpdated(UpdateEmailAddress {
                email_address: "jon@cash.org".into(),
            }),
        )
        .await
        .expect("apply should succeed");

    cache.evacuate(true);
    let refreshed: Person = store.get_entity(id).await.expect("read should succeed");
    assert_eq!(refreshed.email_address, "jon@cash.org");
}

#[tokio::test]
async fn removing_street_address_leaves_postal_addresses_alone() {
    let store = EntityStore::new(Arc::new(MemoryEventLog::new()));
    let id = AggregateId::Uuid(Uuid::new_v4());
    let mut person: Person = store
        .get_entity(id.clone())
        .await
        .expect("read should succeed");

    // The postal and street addresses share an id; removal must only
    // consult the street list.
    store
        .apply_all(
            &mut person,
            vec![
                PersonEvent::PostalAdded(AddressAdded {
                    address: Address::sample(1, 5),
                }),
                PersonEvent::StreetAdded(AddressAdded {
                    address: Address::sample(1, 7),
                }),
                PersonEvent::StreetRemoved(AddressRemoved { id: 1 }),
            ],
        )
        .await
        .expect("apply_all should succeed");

    assert!(person.street_addresses.is_empty());
    assert_eq!(person.postal_addresses.len(), 1);
    assert_eq!(person.postal_addresses[0].street_no, 5);

    let replayed: Person = store.get_entity(id).await.expect("read should succeed");
    assert_eq!(replayed, person);
}

#[tokio::test]
async fn adding_a_duplicate_address_id_is_a_no_op() {
    let store = EntityStore::new(Arc::new(MemoryEventLog::new()));
    let id = AggregateId::Uuid(Uuid::new_v4());
    let mut person: Person = store
        .get_entity(id.clone())
        .await
        .expect("read should succeed");

    // Same address id, different street number: the first add wins.
    store
        .apply_all(
            &mut person,
            vec![
                PersonEvent::PostalAdded(AddressAdded {
                    address: Address::sample(3, 10),
                }),
                PersonEvent::PostalAdded(AddressAdded {
                    address: Address::sample(3, 11),
                }),
            ],
        )
        .await
        .expect("apply_all should succeed");

    assert_eq!(person.postal_addresses.len(), 1);
    assert_eq!(person.postal_addresses[0].street_no, 10);

    let replayed: Person = store.get_entity(id).await.expect("read should succeed");
    assert_eq!(replayed.postal_addresses.len(), 1);
}

#[tokio::test]
async fn removing_a_postal_address_by_id() {
    let store = EntityStore::new(Arc::new(MemoryEventLog::new()));
    let id = AggregateId::Uuid(Uuid::new_v4());
    let mut person: Person = store
        .get_entity(id.clone())
        .await
        .expect("read should succeed");

    store
        .apply_all(
            &mut person,
            vec![
                PersonEvent::PostalAdded(AddressAdded {
                    address: Address::sample(1, 5),
                }),
                PersonEvent::PostalAdded(AddressAdded {
                    address: Address::sample(2, 9),
                }),
                PersonEvent::PostalRemoved(AddressRemoved { id: 1 }),
            ],
        )
        .await
        .expect("apply_all should succeed");

    assert_eq!(person.postal_addresses.len(), 1);
    assert_eq!(person.postal_addresses[0].id, 2);
}

#[tokio::test]
async fn file_backed_person_survives_process_restart() {
    init_tracing();
    let tmp = tempfile::tempdir().expect("temp dir");
    let id = AggregateId::Uuid(Uuid::new_v4());

    {
        let store = EntityStore::new(Arc::new(FileEventLog::new(tmp.path())));
        let mut person: Person = store
            .get_entity(id.clone())
            .await
            .expect("read should succeed");
        store
            .apply_all(&mut person, johnny_events())
            .await
            .expect("apply_all should succeed");
    }

    // A new log over the same folder replays the full history.
    let store = EntityStore::new(Arc::new(FileEventLog::new(tmp.path())));
    let person: Person = store.get_entity(id).await.expect("read should succeed");
    assert_eq!(person.name, "Johnny");
    assert_eq!(person.email_address, "jon@cash.org");
    assert_eq!(person.postal_addresses.len(), 1);
}
