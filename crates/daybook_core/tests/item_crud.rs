use chrono::{DateTime, TimeZone, Utc};
use daybook_core::db::{open_db_in_memory, DbError};
use daybook_core::{
    Clock, ItemStore, KeyValueStore, KvError, KvResult, SqliteKeyValueStore, StoreError, StoreKeys,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

#[test]
fn add_item_roundtrips_through_the_store() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
    let keys = StoreKeys::default();
    let clock = ManualClock::new(1_700_000_000_000);

    let mut store = ItemStore::new(&kv, &keys, &clock, "Notes");
    let created = store.add_item("hello").unwrap();
    assert_eq!(created.id, 1_700_000_000_000);
    assert_eq!(created.text, "hello");
    assert_eq!(created.created_at, created.last_modified);

    let mut reloaded = ItemStore::new(&kv, &keys, &clock, "Notes");
    reloaded.load().unwrap();
    assert_eq!(reloaded.items(), store.items());
}

#[test]
fn ids_stay_distinct_within_one_millisecond() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
    let keys = StoreKeys::default();
    let clock = ManualClock::new(1_700_000_000_000);

    let mut store = ItemStore::new(&kv, &keys, &clock, "Notes");
    let first = store.add_item("a").unwrap();
    let second = store.add_item("b").unwrap();

    assert_ne!(first.id, second.id);
    // Newest entry sits at the head.
    assert_eq!(store.items()[0].text, "b");
    assert_eq!(store.items()[1].text, "a");
}

#[test]
fn update_refreshes_last_modified_and_never_the_id() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
    let keys = StoreKeys::default();
    let clock = ManualClock::new(1_700_000_000_000);

    let mut store = ItemStore::new(&kv, &keys, &clock, "Notes");
    let created = store.add_item("draft").unwrap();

    clock.advance(60_000);
    store.update_item(0, "final").unwrap();

    let updated = &store.items()[0];
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.text, "final");
    assert_eq!(updated.created_at, created.created_at);
    assert_ne!(updated.last_modified, created.last_modified);
}

#[test]
fn positional_ops_reject_out_of_range_indexes() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
    let keys = StoreKeys::default();
    let clock = ManualClock::new(1_700_000_000_000);

    let mut store = ItemStore::new(&kv, &keys, &clock, "Notes");
    store.add_item("only").unwrap();

    assert!(matches!(
        store.update_item(1, "nope"),
        Err(StoreError::IndexOutOfRange { index: 1, len: 1 })
    ));
    assert!(matches!(
        store.delete_item(3),
        Err(StoreError::IndexOutOfRange { index: 3, len: 1 })
    ));
    assert_eq!(store.items().len(), 1);
}

#[test]
fn delete_removes_the_entry_at_the_index() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
    let keys = StoreKeys::default();
    let clock = ManualClock::new(1_700_000_000_000);

    let mut store = ItemStore::new(&kv, &keys, &clock, "Notes");
    store.add_item("a").unwrap();
    store.add_item("b").unwrap();
    store.add_item("c").unwrap();

    // Head is "c"; delete the middle entry.
    store.delete_item(1).unwrap();
    let texts: Vec<_> = store.items().iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, ["c", "a"]);

    let mut reloaded = ItemStore::new(&kv, &keys, &clock, "Notes");
    reloaded.load().unwrap();
    assert_eq!(reloaded.items(), store.items());
}

#[test]
fn clear_all_items_empties_the_section() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
    let keys = StoreKeys::default();
    let clock = ManualClock::new(1_700_000_000_000);

    let mut store = ItemStore::new(&kv, &keys, &clock, "Notes");
    store.add_item("a").unwrap();
    store.add_item("b").unwrap();
    store.clear_all_items().unwrap();

    assert!(store.items().is_empty());
    let mut reloaded = ItemStore::new(&kv, &keys, &clock, "Notes");
    reloaded.load().unwrap();
    assert!(reloaded.items().is_empty());
}

#[test]
fn set_section_reloads_only_on_change() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
    let keys = StoreKeys::default();
    let clock = ManualClock::new(1_700_000_000_000);

    let mut work = ItemStore::new(&kv, &keys, &clock, "Work");
    work.add_item("standup").unwrap();
    let mut home = ItemStore::new(&kv, &keys, &clock, "Home");
    home.add_item("groceries").unwrap();

    let mut store = ItemStore::new(&kv, &keys, &clock, "Work");
    store.load().unwrap();
    assert_eq!(store.items()[0].text, "standup");

    store.set_section("Home").unwrap();
    assert_eq!(store.section(), "Home");
    assert_eq!(store.items()[0].text, "groceries");
}

#[test]
fn load_treats_absent_and_malformed_items_as_empty() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKeyValueStore::try_new(&conn).unwrap();
    let keys = StoreKeys::default();
    let clock = ManualClock::new(1_700_000_000_000);

    let mut store = ItemStore::new(&kv, &keys, &clock, "Notes");
    store.load().unwrap();
    assert!(store.items().is_empty());

    kv.set(&keys.items_key("Notes"), "{\"not\": \"a list\"}")
        .unwrap();
    store.load().unwrap();
    assert!(store.items().is_empty());
}

#[test]
fn failed_write_leaves_memory_at_pre_mutation_value() {
    let kv = ScriptedKv::default();
    let keys = StoreKeys::default();
    let clock = ManualClock::new(1_700_000_000_000);
    kv.seed(
        &keys.items_key("Notes"),
        "[{\"id\":1,\"text\":\"kept\",\"createdAt\":\"t\",\"lastModified\":\"t\"}]",
    );

    let mut store = ItemStore::new(&kv, &keys, &clock, "Notes");
    store.load().unwrap();
    kv.fail_writes_on(&keys.items_key("Notes"));

    assert!(matches!(store.add_item("lost"), Err(StoreError::Kv(_))));
    assert!(matches!(
        store.update_item(0, "lost"),
        Err(StoreError::Kv(_))
    ));
    assert!(matches!(store.delete_item(0), Err(StoreError::Kv(_))));
    assert!(matches!(store.clear_all_items(), Err(StoreError::Kv(_))));

    assert_eq!(store.items().len(), 1);
    assert_eq!(store.items()[0].text, "kept");
}

#[test]
fn backup_failure_never_aborts_the_primary_write() {
    let kv = ScriptedKv::default();
    let keys = StoreKeys::default();
    let clock = ManualClock::new(1_700_000_000_000);
    kv.fail_writes_on(&keys.items_backup_key("Notes"));

    let mut store = ItemStore::new(&kv, &keys, &clock, "Notes");
    store.add_item("survives").unwrap();

    assert_eq!(store.items().len(), 1);
    assert!(kv.raw(&keys.items_key("Notes")).is_some());
    assert!(kv.raw(&keys.items_backup_key("Notes")).is_none());
}

/// Deterministic test clock counting in epoch milliseconds.
struct ManualClock {
    now_ms: Cell<i64>,
}

impl ManualClock {
    fn new(start_ms: i64) -> Self {
        Self {
            now_ms: Cell::new(start_ms),
        }
    }

    fn advance(&self, ms: i64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.now_ms.get()).unwrap()
    }
}

/// In-memory adapter with scripted failures, standing in for a flaky
/// platform store.
#[derive(Default)]
struct ScriptedKv {
    map: RefCell<HashMap<String, String>>,
    failing_writes: RefCell<HashSet<String>>,
}

impl ScriptedKv {
    fn seed(&self, key: &str, value: &str) {
        self.map
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn raw(&self, key: &str) -> Option<String> {
        self.map.borrow().get(key).cloned()
    }

    fn fail_writes_on(&self, key: &str) {
        self.failing_writes.borrow_mut().insert(key.to_string());
    }
}

impl KeyValueStore for ScriptedKv {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        if self.failing_writes.borrow().contains(key) {
            return Err(KvError::Db(DbError::Sqlite(
                rusqlite::Error::QueryReturnedNoRows,
            )));
        }
        self.map
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        self.map.borrow_mut().remove(key);
        Ok(())
    }
}
