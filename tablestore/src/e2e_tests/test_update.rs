//! Update replaces a record by delete followed by insert.

use crate::record::{AttributeType, Record};
use crate::storage::{ErrorKind, PageLookup};
use crate::testing::{TestStore, user};

#[test]
fn test_update_replaces_values() {
    let store = TestStore::new();
    let users = store.users();
    users.insert(&user(1, "Alice", 30)).expect("insert");

    users.update(1, &user(1, "Alice", 31)).expect("update");

    assert_eq!(users.get(1).expect("get")["age"], "31");
    let stats = users.stats().expect("stats");
    assert_eq!(stats.live_records, 1);
    assert_eq!(stats.deleted_records, 0);
}

#[test]
fn test_update_can_change_id() {
    let store = TestStore::new();
    let users = store.users();
    users.insert(&user(1, "Alice", 30)).expect("insert");

    users.update(1, &user(2, "Alice", 30)).expect("update");

    assert_eq!(users.get(1).expect_err("old id").kind(), ErrorKind::AlreadyDeleted);
    assert_eq!(users.get(2).expect("new id")["name"], "Alice");
}

#[test]
fn test_update_missing_record_inserts_nothing() {
    let store = TestStore::new();
    let users = store.users();

    let err = users.update(9, &user(9, "Nobody", 0)).expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!users.exists(9).expect("exists"));
}

#[test]
fn test_failed_update_leaves_record_deleted() {
    let store = TestStore::new();
    let users = store.users();
    users.insert(&user(1, "Alice", 30)).expect("insert");

    let invalid_age = Record::new()
        .with("id", AttributeType::Int, "1")
        .with("name", AttributeType::String, "Alice")
        .with("age", AttributeType::Double, "30.5");

    let err = users.update(1, &invalid_age).expect_err("type mismatch");
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    assert_eq!(users.metadata().expect("metadata").page_for(1), PageLookup::Deleted);
}
