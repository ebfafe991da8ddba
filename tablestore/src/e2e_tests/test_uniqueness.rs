//! A live id can only be stored once.

use crate::storage::{ErrorKind, SchemaViolation, StorageError};
use crate::testing::{TestStore, user};

#[test]
fn test_duplicate_insert_is_rejected() {
    let store = TestStore::new();
    let users = store.users();
    users.insert(&user(7, "Grace", 85)).expect("first insert");

    let before = std::fs::read(users.path()).expect("read table file");

    let err = users.insert(&user(7, "Impostor", 1)).expect_err("duplicate");
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    assert!(matches!(
        err,
        StorageError::Schema(SchemaViolation::DuplicateId(7))
    ));

    // Rejected inserts leave the file untouched.
    let after = std::fs::read(users.path()).expect("read table file");
    assert_eq!(before, after);
    assert_eq!(users.get(7).expect("get")["name"], "Grace");
}

#[test]
fn test_distinct_ids_coexist() {
    let store = TestStore::new();
    let users = store.users();
    for id in 1..=20 {
        users.insert(&user(id, "user", id)).expect("insert");
    }

    let stats = users.stats().expect("stats");
    assert_eq!(stats.live_records, 20);
    assert_eq!(users.scan().expect("scan").len(), 20);
}
