//! Insert, read back and delete a single user.

use crate::storage::PageLookup;
use crate::testing::{TestStore, user};

#[test]
fn test_alice_round_trip() {
    let store = TestStore::new();
    let users = store.users();

    users.insert(&user(1, "Alice", 30)).expect("insert Alice");

    let values = users.get(1).expect("get Alice");
    assert_eq!(values.len(), 3);
    assert_eq!(values["id"], "1");
    assert_eq!(values["name"], "Alice");
    assert_eq!(values["age"], "30");

    let metadata = users.metadata().expect("metadata");
    assert_eq!(metadata.page_for(1), PageLookup::Page(0));
    assert_eq!(metadata.page_count(), 0);

    users.delete(1).expect("delete Alice");
    let err = users.get(1).expect_err("Alice is gone");
    assert!(err.is_not_found());
    assert!(!users.exists(1).expect("exists"));
    assert_eq!(users.metadata().expect("metadata").page_for(1), PageLookup::Deleted);
}

#[test]
fn test_get_record_keeps_attribute_order() {
    let store = TestStore::new();
    let users = store.users();
    let alice = user(1, "Alice", 30);
    users.insert(&alice).expect("insert Alice");

    assert_eq!(users.get_record(1).expect("get Alice"), alice);
}
