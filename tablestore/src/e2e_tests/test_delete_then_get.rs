use crate::storage::ErrorKind;
use crate::testing::{TestStore, user};

#[test]
fn test_deleted_record_is_unreadable() {
    let store = TestStore::new();
    let users = store.users();
    for id in 1..=3 {
        users.insert(&user(id, "user", 20)).expect("insert");
    }

    users.delete(2).expect("delete");

    assert_eq!(users.get(2).expect_err("deleted").kind(), ErrorKind::AlreadyDeleted);
    assert!(!users.exists(2).expect("exists"));
    // Neighbours on the same page are untouched.
    assert_eq!(users.get(1).expect("get 1")["id"], "1");
    assert_eq!(users.get(3).expect("get 3")["id"], "3");
}

#[test]
fn test_deleted_bytes_are_zeroed() {
    let store = TestStore::new();
    let users = store.users();
    users.insert(&user(1, "Zelda-the-unique-name", 20)).expect("insert");

    let needle = b"Zelda-the-unique-name";
    let contains = |bytes: &[u8]| bytes.windows(needle.len()).any(|w| w == needle);

    assert!(contains(&std::fs::read(users.path()).expect("read")));
    users.delete(1).expect("delete");
    assert!(!contains(&std::fs::read(users.path()).expect("read")));
}

#[test]
fn test_get_unknown_id() {
    let store = TestStore::new();
    let users = store.users();
    let err = users.get(42).expect_err("never stored");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.is_not_found());
}
