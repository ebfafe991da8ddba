//! State survives reopening the table from a fresh engine.

use crate::storage::{PageLookup, StorageEngine};
use crate::testing::{TestStore, user, users_schema};

#[test]
fn test_reopen_sees_same_state() {
    let store = TestStore::new();
    let users = store.users();
    let name = "p".repeat(900);
    for id in 1..=6 {
        users.insert(&user(id, &name, 50)).expect("insert");
    }
    users.delete(3).expect("delete");
    let stats = users.stats().expect("stats");

    let engine = StorageEngine::new(store.engine.root());
    assert!(engine.table_exists(TestStore::DB, "users"));
    let reopened = engine.table(TestStore::DB, "users").expect("open table");

    let reopened_stats = reopened.stats().expect("stats");
    assert_eq!(reopened_stats, stats);
    assert_eq!(reopened_stats.schema, users_schema());
    assert_eq!(
        reopened.metadata().expect("metadata").page_for(3),
        PageLookup::Deleted
    );

    // New inserts continue after the last page instead of overwriting it.
    reopened.insert(&user(7, &name, 50)).expect("insert after reopen");
    for id in [1, 2, 4, 5, 6, 7] {
        assert_eq!(reopened.get(id).expect("get")["id"], id.to_string());
    }
}
