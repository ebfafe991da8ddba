//! Random operation sequences checked against an in-memory model.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::record::RecordId;
use crate::storage::{ErrorKind, StorageEngine};
use crate::testing::{TestStore, user};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Live(i32),
    Deleted,
}

fn run(seed: u64, operations: usize) {
    let store = TestStore::new();
    let users = store.users();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model: BTreeMap<RecordId, Slot> = BTreeMap::new();

    for step in 0..operations {
        let id = rng.random_range(0..60);
        let age = rng.random_range(0..120);
        let name = "x".repeat(rng.random_range(1..300));

        match rng.random_range(0..4) {
            0 | 1 => {
                let result = users.insert(&user(id, &name, age));
                if matches!(model.get(&id), Some(Slot::Live(_))) {
                    let err = result.expect_err("duplicate insert");
                    assert_eq!(err.kind(), ErrorKind::SchemaViolation, "seed {seed} step {step}");
                } else {
                    result.expect("insert");
                    model.insert(id, Slot::Live(age));
                }
            }
            2 => {
                let result = users.delete(id);
                match model.get(&id) {
                    Some(Slot::Live(_)) => {
                        result.expect("delete");
                        model.insert(id, Slot::Deleted);
                    }
                    Some(Slot::Deleted) => assert_eq!(
                        result.expect_err("deleted twice").kind(),
                        ErrorKind::AlreadyDeleted
                    ),
                    None => assert_eq!(
                        result.expect_err("unknown id").kind(),
                        ErrorKind::NotFound
                    ),
                }
            }
            _ => {
                let result = users.update(id, &user(id, &name, age));
                if matches!(model.get(&id), Some(Slot::Live(_))) {
                    result.expect("update");
                    model.insert(id, Slot::Live(age));
                } else {
                    assert!(result.expect_err("update of absent id").is_not_found());
                }
            }
        }
    }

    // Check every id against the model, then again through a fresh engine.
    let reopened = StorageEngine::new(store.engine.root())
        .table(TestStore::DB, "users")
        .expect("reopen");
    for table in [&users, &reopened] {
        for id in 0..60 {
            match model.get(&id) {
                Some(Slot::Live(age)) => {
                    assert_eq!(table.get(id).expect("live id")["age"], age.to_string());
                }
                Some(Slot::Deleted) => {
                    assert_eq!(table.get(id).expect_err("deleted").kind(), ErrorKind::AlreadyDeleted);
                }
                None => assert_eq!(table.get(id).expect_err("unknown").kind(), ErrorKind::NotFound),
            }
        }

        let live = model.values().filter(|s| matches!(s, Slot::Live(_))).count();
        let stats = table.stats().expect("stats");
        assert_eq!(stats.live_records, live);
        assert_eq!(stats.deleted_records, model.len() - live);
        assert_eq!(table.scan().expect("scan").len(), live);
    }
}

#[test]
fn test_random_operations_match_model() {
    for seed in [1, 7, 42] {
        run(seed, 300);
    }
}
