use crate::record::{AttributeType, Record};
use crate::storage::{ErrorKind, Schema};
use crate::testing::TestStore;

#[test]
fn test_index_growth_is_bounded_by_header() {
    let store = TestStore::new();
    let schema = Schema::from([("id".to_string(), "int".to_string())]);
    let table = store
        .engine
        .create_table(TestStore::DB, "ids", &schema)
        .expect("create table");

    let record = |id: i32| Record::new().with("id", AttributeType::Int, id.to_string());

    let mut stored = 0;
    let err = loop {
        match table.insert(&record(stored)) {
            Ok(()) => stored += 1,
            Err(e) => break e,
        }
        assert!(stored < 2000, "header never filled up");
    };

    assert_eq!(err.kind(), ErrorKind::HeaderOverflow);
    // Schema {id: int}: 2 + 9 bytes, page count 2, reserved 508, index count 2.
    assert_eq!(stored, (8192 - 523) / 8);

    // The failed insert wrote nothing.
    assert!(!table.exists(stored).expect("exists"));
    assert_eq!(table.scan().expect("scan").len(), usize::try_from(stored).expect("count"));
}
