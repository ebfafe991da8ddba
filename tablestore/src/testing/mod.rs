use tempfile::TempDir;

use crate::record::{AttributeType, Record, RecordId};
use crate::storage::{Schema, StorageEngine, Table};

/// Engine rooted in a temporary directory, with one database already created.
///
/// The directory is removed when the store is dropped.
pub struct TestStore {
    pub engine: StorageEngine,
    _dir: TempDir,
}

impl TestStore {
    pub const DB: &'static str = "test";

    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let engine = StorageEngine::new(dir.path());
        engine.create_database(Self::DB).expect("create database");
        Self { engine, _dir: dir }
    }

    /// The `users` table, created on first use.
    #[allow(clippy::expect_used)]
    pub fn users(&self) -> Table {
        self.engine
            .create_table(Self::DB, "users", &users_schema())
            .expect("create users table")
    }
}

/// `{id: int, name: string, age: int}`
pub fn users_schema() -> Schema {
    Schema::from([
        ("id".to_string(), "int".to_string()),
        ("name".to_string(), "string".to_string()),
        ("age".to_string(), "int".to_string()),
    ])
}

pub fn user(id: RecordId, name: &str, age: i32) -> Record {
    Record::new()
        .with("id", AttributeType::Int, id.to_string())
        .with("name", AttributeType::String, name)
        .with("age", AttributeType::Int, age.to_string())
}
