//! Slotted-page table storage.
//!
//! Each table lives in a single `.HAD` file:
//!
//! - Bytes `0..8192`: table header (schema, page count, record index)
//! - Then one 4096-byte slotted page per page id, starting at page 0
//!
//! # Usage
//!
//! ```ignore
//! use tablestore::storage::StorageEngine;
//!
//! let engine = StorageEngine::new("./data");
//! engine.create_database("shop")?;
//! let users = engine.create_table("shop", "users", &schema)?;
//!
//! users.insert(&record)?;
//! let values = users.get(1)?;
//! users.delete(1)?;
//! ```

mod engine;
mod error;
mod file;
mod metadata;
mod page;

pub use engine::{StorageEngine, TABLE_EXTENSION, Table, TableStats};
pub use error::{ErrorKind, SchemaViolation, StorageError};
pub use file::{FileError, TableFile};
pub use metadata::{
    FileMetadata, HEADER_SIZE, IndexEntry, MetadataError, PageLookup, Schema, TupleIndex,
};
pub use page::{MAX_RECORD_SIZE, PAGE_SIZE, PageError, PageHeader, PageId, Slot, SlottedPage};
