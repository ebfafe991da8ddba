// Life of an operation:
// 1. Caller builds a `Record` and picks a `Table` handle
// 2. The table file is opened and its header loaded
// 3. For inserts:
//     - Validate against the schema and the record index
//     - Append to the last page, allocating a new one when it is full
//    For reads and deletes:
//     - Resolve the record id through the index to a page
//     - Find the record's slot on that page
// 4. Write the touched page, then the header
//
// System components:
//  - Record codec
//  - Slotted pages
//  - Table header with the record index

pub mod config;
pub mod record;
pub mod storage;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod testing;

pub use record::{Attribute, AttributeType, Record, RecordId};
pub use storage::{ErrorKind, StorageEngine, StorageError, Table};
