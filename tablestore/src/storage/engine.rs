//! Table lifecycle and record operations.
//!
//! A [`StorageEngine`] owns the data directory. Databases are sub-directories
//! and each table is a single `.HAD` file inside one. Operations run against a
//! [`Table`] handle, which carries nothing but the table's path: every call
//! opens the file, loads the header, does its work, writes the touched page and
//! then the header, and drops the file handle.
//!
//! There is no locking. Running operations against the same table from several
//! threads or processes at once can interleave their writes.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::record::{AttributeType, ID_ATTRIBUTE, Record, RecordId};
use crate::storage::error::{SchemaViolation, StorageError};
use crate::storage::file::TableFile;
use crate::storage::metadata::{FileMetadata, PageLookup, Schema};
use crate::storage::page::{MAX_RECORD_SIZE, PageId, SlottedPage};

/// File extension of table files.
pub const TABLE_EXTENSION: &str = "HAD";

/// Entry point for creating and opening tables.
#[derive(Debug, Clone)]
pub struct StorageEngine {
    root: PathBuf,
    sync_writes: bool,
}

impl StorageEngine {
    /// Engine rooted at `root`. The directory is created lazily by
    /// [`StorageEngine::create_database`].
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sync_writes: false,
        }
    }

    #[must_use]
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            root: config.data_directory.clone(),
            sync_writes: config.sync_writes,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn database_path(&self, db: &str) -> PathBuf {
        self.root.join(db)
    }

    fn table_path(&self, db: &str, table: &str) -> PathBuf {
        self.database_path(db)
            .join(format!("{table}.{TABLE_EXTENSION}"))
    }

    /// Create the database directory if it does not exist yet.
    pub fn create_database(&self, db: &str) -> Result<(), StorageError> {
        let path = self.database_path(db);
        if !path.is_dir() {
            fs::create_dir_all(&path)?;
            tracing::info!("created database {}", path.display());
        }
        Ok(())
    }

    #[must_use]
    pub fn database_exists(&self, db: &str) -> bool {
        self.database_path(db).is_dir()
    }

    #[must_use]
    pub fn table_exists(&self, db: &str, table: &str) -> bool {
        self.table_path(db, table).is_file()
    }

    /// Create a table with the given schema.
    ///
    /// If the table already exists it is opened as-is and its stored schema is
    /// kept.
    pub fn create_table(&self, db: &str, table: &str, schema: &Schema) -> Result<Table, StorageError> {
        if !self.database_exists(db) {
            return Err(StorageError::DatabaseNotFound(self.database_path(db)));
        }

        let path = self.table_path(db, table);
        if path.exists() {
            tracing::debug!("table {} already exists", path.display());
            return self.table(db, table);
        }

        for (attribute, type_name) in schema {
            if AttributeType::from_name(type_name).is_none() {
                return Err(SchemaViolation::UnknownType {
                    attribute: attribute.clone(),
                    type_name: type_name.clone(),
                }
                .into());
            }
        }

        TableFile::create(&path, &FileMetadata::new(schema.clone()))?;
        tracing::info!("created table {}", path.display());

        Ok(Table {
            path,
            sync_writes: self.sync_writes,
        })
    }

    /// Remove a table file.
    pub fn drop_table(&self, db: &str, table: &str) -> Result<(), StorageError> {
        let path = self.table_path(db, table);
        if !path.is_file() {
            return Err(StorageError::TableNotFound(path));
        }
        fs::remove_file(&path)?;
        tracing::info!("dropped table {}", path.display());
        Ok(())
    }

    /// Handle to an existing table.
    pub fn table(&self, db: &str, table: &str) -> Result<Table, StorageError> {
        if !self.database_exists(db) {
            return Err(StorageError::DatabaseNotFound(self.database_path(db)));
        }
        let path = self.table_path(db, table);
        if !path.is_file() {
            return Err(StorageError::TableNotFound(path));
        }
        Ok(Table {
            path,
            sync_writes: self.sync_writes,
        })
    }
}

/// Summary of a table's header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub schema: Schema,
    /// Id of the last page.
    pub page_count: PageId,
    pub live_records: usize,
    pub deleted_records: usize,
}

/// Handle to one table file.
///
/// The handle does not keep the file open or cache any state between calls.
#[derive(Debug, Clone)]
pub struct Table {
    path: PathBuf,
    sync_writes: bool,
}

impl Table {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<TableFile, StorageError> {
        if !self.path.is_file() {
            return Err(StorageError::TableNotFound(self.path.clone()));
        }
        Ok(TableFile::open(&self.path)?)
    }

    fn finish(&self, file: &TableFile) -> Result<(), StorageError> {
        if self.sync_writes {
            file.sync()?;
        }
        Ok(())
    }

    /// Insert a record.
    ///
    /// The record is validated against the schema and its id must not belong
    /// to a live record. It is appended to the last page, or to a freshly
    /// allocated page when the last one is full.
    pub fn insert(&self, record: &Record) -> Result<(), StorageError> {
        let mut file = self.open()?;
        let mut metadata = file.read_metadata()?;

        let record_id = validate(&metadata, record)?;
        let encoded = record.encode();
        if encoded.len() > MAX_RECORD_SIZE {
            return Err(StorageError::RecordTooLarge {
                size: encoded.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let last_page_id = metadata.page_count();
        let mut page = match file.read_page(&metadata, last_page_id)? {
            Some(page) => page,
            None => SlottedPage::allocate(last_page_id)?,
        };

        if page.insert_record(encoded.as_bytes(), record_id, metadata.index_mut()) {
            let header = metadata.encode()?;
            file.write_page(&metadata, &page)?;
            file.write_header_bytes(&header)?;
        } else {
            let new_page_id = metadata.next_page_id();
            tracing::debug!(
                full_page = last_page_id,
                new_page_id,
                "last page is full, allocating a new one"
            );

            let mut page = SlottedPage::allocate(new_page_id)?;
            if !page.insert_record(encoded.as_bytes(), record_id, metadata.index_mut()) {
                return Err(StorageError::RecordTooLarge {
                    size: encoded.len(),
                    max: MAX_RECORD_SIZE,
                });
            }
            metadata.advance_page_id()?;

            let header = metadata.encode()?;
            file.append_page(&metadata, &page)?;
            file.write_header_bytes(&header)?;
        }

        self.finish(&file)?;
        tracing::debug!(record_id, table = %self.path.display(), "inserted record");
        Ok(())
    }

    /// Fetch a record.
    pub fn get_record(&self, record_id: RecordId) -> Result<Record, StorageError> {
        let mut file = self.open()?;
        let metadata = file.read_metadata()?;

        let (page, slot) = locate(&mut file, &metadata, record_id)?;
        page.record(slot)?.ok_or_else(|| {
            StorageError::Corruption(format!(
                "record {record_id} on page {} cannot be decoded",
                page.page_id()
            ))
        })
    }

    /// Fetch a record's attribute values keyed by attribute name.
    pub fn get(&self, record_id: RecordId) -> Result<BTreeMap<String, String>, StorageError> {
        Ok(self.get_record(record_id)?.to_map())
    }

    /// Delete a record.
    ///
    /// The record's bytes are zeroed and its index entry is marked deleted. The
    /// space it occupied is not reused.
    pub fn delete(&self, record_id: RecordId) -> Result<(), StorageError> {
        let mut file = self.open()?;
        let mut metadata = file.read_metadata()?;

        let (mut page, slot) = locate(&mut file, &metadata, record_id)?;
        page.delete_record(slot)?;
        metadata.mark_deleted(record_id);

        let header = metadata.encode()?;
        file.write_page(&metadata, &page)?;
        file.write_header_bytes(&header)?;

        self.finish(&file)?;
        tracing::debug!(record_id, table = %self.path.display(), "deleted record");
        Ok(())
    }

    /// Replace a record by deleting it and inserting `record`.
    ///
    /// If the delete fails nothing is inserted. If the insert fails the old
    /// record stays deleted.
    pub fn update(&self, record_id: RecordId, record: &Record) -> Result<(), StorageError> {
        self.delete(record_id)?;
        self.insert(record).inspect_err(|e| {
            tracing::warn!(record_id, "update removed the old record but the insert failed: {e}");
        })
    }

    /// Whether the id maps to a live record.
    pub fn exists(&self, record_id: RecordId) -> Result<bool, StorageError> {
        let mut file = self.open()?;
        Ok(file.read_metadata()?.record_exists(record_id))
    }

    /// Every live record, in page and slot order.
    pub fn scan(&self) -> Result<Vec<Record>, StorageError> {
        let mut file = self.open()?;
        let metadata = file.read_metadata()?;

        let mut records = Vec::new();
        for page_id in 0..=metadata.page_count() {
            if let Some(page) = file.read_page(&metadata, page_id)? {
                records.extend(page.records().map(|(_, record)| record));
            }
        }
        Ok(records)
    }

    /// The table header, freshly loaded.
    pub fn metadata(&self) -> Result<FileMetadata, StorageError> {
        Ok(self.open()?.read_metadata()?)
    }

    pub fn stats(&self) -> Result<TableStats, StorageError> {
        let metadata = self.metadata()?;
        Ok(TableStats {
            schema: metadata.schema().clone(),
            page_count: metadata.page_count(),
            live_records: metadata.index().live_count(),
            deleted_records: metadata.index().deleted_count(),
        })
    }
}

/// Check a record against the schema and the index. Returns its id.
///
/// Empty names and values are rejected because the encoding drops such fields
/// on read.
fn validate(metadata: &FileMetadata, record: &Record) -> Result<RecordId, SchemaViolation> {
    let mut seen = BTreeSet::new();
    for attribute in record.attributes() {
        if attribute.name.is_empty() || attribute.value.is_empty() {
            return Err(SchemaViolation::InvalidValue {
                attribute: attribute.name.clone(),
                value: attribute.value.clone(),
            });
        }
        if !seen.insert(attribute.name.as_str()) {
            return Err(SchemaViolation::DuplicateAttribute(attribute.name.clone()));
        }
    }

    for (name, type_name) in metadata.schema() {
        let attribute = record
            .attribute(name)
            .ok_or_else(|| SchemaViolation::MissingAttribute(name.clone()))?;

        if attribute.attribute_type.name() != type_name.as_str() {
            return Err(SchemaViolation::TypeMismatch {
                attribute: name.clone(),
                expected: type_name.clone(),
                actual: attribute.attribute_type.name().to_string(),
            });
        }
        if !attribute.attribute_type.accepts(&attribute.value) {
            return Err(SchemaViolation::InvalidValue {
                attribute: name.clone(),
                value: attribute.value.clone(),
            });
        }
    }

    let raw_id = record.value(ID_ATTRIBUTE).ok_or(SchemaViolation::MissingId)?;
    let record_id = record
        .id()
        .ok_or_else(|| SchemaViolation::InvalidId(raw_id.to_string()))?;

    if metadata.record_exists(record_id) {
        return Err(SchemaViolation::DuplicateId(record_id));
    }
    Ok(record_id)
}

/// Resolve a record id to its page and slot.
///
/// An index entry whose page does not hold the record is reported as
/// corruption, never repaired.
fn locate(
    file: &mut TableFile,
    metadata: &FileMetadata,
    record_id: RecordId,
) -> Result<(SlottedPage, usize), StorageError> {
    let page_id = match metadata.page_for(record_id) {
        PageLookup::NotFound => return Err(StorageError::RecordNotFound(record_id)),
        PageLookup::Deleted => return Err(StorageError::AlreadyDeleted(record_id)),
        PageLookup::Page(page_id) => page_id,
    };

    let page = file.read_page(metadata, page_id)?.ok_or_else(|| {
        StorageError::Corruption(format!(
            "record {record_id} maps to page {page_id}, which is not in the file"
        ))
    })?;

    let slot = page.find_slot_by_record_id(record_id).ok_or_else(|| {
        StorageError::Corruption(format!(
            "record {record_id} maps to page {page_id} but is not stored there"
        ))
    })?;

    Ok((page, slot))
}
