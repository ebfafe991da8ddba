//! Errors returned by table operations.
//!
//! Every lower-level failure is folded into a [`StorageError`], and each
//! variant reports one [`ErrorKind`] so callers can branch on the category
//! without matching every variant.

use std::path::PathBuf;

use crate::record::RecordId;
use crate::storage::file::FileError;
use crate::storage::metadata::{HEADER_SIZE, MetadataError};
use crate::storage::page::{PageError, PageId};

/// Broad category of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown database, table or record id.
    NotFound,
    /// The record id exists but has been deleted.
    AlreadyDeleted,
    /// The record does not satisfy the table schema or repeats an id.
    SchemaViolation,
    /// On-disk state is inconsistent.
    Corruption,
    /// The file could not be opened, read or written.
    Io,
    /// A page id outside `[0, page_count]`.
    OutOfBounds,
    /// The encoded record does not fit in an empty page.
    RecordTooLarge,
    /// The table header no longer fits in its fixed region.
    HeaderOverflow,
}

/// Why a record was rejected on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// A schema attribute is absent from the record.
    MissingAttribute(String),
    /// The record's attribute type differs from the schema.
    TypeMismatch {
        attribute: String,
        expected: String,
        actual: String,
    },
    /// The value cannot be read as the declared type.
    InvalidValue { attribute: String, value: String },
    /// The schema names a type this engine does not know.
    UnknownType { attribute: String, type_name: String },
    /// The record has no `id` attribute.
    MissingId,
    /// The `id` attribute is not a 32-bit integer.
    InvalidId(String),
    /// A live record already uses this id.
    DuplicateId(RecordId),
    /// The record carries the same attribute name more than once.
    DuplicateAttribute(String),
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingAttribute(name) => write!(f, "missing attribute: {name}"),
            Self::TypeMismatch {
                attribute,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {attribute}: expected {expected}, got {actual}"
            ),
            Self::InvalidValue { attribute, value } => {
                write!(f, "invalid value for {attribute}: {value:?}")
            }
            Self::UnknownType {
                attribute,
                type_name,
            } => write!(f, "unknown type {type_name:?} for {attribute}"),
            Self::MissingId => write!(f, "record has no id attribute"),
            Self::InvalidId(value) => write!(f, "id {value:?} is not a 32-bit integer"),
            Self::DuplicateId(id) => write!(f, "duplicate id: {id}"),
            Self::DuplicateAttribute(name) => write!(f, "attribute {name} appears more than once"),
        }
    }
}

/// Errors that can occur during table operations.
#[derive(Debug)]
pub enum StorageError {
    /// Database directory does not exist.
    DatabaseNotFound(PathBuf),
    /// Table file does not exist.
    TableNotFound(PathBuf),
    /// Record id was never stored.
    RecordNotFound(RecordId),
    /// Record id has been deleted.
    AlreadyDeleted(RecordId),
    /// Record rejected by schema or uniqueness checks.
    Schema(SchemaViolation),
    /// Inconsistent on-disk state.
    Corruption(String),
    /// I/O error.
    Io(std::io::Error),
    /// Page id out of bounds.
    PageOutOfBounds { page_id: PageId, page_count: PageId },
    /// Encoded record larger than an empty page can hold.
    RecordTooLarge { size: usize, max: usize },
    /// Header no longer fits in its fixed region.
    HeaderOverflow { size: usize },
    /// A header count (schema entries or index entries) exceeds its 16-bit field.
    TooManyEntries { count: usize },
    /// The table already has the largest page id the header can record.
    PageCountOverflow,
    /// Page id that cannot be stored in a page frame.
    InvalidPageId(PageId),
}

impl StorageError {
    /// The category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseNotFound(_) | Self::TableNotFound(_) | Self::RecordNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::AlreadyDeleted(_) => ErrorKind::AlreadyDeleted,
            Self::Schema(_) => ErrorKind::SchemaViolation,
            Self::Corruption(_) => ErrorKind::Corruption,
            Self::Io(_) => ErrorKind::Io,
            Self::PageOutOfBounds { .. } | Self::PageCountOverflow | Self::InvalidPageId(_) => {
                ErrorKind::OutOfBounds
            }
            Self::RecordTooLarge { .. } => ErrorKind::RecordTooLarge,
            Self::HeaderOverflow { .. } | Self::TooManyEntries { .. } => ErrorKind::HeaderOverflow,
        }
    }

    /// Whether the record (or its table) cannot be found, including deleted
    /// records.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::AlreadyDeleted)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseNotFound(p) => write!(f, "database not found: {}", p.display()),
            Self::TableNotFound(p) => write!(f, "table not found: {}", p.display()),
            Self::RecordNotFound(id) => write!(f, "record {id} not found"),
            Self::AlreadyDeleted(id) => write!(f, "record {id} has been deleted"),
            Self::Schema(v) => write!(f, "schema violation: {v}"),
            Self::Corruption(msg) => write!(f, "corruption: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::PageOutOfBounds {
                page_id,
                page_count,
            } => write!(f, "page {page_id} out of bounds (page count: {page_count})"),
            Self::RecordTooLarge { size, max } => {
                write!(f, "record of {size} bytes exceeds the {max} byte limit")
            }
            Self::HeaderOverflow { size } => {
                write!(f, "table header needs {size} bytes (limit: {HEADER_SIZE})")
            }
            Self::TooManyEntries { count } => {
                write!(f, "{count} header entries do not fit a 16-bit count")
            }
            Self::PageCountOverflow => {
                write!(f, "page count would exceed {}", u16::MAX)
            }
            Self::InvalidPageId(page_id) => write!(f, "invalid page id: {page_id}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<SchemaViolation> for StorageError {
    fn from(v: SchemaViolation) -> Self {
        Self::Schema(v)
    }
}

impl From<MetadataError> for StorageError {
    fn from(e: MetadataError) -> Self {
        match e {
            MetadataError::Io(io_err) => Self::Io(io_err),
            MetadataError::PageOutOfBounds {
                page_id,
                page_count,
            } => Self::PageOutOfBounds {
                page_id,
                page_count,
            },
            MetadataError::HeaderOverflow { size } => Self::HeaderOverflow { size },
            MetadataError::TooManyEntries(count) => Self::TooManyEntries { count },
            MetadataError::PageCountOverflow => Self::PageCountOverflow,
            MetadataError::Truncated
            | MetadataError::InvalidUtf8
            | MetadataError::InvalidIndexEntry { .. } => {
                Self::Corruption(format!("table header: {e}"))
            }
        }
    }
}

impl From<PageError> for StorageError {
    fn from(e: PageError) -> Self {
        match e {
            PageError::InvalidPageId(page_id) => Self::InvalidPageId(page_id),
            other => Self::Corruption(other.to_string()),
        }
    }
}

impl From<FileError> for StorageError {
    fn from(e: FileError) -> Self {
        match e {
            FileError::Io(io_err) => Self::Io(io_err),
            FileError::Metadata(e) => e.into(),
            FileError::Page { page_id, source } => match source {
                PageError::InvalidPageId(_) => source.into(),
                other => Self::Corruption(format!("page {page_id}: {other}")),
            },
            FileError::TornPage { .. } | FileError::MisplacedPage { .. } => {
                Self::Corruption(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let e = StorageError::PageOutOfBounds {
            page_id: 10,
            page_count: 5,
        };
        assert!(e.to_string().contains("page 10"));
        assert!(e.to_string().contains("page count: 5"));

        let e = StorageError::from(SchemaViolation::DuplicateId(4));
        assert_eq!(e.to_string(), "schema violation: duplicate id: 4");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(StorageError::RecordNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(StorageError::AlreadyDeleted(1).kind(), ErrorKind::AlreadyDeleted);
        assert!(StorageError::AlreadyDeleted(1).is_not_found());
        assert!(!StorageError::Corruption(String::new()).is_not_found());

        let e = StorageError::from(MetadataError::Truncated);
        assert_eq!(e.kind(), ErrorKind::Corruption);

        let e = StorageError::from(MetadataError::PageOutOfBounds {
            page_id: 3,
            page_count: 1,
        });
        assert_eq!(e.kind(), ErrorKind::OutOfBounds);

        let e = StorageError::from(PageError::SlotDeleted(2));
        assert_eq!(e.kind(), ErrorKind::Corruption);

        let e = StorageError::from(MetadataError::InvalidIndexEntry {
            record_id: 1,
            page_id: -9,
        });
        assert_eq!(e.kind(), ErrorKind::Corruption);
    }

    #[test]
    fn test_header_limits_keep_their_values() {
        let e = StorageError::from(MetadataError::TooManyEntries(70_000));
        assert!(matches!(e, StorageError::TooManyEntries { count: 70_000 }));
        assert_eq!(e.kind(), ErrorKind::HeaderOverflow);
        assert!(e.to_string().contains("70000"));

        let e = StorageError::from(MetadataError::PageCountOverflow);
        assert!(matches!(e, StorageError::PageCountOverflow));
        assert_eq!(e.kind(), ErrorKind::OutOfBounds);

        let e = StorageError::from(PageError::InvalidPageId(-3));
        assert!(matches!(e, StorageError::InvalidPageId(-3)));
        assert_eq!(e.kind(), ErrorKind::OutOfBounds);
    }
}
