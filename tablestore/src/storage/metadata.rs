//! Table header and the tuple-to-page index.
//!
//! The header occupies the first 8KB of a table file and is rewritten in place
//! at the end of every mutating operation.
//!
//! # Layout
//!
//! All integers are little-endian.
//!
//! - `schema_count`: u16
//! - `schema_count` x (`key_len`: u16, key, `value_len`: u16, value)
//! - `page_count`: u16
//! - reserved: 508 bytes
//! - `index_count`: u16
//! - `index_count` x (`record_id`: i32, `page_id`: i32)
//! - zero padding up to 8192 bytes
//!
//! `next_page_id` is not stored; it is derived as `page_count + 1` on load.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::record::RecordId;
use crate::storage::page::{PAGE_SIZE_U64, PageId};

/// Size of the header region at the start of every table file (8KB).
pub const HEADER_SIZE: usize = 8192;

/// Header size as u64 for offset calculations.
pub const HEADER_SIZE_U64: u64 = HEADER_SIZE as u64;

/// Bytes reserved after `page_count` for future header fields.
pub const RESERVED_SIZE: usize = 508;

/// On-disk page id for a record that was never stored.
pub const NOT_FOUND_SENTINEL: i32 = -1;

/// On-disk page id for a soft-deleted record.
pub const DELETED_SENTINEL: i32 = -2;

/// Attribute name to type name.
pub type Schema = BTreeMap<String, String>;

/// What the index holds for a record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEntry {
    Page(PageId),
    Deleted,
}

impl IndexEntry {
    const fn to_raw(self) -> i32 {
        match self {
            Self::Page(page_id) => page_id,
            Self::Deleted => DELETED_SENTINEL,
        }
    }

    /// Both sentinels load as deleted. Any other negative value is invalid.
    const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            DELETED_SENTINEL | NOT_FOUND_SENTINEL => Some(Self::Deleted),
            page_id if page_id >= 0 => Some(Self::Page(page_id)),
            _ => None,
        }
    }
}

/// Result of resolving a record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLookup {
    /// The id was never stored in this table.
    NotFound,
    /// The id existed and has been deleted.
    Deleted,
    /// The page currently holding the record.
    Page(PageId),
}

/// Mapping from record id to the page holding it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleIndex {
    entries: BTreeMap<RecordId, IndexEntry>,
}

impl TupleIndex {
    /// Map `record_id` to `page_id`, replacing any previous entry.
    pub fn set(&mut self, record_id: RecordId, page_id: PageId) {
        if let Some(IndexEntry::Page(previous)) =
            self.entries.insert(record_id, IndexEntry::Page(page_id))
        {
            tracing::warn!(record_id, page_id, previous, "overwriting live index entry");
        }
    }

    pub fn mark_deleted(&mut self, record_id: RecordId) {
        self.entries.insert(record_id, IndexEntry::Deleted);
    }

    #[must_use]
    pub fn lookup(&self, record_id: RecordId) -> PageLookup {
        match self.entries.get(&record_id) {
            None => PageLookup::NotFound,
            Some(IndexEntry::Deleted) => PageLookup::Deleted,
            Some(IndexEntry::Page(page_id)) => PageLookup::Page(*page_id),
        }
    }

    /// Whether the id maps to a live record.
    #[must_use]
    pub fn contains(&self, record_id: RecordId) -> bool {
        matches!(self.lookup(record_id), PageLookup::Page(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, IndexEntry)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, *entry))
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries.values().filter(|e| matches!(e, IndexEntry::Page(_))).count()
    }

    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.len() - self.live_count()
    }
}

/// The table header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    schema: Schema,
    page_count: u16,
    next_page_id: PageId,
    reserved: [u8; RESERVED_SIZE],
    index: TupleIndex,
}

impl FileMetadata {
    /// Header for a freshly created table.
    #[must_use]
    pub const fn new(schema: Schema) -> Self {
        Self {
            schema,
            page_count: 0,
            next_page_id: 1,
            reserved: [0u8; RESERVED_SIZE],
            index: TupleIndex {
                entries: BTreeMap::new(),
            },
        }
    }

    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Id of the last page in the table. Records are appended here first.
    #[must_use]
    pub fn page_count(&self) -> PageId {
        PageId::from(self.page_count)
    }

    #[must_use]
    pub const fn next_page_id(&self) -> PageId {
        self.next_page_id
    }

    /// Move the page counter forward after allocating `next_page_id()`.
    ///
    /// When the counter runs past `page_count` the table is treated as having
    /// grown and `page_count` follows it.
    pub fn advance_page_id(&mut self) -> Result<(), MetadataError> {
        if self.next_page_id >= self.page_count() {
            tracing::debug!(
                next_page_id = self.next_page_id,
                page_count = self.page_count,
                "page counter ran past page_count, extending table"
            );
            self.page_count = self
                .page_count
                .checked_add(1)
                .ok_or(MetadataError::PageCountOverflow)?;
        }
        self.next_page_id += 1;
        Ok(())
    }

    #[must_use]
    pub const fn index(&self) -> &TupleIndex {
        &self.index
    }

    pub const fn index_mut(&mut self) -> &mut TupleIndex {
        &mut self.index
    }

    /// Whether `record_id` maps to a live record.
    #[must_use]
    pub fn record_exists(&self, record_id: RecordId) -> bool {
        self.index.contains(record_id)
    }

    pub fn mark_deleted(&mut self, record_id: RecordId) {
        self.index.mark_deleted(record_id);
    }

    #[must_use]
    pub fn page_for(&self, record_id: RecordId) -> PageLookup {
        self.index.lookup(record_id)
    }

    pub fn set(&mut self, record_id: RecordId, page_id: PageId) {
        self.index.set(record_id, page_id);
    }

    /// Byte offset of a page within the table file.
    pub fn page_offset(&self, page_id: PageId) -> Result<u64, MetadataError> {
        if page_id < 0 || page_id > self.page_count() {
            return Err(MetadataError::PageOutOfBounds {
                page_id,
                page_count: self.page_count(),
            });
        }
        Ok(HEADER_SIZE_U64 + u64::from(page_id.unsigned_abs()) * PAGE_SIZE_U64)
    }

    /// Encode the header into exactly `HEADER_SIZE` bytes.
    pub fn encode(&self) -> Result<Vec<u8>, MetadataError> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);

        put_count(&mut buf, self.schema.len())?;
        for (key, value) in &self.schema {
            put_str(&mut buf, key)?;
            put_str(&mut buf, value)?;
        }

        buf.extend_from_slice(&self.page_count.to_le_bytes());
        buf.extend_from_slice(&self.reserved);

        put_count(&mut buf, self.index.len())?;
        for (record_id, entry) in self.index.iter() {
            buf.extend_from_slice(&record_id.to_le_bytes());
            buf.extend_from_slice(&entry.to_raw().to_le_bytes());
        }

        if buf.len() > HEADER_SIZE {
            return Err(MetadataError::HeaderOverflow { size: buf.len() });
        }
        buf.resize(HEADER_SIZE, 0);
        Ok(buf)
    }

    /// Decode a header from its `HEADER_SIZE`-byte region.
    pub fn decode(bytes: &[u8]) -> Result<Self, MetadataError> {
        let mut cursor = Cursor { buf: bytes, pos: 0 };

        let schema_count = cursor.u16()?;
        let mut schema = Schema::new();
        for _ in 0..schema_count {
            let key = cursor.string()?;
            let value = cursor.string()?;
            schema.insert(key, value);
        }

        let page_count = cursor.u16()?;
        let mut reserved = [0u8; RESERVED_SIZE];
        reserved.copy_from_slice(cursor.take(RESERVED_SIZE)?);

        let index_count = cursor.u16()?;
        let mut index = TupleIndex::default();
        for _ in 0..index_count {
            let record_id = cursor.i32()?;
            let raw = cursor.i32()?;
            if raw == NOT_FOUND_SENTINEL {
                tracing::warn!(record_id, "index entry carries the not-found sentinel");
            }
            let entry = IndexEntry::from_raw(raw).ok_or(MetadataError::InvalidIndexEntry {
                record_id,
                page_id: raw,
            })?;
            index.entries.insert(record_id, entry);
        }

        Ok(Self {
            schema,
            page_count,
            next_page_id: PageId::from(page_count) + 1,
            reserved,
            index,
        })
    }

    /// Read the header region from `reader`.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self, MetadataError> {
        let mut buf = vec![0u8; HEADER_SIZE];
        reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                MetadataError::Truncated
            } else {
                MetadataError::Io(e)
            }
        })?;
        Self::decode(&buf)
    }

    /// Write the header region to `writer`.
    ///
    /// The writer must be positioned at the start of the table file.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), MetadataError> {
        let buf = self.encode()?;
        writer.write_all(&buf).map_err(MetadataError::Io)
    }
}

impl std::fmt::Display for FileMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "schema:")?;
        if self.schema.is_empty() {
            writeln!(f, "  (empty)")?;
        }
        for (name, type_name) in &self.schema {
            writeln!(f, "  {name}: {type_name}")?;
        }
        writeln!(f, "page count: {}", self.page_count)?;
        writeln!(f, "tuple-to-page index:")?;
        if self.index.is_empty() {
            writeln!(f, "  (empty)")?;
        }
        for (record_id, entry) in self.index.iter() {
            match entry {
                IndexEntry::Page(page_id) => writeln!(f, "  {record_id} -> page {page_id}")?,
                IndexEntry::Deleted => writeln!(f, "  {record_id} -> (deleted)")?,
            }
        }
        Ok(())
    }
}

fn put_count(buf: &mut Vec<u8>, count: usize) -> Result<(), MetadataError> {
    let count = u16::try_from(count).map_err(|_| MetadataError::TooManyEntries(count))?;
    buf.extend_from_slice(&count.to_le_bytes());
    Ok(())
}

fn put_str(buf: &mut Vec<u8>, s: &str) -> Result<(), MetadataError> {
    put_count(buf, s.len())?;
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Bounds-checked reader over the header bytes.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], MetadataError> {
        let end = self.pos.checked_add(len).ok_or(MetadataError::Truncated)?;
        let bytes = self.buf.get(self.pos..end).ok_or(MetadataError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn u16(&mut self) -> Result<u16, MetadataError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn i32(&mut self) -> Result<i32, MetadataError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self) -> Result<String, MetadataError> {
        let len = usize::from(self.u16()?);
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| MetadataError::InvalidUtf8)
    }
}

/// Errors that can occur when reading or writing the table header.
#[derive(Debug)]
pub enum MetadataError {
    /// I/O error.
    Io(std::io::Error),
    /// The header ended before all declared fields were read.
    Truncated,
    /// A schema entry is not valid UTF-8.
    InvalidUtf8,
    /// The encoded header does not fit in its fixed region.
    HeaderOverflow { size: usize },
    /// A count does not fit its 16-bit field.
    TooManyEntries(usize),
    /// The page counter is exhausted.
    PageCountOverflow,
    /// Page id outside `[0, page_count]`.
    PageOutOfBounds { page_id: PageId, page_count: PageId },
    /// An index entry holds a negative page id that is not a sentinel.
    InvalidIndexEntry { record_id: RecordId, page_id: i32 },
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Truncated => write!(f, "table header is truncated"),
            Self::InvalidUtf8 => write!(f, "schema entry is not valid UTF-8"),
            Self::HeaderOverflow { size } => {
                write!(f, "header needs {size} bytes (limit: {HEADER_SIZE})")
            }
            Self::TooManyEntries(count) => write!(f, "{count} entries do not fit a 16-bit count"),
            Self::PageCountOverflow => write!(f, "page count overflow"),
            Self::PageOutOfBounds {
                page_id,
                page_count,
            } => write!(f, "page {page_id} out of bounds (page count: {page_count})"),
            Self::InvalidIndexEntry { record_id, page_id } => {
                write!(f, "index entry for record {record_id} has invalid page id {page_id}")
            }
        }
    }
}

impl std::error::Error for MetadataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
