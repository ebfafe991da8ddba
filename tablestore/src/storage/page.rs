//! Slotted pages.
//!
//! A page is a fixed 4KB frame. The front of the frame holds a small header
//! followed by the slot directory; record bytes are packed from the back of the
//! frame towards the front, most recent insertion lowest.
//!
//! # Frame layout
//!
//! - `page_id`: u16
//! - `slot_count`: u16
//! - `free_space`: u16
//! - `free_space_end`: u16
//! - `active_slot_count`: u16
//! - `active_slot_count` x (`offset`: u16, `length`: u16)
//! - free region
//! - record bytes in `[free_space_end, PAGE_SIZE)`
//!
//! Deleting a record zeroes its bytes and retires its slot but does not give the
//! space back. Only live slots are written out, so a page reloaded after a
//! delete has a shorter directory than the one it was saved from.

// PAGE_SIZE fits in u16, and every offset/length is bounded by it.
#![allow(clippy::cast_possible_truncation)]

use crate::record::{Record, RecordId};
use crate::storage::metadata::TupleIndex;

/// Page size in bytes (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Page size as u64 for offset calculations.
pub const PAGE_SIZE_U64: u64 = PAGE_SIZE as u64;

/// A page identifier (0-indexed, relative to the end of the table header).
pub type PageId = i32;

/// Size of one slot directory entry in bytes.
pub const SLOT_SIZE: usize = 4;

/// Bytes at the front of every frame before the first slot entry:
/// the page header plus the active slot count.
pub const PAGE_PREAMBLE_SIZE: usize = PageHeader::SIZE + 2;

/// Largest encoded record that fits in an empty page.
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - PAGE_PREAMBLE_SIZE - SLOT_SIZE;

/// Page header stored at the start of every frame.
///
/// Layout:
/// - `page_id`: 2 bytes
/// - `slot_count`: 2 bytes
/// - `free_space`: 2 bytes
/// - `free_space_end`: 2 bytes
///
/// Total: 8 bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub page_id: u16,
    /// Number of live records on the page.
    pub slot_count: u16,
    /// Bytes left between the slot directory and `free_space_end`.
    pub free_space: u16,
    /// Lowest offset occupied by record bytes.
    pub free_space_end: u16,
}

impl PageHeader {
    /// Size of the page header in bytes.
    pub const SIZE: usize = 8;

    /// Serialize the header to bytes.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.page_id.to_le_bytes());
        buf[2..4].copy_from_slice(&self.slot_count.to_le_bytes());
        buf[4..6].copy_from_slice(&self.free_space.to_le_bytes());
        buf[6..8].copy_from_slice(&self.free_space_end.to_le_bytes());
        buf
    }

    /// Deserialize a header from bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self {
            page_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            slot_count: u16::from_le_bytes([bytes[2], bytes[3]]),
            free_space: u16::from_le_bytes([bytes[4], bytes[5]]),
            free_space_end: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }
}

/// One slot directory entry. A zero length marks a deleted record.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    pub offset: u16,
    pub length: u16,
}

impl Slot {
    #[must_use]
    pub const fn is_active(self) -> bool {
        self.length > 0
    }

    const fn end(self) -> usize {
        self.offset as usize + self.length as usize
    }
}

/// A slotted page held in memory for the duration of one operation.
pub struct SlottedPage {
    header: PageHeader,
    slots: Vec<Slot>,
    data: Box<[u8; PAGE_SIZE]>,
}

impl SlottedPage {
    /// Create an empty page.
    pub fn allocate(page_id: PageId) -> Result<Self, PageError> {
        let page_id = u16::try_from(page_id).map_err(|_| PageError::InvalidPageId(page_id))?;

        Ok(Self {
            header: PageHeader {
                page_id,
                slot_count: 0,
                free_space: (PAGE_SIZE - PAGE_PREAMBLE_SIZE) as u16,
                free_space_end: PAGE_SIZE as u16,
            },
            slots: Vec::new(),
            data: Box::new([0u8; PAGE_SIZE]),
        })
    }

    #[must_use]
    pub fn page_id(&self) -> PageId {
        PageId::from(self.header.page_id)
    }

    #[must_use]
    pub const fn header(&self) -> PageHeader {
        self.header
    }

    /// Number of live records.
    #[must_use]
    pub const fn slot_count(&self) -> u16 {
        self.header.slot_count
    }

    #[must_use]
    pub const fn free_space(&self) -> usize {
        self.header.free_space as usize
    }

    /// The slot directory, including retired slots.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Whether a record of `len` bytes plus its slot fits in the free space.
    #[must_use]
    pub const fn can_fit(&self, len: usize) -> bool {
        len + SLOT_SIZE <= self.header.free_space as usize
    }

    /// Insert encoded record bytes and map `record_id` to this page in `index`.
    ///
    /// Returns `false` without touching the page or the index if there is not
    /// enough free space.
    pub fn insert_record(&mut self, bytes: &[u8], record_id: RecordId, index: &mut TupleIndex) -> bool {
        if bytes.is_empty() || !self.can_fit(bytes.len()) {
            return false;
        }

        let length = bytes.len() as u16;
        let offset = self.header.free_space_end - length;
        debug_assert!(
            offset as usize >= PAGE_PREAMBLE_SIZE + (self.slots.len() + 1) * SLOT_SIZE,
            "record bytes would overlap the slot directory"
        );

        self.data[offset as usize..offset as usize + bytes.len()].copy_from_slice(bytes);
        self.slots.push(Slot { offset, length });

        self.header.free_space_end = offset;
        self.header.free_space -= length + SLOT_SIZE as u16;
        self.header.slot_count += 1;

        index.set(record_id, self.page_id());

        tracing::debug!(
            page_id = self.header.page_id,
            record_id,
            offset,
            length,
            free_space = self.header.free_space,
            "inserted record"
        );
        true
    }

    /// Raw bytes of the record in `slot`.
    pub fn read_record(&self, slot: usize) -> Result<&[u8], PageError> {
        let entry = *self.slots.get(slot).ok_or(PageError::SlotOutOfRange {
            slot,
            slot_count: self.slots.len(),
        })?;

        if !entry.is_active() {
            return Err(PageError::SlotDeleted(slot));
        }
        if entry.end() > PAGE_SIZE {
            return Err(PageError::SlotOutOfBounds {
                slot,
                offset: entry.offset,
                length: entry.length,
            });
        }

        Ok(&self.data[entry.offset as usize..entry.end()])
    }

    /// Zero the record's bytes and retire its slot.
    ///
    /// The freed bytes are not returned to the page's free space.
    pub fn delete_record(&mut self, slot: usize) -> Result<(), PageError> {
        // Validates the slot before mutating anything.
        self.read_record(slot)?;

        let entry = self.slots[slot];
        self.data[entry.offset as usize..entry.end()].fill(0);
        self.slots[slot] = Slot::default();
        self.header.slot_count = self.header.slot_count.saturating_sub(1);

        tracing::debug!(page_id = self.header.page_id, slot, "deleted record");
        Ok(())
    }

    /// Decode the record in `slot`.
    pub fn record(&self, slot: usize) -> Result<Option<Record>, PageError> {
        Ok(Record::decode_bytes(self.read_record(slot)?))
    }

    /// Find the slot holding the record with the given id by decoding every
    /// live slot in turn.
    #[must_use]
    pub fn find_slot_by_record_id(&self, record_id: RecordId) -> Option<usize> {
        self.records()
            .find(|(_, record)| record.id() == Some(record_id))
            .map(|(slot, _)| slot)
    }

    /// Live records on the page, with their slot indices.
    ///
    /// Slots that cannot be read or decoded are skipped.
    pub fn records(&self) -> impl Iterator<Item = (usize, Record)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_active())
            .filter_map(|(index, _)| match self.record(index) {
                Ok(Some(record)) => Some((index, record)),
                Ok(None) => {
                    tracing::warn!(page_id = self.header.page_id, slot = index, "undecodable record");
                    None
                }
                Err(e) => {
                    tracing::warn!(page_id = self.header.page_id, slot = index, "skipping slot: {e}");
                    None
                }
            })
    }

    /// Serialize the page into a single frame.
    #[must_use]
    pub fn to_bytes(&self) -> Box<[u8; PAGE_SIZE]> {
        let mut frame = self.data.clone();
        let active: Vec<Slot> = self.slots.iter().copied().filter(|s| s.is_active()).collect();

        let header = PageHeader {
            slot_count: active.len() as u16,
            ..self.header
        };
        frame[0..PageHeader::SIZE].copy_from_slice(&header.to_bytes());
        frame[PageHeader::SIZE..PAGE_PREAMBLE_SIZE].copy_from_slice(&(active.len() as u16).to_le_bytes());

        let mut pos = PAGE_PREAMBLE_SIZE;
        for slot in active {
            frame[pos..pos + 2].copy_from_slice(&slot.offset.to_le_bytes());
            frame[pos + 2..pos + 4].copy_from_slice(&slot.length.to_le_bytes());
            pos += SLOT_SIZE;
        }

        frame
    }

    /// Deserialize a page from a frame.
    ///
    /// Slots pointing past the end of the frame are kept so that reading them
    /// reports the corruption.
    pub fn from_bytes(frame: &[u8; PAGE_SIZE]) -> Result<Self, PageError> {
        let mut header_bytes = [0u8; PageHeader::SIZE];
        header_bytes.copy_from_slice(&frame[0..PageHeader::SIZE]);
        let mut header = PageHeader::from_bytes(header_bytes);

        let active_count = u16::from_le_bytes([frame[PageHeader::SIZE], frame[PageHeader::SIZE + 1]]) as usize;
        let directory_end = PAGE_PREAMBLE_SIZE + active_count * SLOT_SIZE;

        if directory_end > PAGE_SIZE {
            return Err(PageError::InvalidFrame(format!(
                "slot directory of {active_count} entries does not fit in a page"
            )));
        }
        let free_space_end = header.free_space_end as usize;
        if free_space_end > PAGE_SIZE || free_space_end < directory_end {
            return Err(PageError::InvalidFrame(format!(
                "free space end {free_space_end} outside [{directory_end}, {PAGE_SIZE}]"
            )));
        }
        if header.free_space as usize > free_space_end - directory_end {
            return Err(PageError::InvalidFrame(format!(
                "free space {} exceeds the gap before offset {free_space_end}",
                header.free_space
            )));
        }

        let mut slots = Vec::with_capacity(active_count);
        for i in 0..active_count {
            let pos = PAGE_PREAMBLE_SIZE + i * SLOT_SIZE;
            let slot = Slot {
                offset: u16::from_le_bytes([frame[pos], frame[pos + 1]]),
                length: u16::from_le_bytes([frame[pos + 2], frame[pos + 3]]),
            };
            if !slot.is_active() {
                tracing::warn!(page_id = header.page_id, slot = i, "dropping empty slot entry");
                continue;
            }
            slots.push(slot);
        }
        header.slot_count = slots.len() as u16;

        let mut data = Box::new(*frame);
        data[0..directory_end].fill(0);

        Ok(Self { header, slots, data })
    }
}

impl std::fmt::Debug for SlottedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlottedPage")
            .field("header", &self.header)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

/// Errors related to page operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// Page id does not fit the on-disk page header.
    InvalidPageId(PageId),
    /// Slot index past the end of the directory.
    SlotOutOfRange { slot: usize, slot_count: usize },
    /// Slot has been deleted.
    SlotDeleted(usize),
    /// Slot points outside the page.
    SlotOutOfBounds { slot: usize, offset: u16, length: u16 },
    /// Frame header or directory is inconsistent.
    InvalidFrame(String),
}

impl std::fmt::Display for PageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageId(id) => write!(f, "invalid page id: {id}"),
            Self::SlotOutOfRange { slot, slot_count } => {
                write!(f, "slot {slot} out of range (slots: {slot_count})")
            }
            Self::SlotDeleted(slot) => write!(f, "slot {slot} is deleted"),
            Self::SlotOutOfBounds {
                slot,
                offset,
                length,
            } => write!(
                f,
                "slot {slot} (offset {offset}, length {length}) exceeds page size"
            ),
            Self::InvalidFrame(msg) => write!(f, "invalid page frame: {msg}"),
        }
    }
}

impl std::error::Error for PageError {}
