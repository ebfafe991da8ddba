//! Table file I/O operations.
//!
//! This module handles reading and writing the table header and pages. A
//! `TableFile` is opened for a single engine operation and dropped at its end.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::storage::metadata::{FileMetadata, MetadataError};
use crate::storage::page::{PAGE_SIZE, PAGE_SIZE_U64, PageError, PageId, SlottedPage};

/// An open table file.
pub struct TableFile {
    file: File,
    path: PathBuf,
}

impl TableFile {
    /// Create a new table file holding only `metadata`.
    ///
    /// Returns an error if the file already exists. The header is encoded
    /// before the file is created, so a header that does not fit leaves no
    /// file behind.
    pub fn create(path: &Path, metadata: &FileMetadata) -> Result<Self, FileError> {
        let header = metadata.encode().map_err(FileError::Metadata)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(FileError::Io)?;

        let mut table = Self {
            file,
            path: path.to_path_buf(),
        };
        table.write_header_bytes(&header)?;
        table.sync()?;

        Ok(table)
    }

    /// Open an existing table file for reading and writing.
    pub fn open(path: &Path) -> Result<Self, FileError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(FileError::Io)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current length of the file in bytes.
    pub fn len(&self) -> Result<u64, FileError> {
        Ok(self.file.metadata().map_err(FileError::Io)?.len())
    }

    /// Read the header from offset 0.
    pub fn read_metadata(&mut self) -> Result<FileMetadata, FileError> {
        self.file.seek(SeekFrom::Start(0)).map_err(FileError::Io)?;
        FileMetadata::load(&mut self.file).map_err(FileError::Metadata)
    }

    /// Overwrite the header region at offset 0.
    pub fn write_metadata(&mut self, metadata: &FileMetadata) -> Result<(), FileError> {
        let bytes = metadata.encode().map_err(FileError::Metadata)?;
        self.write_header_bytes(&bytes)
    }

    /// Overwrite the header region with bytes from [`FileMetadata::encode`].
    pub fn write_header_bytes(&mut self, bytes: &[u8]) -> Result<(), FileError> {
        self.file.seek(SeekFrom::Start(0)).map_err(FileError::Io)?;
        self.file.write_all(bytes).map_err(FileError::Io)
    }

    /// Read a page.
    ///
    /// Returns `None` if the file ends before the page starts, which is the
    /// case for the last page of a table before its first record lands. A
    /// frame whose stored id differs from `page_id` is rejected, since writing
    /// it back would land at another page's offset.
    pub fn read_page(
        &mut self,
        metadata: &FileMetadata,
        page_id: PageId,
    ) -> Result<Option<SlottedPage>, FileError> {
        let offset = metadata.page_offset(page_id).map_err(FileError::Metadata)?;
        let len = self.len()?;

        if len <= offset {
            return Ok(None);
        }
        if len < offset + PAGE_SIZE_U64 {
            return Err(FileError::TornPage {
                page_id,
                available: len - offset,
            });
        }

        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(FileError::Io)?;
        let mut frame = Box::new([0u8; PAGE_SIZE]);
        self.file
            .read_exact(frame.as_mut_slice())
            .map_err(FileError::Io)?;

        let page =
            SlottedPage::from_bytes(&frame).map_err(|source| FileError::Page { page_id, source })?;
        if page.page_id() != page_id {
            return Err(FileError::Page {
                page_id,
                source: PageError::InvalidFrame(format!(
                    "frame at page {page_id} is stamped with page id {}",
                    page.page_id()
                )),
            });
        }
        Ok(Some(page))
    }

    /// Write a page at its offset.
    pub fn write_page(&mut self, metadata: &FileMetadata, page: &SlottedPage) -> Result<(), FileError> {
        let offset = metadata
            .page_offset(page.page_id())
            .map_err(FileError::Metadata)?;

        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(FileError::Io)?;
        self.file
            .write_all(page.to_bytes().as_slice())
            .map_err(FileError::Io)
    }

    /// Write a newly allocated page past the current last page.
    ///
    /// The file must reach the page's offset. Bytes already present there
    /// belong to a page whose header update never landed and are overwritten.
    pub fn append_page(&mut self, metadata: &FileMetadata, page: &SlottedPage) -> Result<(), FileError> {
        let expected = metadata
            .page_offset(page.page_id())
            .map_err(FileError::Metadata)?;
        let actual = self.len()?;

        if actual < expected {
            return Err(FileError::MisplacedPage {
                page_id: page.page_id(),
                expected,
                actual,
            });
        }
        if actual > expected {
            tracing::warn!(
                page_id = page.page_id(),
                orphaned_bytes = actual - expected,
                "overwriting page not recorded in the table header"
            );
        }

        self.file
            .seek(SeekFrom::Start(expected))
            .map_err(FileError::Io)?;
        self.file
            .write_all(page.to_bytes().as_slice())
            .map_err(FileError::Io)
    }

    /// Sync all pending writes to disk.
    pub fn sync(&self) -> Result<(), FileError> {
        self.file.sync_all().map_err(FileError::Io)
    }
}

/// Errors that can occur during file operations.
#[derive(Debug)]
pub enum FileError {
    /// I/O error.
    Io(std::io::Error),
    /// Header error.
    Metadata(MetadataError),
    /// Page frame could not be parsed.
    Page { page_id: PageId, source: PageError },
    /// The file ends partway through a page.
    TornPage { page_id: PageId, available: u64 },
    /// The file ends before the offset of the page being appended.
    MisplacedPage {
        page_id: PageId,
        expected: u64,
        actual: u64,
    },
}

impl std::fmt::Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Metadata(e) => write!(f, "header error: {e}"),
            Self::Page { page_id, source } => write!(f, "page {page_id}: {source}"),
            Self::TornPage { page_id, available } => write!(
                f,
                "page {page_id} is truncated ({available} of {PAGE_SIZE} bytes present)"
            ),
            Self::MisplacedPage {
                page_id,
                expected,
                actual,
            } => write!(
                f,
                "page {page_id} belongs at offset {expected} but the file ends at {actual}"
            ),
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Metadata(e) => Some(e),
            Self::Page { source, .. } => Some(source),
            Self::TornPage { .. } | Self::MisplacedPage { .. } => None,
        }
    }
}
