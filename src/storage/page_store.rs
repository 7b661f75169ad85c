use std::path::Path;

use log::trace;

use crate::common::{PageID, Result, StoreError};
use crate::storage::{File, FileMode, PosixFile};

/// Direct page-granular access to the data file. No caching.
pub struct PageStore {
    file: Box<dyn File>,
    page_size: usize,
    record_size: usize,
}

impl PageStore {
    pub fn new(file: Box<dyn File>, page_size: usize, record_size: usize) -> Self {
        Self {
            file,
            page_size,
            record_size,
        }
    }

    pub fn open(path: &Path, page_size: usize, record_size: usize) -> Result<Self> {
        let file = PosixFile::new(path, FileMode::WRITE)?;
        Ok(Self::new(Box::new(file), page_size, record_size))
    }

    /// Byte offset of `page_id`, or `None` when it does not fit in the address space.
    fn page_offset(&self, page_id: PageID) -> Option<usize> {
        let offset = usize::try_from(page_id.0)
            .ok()?
            .checked_mul(self.page_size)?;
        offset.checked_add(self.page_size)?;
        Some(offset)
    }

    /// Pages beyond the end of file come back zero-filled.
    pub fn read_page(&mut self, page_id: PageID) -> Result<Vec<u8>> {
        trace!("page store: read page {}", page_id.0);
        match self.page_offset(page_id) {
            Some(offset) => self.file.read_block_padded(offset, self.page_size),
            None => Ok(vec![0; self.page_size]),
        }
    }

    pub fn write_page(&mut self, page_id: PageID, data: &[u8]) -> Result<()> {
        if data.len() != self.page_size {
            return Err(StoreError::PageSizeExceeded(data.len(), self.page_size));
        }
        let offset = self
            .page_offset(page_id)
            .ok_or(StoreError::PageOutOfRange(page_id.0))?;
        trace!("page store: write page {}", page_id.0);
        self.file.write_block(data, offset)?;
        self.file.sync()
    }

    /// Slot extent of the file, `file_length / record_size`.
    pub fn record_count(&self) -> Result<u64> {
        Ok((self.file.size()? / self.record_size) as u64)
    }

    /// Number of pages the file spans, counting a trailing partial page.
    pub fn page_count(&self) -> Result<u64> {
        let size = self.file.size()?;
        Ok(((size + self.page_size - 1) / self.page_size) as u64)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}
