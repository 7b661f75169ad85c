use std::path::{Path, PathBuf};

use crate::common::{Result, StoreError};
use crate::storage::DBFiles;

/// Engine geometry and file locations. Fixed for the lifetime of a `Database`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub page_size: usize,
    pub record_size: usize,
    /// Frame count of the buffer pool. Pages shadowed by the active transaction stay
    /// pinned until it ends, so one transaction can touch at most this many pages;
    /// the next new page fails with `BufferFull` before anything is modified.
    pub buffer_pool_size: usize,
    pub data_file_path: PathBuf,
    pub log_file_path: PathBuf,
}

impl EngineConfig {
    pub fn new(data_file_path: impl Into<PathBuf>, log_file_path: impl Into<PathBuf>) -> Self {
        Self {
            page_size: 4096,
            record_size: 100,
            buffer_pool_size: 1000,
            data_file_path: data_file_path.into(),
            log_file_path: log_file_path.into(),
        }
    }

    /// Lays the data and log files out under `db_path`, creating the directories.
    pub fn in_directory(db_path: &Path) -> Result<Self> {
        let files = DBFiles::new(db_path)?;
        Ok(Self::new(files.get_data_file_path(), files.get_log_file_path()))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_record_size(mut self, record_size: usize) -> Self {
        self.record_size = record_size;
        self
    }

    pub fn with_buffer_pool_size(mut self, buffer_pool_size: usize) -> Self {
        self.buffer_pool_size = buffer_pool_size;
        self
    }

    pub fn records_per_page(&self) -> usize {
        self.page_size / self.record_size
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.record_size == 0 {
            return Err(StoreError::InvalidConfig(
                "page and record sizes must be non-zero".to_string(),
            ));
        }
        if self.record_size > self.page_size {
            return Err(StoreError::InvalidConfig(format!(
                "record size {} exceeds page size {}",
                self.record_size, self.page_size
            )));
        }
        if self.buffer_pool_size == 0 {
            return Err(StoreError::InvalidConfig(
                "buffer pool needs at least one frame".to_string(),
            ));
        }
        Ok(())
    }
}
