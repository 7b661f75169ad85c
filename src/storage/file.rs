use std::fs::{File as StdFile, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    READ,
    WRITE,
}

// Byte-addressed file; the page store runs against a real file or an in-memory one in tests.
pub trait File {
    fn get_mode(&self) -> FileMode;
    fn size(&self) -> Result<usize>;
    fn resize(&mut self, new_size: usize) -> Result<()>;
    fn read_block(&mut self, offset: usize, size: usize) -> Result<Vec<u8>>;
    /// Writes `block` at `offset`, zero-filling any gap past the current end.
    fn write_block(&mut self, block: &[u8], offset: usize) -> Result<()>;
    fn sync(&mut self) -> Result<()>;

    /// Reads `size` bytes at `offset`; whatever lies past the end of file reads as zeros.
    fn read_block_padded(&mut self, offset: usize, size: usize) -> Result<Vec<u8>> {
        let file_size = self.size()?;
        if offset >= file_size {
            return Ok(vec![0; size]);
        }
        let available = size.min(file_size - offset);
        let mut block = self.read_block(offset, available)?;
        block.resize(size, 0);
        Ok(block)
    }
}

fn read_only_error(action: &str) -> StoreError {
    StoreError::Other(format!("Cannot {} a read-only file", action))
}

pub struct PosixFile {
    mode: FileMode,
    file: StdFile,
    cached_size: usize,
}

impl PosixFile {
    pub fn new(path: &Path, mode: FileMode) -> Result<Self> {
        let file = match mode {
            FileMode::READ => OpenOptions::new().read(true).open(path)?,
            FileMode::WRITE => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(path)?,
        };

        let cached_size = file.metadata()?.len() as usize;

        Ok(Self {
            mode,
            file,
            cached_size,
        })
    }

    pub fn make_temporary() -> Result<Self> {
        use std::env::temp_dir;
        use uuid::Uuid;

        let temp_path = temp_dir().join(format!("shadow-store-{}.tmp", Uuid::new_v4()));

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&temp_path)?;

        // Unlinked right away; the open handle keeps the inode alive
        std::fs::remove_file(&temp_path)?;

        Ok(Self {
            mode: FileMode::WRITE,
            file,
            cached_size: 0,
        })
    }
}

impl File for PosixFile {
    fn get_mode(&self) -> FileMode {
        self.mode
    }

    fn size(&self) -> Result<usize> {
        Ok(self.cached_size)
    }

    fn resize(&mut self, new_size: usize) -> Result<()> {
        if new_size == self.cached_size {
            return Ok(());
        }
        if self.mode == FileMode::READ {
            return Err(read_only_error("resize"));
        }

        self.file.set_len(new_size as u64)?;
        self.cached_size = new_size;
        Ok(())
    }

    fn read_block(&mut self, offset: usize, size: usize) -> Result<Vec<u8>> {
        if offset + size > self.cached_size {
            return Err(StoreError::Other(format!(
                "Attempt to read past end of file: offset={}, size={}, filesize={}",
                offset, size, self.cached_size
            )));
        }

        let mut buffer = vec![0u8; size];
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn write_block(&mut self, block: &[u8], offset: usize) -> Result<()> {
        if self.mode == FileMode::READ {
            return Err(read_only_error("write to"));
        }

        if offset + block.len() > self.cached_size {
            self.resize(offset + block.len())?;
        }

        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(block)?;
        self.file.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

pub struct MemoryFile {
    mode: FileMode,
    data: Vec<u8>,
}

impl MemoryFile {
    pub fn new(mode: FileMode) -> Self {
        Self {
            mode,
            data: Vec::new(),
        }
    }

    pub fn with_data(data: Vec<u8>, mode: FileMode) -> Self {
        Self { mode, data }
    }

    pub fn get_data(&self) -> &[u8] {
        &self.data
    }
}

impl File for MemoryFile {
    fn get_mode(&self) -> FileMode {
        self.mode
    }

    fn size(&self) -> Result<usize> {
        Ok(self.data.len())
    }

    fn resize(&mut self, new_size: usize) -> Result<()> {
        if self.mode == FileMode::READ {
            return Err(read_only_error("resize"));
        }
        self.data.resize(new_size, 0);
        Ok(())
    }

    fn read_block(&mut self, offset: usize, size: usize) -> Result<Vec<u8>> {
        if offset + size > self.data.len() {
            return Err(StoreError::Other(format!(
                "Attempt to read past end of file: offset={}, size={}, filesize={}",
                offset,
                size,
                self.data.len()
            )));
        }
        Ok(self.data[offset..offset + size].to_vec())
    }

    fn write_block(&mut self, block: &[u8], offset: usize) -> Result<()> {
        if self.mode == FileMode::READ {
            return Err(read_only_error("write to"));
        }
        if offset + block.len() > self.data.len() {
            self.resize(offset + block.len())?;
        }
        self.data[offset..offset + block.len()].copy_from_slice(block);
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}
