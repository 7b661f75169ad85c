pub mod buffer;
pub mod common;
pub mod heap;
pub mod log_mod;
pub mod storage;
pub mod transaction;

pub use buffer::BufferManager;
pub use common::{EngineConfig, PageID, RecordID, Result, StoreError, TransactionID};
pub use log_mod::{LogManager, RecoveryReport};
pub use storage::DBFiles;
pub use transaction::TransactionManager;

use std::path::Path;

use log::info;

use crate::storage::{PageStore, RecordLayout};

/// One open store: a data file of fixed-size records plus its write-ahead log.
pub struct Database {
    config: EngineConfig,
    transaction_manager: TransactionManager,
}

impl Database {
    pub fn open(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let page_store = PageStore::open(
            &config.data_file_path,
            config.page_size,
            config.record_size,
        )?;
        let buffer_manager = BufferManager::new(page_store, config.buffer_pool_size);
        let log_manager = LogManager::new(&config.log_file_path)?;
        let layout = RecordLayout::new(config.page_size, config.record_size);
        let transaction_manager = TransactionManager::new(log_manager, buffer_manager, layout)?;

        info!(
            "opened {} ({} records, log {} bytes)",
            config.data_file_path.display(),
            transaction_manager.record_count(),
            transaction_manager.log_manager().log_size()
        );

        Ok(Self {
            config,
            transaction_manager,
        })
    }

    /// Opens the store kept under `db_path`, creating its directories when missing.
    pub fn open_database(db_path: &Path) -> Result<Self> {
        Self::open(EngineConfig::in_directory(db_path)?)
    }

    pub fn begin(&mut self) -> Result<TransactionID> {
        self.transaction_manager.start_txn()
    }

    pub fn commit(&mut self) -> Result<TransactionID> {
        self.transaction_manager.commit_txn()
    }

    pub fn rollback(&mut self) -> Result<TransactionID> {
        self.transaction_manager.rollback_txn()
    }

    pub fn checkpoint(&mut self) -> Result<()> {
        self.transaction_manager.checkpoint()
    }

    pub fn insert(&mut self, payload: &[u8]) -> Result<RecordID> {
        self.transaction_manager.insert_record(payload)
    }

    pub fn update(&mut self, record_id: RecordID, payload: &[u8]) -> Result<()> {
        self.transaction_manager.update_record(record_id, payload)
    }

    /// Record contents with the zero padding stripped.
    pub fn read(&mut self, record_id: RecordID) -> Result<Vec<u8>> {
        self.transaction_manager.read_record(record_id)
    }

    pub fn read_page(&mut self, page_number: u64) -> Result<Vec<Vec<u8>>> {
        self.transaction_manager.read_page(PageID(page_number))
    }

    pub fn record_count(&self) -> u64 {
        self.transaction_manager.record_count()
    }

    pub fn recover(&mut self) -> Result<RecoveryReport> {
        self.transaction_manager.recover()
    }

    /// Makes buffered log records durable without ending the transaction.
    pub fn flush_log(&mut self) -> Result<()> {
        self.transaction_manager.flush_log()
    }

    pub fn current_transaction(&self) -> Option<TransactionID> {
        self.transaction_manager.current_txn()
    }

    pub fn transaction_manager(&self) -> &TransactionManager {
        &self.transaction_manager
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn close(self) -> Result<()> {
        self.transaction_manager.close()?;
        info!("closed {}", self.config.data_file_path.display());
        Ok(())
    }
}
