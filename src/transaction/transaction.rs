use std::collections::HashMap;

use log::{debug, info};

use crate::buffer::{BufferManager, PageHandle};
use crate::common::{PageID, RecordID, Result, StoreError, TransactionID};
use crate::heap::HeapSegment;
use crate::log_mod::{recovery, LogManager, RecoveryReport};
use crate::storage::RecordLayout;

/// Before-image of one page, plus the pin that keeps the page cached until the
/// transaction ends.
#[derive(Debug)]
struct Shadow {
    handle: PageHandle,
    before_image: Vec<u8>,
}

#[derive(Debug)]
pub struct Transaction {
    pub id: TransactionID,
    shadows: HashMap<PageID, Shadow>,
    inserted_records: u64,
}

impl Transaction {
    pub fn new(id: TransactionID) -> Self {
        Self {
            id,
            shadows: HashMap::new(),
            inserted_records: 0,
        }
    }

    pub fn has_shadow(&self, page_id: PageID) -> bool {
        self.shadows.contains_key(&page_id)
    }

    pub fn shadowed_pages(&self) -> usize {
        self.shadows.len()
    }

    pub fn inserted_records(&self) -> u64 {
        self.inserted_records
    }

    fn add_shadow(&mut self, handle: PageHandle, before_image: Vec<u8>) {
        self.shadows.insert(
            handle.page_id(),
            Shadow {
                handle,
                before_image,
            },
        );
    }
}

/// Single-writer transaction engine: at most one transaction is active, every mutation
/// is forced to the data file as it happens, and rollback restores page shadows.
pub struct TransactionManager {
    next_txn_id: u64,
    current: Option<Transaction>,
    record_counter: u64,
    heap: HeapSegment,
    log_manager: LogManager,
    buffer_manager: BufferManager,
}

impl TransactionManager {
    pub fn new(
        log_manager: LogManager,
        mut buffer_manager: BufferManager,
        layout: RecordLayout,
    ) -> Result<Self> {
        let heap = HeapSegment::new(layout);
        let record_counter = heap.count_records(&mut buffer_manager)?;

        // Ids keep growing across restarts so two sessions never share one
        let next_txn_id = if log_manager.is_empty() {
            1
        } else {
            recovery::max_txn_id(&log_manager.replay()?).map_or(1, |txn_id| txn_id.0 + 1)
        };

        Ok(Self {
            next_txn_id,
            current: None,
            record_counter,
            heap,
            log_manager,
            buffer_manager,
        })
    }

    /// Starts a transaction. An active one is committed first.
    pub fn start_txn(&mut self) -> Result<TransactionID> {
        if let Some(previous) = self.current_txn() {
            info!("begin while transaction {} is active: committing it", previous.0);
            self.commit_txn()?;
        }

        let txn_id = TransactionID(self.next_txn_id);
        self.next_txn_id += 1;

        self.log_manager.log_txn_begin(txn_id);
        self.current = Some(Transaction::new(txn_id));
        info!("started transaction {}", txn_id.0);

        Ok(txn_id)
    }

    pub fn commit_txn(&mut self) -> Result<TransactionID> {
        let txn_id = self.active_txn_id()?;

        self.log_manager.log_commit(txn_id);
        self.log_manager.flush()?;

        if let Some(txn) = self.current.take() {
            for (_, shadow) in txn.shadows {
                self.buffer_manager.unfix_page(shadow.handle)?;
            }
        }
        info!("committed transaction {}", txn_id.0);

        Ok(txn_id)
    }

    pub fn rollback_txn(&mut self) -> Result<TransactionID> {
        let txn = self.current.take().ok_or(StoreError::NoActiveTransaction)?;
        let txn_id = txn.id;

        // Mutations were already forced, so the restored images are forced as well
        let mut shadows: Vec<(PageID, Shadow)> = txn.shadows.into_iter().collect();
        shadows.sort_by_key(|(page_id, _)| *page_id);
        for (page_id, shadow) in shadows {
            let frame = self.buffer_manager.frame_mut(page_id)?;
            frame.get_data_mut().copy_from_slice(&shadow.before_image);
            frame.set_dirty(true);
            self.buffer_manager.force_page(page_id)?;
            self.buffer_manager.unfix_page(shadow.handle)?;
            debug!("restored page {} for transaction {}", page_id.0, txn_id.0);
        }

        // Slots vacated by rolled-back inserts are handed out again
        self.record_counter -= txn.inserted_records;

        self.log_manager.log_rollback(txn_id);
        self.log_manager.flush()?;
        info!(
            "rolled back transaction {} ({} inserts discarded)",
            txn_id.0, txn.inserted_records
        );

        Ok(txn_id)
    }

    /// Appends `payload` as the next record. Longer payloads are cut to the record size.
    pub fn insert_record(&mut self, payload: &[u8]) -> Result<RecordID> {
        let txn_id = self.active_txn_id()?;
        let layout = *self.heap.layout();

        let record_id = RecordID(self.record_counter);
        let page_id = layout.locate(record_id).page();
        self.shadow_page(page_id)?;

        if payload.len() > layout.record_size() {
            debug!(
                "truncating {}-byte payload to {} bytes",
                payload.len(),
                layout.record_size()
            );
        }
        let after_img = layout.encode(payload);
        self.heap
            .write_slot(&mut self.buffer_manager, record_id, &after_img)?;
        self.log_manager.log_insert(txn_id, record_id, after_img);

        self.record_counter += 1;
        if let Some(txn) = self.current.as_mut() {
            txn.inserted_records += 1;
        }

        self.buffer_manager.force_page(page_id)?;
        debug!("txn {} inserted record {}", txn_id.0, record_id.0);

        Ok(record_id)
    }

    pub fn update_record(&mut self, record_id: RecordID, payload: &[u8]) -> Result<()> {
        let txn_id = self.active_txn_id()?;
        self.check_bounds(record_id)?;
        let layout = *self.heap.layout();

        let page_id = layout.locate(record_id).page();
        self.shadow_page(page_id)?;

        let before_img = self.heap.read_slot(&mut self.buffer_manager, record_id)?;
        let after_img = layout.encode(payload);
        self.heap
            .write_slot(&mut self.buffer_manager, record_id, &after_img)?;
        self.log_manager
            .log_update(txn_id, record_id, before_img, after_img);

        self.buffer_manager.force_page(page_id)?;
        debug!("txn {} updated record {}", txn_id.0, record_id.0);

        Ok(())
    }

    pub fn read_record(&mut self, record_id: RecordID) -> Result<Vec<u8>> {
        self.check_bounds(record_id)?;
        let slot = self.heap.read_slot(&mut self.buffer_manager, record_id)?;
        Ok(self.heap.layout().decode(&slot))
    }

    pub fn read_page(&mut self, page_id: PageID) -> Result<Vec<Vec<u8>>> {
        self.heap.read_page_records(&mut self.buffer_manager, page_id)
    }

    /// Forces every dirty page, then logs and flushes a CHECKPOINT.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.buffer_manager.flush_all_pages()?;
        self.log_manager.log_checkpoint();
        self.log_manager.flush()?;
        info!("checkpoint taken at log offset {}", self.log_manager.log_size());
        Ok(())
    }

    /// Brings the data file back to the committed history recorded in the log.
    pub fn recover(&mut self) -> Result<RecoveryReport> {
        if let Some(txn_id) = self.current_txn() {
            return Err(StoreError::TransactionInProgress(txn_id.0));
        }
        if self.log_manager.is_empty() {
            info!("log is empty, nothing to recover");
            return Ok(RecoveryReport::default());
        }

        let logs = self.log_manager.replay()?;
        let report = recovery::recover(&logs, &mut self.buffer_manager, &self.heap)?;

        if let Some(max_txn_id) = report.max_txn_id {
            self.next_txn_id = self.next_txn_id.max(max_txn_id.0 + 1);
        }
        self.record_counter = self.heap.count_records(&mut self.buffer_manager)?;

        // Unlike a pure replay, recovery appends one record here: a CHECKPOINT that
        // seals the recovered state, so a later recovery starts after it and never
        // revisits the losers resolved above
        self.checkpoint()?;

        Ok(report)
    }

    pub fn flush_log(&mut self) -> Result<()> {
        self.log_manager.flush()
    }

    pub fn close(mut self) -> Result<()> {
        self.buffer_manager.flush_all_pages()?;
        self.log_manager.flush()
    }

    pub fn current_txn(&self) -> Option<TransactionID> {
        self.current.as_ref().map(|txn| txn.id)
    }

    pub fn current_transaction(&self) -> Option<&Transaction> {
        self.current.as_ref()
    }

    pub fn record_count(&self) -> u64 {
        self.record_counter
    }

    pub fn buffer_manager(&self) -> &BufferManager {
        &self.buffer_manager
    }

    pub fn log_manager(&self) -> &LogManager {
        &self.log_manager
    }

    fn active_txn_id(&self) -> Result<TransactionID> {
        self.current_txn().ok_or(StoreError::NoActiveTransaction)
    }

    fn check_bounds(&self, record_id: RecordID) -> Result<()> {
        if record_id.0 >= self.record_counter {
            return Err(StoreError::RecordOutOfBounds {
                record_id: record_id.0,
                record_count: self.record_counter,
            });
        }
        Ok(())
    }

    /// Fixes `page_id` for the active transaction and captures its before-image the
    /// first time the transaction touches it.
    fn shadow_page(&mut self, page_id: PageID) -> Result<()> {
        let txn = self.current.as_mut().ok_or(StoreError::NoActiveTransaction)?;
        if txn.has_shadow(page_id) {
            return Ok(());
        }

        let handle = self.buffer_manager.fix_page(page_id)?;
        let before_image = self.buffer_manager.frame(page_id)?.get_data().to_vec();
        txn.add_shadow(handle, before_image);
        debug!("txn {} shadowed page {}", txn.id.0, page_id.0);

        Ok(())
    }
}
