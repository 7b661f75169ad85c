use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::common::{RecordID, Result, StoreError, TransactionID};
use crate::log_mod::{LogRecord, LogRecordType};

const FRAME_HEADER_LEN: usize = std::mem::size_of::<u32>();

/// Append-only write-ahead log. Records are buffered in memory and reach the file only
/// on `flush`.
pub struct LogManager {
    log_file: File,
    log_path: PathBuf,
    buffer: Vec<LogRecord>,
    current_offset: u64,
    record_counts: HashMap<LogRecordType, u64>,
}

impl LogManager {
    pub fn new(log_file_path: &Path) -> Result<Self> {
        let log_file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(log_file_path)?;
        let current_offset = log_file.metadata()?.len();

        Ok(Self {
            log_file,
            log_path: log_file_path.to_path_buf(),
            buffer: Vec::new(),
            current_offset,
            record_counts: HashMap::new(),
        })
    }

    pub fn append(&mut self, record: LogRecord) {
        *self.record_counts.entry(record.record_type).or_insert(0) += 1;
        self.buffer.push(record);
    }

    pub fn log_txn_begin(&mut self, txn_id: TransactionID) {
        self.append(LogRecord::begin(txn_id));
    }

    pub fn log_insert(&mut self, txn_id: TransactionID, record_id: RecordID, after_img: Vec<u8>) {
        self.append(LogRecord::insert(txn_id, record_id, after_img));
    }

    pub fn log_update(
        &mut self,
        txn_id: TransactionID,
        record_id: RecordID,
        before_img: Vec<u8>,
        after_img: Vec<u8>,
    ) {
        self.append(LogRecord::update(txn_id, record_id, before_img, after_img));
    }

    pub fn log_commit(&mut self, txn_id: TransactionID) {
        self.append(LogRecord::commit(txn_id));
    }

    pub fn log_rollback(&mut self, txn_id: TransactionID) {
        self.append(LogRecord::rollback(txn_id));
    }

    pub fn log_checkpoint(&mut self) {
        self.append(LogRecord::checkpoint());
    }

    /// Writes every buffered record to the file, in append order, then syncs it.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let mut bytes = Vec::new();
        for record in &self.buffer {
            let payload = bincode::serialize(record)?;
            bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            bytes.extend_from_slice(&payload);
        }

        self.log_file.write_all(&bytes)?;
        self.log_file.sync_data()?;
        self.current_offset += bytes.len() as u64;

        debug!(
            "flushed {} log records ({} bytes)",
            self.buffer.len(),
            bytes.len()
        );
        self.buffer.clear();
        Ok(())
    }

    /// Every record on disk, in log order. Buffered records are not included.
    pub fn replay(&self) -> Result<Vec<LogRecord>> {
        let mut bytes = Vec::new();
        File::open(&self.log_path)?.read_to_end(&mut bytes)?;
        decode_frames(&bytes)
    }

    /// True when nothing has ever reached the log file.
    pub fn is_empty(&self) -> bool {
        self.current_offset == 0
    }

    pub fn pending_records(&self) -> &[LogRecord] {
        &self.buffer
    }

    pub fn log_size(&self) -> u64 {
        self.current_offset
    }

    pub fn get_total_log_records(&self) -> u64 {
        self.record_counts.values().sum()
    }

    pub fn get_total_log_records_of_type(&self, record_type: LogRecordType) -> u64 {
        *self.record_counts.get(&record_type).unwrap_or(&0)
    }
}

fn decode_frames(bytes: &[u8]) -> Result<Vec<LogRecord>> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let corrupt = |reason: String| StoreError::CorruptLog {
            offset: offset as u64,
            reason,
        };

        let header_end = offset + FRAME_HEADER_LEN;
        if header_end > bytes.len() {
            return Err(corrupt("truncated frame header".to_string()));
        }
        let mut len_buf = [0u8; FRAME_HEADER_LEN];
        len_buf.copy_from_slice(&bytes[offset..header_end]);
        let payload_len = u32::from_le_bytes(len_buf) as usize;

        let payload_end = header_end + payload_len;
        if payload_end > bytes.len() {
            return Err(corrupt(format!(
                "frame claims {} bytes, {} left",
                payload_len,
                bytes.len() - header_end
            )));
        }

        let record: LogRecord = bincode::deserialize(&bytes[header_end..payload_end])
            .map_err(|e| corrupt(e.to_string()))?;
        records.push(record);
        offset = payload_end;
    }

    Ok(records)
}
