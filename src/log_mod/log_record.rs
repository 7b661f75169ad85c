use serde::{Deserialize, Serialize};

use crate::common::{RecordID, TransactionID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogRecordType {
    BeginRecord = 0,
    InsertRecord = 1,
    UpdateRecord = 2,
    /// Reserved. Nothing writes it yet; replay accepts it and recovery skips it.
    DeleteRecord = 3,
    CommitRecord = 4,
    RollbackRecord = 5,
    CheckpointRecord = 6,
}

/// One entry of the write-ahead log. Images are full slot images, never aliases of a
/// live page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub record_type: LogRecordType,
    pub txn_id: Option<TransactionID>,
    pub record_id: Option<RecordID>,
    pub before_img: Option<Vec<u8>>,
    pub after_img: Option<Vec<u8>>,
}

impl LogRecord {
    fn marker(record_type: LogRecordType, txn_id: Option<TransactionID>) -> Self {
        Self {
            record_type,
            txn_id,
            record_id: None,
            before_img: None,
            after_img: None,
        }
    }

    pub fn begin(txn_id: TransactionID) -> Self {
        Self::marker(LogRecordType::BeginRecord, Some(txn_id))
    }

    pub fn commit(txn_id: TransactionID) -> Self {
        Self::marker(LogRecordType::CommitRecord, Some(txn_id))
    }

    pub fn rollback(txn_id: TransactionID) -> Self {
        Self::marker(LogRecordType::RollbackRecord, Some(txn_id))
    }

    pub fn checkpoint() -> Self {
        Self::marker(LogRecordType::CheckpointRecord, None)
    }

    pub fn insert(txn_id: TransactionID, record_id: RecordID, after_img: Vec<u8>) -> Self {
        Self {
            record_type: LogRecordType::InsertRecord,
            txn_id: Some(txn_id),
            record_id: Some(record_id),
            before_img: None,
            after_img: Some(after_img),
        }
    }

    pub fn update(
        txn_id: TransactionID,
        record_id: RecordID,
        before_img: Vec<u8>,
        after_img: Vec<u8>,
    ) -> Self {
        Self {
            record_type: LogRecordType::UpdateRecord,
            txn_id: Some(txn_id),
            record_id: Some(record_id),
            before_img: Some(before_img),
            after_img: Some(after_img),
        }
    }

    pub fn is_data_change(&self) -> bool {
        matches!(
            self.record_type,
            LogRecordType::InsertRecord | LogRecordType::UpdateRecord | LogRecordType::DeleteRecord
        )
    }
}
