use std::collections::HashSet;

use log::{debug, info, warn};

use crate::buffer::BufferManager;
use crate::common::{Result, StoreError, TransactionID};
use crate::heap::HeapSegment;
use crate::log_mod::{LogRecord, LogRecordType};

/// What a recovery pass found and did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub committed: HashSet<TransactionID>,
    pub uncommitted: HashSet<TransactionID>,
    /// Index of the last CHECKPOINT in the replayed log.
    pub checkpoint_index: Option<usize>,
    pub records_replayed: usize,
    pub redone: usize,
    pub undone: usize,
    pub max_txn_id: Option<TransactionID>,
}

struct Analysis {
    committed: HashSet<TransactionID>,
    uncommitted: HashSet<TransactionID>,
    checkpoint_index: Option<usize>,
    max_txn_id: Option<TransactionID>,
}

impl Analysis {
    fn start(&self) -> usize {
        self.checkpoint_index.unwrap_or(0)
    }
}

/// Replays `logs` against the data file until it holds exactly the committed history.
pub fn recover(
    logs: &[LogRecord],
    buffer_manager: &mut BufferManager,
    heap: &HeapSegment,
) -> Result<RecoveryReport> {
    let analysis = analysis_phase(logs, heap.layout().record_size())?;
    info!(
        "recovery analysis: {} records, committed={:?}, uncommitted={:?}, checkpoint={:?}",
        logs.len(),
        analysis.committed,
        analysis.uncommitted,
        analysis.checkpoint_index
    );

    let redone = redo_phase(logs, &analysis, buffer_manager, heap)?;
    let undone = undo_phase(logs, &analysis, buffer_manager, heap)?;
    info!("recovery done: {} redone, {} undone", redone, undone);

    Ok(RecoveryReport {
        committed: analysis.committed,
        uncommitted: analysis.uncommitted,
        checkpoint_index: analysis.checkpoint_index,
        records_replayed: logs.len(),
        redone,
        undone,
        max_txn_id: analysis.max_txn_id,
    })
}

/// Highest transaction id mentioned anywhere in `logs`.
pub fn max_txn_id(logs: &[LogRecord]) -> Option<TransactionID> {
    logs.iter().filter_map(|log| log.txn_id).max()
}

fn analysis_phase(logs: &[LogRecord], record_size: usize) -> Result<Analysis> {
    let mut active_txns = HashSet::new();
    let mut committed_txns = HashSet::new();
    let mut checkpoint_index = None;

    for (index, log) in logs.iter().enumerate() {
        validate(index, log, record_size)?;

        match log.record_type {
            LogRecordType::CheckpointRecord => {
                checkpoint_index = Some(index);
                active_txns.clear();
            }
            LogRecordType::BeginRecord => {
                active_txns.extend(log.txn_id);
            }
            LogRecordType::CommitRecord => {
                if let Some(txn_id) = log.txn_id {
                    active_txns.remove(&txn_id);
                    committed_txns.insert(txn_id);
                }
            }
            LogRecordType::RollbackRecord => {
                if let Some(txn_id) = log.txn_id {
                    active_txns.remove(&txn_id);
                }
            }
            _ => {}
        }
    }

    Ok(Analysis {
        committed: committed_txns,
        uncommitted: active_txns,
        checkpoint_index,
        max_txn_id: max_txn_id(logs),
    })
}

// Checked for the whole log before anything is applied.
fn validate(index: usize, log: &LogRecord, record_size: usize) -> Result<()> {
    let malformed = |what: &str| {
        StoreError::MalformedLogRecord(format!("#{} ({:?}): {}", index, log.record_type, what))
    };
    let check_image = |image: &Option<Vec<u8>>, name: &str| match image {
        Some(bytes) if bytes.len() == record_size => Ok(()),
        Some(bytes) => Err(malformed(&format!(
            "{} is {} bytes, expected {}",
            name,
            bytes.len(),
            record_size
        ))),
        None => Err(malformed(&format!("missing {}", name))),
    };

    match log.record_type {
        LogRecordType::CheckpointRecord => Ok(()),
        _ if log.txn_id.is_none() => Err(malformed("missing transaction id")),
        LogRecordType::InsertRecord | LogRecordType::UpdateRecord | LogRecordType::DeleteRecord
            if log.record_id.is_none() =>
        {
            Err(malformed("missing record id"))
        }
        LogRecordType::InsertRecord => check_image(&log.after_img, "after image"),
        LogRecordType::UpdateRecord => {
            check_image(&log.before_img, "before image")?;
            check_image(&log.after_img, "after image")
        }
        _ => Ok(()),
    }
}

fn redo_phase(
    logs: &[LogRecord],
    analysis: &Analysis,
    buffer_manager: &mut BufferManager,
    heap: &HeapSegment,
) -> Result<usize> {
    let mut redone = 0;

    for log in &logs[analysis.start()..] {
        let committed = log.txn_id.map_or(false, |txn| analysis.committed.contains(&txn));
        if !committed {
            continue;
        }
        if let (
            LogRecordType::InsertRecord | LogRecordType::UpdateRecord,
            Some(record_id),
            Some(after_img),
        ) = (log.record_type, log.record_id, &log.after_img)
        {
            heap.apply_image(buffer_manager, record_id, after_img)?;
            debug!("redo {:?} record {}", log.record_type, record_id.0);
            redone += 1;
        }
    }

    Ok(redone)
}

fn undo_phase(
    logs: &[LogRecord],
    analysis: &Analysis,
    buffer_manager: &mut BufferManager,
    heap: &HeapSegment,
) -> Result<usize> {
    let mut undone = 0;
    let empty_slot = vec![0u8; heap.layout().record_size()];

    // Newest first, so repeated writes to one slot settle on the oldest before image
    for log in logs[analysis.start()..].iter().rev() {
        let loser = log.txn_id.map_or(false, |txn| analysis.uncommitted.contains(&txn));
        if !loser {
            continue;
        }
        let record_id = match log.record_id {
            Some(record_id) => record_id,
            None => continue,
        };

        match log.record_type {
            LogRecordType::UpdateRecord => {
                if let Some(before_img) = &log.before_img {
                    heap.apply_image(buffer_manager, record_id, before_img)?;
                    undone += 1;
                    debug!("undo update of record {}", record_id.0);
                }
            }
            LogRecordType::InsertRecord => {
                heap.apply_image(buffer_manager, record_id, &empty_slot)?;
                undone += 1;
                debug!("undo insert of record {}", record_id.0);
            }
            LogRecordType::DeleteRecord => {
                warn!("skipping reserved DELETE record for record {}", record_id.0);
            }
            _ => {}
        }
    }

    Ok(undone)
}
