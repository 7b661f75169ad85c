use std::path::Path;

use shadow_store::{
    common::{RecordID, Result, StoreError, TransactionID},
    log_mod::LogManager,
    storage::DBFiles,
    Database,
};
use tempfile::tempdir;

fn read_str(db: &mut Database, record_id: u64) -> Result<String> {
    Ok(String::from_utf8_lossy(&db.read(RecordID(record_id))?).into_owned())
}

/// Committed A, uncommitted B whose log records reached disk, then a crash.
fn committed_then_crash(db_path: &Path, checkpoint_between: bool) -> Result<()> {
    let mut db = Database::open_database(db_path)?;
    db.begin()?;
    db.insert(b"a0")?;
    db.insert(b"a1")?;
    db.commit()?;
    if checkpoint_between {
        db.checkpoint()?;
    }
    db.begin()?;
    db.update(RecordID(1), b"b1")?;
    db.insert(b"b2")?;
    db.flush_log()?;
    drop(db);
    Ok(())
}

#[test]
fn test_committed_changes_survive_crash() -> Result<()> {
    let dir = tempdir()?;

    {
        let mut db = Database::open_database(dir.path())?;
        db.begin()?;
        db.insert(b"first")?;
        db.insert(b"second")?;
        db.update(RecordID(0), b"first, revised")?;
        db.commit()?;
    }

    let mut db = Database::open_database(dir.path())?;
    let report = db.recover()?;

    assert!(report.committed.contains(&TransactionID(1)));
    assert!(report.uncommitted.is_empty());
    assert_eq!(read_str(&mut db, 0)?, "first, revised");
    assert_eq!(read_str(&mut db, 1)?, "second");
    assert_eq!(db.record_count(), 2);
    Ok(())
}

#[test]
fn test_redo_rebuilds_lost_data_file() -> Result<()> {
    let dir = tempdir()?;
    let files = DBFiles::new(dir.path())?;

    {
        let mut db = Database::open_database(dir.path())?;
        db.begin()?;
        db.insert(b"Etudiant 1")?;
        db.insert(b"Etudiant 2")?;
        db.commit()?;
    }
    // The page writes never made it
    std::fs::write(files.get_data_file_path(), b"")?;

    let mut db = Database::open_database(dir.path())?;
    assert_eq!(db.record_count(), 0);

    let report = db.recover()?;
    assert_eq!(report.redone, 2);
    assert_eq!(report.undone, 0);
    assert_eq!(db.record_count(), 2);
    assert_eq!(read_str(&mut db, 0)?, "Etudiant 1");
    assert_eq!(read_str(&mut db, 1)?, "Etudiant 2");
    Ok(())
}

#[test]
fn test_uncommitted_transaction_is_undone() -> Result<()> {
    let dir = tempdir()?;
    committed_then_crash(dir.path(), false)?;

    let mut db = Database::open_database(dir.path())?;
    let report = db.recover()?;

    assert_eq!(report.committed.len(), 1);
    assert!(report.uncommitted.contains(&TransactionID(2)));
    assert_eq!(report.undone, 2);
    assert_eq!(read_str(&mut db, 0)?, "a0");
    assert_eq!(read_str(&mut db, 1)?, "a1");
    assert_eq!(db.record_count(), 2);
    assert!(matches!(
        db.read(RecordID(2)),
        Err(StoreError::RecordOutOfBounds { .. })
    ));
    Ok(())
}

#[test]
fn test_checkpoint_does_not_change_outcome() -> Result<()> {
    let plain = tempdir()?;
    let checkpointed = tempdir()?;
    committed_then_crash(plain.path(), false)?;
    committed_then_crash(checkpointed.path(), true)?;

    let mut without = Database::open_database(plain.path())?;
    let mut with = Database::open_database(checkpointed.path())?;
    let report_without = without.recover()?;
    let report_with = with.recover()?;

    assert_eq!(report_without.checkpoint_index, None);
    assert_eq!(report_with.checkpoint_index, Some(4));
    // Redo starts at the checkpoint, so it replays less
    assert!(report_with.redone < report_without.redone);

    assert_eq!(without.record_count(), with.record_count());
    for record_id in 0..without.record_count() {
        assert_eq!(read_str(&mut without, record_id)?, read_str(&mut with, record_id)?);
    }
    Ok(())
}

#[test]
fn test_update_after_checkpoint_is_redone() -> Result<()> {
    let dir = tempdir()?;

    {
        let mut db = Database::open_database(dir.path())?;
        db.begin()?;
        db.insert(b"Original 1")?;
        db.insert(b"Original 2")?;
        db.commit()?;
        db.checkpoint()?;
        db.begin()?;
        db.update(RecordID(0), b"Modified 1")?;
        db.commit()?;
        db.begin()?;
        db.update(RecordID(1), b"Modified 2 (uncommitted)")?;
        db.flush_log()?;
    }

    let mut db = Database::open_database(dir.path())?;
    let report = db.recover()?;

    assert_eq!(report.redone, 1);
    assert_eq!(report.undone, 1);
    assert_eq!(read_str(&mut db, 0)?, "Modified 1");
    assert_eq!(read_str(&mut db, 1)?, "Original 2");
    Ok(())
}

#[test]
fn test_undo_settles_on_earliest_before_image() -> Result<()> {
    let dir = tempdir()?;

    {
        let mut db = Database::open_database(dir.path())?;
        db.begin()?;
        db.insert(b"v0")?;
        db.commit()?;
        db.begin()?;
        db.update(RecordID(0), b"v1")?;
        db.update(RecordID(0), b"v2")?;
        db.flush_log()?;
    }

    let mut db = Database::open_database(dir.path())?;
    db.recover()?;
    assert_eq!(read_str(&mut db, 0)?, "v0");
    Ok(())
}

#[test]
fn test_rolled_back_transaction_is_left_alone() -> Result<()> {
    let dir = tempdir()?;

    {
        let mut db = Database::open_database(dir.path())?;
        db.begin()?;
        db.insert(b"a")?;
        db.commit()?;
        db.begin()?;
        db.update(RecordID(0), b"b")?;
        db.rollback()?;
    }

    let mut db = Database::open_database(dir.path())?;
    let report = db.recover()?;
    assert!(report.uncommitted.is_empty());
    assert_eq!(report.undone, 0);
    assert_eq!(read_str(&mut db, 0)?, "a");
    Ok(())
}

#[test]
fn test_second_crash_keeps_later_commits() -> Result<()> {
    let dir = tempdir()?;

    {
        let mut db = Database::open_database(dir.path())?;
        db.begin()?;
        db.insert(b"lost")?;
        db.flush_log()?;
    }
    {
        let mut db = Database::open_database(dir.path())?;
        db.recover()?;
        assert_eq!(db.record_count(), 0);

        db.begin()?;
        db.insert(b"kept")?;
        db.commit()?;
    }

    let mut db = Database::open_database(dir.path())?;
    let report = db.recover()?;
    assert!(report.uncommitted.is_empty());
    assert_eq!(read_str(&mut db, 0)?, "kept");
    assert_eq!(db.record_count(), 1);
    Ok(())
}

#[test]
fn test_recover_on_empty_log_is_noop() -> Result<()> {
    let dir = tempdir()?;
    let mut db = Database::open_database(dir.path())?;

    let report = db.recover()?;
    assert_eq!(report.records_replayed, 0);
    assert_eq!(db.record_count(), 0);
    Ok(())
}

#[test]
fn test_recover_refused_during_transaction() -> Result<()> {
    let dir = tempdir()?;
    let mut db = Database::open_database(dir.path())?;

    let txn_id = db.begin()?;
    assert!(matches!(
        db.recover(),
        Err(StoreError::TransactionInProgress(id)) if id == txn_id.0
    ));
    Ok(())
}

#[test]
fn test_malformed_log_aborts_before_applying() -> Result<()> {
    let dir = tempdir()?;
    let files = DBFiles::new(dir.path())?;

    {
        let mut log_manager = LogManager::new(&files.get_log_file_path())?;
        log_manager.log_txn_begin(TransactionID(1));
        log_manager.log_insert(TransactionID(1), RecordID(0), vec![b'x'; 100]);
        // Wrong image width for a 100-byte record
        log_manager.log_insert(TransactionID(1), RecordID(1), vec![b'y'; 3]);
        log_manager.log_commit(TransactionID(1));
        log_manager.flush()?;
    }

    let mut db = Database::open_database(dir.path())?;
    assert!(matches!(db.recover(), Err(StoreError::MalformedLogRecord(_))));
    assert_eq!(db.record_count(), 0);
    assert!(db.read_page(0)?.is_empty());
    Ok(())
}
