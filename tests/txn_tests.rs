use std::path::Path;

use shadow_store::{
    buffer::BufferManager,
    common::{PageID, RecordID, Result, StoreError, TransactionID},
    log_mod::{LogManager, LogRecordType},
    storage::{PageStore, RecordLayout},
    transaction::TransactionManager,
};
use tempfile::tempdir;

fn open_manager(dir: &Path) -> Result<TransactionManager> {
    let page_store = PageStore::open(&dir.join("records.dat"), 4096, 100)?;
    let buffer_manager = BufferManager::new(page_store, 10);
    let log_manager = LogManager::new(&dir.join("wal.log"))?;
    TransactionManager::new(log_manager, buffer_manager, RecordLayout::new(4096, 100))
}

#[test]
fn test_operations_require_active_transaction() -> Result<()> {
    let dir = tempdir()?;
    let mut txn_manager = open_manager(dir.path())?;

    assert!(matches!(txn_manager.insert_record(b"x"), Err(StoreError::NoActiveTransaction)));
    assert!(matches!(
        txn_manager.update_record(RecordID(0), b"x"),
        Err(StoreError::NoActiveTransaction)
    ));
    assert!(matches!(txn_manager.commit_txn(), Err(StoreError::NoActiveTransaction)));
    assert!(matches!(txn_manager.rollback_txn(), Err(StoreError::NoActiveTransaction)));

    assert_eq!(txn_manager.record_count(), 0);
    assert_eq!(txn_manager.log_manager().get_total_log_records(), 0);
    Ok(())
}

#[test]
fn test_begin_while_active_commits_previous() -> Result<()> {
    let dir = tempdir()?;
    let mut txn_manager = open_manager(dir.path())?;

    let first = txn_manager.start_txn()?;
    txn_manager.insert_record(b"kept")?;
    let second = txn_manager.start_txn()?;

    assert_ne!(first, second);
    assert_eq!(txn_manager.current_txn(), Some(second));
    assert_eq!(
        txn_manager.log_manager().get_total_log_records_of_type(LogRecordType::CommitRecord),
        1
    );

    // Rolling back the second transaction must not touch the first one's insert
    txn_manager.rollback_txn()?;
    assert_eq!(txn_manager.record_count(), 1);
    assert_eq!(txn_manager.read_record(RecordID(0))?, b"kept");
    Ok(())
}

#[test]
fn test_rollback_reuses_inserted_slots() -> Result<()> {
    let dir = tempdir()?;
    let mut txn_manager = open_manager(dir.path())?;

    txn_manager.start_txn()?;
    txn_manager.insert_record(b"Etudiant 1")?;
    txn_manager.insert_record(b"Etudiant 2")?;
    assert_eq!(txn_manager.record_count(), 2);
    txn_manager.rollback_txn()?;
    assert_eq!(txn_manager.record_count(), 0);

    txn_manager.start_txn()?;
    let record_id = txn_manager.insert_record(b"Etudiant 3")?;
    txn_manager.commit_txn()?;

    assert_eq!(record_id, RecordID(0));
    assert_eq!(txn_manager.read_record(RecordID(0))?, b"Etudiant 3");
    assert_eq!(txn_manager.record_count(), 1);
    assert_eq!(txn_manager.read_page(PageID(0))?, vec![b"Etudiant 3".to_vec()]);
    Ok(())
}

#[test]
fn test_rollback_restores_updated_record() -> Result<()> {
    let dir = tempdir()?;
    let mut txn_manager = open_manager(dir.path())?;

    txn_manager.start_txn()?;
    txn_manager.insert_record(b"before")?;
    txn_manager.commit_txn()?;

    txn_manager.start_txn()?;
    txn_manager.update_record(RecordID(0), b"after")?;
    assert_eq!(txn_manager.read_record(RecordID(0))?, b"after");
    txn_manager.rollback_txn()?;

    assert_eq!(txn_manager.read_record(RecordID(0))?, b"before");
    assert_eq!(txn_manager.record_count(), 1);
    Ok(())
}

#[test]
fn test_rollback_undoes_forced_writes_on_disk() -> Result<()> {
    let dir = tempdir()?;

    {
        let mut txn_manager = open_manager(dir.path())?;
        txn_manager.start_txn()?;
        txn_manager.insert_record(b"committed")?;
        txn_manager.commit_txn()?;

        txn_manager.start_txn()?;
        txn_manager.insert_record(b"discarded")?;
        txn_manager.update_record(RecordID(0), b"overwritten")?;
        txn_manager.rollback_txn()?;
    }

    let mut txn_manager = open_manager(dir.path())?;
    assert_eq!(txn_manager.record_count(), 1);
    assert_eq!(txn_manager.read_record(RecordID(0))?, b"committed");
    Ok(())
}

#[test]
fn test_page_shadowed_once_per_transaction() -> Result<()> {
    let dir = tempdir()?;
    let mut txn_manager = open_manager(dir.path())?;

    txn_manager.start_txn()?;
    txn_manager.insert_record(b"a")?;
    txn_manager.insert_record(b"b")?;
    txn_manager.update_record(RecordID(0), b"c")?;

    let txn = txn_manager.current_transaction().expect("transaction is active");
    assert_eq!(txn.shadowed_pages(), 1);
    assert_eq!(txn.inserted_records(), 2);
    // Shadowed pages stay pinned until the transaction ends
    assert_eq!(txn_manager.buffer_manager().frame(PageID(0))?.pin_count(), 1);

    txn_manager.commit_txn()?;
    assert_eq!(txn_manager.buffer_manager().frame(PageID(0))?.pin_count(), 0);
    Ok(())
}

#[test]
fn test_reads_are_bounded_by_record_count() -> Result<()> {
    let dir = tempdir()?;
    let mut txn_manager = open_manager(dir.path())?;

    assert!(matches!(
        txn_manager.read_record(RecordID(0)),
        Err(StoreError::RecordOutOfBounds { record_id: 0, record_count: 0 })
    ));

    txn_manager.start_txn()?;
    txn_manager.insert_record(b"only")?;
    assert!(matches!(
        txn_manager.update_record(RecordID(5), b"nope"),
        Err(StoreError::RecordOutOfBounds { record_id: 5, record_count: 1 })
    ));
    // The rejected update leaves the transaction open
    assert!(txn_manager.current_txn().is_some());
    Ok(())
}

#[test]
fn test_long_payload_is_truncated() -> Result<()> {
    let dir = tempdir()?;
    let mut txn_manager = open_manager(dir.path())?;

    txn_manager.start_txn()?;
    let record_id = txn_manager.insert_record(&[b'a'; 150])?;
    txn_manager.commit_txn()?;

    assert_eq!(txn_manager.read_record(record_id)?, vec![b'a'; 100]);
    Ok(())
}

#[test]
fn test_inserts_spill_onto_next_page() -> Result<()> {
    let dir = tempdir()?;
    let mut txn_manager = open_manager(dir.path())?;

    txn_manager.start_txn()?;
    for i in 0..41 {
        txn_manager.insert_record(format!("r{}", i).as_bytes())?;
    }
    assert_eq!(txn_manager.current_transaction().map(|txn| txn.shadowed_pages()), Some(2));
    txn_manager.commit_txn()?;

    assert_eq!(txn_manager.read_page(PageID(0))?.len(), 40);
    assert_eq!(txn_manager.read_page(PageID(1))?, vec![b"r40".to_vec()]);
    assert!(txn_manager.read_page(PageID(2))?.is_empty());
    Ok(())
}

#[test]
fn test_transaction_ids_continue_after_reopen() -> Result<()> {
    let dir = tempdir()?;

    {
        let mut txn_manager = open_manager(dir.path())?;
        assert_eq!(txn_manager.start_txn()?, TransactionID(1));
        txn_manager.commit_txn()?;
        assert_eq!(txn_manager.start_txn()?, TransactionID(2));
        txn_manager.commit_txn()?;
        txn_manager.close()?;
    }

    let mut txn_manager = open_manager(dir.path())?;
    assert_eq!(txn_manager.start_txn()?, TransactionID(3));
    Ok(())
}
