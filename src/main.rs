use env_logger::Builder;
use log::{info, LevelFilter};
use uuid::Uuid;

use shadow_store::{DBFiles, Database, RecordID};

fn show(db: &mut Database, record_id: u64) -> shadow_store::Result<()> {
    let bytes = db.read(RecordID(record_id))?;
    info!("record {}: {}", record_id, String::from_utf8_lossy(&bytes));
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("Shadow store demo");

    let db_path = std::env::temp_dir().join(format!("shadow-store-demo-{}", Uuid::new_v4()));
    let files = DBFiles::new(&db_path)?;

    // Committed work survives, the open transaction does not
    let mut db = Database::open_database(&db_path)?;
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
    info!("crashing with transaction {:?} open", db.current_transaction());
    drop(db);

    let mut db = Database::open_database(&db_path)?;
    let report = db.recover()?;
    info!(
        "recovered: committed={:?} uncommitted={:?}",
        report.committed, report.uncommitted
    );
    show(&mut db, 0)?;
    show(&mut db, 1)?;

    // Explicit rollback hands the slot back
    db.begin()?;
    db.insert(b"Etudiant B")?;
    db.rollback()?;
    info!("record count after rollback: {}", db.record_count());
    db.close()?;

    files.cleanup()?;
    Ok(())
}
