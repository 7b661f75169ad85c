mod log_manager;
mod log_record;
pub mod recovery;

pub use log_manager::LogManager;
pub use log_record::{LogRecord, LogRecordType};
pub use recovery::RecoveryReport;
