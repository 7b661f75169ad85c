use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Transaction {0} is still active")]
    TransactionInProgress(u64),

    #[error("Record {record_id} out of bounds (record count {record_count})")]
    RecordOutOfBounds { record_id: u64, record_count: u64 },

    #[error("Buffer full")]
    BufferFull,

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Log serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Corrupt log at offset {offset}: {reason}")]
    CorruptLog { offset: u64, reason: String },

    #[error("Malformed log record: {0}")]
    MalformedLogRecord(String),

    #[error("Page {0} not found")]
    PageNotFound(u64),

    #[error("Page {0} lies outside the addressable file")]
    PageOutOfRange(u64),

    #[error("Page size exceeded: got {0}, max {1}")]
    PageSizeExceeded(usize, usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Other error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
