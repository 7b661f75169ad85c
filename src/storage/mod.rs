mod db_files;
mod file;
mod page_store;
mod record_layout;

pub use db_files::DBFiles;
pub use file::{File, FileMode, MemoryFile, PosixFile};
pub use page_store::PageStore;
pub use record_layout::RecordLayout;
