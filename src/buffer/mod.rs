mod buffer_manager;

pub use buffer_manager::{BufferFrame, BufferManager, PageHandle};
