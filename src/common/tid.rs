use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::common::{PageID, RecordID};

/// Physical address of a record: the page holding it and the slot within that page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TID {
    pub page_id: u64,
    pub slot_id: u64,
}

impl TID {
    pub fn new(page_id: u64, slot_id: u64) -> Self {
        Self { page_id, slot_id }
    }

    pub fn from_record_id(record_id: RecordID, records_per_page: usize) -> Self {
        let per_page = records_per_page as u64;
        Self::new(record_id.0 / per_page, record_id.0 % per_page)
    }

    pub fn to_record_id(&self, records_per_page: usize) -> RecordID {
        RecordID(self.page_id * records_per_page as u64 + self.slot_id)
    }

    pub fn page(&self) -> PageID {
        PageID(self.page_id)
    }
}

impl PartialOrd for TID {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TID {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.page_id.cmp(&other.page_id) {
            Ordering::Equal => self.slot_id.cmp(&other.slot_id),
            other => other,
        }
    }
}
