use std::ops::Range;

use crate::common::{RecordID, TID};

/// Fixed-slot geometry shared by every page of the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    page_size: usize,
    record_size: usize,
}

impl RecordLayout {
    pub fn new(page_size: usize, record_size: usize) -> Self {
        Self {
            page_size,
            record_size,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn records_per_page(&self) -> usize {
        self.page_size / self.record_size
    }

    pub fn locate(&self, record_id: RecordID) -> TID {
        TID::from_record_id(record_id, self.records_per_page())
    }

    /// Byte range of `slot_id` inside its page.
    pub fn slot_range(&self, slot_id: u64) -> Range<usize> {
        let start = slot_id as usize * self.record_size;
        start..start + self.record_size
    }

    /// Right-pads `payload` with zeros to a full slot. Anything past the slot is dropped.
    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut slot = vec![0u8; self.record_size];
        let len = payload.len().min(self.record_size);
        slot[..len].copy_from_slice(&payload[..len]);
        slot
    }

    /// Strips the trailing zero padding from a slot image.
    pub fn decode(&self, slot: &[u8]) -> Vec<u8> {
        let end = slot.iter().rposition(|&b| b != 0).map_or(0, |pos| pos + 1);
        slot[..end].to_vec()
    }
}
