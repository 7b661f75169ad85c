use log::debug;

use crate::buffer::BufferManager;
use crate::common::{PageID, RecordID, Result};
use crate::storage::RecordLayout;

/// Record-slot access over the buffer pool. Knows where a record lives, not who owns it.
pub struct HeapSegment {
    layout: RecordLayout,
}

impl HeapSegment {
    pub fn new(layout: RecordLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Raw slot image, padding included.
    pub fn read_slot(
        &self,
        buffer_manager: &mut BufferManager,
        record_id: RecordID,
    ) -> Result<Vec<u8>> {
        let tid = self.layout.locate(record_id);
        let handle = buffer_manager.fix_page(tid.page())?;
        let slot = buffer_manager.frame(tid.page())?.get_data()
            [self.layout.slot_range(tid.slot_id)]
            .to_vec();
        buffer_manager.unfix_page(handle)?;
        Ok(slot)
    }

    /// Copies `image` into the slot of an already fixed page and marks it dirty.
    pub fn write_slot(
        &self,
        buffer_manager: &mut BufferManager,
        record_id: RecordID,
        image: &[u8],
    ) -> Result<()> {
        let tid = self.layout.locate(record_id);
        let range = self.layout.slot_range(tid.slot_id);
        let frame = buffer_manager.frame_mut(tid.page())?;
        frame.get_data_mut()[range].copy_from_slice(image);
        frame.set_dirty(true);
        Ok(())
    }

    /// Fix, write, force, unfix. Used by recovery, which never keeps pages pinned.
    pub fn apply_image(
        &self,
        buffer_manager: &mut BufferManager,
        record_id: RecordID,
        image: &[u8],
    ) -> Result<()> {
        let page_id = self.layout.locate(record_id).page();
        let handle = buffer_manager.fix_page(page_id)?;
        self.write_slot(buffer_manager, record_id, image)?;
        buffer_manager.force_page(page_id)?;
        buffer_manager.unfix_page(handle)
    }

    /// Decoded, non-empty records of one page in slot order.
    pub fn read_page_records(
        &self,
        buffer_manager: &mut BufferManager,
        page_id: PageID,
    ) -> Result<Vec<Vec<u8>>> {
        let handle = buffer_manager.fix_page(page_id)?;
        let data = buffer_manager.frame(page_id)?.get_data();
        let records = (0..self.layout.records_per_page() as u64)
            .map(|slot_id| self.layout.decode(&data[self.layout.slot_range(slot_id)]))
            .filter(|record| !record.is_empty())
            .collect();
        buffer_manager.unfix_page(handle)?;
        Ok(records)
    }

    /// One past the last non-empty slot in the data file.
    pub fn count_records(&self, buffer_manager: &mut BufferManager) -> Result<u64> {
        let page_count = buffer_manager.page_store().page_count()?;
        let per_page = self.layout.records_per_page() as u64;

        for page in (0..page_count).rev() {
            let page_id = PageID(page);
            let handle = buffer_manager.fix_page(page_id)?;
            let data = buffer_manager.frame(page_id)?.get_data();
            let last_used = (0..per_page)
                .rev()
                .find(|&slot_id| data[self.layout.slot_range(slot_id)].iter().any(|&b| b != 0));
            buffer_manager.unfix_page(handle)?;

            if let Some(slot_id) = last_used {
                let count = page * per_page + slot_id + 1;
                debug!("data file holds {} records", count);
                return Ok(count);
            }
        }
        Ok(0)
    }
}
