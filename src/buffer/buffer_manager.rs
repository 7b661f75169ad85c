use std::collections::HashMap;

use log::{debug, trace};

use crate::common::{PageID, Result, StoreError};
use crate::storage::PageStore;

pub struct BufferFrame {
    page_id: PageID,
    data: Vec<u8>,
    is_dirty: bool,
    pin_count: u32, // Can't evict while > 0
}

impl BufferFrame {
    pub fn new(page_id: PageID, data: Vec<u8>) -> Self {
        Self {
            page_id,
            data,
            is_dirty: false,
            pin_count: 0,
        }
    }

    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    pub fn get_data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.is_dirty = dirty;
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn pin(&mut self) {
        self.pin_count += 1;
    }

    pub fn unpin(&mut self) -> Result<()> {
        if self.pin_count == 0 {
            return Err(StoreError::Other(
                "Cannot unpin a page with pin count 0".to_string(),
            ));
        }
        self.pin_count -= 1;
        Ok(())
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    pub fn get_page_id(&self) -> PageID {
        self.page_id
    }
}

/// Proof of one pin on a buffered page. Handed back to `unfix_page`, which consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct PageHandle {
    page_id: PageID,
}

impl PageHandle {
    pub fn page_id(&self) -> PageID {
        self.page_id
    }
}

/// The buffer pool. Owns every cached frame; all page traffic to the data file goes
/// through here.
pub struct BufferManager {
    frames: HashMap<PageID, BufferFrame>,
    page_store: PageStore,
    capacity: usize,
}

impl BufferManager {
    pub fn new(page_store: PageStore, capacity: usize) -> Self {
        Self {
            frames: HashMap::with_capacity(capacity),
            page_store,
            capacity,
        }
    }

    pub fn fix_page(&mut self, page_id: PageID) -> Result<PageHandle> {
        if !self.frames.contains_key(&page_id) {
            if self.frames.len() >= self.capacity {
                self.evict_page()?;
            }
            let data = self.page_store.read_page(page_id)?;
            self.frames.insert(page_id, BufferFrame::new(page_id, data));
        }

        let frame = self
            .frames
            .get_mut(&page_id)
            .ok_or(StoreError::PageNotFound(page_id.0))?;
        frame.pin();
        trace!("fix page {} (pins={})", page_id.0, frame.pin_count());

        Ok(PageHandle { page_id })
    }

    /// Drops one pin. An unpinned frame stays cached until the pool needs its slot.
    pub fn unfix_page(&mut self, handle: PageHandle) -> Result<()> {
        let frame = self
            .frames
            .get_mut(&handle.page_id)
            .ok_or(StoreError::PageNotFound(handle.page_id.0))?;
        frame.unpin()?;
        trace!("unfix page {} (pins={})", handle.page_id.0, frame.pin_count());
        Ok(())
    }

    pub fn frame(&self, page_id: PageID) -> Result<&BufferFrame> {
        self.frames
            .get(&page_id)
            .ok_or(StoreError::PageNotFound(page_id.0))
    }

    pub fn frame_mut(&mut self, page_id: PageID) -> Result<&mut BufferFrame> {
        self.frames
            .get_mut(&page_id)
            .ok_or(StoreError::PageNotFound(page_id.0))
    }

    pub fn mark_dirty(&mut self, page_id: PageID) -> Result<()> {
        self.frame_mut(page_id)?.set_dirty(true);
        Ok(())
    }

    /// Writes the page back if it is cached and dirty; anything else is a no-op.
    pub fn force_page(&mut self, page_id: PageID) -> Result<()> {
        if let Some(frame) = self.frames.get_mut(&page_id) {
            if frame.is_dirty() {
                self.page_store.write_page(page_id, frame.get_data())?;
                frame.set_dirty(false);
                debug!("forced page {}", page_id.0);
            }
        }
        Ok(())
    }

    pub fn flush_all_pages(&mut self) -> Result<()> {
        let mut page_ids: Vec<PageID> = self
            .frames
            .values()
            .filter(|frame| frame.is_dirty())
            .map(|frame| frame.get_page_id())
            .collect();
        page_ids.sort();

        for page_id in page_ids {
            self.force_page(page_id)?;
        }
        Ok(())
    }

    pub fn is_cached(&self, page_id: PageID) -> bool {
        self.frames.contains_key(&page_id)
    }

    pub fn cached_pages(&self) -> usize {
        self.frames.len()
    }

    pub fn page_store(&self) -> &PageStore {
        &self.page_store
    }

    pub fn page_store_mut(&mut self) -> &mut PageStore {
        &mut self.page_store
    }

    fn evict_page(&mut self) -> Result<()> {
        // First unpinned frame wins
        let victim = self
            .frames
            .values()
            .find(|frame| frame.pin_count() == 0)
            .map(|frame| frame.get_page_id());

        match victim {
            Some(page_id) => {
                self.force_page(page_id)?;
                self.frames.remove(&page_id);
                trace!("evicted page {}", page_id.0);
                Ok(())
            }
            None => Err(StoreError::BufferFull),
        }
    }
}
