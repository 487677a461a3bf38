use crate::common::types::{Page, PageId, SlotId, PAGE_SIZE};
use crate::storage::page::error::PageError;
use crate::storage::page::header::PageHeader;
use crate::storage::page::layout::{RecordLocation, HEADER_SIZE, SLOT_SIZE};

/// Slotted-page layout: record data grows forward from the header, the slot
/// directory grows backward from the end of the page. Deleted records keep
/// their slot with length zero, so live slot numbers never move.
pub struct PageManager {}

impl Default for PageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PageManager {
    pub fn new() -> Self {
        Self {}
    }

    /// Initialize a freshly allocated page: empty slot directory, all space
    /// past the header free, end-of-chain next link.
    pub fn init_page(&self, page: &mut Page) {
        let header = PageHeader::new();
        let header_bytes = header.to_bytes();
        page.data[0..HEADER_SIZE].copy_from_slice(&header_bytes);
    }

    pub fn insert_record(&self, page: &mut Page, data: &[u8]) -> Result<SlotId, PageError> {
        let mut header = self.get_header(page);

        // Record size plus the slot entry for the record
        let record_size = data.len() as u32;
        let total_space_needed = record_size + SLOT_SIZE as u32;

        if header.free_space_size < total_space_needed {
            return Err(PageError::InsufficientSpace);
        }

        // Slot entries are appended; deleted slots are not reused
        let slot_pos = Self::slot_position(header.record_count);

        let record_loc = RecordLocation {
            offset: header.free_space_offset,
            length: record_size,
        };

        // Write record data
        let data_end = header.free_space_offset as usize + data.len();
        page.data[header.free_space_offset as usize..data_end].copy_from_slice(data);

        // Write slot entry
        let slot_bytes = record_loc.to_bytes();
        page.data[slot_pos..slot_pos + SLOT_SIZE].copy_from_slice(&slot_bytes);

        // Update header
        header.free_space_offset += record_size;
        header.free_space_size -= total_space_needed;
        header.record_count += 1;
        self.set_header(page, &header);

        Ok(header.record_count - 1)
    }

    /// Tombstone the record: its slot keeps its position with length zero.
    /// The space is not reclaimed, so RIDs of live records stay stable.
    pub fn delete_record(&self, page: &mut Page, slot_no: SlotId) -> Result<(), PageError> {
        let header = self.get_header(page);

        if slot_no >= header.record_count {
            return Err(PageError::InvalidSlot(slot_no));
        }

        let slot_pos = Self::slot_position(slot_no);
        let mut record_loc = self.record_location(page, slot_pos);

        if record_loc.length == 0 {
            return Err(PageError::RecordNotFound); // Already deleted
        }

        record_loc.length = 0;
        let slot_bytes = record_loc.to_bytes();
        page.data[slot_pos..slot_pos + SLOT_SIZE].copy_from_slice(&slot_bytes);

        Ok(())
    }

    pub fn get_record(&self, page: &Page, slot_no: SlotId) -> Result<Vec<u8>, PageError> {
        let header = self.get_header(page);

        if slot_no >= header.record_count {
            return Err(PageError::InvalidSlot(slot_no));
        }

        let slot_pos = Self::slot_position(slot_no);
        let record_loc = self.record_location(page, slot_pos);

        if record_loc.length == 0 {
            return Err(PageError::RecordNotFound); // Deleted record
        }

        let start = record_loc.offset as usize;
        let end = start + record_loc.length as usize;
        let mut data = vec![0u8; record_loc.length as usize];
        data.copy_from_slice(&page.data[start..end]);

        Ok(data)
    }

    /// First live record on the page, if any.
    pub fn first_record(&self, page: &Page) -> Option<SlotId> {
        self.next_live_slot(page, 0)
    }

    /// Next live record strictly after `slot_no`. Tolerates a deleted or
    /// out-of-range input slot.
    pub fn next_record(&self, page: &Page, slot_no: SlotId) -> Option<SlotId> {
        self.next_live_slot(page, slot_no + 1)
    }

    pub fn next_page(&self, page: &Page) -> Option<PageId> {
        self.get_header(page).next_page_id
    }

    pub fn set_next_page(&self, page: &mut Page, next: Option<PageId>) {
        let mut header = self.get_header(page);
        header.next_page_id = next;
        self.set_header(page, &header);
    }

    pub fn get_header(&self, page: &Page) -> PageHeader {
        PageHeader::from_bytes(&page.data[0..HEADER_SIZE])
    }

    pub fn get_free_space(&self, page: &Page) -> u32 {
        self.get_header(page).free_space_size
    }

    // Helper methods

    fn set_header(&self, page: &mut Page, header: &PageHeader) {
        let header_bytes = header.to_bytes();
        page.data[0..HEADER_SIZE].copy_from_slice(&header_bytes);
    }

    fn next_live_slot(&self, page: &Page, from: SlotId) -> Option<SlotId> {
        let header = self.get_header(page);
        (from..header.record_count)
            .find(|&slot| self.record_location(page, Self::slot_position(slot)).length > 0)
    }

    // Calculate slot position from the slot number
    fn slot_position(slot_no: SlotId) -> usize {
        PAGE_SIZE - SLOT_SIZE * (slot_no as usize + 1)
    }

    // Get record location from slot
    fn record_location(&self, page: &Page, slot_pos: usize) -> RecordLocation {
        RecordLocation::from_bytes(&page.data[slot_pos..slot_pos + SLOT_SIZE])
    }
}
