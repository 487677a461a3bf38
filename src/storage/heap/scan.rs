use std::path::Path;
use std::sync::Arc;
use log::warn;

use crate::common::types::{PageId, Rid};
use crate::storage::buffer::BufferPoolManager;
use crate::storage::heap::error::HeapError;
use crate::storage::heap::file::HeapFile;
use crate::storage::heap::predicate::Predicate;

/// Filtered sequential scan over a heap file. The scan owns the underlying
/// handle; between calls it keeps the page under the cursor pinned, and it
/// never pins more than that one data page.
pub struct HeapFileScan {
    file: HeapFile,
    filter: Option<Predicate>,
    marked_page_no: PageId,
    marked_rec: Option<Rid>,
}

impl HeapFileScan {
    pub fn open(
        buffer_pool: Arc<BufferPoolManager>,
        path: impl AsRef<Path>,
    ) -> Result<Self, HeapError> {
        let file = HeapFile::open(buffer_pool, path)?;
        let marked_page_no = file.cur_page_no;
        Ok(Self {
            file,
            filter: None,
            marked_page_no,
            marked_rec: None,
        })
    }

    pub fn rec_cnt(&self) -> u32 {
        self.file.rec_cnt()
    }

    /// Install (or clear) the scan predicate. Starting a scan does not move
    /// the cursor; traversal resumes from the current position.
    pub fn start_scan(&mut self, filter: Option<Predicate>) -> Result<(), HeapError> {
        match filter {
            None => {
                self.filter = None;
                Ok(())
            }
            Some(predicate) => {
                if !predicate.is_valid() {
                    return Err(HeapError::BadScanParm);
                }
                self.filter = Some(predicate);
                Ok(())
            }
        }
    }

    /// Unpin the page under the cursor and forget it. The scan can no
    /// longer advance, but the handle itself stays open.
    pub fn end_scan(&mut self) -> Result<(), HeapError> {
        if self.file.cur_page.take().is_some() {
            let status = self.file.buffer_pool.unpin_page(
                self.file.file_id,
                self.file.cur_page_no,
                self.file.cur_dirty,
            );
            self.file.cur_page_no = 0;
            self.file.cur_dirty = false;
            status?;
        }
        Ok(())
    }

    /// Snapshot the scan position for a later `reset_scan`.
    pub fn mark_scan(&mut self) {
        self.marked_page_no = self.file.cur_page_no;
        self.marked_rec = self.file.cur_rec;
    }

    /// Restore the position saved by `mark_scan`. If the mark is on a
    /// different page, the current page is released and the marked page
    /// pinned in its place.
    pub fn reset_scan(&mut self) -> Result<(), HeapError> {
        if self.marked_page_no != self.file.cur_page_no {
            if self.file.cur_page.take().is_some() {
                self.file.buffer_pool.unpin_page(
                    self.file.file_id,
                    self.file.cur_page_no,
                    self.file.cur_dirty,
                )?;
            }

            self.file.cur_page_no = self.marked_page_no;
            self.file.cur_rec = self.marked_rec;

            let page = self
                .file
                .buffer_pool
                .fetch_page(self.file.file_id, self.marked_page_no)?;
            self.file.cur_page = Some(page);
            self.file.cur_dirty = false; // it will be clean
        } else {
            self.file.cur_rec = self.marked_rec;
        }
        Ok(())
    }

    /// Advance to the next matching record. Returns `Ok(None)` once the
    /// chain is exhausted; the page under the cursor stays pinned either
    /// way so the scan can be resumed or reset.
    pub fn scan_next(&mut self) -> Result<Option<Rid>, HeapError> {
        // Advance from a snapshot of the cursor taken at entry: a match
        // updates cur_rec, but the snapshot is what feeds the traversal.
        let mut tmp_rid = self.file.cur_rec;

        loop {
            let page_ptr = self.file.cur_page.clone().ok_or(HeapError::NoCurrentPage)?;

            let next_page_no = {
                let page = page_ptr.read();

                loop {
                    let next_slot = match tmp_rid {
                        None => self.file.page_manager.first_record(&page),
                        Some(rid) => self.file.page_manager.next_record(&page, rid.slot_no),
                    };

                    let Some(slot_no) = next_slot else {
                        break;
                    };

                    let rid = Rid {
                        page_no: self.file.cur_page_no,
                        slot_no,
                    };

                    let record = self.file.page_manager.get_record(&page, slot_no)?;

                    if self.matches(&record) {
                        self.file.cur_rec = Some(rid);
                        return Ok(Some(rid));
                    }

                    tmp_rid = Some(rid);
                }

                self.file.page_manager.next_page(&page)
            };

            let Some(next_page_no) = next_page_no else {
                // End of chain; the current page stays pinned
                return Ok(None);
            };

            self.file.buffer_pool.unpin_page(
                self.file.file_id,
                self.file.cur_page_no,
                self.file.cur_dirty,
            )?;
            self.file.cur_page = None;

            let page = self
                .file
                .buffer_pool
                .fetch_page(self.file.file_id, next_page_no)?;
            self.file.cur_page = Some(page);
            self.file.cur_page_no = next_page_no;
            self.file.cur_dirty = false;
            self.file.cur_rec = None;
            tmp_rid = None;
        }
    }

    /// Bytes of the record under the cursor. No pin changes.
    pub fn get_record(&self) -> Result<Vec<u8>, HeapError> {
        let rid = self.file.cur_rec.ok_or(HeapError::NoCurrentRecord)?;
        let page_ptr = self.file.cur_page.as_ref().ok_or(HeapError::NoCurrentPage)?;

        let page = page_ptr.read();
        Ok(self.file.page_manager.get_record(&page, rid.slot_no)?)
    }

    /// Delete the record under the cursor. The cursor is not repositioned;
    /// the next `scan_next` advances past the tombstoned slot.
    pub fn delete_record(&mut self) -> Result<(), HeapError> {
        let rid = self.file.cur_rec.ok_or(HeapError::NoCurrentRecord)?;
        let page_ptr = self
            .file
            .cur_page
            .clone()
            .ok_or(HeapError::NoCurrentPage)?;

        {
            let mut page = page_ptr.write();
            self.file.page_manager.delete_record(&mut page, rid.slot_no)?;
        }

        self.file.cur_dirty = true;
        self.file.update_header(|header| header.rec_cnt -= 1);
        Ok(())
    }

    /// Mark the page under the cursor dirty.
    pub fn mark_dirty(&mut self) {
        self.file.cur_dirty = true;
    }

    fn matches(&self, record: &[u8]) -> bool {
        match &self.filter {
            None => true, // no filtering requested
            Some(predicate) => predicate.matches(record),
        }
    }
}

impl Drop for HeapFileScan {
    fn drop(&mut self) {
        if let Err(e) = self.end_scan() {
            warn!("error ending scan: {}", e);
        }
    }
}
