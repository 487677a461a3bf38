use std::path::Path;
use std::sync::Arc;

use crate::common::types::Rid;
use crate::storage::buffer::BufferPoolManager;
use crate::storage::heap::error::HeapError;
use crate::storage::heap::file::HeapFile;
use crate::storage::page::{PageError, MAX_RECORD_SIZE};

/// Append-only insertion handle. Inserts go to the last page of the chain,
/// growing it by one page whenever the last page fills.
pub struct InsertFileScan {
    file: HeapFile,
}

impl InsertFileScan {
    pub fn open(
        buffer_pool: Arc<BufferPoolManager>,
        path: impl AsRef<Path>,
    ) -> Result<Self, HeapError> {
        let file = HeapFile::open(buffer_pool, path)?;
        Ok(Self { file })
    }

    pub fn rec_cnt(&self) -> u32 {
        self.file.rec_cnt()
    }

    pub fn page_cnt(&self) -> u32 {
        self.file.page_cnt()
    }

    /// Insert a record, returning its RID.
    pub fn insert_record(&mut self, data: &[u8]) -> Result<Rid, HeapError> {
        // A record larger than an empty page will never fit anywhere
        if data.len() > MAX_RECORD_SIZE {
            return Err(HeapError::InvalidRecordLength(data.len()));
        }

        let file_id = self.file.file_id;

        // Insertion happens on the last page of the chain
        if self.file.cur_page.is_none() || self.file.cur_page_no != self.file.header.last_page {
            if self.file.cur_page.take().is_some() {
                self.file
                    .buffer_pool
                    .unpin_page(file_id, self.file.cur_page_no, self.file.cur_dirty)?;
            }

            let last_page_no = self.file.header.last_page;
            let page = self.file.buffer_pool.fetch_page(file_id, last_page_no)?;
            self.file.cur_page = Some(page);
            self.file.cur_page_no = last_page_no;
            self.file.cur_dirty = false;
        }

        let page_ptr = self
            .file
            .cur_page
            .clone()
            .ok_or(HeapError::NoCurrentPage)?;

        let insert_status = {
            let mut page = page_ptr.write();
            self.file.page_manager.insert_record(&mut page, data)
        };

        let rid = match insert_status {
            Ok(slot_no) => Rid {
                page_no: self.file.cur_page_no,
                slot_no,
            },
            Err(PageError::InsufficientSpace) => self.grow_and_insert(data)?,
            Err(e) => return Err(e.into()),
        };

        self.file.update_header(|header| header.rec_cnt += 1);
        self.file.cur_rec = Some(rid);
        self.file.cur_dirty = true;

        Ok(rid)
    }

    /// Grow the chain by one page and insert into it. The new page is
    /// allocated while the old last page is still pinned, so the chain link
    /// can be written before the old page is released; both the link write
    /// and the header update happen inside this call.
    fn grow_and_insert(&mut self, data: &[u8]) -> Result<Rid, HeapError> {
        let file_id = self.file.file_id;

        let (new_page, new_page_no) = self.file.buffer_pool.alloc_page(file_id)?;
        {
            let mut page = new_page.write();
            self.file.page_manager.init_page(&mut page);
        }

        if let Some(old_last) = self.file.cur_page.take() {
            {
                let mut page = old_last.write();
                self.file
                    .page_manager
                    .set_next_page(&mut page, Some(new_page_no));
            }
            self.file
                .buffer_pool
                .unpin_page(file_id, self.file.cur_page_no, true)?;
        }

        self.file.update_header(|header| {
            header.last_page = new_page_no;
            header.page_cnt += 1;
        });

        self.file.cur_page = Some(new_page.clone());
        self.file.cur_page_no = new_page_no;
        self.file.cur_dirty = true;
        self.file.cur_rec = None;

        // Must succeed: the record fits on an empty page by the size check
        let slot_no = {
            let mut page = new_page.write();
            self.file.page_manager.insert_record(&mut page, data)?
        };

        Ok(Rid {
            page_no: new_page_no,
            slot_no,
        })
    }
}

impl Drop for InsertFileScan {
    fn drop(&mut self) {
        // Insertion always dirties the page it leaves pinned; the base
        // handle performs the actual unpin with this flag.
        if self.file.cur_page.is_some() {
            self.file.cur_dirty = true;
        }
    }
}
