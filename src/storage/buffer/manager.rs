use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use parking_lot::RwLock;

use crate::common::types::{FileId, Frame, FrameId, FramePtr, Page, PageId, PagePtr};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::replacer::LRUReplacer;
use crate::storage::disk::FileManager;

const INVALID_PAGE_ID: PageId = 0;

/// Buffer pool shared by every open file: the page table is keyed by
/// (FileId, PageId), so pin counts from different handles on the same page
/// are additive.
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<FramePtr>,
    page_table: RwLock<HashMap<(FileId, PageId), FrameId>>,
    free_list: RwLock<VecDeque<FrameId>>,
    replacer: RwLock<LRUReplacer>,
    file_manager: Arc<FileManager>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, file_manager: Arc<FileManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for i in 0..pool_size {
            let frame_id = i as FrameId;
            let frame = Frame::new(frame_id, Arc::new(RwLock::new(Page::new(INVALID_PAGE_ID))));
            frames.push(Arc::new(RwLock::new(frame)));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            frames,
            page_table: RwLock::new(HashMap::new()),
            free_list: RwLock::new(free_list),
            replacer: RwLock::new(LRUReplacer::new(pool_size)),
            file_manager,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn file_manager(&self) -> &Arc<FileManager> {
        &self.file_manager
    }

    /// Pin an existing page, reading it from disk if it is not resident.
    pub fn fetch_page(&self, file_id: FileId, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidOperation(
                "Cannot fetch invalid page ID".to_string(),
            ));
        }

        // Check if the page is already in the buffer pool
        if let Some(&frame_id) = self.page_table.read().get(&(file_id, page_id)) {
            let frame = &self.frames[frame_id as usize];

            {
                let mut frame_guard = frame.write();
                frame_guard.pin_count += 1;
            }

            self.replacer.write().record_access(frame_id);

            let frame_guard = frame.read();
            return Ok(frame_guard.page.clone());
        }

        // Page not resident: claim a frame and read from disk
        let frame_id = self.allocate_frame()?;
        self.write_back_if_dirty(frame_id)?;

        let mut new_page = Page::new(page_id);
        self.file_manager.read_page(file_id, page_id, &mut new_page)?;

        self.install_page(frame_id, file_id, new_page, false);

        self.page_table.write().insert((file_id, page_id), frame_id);
        self.replacer.write().record_access(frame_id);

        let frame_guard = self.frames[frame_id as usize].read();
        Ok(frame_guard.page.clone())
    }

    /// Allocate a fresh page at the end of the file and pin it. The page
    /// buffer is zeroed; the caller is responsible for initializing its
    /// layout. The new page is not linked into any page chain.
    pub fn alloc_page(&self, file_id: FileId) -> Result<(PagePtr, PageId), BufferPoolError> {
        let page_id = self.file_manager.allocate_page(file_id)?;

        let frame_id = self.allocate_frame()?;
        self.write_back_if_dirty(frame_id)?;

        self.install_page(frame_id, file_id, Page::new(page_id), true);

        self.page_table.write().insert((file_id, page_id), frame_id);
        self.replacer.write().record_access(frame_id);

        let frame_guard = self.frames[frame_id as usize].read();
        Ok((frame_guard.page.clone(), page_id))
    }

    /// Unpin a page, optionally marking it dirty for eventual write-back.
    pub fn unpin_page(
        &self,
        file_id: FileId,
        page_id: PageId,
        is_dirty: bool,
    ) -> Result<(), BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidOperation(
                "Cannot unpin invalid page ID".to_string(),
            ));
        }

        let frame_id = {
            let page_table = self.page_table.read();
            match page_table.get(&(file_id, page_id)) {
                Some(&id) => id,
                None => return Err(BufferPoolError::PageNotFound(file_id, page_id)),
            }
        };

        let pin_count = {
            let frame = &self.frames[frame_id as usize];
            let mut frame_guard = frame.write();

            if frame_guard.pin_count > 0 {
                frame_guard.pin_count -= 1;
            }

            if is_dirty {
                frame_guard.is_dirty = true;
            }

            frame_guard.pin_count
        };

        // Fully unpinned frames become replacement candidates
        if pin_count == 0 {
            self.replacer.write().record_access(frame_id);
        }

        Ok(())
    }

    /// Write a specific page through to disk if it is dirty.
    pub fn flush_page(&self, file_id: FileId, page_id: PageId) -> Result<(), BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidOperation(
                "Cannot flush invalid page ID".to_string(),
            ));
        }

        let frame_id = {
            let page_table = self.page_table.read();
            match page_table.get(&(file_id, page_id)) {
                Some(&id) => id,
                None => return Err(BufferPoolError::PageNotFound(file_id, page_id)),
            }
        };

        let frame = &self.frames[frame_id as usize];
        let (needs_flush, page_copy) = {
            let frame_guard = frame.read();
            if frame_guard.is_dirty {
                (true, frame_guard.page.read().clone())
            } else {
                (false, Page::new(INVALID_PAGE_ID))
            }
        };

        if needs_flush {
            self.file_manager.write_page(file_id, &page_copy)?;

            let mut frame_guard = frame.write();
            frame_guard.is_dirty = false;
        }

        Ok(())
    }

    /// Write back every dirty page of the file and evict all of its pages
    /// from the pool. Fails with `PagePinned` if any page of the file is
    /// still pinned. Called before the file is closed, so a later reopen
    /// under a fresh FileId cannot observe stale frames.
    pub fn flush_file(&self, file_id: FileId) -> Result<(), BufferPoolError> {
        let entries: Vec<(PageId, FrameId)> = {
            let page_table = self.page_table.read();
            page_table
                .iter()
                .filter(|((fid, _), _)| *fid == file_id)
                .map(|((_, page_id), &frame_id)| (*page_id, frame_id))
                .collect()
        };

        for (page_id, frame_id) in &entries {
            let frame_guard = self.frames[*frame_id as usize].read();
            if frame_guard.pin_count > 0 {
                return Err(BufferPoolError::PagePinned(*page_id));
            }
        }

        for (page_id, frame_id) in entries {
            let frame = &self.frames[frame_id as usize];

            let (needs_flush, page_copy) = {
                let frame_guard = frame.read();
                if frame_guard.is_dirty {
                    (true, frame_guard.page.read().clone())
                } else {
                    (false, Page::new(INVALID_PAGE_ID))
                }
            };
            if needs_flush {
                self.file_manager.write_page(file_id, &page_copy)?;
            }

            self.page_table.write().remove(&(file_id, page_id));

            {
                let mut frame_guard = frame.write();
                {
                    let mut page_guard = frame_guard.page.write();
                    *page_guard = Page::new(INVALID_PAGE_ID);
                }
                frame_guard.is_dirty = false;
                frame_guard.pin_count = 0;
                frame_guard.file_id = 0;
            }

            self.replacer.write().remove(frame_id);
            self.free_list.write().push_back(frame_id);
        }

        Ok(())
    }

    /// Claim a frame, either from the free list or by evicting the LRU
    /// unpinned victim. Pinned frames are skipped and requeued, so a page
    /// held across calls (a heap file's header) never blocks replacement
    /// while unpinned frames remain. The victim's page-table entry is
    /// removed here; its content may still need write-back (see
    /// `write_back_if_dirty`).
    fn allocate_frame(&self) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = self.free_list.write().pop_front() {
            return Ok(frame_id);
        }

        let victim_id = {
            let mut replacer = self.replacer.write();
            let mut pinned = Vec::new();
            let victim = loop {
                match replacer.victim() {
                    Some(id) => {
                        let pin_count = self.frames[id as usize].read().pin_count;
                        if pin_count > 0 {
                            pinned.push(id);
                            continue;
                        }
                        break Some(id);
                    }
                    None => break None,
                }
            };
            for id in pinned {
                replacer.record_access(id);
            }
            victim
        };

        if let Some(victim_id) = victim_id {
            let frame = &self.frames[victim_id as usize];

            let (file_id, page_id) = {
                let frame_guard = frame.read();
                let page_guard = frame_guard.page.read();
                (frame_guard.file_id, page_guard.page_id)
            };

            if page_id != INVALID_PAGE_ID {
                self.page_table.write().remove(&(file_id, page_id));
            }

            return Ok(victim_id);
        }

        // All frames are pinned
        Err(BufferPoolError::BufferPoolFull)
    }

    /// Write the frame's previous occupant back to its file if dirty.
    fn write_back_if_dirty(&self, frame_id: FrameId) -> Result<(), BufferPoolError> {
        let frame = &self.frames[frame_id as usize];

        let (dirty, file_id, page_copy) = {
            let frame_guard = frame.read();
            if frame_guard.is_dirty {
                (true, frame_guard.file_id, frame_guard.page.read().clone())
            } else {
                (false, 0, Page::new(INVALID_PAGE_ID))
            }
        };

        if dirty {
            self.file_manager.write_page(file_id, &page_copy)?;
        }

        Ok(())
    }

    /// Put a page into the frame, pinned once.
    fn install_page(&self, frame_id: FrameId, file_id: FileId, page: Page, dirty: bool) {
        let frame = &self.frames[frame_id as usize];
        let mut frame_guard = frame.write();

        {
            let mut page_guard = frame_guard.page.write();
            *page_guard = page;
        }

        frame_guard.pin_count = 1;
        frame_guard.is_dirty = dirty;
        frame_guard.file_id = file_id;
    }
}
