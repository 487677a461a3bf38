use std::path::Path;
use std::sync::Arc;
use log::error;

use crate::common::types::{FileId, PageId, PagePtr, Rid};
use crate::storage::buffer::{BufferPoolError, BufferPoolManager};
use crate::storage::heap::error::HeapError;
use crate::storage::heap::file_header::{FileHeader, FILE_HEADER_SIZE, MAX_NAME_SIZE};
use crate::storage::page::PageManager;

/// Create a heap file on disk: a header page followed by one empty data
/// page, which is both the first and last page of the chain.
pub fn create_heap_file(
    buffer_pool: &Arc<BufferPoolManager>,
    path: impl AsRef<Path>,
) -> Result<(), HeapError> {
    let path = path.as_ref();
    let name = stored_name(path)?;

    let file_manager = buffer_pool.file_manager();

    // An existing file is a precondition failure, not an open error. The
    // probing handle is closed before reporting it.
    if let Ok(file_id) = file_manager.open_file(path) {
        file_manager.close_file(file_id)?;
        return Err(HeapError::FileExists(name));
    }

    file_manager.create_file(path)?;
    let file_id = file_manager.open_file(path)?;

    let page_manager = PageManager::new();

    let (header_page, header_page_no) = buffer_pool.alloc_page(file_id)?;
    let (data_page, data_page_no) = buffer_pool.alloc_page(file_id)?;

    {
        let mut page = data_page.write();
        page_manager.init_page(&mut page);
    }

    let header = FileHeader::new(&name, data_page_no);
    {
        let mut page = header_page.write();
        let bytes = header.to_bytes();
        page.data[..FILE_HEADER_SIZE].copy_from_slice(&bytes);
    }

    buffer_pool.unpin_page(file_id, data_page_no, true)?;
    buffer_pool.unpin_page(file_id, header_page_no, true)?;

    buffer_pool.flush_file(file_id)?;
    file_manager.close_file(file_id)?;

    Ok(())
}

/// Remove a heap file from disk. The caller must ensure no handle is open.
pub fn destroy_heap_file(
    buffer_pool: &Arc<BufferPoolManager>,
    path: impl AsRef<Path>,
) -> Result<(), HeapError> {
    buffer_pool
        .file_manager()
        .destroy_file(path)
        .map_err(HeapError::from)
}

fn stored_name(path: &Path) -> Result<String, HeapError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.len() > MAX_NAME_SIZE - 1 {
        return Err(HeapError::BadFile(name));
    }
    Ok(name)
}

/// An open heap file. Owns the file handle, the pinned header page, and at
/// most one pinned data page (the "current" page). Scans and insertion wrap
/// this base state.
pub struct HeapFile {
    pub(crate) buffer_pool: Arc<BufferPoolManager>,
    pub(crate) page_manager: PageManager,
    pub(crate) file_id: FileId,
    pub(crate) header: FileHeader,
    pub(crate) header_page: PagePtr,
    pub(crate) header_page_no: PageId,
    pub(crate) hdr_dirty: bool,
    pub(crate) cur_page: Option<PagePtr>,
    pub(crate) cur_page_no: PageId,
    pub(crate) cur_dirty: bool,
    pub(crate) cur_rec: Option<Rid>,
}

impl HeapFile {
    /// Open an existing heap file: pin its header page, then pin the first
    /// data page as the current page with the cursor before the first
    /// record.
    pub fn open(
        buffer_pool: Arc<BufferPoolManager>,
        path: impl AsRef<Path>,
    ) -> Result<Self, HeapError> {
        let file_manager = buffer_pool.file_manager().clone();
        let file_id = file_manager.open_file(path)?;

        let header_page_no = match file_manager.first_page(file_id) {
            Ok(page_no) => page_no,
            Err(e) => {
                error!("unable to locate the header page: {}", e);
                let _ = file_manager.close_file(file_id);
                return Err(e.into());
            }
        };

        let header_page = match buffer_pool.fetch_page(file_id, header_page_no) {
            Ok(page) => page,
            Err(e) => {
                error!("unable to read the header page: {}", e);
                let _ = file_manager.close_file(file_id);
                return Err(e.into());
            }
        };

        let header = {
            let page = header_page.read();
            FileHeader::from_bytes(&page.data[..FILE_HEADER_SIZE])
        };

        let cur_page = match buffer_pool.fetch_page(file_id, header.first_page) {
            Ok(page) => page,
            Err(e) => {
                error!("unable to read the first data page: {}", e);
                let _ = buffer_pool.unpin_page(file_id, header_page_no, false);
                let _ = file_manager.close_file(file_id);
                return Err(e.into());
            }
        };

        let cur_page_no = header.first_page;
        Ok(Self {
            buffer_pool,
            page_manager: PageManager::new(),
            file_id,
            header,
            header_page,
            header_page_no,
            hdr_dirty: false,
            cur_page: Some(cur_page),
            cur_page_no,
            cur_dirty: false,
            cur_rec: None,
        })
    }

    /// Number of live records in the file.
    pub fn rec_cnt(&self) -> u32 {
        self.header.rec_cnt
    }

    /// Number of pages in the file, header page included.
    pub fn page_cnt(&self) -> u32 {
        self.header.page_cnt
    }

    /// Fetch the record with the given RID. If the record is not on the
    /// current page, the current page is unpinned and the record's page is
    /// pinned in its place.
    pub fn get_record(&mut self, rid: Rid) -> Result<Vec<u8>, HeapError> {
        if self.cur_page.is_none() || rid.page_no != self.cur_page_no {
            if self.cur_page.take().is_some() {
                self.buffer_pool
                    .unpin_page(self.file_id, self.cur_page_no, self.cur_dirty)?;
            }

            let page = self.buffer_pool.fetch_page(self.file_id, rid.page_no)?;
            self.cur_page = Some(page);
            self.cur_page_no = rid.page_no;
            self.cur_dirty = false;
            self.cur_rec = None;
        }

        let page_ptr = self.cur_page.as_ref().ok_or(HeapError::NoCurrentPage)?;
        let record = {
            let page = page_ptr.read();
            self.page_manager.get_record(&page, rid.slot_no)?
        };

        self.cur_rec = Some(rid);
        Ok(record)
    }

    /// Apply a mutation to the file header, re-encoding it into the pinned
    /// header frame so write-back always sees current bytes.
    pub(crate) fn update_header<F: FnOnce(&mut FileHeader)>(&mut self, mutate: F) {
        mutate(&mut self.header);

        let mut page = self.header_page.write();
        let bytes = self.header.to_bytes();
        page.data[..FILE_HEADER_SIZE].copy_from_slice(&bytes);
        self.hdr_dirty = true;
    }
}

impl Drop for HeapFile {
    fn drop(&mut self) {
        if self.cur_page.take().is_some() {
            if let Err(e) =
                self.buffer_pool
                    .unpin_page(self.file_id, self.cur_page_no, self.cur_dirty)
            {
                error!(
                    "error unpinning data page {} of {}: {}",
                    self.cur_page_no,
                    self.header.name(),
                    e
                );
            }
        }

        if let Err(e) =
            self.buffer_pool
                .unpin_page(self.file_id, self.header_page_no, self.hdr_dirty)
        {
            error!(
                "error unpinning header page of {}: {}",
                self.header.name(),
                e
            );
        }

        // Write-back must happen while the file handle is still registered
        match self.buffer_pool.flush_file(self.file_id) {
            Ok(()) => {}
            // Another handle still holds pages of this file; it flushes
            Err(BufferPoolError::PagePinned(_)) => {}
            Err(e) => error!("error flushing {}: {}", self.header.name(), e),
        }

        if let Err(e) = self.buffer_pool.file_manager().close_file(self.file_id) {
            error!("error closing {}: {}", self.header.name(), e);
        }
    }
}
