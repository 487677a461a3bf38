use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::common::types::{FileId, Page, PageId, PAGE_SIZE};

const INVALID_PAGE_ID: PageId = 0;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("file already exists: {0}")]
    AlreadyExists(String),
    #[error("unknown file id: {0}")]
    UnknownFile(FileId),
    #[error("invalid page ID: {0}")]
    InvalidPageId(PageId),
    #[error("page {1} is beyond the end of file {0}")]
    PageOutOfBounds(FileId, PageId),
    #[error("file {0} has no pages")]
    EmptyFile(FileId),
}

struct OpenFile {
    file: Mutex<File>,
    path: PathBuf,
    ref_count: Mutex<u32>,
}

/// FileManager maps page numbers of named files to disk blocks. It owns every
/// open file handle; callers address files through the FileId returned by
/// `open_file`. Opening a path that is already open returns the existing
/// FileId with its reference count bumped, so every handle on a file shares
/// one identity (and therefore one set of buffer-pool frames).
pub struct FileManager {
    open_files: RwLock<HashMap<FileId, Arc<OpenFile>>>,
    by_path: RwLock<HashMap<PathBuf, FileId>>,
    next_file_id: Mutex<FileId>,
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FileManager {
    pub fn new() -> Self {
        Self {
            open_files: RwLock::new(HashMap::new()),
            by_path: RwLock::new(HashMap::new()),
            next_file_id: Mutex::new(1),
        }
    }

    /// Create a new, empty file. Fails if the file already exists.
    pub fn create_file(&self, path: impl AsRef<Path>) -> Result<(), FileError> {
        let path = path.as_ref();
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(FileError::AlreadyExists(path.display().to_string()))
            }
            Err(e) => Err(FileError::IoError(e)),
        }
    }

    /// Remove a file from disk. The caller must ensure it is not open.
    pub fn destroy_file(&self, path: impl AsRef<Path>) -> Result<(), FileError> {
        fs::remove_file(path).map_err(FileError::IoError)
    }

    /// Open an existing file read/write. A path that is already open hands
    /// back its existing FileId with the reference count bumped.
    pub fn open_file(&self, path: impl AsRef<Path>) -> Result<FileId, FileError> {
        let path = fs::canonicalize(path).map_err(FileError::IoError)?;

        if let Some(&file_id) = self.by_path.read().get(&path) {
            if let Some(entry) = self.open_files.read().get(&file_id) {
                *entry.ref_count.lock() += 1;
                return Ok(file_id);
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(FileError::IoError)?;

        let file_id = {
            let mut next = self.next_file_id.lock();
            let id = *next;
            *next += 1;
            id
        };

        self.open_files.write().insert(
            file_id,
            Arc::new(OpenFile {
                file: Mutex::new(file),
                path: path.clone(),
                ref_count: Mutex::new(1),
            }),
        );
        self.by_path.write().insert(path, file_id);

        Ok(file_id)
    }

    /// Drop one reference to an open file; the handle closes when the last
    /// reference goes away.
    pub fn close_file(&self, file_id: FileId) -> Result<(), FileError> {
        let entry = self.entry(file_id)?;

        let last = {
            let mut refs = entry.ref_count.lock();
            *refs = refs.saturating_sub(1);
            *refs == 0
        };

        if last {
            self.open_files.write().remove(&file_id);
            self.by_path.write().remove(&entry.path);
        }

        Ok(())
    }

    /// Page number of the first page of the file. Page numbers are 1-based;
    /// a zero-length file has no pages.
    pub fn first_page(&self, file_id: FileId) -> Result<PageId, FileError> {
        let entry = self.entry(file_id)?;
        let len = entry.file.lock().metadata().map_err(FileError::IoError)?.len();
        if len < PAGE_SIZE as u64 {
            return Err(FileError::EmptyFile(file_id));
        }
        Ok(1)
    }

    /// Read a page from disk into the supplied buffer.
    pub fn read_page(
        &self,
        file_id: FileId,
        page_id: PageId,
        page: &mut Page,
    ) -> Result<(), FileError> {
        if page_id == INVALID_PAGE_ID {
            return Err(FileError::InvalidPageId(page_id));
        }

        let entry = self.entry(file_id)?;
        let offset = Self::page_offset(page_id);
        let mut buffer = [0u8; PAGE_SIZE];

        {
            let mut file = entry.file.lock();

            let file_size = file.metadata().map_err(FileError::IoError)?.len();
            if offset as u64 + PAGE_SIZE as u64 > file_size {
                return Err(FileError::PageOutOfBounds(file_id, page_id));
            }

            file.seek(SeekFrom::Start(offset as u64))
                .map_err(FileError::IoError)?;
            file.read_exact(&mut buffer).map_err(FileError::IoError)?;
        }

        page.data.copy_from_slice(&buffer);
        page.page_id = page_id;

        Ok(())
    }

    /// Write a page to disk.
    pub fn write_page(&self, file_id: FileId, page: &Page) -> Result<(), FileError> {
        if page.page_id == INVALID_PAGE_ID {
            return Err(FileError::InvalidPageId(page.page_id));
        }

        let entry = self.entry(file_id)?;
        let offset = Self::page_offset(page.page_id);

        let mut file = entry.file.lock();
        file.seek(SeekFrom::Start(offset as u64))
            .map_err(FileError::IoError)?;
        file.write_all(&page.data).map_err(FileError::IoError)?;
        file.flush().map_err(FileError::IoError)?;

        Ok(())
    }

    /// Extend the file by one zeroed page and return its ID.
    pub fn allocate_page(&self, file_id: FileId) -> Result<PageId, FileError> {
        let entry = self.entry(file_id)?;
        let mut file = entry.file.lock();

        let file_size = file.metadata().map_err(FileError::IoError)?.len();

        // First page is 1, not 0
        let new_page_id = (file_size / PAGE_SIZE as u64) as PageId + 1;

        file.seek(SeekFrom::End(0)).map_err(FileError::IoError)?;
        let zeros = [0u8; PAGE_SIZE];
        file.write_all(&zeros).map_err(FileError::IoError)?;
        file.flush().map_err(FileError::IoError)?;

        Ok(new_page_id)
    }

    fn entry(&self, file_id: FileId) -> Result<Arc<OpenFile>, FileError> {
        self.open_files
            .read()
            .get(&file_id)
            .cloned()
            .ok_or(FileError::UnknownFile(file_id))
    }

    fn page_offset(page_id: PageId) -> usize {
        (page_id as usize - 1) * PAGE_SIZE
    }
}
