use thiserror::Error;
use crate::common::types::{FileId, PageId};
use crate::storage::disk::FileError;

#[derive(Error, Debug)]
pub enum BufferPoolError {
    #[error("Page {1} of file {0} not found")]
    PageNotFound(FileId, PageId),

    #[error("Page {0} is pinned")]
    PagePinned(PageId),

    #[error("Buffer pool is full")]
    BufferPoolFull,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("File error: {0}")]
    FileError(#[from] FileError),
}
