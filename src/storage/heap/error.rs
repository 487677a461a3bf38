use thiserror::Error;
use crate::storage::buffer::BufferPoolError;
use crate::storage::disk::FileError;
use crate::storage::page::PageError;

#[derive(Error, Debug)]
pub enum HeapError {
    #[error("file name too long: {0}")]
    BadFile(String),

    #[error("heap file already exists: {0}")]
    FileExists(String),

    #[error("bad scan parameter")]
    BadScanParm,

    #[error("record length {0} exceeds page capacity")]
    InvalidRecordLength(usize),

    #[error("scan has no current record")]
    NoCurrentRecord,

    #[error("handle has no current page")]
    NoCurrentPage,

    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),

    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("File error: {0}")]
    File(#[from] FileError),
}
