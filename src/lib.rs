// Export public modules
pub mod common;
pub mod storage;

// Re-export key items for convenient access
pub use storage::buffer::BufferPoolManager;
pub use storage::buffer::BufferPoolError;
pub use storage::disk::FileManager;
pub use storage::disk::FileError;
pub use storage::page::PageManager;
pub use storage::page::PageError;
pub use storage::heap::{
    create_heap_file, destroy_heap_file, CompOp, Datatype, HeapError, HeapFile, HeapFileScan,
    InsertFileScan, Predicate,
};
