use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;
use tempfile::TempDir;

use heapstore::common::types::FileId;
use heapstore::storage::buffer::BufferPoolManager;
use heapstore::storage::disk::FileManager;

// Create a buffer pool backed by a temporary directory for testing
#[allow(dead_code)]
pub fn create_test_buffer_pool(pool_size: usize) -> Result<(Arc<BufferPoolManager>, TempDir)> {
    let dir = TempDir::new()?;
    let file_manager = Arc::new(FileManager::new());
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, file_manager));
    Ok((buffer_pool, dir))
}

// Create and open a scratch file inside the test directory
#[allow(dead_code)]
pub fn open_scratch_file(
    buffer_pool: &Arc<BufferPoolManager>,
    dir: &TempDir,
    name: &str,
) -> Result<(FileId, PathBuf)> {
    let path = dir.path().join(name);
    let file_manager = buffer_pool.file_manager();
    file_manager.create_file(&path)?;
    let file_id = file_manager.open_file(&path)?;
    Ok((file_id, path))
}

// Generate test data of specified size
#[allow(dead_code)]
pub fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

// A record carrying a little-endian i32 key at offset 0, padded to `len`
#[allow(dead_code)]
pub fn record_with_key(key: i32, len: usize) -> Vec<u8> {
    let mut data = vec![0xABu8; len];
    data[0..4].copy_from_slice(&key.to_le_bytes());
    data
}
