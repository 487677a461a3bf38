use byteorder::{ByteOrder, LittleEndian};
use crate::common::types::PageId;

/// Longest stored file name, including the implied terminator.
pub const MAX_NAME_SIZE: usize = 32;

/// Encoded size of the header structure at the front of the header page.
pub const FILE_HEADER_SIZE: usize = MAX_NAME_SIZE + 16;

/// Metadata page at the head of a heap file. `first_page`/`last_page`
/// bracket the data-page chain; `page_cnt` counts the header page plus all
/// data pages; `rec_cnt` counts live records across the whole file.
#[derive(Debug, Clone, Copy)]
pub struct FileHeader {
    pub file_name: [u8; MAX_NAME_SIZE],
    pub first_page: PageId,
    pub last_page: PageId,
    pub page_cnt: u32,
    pub rec_cnt: u32,
}

impl FileHeader {
    /// Header for a freshly created file whose chain is the single empty
    /// data page `data_page`.
    pub fn new(name: &str, data_page: PageId) -> Self {
        let mut file_name = [0u8; MAX_NAME_SIZE];
        let bytes = name.as_bytes();
        file_name[..bytes.len()].copy_from_slice(bytes);

        Self {
            file_name,
            first_page: data_page,
            last_page: data_page,
            page_cnt: 2, // header page + the initial data page
            rec_cnt: 0,
        }
    }

    /// Stored file name, for diagnostics.
    pub fn name(&self) -> String {
        let end = self
            .file_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_NAME_SIZE);
        String::from_utf8_lossy(&self.file_name[..end]).into_owned()
    }

    pub fn to_bytes(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut bytes = [0u8; FILE_HEADER_SIZE];

        bytes[0..MAX_NAME_SIZE].copy_from_slice(&self.file_name);
        LittleEndian::write_u32(&mut bytes[MAX_NAME_SIZE..MAX_NAME_SIZE + 4], self.first_page);
        LittleEndian::write_u32(
            &mut bytes[MAX_NAME_SIZE + 4..MAX_NAME_SIZE + 8],
            self.last_page,
        );
        LittleEndian::write_u32(
            &mut bytes[MAX_NAME_SIZE + 8..MAX_NAME_SIZE + 12],
            self.page_cnt,
        );
        LittleEndian::write_u32(
            &mut bytes[MAX_NAME_SIZE + 12..MAX_NAME_SIZE + 16],
            self.rec_cnt,
        );

        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut file_name = [0u8; MAX_NAME_SIZE];
        file_name.copy_from_slice(&bytes[0..MAX_NAME_SIZE]);

        let first_page = LittleEndian::read_u32(&bytes[MAX_NAME_SIZE..MAX_NAME_SIZE + 4]);
        let last_page = LittleEndian::read_u32(&bytes[MAX_NAME_SIZE + 4..MAX_NAME_SIZE + 8]);
        let page_cnt = LittleEndian::read_u32(&bytes[MAX_NAME_SIZE + 8..MAX_NAME_SIZE + 12]);
        let rec_cnt = LittleEndian::read_u32(&bytes[MAX_NAME_SIZE + 12..MAX_NAME_SIZE + 16]);

        Self {
            file_name,
            first_page,
            last_page,
            page_cnt,
            rec_cnt,
        }
    }
}
