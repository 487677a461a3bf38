use byteorder::{ByteOrder, LittleEndian};
use crate::common::types::PAGE_SIZE;

pub const HEADER_SIZE: usize = 16; // 4 bytes per field * 4 fields
pub const SLOT_SIZE: usize = 8; // 4 bytes for offset + 4 bytes for length

/// Largest record that fits on an empty page: everything past the page
/// header minus the one slot entry the record needs.
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - HEADER_SIZE - SLOT_SIZE;

/// One slot directory entry. A length of zero marks a deleted record.
#[derive(Debug, Clone, Copy)]
pub struct RecordLocation {
    pub offset: u32,
    pub length: u32,
}

impl RecordLocation {
    pub fn to_bytes(&self) -> [u8; SLOT_SIZE] {
        let mut bytes = [0u8; SLOT_SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], self.offset);
        LittleEndian::write_u32(&mut bytes[4..8], self.length);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let offset = LittleEndian::read_u32(&bytes[0..4]);
        let length = LittleEndian::read_u32(&bytes[4..8]);
        Self { offset, length }
    }
}
