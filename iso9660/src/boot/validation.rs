//! Boot catalog validation entry
//!
//! The first 32 bytes of the catalog. The checksum word is not verified;
//! firmware in the field boots catalogs with a stale checksum.

use crate::types::BootPlatform;

/// Validation entry size
pub const ENTRY_SIZE: usize = 32;

/// Header ID constant
pub const HEADER_ID: u8 = 0x01;

/// Key bytes constant
pub const KEY_BYTES: [u8; 2] = [0x55, 0xAA];

/// Validate the catalog's first entry and return its platform
pub fn parse(data: &[u8]) -> Option<BootPlatform> {
    if data.len() < ENTRY_SIZE || data[0] != HEADER_ID {
        return None;
    }
    // Reserved word at bytes 2..4
    if data[2] != 0 || data[3] != 0 {
        return None;
    }
    if data[30..32] != KEY_BYTES {
        return None;
    }
    BootPlatform::from_id(data[1])
}
