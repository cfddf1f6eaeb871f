//! El Torito Boot Record Volume Descriptor

use crate::types::VolumeDescriptorType;

/// Boot system identifier, NUL padded to 32 bytes
pub const EL_TORITO_ID: &[u8; 32] = b"EL TORITO SPECIFICATION\0\0\0\0\0\0\0\0\0";

/// Offset of the boot system identifier
const ID_OFFSET: usize = 7;

/// Offset of the catalog sector (32-bit LE)
const CATALOG_OFFSET: usize = 71;

/// Boot catalog sector, if this descriptor is an El Torito boot record
pub fn catalog_lba(data: &[u8]) -> Option<u32> {
    if data.len() < CATALOG_OFFSET + 4 || data[0] != VolumeDescriptorType::BootRecord as u8 {
        return None;
    }
    if &data[ID_OFFSET..ID_OFFSET + 32] != EL_TORITO_ID {
        return None;
    }
    let mut lba = [0u8; 4];
    lba.copy_from_slice(&data[CATALOG_OFFSET..CATALOG_OFFSET + 4]);
    Some(u32::from_le_bytes(lba))
}
