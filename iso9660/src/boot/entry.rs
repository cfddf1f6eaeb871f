//! Boot catalog section entry

use crate::utils::bytes::{le_u16, le_u32};

/// Section entry size
pub const ENTRY_SIZE: usize = 32;

/// Bootable indicator
pub const BOOTABLE: u8 = 0x88;

/// Boot Catalog section entry (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionEntry {
    /// Boot indicator (0x88 = bootable, 0x00 = not bootable)
    pub boot_indicator: u8,

    /// Boot media type
    pub boot_media_type: u8,

    /// Load segment
    pub load_segment: u16,

    /// System type (partition type from MBR)
    pub system_type: u8,

    /// Unused byte, must be zero
    pub unused: u8,

    /// Sector count (virtual sectors, 512 bytes each)
    pub sector_count: u16,

    /// Load RBA (ISO sector, 2048 bytes)
    pub load_rba: u32,
}

impl SectionEntry {
    /// Parse one entry
    pub fn parse(data: &[u8]) -> Self {
        Self {
            boot_indicator: data[0],
            boot_media_type: data[1],
            load_segment: le_u16(&data[2..4]),
            system_type: data[4],
            unused: data[5],
            sector_count: le_u16(&data[6..8]),
            load_rba: le_u32(&data[8..12]),
        }
    }

    /// Is this entry bootable?
    pub fn is_bootable(&self) -> bool {
        self.boot_indicator == BOOTABLE
    }

    /// Fields are plausible for an s390 image (the image itself is checked separately)
    pub fn is_well_formed(&self) -> bool {
        self.unused == 0 && self.sector_count != 0
    }
}
