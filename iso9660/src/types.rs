//! Common types and constants for ISO9660

/// ISO9660 sector size (always 2048 bytes)
pub const SECTOR_SIZE: usize = 2048;

/// Volume descriptor set starts at sector 16
pub const VOLUME_DESCRIPTOR_START: u64 = 16;

/// Maximum directory depth
pub const MAX_DIRECTORY_DEPTH: usize = 8;

/// Byte offset of the first volume descriptor's standard identifier
///
/// Lets callers probe a device for `CD001` without knowing its block size.
pub const SIGNATURE_OFFSET: u64 = VOLUME_DESCRIPTOR_START * SECTOR_SIZE as u64 + 1;

/// Volume descriptor type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VolumeDescriptorType {
    /// Boot Record (El Torito)
    BootRecord = 0,
    /// Primary Volume Descriptor
    Primary = 1,
    /// Supplementary Volume Descriptor (Joliet)
    Supplementary = 2,
    /// Volume Partition Descriptor
    Partition = 3,
    /// Volume Descriptor Set Terminator
    Terminator = 255,
}

/// Parsed volume information
#[derive(Debug, Clone)]
pub struct VolumeInfo {
    /// Volume identifier (32 chars)
    pub volume_id: [u8; 32],

    /// Root directory extent location (LBA)
    pub root_extent_lba: u32,

    /// Root directory extent length (bytes)
    pub root_extent_len: u32,

    /// Logical block size (usually 2048)
    pub logical_block_size: u16,

    /// Volume space size (total sectors)
    pub volume_space_size: u32,

    /// El Torito boot catalog LBA (if present)
    pub boot_catalog_lba: Option<u32>,
}

/// One El Torito section entry that is bootable on s390
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootCatalogEntry {
    /// Platform ID from the catalog's validation entry
    pub platform: BootPlatform,

    /// Image start (ISO sector)
    pub load_rba: u32,

    /// Image length in 512-byte virtual sectors
    pub sector_count: u16,

    /// Load address (used verbatim, not as an x86 segment)
    pub load_segment: u16,

    /// Bootable indicator set and the image carries the s390 Linux signature
    pub is_bootable_and_compatible: bool,
}

impl BootCatalogEntry {
    /// Image length in ISO sectors as declared by the catalog
    ///
    /// The catalog counts 512-byte units and writers pad the image, so this
    /// may overstate the real file size.
    pub fn nominal_sectors(&self) -> u32 {
        (self.sector_count as u32).div_ceil((SECTOR_SIZE / 512) as u32)
    }
}

/// Boot platform ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BootPlatform {
    /// x86 PC
    X86 = 0,
    /// PowerPC
    PowerPC = 1,
    /// Mac
    Mac = 2,
}
