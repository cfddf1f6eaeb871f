//! El Torito boot support
//!
//! Parsing boot catalogs and locating s390 boot images on ISO9660 volumes.

pub mod catalog;
pub mod entry;
pub mod platform;
pub mod validation;

pub use catalog::{read_boot_catalog, BootCatalog, LINUX_S390_MAGIC};

use crate::error::{Iso9660Error, Result};
use crate::types::{BootCatalogEntry, VolumeInfo};
use gpt_disk_io::BlockIo;

/// Find the boot image selected by `loadparm`
///
/// # Arguments
/// * `block_io` - Block device
/// * `volume` - Mounted volume
/// * `loadparm` - 1-based count of compatible entries (0 means first)
///
/// # Errors
/// * `NoBootRecord` - the volume has no El Torito boot record
/// * `InvalidBootCatalog` - the validation entry is corrupt
/// * `NoBootEntry` - fewer compatible entries than requested
pub fn find_boot_entry<B: BlockIo>(
    block_io: &mut B,
    volume: &VolumeInfo,
    loadparm: u32,
) -> Result<BootCatalogEntry> {
    let lba = volume.boot_catalog_lba.ok_or(Iso9660Error::NoBootRecord)?;
    read_boot_catalog(block_io, lba)?.select(loadparm)
}
