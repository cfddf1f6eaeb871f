//! Boot catalog parsing
//!
//! The catalog occupies one sector: a validation entry followed by up to
//! 63 entries. Bootable entries are only usable on s390 when the image they
//! point at starts with the Linux for s390 IPL record.

use crate::boot::{entry, validation};
use crate::error::{Iso9660Error, Result};
use crate::types::{BootCatalogEntry, BootPlatform, SECTOR_SIZE};
use alloc::vec;
use alloc::vec::Vec;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

/// Entries in one catalog sector, validation entry included
pub const ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / entry::ENTRY_SIZE;

/// IPL PSW and CCWs found at bytes 8..32 of an s390 Linux boot image
pub const LINUX_S390_MAGIC: [u8; 24] = [
    0x02, 0x00, 0x00, 0x18, 0x60, 0x00, 0x00, 0x50, 0x02, 0x00, 0x00, 0x68, 0x60, 0x00, 0x00, 0x50,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
];

/// Offset of `LINUX_S390_MAGIC` inside the image's first sector
const MAGIC_OFFSET: usize = 8;

/// Validated boot catalog
#[derive(Debug, Clone)]
pub struct BootCatalog {
    /// Platform from the validation entry
    pub platform: BootPlatform,

    /// Every bootable (0x88) entry, in catalog order
    pub entries: Vec<BootCatalogEntry>,
}

impl BootCatalog {
    /// Entries that can be booted on s390
    pub fn compatible(&self) -> impl Iterator<Item = &BootCatalogEntry> {
        self.entries.iter().filter(|e| e.is_bootable_and_compatible)
    }

    /// Pick an entry by loadparm
    ///
    /// The loadparm counts compatible entries from 1; 0 and 1 both select
    /// the first one.
    pub fn select(&self, loadparm: u32) -> Result<BootCatalogEntry> {
        let skip = loadparm.saturating_sub(1) as usize;
        self.compatible()
            .nth(skip)
            .copied()
            .ok_or(Iso9660Error::NoBootEntry)
    }
}

/// Read and validate the catalog at `lba`
///
/// The first sector of every bootable image is read to check it for the
/// s390 signature. Images starting past the end of the device are
/// incompatible.
pub fn read_boot_catalog<B: BlockIo>(block_io: &mut B, lba: u32) -> Result<BootCatalog> {
    let mut sector = vec![0u8; SECTOR_SIZE];
    block_io
        .read_blocks(Lba(lba as u64), &mut sector)
        .map_err(|_| Iso9660Error::IoError)?;

    let platform = validation::parse(&sector).ok_or(Iso9660Error::InvalidBootCatalog)?;

    let total_sectors = block_io.num_blocks().map_err(|_| Iso9660Error::IoError)?;
    let mut image = vec![0u8; SECTOR_SIZE];
    let mut entries = Vec::new();
    for raw in sector.chunks_exact(entry::ENTRY_SIZE).skip(1) {
        let section = entry::SectionEntry::parse(raw);
        if !section.is_bootable() {
            continue;
        }

        let in_range = (section.load_rba as u64) < total_sectors;
        if !in_range {
            log::warn!("El Torito entry at sector {} is beyond the device", section.load_rba);
        }

        let compatible = section.is_well_formed() && in_range && {
            block_io
                .read_blocks(Lba(section.load_rba as u64), &mut image)
                .map_err(|_| Iso9660Error::IoError)?;
            image[MAGIC_OFFSET..MAGIC_OFFSET + LINUX_S390_MAGIC.len()] == LINUX_S390_MAGIC
        };
        if !compatible {
            log::debug!("El Torito entry at sector {} is not an s390 image", section.load_rba);
        }

        entries.push(BootCatalogEntry {
            platform,
            load_rba: section.load_rba,
            sector_count: section.sector_count,
            load_segment: section.load_segment,
            is_bootable_and_compatible: compatible,
        });
    }

    Ok(BootCatalog { platform, entries })
}
