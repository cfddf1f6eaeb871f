//! El Torito boot from ISO9660 media
//!
//! The volume is read through [`IsoSectors`], which presents the boot
//! device to the `iso9660` crate as 2048-byte blocks.

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use iso9660::{extent_size, mount, read_boot_catalog, Iso9660Error};

use crate::config::BootConfig;
use crate::disk::{BlockNumber, Disk, Scratch, ISO_BLOCK_SIZE};
use crate::error::{BootError, Result};
use crate::machine::Machine;
use crate::menu::{enumerated_boot_index, ValidEntries, MAX_BOOT_ENTRIES};
use crate::script::{BootScript, BootScriptBuilder, ExecTarget};

/// Byte offset of `CD001` in the first volume descriptor
pub const ISO_SIGNATURE_OFFSET: u64 = iso9660::types::SIGNATURE_OFFSET;

/// The boot device seen as ISO sectors
pub struct IsoSectors<'a, B: BlockIo> {
    disk: &'a mut Disk<B>,
}

impl<'a, B: BlockIo> IsoSectors<'a, B> {
    /// Borrow a disk already switched to 2048-byte blocks
    pub fn new(disk: &'a mut Disk<B>) -> Self {
        Self { disk }
    }
}

impl<B: BlockIo> BlockIo for IsoSectors<'_, B> {
    type Error = BootError;

    fn block_size(&self) -> BlockSize {
        BlockSize::new(ISO_BLOCK_SIZE).unwrap_or(BlockSize::BS_512)
    }

    fn num_blocks(&mut self) -> core::result::Result<u64, Self::Error> {
        Ok(self.disk.geometry().total_blocks)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> core::result::Result<(), Self::Error> {
        let count = (dst.len() / ISO_BLOCK_SIZE as usize) as u64;
        self.disk
            .read_blocks(BlockNumber(start_lba.0), count, dst, "ISO sector")
    }

    fn write_blocks(&mut self, _start_lba: Lba, _src: &[u8]) -> core::result::Result<(), Self::Error> {
        Err(BootError::Io("boot device is read-only"))
    }

    fn flush(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }
}

fn map_err(err: Iso9660Error) -> BootError {
    match err {
        Iso9660Error::IoError => BootError::Io("ISO sector read failed"),
        Iso9660Error::InvalidSignature | Iso9660Error::UnsupportedVersion => {
            BootError::NotApplicable("no ISO9660 volume")
        }
        Iso9660Error::NoBootRecord => BootError::NotApplicable("no El Torito boot entry"),
        Iso9660Error::InvalidBootCatalog => BootError::Malformed("bad ISO boot catalog"),
        Iso9660Error::NoBootEntry => {
            BootError::NotApplicable("no suitable boot entry on ISO-9660 media")
        }
        Iso9660Error::InvalidDirectoryRecord
        | Iso9660Error::NotFound
        | Iso9660Error::DirectoryTooDeep => BootError::Malformed("bad ISO9660 directory"),
    }
}

/// Parse the El Torito catalog into a boot script
///
/// The device is switched to 2048-byte blocks first.
pub fn parse<B: BlockIo, M: Machine>(
    disk: &mut Disk<B>,
    machine: &mut M,
    config: &BootConfig,
    _scratch: &mut Scratch,
) -> Result<BootScript> {
    if disk.block_size() != ISO_BLOCK_SIZE {
        disk.assume_iso9660();
    }

    let mut sectors = IsoSectors::new(disk);
    let volume = mount(&mut sectors, 0).map_err(map_err)?;
    let catalog_lba = volume
        .boot_catalog_lba
        .ok_or(BootError::NotApplicable("no El Torito boot entry"))?;
    let catalog = read_boot_catalog(&mut sectors, catalog_lba).map_err(map_err)?;

    let compatible = catalog.compatible().count();
    if compatible == 0 {
        return Err(BootError::NotApplicable("no suitable boot entry on ISO-9660 media"));
    }

    // Index 0 is the default, index k the k-th compatible entry
    let mut valid = ValidEntries::new();
    for i in 0..=compatible.min(MAX_BOOT_ENTRIES - 1) {
        valid.insert(i);
    }
    let index = enumerated_boot_index(machine, config, valid)?;
    let entry = catalog.select(index.get() as u32).map_err(|_| {
        log::error!("loadparm {} exceeds {} El Torito entries", index.get(), compatible);
        BootError::Policy("loadparm selects a missing ISO boot entry")
    })?;

    let blocks = match extent_size(&mut sectors, &volume, entry.load_rba) {
        Ok(bytes) if bytes > 0 => iso9660::utils::sector::sectors_for_bytes(bytes),
        Ok(_) | Err(Iso9660Error::NotFound)
        | Err(Iso9660Error::DirectoryTooDeep)
        | Err(Iso9660Error::InvalidDirectoryRecord) => {
            log::warn!(
                "cannot size El Torito image at sector {}, using catalog size",
                entry.load_rba
            );
            entry.nominal_sectors()
        }
        Err(err) => return Err(map_err(err)),
    };

    log::info!(
        "El Torito image at sector {}: {} sector(s) to {:#x}",
        entry.load_rba,
        blocks,
        entry.load_segment
    );

    let mut builder = BootScriptBuilder::new();
    builder.load_extent(BlockNumber(entry.load_rba as u64), blocks, entry.load_segment as u64);
    Ok(builder.finish(ExecTarget::LowKernel))
}
