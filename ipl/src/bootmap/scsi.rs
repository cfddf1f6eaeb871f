//! SCSI boot records
//!
//! Block 0 holds the zIPL MBR, which points at a program table. Each
//! program table entry points at a component table: a header followed by
//! load, signature and exec entries.

use gpt_disk_io::BlockIo;

use crate::bootmap::{be_u32, parse_script_entries, ZIPL_MAGIC};
use crate::chain::ChainFormat;
use crate::config::BootConfig;
use crate::disk::{BlockNumber, Disk, Scratch};
use crate::error::{BootError, Result};
use crate::machine::Machine;
use crate::menu::{enumerated_boot_index, ValidEntries, MAX_BOOT_ENTRIES};
use crate::pointer::{decode, is_unused, PointerFormat};
use crate::script::BootScript;

/// Block holding the MBR
pub const MBR_BLOCK: BlockNumber = BlockNumber(0);

/// MBR layout version this loader understands
pub const MBR_VERSION: u32 = 1;

/// Program table pointer inside the MBR
const MBR_PT_OFFSET: usize = 16;

/// The program table's first slot is its `zIPL` header
const PT_HEADER_SIZE: usize = 16;

/// Program table entry size
const PT_ENTRY_SIZE: usize = 16;

/// Component header type for IPL
pub const COMPONENT_HEADER_IPL: u8 = 0x00;

/// Offset of the component header type
const COMPONENT_TYPE_OFFSET: usize = 4;

/// Program table entries that name a component table
pub fn valid_entries(table: &[u8]) -> ValidEntries {
    let mut valid = ValidEntries::new();
    for i in 0..MAX_BOOT_ENTRIES {
        let start = PT_HEADER_SIZE + i * PT_ENTRY_SIZE;
        let Some(raw) = table.get(start..start + 8) else {
            break;
        };
        if !is_unused(raw) && raw.iter().any(|&b| b != 0) {
            valid.insert(i);
        }
    }
    valid
}

/// Parse the zIPL SCSI layout into a boot script
pub fn parse<B: BlockIo, M: Machine>(
    disk: &mut Disk<B>,
    machine: &mut M,
    config: &BootConfig,
    scratch: &mut Scratch,
) -> Result<BootScript> {
    disk.read_block(MBR_BLOCK, &mut scratch.sec, "MBR")?;
    let mbr = &scratch.sec[..];
    if mbr[..4] != ZIPL_MAGIC {
        return Err(BootError::NotApplicable("no zIPL magic in MBR"));
    }

    log::info!("Using SCSI scheme.");
    let version = be_u32(&mbr[4..8]);
    if version != MBR_VERSION {
        log::warn!("Unknown MBR layout version {}, assuming version 1", version);
    }

    let pt = decode(
        &mbr[MBR_PT_OFFSET..MBR_PT_OFFSET + 16],
        PointerFormat::Scsi,
        false,
        disk.geometry(),
    )?;
    if pt.block_number.is_null() || pt.block_number.0 == 0 {
        return Err(BootError::Malformed("no program table"));
    }
    log::debug!("program table at block {}", pt.block_number);

    disk.read_block(pt.block_number, &mut scratch.sec, "program table")?;
    if scratch.sec[..4] != ZIPL_MAGIC {
        return Err(BootError::Malformed("no zIPL magic in program table"));
    }
    let valid = valid_entries(&scratch.sec);
    log::debug!("program table entries: {}", valid.len());
    if valid.is_empty() {
        return Err(BootError::Malformed("empty program table"));
    }

    let index = enumerated_boot_index(machine, config, valid)?;
    if !valid.contains(index.get()) {
        log::error!("program table entry {} is empty", index.get());
        return Err(BootError::Policy("selected program table entry is empty"));
    }

    let start = PT_HEADER_SIZE + index.get() * PT_ENTRY_SIZE;
    let entry = decode(
        &scratch.sec[start..start + PT_ENTRY_SIZE],
        PointerFormat::Scsi,
        false,
        disk.geometry(),
    )?;

    disk.read_block(entry.block_number, &mut scratch.sec, "component table")?;
    let header = &scratch.sec[..];
    if header[..4] != ZIPL_MAGIC {
        return Err(BootError::Malformed("no zIPL magic in component header"));
    }
    if header[COMPONENT_TYPE_OFFSET] != COMPONENT_HEADER_IPL {
        return Err(BootError::Malformed("bad component header type"));
    }

    let block_size = disk.block_size() as usize;
    parse_script_entries(&header[..block_size], ChainFormat::Scsi, false, disk.geometry())
}
