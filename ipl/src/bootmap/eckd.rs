//! ECKD DASD boot records
//!
//! Four layouts lead to the same boot map table:
//!
//! - CDL: block 1 is the `IPL2` record with a zIPL MBR, block 2 the `VOL1`
//!   label.
//! - LDL and CMS: block 0 carries a `BootInfo` record, block 2 an `LNX1` or
//!   `CMS1` label.
//! - Unlabeled: LDL without any label.
//! - List-directed: the label at block 2 points at a zIPL boot record whose
//!   program table supersedes the CCW boot map.
//!
//! From the boot map table on, every layout runs the same script logic.

use gpt_disk_io::BlockIo;

use crate::bootmap::{be_u32, parse_script_entries, ZIPL_MAGIC};
use crate::chain::ChainFormat;
use crate::config::BootConfig;
use crate::disk::{BlockNumber, Disk, Scratch};
use crate::ebcdic;
use crate::error::{BootError, Result};
use crate::geometry::Chs;
use crate::machine::Machine;
use crate::menu::{zipl_boot_index, MenuIndex};
use crate::pointer::{decode, PointerFormat};
use crate::script::BootScript;

/// Block holding the CDL `IPL2` record
pub const IPL2_BLOCK: BlockNumber = BlockNumber(1);

/// Block holding the volume label (CDL) or VTOC label (LDL/CMS)
pub const LABEL_BLOCK: BlockNumber = BlockNumber(2);

/// Block holding the LDL/CMS `IPL1` record
pub const IPL1_BLOCK: BlockNumber = BlockNumber(0);

/// zIPL MBR inside the `IPL2` record
const CDL_MBR_OFFSET: usize = 92;

/// Stage 1 seek[0] CHS inside the `IPL2` record
const CDL_STAGE1B_CHS: usize = 78;

/// `BootInfo` inside the `IPL1` record
const LDL_BOOT_INFO_OFFSET: usize = 112;

/// Stage 1 seek[0] CHS inside the `IPL1` record
const LDL_STAGE1B_CHS: usize = 98;

/// CHS of the list-directed boot record inside the label block
const LD_BOOT_RECORD_CHS: usize = 78;

/// Program table pointer inside the list-directed boot record
const LD_PGT_OFFSET: usize = 16;

/// LDL label version byte
const LDL_VERSION_OFFSET: usize = 79;

/// `BootInfo` version this loader understands
pub const BOOT_INFO_VERSION: u8 = 1;
/// `BootInfo` boot program type: IPL
pub const BOOT_INFO_BP_TYPE_IPL: u8 = 0x00;
/// `BootInfo` / MBR device type: ECKD
pub const BOOT_INFO_DEV_TYPE_ECKD: u8 = 0x00;
/// `BootInfo` flags for this architecture
pub const BOOT_INFO_FLAGS_ARCH: u8 = 0x01;

/// Labeled or unlabeled Linux layouts sharing the `BootInfo` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdlFlavor {
    /// `LNX1` label
    Ldl,
    /// `CMS1` label
    Cms,
    /// No label at all
    Unlabeled,
}

/// Where an ECKD layout keeps its boot map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EckdBootMap {
    /// Boot map (program) table
    pub bmt: BlockNumber,
    /// Stage 1b, for the zIPL menu
    pub stage1b: Option<BlockNumber>,
    /// The table came from a list-directed boot record
    pub list_directed: bool,
}

fn check_block_size(declared: Option<u32>, block_size: u32, what: &'static str) -> Result<()> {
    match declared {
        Some(size) if size != block_size => {
            log::warn!("{}: declared block size {} on a {} byte device", what, size, block_size);
            Err(BootError::Malformed("bad block size in zIPL section"))
        }
        _ => Ok(()),
    }
}

fn stage1b_block<B: BlockIo>(disk: &Disk<B>, raw: &[u8]) -> Option<BlockNumber> {
    let chs = Chs::from_bytes(raw)?;
    if !disk.geometry().is_valid_chs(chs) {
        log::debug!("no stage1b at {:?}", chs);
        return None;
    }
    Some(disk.geometry().chs_to_block(chs))
}

fn log_volser(raw: &[u8]) {
    let mut volser = [0u8; 6];
    volser.copy_from_slice(&raw[..6]);
    let ascii = ebcdic::volser(&volser);
    log::info!("VOLSER=[{}]", core::str::from_utf8(&ascii).unwrap_or("??????"));
}

/// Boot map of a CDL volume
pub fn parse_cdl<B: BlockIo>(disk: &mut Disk<B>, scratch: &mut Scratch) -> Result<EckdBootMap> {
    log::info!("Using ECKD scheme (block size {}), CDL", disk.block_size());

    disk.read_block(IPL2_BLOCK, &mut scratch.sec, "IPL2 record")?;
    let ipl2 = &scratch.sec[..];
    let mbr = &ipl2[CDL_MBR_OFFSET..];
    if mbr[..4] != ZIPL_MAGIC {
        return Err(BootError::NotApplicable("no zIPL section in IPL2 record"));
    }
    let bmt = decode(&mbr[8..24], PointerFormat::ExtEckd, false, disk.geometry())?;
    check_block_size(bmt.declared_block_size, disk.block_size(), "IPL2 record")?;
    if mbr[6] != BOOT_INFO_DEV_TYPE_ECKD {
        return Err(BootError::Malformed("non-ECKD device type in zIPL section of IPL2 record"));
    }
    if bmt.block_number.is_null() {
        return Err(BootError::Malformed("no boot map table pointer in IPL2 record"));
    }
    let stage1b = stage1b_block(disk, &ipl2[CDL_STAGE1B_CHS..]);

    disk.read_block(LABEL_BLOCK, &mut scratch.sec, "volume label")?;
    if scratch.sec[4..8] != ebcdic::VOL1_MAGIC {
        return Err(BootError::Malformed("invalid magic of volser block"));
    }
    log_volser(&scratch.sec[8..14]);

    Ok(EckdBootMap {
        bmt: bmt.block_number,
        stage1b,
        list_directed: false,
    })
}

/// Boot map of an LDL, CMS or unlabeled volume
pub fn parse_ldl<B: BlockIo>(
    disk: &mut Disk<B>,
    scratch: &mut Scratch,
    flavor: LdlFlavor,
) -> Result<EckdBootMap> {
    if flavor != LdlFlavor::Unlabeled {
        disk.read_block(LABEL_BLOCK, &mut scratch.sec, "volume label")?;
        let label = &scratch.sec[..];
        match flavor {
            LdlFlavor::Cms => {
                log::info!("Using ECKD scheme (block size {}), CMS", disk.block_size());
                log_volser(&label[4..10]);
            }
            _ => {
                let version = if label[LDL_VERSION_OFFSET] == 0xF2 { 2 } else { 1 };
                log::info!("Using ECKD scheme (block size {}), LDL version {}", disk.block_size(), version);
                log_volser(&label[4..10]);
            }
        }
    }

    disk.read_block(IPL1_BLOCK, &mut scratch.sec, "boot info")?;
    let ipl1 = &scratch.sec[..];
    let bip = &ipl1[LDL_BOOT_INFO_OFFSET..];

    if bip[..4] != ZIPL_MAGIC {
        if flavor == LdlFlavor::Unlabeled {
            return Err(BootError::NotApplicable("no zIPL signature in boot info"));
        }
        return Err(BootError::Malformed("no zIPL sig in BootInfo"));
    }
    if flavor == LdlFlavor::Unlabeled {
        log::info!("Using ECKD scheme (block size {}), unlabeled LDL", disk.block_size());
    }
    if bip[4] != BOOT_INFO_VERSION {
        return Err(BootError::Malformed("wrong zIPL version"));
    }
    if bip[5] != BOOT_INFO_BP_TYPE_IPL {
        return Err(BootError::Malformed("DASD is not for IPL"));
    }
    if bip[6] != BOOT_INFO_DEV_TYPE_ECKD {
        return Err(BootError::Malformed("DASD is not ECKD"));
    }
    if bip[7] != BOOT_INFO_FLAGS_ARCH {
        return Err(BootError::Malformed("not for this arch"));
    }
    let bmt = decode(&bip[8..24], PointerFormat::ExtEckd, false, disk.geometry())?;
    check_block_size(bmt.declared_block_size, disk.block_size(), "boot info")?;
    if bmt.block_number.is_null() {
        return Err(BootError::Malformed("no boot map table pointer in boot info"));
    }

    let stage1b = stage1b_block(disk, &ipl1[LDL_STAGE1B_CHS..]);
    Ok(EckdBootMap {
        bmt: bmt.block_number,
        stage1b,
        list_directed: false,
    })
}

/// Program table named by a list-directed boot record
///
/// `NotApplicable` unless the label block points at a readable zIPL boot
/// record.
pub fn find_list_directed_bmt<B: BlockIo>(
    disk: &mut Disk<B>,
    scratch: &mut Scratch,
) -> Result<EckdBootMap> {
    disk.read_block(LABEL_BLOCK, &mut scratch.sec, "volume label")?;
    let chs = Chs::from_bytes(&scratch.sec[LD_BOOT_RECORD_CHS..])
        .ok_or(BootError::NotApplicable("no list-directed boot record"))?;
    if !disk.geometry().is_valid_chs(chs) {
        return Err(BootError::NotApplicable("no list-directed boot record"));
    }
    let record = disk.geometry().chs_to_block(chs);

    disk.read_block(record, &mut scratch.sec, "list-directed boot record")?;
    if scratch.sec[..4] != ZIPL_MAGIC {
        return Err(BootError::NotApplicable("invalid list-directed boot record"));
    }
    log::debug!(
        "list-directed boot record version {}",
        be_u32(&scratch.sec[4..8])
    );

    let pgt = decode(
        &scratch.sec[LD_PGT_OFFSET..LD_PGT_OFFSET + 16],
        PointerFormat::ExtEckd,
        true,
        disk.geometry(),
    )?;
    if pgt.block_number.is_null() {
        return Err(BootError::NotApplicable("list-directed boot record without program table"));
    }
    log::info!("List-Directed");

    Ok(EckdBootMap {
        bmt: pgt.block_number,
        stage1b: None,
        list_directed: true,
    })
}

/// Choose an entry from the boot map and parse its script
pub fn build_script<B: BlockIo, M: Machine>(
    disk: &mut Disk<B>,
    machine: &mut M,
    config: &BootConfig,
    scratch: &mut Scratch,
    map: &EckdBootMap,
) -> Result<BootScript> {
    let index = match map.stage1b {
        Some(stage1b) if config.zipl_menu_enabled() && !map.list_directed => {
            zipl_boot_index(disk, machine, config, scratch, stage1b)?
        }
        _ => MenuIndex::new(config.boot_index())?,
    };
    log::debug!("boot entry {}", index.get());

    disk.read_block(map.bmt, &mut scratch.sec, "boot map table")?;
    let raw = &scratch.sec[index.get() * 16..(index.get() + 1) * 16];
    let entry = decode(raw, PointerFormat::ExtEckd, map.list_directed, disk.geometry())?;
    if entry.block_number.is_null() {
        log::warn!("boot map table has no entry {}", index.get());
        return Err(BootError::Malformed("cannot find boot map table entry"));
    }

    disk.read_block(entry.block_number, &mut scratch.sec, "boot map script")?;
    if scratch.sec[..4] != ZIPL_MAGIC {
        log::warn!("boot map script at block {} has no zIPL magic", entry.block_number);
        return Err(BootError::Malformed("no zIPL magic in boot map script"));
    }
    let block_size = disk.block_size() as usize;
    parse_script_entries(
        &scratch.sec[..block_size],
        ChainFormat::Eckd,
        map.list_directed,
        disk.geometry(),
    )
}
