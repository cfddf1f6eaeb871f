//! Boot menus and boot index validation
//!
//! ECKD disks can carry the zIPL menu inside the stage-2 loader; SCSI and
//! ISO schemes show their valid entries in a generated menu instead. The
//! index a menu or loadparm produces is always checked against
//! `MAX_BOOT_ENTRIES` before it reaches a program table.

use gpt_disk_io::BlockIo;

use crate::config::{BootConfig, MenuMode};
use crate::disk::{BlockNumber, Disk, Scratch, MAX_SECTOR_SIZE};
use crate::ebcdic;
use crate::error::{BootError, Result};
use crate::geometry::Chs;
use crate::machine::Machine;
use crate::pointer::is_unused;

/// Program table capacity
pub const MAX_BOOT_ENTRIES: usize = 31;

/// Stage-2 blocks listed in stage 1b
pub const STAGE2_BLK_CNT_MAX: usize = 24;

/// Offset of the stage-2 seek list in stage 1b
const STAGE1B_SEEK_OFFSET: usize = 32 * STAGE2_BLK_CNT_MAX;

/// Size of one seek argument; the CHS sits at +2
const SEEK_ARG_SIZE: usize = 8;

/// Menu flag word, this many bytes before the banner
const ZIPL_FLAG_OFFSET: usize = 140;

/// Menu timeout word in seconds, this many bytes before the banner
const ZIPL_TIMEOUT_OFFSET: usize = 138;

/// A validated boot entry index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MenuIndex(u8);

impl MenuIndex {
    /// The default entry
    pub const DEFAULT: Self = Self(0);

    /// Validate `index`
    pub fn new(index: u32) -> Result<Self> {
        if index as usize >= MAX_BOOT_ENTRIES {
            log::error!("boot index {} exceeds {} entries", index, MAX_BOOT_ENTRIES);
            return Err(BootError::Policy("loadparm value greater than max number of boot entries allowed"));
        }
        Ok(Self(index as u8))
    }

    /// Index into a program table
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// Set of boot entry indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidEntries(u32);

impl ValidEntries {
    /// No entries
    pub const fn new() -> Self {
        Self(0)
    }

    /// Mark `index` valid; indices past the table are ignored
    pub fn insert(&mut self, index: usize) {
        if index < MAX_BOOT_ENTRIES {
            self.0 |= 1 << index;
        }
    }

    /// Is `index` valid?
    pub fn contains(&self, index: usize) -> bool {
        index < MAX_BOOT_ENTRIES && self.0 & (1 << index) != 0
    }

    /// Number of valid entries
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// No valid entries
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Valid indices, ascending
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_BOOT_ENTRIES).filter(move |&i| self.contains(i))
    }
}

/// Kind of menu shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuStyle<'a> {
    /// zIPL menu text (EBCDIC, NUL separated, banner first)
    Zipl {
        /// Menu text starting at the banner
        text: &'a [u8],
    },
    /// Generated list of the valid entries
    Enumerated,
}

/// What the menu UI is asked to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootMenu<'a> {
    /// Menu kind
    pub style: MenuStyle<'a>,
    /// Selectable entries
    pub entries: ValidEntries,
    /// Boot the default after this long; `None` waits
    pub timeout_ms: Option<u32>,
}

fn ask<M: Machine>(machine: &mut M, menu: &BootMenu<'_>) -> Result<MenuIndex> {
    let choice = machine.select_boot_entry(menu) as usize;
    if !menu.entries.contains(choice) {
        log::error!("boot menu returned entry {}, which is not valid", choice);
        return Err(BootError::Policy("invalid boot menu selection"));
    }
    MenuIndex::new(choice as u32)
}

/// Entries listed in zIPL menu text
///
/// `text` starts at the banner. Entries follow as NUL-terminated strings of
/// an optional blank and a decimal index; an empty string ends the list.
/// Entry 0, the default, is always valid.
pub fn parse_zipl_menu(text: &[u8]) -> ValidEntries {
    let mut entries = ValidEntries::new();
    entries.insert(0);

    let mut items = text.split(|&b| b == 0).skip(1);
    for item in items.by_ref() {
        if item.is_empty() {
            break;
        }
        let item = item.strip_prefix(&[ebcdic::SPACE]).unwrap_or(item);
        let mut index = 0usize;
        let mut seen = false;
        for d in item.iter().map_while(|&b| ebcdic::digit(b)) {
            index = index.saturating_mul(10).saturating_add(d as usize);
            seen = true;
        }
        if seen {
            entries.insert(index);
        }
    }
    entries
}

fn find_banner(block: &[u8]) -> Option<usize> {
    block
        .windows(ebcdic::ZIPL_MAGIC.len())
        .position(|w| w == ebcdic::ZIPL_MAGIC)
}

/// Stage-2 block `i` listed in stage 1b, if any
fn stage2_block<B: BlockIo>(disk: &Disk<B>, stage1b: &[u8], i: usize) -> Option<BlockNumber> {
    let seek = STAGE1B_SEEK_OFFSET + i * SEEK_ARG_SIZE;
    let raw = stage1b.get(seek + 2..seek + 2 + Chs::SIZE)?;
    if is_unused(raw) {
        return None;
    }
    let chs = Chs::from_bytes(raw)?;
    if !disk.geometry().is_valid_chs(chs) {
        return None;
    }
    let block = disk.geometry().chs_to_block(chs);
    (block.0 != 0).then_some(block)
}

/// Boot index from the zIPL menu in the stage-2 loader
///
/// Falls back to the default entry when no banner is found.
pub fn zipl_boot_index<B: BlockIo, M: Machine>(
    disk: &mut Disk<B>,
    machine: &mut M,
    config: &BootConfig,
    scratch: &mut Scratch,
    stage1b: BlockNumber,
) -> Result<MenuIndex> {
    disk.read_block(stage1b, &mut scratch.sec, "stage1b boot loader")?;
    scratch.stage2.reset();

    let block_size = disk.block_size() as usize;
    let (prev, rest) = scratch.stage2.split_at_mut(MAX_SECTOR_SIZE);
    let (cur, next) = rest.split_at_mut(MAX_SECTOR_SIZE);

    let mut prev_block: Option<BlockNumber> = None;
    for i in 0..STAGE2_BLK_CNT_MAX {
        let Some(block) = stage2_block(disk, &scratch.sec, i) else {
            break;
        };
        disk.read_block(block, cur, "stage2 boot loader")?;

        let Some(banner) = find_banner(&cur[..block_size]) else {
            prev_block = Some(block);
            continue;
        };

        // The menu may straddle the neighbouring blocks
        if let Some(p) = prev_block {
            disk.read_block(p, prev, "stage2 boot loader")?;
        }
        if let Some(n) = (i + 1 < STAGE2_BLK_CNT_MAX)
            .then(|| stage2_block(disk, &scratch.sec, i + 1))
            .flatten()
        {
            disk.read_block(n, next, "stage2 boot loader")?;
        }

        let pos = MAX_SECTOR_SIZE + banner;
        let ring = &scratch.stage2[..];
        let flag = u16::from_be_bytes([ring[pos - ZIPL_FLAG_OFFSET], ring[pos - ZIPL_FLAG_OFFSET + 1]]);
        let timeout_s =
            u16::from_be_bytes([ring[pos - ZIPL_TIMEOUT_OFFSET], ring[pos - ZIPL_TIMEOUT_OFFSET + 1]]);

        let timeout_ms = if config.menu == MenuMode::Zipl {
            if flag == 0 {
                log::info!("zIPL menu disabled on disk, booting default entry");
                return Ok(MenuIndex::DEFAULT);
            }
            (timeout_s != 0).then(|| timeout_s as u32 * 1000)
        } else {
            config.menu_timeout_ms
        };

        let text = &ring[pos..];
        let menu = BootMenu {
            style: MenuStyle::Zipl { text },
            entries: parse_zipl_menu(text),
            timeout_ms,
        };
        return ask(machine, &menu);
    }

    log::warn!("No zipl boot menu data found. Booting default entry.");
    Ok(MenuIndex::DEFAULT)
}

/// Boot index for schemes without an on-disk menu
pub fn enumerated_boot_index<M: Machine>(
    machine: &mut M,
    config: &BootConfig,
    entries: ValidEntries,
) -> Result<MenuIndex> {
    if !config.enum_menu_enabled() {
        return MenuIndex::new(config.boot_index());
    }
    let menu = BootMenu {
        style: MenuStyle::Enumerated,
        entries,
        timeout_ms: config.menu_timeout_ms,
    };
    ask(machine, &menu)
}
