//! Block pointer array chains
//!
//! A zIPL component is stored as arrays of block pointers. Each slot either
//! loads a run of blocks, ends the chain, or (when it is a zero-count
//! pointer followed by unused space) names the block holding the next
//! array.

use crate::disk::{BlockNumber, Disk, Scratch};
use crate::error::{BootError, Result};
use crate::geometry::DeviceGeometry;
use crate::pointer::{decode, is_unused, BlockRef, PointerFormat};
use gpt_disk_io::BlockIo;

/// Pointer layout of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFormat {
    /// Extended ECKD pointers over the 8 KiB arena
    Eckd,
    /// SCSI pointers, one block per array
    Scsi,
}

impl ChainFormat {
    /// Record layout of the slots
    pub const fn pointer_format(self) -> PointerFormat {
        match self {
            Self::Eckd => PointerFormat::ExtEckd,
            Self::Scsi => PointerFormat::Scsi,
        }
    }

    /// Slots one array holds
    pub const fn slots(self, block_size: u32) -> usize {
        let size = self.pointer_format().record_size();
        match self {
            Self::Eckd => Scratch::BPRS_SIZE / size,
            Self::Scsi => block_size as usize / size,
        }
    }
}

/// What a slot means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// End of chain
    Terminator,
    /// The next array lives in this block
    Continuation(BlockNumber),
    /// Load these blocks
    Load(BlockRef),
}

/// Classify slot `index` of `array`
pub fn classify(
    array: &[u8],
    index: usize,
    slots: usize,
    format: ChainFormat,
    list_directed: bool,
    geometry: &DeviceGeometry,
) -> Result<Slot> {
    let pointer = format.pointer_format();
    let size = pointer.record_size();
    let raw = array
        .get(index * size..(index + 1) * size)
        .ok_or(BootError::Malformed("block pointer array overrun"))?;

    let r = decode(raw, pointer, list_directed, geometry)?;
    if r.block_number.is_null() || (format == ChainFormat::Scsi && r.block_number.0 == 0) {
        return Ok(Slot::Terminator);
    }

    if index + 1 >= slots {
        log::warn!("no terminator in {} slots of block pointer array", slots);
        return Err(BootError::Malformed("block pointer array overrun"));
    }

    if !list_directed {
        if let Some(declared) = r.declared_block_size {
            if declared != geometry.block_size {
                log::warn!(
                    "block pointer declares {} byte blocks, device has {}",
                    declared,
                    geometry.block_size
                );
                return Err(BootError::Malformed("bad block size in block pointer"));
            }
        }

        let next = array
            .get((index + 1) * size..(index + 1) * size + pointer.pointer_len())
            .unwrap_or(&[]);
        if r.run_length == 0 && !next.is_empty() && is_unused(next) {
            return Ok(Slot::Continuation(r.block_number));
        }
    }

    Ok(Slot::Load(r))
}

/// A run of blocks to copy to guest memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRun {
    /// First block
    pub block: BlockNumber,
    /// Blocks to read
    pub blocks: u32,
    /// Guest address of the first block
    pub address: u64,
}

/// Lazy walker over one chain
///
/// The array is held in the caller's `bprs` buffer, which must not be
/// touched between calls to `next_run`.
#[derive(Debug)]
pub struct ChainWalker {
    format: ChainFormat,
    list_directed: bool,
    pending: Option<BlockNumber>,
    index: usize,
    address: u64,
    done: bool,
}

impl ChainWalker {
    /// Walker for the chain whose first array is at `start`
    pub fn new(start: BlockNumber, format: ChainFormat, list_directed: bool, address: u64) -> Self {
        Self {
            format,
            list_directed,
            pending: Some(start),
            index: 0,
            address,
            done: false,
        }
    }

    /// Next run, or `None` at the terminator
    pub fn next_run<B: BlockIo>(
        &mut self,
        disk: &mut Disk<B>,
        bprs: &mut [u8],
    ) -> Result<Option<LoadRun>> {
        if self.done {
            return Ok(None);
        }

        loop {
            if let Some(block) = self.pending.take() {
                log::debug!("reading block pointer array at {}", block);
                disk.read_block(block, bprs, "block pointer array")?;
                self.index = 0;
            }

            let geometry = *disk.geometry();
            let slots = self
                .format
                .slots(geometry.block_size)
                .min(bprs.len() / self.format.pointer_format().record_size());

            match classify(bprs, self.index, slots, self.format, self.list_directed, &geometry)? {
                Slot::Terminator => {
                    self.done = true;
                    return Ok(None);
                }
                Slot::Continuation(next) => {
                    self.pending = Some(next);
                }
                Slot::Load(r) => {
                    let run = LoadRun {
                        block: r.block_number,
                        blocks: r.blocks(),
                        address: self.address,
                    };
                    self.address = (run.blocks as u64)
                        .checked_mul(geometry.block_size as u64)
                        .and_then(|len| self.address.checked_add(len))
                        .ok_or(BootError::Malformed("load address overflow"))?;
                    self.index += 1;
                    return Ok(Some(run));
                }
            }
        }
    }
}
