//! Boot scripts and their executor
//!
//! Every boot-record parser reduces its layout to a `BootScript`: loads in
//! order, then exactly one exec entry. Chains are not resolved until the
//! script runs.

use alloc::vec::Vec;
use core::convert::Infallible;

use gpt_disk_io::BlockIo;

use crate::chain::{ChainFormat, ChainWalker};
use crate::disk::{BlockNumber, Disk, Scratch};
use crate::error::{BootError, Result};
use crate::machine::Machine;

/// Where the Linux kernel image starts
pub const KERN_IMAGE_START: u64 = 0x10000;

/// Location of the `S390EP` marker in a loaded Linux kernel
pub const S390EP: u64 = 0x10008;

/// Bits that mark the word at address 0 as a usable reset PSW
pub const RESET_PSW_MASK: u64 = 0x0008_0001_0000_0000;

/// Data to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Contiguous blocks
    Extent {
        /// First block
        start: BlockNumber,
        /// Number of blocks
        blocks: u32,
    },
    /// Block pointer array chain
    Chain {
        /// Block holding the first array
        start: BlockNumber,
        /// Pointer layout
        format: ChainFormat,
        /// Pointers came from a list-directed boot record
        list_directed: bool,
    },
}

/// One load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOp {
    /// What to read
    pub source: LoadSource,
    /// Guest address of the first byte
    pub destination_address: u64,
}

/// How to start the loaded program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecTarget {
    /// Start through this reset PSW
    ResetPsw(u64),
    /// Inspect the loaded image to decide
    LowKernel,
}

/// Resolved hand-off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Load this PSW and IPL through it
    ResetPsw(u64),
    /// Branch to this address
    Address(u64),
}

/// Script entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootScriptEntry {
    /// Copy data to guest memory
    Load(LoadOp),
    /// Signature for secure boot; skipped
    Signature,
    /// Start the program
    Exec(ExecTarget),
}

/// Ordered load entries terminated by one exec entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootScript {
    entries: Vec<BootScriptEntry>,
}

impl BootScript {
    /// Entries in execution order
    pub fn entries(&self) -> &[BootScriptEntry] {
        &self.entries
    }
}

/// Builds a `BootScript`
#[derive(Debug, Default)]
pub struct BootScriptBuilder {
    entries: Vec<BootScriptEntry>,
}

impl BootScriptBuilder {
    /// Empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `blocks` contiguous blocks from `start`
    pub fn load_extent(&mut self, start: BlockNumber, blocks: u32, address: u64) -> &mut Self {
        self.entries.push(BootScriptEntry::Load(LoadOp {
            source: LoadSource::Extent { start, blocks },
            destination_address: address,
        }));
        self
    }

    /// Load the chain whose first array is at `start`
    pub fn load_chain(
        &mut self,
        start: BlockNumber,
        format: ChainFormat,
        list_directed: bool,
        address: u64,
    ) -> &mut Self {
        self.entries.push(BootScriptEntry::Load(LoadOp {
            source: LoadSource::Chain {
                start,
                format,
                list_directed,
            },
            destination_address: address,
        }));
        self
    }

    /// Record a signature entry
    pub fn signature(&mut self) -> &mut Self {
        self.entries.push(BootScriptEntry::Signature);
        self
    }

    /// Append the exec entry and seal the script
    pub fn finish(mut self, exec: ExecTarget) -> BootScript {
        self.entries.push(BootScriptEntry::Exec(exec));
        BootScript {
            entries: self.entries,
        }
    }
}

fn copy_blocks<B: BlockIo, M: Machine>(
    disk: &mut Disk<B>,
    machine: &mut M,
    start: BlockNumber,
    blocks: u32,
    address: u64,
) -> Result<()> {
    let len = (blocks as u64)
        .checked_mul(disk.block_size() as u64)
        .and_then(|len| usize::try_from(len).ok())
        .ok_or(BootError::Malformed("load size overflow"))?;
    let memory = machine.memory(address, len).ok_or_else(|| {
        log::warn!("load of {} bytes to {:#x} is outside guest memory", len, address);
        BootError::Malformed("load target outside guest memory")
    })?;
    disk.read_blocks(start, blocks as u64, memory, "boot image")
}

fn resolve<M: Machine>(target: ExecTarget, machine: &mut M) -> EntryPoint {
    match target {
        ExecTarget::ResetPsw(psw) => EntryPoint::ResetPsw(psw),
        ExecTarget::LowKernel => {
            if machine
                .memory(S390EP, 6)
                .is_some_and(|marker| marker == b"S390EP")
            {
                return EntryPoint::Address(KERN_IMAGE_START);
            }
            let psw = machine
                .memory(0, 8)
                .map(|word| {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(word);
                    u64::from_be_bytes(raw)
                })
                .unwrap_or(0);
            if psw & RESET_PSW_MASK != 0 {
                EntryPoint::ResetPsw(psw)
            } else {
                EntryPoint::Address(KERN_IMAGE_START)
            }
        }
    }
}

/// Perform every load and resolve the entry point
pub fn load<B: BlockIo, M: Machine>(
    script: &BootScript,
    disk: &mut Disk<B>,
    machine: &mut M,
    scratch: &mut Scratch,
) -> Result<EntryPoint> {
    for entry in script.entries() {
        match *entry {
            BootScriptEntry::Load(op) => match op.source {
                LoadSource::Extent { start, blocks } => {
                    log::debug!("loading {} block(s) at {} to {:#x}", blocks, start, op.destination_address);
                    copy_blocks(disk, machine, start, blocks, op.destination_address)?;
                }
                LoadSource::Chain {
                    start,
                    format,
                    list_directed,
                } => {
                    log::debug!("loading segment at block {} to {:#x}", start, op.destination_address);
                    let mut walker =
                        ChainWalker::new(start, format, list_directed, op.destination_address);
                    while let Some(run) = walker.next_run(disk, &mut scratch.bprs)? {
                        copy_blocks(disk, machine, run.block, run.blocks, run.address)?;
                    }
                }
            },
            BootScriptEntry::Signature => log::debug!("skipping signature entry"),
            BootScriptEntry::Exec(target) => {
                let entry = resolve(target, machine);
                log::info!("boot script loaded, entry {:?}", entry);
                return Ok(entry);
            }
        }
    }
    log::error!("boot script ended without an exec entry");
    Err(BootError::Policy("no EXEC entry in boot script"))
}

/// Load the script and start it
pub fn execute<B: BlockIo, M: Machine>(
    script: &BootScript,
    disk: &mut Disk<B>,
    machine: &mut M,
    scratch: &mut Scratch,
) -> Result<Infallible> {
    let entry = load(script, disk, machine, scratch)?;
    machine.transfer_control(entry)
}
