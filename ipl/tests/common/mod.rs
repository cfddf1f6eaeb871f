//! Common test utilities: an in-memory device and a recording machine

#![allow(dead_code)]

pub mod builder;

use ccw_ipl::{BootConfig, BootMenu, DeviceInfo, DeviceKind, Disk, EntryPoint, Machine, MenuStyle};
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use std::io;

/// Guest memory given to every test machine
pub const MEMORY_SIZE: usize = 4 << 20;

/// In-memory block device for testing
#[derive(Debug, Clone)]
pub struct MemoryBlockDevice {
    pub data: Vec<u8>,
    pub block_size: usize,
    /// First block of every read, in order
    pub reads: Vec<u64>,
    /// Reads touching this block fail
    pub fail_block: Option<u64>,
}

impl MemoryBlockDevice {
    pub fn new(data: Vec<u8>, block_size: usize) -> Self {
        Self {
            data,
            block_size,
            reads: Vec::new(),
            fail_block: None,
        }
    }

    /// Number of reads that started at `block`
    pub fn reads_of(&self, block: u64) -> usize {
        self.reads.iter().filter(|&&b| b == block).count()
    }
}

impl BlockIo for MemoryBlockDevice {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::new(self.block_size as u32).expect("valid block size")
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok((self.data.len() / self.block_size) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        let offset = start_lba.0 as usize * self.block_size;
        let count = dst.len().div_ceil(self.block_size) as u64;
        if let Some(bad) = self.fail_block {
            if (start_lba.0..start_lba.0 + count).contains(&bad) {
                return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
            }
        }
        if offset + dst.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read beyond end of device",
            ));
        }
        self.reads.push(start_lba.0);
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_blocks(&mut self, _start_lba: Lba, _src: &[u8]) -> Result<(), Self::Error> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only device"))
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A menu the loader asked the machine to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownMenu {
    /// The zIPL text menu rather than the generated one
    pub zipl: bool,
    pub entries: Vec<usize>,
    pub timeout_ms: Option<u32>,
}

/// Machine with flat memory and a scripted menu answer
pub struct TestMachine {
    pub memory: Vec<u8>,
    /// What the operator picks in every menu
    pub choice: u16,
    pub menus: Vec<ShownMenu>,
}

impl TestMachine {
    pub fn new() -> Self {
        Self {
            memory: vec![0u8; MEMORY_SIZE],
            choice: 0,
            menus: Vec::new(),
        }
    }

    pub fn choosing(choice: u16) -> Self {
        Self {
            choice,
            ..Self::new()
        }
    }
}

impl Machine for TestMachine {
    fn memory(&mut self, address: u64, len: usize) -> Option<&mut [u8]> {
        let start = usize::try_from(address).ok()?;
        let end = start.checked_add(len)?;
        self.memory.get_mut(start..end)
    }

    fn select_boot_entry(&mut self, menu: &BootMenu<'_>) -> u16 {
        self.menus.push(ShownMenu {
            zipl: matches!(menu.style, MenuStyle::Zipl { .. }),
            entries: menu.entries.iter().collect(),
            timeout_ms: menu.timeout_ms,
        });
        self.choice
    }

    fn transfer_control(&mut self, entry: EntryPoint) -> ! {
        panic!("transfer_control({:?})", entry)
    }
}

/// Wrap `device` as a virtio-blk disk
pub fn block_disk(device: MemoryBlockDevice) -> Disk<MemoryBlockDevice> {
    Disk::new(device, DeviceInfo::new(DeviceKind::Block)).expect("disk")
}

/// Wrap `device` as a disk of `kind`
pub fn disk_of(kind: DeviceKind, device: MemoryBlockDevice) -> Disk<MemoryBlockDevice> {
    Disk::new(device, DeviceInfo::new(kind)).expect("disk")
}

/// Config with an explicit loadparm index
pub fn loadparm(index: u32) -> BootConfig {
    BootConfig::new(ccw_ipl::Loadparm::Index(index), ccw_ipl::MenuMode::Disabled, None)
}
