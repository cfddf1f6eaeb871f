//! Boot device access
//!
//! `Disk` wraps a raw [`BlockIo`] and adds what the boot-record parsers
//! need on top of it: a logical block size that may differ from the
//! device's physical one, ECKD geometry for CHS translation, and range
//! checks on every read.

use alloc::boxed::Box;
use alloc::vec;
use core::fmt;
use core::ops::{Deref, DerefMut};

use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

use crate::error::{BootError, Result};
use crate::geometry::DeviceGeometry;

/// Byte that pre-fills every buffer before a read
///
/// zIPL writes it over unused space, so all-fill records mean "nothing here".
pub const FREE_SPACE_FILLER: u8 = 0xAA;

/// Largest block size the loader handles
pub const MAX_SECTOR_SIZE: usize = 4096;

/// Block size of a DASD when nothing better is known
pub const DASD_DEFAULT_BLOCK_SIZE: u32 = 4096;

/// ISO9660 sector size
pub const ISO_BLOCK_SIZE: u32 = 2048;

/// Linear block number in units of the current logical block size
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockNumber(pub u64);

impl BlockNumber {
    /// End of chain / not present
    pub const NULL: Self = Self(u64::MAX);

    /// Malformed pointer; abort the chain
    pub const ERROR: Self = Self(u64::MAX - 1);

    /// Is this the end-of-chain sentinel?
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// Is this either sentinel?
    pub fn is_sentinel(self) -> bool {
        self == Self::NULL || self == Self::ERROR
    }
}

impl fmt::Debug for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NULL => f.write_str("BlockNumber(NULL)"),
            Self::ERROR => f.write_str("BlockNumber(ERROR)"),
            Self(n) => write!(f, "BlockNumber({})", n),
        }
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of boot device, as reported by the channel subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Optical drive; only El Torito applies
    Cdrom,
    /// virtio-blk, usually a DASD image
    Block,
    /// virtio-scsi disk
    Scsi,
}

/// Device self-description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device kind
    pub kind: DeviceKind,

    /// Reported ECKD geometry as `(heads, sectors_per_track)`
    pub geometry: Option<(u8, u8)>,
}

impl DeviceInfo {
    /// Device without reported geometry
    pub fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            geometry: None,
        }
    }

    /// Device reporting its ECKD geometry
    pub fn with_geometry(kind: DeviceKind, heads: u8, sectors_per_track: u8) -> Self {
        Self {
            kind,
            geometry: Some((heads, sectors_per_track)),
        }
    }
}

/// Heap buffer that starts out, and is reset to, `FREE_SPACE_FILLER`
pub struct SectorBuf(Box<[u8]>);

impl SectorBuf {
    /// Allocate `len` fill bytes
    pub fn new(len: usize) -> Self {
        Self(vec![FREE_SPACE_FILLER; len].into_boxed_slice())
    }

    /// Refill with `FREE_SPACE_FILLER`
    pub fn reset(&mut self) {
        self.0.fill(FREE_SPACE_FILLER);
    }
}

impl Deref for SectorBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for SectorBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// Scratch buffers for one IPL
pub struct Scratch {
    /// One sector of the largest supported size
    pub sec: SectorBuf,
    /// Block pointer array
    pub bprs: SectorBuf,
    /// Three adjacent stage-2 sectors for the menu banner lookahead
    pub stage2: SectorBuf,
}

impl Scratch {
    /// Size of the block pointer arena
    pub const BPRS_SIZE: usize = 2 * MAX_SECTOR_SIZE;

    /// Sectors in the stage-2 ring
    pub const STAGE2_RING: usize = 3;

    /// Allocate all buffers
    pub fn new() -> Self {
        Self {
            sec: SectorBuf::new(MAX_SECTOR_SIZE),
            bprs: SectorBuf::new(Self::BPRS_SIZE),
            stage2: SectorBuf::new(Self::STAGE2_RING * MAX_SECTOR_SIZE),
        }
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Boot device with a logical block size and ECKD geometry
pub struct Disk<B: BlockIo> {
    io: B,
    info: DeviceInfo,
    physical_block_size: u32,
    physical_blocks: u64,
    geometry: DeviceGeometry,
}

impl<B: BlockIo> Disk<B> {
    /// Wrap a device
    ///
    /// The logical block size starts out equal to the physical one
    /// (2048 for CD-ROMs).
    pub fn new(mut io: B, info: DeviceInfo) -> Result<Self> {
        let physical_block_size = io.block_size().to_u32();
        if physical_block_size as usize > MAX_SECTOR_SIZE {
            return Err(BootError::Io("device block size larger than 4096"));
        }
        let physical_blocks = io
            .num_blocks()
            .map_err(|_| BootError::Io("cannot query device capacity"))?;

        let block_size = match info.kind {
            DeviceKind::Cdrom => ISO_BLOCK_SIZE,
            DeviceKind::Block | DeviceKind::Scsi => physical_block_size,
        };
        let (heads, sectors_per_track) = info.geometry.unwrap_or((0, 0));
        let geometry = DeviceGeometry {
            heads,
            sectors_per_track,
            block_size,
            total_blocks: physical_blocks.saturating_mul(physical_block_size as u64)
                / block_size as u64,
            is_guessed: false,
        };

        log::debug!(
            "boot device {:?}: {} blocks of {} bytes",
            info.kind,
            geometry.total_blocks,
            block_size
        );

        Ok(Self {
            io,
            info,
            physical_block_size,
            physical_blocks,
            geometry,
        })
    }

    /// Current geometry
    pub fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    /// Logical block size in bytes
    pub fn block_size(&self) -> u32 {
        self.geometry.block_size
    }

    /// Device kind
    pub fn kind(&self) -> DeviceKind {
        self.info.kind
    }

    /// Underlying device
    pub fn io(&self) -> &B {
        &self.io
    }

    fn set_logical(&mut self, block_size: u32, heads: u8, sectors_per_track: u8, is_guessed: bool) {
        self.geometry = DeviceGeometry {
            heads,
            sectors_per_track,
            block_size,
            total_blocks: self.physical_blocks.saturating_mul(self.physical_block_size as u64)
                / block_size as u64,
            is_guessed,
        };
    }

    /// Switch to a guessed DASD geometry
    ///
    /// virtio-blk devices are treated as 4K-formatted DASD; SCSI devices
    /// keep their physical block size. Calling it again is a no-op.
    pub fn assume_eckd(&mut self) {
        let block_size = match self.info.kind {
            DeviceKind::Scsi => self.physical_block_size,
            DeviceKind::Block | DeviceKind::Cdrom => DASD_DEFAULT_BLOCK_SIZE,
        };
        let guessed = DeviceGeometry::guessed(block_size, 0);
        if self.geometry.is_guessed
            && self.geometry.block_size == block_size
            && self.geometry.heads == guessed.heads
            && self.geometry.sectors_per_track == guessed.sectors_per_track
        {
            return;
        }
        log::info!("Using guessed DASD geometry");
        self.set_logical(block_size, guessed.heads, guessed.sectors_per_track, true);
    }

    /// Make sure CHS translation is usable before an ECKD scheme runs
    pub fn ensure_eckd_geometry(&mut self) {
        if self.info.kind == DeviceKind::Scsi
            || self.geometry.block_size != DASD_DEFAULT_BLOCK_SIZE
            || self.geometry.heads == 0
            || self.geometry.sectors_per_track == 0
        {
            self.assume_eckd();
        }
    }

    /// Read the device as 2048-byte ISO sectors
    ///
    /// The sector count is known, so reads stay range checked.
    pub fn assume_iso9660(&mut self) {
        if self.geometry.block_size != ISO_BLOCK_SIZE {
            log::debug!("switching logical block size to {}", ISO_BLOCK_SIZE);
        }
        let guessed = DeviceGeometry::guessed(ISO_BLOCK_SIZE, 0);
        self.set_logical(ISO_BLOCK_SIZE, guessed.heads, guessed.sectors_per_track, false);
    }

    fn check_range(&self, block: BlockNumber, count: u64, what: &'static str) -> Result<()> {
        if block.is_sentinel() {
            log::warn!("{}: read of sentinel block {:?}", what, block);
            return Err(BootError::Malformed("read of a null block pointer"));
        }
        if self.geometry.is_guessed {
            return Ok(());
        }
        match block.0.checked_add(count) {
            Some(end) if end <= self.geometry.total_blocks => Ok(()),
            _ => {
                log::warn!("{}: block {} beyond end of device", what, block);
                Err(BootError::Malformed("block number beyond end of device"))
            }
        }
    }

    /// Read one logical block into the start of `buf`
    ///
    /// The whole of `buf` is reset to `FREE_SPACE_FILLER` first, so bytes
    /// past the block keep the fill value.
    pub fn read_block(&mut self, block: BlockNumber, buf: &mut [u8], what: &'static str) -> Result<()> {
        let block_size = self.block_size() as usize;
        if buf.len() < block_size {
            return Err(BootError::Io("buffer smaller than a block"));
        }
        buf.fill(FREE_SPACE_FILLER);
        self.read_blocks(block, 1, &mut buf[..block_size], what)
    }

    /// Read `count` logical blocks into `dst`
    pub fn read_blocks(
        &mut self,
        block: BlockNumber,
        count: u64,
        dst: &mut [u8],
        what: &'static str,
    ) -> Result<()> {
        self.check_range(block, count, what)?;
        let block_size = self.block_size() as u64;
        let len = count
            .checked_mul(block_size)
            .filter(|&len| len <= dst.len() as u64)
            .ok_or(BootError::Malformed("load does not fit its destination"))?;
        let offset = block
            .0
            .checked_mul(block_size)
            .ok_or(BootError::Malformed("block number overflows device offset"))?;

        log::trace!("{}: reading {} block(s) at {}", what, count, block);
        self.read_at(offset, &mut dst[..len as usize]).map_err(|e| {
            log::error!("{}: read of block {} failed", what, block);
            e
        })
    }

    /// Read `dst.len()` bytes from byte `offset` of the device
    pub fn read_at(&mut self, offset: u64, dst: &mut [u8]) -> Result<()> {
        let phys = self.physical_block_size as u64;
        if offset % phys == 0 && dst.len() as u64 % phys == 0 {
            return self
                .io
                .read_blocks(Lba(offset / phys), dst)
                .map_err(|_| BootError::Io("device read failed"));
        }

        let mut bounce = vec![0u8; phys as usize];
        let mut done = 0usize;
        while done < dst.len() {
            let pos = offset + done as u64;
            let lba = pos / phys;
            let skip = (pos % phys) as usize;
            let take = (phys as usize - skip).min(dst.len() - done);
            self.io
                .read_blocks(Lba(lba), &mut bounce)
                .map_err(|_| BootError::Io("device read failed"))?;
            dst[done..done + take].copy_from_slice(&bounce[skip..skip + take]);
            done += take;
        }
        Ok(())
    }
}
