//! ECKD cylinder/head/sector translation
//!
//! DASD addresses records by CHS. Cylinders above 65535 borrow the upper
//! twelve bits of the head field, so only the low nibble of `head` is the
//! track within the cylinder.

use crate::disk::BlockNumber;

/// Heads per cylinder assumed when the device cannot report its geometry
pub const GUESSED_HEADS: u8 = 15;

/// Track number bits of the head field
const HEAD_TRACK_MASK: u16 = 0x000F;

/// Cylinder extension bits of the head field
const HEAD_CYL_MASK: u16 = 0xFFF0;

/// Records per track assumed for a given block size
///
/// Unknown block sizes yield 0, which makes every CHS address invalid.
pub const fn guessed_sectors_per_track(block_size: u32) -> u8 {
    match block_size {
        512 => 49,
        1024 => 33,
        2048 => 21,
        4096 => 12,
        _ => 0,
    }
}

/// An on-disk cylinder/head/sector address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chs {
    /// Low 16 bits of the cylinder
    pub cylinder: u16,
    /// Track in the low nibble, cylinder bits 16..28 above it
    pub head: u16,
    /// Record on the track, 1-based
    pub sector: u8,
}

impl Chs {
    /// On-disk size
    pub const SIZE: usize = 5;

    /// Decode a big-endian CHS triple
    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        let raw = raw.get(..Self::SIZE)?;
        Some(Self {
            cylinder: u16::from_be_bytes([raw[0], raw[1]]),
            head: u16::from_be_bytes([raw[2], raw[3]]),
            sector: raw[4],
        })
    }

    /// Encode as stored on disk
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let c = self.cylinder.to_be_bytes();
        let h = self.head.to_be_bytes();
        [c[0], c[1], h[0], h[1], self.sector]
    }

    /// Cylinder including the bits carried in `head`
    pub fn extended_cylinder(&self) -> u64 {
        self.cylinder as u64 + (((self.head & HEAD_CYL_MASK) as u64) << 12)
    }

    /// Track within the cylinder
    pub fn track(&self) -> u16 {
        self.head & HEAD_TRACK_MASK
    }
}

/// Device geometry used for CHS translation and range checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    /// Tracks per cylinder
    pub heads: u8,
    /// Records per track
    pub sectors_per_track: u8,
    /// Bytes per block
    pub block_size: u32,
    /// Device capacity in blocks; not trusted when guessed
    pub total_blocks: u64,
    /// Set when the geometry was assumed rather than reported
    pub is_guessed: bool,
}

impl DeviceGeometry {
    /// Assumed DASD geometry for `block_size`
    pub fn guessed(block_size: u32, total_blocks: u64) -> Self {
        Self {
            heads: GUESSED_HEADS,
            sectors_per_track: guessed_sectors_per_track(block_size),
            block_size,
            total_blocks,
            is_guessed: true,
        }
    }

    /// Linear block number of `chs`
    ///
    /// Arithmetic wraps; callers validate with `is_valid_chs` first.
    pub fn chs_to_block(&self, chs: Chs) -> BlockNumber {
        let spt = self.sectors_per_track as u64;
        let heads = self.heads as u64;
        let block = spt
            .wrapping_mul(heads)
            .wrapping_mul(chs.extended_cylinder())
            .wrapping_add(spt.wrapping_mul(chs.track() as u64))
            .wrapping_add(chs.sector as u64)
            .wrapping_sub(1);
        BlockNumber(block)
    }

    /// Is `chs` addressable on this device?
    pub fn is_valid_chs(&self, chs: Chs) -> bool {
        if chs.track() >= self.heads as u16
            || chs.sector == 0
            || chs.sector > self.sectors_per_track
        {
            return false;
        }
        self.is_guessed || self.chs_to_block(chs).0 < self.total_blocks
    }

    /// CHS address of `block`, or `None` if it cannot be encoded
    pub fn block_to_chs(&self, block: BlockNumber) -> Option<Chs> {
        let spt = self.sectors_per_track as u64;
        let heads = self.heads as u64;
        if spt == 0 || heads == 0 || heads > (HEAD_TRACK_MASK as u64 + 1) {
            return None;
        }

        let sector = block.0 % spt + 1;
        let track = block.0 / spt;
        let head = track % heads;
        let cylinder = track / heads;
        let upper = cylinder >> 16;
        if upper > (HEAD_CYL_MASK >> 4) as u64 {
            return None;
        }

        Some(Chs {
            cylinder: (cylinder & 0xFFFF) as u16,
            head: ((upper as u16) << 4) | head as u16,
            sector: sector as u8,
        })
    }
}
