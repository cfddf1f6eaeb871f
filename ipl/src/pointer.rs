//! Block pointer codec
//!
//! zIPL writes untagged pointer records; which layout a record uses is known
//! only from where it was found. Callers therefore always pass the format.

use crate::disk::{BlockNumber, FREE_SPACE_FILLER};
use crate::error::BootError;
use crate::geometry::{Chs, DeviceGeometry};

/// On-disk pointer layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerFormat {
    /// blockno u64, size u16, blockct u16, 4 reserved
    Scsi,
    /// CHS (5), size u16, count u8
    Eckd,
    /// `Eckd` followed by 8 reserved bytes
    ExtEckd,
}

impl PointerFormat {
    /// Bytes one record occupies in an array
    pub const fn record_size(self) -> usize {
        match self {
            Self::Scsi | Self::ExtEckd => 16,
            Self::Eckd => 8,
        }
    }

    /// Bytes that carry the pointer itself
    ///
    /// Only these are checked against the fill byte.
    pub const fn pointer_len(self) -> usize {
        match self {
            Self::Scsi => 16,
            Self::Eckd | Self::ExtEckd => 8,
        }
    }
}

/// A decoded pointer: `run_length + 1` blocks starting at `block_number`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    /// First block
    pub block_number: BlockNumber,
    /// Extra blocks after the first
    pub run_length: u16,
    /// Block size the writer assumed, when recorded
    pub declared_block_size: Option<u32>,
}

impl BlockRef {
    /// End-of-chain marker
    pub const NULL: Self = Self {
        block_number: BlockNumber::NULL,
        run_length: 0,
        declared_block_size: None,
    };

    /// Blocks covered
    pub fn blocks(&self) -> u32 {
        self.run_length as u32 + 1
    }
}

/// Why a pointer could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerError {
    /// Record is corrupt
    Malformed(&'static str),
    /// List-directed pointer is unusable; fall back to CCW IPL
    RetryCcw,
}

impl From<PointerError> for BootError {
    fn from(err: PointerError) -> Self {
        match err {
            PointerError::Malformed(msg) => BootError::Malformed(msg),
            PointerError::RetryCcw => BootError::RetryCcw,
        }
    }
}

/// Is every byte of `raw` the free space filler?
pub fn is_unused(raw: &[u8]) -> bool {
    raw.iter().all(|&b| b == FREE_SPACE_FILLER)
}

/// Decode one pointer record
///
/// An all-fill record is `BlockRef::NULL`, and so is an all-zero CHS outside
/// list-directed mode. For ECKD formats the CHS is
/// validated against `geometry`; with `list_directed` an invalid address is
/// the soft `RetryCcw` signal and the size field is ignored.
pub fn decode(
    raw: &[u8],
    format: PointerFormat,
    list_directed: bool,
    geometry: &DeviceGeometry,
) -> Result<BlockRef, PointerError> {
    let raw = raw
        .get(..format.record_size())
        .ok_or(PointerError::Malformed("truncated block pointer"))?;
    if is_unused(&raw[..format.pointer_len()]) {
        return Ok(BlockRef::NULL);
    }

    match format {
        PointerFormat::Scsi => {
            let mut blockno = [0u8; 8];
            blockno.copy_from_slice(&raw[0..8]);
            let block_number = BlockNumber(u64::from_be_bytes(blockno));
            if block_number.is_null() {
                return Ok(BlockRef::NULL);
            }
            if block_number == BlockNumber::ERROR {
                return Err(PointerError::Malformed("block pointer marked as error"));
            }
            Ok(BlockRef {
                block_number,
                run_length: u16::from_be_bytes([raw[10], raw[11]]),
                declared_block_size: Some(u16::from_be_bytes([raw[8], raw[9]]) as u32),
            })
        }
        PointerFormat::Eckd | PointerFormat::ExtEckd => {
            let chs = Chs::from_bytes(raw).ok_or(PointerError::Malformed("truncated CHS"))?;
            // zipl zero-fills the slots after the last pointer
            if !list_directed && chs == Chs::default() {
                return Ok(BlockRef::NULL);
            }
            if !geometry.is_valid_chs(chs) {
                log::debug!("invalid CHS {:?}", chs);
                return Err(if list_directed {
                    PointerError::RetryCcw
                } else {
                    PointerError::Malformed("invalid CHS address in block pointer")
                });
            }
            Ok(BlockRef {
                block_number: geometry.chs_to_block(chs),
                run_length: raw[7] as u16,
                declared_block_size: if list_directed {
                    None
                } else {
                    Some(u16::from_be_bytes([raw[5], raw[6]]) as u32)
                },
            })
        }
    }
}
