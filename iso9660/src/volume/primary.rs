//! Primary Volume Descriptor parsing
//!
//! The Primary Volume Descriptor (PVD) is always present and describes
//! the basic ISO9660 filesystem structure.

use crate::error::{Iso9660Error, Result};
use crate::types::VolumeDescriptorType;
use crate::utils::bytes::{both_endian_u16, both_endian_u32};

/// Offset of the embedded root directory record
pub const ROOT_RECORD_OFFSET: usize = 156;

/// Length of the embedded root directory record
pub const ROOT_RECORD_LEN: usize = 34;

/// Primary Volume Descriptor fields the loader uses
///
/// See ECMA-119 8.4 for full specification
#[derive(Debug, Clone)]
pub struct PrimaryVolumeDescriptor {
    /// Volume identifier (32 d-characters)
    pub volume_id: [u8; 32],

    /// Volume space size in logical blocks
    pub volume_space_size: u32,

    /// Logical block size (usually 2048)
    pub logical_block_size: u16,

    /// Root directory record (34 bytes)
    pub root_directory_record: [u8; ROOT_RECORD_LEN],
}

/// Parse Primary Volume Descriptor from sector data
pub fn parse(data: &[u8]) -> Result<PrimaryVolumeDescriptor> {
    if data.len() < ROOT_RECORD_OFFSET + ROOT_RECORD_LEN {
        return Err(Iso9660Error::InvalidSignature);
    }
    if data[0] != VolumeDescriptorType::Primary as u8 || &data[1..6] != b"CD001" {
        return Err(Iso9660Error::InvalidSignature);
    }
    if data[6] != 1 {
        return Err(Iso9660Error::UnsupportedVersion);
    }

    let mut volume_id = [0u8; 32];
    volume_id.copy_from_slice(&data[40..72]);
    let mut root_directory_record = [0u8; ROOT_RECORD_LEN];
    root_directory_record
        .copy_from_slice(&data[ROOT_RECORD_OFFSET..ROOT_RECORD_OFFSET + ROOT_RECORD_LEN]);

    Ok(PrimaryVolumeDescriptor {
        volume_id,
        volume_space_size: both_endian_u32(&data[80..88]),
        logical_block_size: both_endian_u16(&data[128..132]),
        root_directory_record,
    })
}
