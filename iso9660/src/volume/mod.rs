//! Volume descriptor parsing
//!
//! ISO9660 volume descriptors start at sector 16 and describe the filesystem layout.
//! Multiple descriptors may be present (Primary, Supplementary, Boot Record).

pub mod boot_record;
pub mod primary;

use crate::directory::record::DirectoryRecord;
use crate::error::{Iso9660Error, Result};
use crate::types::{VolumeDescriptorType, VolumeInfo, SECTOR_SIZE, VOLUME_DESCRIPTOR_START};
use alloc::vec;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

/// Upper bound on descriptors scanned before giving up on a terminator
const MAX_DESCRIPTORS: u64 = 100;

/// Mount an ISO9660 volume from a block device
///
/// Reads volume descriptors starting at sector 16 and builds VolumeInfo.
/// The scan stops at the terminator or at the first descriptor that does not
/// carry a valid header.
///
/// # Arguments
/// * `block_io` - Block device with 2048-byte blocks
/// * `start_sector` - Starting sector of the ISO (0 if raw ISO)
pub fn mount<B: BlockIo>(block_io: &mut B, start_sector: u64) -> Result<VolumeInfo> {
    let mut buffer = vec![0u8; SECTOR_SIZE];
    let mut boot_catalog_lba: Option<u32> = None;
    let mut volume_info: Option<VolumeInfo> = None;

    for sector in VOLUME_DESCRIPTOR_START..VOLUME_DESCRIPTOR_START + MAX_DESCRIPTORS {
        block_io
            .read_blocks(Lba(start_sector + sector), &mut buffer)
            .map_err(|_| Iso9660Error::IoError)?;

        let Some(header) = VolumeDescriptorHeader::parse(&buffer) else {
            if sector == VOLUME_DESCRIPTOR_START {
                return Err(Iso9660Error::InvalidSignature);
            }
            break;
        };

        match header.descriptor_type() {
            Some(VolumeDescriptorType::BootRecord) => {
                if let Some(lba) = boot_record::catalog_lba(&buffer) {
                    log::debug!("El Torito boot record at sector {}, catalog at {}", sector, lba);
                    boot_catalog_lba = Some(lba);
                }
            }
            Some(VolumeDescriptorType::Primary) => {
                let pvd = primary::parse(&buffer)?;
                let root = DirectoryRecord::parse(&pvd.root_directory_record)?;
                volume_info = Some(VolumeInfo {
                    volume_id: pvd.volume_id,
                    root_extent_lba: root.extent_lba(),
                    root_extent_len: root.data_length(),
                    logical_block_size: pvd.logical_block_size,
                    volume_space_size: pvd.volume_space_size,
                    boot_catalog_lba: None,
                });
            }
            Some(VolumeDescriptorType::Terminator) => break,
            _ => {}
        }
    }

    let mut info = volume_info.ok_or(Iso9660Error::InvalidSignature)?;
    info.boot_catalog_lba = boot_catalog_lba;
    Ok(info)
}

/// Volume Descriptor header (first 7 bytes of each descriptor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeDescriptorHeader {
    /// Type code (0=boot, 1=primary, 2=supplementary, 3=partition, 255=terminator)
    pub type_code: u8,

    /// Version (always 1)
    pub version: u8,
}

impl VolumeDescriptorHeader {
    /// CD001 magic bytes
    pub const MAGIC: &'static [u8; 5] = b"CD001";

    /// Parse and validate the header at the start of a descriptor sector
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 7 || &data[1..6] != Self::MAGIC {
            return None;
        }
        let header = Self {
            type_code: data[0],
            version: data[6],
        };
        header.validate().then_some(header)
    }

    /// Check if header is valid
    pub fn validate(&self) -> bool {
        self.version == 1
            && (self.type_code <= VolumeDescriptorType::Partition as u8
                || self.type_code == VolumeDescriptorType::Terminator as u8)
    }

    /// Decode the type code
    pub fn descriptor_type(&self) -> Option<VolumeDescriptorType> {
        match self.type_code {
            0 => Some(VolumeDescriptorType::BootRecord),
            1 => Some(VolumeDescriptorType::Primary),
            2 => Some(VolumeDescriptorType::Supplementary),
            3 => Some(VolumeDescriptorType::Partition),
            255 => Some(VolumeDescriptorType::Terminator),
            _ => None,
        }
    }
}
