//! Directory Record structure
//!
//! Directory records describe files and subdirectories. Each record is
//! variable length and never spans a sector boundary.

use crate::error::{Iso9660Error, Result};
use crate::utils::bytes::both_endian_u32;

/// Parsed view of one directory record
#[derive(Debug, Clone, Copy)]
pub struct DirectoryRecord<'a> {
    data: &'a [u8],
}

impl<'a> DirectoryRecord<'a> {
    /// Minimum record length
    pub const MIN_LENGTH: usize = 34;

    /// Offset of the file identifier
    const ID_OFFSET: usize = 33;

    /// Parse directory record from bytes
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < Self::MIN_LENGTH {
            return Err(Iso9660Error::InvalidDirectoryRecord);
        }

        let length = data[0] as usize;
        if length < Self::MIN_LENGTH || length > data.len() {
            return Err(Iso9660Error::InvalidDirectoryRecord);
        }

        // BP 33 holds the identifier length; the identifier must fit the record
        if Self::ID_OFFSET + data[32] as usize > length {
            return Err(Iso9660Error::InvalidDirectoryRecord);
        }

        Ok(Self {
            data: &data[..length],
        })
    }

    /// Record length in bytes
    pub fn length(&self) -> usize {
        self.data.len()
    }

    /// Extent location (little-endian part of both-endian field)
    pub fn extent_lba(&self) -> u32 {
        both_endian_u32(&self.data[2..10])
    }

    /// Data length (little-endian part)
    pub fn data_length(&self) -> u32 {
        both_endian_u32(&self.data[10..18])
    }

    /// Is this a directory?
    pub fn is_directory(&self) -> bool {
        self.data[25] & 0x02 != 0
    }

    /// Get file identifier bytes
    pub fn file_identifier(&self) -> &'a [u8] {
        let len = self.data[32] as usize;
        &self.data[Self::ID_OFFSET..Self::ID_OFFSET + len]
    }

    /// The "." or ".." entry of a directory
    pub fn is_self_or_parent(&self) -> bool {
        matches!(self.file_identifier(), [0x00] | [0x01])
    }
}
