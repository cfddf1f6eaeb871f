//! Iterative directory walk
//!
//! El Torito records an image length in 512-byte units that writers round
//! up, so the only exact size of a boot image is the directory record that
//! points at its extent. The walk finds that record without recursion,
//! holding at most `MAX_DIRECTORY_DEPTH` open directories.

use crate::directory::record::DirectoryRecord;
use crate::error::{Iso9660Error, Result};
use crate::types::{VolumeInfo, MAX_DIRECTORY_DEPTH, SECTOR_SIZE};
use alloc::vec;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

/// Position inside one open directory
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    /// Sector currently being scanned
    sector: u32,
    /// Byte offset inside `sector`
    offset: usize,
    /// Directory bytes not yet scanned, counted from `offset`
    remaining: u32,
}

impl Frame {
    fn new(extent_lba: u32, data_length: u32) -> Self {
        Self {
            sector: extent_lba,
            offset: 0,
            remaining: data_length,
        }
    }

    /// Skip `len` bytes, moving to the next sector at the boundary
    fn advance(&mut self, len: usize) {
        self.offset += len;
        self.remaining = self.remaining.saturating_sub(len as u32);
        if self.offset >= SECTOR_SIZE {
            self.sector = self.sector.wrapping_add(1);
            self.offset = 0;
        }
    }
}

/// Fixed-capacity stack of open directories
struct FrameStack {
    frames: [Frame; MAX_DIRECTORY_DEPTH],
    len: usize,
}

impl FrameStack {
    fn new() -> Self {
        Self {
            frames: [Frame::default(); MAX_DIRECTORY_DEPTH],
            len: 0,
        }
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        let slot = self
            .frames
            .get_mut(self.len)
            .ok_or(Iso9660Error::DirectoryTooDeep)?;
        *slot = frame;
        self.len += 1;
        Ok(())
    }

    fn pop(&mut self) {
        self.len = self.len.saturating_sub(1);
    }

    fn top(&mut self) -> Option<&mut Frame> {
        self.len.checked_sub(1).map(|i| &mut self.frames[i])
    }
}

/// Size in bytes of the file whose extent starts at `lba`
///
/// Walks the tree from the root directory of `volume`. Subdirectories are
/// entered as they are met; "." and ".." are skipped.
///
/// # Errors
/// * `NotFound` - no file record points at `lba`
/// * `DirectoryTooDeep` - the tree nests deeper than `MAX_DIRECTORY_DEPTH`
/// * `InvalidDirectoryRecord` - a record overruns its sector
/// * `IoError` - a directory sector could not be read
pub fn extent_size<B: BlockIo>(block_io: &mut B, volume: &VolumeInfo, lba: u32) -> Result<u32> {
    let mut buffer = vec![0u8; SECTOR_SIZE];
    let mut loaded: Option<u32> = None;
    let mut stack = FrameStack::new();
    stack.push(Frame::new(volume.root_extent_lba, volume.root_extent_len))?;

    while let Some(frame) = stack.top() {
        if frame.remaining == 0 {
            stack.pop();
            continue;
        }

        if loaded != Some(frame.sector) {
            block_io
                .read_blocks(Lba(frame.sector as u64), &mut buffer)
                .map_err(|_| Iso9660Error::IoError)?;
            loaded = Some(frame.sector);
        }

        let tail = &buffer[frame.offset..];
        if tail[0] == 0 {
            // Zero length pads the rest of the sector
            let pad = tail.len();
            frame.advance(pad);
            continue;
        }

        let record = DirectoryRecord::parse(tail)?;
        frame.advance(record.length());

        if record.is_self_or_parent() {
            continue;
        }
        if record.is_directory() {
            log::trace!("descending into directory at sector {}", record.extent_lba());
            stack.push(Frame::new(record.extent_lba(), record.data_length()))?;
        } else if record.extent_lba() == lba {
            return Ok(record.data_length());
        }
    }

    Err(Iso9660Error::NotFound)
}
