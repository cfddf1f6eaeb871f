//! ISO9660 boot support for the s390 CCW loader
//!
//! A `no_std` reader for exactly the parts of ISO9660 and El Torito that a
//! firmware loader needs to boot a CD image without a filesystem driver.
//!
//! # Overview
//!
//! - Volume descriptor parsing (Primary, Boot Record)
//! - A bounded, iterative directory walk that recovers the real size of
//!   the file behind an extent
//! - El Torito boot catalog validation and section entry selection
//!
//! # Architecture
//!
//! The implementation is layered:
//! 1. **Volume layer** - Parses volume descriptors from sectors 16+
//! 2. **Directory layer** - Walks directory records with an explicit stack
//! 3. **Boot layer** - El Torito boot catalog parsing
//!
//! All reads go through [`gpt_disk_io::BlockIo`] with 2048-byte blocks.
//!
//! # Usage
//!
//! ```ignore
//! use iso9660::{mount, find_boot_entry, extent_size};
//!
//! let volume = mount(&mut block_io, 0)?;
//! let entry = find_boot_entry(&mut block_io, &volume, loadparm)?;
//! let size = extent_size(&mut block_io, &volume, entry.load_rba)?;
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod boot;
pub mod directory;
pub mod error;
pub mod types;
pub mod utils;
pub mod volume;

pub use error::{Iso9660Error, Result};
pub use types::{BootCatalogEntry, BootPlatform, VolumeInfo};

pub use boot::{find_boot_entry, read_boot_catalog, BootCatalog};
pub use directory::extent_size;
pub use volume::mount;
