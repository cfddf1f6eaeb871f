//! zIPL boot-record interpreter for s390 CCW firmware
//!
//! Reads the boot records that `zipl` and El Torito mastering tools write,
//! turns them into a [`BootScript`] and loads that script into guest
//! memory. Supported layouts:
//!
//! - ECKD DASD: CDL, LDL, CMS, unlabeled and list-directed
//! - SCSI disks with a zIPL master boot record
//! - ISO9660 media with an El Torito boot catalog
//!
//! # Architecture
//!
//! 1. **Geometry** - CHS to block translation ([`geometry`])
//! 2. **Pointers** - block pointer decoding per device format ([`pointer`])
//! 3. **Chains** - block pointer arrays with continuations ([`chain`])
//! 4. **Boot maps** - per-layout parsers producing a script ([`bootmap`], [`iso`])
//! 5. **Scripts** - loading and entry point resolution ([`script`])
//! 6. **Dispatch** - the order in which layouts are tried ([`dispatch`])
//!
//! The device is any [`gpt_disk_io::BlockIo`]; guest memory, the menu UI and
//! the final jump come from a [`Machine`].
//!
//! # Usage
//!
//! ```ignore
//! use ccw_ipl::{ipl, BootConfig, DeviceInfo, DeviceKind, Disk, Loadparm, MenuMode};
//!
//! let disk = Disk::new(virtio_blk, DeviceInfo::new(DeviceKind::Block))?;
//! let config = BootConfig::new(Loadparm::parse(&loadparm)?, MenuMode::from_qipl_flags(flags), None);
//! let err = ipl(disk, machine, config).unwrap_err();
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod bootmap;
pub mod chain;
pub mod config;
pub mod disk;
pub mod dispatch;
pub mod ebcdic;
pub mod error;
pub mod geometry;
pub mod iso;
pub mod machine;
pub mod menu;
pub mod pointer;
pub mod script;

pub use config::{BootConfig, Loadparm, MenuMode};
pub use disk::{BlockNumber, DeviceInfo, DeviceKind, Disk, Scratch};
pub use dispatch::{ipl, Dispatcher, Scheme, Session};
pub use error::{BootError, Result};
pub use geometry::{Chs, DeviceGeometry};
pub use machine::Machine;
pub use menu::{BootMenu, MenuIndex, MenuStyle, ValidEntries};
pub use script::{BootScript, BootScriptEntry, EntryPoint, ExecTarget};
