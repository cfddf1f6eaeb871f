//! Boot configuration
//!
//! The loadparm and the IPL menu flags arrive from the machine's IPL
//! parameter block. `BootConfig::new` folds them into the menu behaviour
//! every scheme sees.

use crate::error::{BootError, Result};

/// Length of the loadparm field
pub const LOADPARM_LEN: usize = 8;

/// QIPL flag: interactive command-style boot menu
pub const QIPL_FLAG_BM_OPTS_CMD: u8 = 0x80;

/// QIPL flag: honour the zIPL menu stored on disk
pub const QIPL_FLAG_BM_OPTS_ZIPL: u8 = 0x40;

/// Operator's loadparm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loadparm {
    /// Blank; boot the default entry
    Unset,
    /// `PROMPT`; always show the menu
    Prompt,
    /// Explicit boot entry
    Index(u32),
}

impl Loadparm {
    /// Parse the raw ASCII loadparm
    ///
    /// Trailing blanks and NULs are padding.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() > LOADPARM_LEN {
            return Err(BootError::Policy("loadparm longer than 8 characters"));
        }
        let end = raw
            .iter()
            .rposition(|&b| b != b' ' && b != 0)
            .map_or(0, |i| i + 1);
        let value = &raw[..end];

        if value.is_empty() {
            return Ok(Self::Unset);
        }
        if value == b"PROMPT" {
            return Ok(Self::Prompt);
        }
        if !value.iter().all(u8::is_ascii_digit) {
            return Err(BootError::Policy("loadparm must be blank, PROMPT or a number"));
        }
        value
            .iter()
            .try_fold(0u32, |acc, &d| acc.checked_mul(10)?.checked_add((d - b'0') as u32))
            .map(Self::Index)
            .ok_or(BootError::Policy("loadparm value out of range"))
    }
}

/// Which boot menu the machine asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuMode {
    /// No menu
    Disabled,
    /// Show the zIPL menu if the disk enables it
    Zipl,
    /// Always prompt
    Command,
}

impl MenuMode {
    /// Decode the QIPL boot menu flags
    pub fn from_qipl_flags(flags: u8) -> Self {
        if flags & QIPL_FLAG_BM_OPTS_CMD != 0 {
            Self::Command
        } else if flags & QIPL_FLAG_BM_OPTS_ZIPL != 0 {
            Self::Zipl
        } else {
            Self::Disabled
        }
    }
}

/// Effective boot configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    /// Operator's loadparm
    pub loadparm: Loadparm,

    /// Menu mode after applying the loadparm
    pub menu: MenuMode,

    /// Menu timeout; `None` waits forever
    pub menu_timeout_ms: Option<u32>,
}

impl BootConfig {
    /// Apply the menu setup rules
    ///
    /// `PROMPT` forces the command menu with no timeout, an explicit index
    /// disables the menu, and a blank loadparm keeps the configured mode.
    pub fn new(loadparm: Loadparm, menu: MenuMode, menu_timeout_ms: Option<u32>) -> Self {
        let (menu, menu_timeout_ms) = match loadparm {
            Loadparm::Prompt => (MenuMode::Command, None),
            Loadparm::Index(_) => (MenuMode::Disabled, None),
            Loadparm::Unset => (menu, menu_timeout_ms.filter(|&t| t != 0)),
        };
        Self {
            loadparm,
            menu,
            menu_timeout_ms,
        }
    }

    /// Index the loadparm selects when no menu is shown
    pub fn boot_index(&self) -> u32 {
        match self.loadparm {
            Loadparm::Index(index) => index,
            Loadparm::Unset | Loadparm::Prompt => 0,
        }
    }

    /// ECKD schemes consult the on-disk zIPL menu
    pub fn zipl_menu_enabled(&self) -> bool {
        matches!(self.menu, MenuMode::Zipl | MenuMode::Command)
    }

    /// SCSI and ISO schemes offer their entries in a generated menu
    pub fn enum_menu_enabled(&self) -> bool {
        self.menu == MenuMode::Command
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::new(Loadparm::Unset, MenuMode::Disabled, None)
    }
}
