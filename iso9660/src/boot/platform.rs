//! Boot platform identifiers

use crate::types::BootPlatform;

impl BootPlatform {
    /// Parse from validation entry platform ID
    ///
    /// Only the three platforms the s390 loader accepts are recognised.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x00 => Some(BootPlatform::X86),
            0x01 => Some(BootPlatform::PowerPC),
            0x02 => Some(BootPlatform::Mac),
            _ => None,
        }
    }
}
