//! Error types for ISO9660 operations

use core::fmt;

/// Result type for ISO9660 operations
pub type Result<T> = core::result::Result<T, Iso9660Error>;

/// Errors that can occur during ISO9660 operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iso9660Error {
    /// I/O error reading from block device
    IoError,

    /// Invalid volume descriptor signature
    InvalidSignature,

    /// Unsupported ISO9660 version
    UnsupportedVersion,

    /// Corrupted directory record
    InvalidDirectoryRecord,

    /// No directory record describes the requested extent
    NotFound,

    /// Directory tree nests deeper than `MAX_DIRECTORY_DEPTH`
    DirectoryTooDeep,

    /// Boot record not found
    NoBootRecord,

    /// Invalid boot catalog
    InvalidBootCatalog,

    /// Catalog is valid but holds no usable section entry
    NoBootEntry,
}

impl fmt::Display for Iso9660Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "I/O error reading block device"),
            Self::InvalidSignature => write!(f, "Invalid volume descriptor signature"),
            Self::UnsupportedVersion => write!(f, "Unsupported ISO9660 version"),
            Self::InvalidDirectoryRecord => write!(f, "Corrupted directory record"),
            Self::NotFound => write!(f, "No directory record for extent"),
            Self::DirectoryTooDeep => write!(f, "ISO-9660 directory depth limit exceeded"),
            Self::NoBootRecord => write!(f, "Boot record volume descriptor not found"),
            Self::InvalidBootCatalog => write!(f, "Invalid El Torito boot catalog"),
            Self::NoBootEntry => write!(f, "No suitable boot entry found on ISO-9660 media"),
        }
    }
}
