//! Error types for the IPL loader
//!
//! Every failure falls in one of a few kinds, and the kind alone decides
//! whether the dispatcher tries the next boot scheme.

use core::fmt;

/// Result type for IPL operations
pub type Result<T> = core::result::Result<T, BootError>;

/// Errors that can occur while interpreting boot records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// The device failed a read. Never retried.
    Io(&'static str),

    /// The scheme's signature is absent; try the next scheme
    NotApplicable(&'static str),

    /// The signature is present but the structure is corrupt
    Malformed(&'static str),

    /// The request is well formed but not allowed (bad loadparm, no exec entry)
    Policy(&'static str),

    /// List-directed IPL hit data it cannot use; boot the classic CCW way
    RetryCcw,
}

impl BootError {
    /// Get error message
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Io(msg)
            | Self::NotApplicable(msg)
            | Self::Malformed(msg)
            | Self::Policy(msg) => msg,
            Self::RetryCcw => "retrying list-directed IPL as CCW IPL",
        }
    }

    /// Does this error end the whole IPL regardless of fallbacks?
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Policy(_))
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
            Self::NotApplicable(msg) => write!(f, "not applicable: {}", msg),
            Self::Malformed(msg) => write!(f, "malformed boot record: {}", msg),
            Self::Policy(msg) => write!(f, "{}", msg),
            Self::RetryCcw => f.write_str(self.as_str()),
        }
    }
}
