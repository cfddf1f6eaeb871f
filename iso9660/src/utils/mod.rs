//! Byte and sector helpers

pub mod bytes;
pub mod sector;
