//! Little-endian field readers
//!
//! ISO9660 stores most integers "both-endian" (LE copy then BE copy); only
//! the little-endian half is read.

/// Read a little-endian u16 from the first two bytes
pub fn le_u16(data: &[u8]) -> u16 {
    u16::from_le_bytes([data[0], data[1]])
}

/// Read a little-endian u32 from the first four bytes
pub fn le_u32(data: &[u8]) -> u32 {
    u32::from_le_bytes([data[0], data[1], data[2], data[3]])
}

/// Read a both-endian u16 (4 bytes)
pub fn both_endian_u16(data: &[u8]) -> u16 {
    le_u16(data)
}

/// Read a both-endian u32 (8 bytes)
pub fn both_endian_u32(data: &[u8]) -> u32 {
    le_u32(data)
}
