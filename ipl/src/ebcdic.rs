//! The few EBCDIC code points the loader interprets itself
//!
//! Full code page conversion belongs to the console.

/// `zIPL`
pub const ZIPL_MAGIC: [u8; 4] = [0xA9, 0xC9, 0xD7, 0xD3];
/// `VOL1`
pub const VOL1_MAGIC: [u8; 4] = [0xE5, 0xD6, 0xD3, 0xF1];
/// `LNX1`
pub const LNX1_MAGIC: [u8; 4] = [0xD3, 0xD5, 0xE7, 0xF1];
/// `CMS1`
pub const CMS1_MAGIC: [u8; 4] = [0xC3, 0xD4, 0xE2, 0xF1];
/// `IPL1`
pub const IPL1_MAGIC: [u8; 4] = [0xC9, 0xD7, 0xD3, 0xF1];
/// `IPL2`
pub const IPL2_MAGIC: [u8; 4] = [0xC9, 0xD7, 0xD3, 0xF2];

/// Blank
pub const SPACE: u8 = 0x40;

/// Value of a decimal digit
pub fn digit(b: u8) -> Option<u8> {
    (0xF0..=0xF9).contains(&b).then(|| b - 0xF0)
}

/// ASCII for digits, letters and blank; `.` for anything else
pub fn to_ascii(b: u8) -> u8 {
    match b {
        SPACE => b' ',
        0xF0..=0xF9 => b'0' + (b - 0xF0),
        0xC1..=0xC9 => b'A' + (b - 0xC1),
        0xD1..=0xD9 => b'J' + (b - 0xD1),
        0xE2..=0xE9 => b'S' + (b - 0xE2),
        0x81..=0x89 => b'a' + (b - 0x81),
        0x91..=0x99 => b'j' + (b - 0x91),
        0xA2..=0xA9 => b's' + (b - 0xA2),
        _ => b'.',
    }
}

/// Decode a volume serial for display
pub fn volser(raw: &[u8; 6]) -> [u8; 6] {
    raw.map(to_ascii)
}
