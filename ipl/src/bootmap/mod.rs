//! zIPL boot map parsers
//!
//! Both the ECKD boot map scripts and the SCSI component tables use the
//! same 32-byte entry layout: a block pointer, padding, a type byte and a
//! 64-bit address (load address, or the PSW for the exec entry).

pub mod eckd;
pub mod scsi;

use crate::chain::ChainFormat;
use crate::error::{BootError, Result};
use crate::geometry::DeviceGeometry;
use crate::pointer::decode;
use crate::script::{BootScript, BootScriptBuilder, ExecTarget};

/// ASCII `zIPL`
pub const ZIPL_MAGIC: [u8; 4] = *b"zIPL";

/// Script / component header size
pub const SCRIPT_HEADER_SIZE: usize = 32;

/// Script / component entry size
pub const SCRIPT_ENTRY_SIZE: usize = 32;

/// Entry type: start the program
pub const ENTRY_EXEC: u8 = 1;
/// Entry type: load a component
pub const ENTRY_LOAD: u8 = 2;
/// Entry type: component signature
pub const ENTRY_SIGNATURE: u8 = 3;

/// Offset of the type byte inside an entry
const ENTRY_TYPE_OFFSET: usize = 23;

/// Offset of the address inside an entry
const ENTRY_ADDRESS_OFFSET: usize = 24;

pub(crate) fn be_u32(raw: &[u8]) -> u32 {
    u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])
}

pub(crate) fn be_u64(raw: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&raw[..8]);
    u64::from_be_bytes(bytes)
}

/// Turn the entries of a script block into a `BootScript`
///
/// `block` holds one block; entries start after the header and are read up
/// to the first entry that is neither a load nor a signature.
pub(crate) fn parse_script_entries(
    block: &[u8],
    chain: ChainFormat,
    list_directed: bool,
    geometry: &DeviceGeometry,
) -> Result<BootScript> {
    let mut builder = BootScriptBuilder::new();
    let entries = block
        .get(SCRIPT_HEADER_SIZE..)
        .unwrap_or(&[])
        .chunks_exact(SCRIPT_ENTRY_SIZE);

    for (i, entry) in entries.enumerate() {
        let address = be_u64(&entry[ENTRY_ADDRESS_OFFSET..]);
        match entry[ENTRY_TYPE_OFFSET] {
            ENTRY_LOAD => {
                let r = decode(&entry[..16], chain.pointer_format(), list_directed, geometry)?;
                if r.block_number.is_null() {
                    log::warn!("script entry {} has no block pointer", i);
                    return Err(BootError::Malformed("load entry without block pointer"));
                }
                log::debug!("script entry {}: load {} to {:#x}", i, r.block_number, address);
                builder.load_chain(r.block_number, chain, list_directed, address);
            }
            ENTRY_SIGNATURE => {
                log::debug!("script entry {}: signature (ignored)", i);
                builder.signature();
            }
            ENTRY_EXEC => {
                log::debug!("script entry {}: exec PSW {:#018x}", i, address);
                return Ok(builder.finish(ExecTarget::ResetPsw(address)));
            }
            other => {
                if list_directed {
                    log::info!("list-directed script entry type {}, retrying as CCW IPL", other);
                    return Err(BootError::RetryCcw);
                }
                log::warn!("unknown script entry type {}", other);
                return Err(BootError::Malformed("unknown script entry type"));
            }
        }
    }

    log::warn!("boot script runs past the end of its block");
    Err(BootError::Malformed("boot script overruns its block"))
}
