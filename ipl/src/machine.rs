//! The guest machine the loader runs on

use crate::menu::BootMenu;
use crate::script::EntryPoint;

/// Firmware services the loader depends on
///
/// Implemented by the firmware for real hardware, and by a recording mock
/// in tests.
pub trait Machine {
    /// Guest memory `[address, address + len)`, or `None` if out of range
    fn memory(&mut self, address: u64, len: usize) -> Option<&mut [u8]>;

    /// Show `menu` and return the chosen entry
    ///
    /// The result is validated by the caller.
    fn select_boot_entry(&mut self, menu: &BootMenu<'_>) -> u16;

    /// Hand the CPU to the loaded program
    fn transfer_control(&mut self, entry: EntryPoint) -> !;
}
