//! Provides a standard startup and entry code implementation.
use core::ptr::addr_of_mut;

use crate::EntryPoint;

extern "C" {
    static mut __sbss: u32;
    static mut __ebss: u32;
}

/// Entered from `start` in Supervisor mode with every exception mode's stack
/// set up.
pub unsafe extern "C" fn reset_handler<Traits: EntryPoint>() -> ! {
    // Safety: `.bss` is not in use yet
    unsafe { r0::zero_bss(addr_of_mut!(__sbss), addr_of_mut!(__ebss)) };

    // Safety: Supervisor mode, interrupts masked, entered only once
    unsafe { Traits::start() }
}
