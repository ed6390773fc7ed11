/// Implements `tock_registers::interfaces::Readable::get` for a program
/// status register.
#[cfg(target_arch = "arm")]
#[macropol::macropol]
macro_rules! psr_read_raw {
    ($psr:ident) => {
        /// `mrs {out_reg}, $&psr`
        #[inline]
        fn get(&self) -> u32 {
            let reg;
            unsafe {
                core::arch::asm!(
                    "mrs {}, $&psr",
                    lateout(reg) reg,
                    options(nostack, preserves_flags),
                );
            }
            reg
        }
    };
}

/// Implements `tock_registers::interfaces::Writeable::set` for a program
/// status register field.
#[cfg(target_arch = "arm")]
#[macropol::macropol]
macro_rules! psr_write_raw {
    ($psr_fields:ident) => {
        /// `msr $&psr_fields, {in_reg}`
        #[inline]
        fn set(&self, value: u32) {
            unsafe {
                core::arch::asm!(
                    "msr $&psr_fields, {}",
                    in(reg) value,
                    options(nostack),
                );
            }
        }
    };
}

mod psr;
pub use self::psr::*;
