use tock_registers::LocalRegisterCopy;

tock_registers::register_bitfields! {u32,
    pub PSR [
        /// Processor mode
        M OFFSET(0) NUMBITS(5) [
            User = 0x10,
            Fiq = 0x11,
            Irq = 0x12,
            Supervisor = 0x13,
            Abort = 0x17,
            Undefined = 0x1b,
            System = 0x1f
        ],
        /// Thumb execution state
        T OFFSET(5) NUMBITS(1) [],
        /// FIQ mask bit
        F OFFSET(6) NUMBITS(1) [],
        /// IRQ mask bit
        I OFFSET(7) NUMBITS(1) [],
        /// Overflow condition flag
        V OFFSET(28) NUMBITS(1) [],
        /// Carry condition flag
        C OFFSET(29) NUMBITS(1) [],
        /// Zero condition flag
        Z OFFSET(30) NUMBITS(1) [],
        /// Negative condition flag
        N OFFSET(31) NUMBITS(1) []
    ]
}

/// A copy of a program status register (CPSR or SPSR).
pub type Psr = LocalRegisterCopy<u32, PSR::Register>;

/// Current Program Status Register
///
/// Only the control field (mode, T, F, and I bits) is written by
/// `Writeable::set`. Writing the T bit this way is unpredictable, so callers
/// must preserve the value they read.
#[cfg(target_arch = "arm")]
pub const CPSR: CPSRAccessor = CPSRAccessor;
#[cfg(target_arch = "arm")]
pub struct CPSRAccessor;

#[cfg(target_arch = "arm")]
impl tock_registers::interfaces::Readable for CPSRAccessor {
    type T = u32;
    type R = PSR::Register;
    psr_read_raw!(cpsr);
}

#[cfg(target_arch = "arm")]
impl tock_registers::interfaces::Writeable for CPSRAccessor {
    type T = u32;
    type R = PSR::Register;
    psr_write_raw!(cpsr_c);
}

/// Saved Program Status Register of the current exception mode
#[cfg(target_arch = "arm")]
pub const SPSR: SPSRAccessor = SPSRAccessor;
#[cfg(target_arch = "arm")]
pub struct SPSRAccessor;

#[cfg(target_arch = "arm")]
impl tock_registers::interfaces::Readable for SPSRAccessor {
    type T = u32;
    type R = PSR::Register;
    psr_read_raw!(spsr);
}

#[cfg(target_arch = "arm")]
impl tock_registers::interfaces::Writeable for SPSRAccessor {
    type T = u32;
    type R = PSR::Register;
    psr_write_raw!(spsr_cxsf);
}

/// Return `true` if `psr` describes a context running in User or System mode,
/// i.e., a task.
pub fn is_task_mode(psr: Psr) -> bool {
    matches!(
        psr.read_as_enum(PSR::M),
        Some(PSR::M::Value::User | PSR::M::Value::System)
    )
}
