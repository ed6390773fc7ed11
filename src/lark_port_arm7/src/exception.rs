//! The exception vector table.
use core::cell::Cell;

/// Processor exception kinds, in vector table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum ExceptionKind {
    Reset = 0,
    UndefinedInstruction = 1,
    SupervisorCall = 2,
    PrefetchAbort = 3,
    DataAbort = 4,
    Reserved = 5,
    /// The nestable (normal) interrupt class
    Irq = 6,
    /// The non-nestable fast interrupt class
    Fiq = 7,
}

impl ExceptionKind {
    pub const ALL: [Self; NUM_EXCEPTIONS] = [
        Self::Reset,
        Self::UndefinedInstruction,
        Self::SupervisorCall,
        Self::PrefetchAbort,
        Self::DataAbort,
        Self::Reserved,
        Self::Irq,
        Self::Fiq,
    ];

    /// Get the offset of the vector from the vector base.
    #[inline]
    pub const fn vector_offset(self) -> usize {
        self as usize * 4
    }
}

pub const NUM_EXCEPTIONS: usize = 8;

/// A raw exception entry point. It's entered in the exception's processor
/// mode with the banked registers set up by the hardware.
pub type ExceptionHandler = unsafe extern "C" fn();

/// `ldr pc, [pc, #24]`, which loads the target stored 32 bytes after the
/// instruction.
const LDR_PC_TARGET: u32 = 0xe59f_f018;

/// The entry point installed for every exception that has no handler.
pub unsafe extern "C" fn unhandled_exception() {
    loop {
        core::hint::spin_loop();
    }
}

/// The exception vector table followed by the jump targets it loads.
///
/// `use_port!` places an instance in the `.vectors` section; the linker
/// script must put that section where the processor (or the boot ROM)
/// fetches exception vectors.
#[repr(C, align(32))]
pub struct ExceptionTable {
    trampolines: [u32; NUM_EXCEPTIONS],
    targets: [Cell<ExceptionHandler>; NUM_EXCEPTIONS],
}

// Safety: Targets are replaced by single word-sized stores during
//         initialization, before the corresponding exceptions are unmasked.
unsafe impl Sync for ExceptionTable {}

impl ExceptionTable {
    /// Construct a table in which every exception leads to
    /// [`unhandled_exception`].
    pub const fn new() -> Self {
        Self {
            trampolines: [LDR_PC_TARGET; NUM_EXCEPTIONS],
            targets: [const { Cell::new(unhandled_exception as ExceptionHandler) }; NUM_EXCEPTIONS],
        }
    }

    /// Install the port's interrupt entry points: the nested entry for IRQ
    /// and the non-nested entry for FIQ.
    pub fn init(&self, irq_entry: ExceptionHandler, fiq_entry: ExceptionHandler) {
        self.set_handler(ExceptionKind::Irq, irq_entry);
        self.set_handler(ExceptionKind::Fiq, fiq_entry);
    }

    /// Install `handler` for `kind`. The last write wins.
    #[inline]
    pub fn set_handler(&self, kind: ExceptionKind, handler: ExceptionHandler) {
        self.targets[kind as usize].set(handler);
    }

    /// Get the handler installed for `kind` ([`unhandled_exception`] if
    /// none).
    #[inline]
    pub fn handler(&self, kind: ExceptionKind) -> ExceptionHandler {
        self.targets[kind as usize].get()
    }

    #[inline]
    pub fn is_unhandled(&self, kind: ExceptionKind) -> bool {
        self.handler(kind) as usize == unhandled_exception as usize
    }

    /// Get the instruction words of the vector table.
    #[inline]
    pub fn trampolines(&self) -> &[u32; NUM_EXCEPTIONS] {
        &self.trampolines
    }
}

impl Default for ExceptionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoffset::offset_of;

    unsafe extern "C" fn irq_entry() {}
    unsafe extern "C" fn fiq_entry() {}

    #[test]
    fn trampolines_reach_targets() {
        let table = ExceptionTable::new();
        for (i, &insn) in table.trampolines().iter().enumerate() {
            assert_eq!(insn, LDR_PC_TARGET, "vector {}", i);
        }

        // `pc` reads as the instruction address + 8, so every vector loads
        // the target 32 bytes after itself
        let displacement = (LDR_PC_TARGET & 0xfff) as usize + 8;
        assert_eq!(displacement, offset_of!(ExceptionTable, targets));
        assert_eq!(ExceptionKind::Irq.vector_offset(), 0x18);
        assert_eq!(ExceptionKind::Fiq.vector_offset(), 0x1c);

        #[cfg(target_pointer_width = "32")]
        assert_eq!(core::mem::size_of::<Cell<ExceptionHandler>>(), 4);
    }

    #[test]
    fn init_installs_interrupt_entries() {
        let table = ExceptionTable::new();
        assert!(ExceptionKind::ALL.iter().all(|&k| table.is_unhandled(k)));

        table.init(irq_entry, fiq_entry);
        assert_eq!(table.handler(ExceptionKind::Irq) as usize, irq_entry as usize);
        assert_eq!(table.handler(ExceptionKind::Fiq) as usize, fiq_entry as usize);
        assert!(table.is_unhandled(ExceptionKind::SupervisorCall));

        table.set_handler(ExceptionKind::Irq, fiq_entry);
        assert_eq!(table.handler(ExceptionKind::Irq) as usize, fiq_entry as usize);
    }
}
