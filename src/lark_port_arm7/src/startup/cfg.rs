/// Generate [startup code]. **Requires [`StartupOptions`] and [`EntryPoint`] to
/// be implemented.**
///
/// This macro produces an entry point function whose symbol name is `start`.
/// You should specify it as an entry point in your linker script. The linker
/// script must also define `_stack_start` (the top of the stack area),
/// `__sbss`, and `__ebss`.
///
/// The stack area is carved, from the top, into the IRQ, FIQ, Abort, and
/// Undefined Instruction mode stacks. The remainder is used by Supervisor
/// mode, in which the kernel boots and interrupt handlers run.
///
/// [startup code]: crate#startup-code
/// [`EntryPoint`]: crate::EntryPoint
#[macro_export]
macro_rules! use_startup {
    (unsafe $Traits:ty) => {
        const _: () = assert!(
            <$Traits as $crate::StartupOptions>::IRQ_STACK_SIZE % 8 == 0
                && <$Traits as $crate::StartupOptions>::FIQ_STACK_SIZE % 8 == 0
                && <$Traits as $crate::StartupOptions>::ABORT_STACK_SIZE % 8 == 0
                && <$Traits as $crate::StartupOptions>::UNDEFINED_STACK_SIZE % 8 == 0,
            "stack sizes must be multiples of 8"
        );

        #[cfg(target_arch = "arm")]
        ::core::arch::global_asm!(
            "
            .pushsection .text.start, \"ax\", %progbits
            .arm
            .global start
            .type start, %function
            .balign 4
        start:
            ldr r0, =_stack_start

            @ IRQ mode
            msr cpsr_c, #0xd2
            mov sp, r0
            ldr r1, ={IRQ_STACK_SIZE}
            sub r0, r0, r1

            @ FIQ mode
            msr cpsr_c, #0xd1
            mov sp, r0
            ldr r1, ={FIQ_STACK_SIZE}
            sub r0, r0, r1

            @ Abort mode
            msr cpsr_c, #0xd7
            mov sp, r0
            ldr r1, ={ABORT_STACK_SIZE}
            sub r0, r0, r1

            @ Undefined Instruction mode
            msr cpsr_c, #0xdb
            mov sp, r0
            ldr r1, ={UNDEFINED_STACK_SIZE}
            sub r0, r0, r1

            @ Back to Supervisor mode (IRQ and FIQ both masked, Arm
            @ instruction set)
            msr cpsr_c, #0xd3
            mov sp, r0

            b {reset_handler}
            .ltorg
            .popsection
            ",
            reset_handler = sym $crate::startup::imp::reset_handler::<$Traits>,
            IRQ_STACK_SIZE = const <$Traits as $crate::StartupOptions>::IRQ_STACK_SIZE,
            FIQ_STACK_SIZE = const <$Traits as $crate::StartupOptions>::FIQ_STACK_SIZE,
            ABORT_STACK_SIZE = const <$Traits as $crate::StartupOptions>::ABORT_STACK_SIZE,
            UNDEFINED_STACK_SIZE = const <$Traits as $crate::StartupOptions>::UNDEFINED_STACK_SIZE,
        );
    };
}

/// The options for [`use_startup!`]. The sizes are measured in bytes and must
/// be multiples of 8.
pub trait StartupOptions {
    /// The size of the IRQ mode stack. Only the first-level interrupt entry
    /// state is stored here.
    const IRQ_STACK_SIZE: usize = 0x400;

    /// The size of the FIQ mode stack.
    const FIQ_STACK_SIZE: usize = 0x200;

    /// The size of the Abort mode stack.
    const ABORT_STACK_SIZE: usize = 0x40;

    /// The size of the Undefined Instruction mode stack.
    const UNDEFINED_STACK_SIZE: usize = 0x40;
}
