use lark_portkit::dispatch::Handler;

use super::imp::TaskState;
use crate::exception::ExceptionHandler;

/// An interrupt number as understood by the [`InterruptController`].
pub type InterruptNum = usize;

/// The processor mode tasks run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// Unprivileged. Tasks can't use the interrupt mask primitives.
    User,
    /// Privileged, sharing the User mode register bank.
    System,
}

impl TaskMode {
    /// Get the value of `PSR.M` for this mode.
    #[inline]
    pub const fn psr_mode(self) -> u32 {
        match self {
            Self::User => 0x10,
            Self::System => 0x1f,
        }
    }
}

/// The configuration of the port.
pub trait ThreadingOptions {
    /// The processor mode tasks run in. Defaults to System mode.
    const TASK_MODE: TaskMode = TaskMode::System;
}

/// The scheduling policy, provided by the kernel.
pub trait Kernel {
    /// Boot the kernel. Called by the port after the exception entries and
    /// the interrupt controller are ready, with interrupts masked.
    ///
    /// # Safety
    ///
    /// This is only intended to be called by the port.
    unsafe fn boot() -> !;

    /// Advance the tick count. Returns `true` if a scheduling boundary was
    /// crossed and [`Self::choose_next_task`] should be consulted.
    ///
    /// # Safety
    ///
    /// This is only intended to be called by the port in an interrupt
    /// context.
    unsafe fn increment_tick() -> bool;

    /// Select the task to run next.
    ///
    /// # Safety
    ///
    /// This is only intended to be called by the port with interrupts
    /// masked.
    unsafe fn choose_next_task() -> &'static TaskState;
}

/// An abstract interface to an interrupt controller.
pub trait InterruptController {
    /// Initialize the driver. This will be called just before entering
    /// [`Kernel::boot`].
    ///
    /// # Safety
    ///
    /// This is only intended to be called by the port.
    unsafe fn init() {}

    /// Get the highest-priority signaled normal interrupt and mask it at the
    /// controller so that IRQs can be re-enabled while it's serviced.
    ///
    /// # Safety
    ///
    /// This is only intended to be called by the port in an IRQ handler.
    unsafe fn acknowledge_interrupt() -> Option<InterruptNum>;

    /// Notify that the processing of the specified interrupt is complete.
    ///
    /// # Safety
    ///
    /// This is only intended to be called by the port in an IRQ handler.
    unsafe fn end_interrupt(num: InterruptNum);

    /// Get the handler installed for the specified interrupt.
    fn interrupt_handler(num: InterruptNum) -> Handler;

    /// Service every signaled fast interrupt.
    ///
    /// # Safety
    ///
    /// This is only intended to be called by the port in an FIQ handler.
    unsafe fn service_fast_interrupt();
}

/// An abstract inferface to a port timer driver.
pub trait Timer {
    /// Initialize the driver and start generating ticks. This will be called
    /// just before the first task is dispatched.
    ///
    /// # Safety
    ///
    /// This is only intended to be called by the port.
    unsafe fn init() {}
}

/// Defines the entry points of a port instantiation. Implemented by
/// [`use_port!`].
pub trait EntryPoint {
    /// Proceed with the boot process.
    ///
    /// # Safety
    ///
    ///  - The processor should be in Supervisor mode.
    ///  - IRQs and FIQs should be masked.
    ///  - This method hasn't been entered yet.
    ///
    unsafe fn start() -> !;

    /// The IRQ entry. Supports nesting.
    const IRQ_ENTRY: ExceptionHandler;

    /// The FIQ entry. Doesn't support nesting.
    const FIQ_ENTRY: ExceptionHandler;

    /// The SWI entry, used to yield the processor from a task.
    const SWI_ENTRY: ExceptionHandler;

    /// Restore the running task's context.
    ///
    /// # Safety
    ///
    /// The processor should be in Supervisor mode with IRQs masked, and the
    /// running task must have a saved context.
    const DISPATCH_FIRST_TASK: unsafe extern "C" fn() -> !;
}

/// Define a kernel trait type implementing [`EntryPoint`] and
/// [`PortInstance`]. **Requires [`ThreadingOptions`], [`Kernel`],
/// [`InterruptController`], and [`Timer`].**
///
/// [`PortInstance`]: crate::threading::imp::PortInstance
///
/// ```rust,ignore
/// lark_port_arm7::use_port!(unsafe pub struct SystemTraits);
/// lark_port_arm7::use_startup!(unsafe SystemTraits);
///
/// impl lark_port_arm7::ThreadingOptions for SystemTraits {}
/// impl lark_port_arm7::StartupOptions for SystemTraits {}
/// ```
#[macro_export]
macro_rules! use_port {
    (unsafe $vis:vis struct $Traits:ident) => {
        $vis struct $Traits;

        mod port_arm7_impl {
            use super::$Traits;
            use $crate::lark_portkit::utils::Init;
            use $crate::exception::ExceptionTable;
            use $crate::threading::imp::{State, TaskState, PortInstance};

            static PORT_STATE: State = Init::INIT;

            #[used]
            #[link_section = ".vectors"]
            static EXCEPTION_TABLE: ExceptionTable = ExceptionTable::new();

            // Safety: Only `use_port!` is allowed to `impl` this
            unsafe impl PortInstance for $Traits {
                #[inline(always)]
                fn port_state() -> &'static State {
                    &PORT_STATE
                }

                #[inline(always)]
                fn exception_table() -> &'static ExceptionTable {
                    &EXCEPTION_TABLE
                }
            }

            impl $Traits {
                /// Initialize a task's stack so that the first dispatch
                /// starts it at `entry_point` with `argument` in `r0`.
                ///
                /// # Safety
                ///
                /// `stack` must stay reserved for the task for as long as
                /// the task exists.
                pub unsafe fn initialize_task_state(
                    task: &TaskState,
                    stack: &mut [u32],
                    entry_point: usize,
                    argument: usize,
                ) {
                    unsafe {
                        PORT_STATE.initialize_task_state::<Self>(task, stack, entry_point, argument)
                    }
                }
            }

            #[cfg(target_arch = "arm")]
            extern "C" {
                fn lark_irq_entry();
                fn lark_fiq_entry();
                fn lark_swi_entry();
                fn lark_dispatch_first_task() -> !;
            }

            #[cfg(target_arch = "arm")]
            impl $crate::EntryPoint for $Traits {
                unsafe fn start() -> ! {
                    unsafe { PORT_STATE.port_boot::<Self>() }
                }

                const IRQ_ENTRY: $crate::ExceptionHandler = lark_irq_entry;
                const FIQ_ENTRY: $crate::ExceptionHandler = lark_fiq_entry;
                const SWI_ENTRY: $crate::ExceptionHandler = lark_swi_entry;
                const DISPATCH_FIRST_TASK: unsafe extern "C" fn() -> ! =
                    lark_dispatch_first_task;
            }

            #[cfg(target_arch = "arm")]
            impl $Traits {
                #[inline(always)]
                pub fn enter_critical() {
                    PORT_STATE.enter_critical();
                }

                #[inline(always)]
                pub fn exit_critical() {
                    PORT_STATE.exit_critical();
                }

                /// Yield the processor. In an interrupt context, the
                /// switch takes place when the outermost handler returns.
                #[inline(always)]
                pub fn yield_cpu() {
                    unsafe { PORT_STATE.yield_cpu::<Self>() }
                }

                /// Start the tick timer and dispatch the first task.
                ///
                /// # Safety
                ///
                /// Only meant to be called once by `Kernel::boot`.
                pub unsafe fn start_scheduler() -> ! {
                    unsafe { PORT_STATE.start_scheduler::<Self>() }
                }

                #[inline(always)]
                pub fn is_task_context() -> bool {
                    State::is_task_context()
                }
            }

            // The context frame layout is described by
            // `lark_port_arm7::threading::frame::ContextFrame`.
            #[cfg(target_arch = "arm")]
            ::core::arch::global_asm!(
                "
                .pushsection .text.lark_port_arm7, \"ax\", %progbits
                .arm

                @ Save the background task's context on its own stack and
                @ store the stack pointer in the running task's `TaskState`.
                @ Expects `lr` = resume address + 4 and `spsr` = the task's
                @ CPSR. Clobbers `r0`.
                .macro lark_save_context
                    stmdb sp!, {{r0}}
                    stmdb sp, {{sp}}^
                    nop
                    sub sp, sp, #4
                    ldmia sp!, {{r0}}

                    stmdb r0!, {{lr}}
                    mov lr, r0
                    ldmia sp!, {{r0}}
                    stmdb lr, {{r0-lr}}^
                    nop
                    sub lr, lr, #{RET_FROM_R0}

                    mrs r0, spsr
                    stmdb lr!, {{r0}}
                    ldr r0, ={state}
                    ldr r0, [r0, #{OFFSET_CRITICAL_NESTING}]
                    stmdb lr!, {{r0}}

                    ldr r0, ={state}
                    ldr r0, [r0, #{OFFSET_RUNNING_TASK}]
                    str lr, [r0, #{OFFSET_SP}]
                .endm

                @ Restore the running task's context and return to it.
                .macro lark_restore_context
                    ldr r0, ={state}
                    ldr r1, [r0, #{OFFSET_RUNNING_TASK}]
                    ldr lr, [r1, #{OFFSET_SP}]

                    ldmia lr!, {{r1}}
                    str r1, [r0, #{OFFSET_CRITICAL_NESTING}]
                    ldmia lr!, {{r0}}
                    msr spsr_cxsf, r0

                    ldmia lr, {{r0-lr}}^
                    nop
                    ldr lr, [lr, #{RET_FROM_R0}]
                    subs pc, lr, #4
                .endm

                .global lark_irq_entry
                .type lark_irq_entry, %function
                .balign 4
            lark_irq_entry:
                @ Did we interrupt a task (User or System mode)?
                stmdb sp!, {{r0}}
                mrs r0, spsr
                and r0, r0, #0x1f
                cmp r0, #0x1f
                cmpne r0, #0x10
                ldmia sp!, {{r0}}
                bne 1f

                lark_save_context

                @ Service the interrupt in Supervisor mode, IRQ masked
                msr cpsr_c, #0x93
                bl {handle_irq}

                @ `handle_irq` returns with IRQ masked. The running task
                @ might have changed.
                lark_restore_context

            1:
                @ We interrupted a handler running in Supervisor mode. Save
                @ its scratch registers, return address, and SPSR on the IRQ
                @ stack.
                stmdb sp!, {{r0-r3, r12, lr}}
                mrs r0, spsr
                stmdb sp!, {{r0}}

                msr cpsr_c, #0x93
                stmdb sp!, {{r0, lr}}
                bl {handle_irq}
                ldmia sp!, {{r0, lr}}

                msr cpsr_c, #0xd2
                ldmia sp!, {{r0}}
                msr spsr_cxsf, r0
                ldmia sp!, {{r0-r3, r12, lr}}
                subs pc, lr, #4
                .ltorg

                .global lark_swi_entry
                .type lark_swi_entry, %function
                .balign 4
            lark_swi_entry:
                @ `lr` = the instruction following `swi`. Make it look like
                @ an IRQ return address.
                add lr, lr, #4
                lark_save_context
                bl {choose_running_task}
                lark_restore_context
                .ltorg

                .global lark_fiq_entry
                .type lark_fiq_entry, %function
                .balign 4
            lark_fiq_entry:
                sub lr, lr, #4
                stmdb sp!, {{r0-r3, r12, lr}}
                bl {handle_fiq}
                ldmia sp!, {{r0-r3, r12, pc}}^

                .global lark_dispatch_first_task
                .type lark_dispatch_first_task, %function
                .balign 4
            lark_dispatch_first_task:
                lark_restore_context
                .ltorg

                .popsection
                ",
                state = sym PORT_STATE,
                handle_irq = sym $crate::threading::imp::handle_irq::<$Traits>,
                handle_fiq = sym $crate::threading::imp::handle_fiq::<$Traits>,
                choose_running_task = sym $crate::threading::imp::choose_running_task::<$Traits>,
                OFFSET_CRITICAL_NESTING = const State::OFFSET_CRITICAL_NESTING,
                OFFSET_RUNNING_TASK = const State::OFFSET_RUNNING_TASK,
                OFFSET_SP = const TaskState::OFFSET_SP,
                RET_FROM_R0 = const $crate::threading::frame::ContextFrame::RETURN_ADDRESS_FROM_R0,
            );
        }
    };
}
