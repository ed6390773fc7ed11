use core::{cell::UnsafeCell, fmt, ptr};
use lark_portkit::{critical::CriticalNesting, utils::Init};
use memoffset::offset_of;

use super::{
    cfg::{Kernel, ThreadingOptions},
    frame::{self, ContextFrame, Registers},
};
use crate::exception::ExceptionTable;

#[cfg(target_arch = "arm")]
use {
    super::cfg::{EntryPoint, InterruptController, Timer},
    crate::{
        arm::{is_task_mode, CPSR},
        exception::ExceptionKind,
        interrupts::{Arm7, IrqFiqState},
    },
    core::arch::asm,
    lark_portkit::critical::InterruptMask,
    tock_registers::interfaces::Readable,
};

/// Implemented on a kernel trait type by [`use_port!`].
///
/// # Safety
///
/// Only meant to be implemented by [`use_port!`].
pub unsafe trait PortInstance: Kernel + ThreadingOptions + 'static {
    fn port_state() -> &'static State;
    fn exception_table() -> &'static ExceptionTable;
}

/// The global state of the port. Accessed by the exception entries through
/// the `OFFSET_*` constants.
#[repr(C)]
pub struct State {
    critical_nesting: CriticalNesting,
    /// The task whose context is saved and restored by the exception
    /// entries. Null until the first task is chosen.
    running_task: UnsafeCell<*const TaskState>,
}

impl State {
    pub const OFFSET_CRITICAL_NESTING: usize = offset_of!(State, critical_nesting);
    pub const OFFSET_RUNNING_TASK: usize = offset_of!(State, running_task);
}

unsafe impl Sync for State {}

impl Init for State {
    #[allow(clippy::declare_interior_mutable_const)] // it's intentional
    const INIT: Self = Self {
        critical_nesting: CriticalNesting::new(),
        running_task: UnsafeCell::new(ptr::null()),
    };
}

/// The per-task state of the port.
#[repr(C)]
pub struct TaskState {
    /// The stack pointer of the suspended task, pointing to its
    /// [`ContextFrame`].
    sp: UnsafeCell<*mut u32>,
}

impl TaskState {
    pub const OFFSET_SP: usize = offset_of!(TaskState, sp);

    #[inline]
    pub fn sp(&self) -> *mut u32 {
        unsafe { *self.sp.get() }
    }

    /// Push `regs` onto the stack ending at `sp` the way the exception
    /// entries do and record the new stack pointer.
    ///
    /// # Safety
    ///
    /// The task must not be running. The [`ContextFrame::WORDS`] words below
    /// `sp` must be writable.
    pub unsafe fn save_context(&self, sp: *mut u32, regs: &Registers, critical: &CriticalNesting) {
        let frame = ContextFrame::from_registers(regs, critical.depth());
        unsafe { *self.sp.get() = frame.push(sp) };
    }

    /// Pop the saved context the way the exception entries do, restoring
    /// the task's critical nesting depth into `critical`.
    ///
    /// # Safety
    ///
    /// The task must have a saved context.
    pub unsafe fn restore_context(&self, critical: &CriticalNesting) -> Registers {
        let (frame, sp) = unsafe { ContextFrame::pop(self.sp()) };
        unsafe {
            *self.sp.get() = sp as *mut u32;
            critical.set_depth(frame.critical_nesting);
        }
        frame.to_registers()
    }
}

unsafe impl Sync for TaskState {}

impl Init for TaskState {
    #[allow(clippy::declare_interior_mutable_const)] // it's intentional
    const INIT: Self = Self {
        sp: UnsafeCell::new(ptr::null_mut()),
    };
}

impl fmt::Debug for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskState").field("sp", &self.sp()).finish()
    }
}

impl State {
    #[inline]
    pub fn critical_nesting(&self) -> &CriticalNesting {
        &self.critical_nesting
    }

    #[inline]
    pub fn running_task(&self) -> Option<&'static TaskState> {
        // Safety: Only `choose_running_task` writes a non-null value, which
        //         originates from a `&'static TaskState`
        unsafe { (*self.running_task.get()).as_ref() }
    }

    /// Ask the kernel for the next task and make it the running task.
    ///
    /// # Safety
    ///
    /// Interrupts must be masked.
    pub unsafe fn choose_running_task<Traits: Kernel>(&self) {
        let task = unsafe { Traits::choose_next_task() };
        unsafe { *self.running_task.get() = task };
    }

    /// Process a tick. The running task is re-chosen if the kernel reports
    /// a scheduling boundary. The switch itself happens when the outermost
    /// interrupt handler returns.
    ///
    /// # Safety
    ///
    /// Only meant to be called from the tick interrupt handler.
    pub unsafe fn timer_tick<Traits: Kernel>(&self) {
        if unsafe { Traits::increment_tick() } {
            unsafe { self.choose_running_task::<Traits>() };
        }
    }

    /// Prepare `task` so that restoring it starts `entry_point` with
    /// `argument` in `r0`.
    ///
    /// # Safety
    ///
    /// `task` must not be running. `stack` must stay reserved for the task.
    pub unsafe fn initialize_task_state<Traits: ThreadingOptions>(
        &self,
        task: &TaskState,
        stack: &mut [u32],
        entry_point: usize,
        argument: usize,
    ) {
        let sp = frame::initialize_stack(stack, entry_point, argument, Traits::TASK_MODE);
        unsafe { *task.sp.get() = sp };
    }
}

#[cfg(target_arch = "arm")]
impl State {
    /// Install the exception entries, initialize the interrupt controller,
    /// and boot the kernel.
    ///
    /// # Safety
    ///
    /// Only meant to be called once by [`EntryPoint::start`].
    pub unsafe fn port_boot<Traits>(&self) -> !
    where
        Traits: PortInstance + EntryPoint + InterruptController,
    {
        let _ = Arm7.disable_interrupts();

        let table = Traits::exception_table();
        table.init(Traits::IRQ_ENTRY, Traits::FIQ_ENTRY);
        table.set_handler(ExceptionKind::SupervisorCall, Traits::SWI_ENTRY);

        // Safety: We are the port, so it's okay to call this
        unsafe { <Traits as InterruptController>::init() };

        log::trace!("booting the kernel");

        // Safety: We are the port, so it's okay to call this
        unsafe { <Traits as Kernel>::boot() }
    }

    /// Start the tick timer and dispatch the first task chosen by the
    /// kernel.
    ///
    /// # Safety
    ///
    /// Only meant to be called once by the kernel's boot code.
    pub unsafe fn start_scheduler<Traits>(&self) -> !
    where
        Traits: PortInstance + EntryPoint + Timer,
    {
        let _ = Arm7.disable_interrupts();

        // Safety: We are the port, so it's okay to call this
        unsafe { <Traits as Timer>::init() };

        unsafe { self.dispatch_first_task::<Traits>() }
    }

    /// Choose the running task and restore its context. IRQs are unmasked
    /// by the restored SPSR.
    ///
    /// # Safety
    ///
    /// Interrupts must be masked. Supervisor mode.
    pub unsafe fn dispatch_first_task<Traits>(&self) -> !
    where
        Traits: PortInstance + EntryPoint,
    {
        unsafe { self.choose_running_task::<Traits>() };
        unsafe { (Traits::DISPATCH_FIRST_TASK)() }
    }

    /// Yield the processor. In a task context this raises `swi #0`, which
    /// saves the task's context and re-chooses the running task. Elsewhere
    /// the running task is re-chosen and the switch happens when the
    /// outermost interrupt handler returns.
    ///
    /// # Safety
    ///
    /// The first task must have been dispatched.
    pub unsafe fn yield_cpu<Traits: PortInstance>(&self) {
        if Self::is_task_context() {
            unsafe { asm!("swi #0", options(nostack)) };
        } else {
            let prior = Arm7.disable_irq();
            unsafe { self.choose_running_task::<Traits>() };
            Arm7.restore_irq(prior);
        }
    }

    #[inline]
    pub fn enter_critical(&self) {
        self.critical_nesting.enter(&Arm7);
    }

    #[inline]
    pub fn exit_critical(&self) {
        self.critical_nesting.exit(&Arm7);
    }

    /// Get a flag indicating whether the processor is in User or System
    /// mode, i.e., a task is executing.
    #[inline]
    pub fn is_task_context() -> bool {
        is_task_mode(CPSR.extract())
    }
}

/// Service the highest-priority pending normal interrupt. Called by the IRQ
/// entry in Supervisor mode with IRQs masked, and returns the same way.
///
/// The source stays masked at the controller while its handler runs with
/// IRQs enabled, which allows higher-priority sources to preempt it. A
/// source without a handler is left masked.
#[cfg(target_arch = "arm")]
pub unsafe extern "C" fn handle_irq<Traits: PortInstance + InterruptController>() {
    // Safety: We are the port, so it's okay to call this
    let Some(num) = (unsafe { Traits::acknowledge_interrupt() }) else {
        return;
    };

    let handler = Traits::interrupt_handler(num);

    Arm7.restore_irq(IrqFiqState::ENABLED);
    let handled = handler.call();
    Arm7.disable_irq();

    if handled {
        // Safety: We are the port, so it's okay to call this
        unsafe { Traits::end_interrupt(num) };
    } else {
        log::warn!("unhandled interrupt {}", num);
    }
}

/// Called by the FIQ entry in FIQ mode.
#[cfg(target_arch = "arm")]
pub unsafe extern "C" fn handle_fiq<Traits: PortInstance + InterruptController>() {
    // Safety: We are the port, so it's okay to call this
    unsafe { Traits::service_fast_interrupt() };
}

/// Called by the SWI entry after saving the yielding task's context.
pub unsafe extern "C" fn choose_running_task<Traits: PortInstance>() {
    unsafe { Traits::port_state().choose_running_task::<Traits>() };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arm::PSR, threading::cfg::TaskMode};
    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use lark_portkit::critical::{NO_CRITICAL_NESTING, UNMANAGED_CRITICAL_NESTING};

    static TASKS: [TaskState; 2] = [TaskState::INIT, TaskState::INIT];
    static NEXT_TASK: AtomicUsize = AtomicUsize::new(0);
    static BOUNDARY: AtomicBool = AtomicBool::new(false);
    static TICKS: AtomicUsize = AtomicUsize::new(0);

    struct TestTraits;

    impl ThreadingOptions for TestTraits {}

    impl Kernel for TestTraits {
        unsafe fn boot() -> ! {
            unreachable!()
        }

        unsafe fn increment_tick() -> bool {
            TICKS.fetch_add(1, Ordering::Relaxed);
            BOUNDARY.load(Ordering::Relaxed)
        }

        unsafe fn choose_next_task() -> &'static TaskState {
            &TASKS[NEXT_TASK.load(Ordering::Relaxed)]
        }
    }

    #[test]
    fn offsets() {
        assert_eq!(State::OFFSET_CRITICAL_NESTING, 0);
        assert_eq!(TaskState::OFFSET_SP, 0);
        assert_ne!(State::OFFSET_RUNNING_TASK, State::OFFSET_CRITICAL_NESTING);
    }

    #[test]
    fn tick_rechooses_only_at_boundary() {
        let _ = env_logger::builder().is_test(true).try_init();

        let state = State::INIT;
        assert!(state.running_task().is_none());
        assert_eq!(state.critical_nesting().depth(), UNMANAGED_CRITICAL_NESTING);

        NEXT_TASK.store(1, Ordering::Relaxed);
        BOUNDARY.store(false, Ordering::Relaxed);
        unsafe { state.timer_tick::<TestTraits>() };
        assert!(state.running_task().is_none());

        BOUNDARY.store(true, Ordering::Relaxed);
        unsafe { state.timer_tick::<TestTraits>() };
        assert!(ptr::eq(state.running_task().unwrap(), &TASKS[1]));
        assert!(TICKS.load(Ordering::Relaxed) >= 2);
    }

    #[test]
    fn first_restore_starts_entry_point() {
        let state = State::INIT;
        let task = TaskState::INIT;
        let mut stack = vec![0u32; 64];

        unsafe {
            state.initialize_task_state::<TestTraits>(&task, &mut stack, 0x0040_0101, 0x1234)
        };
        let regs = unsafe { task.restore_context(state.critical_nesting()) };

        assert_eq!(regs.pc, 0x0040_0101);
        assert_eq!(regs.r[0], 0x1234);
        assert_eq!(regs.lr, 0xaaaa_aaaa);
        assert_eq!(regs.sp, task.sp() as usize as u32);

        let cpsr = crate::arm::Psr::new(regs.cpsr);
        assert!(cpsr.is_set(PSR::T));
        assert!(!cpsr.is_set(PSR::I));
        assert_eq!(cpsr.read(PSR::M), TaskMode::System.psr_mode());
        assert_eq!(state.critical_nesting().depth(), NO_CRITICAL_NESTING);
    }

    /// A preempted task resumes with its registers and its own nesting
    /// depth, regardless of what the other task did meanwhile.
    #[test]
    fn switch_preserves_each_tasks_context() {
        let state = State::INIT;
        let (a, b) = (TaskState::INIT, TaskState::INIT);
        let mut stack_a = vec![0u32; 64];
        let mut stack_b = vec![0u32; 64];
        let critical = state.critical_nesting();

        let regs_a = Registers {
            r: [7; 13],
            sp: 0,
            lr: 0x100,
            pc: 0x0040_2000,
            cpsr: 0x1f,
        };
        let regs_b = Registers {
            pc: 0x0040_3000,
            ..Default::default()
        };

        unsafe {
            critical.set_depth(2);
            a.save_context(stack_a.as_mut_ptr_range().end, &regs_a, critical);
            critical.set_depth(NO_CRITICAL_NESTING);
            b.save_context(stack_b.as_mut_ptr_range().end, &regs_b, critical);

            assert_eq!(b.restore_context(critical), regs_b);
            assert_eq!(critical.depth(), NO_CRITICAL_NESTING);
            assert_eq!(a.restore_context(critical), regs_a);
            assert_eq!(critical.depth(), 2);
        }
        assert_eq!(a.sp(), stack_a.as_mut_ptr_range().end);
    }

    #[test]
    fn swi_entry_chooses_via_port_state() {
        static STATE: State = State::INIT;

        unsafe impl PortInstance for TestTraits {
            fn port_state() -> &'static State {
                &STATE
            }
            fn exception_table() -> &'static ExceptionTable {
                static TABLE: ExceptionTable = ExceptionTable::new();
                &TABLE
            }
        }

        unsafe { choose_running_task::<TestTraits>() };
        let running = STATE.running_task().unwrap();
        assert!(TASKS.iter().any(|task| ptr::eq(task, running)));
    }
}
