//! The port substrate of a preemptive kernel for ARM7TDMI cores (ARMv4T),
//! such as the one found in the Freescale MC1322x family.
//!
//! # Startup code
//!
//! [`use_startup!`] generates an entry point named `start`, which sets up the
//! stacks of every exception mode, clears `.bss`, and calls
//! [`EntryPoint::start`].
//!
//! # Threading
//!
//! [`use_port!`] instantiates the port on a kernel trait type. It provides:
//!
//!  - An exception vector table in the `.vectors` section. The IRQ entry
//!    supports nesting: the handler runs in Supervisor mode with IRQs
//!    re-enabled, and a task switch requested by any handler takes effect
//!    when the outermost handler returns.
//!  - The critical section primitives `enter_critical` and `exit_critical`,
//!    which maintain a per-task nesting depth saved with each task's context.
//!  - `yield_cpu`, which raises `swi #0` in a task context.
//!
//! Tasks run in System mode by default. See [`ThreadingOptions::TASK_MODE`].
#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(not(test), no_std)]

/// Used by `use_port!`
#[doc(hidden)]
pub extern crate lark_portkit;

pub mod arm;
pub mod exception;
pub mod interrupts;

/// The thread management implementation.
#[doc(hidden)]
pub mod threading {
    pub mod cfg;
    pub mod frame;
    pub mod imp;
}

/// The standard startup code.
#[doc(hidden)]
pub mod startup {
    pub mod cfg;
    #[cfg(target_arch = "arm")]
    pub mod imp;
}

pub use self::exception::{ExceptionHandler, ExceptionKind, ExceptionTable};
pub use self::interrupts::IrqFiqState;
#[cfg(target_arch = "arm")]
pub use self::interrupts::Arm7;
pub use self::startup::cfg::*;
pub use self::threading::cfg::*;
pub use self::threading::imp::{PortInstance, TaskState};
