//! Supporting package for running Lark on a Freescale MC1322x family
//! platform-in-package (including MC13224V).
//!
//! This crate provides the drivers a port instantiation needs:
//!
//!  - [`use_itc!`] implements [`InterruptController`] with the MC1322x
//!    interrupt controller (ITC).
//!  - [`use_tick_timer!`] implements [`Timer`] with a TMR channel generating
//!    periodic ticks.
//!  - [`Uart`] is an interrupt-driven serial driver built on ring buffers.
//!  - [`Gpio`] configures pin direction and function.
//!
//! [`InterruptController`]: lark_port_arm7::InterruptController
//! [`Timer`]: lark_port_arm7::Timer
#![deny(unsafe_op_in_unsafe_fn)]
#![cfg_attr(not(test), no_std)]

/// Used by `use_itc!` and `use_tick_timer!`
#[doc(hidden)]
pub extern crate lark_port_arm7;

/// Used by `use_itc!` and `use_tick_timer!`
#[doc(hidden)]
pub extern crate lark_portkit;

/// The MC1322x interrupt controller driver.
#[doc(hidden)]
pub mod itc {
    pub mod cfg;
    pub mod imp;
    mod itc_regs;
}

/// The TMR periodic tick driver.
#[doc(hidden)]
pub mod timer {
    pub mod cfg;
    pub mod imp;
    mod timer_regs;
}

/// The UART serial transport driver.
pub mod uart {
    pub mod cfg;
    pub mod hw;
    pub mod imp;
    mod uart_regs;

    pub use self::{cfg::*, hw::*, imp::*};
}

pub mod dev;
pub mod gpio;

pub use self::dev::{CharDevice, DeviceRegistry, DeviceTable, PinConfig, RegisterDeviceError};
pub use self::gpio::{Gpio, GpioError, PinFunction};
pub use self::itc::cfg::*;
pub use self::itc::imp::Itc;
pub use self::timer::cfg::*;
pub use self::timer::imp::Timers;
pub use self::uart::{Uart, UartEnv, UartError, UartId};

/// Run `f` with IRQs and FIQs masked.
#[inline]
pub(crate) fn interrupt_free<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(target_arch = "arm")]
    {
        use lark_port_arm7::{lark_portkit::critical::InterruptMask, Arm7};
        let prior = Arm7.disable_interrupts();
        let ret = f();
        Arm7.restore_interrupts(prior);
        ret
    }

    #[cfg(not(target_arch = "arm"))]
    f()
}
