//! The public interface for the TMR tick driver.
use core::fmt;
use lark_portkit::periodic::CfgError;

/// Attach the implementation of [`Timer`] that generates periodic ticks with
/// a MC1322x TMR channel to a given kernel trait type.
/// **Requires [`TickTimerOptions`] and [`use_itc!`].**
///
/// [`Timer`]: lark_port_arm7::Timer
///
/// ```rust,ignore
/// lark_support_mc1322x::use_tick_timer!(unsafe impl Timer for SystemTraits);
///
/// impl lark_support_mc1322x::TickTimerOptions for SystemTraits {
///     const TICK_RATE_HZ: u32 = 1000;
/// }
/// ```
///
/// # Safety
///
///  - `TickTimerOptions` must be configured correctly.
///
#[macro_export]
macro_rules! use_tick_timer {
    (unsafe impl Timer for $Traits:ty) => {
        const _: () = {
            use $crate::{
                lark_port_arm7::Timer,
                timer::imp::{self, TickTimerInstance, Timers},
                TickTimerOptions,
            };

            static TIMERS: Timers = unsafe { Timers::new(<$Traits as TickTimerOptions>::TMR_BASE) };

            // Safety: Only `use_tick_timer!` is allowed to `impl` this
            unsafe impl TickTimerInstance for $Traits {
                #[inline(always)]
                fn timers() -> &'static Timers {
                    &TIMERS
                }
            }

            impl Timer for $Traits {
                unsafe fn init() {
                    imp::init::<Self>()
                }
            }
        };
    };
}

/// The options for [`use_tick_timer!`].
pub trait TickTimerOptions {
    /// The base address of the TMR module's memory-mapped registers.
    const TMR_BASE: usize = 0x8000_7000;

    /// The channel used to generate ticks. Defaults to [`TimerId::Timer0`].
    const TICK_TIMER: TimerId = TimerId::Timer0;

    /// The tick rate, measured in hertz.
    const TICK_RATE_HZ: u32;

    /// The frequency of the peripheral clock, measured in hertz.
    const PERIPHERAL_CLOCK_HZ: u32 = 24_000_000;
}

/// A TMR channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(usize)]
pub enum TimerId {
    Timer0 = 0,
    Timer1 = 1,
    Timer2 = 2,
    Timer3 = 3,
}

impl TimerId {
    pub const ALL: [Self; 4] = [Self::Timer0, Self::Timer1, Self::Timer2, Self::Timer3];

    /// Get the bit of this channel in the `ENBL` register.
    #[inline]
    pub const fn enable_bit(self) -> u16 {
        1 << self as u16
    }
}

/// Error type for [`Timers::setup_periodic_interrupt`].
///
/// [`Timers::setup_periodic_interrupt`]: crate::Timers::setup_periodic_interrupt
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// The peripheral clock frequency is zero.
    ClockZero,
    /// The requested frequency is zero.
    FrequencyZero,
}

impl TimerError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClockZero => "the peripheral clock frequency must not be zero",
            Self::FrequencyZero => "the tick frequency must not be zero",
        }
    }
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CfgError> for TimerError {
    fn from(e: CfgError) -> Self {
        match e {
            CfgError::ClockZero => Self::ClockZero,
            CfgError::FrequencyZero => Self::FrequencyZero,
        }
    }
}
