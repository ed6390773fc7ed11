//! The public interface of the ITC driver.
use core::{convert::TryFrom, fmt};

/// Implement [`InterruptController`] and [`ItcInstance`] on the given kernel
/// trait type using the MC1322x interrupt controller (ITC).
/// **Requires [`ItcOptions`].**
///
/// [`InterruptController`]: lark_port_arm7::InterruptController
/// [`ItcInstance`]: crate::itc::imp::ItcInstance
///
/// ```rust,ignore
/// lark_support_mc1322x::use_itc!(unsafe impl InterruptController for SystemTraits);
///
/// impl lark_support_mc1322x::ItcOptions for SystemTraits {}
/// ```
///
/// # Safety
///
///  - `ItcOptions` should be configured correctly and the memory-mapped
///    registers should be accessible.
///
#[macro_export]
macro_rules! use_itc {
    (unsafe impl InterruptController for $Traits:ty) => {
        const _: () = {
            use $crate::{
                itc::imp::{Itc, ItcInstance},
                lark_port_arm7::{InterruptController, InterruptNum},
                lark_portkit::dispatch::Handler,
                ItcOptions,
            };

            static ITC: Itc = unsafe { Itc::new(<$Traits as ItcOptions>::ITC_BASE) };

            // Safety: Only `use_itc!` is allowed to `impl` this
            unsafe impl ItcInstance for $Traits {
                #[inline(always)]
                fn itc() -> &'static Itc {
                    &ITC
                }
            }

            impl InterruptController for $Traits {
                #[inline]
                unsafe fn init() {
                    ITC.init();
                }

                #[inline]
                unsafe fn acknowledge_interrupt() -> Option<InterruptNum> {
                    ITC.acknowledge_interrupt().map(|source| source as InterruptNum)
                }

                #[inline]
                unsafe fn end_interrupt(num: InterruptNum) {
                    ITC.end_interrupt_num(num);
                }

                #[inline]
                fn interrupt_handler(num: InterruptNum) -> Handler {
                    ITC.handler_num(num)
                }

                #[inline]
                unsafe fn service_fast_interrupt() {
                    ITC.service_fast_interrupt();
                }
            }
        };
    };
}

/// The options for [`use_itc!`].
pub trait ItcOptions {
    /// The base address of the ITC's memory-mapped registers.
    const ITC_BASE: usize = 0x8002_0000;
}

/// The number of interrupt sources.
pub const NUM_SOURCES: usize = 11;

/// An MC1322x interrupt source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(usize)]
pub enum InterruptSource {
    Asm = 0,
    Uart1 = 1,
    Uart2 = 2,
    Crm = 3,
    I2c = 4,
    Tmr = 5,
    SpiF = 6,
    Maca = 7,
    Ssi = 8,
    Adc = 9,
    Spi = 10,
}

impl InterruptSource {
    pub const ALL: [Self; NUM_SOURCES] = [
        Self::Asm,
        Self::Uart1,
        Self::Uart2,
        Self::Crm,
        Self::I2c,
        Self::Tmr,
        Self::SpiF,
        Self::Maca,
        Self::Ssi,
        Self::Adc,
        Self::Spi,
    ];

    #[inline]
    pub const fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// The error type returned when converting an out-of-range number into an
/// [`InterruptSource`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BadSourceError;

impl BadSourceError {
    pub const fn as_str(&self) -> &'static str {
        "the interrupt source number is out of range"
    }
}

impl fmt::Display for BadSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<usize> for InterruptSource {
    type Error = BadSourceError;

    #[inline]
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::ALL.get(value).copied().ok_or(BadSourceError)
    }
}

/// The priority class of an interrupt source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InterruptPriority {
    /// Delivered as IRQ, which can be nested.
    Normal,
    /// Delivered as FIQ, which can't be nested.
    Fast,
}
