//! The implementation of the ITC driver.
use core::convert::TryFrom;
use lark_port_arm7::InterruptNum;
use lark_portkit::dispatch::{Handler, HandlerTable};
use tock_registers::interfaces::{Readable, Writeable};

use super::{
    cfg::{InterruptPriority, InterruptSource, NUM_SOURCES},
    itc_regs::ItcRegs,
};
use crate::interrupt_free;

/// Provides access to a system-global ITC instance. Implemented by
/// [`use_itc!`].
///
/// # Safety
///
/// Only meant to be implemented by [`use_itc!`].
pub unsafe trait ItcInstance {
    fn itc() -> &'static Itc;
}

/// A source is allowed to interrupt when its priority level (fixed by the
/// source number on MC1322x) exceeds this. `0x1f` disables the masking.
const NIMASK_NONE: u32 = 0x1f;

const ALL_SOURCES: u32 = (1 << NUM_SOURCES) - 1;

/// The MC1322x interrupt controller and the handlers of its sources.
pub struct Itc {
    regs: *const ItcRegs,
    handlers: HandlerTable<NUM_SOURCES>,
}

// Safety: The handler table is only modified during initialization. The
//         registers are accessed by single stores except in `interrupt_free`
unsafe impl Sync for Itc {}

impl Itc {
    /// Construct an `Itc` for the registers at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to the ITC registers (or memory of the same layout)
    /// valid for the lifetime of the returned value.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: base as *const ItcRegs,
            handlers: HandlerTable::new(),
        }
    }

    #[inline]
    fn regs(&self) -> &ItcRegs {
        // Safety: Guaranteed by the caller of `new`
        unsafe { &*self.regs }
    }

    /// Put the controller into a known state: every source disabled, not
    /// forced, and of the normal priority class, with arbitration and
    /// priority masking disabled.
    pub fn init(&self) {
        let regs = self.regs();
        regs.INTCNTL.set(0);
        regs.NIMASK.set(NIMASK_NONE);
        regs.INTENABLE.set(0);
        regs.INTTYPE.set(0);
        regs.INTFRC.set(0);
        log::debug!("ITC initialized");
    }

    /// Install `handler` for `source`. The last write wins.
    pub fn set_handler(&self, source: InterruptSource, handler: Handler) {
        log::trace!("set_handler({:?}, {:?})", source, handler);
        self.handlers.set(source as usize, handler);
    }

    #[inline]
    pub fn handler(&self, source: InterruptSource) -> Handler {
        self.handlers.get(source as usize)
    }

    /// Get the handler installed for the source numbered `num`
    /// ([`Handler::Unhandled`] if it's out of range).
    #[inline]
    pub fn handler_num(&self, num: InterruptNum) -> Handler {
        self.handlers.get(num)
    }

    #[inline]
    pub fn enable_interrupt(&self, source: InterruptSource) {
        self.regs().INTENNUM.set(source as u32);
    }

    #[inline]
    pub fn disable_interrupt(&self, source: InterruptSource) {
        self.regs().INTDISNUM.set(source as u32);
    }

    #[inline]
    pub fn is_interrupt_enabled(&self, source: InterruptSource) -> bool {
        self.regs().INTENABLE.get() & source.bit() != 0
    }

    /// Route `source` to IRQ (normal) or FIQ (fast).
    pub fn set_priority(&self, source: InterruptSource, priority: InterruptPriority) {
        let reg = &self.regs().INTTYPE;
        interrupt_free(|| match priority {
            InterruptPriority::Normal => reg.set(reg.get() & !source.bit()),
            InterruptPriority::Fast => reg.set(reg.get() | source.bit()),
        });
    }

    pub fn priority(&self, source: InterruptSource) -> InterruptPriority {
        if self.regs().INTTYPE.get() & source.bit() != 0 {
            InterruptPriority::Fast
        } else {
            InterruptPriority::Normal
        }
    }

    /// Assert `source` by software.
    pub fn force_interrupt(&self, source: InterruptSource) {
        let reg = &self.regs().INTFRC;
        interrupt_free(|| reg.set(reg.get() | source.bit()));
    }

    pub fn unforce_interrupt(&self, source: InterruptSource) {
        let reg = &self.regs().INTFRC;
        interrupt_free(|| reg.set(reg.get() & !source.bit()));
    }

    /// Get the highest-priority pending normal source and disable it so that
    /// its handler can run with IRQs enabled.
    pub fn acknowledge_interrupt(&self) -> Option<InterruptSource> {
        let pending = self.regs().NIPEND.get() & ALL_SOURCES;
        if pending == 0 {
            return None;
        }

        let num = 31 - pending.leading_zeros() as usize;
        let source = InterruptSource::try_from(num).ok()?;
        self.disable_interrupt(source);
        Some(source)
    }

    /// Re-enable a source disabled by [`Self::acknowledge_interrupt`].
    #[inline]
    pub fn end_interrupt(&self, source: InterruptSource) {
        self.enable_interrupt(source);
    }

    #[inline]
    pub fn end_interrupt_num(&self, num: InterruptNum) {
        if let Ok(source) = InterruptSource::try_from(num) {
            self.end_interrupt(source);
        }
    }

    /// Call the handler of every pending normal source, highest priority
    /// first, without nesting.
    pub fn service_normal_interrupt(&self) {
        self.service_pending(self.regs().NIPEND.get());
    }

    /// Call the handler of every pending fast source, highest priority
    /// first.
    pub fn service_fast_interrupt(&self) {
        self.service_pending(self.regs().FIPEND.get());
    }

    fn service_pending(&self, pending: u32) {
        for &source in InterruptSource::ALL.iter().rev() {
            if pending & source.bit() == 0 {
                continue;
            }
            if !self.handlers.dispatch(source as usize) {
                // Nobody can clear the request
                self.disable_interrupt(source);
                log::warn!("disabled {:?}, which has no handler", source);
            }
        }
    }
}
