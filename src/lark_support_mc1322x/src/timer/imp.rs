//! The implementation of the TMR tick driver.
use lark_port_arm7::PortInstance;
use lark_portkit::{dispatch::Handler, periodic::PeriodicCfg};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use super::{
    cfg::{TickTimerOptions, TimerError, TimerId},
    timer_regs::{TmrChannel, TmrRegs, CSCTRL, CTRL, SCTRL},
};
use crate::{
    interrupt_free,
    itc::{
        cfg::{InterruptPriority, InterruptSource},
        imp::{Itc, ItcInstance},
    },
};

/// Implemented on a kernel trait type by [`use_tick_timer!`].
///
/// # Safety
///
/// Only meant to be implemented by [`use_tick_timer!`].
pub unsafe trait TickTimerInstance: PortInstance + ItcInstance + TickTimerOptions {
    const TICK_CFG: PeriodicCfg =
        match PeriodicCfg::new(Self::PERIPHERAL_CLOCK_HZ, Self::TICK_RATE_HZ) {
            Ok(x) => x,
            Err(e) => e.panic(),
        };

    fn timers() -> &'static Timers;
}

/// The four channels of the TMR module.
pub struct Timers {
    regs: *const TmrRegs,
}

// Safety: `ENBL` is updated in `interrupt_free`. A channel is owned by
//         whoever configured it
unsafe impl Sync for Timers {}

impl Timers {
    /// Construct a `Timers` for the registers at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to the TMR registers (or memory of the same layout)
    /// valid for the lifetime of the returned value.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: base as *const TmrRegs,
        }
    }

    #[inline]
    fn channel(&self, id: TimerId) -> &TmrChannel {
        // Safety: Guaranteed by the caller of `new`
        unsafe { &(*self.regs).channels[id as usize] }
    }

    #[inline]
    fn enbl(&self) -> &tock_registers::registers::ReadWrite<u16> {
        &self.channel(TimerId::Timer0).ENBL
    }

    pub fn enable(&self, id: TimerId) {
        let enbl = self.enbl();
        interrupt_free(|| enbl.set(enbl.get() | id.enable_bit()));
    }

    pub fn disable(&self, id: TimerId) {
        let enbl = self.enbl();
        interrupt_free(|| enbl.set(enbl.get() & !id.enable_bit()));
    }

    #[inline]
    pub fn is_enabled(&self, id: TimerId) -> bool {
        self.enbl().get() & id.enable_bit() != 0
    }

    /// Program `id` to count up to `cfg.period` at the peripheral clock
    /// divided by `2^cfg.log_divisor`, reloading at every compare. The
    /// channel is left disabled.
    pub fn configure_periodic(&self, id: TimerId, cfg: &PeriodicCfg) {
        self.disable(id);

        let ch = self.channel(id);
        let compare = (cfg.period - 1) as u16;
        ch.LOAD.set(0);
        ch.CMPLD1.set(compare);
        ch.COMP1.set(compare);
        ch.CNTR.set(ch.LOAD.get());
        ch.SCTRL.set(0);
        ch.CSCTRL.modify(CSCTRL::CL1::OnCompare1);
        ch.CTRL.write(
            CTRL::COUNT_MODE::RisingEdges
                + CTRL::PRIMARY_CNT_SRC.val(8 + cfg.log_divisor as u16)
                + CTRL::LENGTH::UntilCompare,
        );
    }

    /// Configure `id` with `cfg` and start generating compare interrupts
    /// through the TMR source of `itc`.
    pub fn start_periodic_interrupt(&self, itc: &Itc, id: TimerId, cfg: &PeriodicCfg) {
        self.configure_periodic(id, cfg);
        self.clear_compare_flag(id);
        self.enable(id);
        itc.enable_interrupt(InterruptSource::Tmr);
        self.channel(id).SCTRL.modify(SCTRL::TCFIE::SET);
    }

    /// Make `id` raise an interrupt `hz` times a second. Returns the
    /// achieved rate.
    pub fn setup_periodic_interrupt(
        &self,
        itc: &Itc,
        id: TimerId,
        hz: u32,
        clock_hz: u32,
    ) -> Result<u32, TimerError> {
        let cfg = PeriodicCfg::new(clock_hz, hz)?;
        log::debug!("{:?}: {} Hz requested, {:?}", id, hz, cfg);
        self.start_periodic_interrupt(itc, id, &cfg);
        Ok(cfg.actual_hz)
    }

    pub fn clear_compare_flag(&self, id: TimerId) {
        let ch = self.channel(id);
        ch.SCTRL.modify(SCTRL::TCF::CLEAR);
        ch.CSCTRL.modify(CSCTRL::TCF1::CLEAR + CSCTRL::TCF2::CLEAR);
    }

    #[inline]
    pub fn is_compare_flag_set(&self, id: TimerId) -> bool {
        self.channel(id).SCTRL.is_set(SCTRL::TCF)
    }

    /// Get the highest-numbered channel whose compare flag is set.
    pub fn pending_channel(&self) -> Option<TimerId> {
        TimerId::ALL
            .iter()
            .rev()
            .copied()
            .find(|&id| self.is_compare_flag_set(id))
    }

    /// Clear the compare flag of every channel that raised one.
    pub fn clear_pending_compare_flags(&self) {
        TimerId::ALL
            .iter()
            .copied()
            .filter(|&id| self.is_compare_flag_set(id))
            .for_each(|id| self.clear_compare_flag(id));
    }
}

/// Implements [`lark_port_arm7::Timer::init`]
pub fn init<Traits: TickTimerInstance>() {
    let itc = Traits::itc();
    let cfg = Traits::TICK_CFG;

    itc.set_priority(InterruptSource::Tmr, InterruptPriority::Normal);
    itc.set_handler(InterruptSource::Tmr, Handler::Fn(handle_tick::<Traits>));

    log::debug!(
        "tick timer: {:?} at {} Hz ({:?})",
        Traits::TICK_TIMER,
        Traits::TICK_RATE_HZ,
        cfg
    );
    Traits::timers().start_periodic_interrupt(itc, Traits::TICK_TIMER, &cfg);
}

fn handle_tick<Traits: TickTimerInstance>() {
    // Safety: We are the tick interrupt handler
    unsafe { tick::<Traits>(Traits::timers()) };
}

/// Process a tick and acknowledge it.
///
/// # Safety
///
/// Only meant to be called from the tick interrupt handler.
pub unsafe fn tick<Traits: PortInstance>(timers: &Timers) {
    unsafe { Traits::port_state().timer_tick::<Traits>() };
    timers.clear_pending_compare_flags();
}
