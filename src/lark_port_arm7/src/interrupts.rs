//! Processor interrupt mask primitives.
//!
//! These read-modify-write the control field of CPSR. They only work in a
//! privileged mode: in User mode the write is silently ignored by the
//! hardware. Calling them from User mode is the caller's responsibility and
//! is not checked.
use crate::arm::{Psr, PSR};

/// The IRQ and FIQ mask bits observed by a disable primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqFiqState {
    irq_masked: bool,
    fiq_masked: bool,
}

impl IrqFiqState {
    /// Both interrupt classes unmasked.
    pub const ENABLED: Self = Self {
        irq_masked: false,
        fiq_masked: false,
    };

    /// Both interrupt classes masked.
    pub const DISABLED: Self = Self {
        irq_masked: true,
        fiq_masked: true,
    };

    /// Decode the bits as they appear in `PSR[7:6]` (`0b10` = IRQ masked,
    /// `0b01` = FIQ masked).
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            irq_masked: bits & 0b10 != 0,
            fiq_masked: bits & 0b01 != 0,
        }
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        (self.irq_masked as u32) << 1 | self.fiq_masked as u32
    }

    #[inline]
    pub fn from_psr(psr: Psr) -> Self {
        Self {
            irq_masked: psr.is_set(PSR::I),
            fiq_masked: psr.is_set(PSR::F),
        }
    }

    #[inline]
    pub const fn irq_masked(self) -> bool {
        self.irq_masked
    }

    #[inline]
    pub const fn fiq_masked(self) -> bool {
        self.fiq_masked
    }

    /// Replace both mask bits of `psr`.
    #[inline]
    pub fn apply(self, mut psr: Psr) -> Psr {
        psr.modify(PSR::I.val(self.irq_masked as u32) + PSR::F.val(self.fiq_masked as u32));
        psr
    }

    /// Replace the IRQ mask bit of `psr`.
    #[inline]
    pub fn apply_irq(self, mut psr: Psr) -> Psr {
        psr.modify(PSR::I.val(self.irq_masked as u32));
        psr
    }

    /// Replace the FIQ mask bit of `psr`.
    #[inline]
    pub fn apply_fiq(self, mut psr: Psr) -> Psr {
        psr.modify(PSR::F.val(self.fiq_masked as u32));
        psr
    }
}

/// The interrupt mask of the executing ARM7TDMI core.
#[cfg(target_arch = "arm")]
pub struct Arm7;

#[cfg(target_arch = "arm")]
mod imp {
    use lark_portkit::critical::InterruptMask;
    use tock_registers::interfaces::{Readable, Writeable};

    use super::{Arm7, IrqFiqState};
    use crate::arm::CPSR;

    impl Arm7 {
        #[inline]
        fn replace(&self, f: impl FnOnce(IrqFiqState, crate::arm::Psr) -> crate::arm::Psr) -> IrqFiqState {
            let psr = CPSR.extract();
            let prior = IrqFiqState::from_psr(psr);
            CPSR.set(f(prior, psr).get());
            prior
        }

        /// Mask IRQ and return the prior mask bits.
        #[inline]
        pub fn disable_irq(&self) -> IrqFiqState {
            self.replace(|_, psr| IrqFiqState::DISABLED.apply_irq(psr))
        }

        /// Restore the IRQ mask bit from `prior`. The FIQ mask bit is left
        /// untouched.
        #[inline]
        pub fn restore_irq(&self, prior: IrqFiqState) {
            self.replace(|_, psr| prior.apply_irq(psr));
        }

        /// Mask FIQ and return the prior mask bits.
        #[inline]
        pub fn disable_fiq(&self) -> IrqFiqState {
            self.replace(|_, psr| IrqFiqState::DISABLED.apply_fiq(psr))
        }

        /// Restore the FIQ mask bit from `prior`. The IRQ mask bit is left
        /// untouched.
        #[inline]
        pub fn restore_fiq(&self, prior: IrqFiqState) {
            self.replace(|_, psr| prior.apply_fiq(psr));
        }
    }

    impl InterruptMask for Arm7 {
        type Prior = IrqFiqState;

        #[inline]
        fn disable_interrupts(&self) -> IrqFiqState {
            self.replace(|_, psr| IrqFiqState::DISABLED.apply(psr))
        }

        #[inline]
        fn restore_interrupts(&self, prior: IrqFiqState) {
            self.replace(|_, psr| prior.apply(psr));
        }

        #[inline]
        fn enable_interrupts(&self) {
            self.restore_interrupts(IrqFiqState::ENABLED);
        }
    }
}
