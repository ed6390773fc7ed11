//! Fractional baud-rate generator parameters
//!
//! The generator adds `inc` to an accumulator on every cycle of the
//! oversampling clock and emits a sample tick whenever the accumulator
//! passes `modulus`. The oversampling clock runs at 1/16 of the peripheral
//! clock, and each bit is sampled 8 times at the resulting rate.
use core::fmt;
use num_rational::Ratio;

/// The modulus used unless otherwise specified.
pub const DEFAULT_MODULUS: u16 = 9999;

/// The parameters of a fractional baud-rate generator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BaudCfg {
    pub inc: u16,
    pub modulus: u16,
}

/// Error type for [`BaudCfg::new`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BaudError {
    /// The baud rate is zero.
    BaudZero,
    /// The baud rate is too low to be represented with the given modulus.
    TooSlow,
    /// The baud rate exceeds what the peripheral clock can generate.
    TooFast,
}

impl BaudError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BaudZero => "the baud rate must not be zero",
            Self::TooSlow => "the baud rate is too low for the peripheral clock",
            Self::TooFast => "the baud rate is too high for the peripheral clock",
        }
    }
}

impl fmt::Display for BaudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BaudCfg {
    /// Compute the parameters for `baud` with [`DEFAULT_MODULUS`].
    pub fn new(clock_hz: u32, baud: u32) -> Result<Self, BaudError> {
        Self::with_modulus(clock_hz, baud, DEFAULT_MODULUS)
    }

    /// Compute the parameters for `baud`, rounding `inc` down.
    pub fn with_modulus(clock_hz: u32, baud: u32, modulus: u16) -> Result<Self, BaudError> {
        if baud == 0 {
            return Err(BaudError::BaudZero);
        }
        let sample_clock = (clock_hz >> 4) as u64;
        if sample_clock == 0 {
            return Err(BaudError::TooFast);
        }

        let inc = Ratio::new(baud as u64 * modulus as u64, sample_clock).to_integer();
        if inc == 0 {
            Err(BaudError::TooSlow)
        } else if inc > modulus as u64 {
            Err(BaudError::TooFast)
        } else {
            Ok(Self {
                inc: inc as u16,
                modulus,
            })
        }
    }

    /// Get the value of the baud-rate register (`inc` in the upper half,
    /// `modulus` in the lower half).
    #[inline]
    pub const fn register_value(&self) -> u32 {
        (self.inc as u32) << 16 | self.modulus as u32
    }

    /// Get the baud rate actually generated.
    pub fn actual_baud(&self, clock_hz: u32) -> Ratio<u64> {
        Ratio::new((clock_hz >> 4) as u64 * self.inc as u64, self.modulus as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::iproduct;

    const CLOCK: u32 = 24_000_000;

    #[test]
    fn known_values() {
        let cfg = BaudCfg::new(CLOCK, 115_200).unwrap();
        assert_eq!(
            cfg,
            BaudCfg {
                inc: 767,
                modulus: 9999
            }
        );
        assert_eq!(cfg.register_value(), 767 << 16 | 9999);
    }

    #[test]
    fn errors() {
        assert_eq!(BaudCfg::new(CLOCK, 0), Err(BaudError::BaudZero));
        assert_eq!(BaudCfg::new(CLOCK, 100), Err(BaudError::TooSlow));
        assert_eq!(BaudCfg::new(CLOCK, 2_000_000), Err(BaudError::TooFast));
        assert_eq!(BaudCfg::new(15, 9600), Err(BaudError::TooFast));
    }

    /// The generated rate never exceeds the request and is off by less than
    /// one `inc` step.
    #[test]
    fn error_bound() {
        let _ = env_logger::builder().is_test(true).try_init();

        for (clock, baud) in iproduct!(
            [12_000_000, 24_000_000],
            [9600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800]
        ) {
            let cfg = BaudCfg::new(clock, baud).unwrap();
            let actual = cfg.actual_baud(clock);
            let step = Ratio::new((clock >> 4) as u64, cfg.modulus as u64);
            log::debug!("{} baud @ {} Hz → {:?} ({} baud)", baud, clock, cfg, actual);

            assert!(actual <= Ratio::from_integer(baud as u64));
            assert!(actual + step > Ratio::from_integer(baud as u64));
        }
    }
}
