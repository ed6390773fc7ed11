//! Converts a tick frequency into a prescaler and compare period for a
//! periodic 16-bit timer.
use core::fmt;

/// The largest divisor exponent (the timer clock is the peripheral clock
/// divided by `2^log_divisor`).
pub const MAX_LOG_DIVISOR: u8 = 7;

/// The largest period that fits in the 16-bit comparator.
pub const MAX_PERIOD: u32 = 0xffff;

/// The smallest period producing a stable compare interrupt.
pub const MIN_PERIOD: u32 = 2;

/// The parameters for programming a timer channel to fire periodically.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PeriodicCfg {
    /// The prescaler exponent, in range `0..=MAX_LOG_DIVISOR`.
    pub log_divisor: u8,
    /// The number of timer clock cycles between interrupts, in range
    /// `MIN_PERIOD..=MAX_PERIOD`.
    pub period: u32,
    /// The interrupt rate actually achieved. Rate-dependent computations must
    /// use this value instead of the requested one.
    pub actual_hz: u32,
}

/// Error type for [`PeriodicCfg::new`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CfgError {
    /// The peripheral clock frequency is zero.
    ClockZero,
    /// The requested interrupt frequency is zero.
    FrequencyZero,
}

impl CfgError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClockZero => "the peripheral clock frequency must not be zero",
            Self::FrequencyZero => "the tick frequency must not be zero",
        }
    }

    pub const fn panic(self) -> ! {
        match self {
            Self::ClockZero => panic!("the peripheral clock frequency must not be zero"),
            Self::FrequencyZero => panic!("the tick frequency must not be zero"),
        }
    }
}

impl fmt::Display for CfgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PeriodicCfg {
    /// Find the smallest divisor exponent for which the rounded period fits
    /// in the comparator.
    ///
    /// If no exponent works (the requested frequency is too low), the result
    /// is clamped to the largest exponent and the largest period, and
    /// `actual_hz` reports the degraded rate.
    pub const fn new(clock_hz: u32, requested_hz: u32) -> Result<Self, CfgError> {
        if clock_hz == 0 {
            return Err(CfgError::ClockZero);
        } else if requested_hz == 0 {
            return Err(CfgError::FrequencyZero);
        }

        let clock = clock_hz as u64;
        let mut log_divisor = 0;
        let mut period = MAX_PERIOD as u64;
        let mut found = false;
        while log_divisor <= MAX_LOG_DIVISOR {
            let denom = (requested_hz as u64) << log_divisor;
            // Round to nearest
            let p = (clock + denom / 2) / denom;
            if p <= MAX_PERIOD as u64 {
                period = p;
                found = true;
                break;
            }
            log_divisor += 1;
        }

        if !found {
            log_divisor = MAX_LOG_DIVISOR;
            period = MAX_PERIOD as u64;
        }

        if period < MIN_PERIOD as u64 {
            period = MIN_PERIOD as u64;
        }

        Ok(Self {
            log_divisor,
            period: period as u32,
            actual_hz: (clock / (period << log_divisor)) as u32,
        })
    }

    /// Get the number of peripheral clock cycles between interrupts.
    #[inline]
    pub const fn clock_cycles(&self) -> u64 {
        (self.period as u64) << self.log_divisor
    }
}
