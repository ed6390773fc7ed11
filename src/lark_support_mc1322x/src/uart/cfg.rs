//! Channel descriptions and configuration of the UART driver
use core::fmt;
use lark_portkit::baud::BaudError;

use crate::{
    dev::{DeviceRegistry, PinConfig, RegisterDeviceError},
    gpio::GpioError,
    itc::{cfg::InterruptSource, imp::Itc},
};

/// The capacity of each direction's ring buffer unless specified otherwise.
pub const DEFAULT_RING_CAPACITY: usize = 256;

/// The TX FIFO trigger level. The TX interrupt fires when the FIFO is empty.
pub const TX_LEVEL: u32 = 31;

/// The RX FIFO trigger level. The RX interrupt fires when any byte is
/// received.
pub const RX_LEVEL: u32 = 1;

/// A UART channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UartId {
    Uart1,
    Uart2,
}

/// The pins used by a UART channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UartPins {
    pub tx: u32,
    pub rx: u32,
    pub cts: u32,
    pub rts: u32,
}

impl UartPins {
    /// All pins in the order `tx`, `rx`, `cts`, `rts`.
    #[inline]
    pub const fn all(&self) -> [u32; 4] {
        [self.tx, self.rx, self.cts, self.rts]
    }
}

impl UartId {
    /// The base address of the channel's registers.
    pub const fn base(self) -> usize {
        match self {
            Self::Uart1 => 0x8000_5000,
            Self::Uart2 => 0x8000_b000,
        }
    }

    pub const fn pins(self) -> UartPins {
        match self {
            Self::Uart1 => UartPins {
                tx: 14,
                rx: 15,
                cts: 16,
                rts: 17,
            },
            Self::Uart2 => UartPins {
                tx: 18,
                rx: 19,
                cts: 20,
                rts: 21,
            },
        }
    }

    /// The ITC source of the channel.
    pub const fn source(self) -> InterruptSource {
        match self {
            Self::Uart1 => InterruptSource::Uart1,
            Self::Uart2 => InterruptSource::Uart2,
        }
    }

    /// The name under which the channel registers itself as a device.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uart1 => "uart1",
            Self::Uart2 => "uart2",
        }
    }
}

/// The collaborators [`Uart::init`](super::Uart::init) needs.
#[derive(Clone, Copy)]
pub struct UartEnv<'a> {
    pub pins: &'a dyn PinConfig,
    pub itc: &'a Itc,
    pub registry: &'a dyn DeviceRegistry,
    /// The peripheral clock frequency, measured in hertz.
    pub clock_hz: u32,
}

/// Error type for [`Uart::init`](super::Uart::init).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UartError {
    /// The baud rate can't be generated from the peripheral clock.
    BadBaudRate(BaudError),
    /// A pin of the channel couldn't be configured.
    BadPin(GpioError),
    /// The device couldn't be registered.
    Registration(RegisterDeviceError),
}

impl UartError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BadBaudRate(e) => e.as_str(),
            Self::BadPin(_) => "a pin of the channel couldn't be configured",
            Self::Registration(e) => e.as_str(),
        }
    }
}

impl fmt::Display for UartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BaudError> for UartError {
    fn from(e: BaudError) -> Self {
        Self::BadBaudRate(e)
    }
}

impl From<GpioError> for UartError {
    fn from(e: GpioError) -> Self {
        Self::BadPin(e)
    }
}

impl From<RegisterDeviceError> for UartError {
    fn from(e: RegisterDeviceError) -> Self {
        Self::Registration(e)
    }
}
