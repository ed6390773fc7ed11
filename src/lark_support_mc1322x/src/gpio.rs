//! The GPIO driver
#![allow(non_snake_case)]
use core::fmt;
use tock_registers::{
    interfaces::{Readable, Writeable},
    registers::{ReadWrite, WriteOnly},
};

use crate::dev::PinConfig;

/// The base address of the GPIO registers.
pub const GPIO_BASE: usize = 0x8000_0000;

/// The number of pins.
pub const NUM_PINS: u32 = 64;

/// The number of 32-pin ports.
pub const NUM_PORTS: u32 = 2;

#[repr(C)]
#[allow(dead_code)] // pad control isn't used yet
struct GpioRegs {
    PAD_DIR: [ReadWrite<u32>; 2],
    DATA: [ReadWrite<u32>; 2],
    PU_EN: [ReadWrite<u32>; 2],
    /// Two bits per pin
    FUNC_SEL: [ReadWrite<u32>; 4],
    DATA_SEL: [ReadWrite<u32>; 2],
    PAD_PU_SEL: [ReadWrite<u32>; 2],
    PAD_HYST_EN: [ReadWrite<u32>; 2],
    PAD_KEEP: [ReadWrite<u32>; 2],
    DATA_SET: [WriteOnly<u32>; 2],
    DATA_RESET: [WriteOnly<u32>; 2],
    DIR_SET: [WriteOnly<u32>; 2],
    DIR_RESET: [WriteOnly<u32>; 2],
}

/// The function of a pin.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum PinFunction {
    Gpio = 0,
    Alternate1 = 1,
    Alternate2 = 2,
    Alternate3 = 3,
}

/// Error type for [`Gpio`]'s methods.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GpioError {
    /// The pin or port number is out of range.
    InvalidParameter,
}

impl GpioError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParameter => "the pin or port number is out of range",
        }
    }
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handle to the GPIO module.
pub struct Gpio {
    regs: *const GpioRegs,
}

// Safety: Every register is either accessed by a single store or owned by
//         the initialization code
unsafe impl Sync for Gpio {}
unsafe impl Send for Gpio {}

#[inline]
fn check_port(port: u32) -> Result<usize, GpioError> {
    if port < NUM_PORTS {
        Ok(port as usize)
    } else {
        Err(GpioError::InvalidParameter)
    }
}

/// Get the port index and the bit mask of `pin`.
#[inline]
fn check_pin(pin: u32) -> Result<(usize, u32), GpioError> {
    if pin < NUM_PINS {
        Ok(((pin >> 5) as usize, 1 << (pin & 0x1f)))
    } else {
        Err(GpioError::InvalidParameter)
    }
}

impl Gpio {
    /// Construct a `Gpio` for the registers at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to the GPIO registers (or memory of the same
    /// layout) valid for the lifetime of the returned value.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: base as *const GpioRegs,
        }
    }

    #[inline]
    fn regs(&self) -> &GpioRegs {
        // Safety: Guaranteed by the caller of `new`
        unsafe { &*self.regs }
    }

    pub fn set_port_dir_input(&self, port: u32, mask: u32) -> Result<(), GpioError> {
        let port = check_port(port)?;
        self.regs().DIR_RESET[port].set(mask);
        Ok(())
    }

    pub fn set_port_dir_output(&self, port: u32, mask: u32) -> Result<(), GpioError> {
        let port = check_port(port)?;
        self.regs().DIR_SET[port].set(mask);
        Ok(())
    }

    pub fn set_pin_dir_input(&self, pin: u32) -> Result<(), GpioError> {
        let (port, bit) = check_pin(pin)?;
        self.regs().DIR_RESET[port].set(bit);
        Ok(())
    }

    pub fn set_pin_dir_output(&self, pin: u32) -> Result<(), GpioError> {
        let (port, bit) = check_pin(pin)?;
        self.regs().DIR_SET[port].set(bit);
        Ok(())
    }

    pub fn set_port(&self, port: u32, mask: u32) -> Result<(), GpioError> {
        let port = check_port(port)?;
        self.regs().DATA_SET[port].set(mask);
        Ok(())
    }

    pub fn clear_port(&self, port: u32, mask: u32) -> Result<(), GpioError> {
        let port = check_port(port)?;
        self.regs().DATA_RESET[port].set(mask);
        Ok(())
    }

    pub fn set_pin(&self, pin: u32) -> Result<(), GpioError> {
        let (port, bit) = check_pin(pin)?;
        self.regs().DATA_SET[port].set(bit);
        Ok(())
    }

    pub fn clear_pin(&self, pin: u32) -> Result<(), GpioError> {
        let (port, bit) = check_pin(pin)?;
        self.regs().DATA_RESET[port].set(bit);
        Ok(())
    }

    /// Read the levels of a port's 32 pins.
    pub fn port(&self, port: u32) -> Result<u32, GpioError> {
        let port = check_port(port)?;
        Ok(self.regs().DATA[port].get())
    }

    /// Read the level of a pin.
    pub fn pin(&self, pin: u32) -> Result<bool, GpioError> {
        let (port, bit) = check_pin(pin)?;
        Ok(self.regs().DATA[port].get() & bit != 0)
    }

    /// Set the function of every pin of `port` selected by `mask`.
    pub fn set_port_func(&self, port: u32, func: PinFunction, mask: u32) -> Result<(), GpioError> {
        let port = check_port(port)?;
        (0..32)
            .filter(|i| mask & (1 << i) != 0)
            .for_each(|i| self.write_func(port as u32 * 32 + i, func));
        Ok(())
    }

    pub fn set_pin_func(&self, pin: u32, func: PinFunction) -> Result<(), GpioError> {
        check_pin(pin)?;
        self.write_func(pin, func);
        Ok(())
    }

    /// Get the function of a pin.
    pub fn pin_func(&self, pin: u32) -> Result<PinFunction, GpioError> {
        check_pin(pin)?;
        let reg = &self.regs().FUNC_SEL[(pin >> 4) as usize];
        Ok(match (reg.get() >> ((pin & 0xf) << 1)) & 0b11 {
            0 => PinFunction::Gpio,
            1 => PinFunction::Alternate1,
            2 => PinFunction::Alternate2,
            _ => PinFunction::Alternate3,
        })
    }

    fn write_func(&self, pin: u32, func: PinFunction) {
        let reg = &self.regs().FUNC_SEL[(pin >> 4) as usize];
        let shift = (pin & 0xf) << 1;
        reg.set(reg.get() & !(0b11 << shift) | (func as u32) << shift);
    }
}

impl PinConfig for Gpio {
    fn set_pin_func(&self, pin: u32, func: PinFunction) -> Result<(), GpioError> {
        Gpio::set_pin_func(self, pin, func)
    }

    fn set_pin_dir_input(&self, pin: u32) -> Result<(), GpioError> {
        Gpio::set_pin_dir_input(self, pin)
    }

    fn set_pin_dir_output(&self, pin: u32) -> Result<(), GpioError> {
        Gpio::set_pin_dir_output(self, pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn sim_gpio() -> (Gpio, &'static GpioRegs) {
        let regs: &'static GpioRegs = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        (unsafe { Gpio::new(regs as *const _ as usize) }, regs)
    }

    /// Read back a write-only register of the simulated register block.
    fn peek(reg: &WriteOnly<u32>) -> u32 {
        unsafe { (reg as *const WriteOnly<u32> as *const u32).read_volatile() }
    }

    #[test]
    fn register_layout() {
        let (_, regs) = sim_gpio();
        let base = regs as *const _ as usize;
        assert_eq!(&regs.FUNC_SEL[0] as *const _ as usize - base, 0x18);
        assert_eq!(&regs.DATA_SET[0] as *const _ as usize - base, 0x48);
        assert_eq!(&regs.DIR_RESET[1] as *const _ as usize - base, 0x64);
    }

    #[test]
    fn pin_writes_select_word_and_bit() {
        let (gpio, regs) = sim_gpio();

        gpio.set_pin_dir_output(14).unwrap();
        assert_eq!(peek(&regs.DIR_SET[0]), 1 << 14);
        gpio.set_pin_dir_input(47).unwrap();
        assert_eq!(peek(&regs.DIR_RESET[1]), 1 << 15);
        gpio.set_pin(63).unwrap();
        assert_eq!(peek(&regs.DATA_SET[1]), 1 << 31);
        gpio.clear_port(0, 0xf0).unwrap();
        assert_eq!(peek(&regs.DATA_RESET[0]), 0xf0);

        regs.DATA[1].set(0b100);
        assert_eq!(gpio.pin(34), Ok(true));
        assert_eq!(gpio.pin(33), Ok(false));
        assert_eq!(gpio.port(1), Ok(0b100));
    }

    #[test]
    fn function_select_preserves_neighbors() {
        let (gpio, regs) = sim_gpio();

        regs.FUNC_SEL[0].set(0xffff_ffff);
        gpio.set_pin_func(14, PinFunction::Alternate1).unwrap();
        assert_eq!(regs.FUNC_SEL[0].get(), 0xdfff_ffff);
        assert_eq!(gpio.pin_func(14), Ok(PinFunction::Alternate1));
        assert_eq!(gpio.pin_func(15), Ok(PinFunction::Alternate3));

        gpio.set_port_func(1, PinFunction::Alternate2, 0x0001_0001).unwrap();
        assert_eq!(regs.FUNC_SEL[2].get(), 0b10);
        assert_eq!(regs.FUNC_SEL[3].get(), 0b10);
    }

    #[quickcheck]
    fn invalid_parameters_leave_hardware_alone(pin: u32, port: u32) {
        let pin = pin.max(NUM_PINS);
        let port = port.max(NUM_PORTS);
        let (gpio, regs) = sim_gpio();

        assert_eq!(gpio.set_pin(pin), Err(GpioError::InvalidParameter));
        assert_eq!(gpio.set_pin_dir_output(pin), Err(GpioError::InvalidParameter));
        assert_eq!(
            gpio.set_pin_func(pin, PinFunction::Alternate1),
            Err(GpioError::InvalidParameter)
        );
        assert_eq!(gpio.set_port(port, !0), Err(GpioError::InvalidParameter));
        assert_eq!(gpio.port(port), Err(GpioError::InvalidParameter));

        assert!(regs.FUNC_SEL.iter().all(|r| r.get() == 0));
        assert!(regs.DATA_SET.iter().chain(&regs.DIR_SET).all(|r| peek(r) == 0));
    }
}
