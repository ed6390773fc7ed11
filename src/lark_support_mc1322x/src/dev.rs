//! The seams between the drivers and the rest of the system
use core::{cell::Cell, fmt};

use crate::gpio::{GpioError, PinFunction};

/// A byte-stream device.
pub trait CharDevice {
    /// Read up to `buf.len()` bytes without blocking. Returns the number of
    /// bytes read.
    fn read(&self, buf: &mut [u8]) -> usize;

    /// Write up to `buf.len()` bytes without blocking. Returns the number of
    /// bytes accepted.
    fn write(&self, buf: &[u8]) -> usize;
}

/// Pin configuration capability.
pub trait PinConfig {
    fn set_pin_func(&self, pin: u32, func: PinFunction) -> Result<(), GpioError>;
    fn set_pin_dir_input(&self, pin: u32) -> Result<(), GpioError>;
    fn set_pin_dir_output(&self, pin: u32) -> Result<(), GpioError>;
}

/// A name-keyed registry of devices.
pub trait DeviceRegistry {
    fn register_device(
        &self,
        name: &'static str,
        device: &'static (dyn CharDevice + Sync),
    ) -> Result<(), RegisterDeviceError>;
}

/// Error type for [`DeviceRegistry::register_device`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegisterDeviceError {
    /// A device with the same name is already registered.
    NameTaken,
    /// The registry has no room for another device.
    Full,
}

impl RegisterDeviceError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NameTaken => "a device with the same name is already registered",
            Self::Full => "the device registry is full",
        }
    }
}

impl fmt::Display for RegisterDeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type DeviceEntry = Option<(&'static str, &'static (dyn CharDevice + Sync))>;

/// A fixed-capacity [`DeviceRegistry`].
pub struct DeviceTable<const N: usize> {
    entries: [Cell<DeviceEntry>; N],
}

// Safety: Devices are registered during initialization, which doesn't overlap
//         with lookups
unsafe impl<const N: usize> Sync for DeviceTable<N> {}

impl<const N: usize> DeviceTable<N> {
    pub const fn new() -> Self {
        Self {
            entries: [const { Cell::new(None) }; N],
        }
    }

    /// Find the device registered as `name`.
    pub fn find(&self, name: &str) -> Option<&'static (dyn CharDevice + Sync)> {
        self.entries
            .iter()
            .filter_map(Cell::get)
            .find(|&(n, _)| n == name)
            .map(|(_, device)| device)
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for DeviceTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DeviceRegistry for DeviceTable<N> {
    fn register_device(
        &self,
        name: &'static str,
        device: &'static (dyn CharDevice + Sync),
    ) -> Result<(), RegisterDeviceError> {
        if self.find(name).is_some() {
            return Err(RegisterDeviceError::NameTaken);
        }
        let slot = self
            .entries
            .iter()
            .find(|e| e.get().is_none())
            .ok_or(RegisterDeviceError::Full)?;
        slot.set(Some((name, device)));
        log::debug!("registered device {:?}", name);
        Ok(())
    }
}
