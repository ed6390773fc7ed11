//! Register access for the UART driver
use tock_registers::{
    fields::FieldValue,
    interfaces::{Readable, Writeable},
    LocalRegisterCopy,
};

use super::{cfg::UartId, uart_regs::UartRegs};
use crate::interrupt_free;

pub use super::uart_regs::{BR, CON, FIFOCON, STAT};

/// A copy of the control register.
pub type Con = LocalRegisterCopy<u32, CON::Register>;

/// A copy of the status register.
pub type Stat = LocalRegisterCopy<u32, STAT::Register>;

/// The register interface of a UART channel.
///
/// [`UartMmio`] is the memory-mapped implementation. The driver itself
/// ([`Uart`](super::Uart)) only talks to this trait.
pub trait UartHw {
    fn con(&self) -> Con;

    fn set_con(&self, value: Con);

    /// Update some fields of the control register. Must be atomic with
    /// respect to the channel's interrupt handler.
    fn modify_con(&self, field: FieldValue<u32, CON::Register>) {
        let mut con = self.con();
        con.modify(field);
        self.set_con(con);
    }

    /// Read the status register, clearing its error bits.
    fn stat(&self) -> Stat;

    /// Get the number of bytes in the RX FIFO.
    fn rx_available(&self) -> usize;

    /// Get the number of free entries in the TX FIFO.
    fn tx_free(&self) -> usize;

    fn read_data(&self) -> u8;

    fn write_data(&self, byte: u8);

    fn set_rx_level(&self, level: u32);

    fn set_tx_level(&self, level: u32);

    /// Write the baud-rate register.
    fn set_br(&self, value: u32);
}

/// The memory-mapped registers of a UART channel.
pub struct UartMmio {
    regs: *const UartRegs,
}

// Safety: The control register is updated in `interrupt_free`. The other
//         registers are accessed by the channel's owner only
unsafe impl Send for UartMmio {}
unsafe impl Sync for UartMmio {}

impl UartMmio {
    /// Construct a `UartMmio` for the registers at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to a UART register block valid for the lifetime of
    /// the returned value, and there must be at most one owner for each
    /// register block.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: base as *const UartRegs,
        }
    }

    /// Construct a `UartMmio` for the channel `id`.
    ///
    /// # Safety
    ///
    /// There must be at most one owner for each channel.
    pub const unsafe fn for_id(id: UartId) -> Self {
        unsafe { Self::new(id.base()) }
    }

    #[inline]
    fn regs(&self) -> &UartRegs {
        // Safety: Guaranteed by the caller of `new`
        unsafe { &*self.regs }
    }
}

impl UartHw for UartMmio {
    #[inline]
    fn con(&self) -> Con {
        self.regs().CON.extract()
    }

    #[inline]
    fn set_con(&self, value: Con) {
        self.regs().CON.set(value.get());
    }

    fn modify_con(&self, field: FieldValue<u32, CON::Register>) {
        let con = &self.regs().CON;
        interrupt_free(|| con.set(field.modify(con.get())));
    }

    #[inline]
    fn stat(&self) -> Stat {
        self.regs().STAT.extract()
    }

    #[inline]
    fn rx_available(&self) -> usize {
        self.regs().RXCON.read(FIFOCON::FIFO_ADDR_DIFF) as usize
    }

    #[inline]
    fn tx_free(&self) -> usize {
        self.regs().TXCON.read(FIFOCON::FIFO_ADDR_DIFF) as usize
    }

    #[inline]
    fn read_data(&self) -> u8 {
        self.regs().DATA.get() as u8
    }

    #[inline]
    fn write_data(&self, byte: u8) {
        self.regs().DATA.set(byte as u32);
    }

    #[inline]
    fn set_rx_level(&self, level: u32) {
        self.regs().RXCON.write(FIFOCON::LEVEL.val(level));
    }

    #[inline]
    fn set_tx_level(&self, level: u32) {
        self.regs().TXCON.write(FIFOCON::LEVEL.val(level));
    }

    #[inline]
    fn set_br(&self, value: u32) {
        self.regs().BR.set(value);
    }
}
