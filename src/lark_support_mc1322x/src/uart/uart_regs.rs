#![allow(non_snake_case)]
use tock_registers::{
    register_bitfields,
    registers::{ReadOnly, ReadWrite},
};

#[repr(C)]
pub struct UartRegs {
    /// UART Control Register
    pub CON: ReadWrite<u32, CON::Register>,
    /// UART Status Register. Reading it clears the error bits.
    pub STAT: ReadOnly<u32, STAT::Register>,
    /// UART Data Register
    pub DATA: ReadWrite<u32>,
    /// UART RX Control Register
    pub RXCON: ReadWrite<u32, FIFOCON::Register>,
    /// UART TX Control Register
    pub TXCON: ReadWrite<u32, FIFOCON::Register>,
    /// UART CTS Level Register
    pub CTS: ReadWrite<u32>,
    /// UART Baud Rate Register
    pub BR: ReadWrite<u32, BR::Register>,
}

register_bitfields! {u32,
    pub CON [
        /// Transmitter Enable
        TXE OFFSET(0) NUMBITS(1) [],
        /// Receiver Enable
        RXE OFFSET(1) NUMBITS(1) [],
        /// Parity Enable
        PEN OFFSET(2) NUMBITS(1) [],
        /// Even Parity
        EP OFFSET(3) NUMBITS(1) [],
        /// Two Stop Bits
        ST2 OFFSET(4) NUMBITS(1) [],
        /// Send Break
        SB OFFSET(5) NUMBITS(1) [],
        CONTX OFFSET(6) NUMBITS(1) [],
        TX_OEN_B OFFSET(7) NUMBITS(1) [],
        /// Oversampling Select
        XTIM OFFSET(10) NUMBITS(1) [
            X16 = 0,
            X8 = 1
        ],
        /// Flow Control Polarity
        FCP OFFSET(11) NUMBITS(1) [],
        /// Flow Control Enable
        FCE OFFSET(12) NUMBITS(1) [],
        /// Mask TX Ready Interrupt
        MTXR OFFSET(13) NUMBITS(1) [],
        /// Mask RX Ready Interrupt
        MRXR OFFSET(14) NUMBITS(1) [],
        /// Test Mode
        TST OFFSET(15) NUMBITS(1) []
    ]
}

register_bitfields! {u32,
    pub STAT [
        /// Start Bit Error
        SE OFFSET(0) NUMBITS(1) [],
        /// Parity Error
        PE OFFSET(1) NUMBITS(1) [],
        /// Frame Error
        FE OFFSET(2) NUMBITS(1) [],
        /// TX FIFO Overrun Error
        TOE OFFSET(3) NUMBITS(1) [],
        /// RX FIFO Overrun Error
        ROE OFFSET(4) NUMBITS(1) [],
        /// RX FIFO Underrun Error
        RUE OFFSET(5) NUMBITS(1) [],
        /// The RX FIFO holds at least `RXCON.LEVEL` bytes
        RXRDY OFFSET(6) NUMBITS(1) [],
        /// The TX FIFO has at least `TXCON.LEVEL` free entries
        TXRDY OFFSET(7) NUMBITS(1) []
    ]
}

register_bitfields! {u32,
    pub FIFOCON [
        /// The interrupt trigger level (write)
        LEVEL OFFSET(0) NUMBITS(5) [],
        /// The number of bytes in the RX FIFO, or the number of free entries
        /// in the TX FIFO (read)
        FIFO_ADDR_DIFF OFFSET(0) NUMBITS(6) []
    ]
}

register_bitfields! {u32,
    pub BR [
        MOD OFFSET(0) NUMBITS(16) [],
        INC OFFSET(16) NUMBITS(16) []
    ]
}
