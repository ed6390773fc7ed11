#![allow(non_snake_case)]
use tock_registers::{
    register_bitfields,
    registers::{ReadOnly, ReadWrite, WriteOnly},
};

#[repr(C)]
pub struct ItcRegs {
    /// Interrupt Control Register
    pub INTCNTL: ReadWrite<u32, INTCNTL::Register>,
    /// Normal Interrupt Mask Register
    pub NIMASK: ReadWrite<u32>,
    /// Interrupt Enable Number Register
    pub INTENNUM: WriteOnly<u32>,
    /// Interrupt Disable Number Register
    pub INTDISNUM: WriteOnly<u32>,
    /// Interrupt Enable Register
    pub INTENABLE: ReadWrite<u32>,
    /// Interrupt Type Register. A set bit routes the source to FIQ.
    pub INTTYPE: ReadWrite<u32>,
    _reserved: [u32; 4],
    /// Normal Interrupt Vector
    pub NIVECTOR: ReadOnly<u32>,
    /// Fast Interrupt Vector
    pub FIVECTOR: ReadOnly<u32>,
    /// Interrupt Source Register
    pub INTSRC: ReadOnly<u32>,
    /// Interrupt Force Register
    pub INTFRC: ReadWrite<u32>,
    /// Normal Interrupt Pending Register
    pub NIPEND: ReadOnly<u32>,
    /// Fast Interrupt Pending Register
    pub FIPEND: ReadOnly<u32>,
}

register_bitfields! {u32,
    pub INTCNTL [
        /// Fast Interrupt Arbiter Disable
        FIAD OFFSET(19) NUMBITS(1) [],
        /// Normal Interrupt Arbiter Disable
        NIAD OFFSET(20) NUMBITS(1) []
    ]
}
