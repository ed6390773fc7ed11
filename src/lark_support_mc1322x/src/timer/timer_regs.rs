#![allow(non_snake_case)]
use tock_registers::{register_bitfields, registers::ReadWrite};

/// The number of TMR channels.
pub const NUM_CHANNELS: usize = 4;

/// The registers of one TMR channel. All registers are 16 bits wide.
#[repr(C)]
pub struct TmrChannel {
    /// Compare Register 1
    pub COMP1: ReadWrite<u16>,
    /// Compare Register 2
    pub COMP2: ReadWrite<u16>,
    /// Capture Register
    pub CAPT: ReadWrite<u16>,
    /// Load Register
    pub LOAD: ReadWrite<u16>,
    /// Hold Register
    pub HOLD: ReadWrite<u16>,
    /// Counter Register
    pub CNTR: ReadWrite<u16>,
    /// Control Register
    pub CTRL: ReadWrite<u16, CTRL::Register>,
    /// Status and Control Register
    pub SCTRL: ReadWrite<u16, SCTRL::Register>,
    /// Comparator Load Register 1
    pub CMPLD1: ReadWrite<u16>,
    /// Comparator Load Register 2
    pub CMPLD2: ReadWrite<u16>,
    /// Comparator Status and Control Register
    pub CSCTRL: ReadWrite<u16, CSCTRL::Register>,
    _reserved: [u16; 4],
    /// Channel Enable Register. Only meaningful in channel 0, where bit `n`
    /// enables channel `n`.
    pub ENBL: ReadWrite<u16>,
}

#[repr(C)]
pub struct TmrRegs {
    pub channels: [TmrChannel; NUM_CHANNELS],
}

register_bitfields! {u16,
    pub CTRL [
        OUTPUT_MODE OFFSET(0) NUMBITS(3) [],
        /// Co-channel Initialization
        CO_INIT OFFSET(3) NUMBITS(1) [],
        /// Count Direction
        DIR OFFSET(4) NUMBITS(1) [
            Up = 0,
            Down = 1
        ],
        /// Count Length
        LENGTH OFFSET(5) NUMBITS(1) [
            /// Roll over
            RollOver = 0,
            /// Reinitialize the counter at compare
            UntilCompare = 1
        ],
        /// Count Once
        ONCE OFFSET(6) NUMBITS(1) [],
        SECONDARY_CNT_SRC OFFSET(7) NUMBITS(2) [],
        /// Primary Count Source. `8 + n` selects the peripheral clock divided
        /// by `2^n`.
        PRIMARY_CNT_SRC OFFSET(9) NUMBITS(4) [],
        COUNT_MODE OFFSET(13) NUMBITS(3) [
            NoOperation = 0,
            /// Count rising edges of the primary source
            RisingEdges = 1
        ]
    ]
}

register_bitfields! {u16,
    pub SCTRL [
        OEN OFFSET(0) NUMBITS(1) [],
        OPS OFFSET(1) NUMBITS(1) [],
        FORCE OFFSET(2) NUMBITS(1) [],
        VAL OFFSET(3) NUMBITS(1) [],
        EEOF OFFSET(4) NUMBITS(1) [],
        MSTR OFFSET(5) NUMBITS(1) [],
        CAPTURE_MODE OFFSET(6) NUMBITS(2) [],
        INPUT OFFSET(8) NUMBITS(1) [],
        IPS OFFSET(9) NUMBITS(1) [],
        IEFIE OFFSET(10) NUMBITS(1) [],
        IEF OFFSET(11) NUMBITS(1) [],
        TOFIE OFFSET(12) NUMBITS(1) [],
        TOF OFFSET(13) NUMBITS(1) [],
        /// Timer Compare Flag Interrupt Enable
        TCFIE OFFSET(14) NUMBITS(1) [],
        /// Timer Compare Flag
        TCF OFFSET(15) NUMBITS(1) []
    ]
}

register_bitfields! {u16,
    pub CSCTRL [
        /// Compare Load Control 1
        CL1 OFFSET(0) NUMBITS(2) [
            Never = 0,
            /// Load COMP1 from CMPLD1 when COMP1 matches
            OnCompare1 = 1,
            OnCompare2 = 2
        ],
        /// Compare Load Control 2
        CL2 OFFSET(2) NUMBITS(2) [],
        TCF1 OFFSET(4) NUMBITS(1) [],
        TCF2 OFFSET(5) NUMBITS(1) [],
        TCF1EN OFFSET(6) NUMBITS(1) [],
        TCF2EN OFFSET(7) NUMBITS(1) [],
        FILT_EN OFFSET(13) NUMBITS(1) [],
        DBG_EN OFFSET(14) NUMBITS(2) []
    ]
}
