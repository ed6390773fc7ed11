//! The interrupt-driven UART driver
use core::{
    cell::{Cell, UnsafeCell},
    convert::Infallible,
    hint::spin_loop,
};
use lark_portkit::{
    baud::BaudCfg,
    dispatch::{Handler, Isr},
    ringbuf::RingBuffer,
};

use super::{
    cfg::{UartEnv, UartError, UartId, DEFAULT_RING_CAPACITY, RX_LEVEL, TX_LEVEL},
    hw::{Con, UartHw, CON, STAT},
};
use crate::{dev::CharDevice, gpio::PinFunction, itc::cfg::InterruptPriority};

/// A UART channel with a ring buffer of capacity `N` for each direction.
///
/// Bytes move between the rings and the hardware FIFOs in the channel's
/// interrupt handler ([`Isr::service`]). The application side never blocks
/// the handler for longer than a ring copy, and only masks the channel's own
/// interrupt for the affected direction (`CON.MRXR` or `CON.MTXR`) while
/// doing so.
///
/// ```rust,ignore
/// static UART1: Uart<UartMmio> = Uart::new(UartId::Uart1, unsafe { UartMmio::for_id(UartId::Uart1) });
///
/// UART1.init(115_200, &env)?;
/// let n = UART1.send(b"hello");
/// ```
pub struct Uart<H, const N: usize = DEFAULT_RING_CAPACITY> {
    id: UartId,
    hw: H,
    /// Owned by the interrupt handler while `CON.MRXR` is clear.
    rx: UnsafeCell<RingBuffer<N>>,
    /// Owned by the interrupt handler while `CON.MTXR` is clear.
    tx: UnsafeCell<RingBuffer<N>>,
    rx_callback: Cell<Option<fn()>>,
    tx_callback: Cell<Option<fn()>>,
    last_error: Cell<Option<UartError>>,
}

// Safety: Each ring is accessed by either the application or the interrupt
//         handler depending on the direction's mask bit. The other fields
//         are single words updated by single stores.
unsafe impl<H: UartHw + Send, const N: usize> Sync for Uart<H, N> {}

impl<H: UartHw, const N: usize> Uart<H, N> {
    pub const fn new(id: UartId, hw: H) -> Self {
        Self {
            id,
            hw,
            rx: UnsafeCell::new(RingBuffer::new()),
            tx: UnsafeCell::new(RingBuffer::new()),
            rx_callback: Cell::new(None),
            tx_callback: Cell::new(None),
            last_error: Cell::new(None),
        }
    }

    #[inline]
    pub fn id(&self) -> UartId {
        self.id
    }

    #[inline]
    pub fn hw(&self) -> &H {
        &self.hw
    }

    /// Get the error reported by the last failed [`Self::init`].
    #[inline]
    pub fn last_error(&self) -> Option<UartError> {
        self.last_error.get()
    }

    /// Set the function called by the interrupt handler after it moved
    /// received bytes into the RX ring. `None` removes it.
    #[inline]
    pub fn set_receive_callback(&self, callback: Option<fn()>) {
        self.rx_callback.set(callback);
    }

    /// Set the function called by the interrupt handler after it moved
    /// bytes from the TX ring to the hardware. `None` removes it.
    #[inline]
    pub fn set_send_callback(&self, callback: Option<fn()>) {
        self.tx_callback.set(callback);
    }

    /// # Safety
    ///
    /// The RX interrupt must be masked, or the caller must be the interrupt
    /// handler with the RX interrupt unmasked.
    #[inline]
    unsafe fn with_rx<R>(&self, f: impl FnOnce(&mut RingBuffer<N>) -> R) -> R {
        f(unsafe { &mut *self.rx.get() })
    }

    /// # Safety
    ///
    /// See [`Self::with_rx`].
    #[inline]
    unsafe fn with_tx<R>(&self, f: impl FnOnce(&mut RingBuffer<N>) -> R) -> R {
        f(unsafe { &mut *self.tx.get() })
    }

    /// Bring up the channel at `baud_rate` and register it in
    /// `env.registry`.
    ///
    /// The baud rate is validated before any register is touched. On failure
    /// the error is also recorded in [`Self::last_error`].
    pub fn init(&'static self, baud_rate: u32, env: &UartEnv<'_>) -> Result<(), UartError>
    where
        H: Send + 'static,
    {
        let result = self.init_inner(baud_rate, env);
        if let Err(e) = result {
            log::warn!("{:?}: initialization failed: {}", self.id, e);
        }
        self.last_error.set(result.err());
        result
    }

    fn init_inner(&'static self, baud_rate: u32, env: &UartEnv<'_>) -> Result<(), UartError>
    where
        H: Send + 'static,
    {
        let br = BaudCfg::new(env.clock_hz, baud_rate)?;
        let hw = &self.hw;

        // The baud rate can only be changed while the channel is disabled
        let mut con = Con::new(0);
        con.modify(CON::MTXR::SET + CON::MRXR::SET);
        hw.set_con(con);
        hw.set_br(br.register_value());

        // The pins follow the peripheral only while it's enabled
        hw.modify_con(CON::TXE::SET + CON::RXE::SET);

        let pins = self.id.pins();
        for pin in pins.all() {
            env.pins.set_pin_func(pin, PinFunction::Alternate1)?;
        }
        env.pins.set_pin_dir_output(pins.tx)?;
        env.pins.set_pin_dir_output(pins.cts)?;
        env.pins.set_pin_dir_input(pins.rx)?;
        env.pins.set_pin_dir_input(pins.rts)?;

        // Safety: Both directions are masked
        unsafe {
            self.with_rx(|rx| rx.clear());
            self.with_tx(|tx| tx.clear());
        }

        hw.set_tx_level(TX_LEVEL);
        hw.set_rx_level(RX_LEVEL);

        let source = self.id.source();
        env.itc.set_priority(source, InterruptPriority::Normal);
        env.itc.set_handler(source, Handler::Isr(self));
        env.itc.enable_interrupt(source);

        self.rx_callback.set(None);
        self.tx_callback.set(None);

        hw.modify_con(CON::MRXR::CLEAR);

        env.registry.register_device(self.id.name(), self)?;

        log::debug!(
            "{:?}: {} baud (BR = {:#010x})",
            self.id,
            baud_rate,
            br.register_value()
        );
        Ok(())
    }

    /// Transmit `byte`, blocking until the hardware accepts it. Bytes
    /// buffered by [`Self::send`] are transmitted first.
    pub fn send_byte(&self, byte: u8) {
        let hw = &self.hw;
        let saved = hw.con().read(CON::MTXR);
        hw.modify_con(CON::MTXR::SET);

        // Safety: TX is masked
        unsafe {
            self.with_tx(|tx| {
                while let Some(b) = tx.peek() {
                    if hw.tx_free() > 0 {
                        hw.write_data(b);
                        tx.pop();
                    } else {
                        spin_loop();
                    }
                }
            })
        };

        while hw.tx_free() == 0 {
            spin_loop();
        }
        hw.write_data(byte);

        hw.modify_con(CON::MTXR.val(saved));
    }

    /// Receive a byte, blocking until one is available. Bytes already in
    /// the RX ring are returned first.
    pub fn receive_byte(&self) -> u8 {
        let hw = &self.hw;
        let saved = hw.con().read(CON::MRXR);
        hw.modify_con(CON::MRXR::SET);

        // Safety: RX is masked
        let byte = match unsafe { self.with_rx(|rx| rx.pop()) } {
            Some(b) => b,
            None => {
                while hw.rx_available() == 0 {
                    spin_loop();
                }
                hw.read_data()
            }
        };

        hw.modify_con(CON::MRXR.val(saved));
        byte
    }

    /// Put as many bytes of `bytes` as fit into the TX ring and return how
    /// many were taken. Doesn't block.
    pub fn send(&self, bytes: &[u8]) -> usize {
        self.hw.modify_con(CON::MTXR::SET);
        // Safety: TX is masked
        let count = unsafe { self.with_tx(|tx| tx.write(bytes)) };
        self.hw.modify_con(CON::MTXR::CLEAR);
        count
    }

    /// Take as many bytes as are available from the RX ring and return how
    /// many were read. Doesn't block.
    pub fn receive(&self, out: &mut [u8]) -> usize {
        self.hw.modify_con(CON::MRXR::SET);
        // Safety: RX is masked
        let count = unsafe { self.with_rx(|rx| rx.read(out)) };
        self.hw.modify_con(CON::MRXR::CLEAR);
        count
    }

    /// Get the number of bytes in the TX ring waiting for the hardware.
    pub fn tx_pending(&self) -> usize {
        let saved = self.hw.con().read(CON::MTXR);
        self.hw.modify_con(CON::MTXR::SET);
        // Safety: TX is masked
        let len = unsafe { self.with_tx(|tx| tx.len()) };
        self.hw.modify_con(CON::MTXR.val(saved));
        len
    }

    /// Get an [`embedded_hal::serial`] adapter for this channel.
    #[inline]
    pub fn nb(&self) -> NbSerial<'_, H, N> {
        NbSerial(self)
    }
}

impl<H: UartHw, const N: usize> Isr for Uart<H, N> {
    fn service(&self) {
        let hw = &self.hw;

        // Error bits are cleared by this read and not acted upon
        let stat = hw.stat();
        let con = hw.con();

        if stat.is_set(STAT::RXRDY) && !con.is_set(CON::MRXR) {
            // Safety: We are the handler and RX is unmasked
            unsafe {
                self.with_rx(|rx| {
                    while !rx.is_full() && hw.rx_available() > 0 {
                        let _ = rx.push(hw.read_data());
                    }
                })
            };

            if let Some(callback) = self.rx_callback.get() {
                callback();
            }

            // Safety: Ditto
            if unsafe { self.with_rx(|rx| rx.is_full()) } {
                hw.modify_con(CON::MRXR::SET);
            }
        }

        if stat.is_set(STAT::TXRDY) && !con.is_set(CON::MTXR) {
            // Safety: We are the handler and TX is unmasked
            unsafe {
                self.with_tx(|tx| {
                    while hw.tx_free() > 0 {
                        match tx.pop() {
                            Some(b) => hw.write_data(b),
                            None => break,
                        }
                    }
                })
            };

            if let Some(callback) = self.tx_callback.get() {
                callback();
            }

            // Safety: Ditto
            if unsafe { self.with_tx(|tx| tx.is_empty()) } {
                hw.modify_con(CON::MTXR::SET);
            }
        }
    }
}

impl<H: UartHw, const N: usize> CharDevice for Uart<H, N> {
    #[inline]
    fn read(&self, buf: &mut [u8]) -> usize {
        self.receive(buf)
    }

    #[inline]
    fn write(&self, buf: &[u8]) -> usize {
        self.send(buf)
    }
}

/// The adapter for [`Uart`] that uses [`::nb`] to notify the caller of a
/// blocking situation.
pub struct NbSerial<'a, H, const N: usize>(&'a Uart<H, N>);

impl<H: UartHw, const N: usize> embedded_hal::serial::Read<u8> for NbSerial<'_, H, N> {
    type Error = Infallible;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let mut byte = [0];
        if self.0.receive(&mut byte) == 1 {
            Ok(byte[0])
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl<H: UartHw, const N: usize> embedded_hal::serial::Write<u8> for NbSerial<'_, H, N> {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        if self.0.send(&[word]) == 1 {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        if self.0.tx_pending() == 0 {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dev::{DeviceTable, PinConfig},
        gpio::GpioError,
        itc::{cfg::InterruptSource, imp::Itc},
        uart::hw::Stat,
    };
    use core::sync::atomic::{AtomicUsize, Ordering};
    use embedded_hal::serial::{Read, Write};
    use quickcheck_macros::quickcheck;
    use std::{cell::RefCell, collections::VecDeque};

    const FIFO_SIZE: usize = 32;

    /// Models the FIFOs and the status logic of a UART channel.
    #[derive(Default)]
    struct SimUart {
        con: Cell<u32>,
        errors: Cell<u32>,
        rx_fifo: RefCell<VecDeque<u8>>,
        tx_fifo: RefCell<VecDeque<u8>>,
        rx_level: Cell<u32>,
        tx_level: Cell<u32>,
        br: Cell<u32>,
        con_writes: RefCell<Vec<u32>>,
    }

    impl SimUart {
        fn masked(&self, field: tock_registers::fields::Field<u32, CON::Register>) -> bool {
            Con::new(self.con.get()).is_set(field)
        }

        /// Drain the TX FIFO as the wire would.
        fn transmit(&self) -> Vec<u8> {
            self.tx_fifo.borrow_mut().drain(..).collect()
        }

        /// Put bytes into the RX FIFO as the wire would. Returns the number
        /// of bytes accepted.
        fn deliver(&self, bytes: &[u8]) -> usize {
            let mut fifo = self.rx_fifo.borrow_mut();
            let n = bytes.len().min(FIFO_SIZE - fifo.len());
            fifo.extend(&bytes[..n]);
            n
        }
    }

    impl UartHw for SimUart {
        fn con(&self) -> Con {
            Con::new(self.con.get())
        }

        fn set_con(&self, value: Con) {
            self.con.set(value.get());
            self.con_writes.borrow_mut().push(value.get());
        }

        fn stat(&self) -> Stat {
            let mut bits = self.errors.replace(0);
            let level = (self.rx_level.get() as usize).max(1);
            if self.rx_fifo.borrow().len() >= level {
                bits |= 1 << 6;
            }
            if self.tx_free() >= self.tx_level.get() as usize {
                bits |= 1 << 7;
            }
            Stat::new(bits)
        }

        fn rx_available(&self) -> usize {
            self.rx_fifo.borrow().len()
        }

        fn tx_free(&self) -> usize {
            FIFO_SIZE - self.tx_fifo.borrow().len()
        }

        fn read_data(&self) -> u8 {
            self.rx_fifo.borrow_mut().pop_front().unwrap_or(0)
        }

        fn write_data(&self, byte: u8) {
            let mut fifo = self.tx_fifo.borrow_mut();
            assert!(fifo.len() < FIFO_SIZE, "TX FIFO overrun");
            fifo.push_back(byte);
        }

        fn set_rx_level(&self, level: u32) {
            self.rx_level.set(level);
        }

        fn set_tx_level(&self, level: u32) {
            self.tx_level.set(level);
        }

        fn set_br(&self, value: u32) {
            self.br.set(value);
        }
    }

    #[derive(Default)]
    struct PinLog(RefCell<Vec<String>>);

    impl PinConfig for PinLog {
        fn set_pin_func(&self, pin: u32, func: PinFunction) -> Result<(), GpioError> {
            self.0.borrow_mut().push(format!("func {} {:?}", pin, func));
            Ok(())
        }

        fn set_pin_dir_input(&self, pin: u32) -> Result<(), GpioError> {
            self.0.borrow_mut().push(format!("in {}", pin));
            Ok(())
        }

        fn set_pin_dir_output(&self, pin: u32) -> Result<(), GpioError> {
            self.0.borrow_mut().push(format!("out {}", pin));
            Ok(())
        }
    }

    struct BrokenPins;

    impl PinConfig for BrokenPins {
        fn set_pin_func(&self, _: u32, _: PinFunction) -> Result<(), GpioError> {
            Err(GpioError::InvalidParameter)
        }

        fn set_pin_dir_input(&self, _: u32) -> Result<(), GpioError> {
            Err(GpioError::InvalidParameter)
        }

        fn set_pin_dir_output(&self, _: u32) -> Result<(), GpioError> {
            Err(GpioError::InvalidParameter)
        }
    }

    /// An ITC on zeroed memory and a pointer to its registers.
    fn sim_itc() -> (&'static Itc, *mut u32) {
        let regs = Box::leak(Box::new([0u32; 16])).as_mut_ptr();
        (Box::leak(Box::new(unsafe { Itc::new(regs as usize) })), regs)
    }

    const ITC_INTENNUM: usize = 2;
    const ITC_INTTYPE: usize = 5;
    const ITC_NIPEND: usize = 14;

    fn sim_uart(id: UartId) -> &'static Uart<SimUart> {
        Box::leak(Box::new(Uart::new(id, SimUart::default())))
    }

    fn bring_up(id: UartId) -> (&'static Uart<SimUart>, &'static Itc, *mut u32) {
        let _ = env_logger::builder().is_test(true).try_init();
        let uart = sim_uart(id);
        let (itc, itc_regs) = sim_itc();
        let pins = PinLog::default();
        let registry: &'static DeviceTable<2> = Box::leak(Box::new(DeviceTable::new()));
        let env = UartEnv {
            pins: &pins,
            itc,
            registry,
            clock_hz: 24_000_000,
        };
        uart.init(115_200, &env).unwrap();
        (uart, itc, itc_regs)
    }

    /// Let the wire and the interrupt handler run until the TX ring is
    /// drained and the handler has masked TX.
    fn run_tx(uart: &Uart<SimUart>) -> Vec<u8> {
        let mut wire = Vec::new();
        while !uart.hw().masked(CON::MTXR) {
            wire.extend(uart.hw().transmit());
            uart.service();
        }
        wire.extend(uart.hw().transmit());
        wire
    }

    #[test]
    fn init_sequence() {
        let _ = env_logger::builder().is_test(true).try_init();
        let uart = sim_uart(UartId::Uart2);
        let (itc, itc_regs) = sim_itc();
        unsafe { itc_regs.add(ITC_INTTYPE).write_volatile(!0) };
        let pins = PinLog::default();
        let registry: &'static DeviceTable<2> = Box::leak(Box::new(DeviceTable::new()));
        uart.set_send_callback(Some(|| {}));

        let env = UartEnv {
            pins: &pins,
            itc,
            registry,
            clock_hz: 24_000_000,
        };
        assert_eq!(uart.init(115_200, &env), Ok(()));
        assert_eq!(uart.last_error(), None);

        let hw = uart.hw();
        assert_eq!(hw.br.get(), 767 << 16 | 9999);
        assert_eq!(
            *hw.con_writes.borrow(),
            [
                1 << 13 | 1 << 14,
                1 << 13 | 1 << 14 | 0b11,
                1 << 13 | 0b11,
            ]
        );
        assert_eq!(hw.tx_level.get(), 31);
        assert_eq!(hw.rx_level.get(), 1);

        assert_eq!(
            *pins.0.borrow(),
            [
                "func 18 Alternate1",
                "func 19 Alternate1",
                "func 20 Alternate1",
                "func 21 Alternate1",
                "out 18",
                "out 20",
                "in 19",
                "in 21",
            ]
        );

        assert_eq!(
            unsafe { itc_regs.add(ITC_INTENNUM).read_volatile() },
            InterruptSource::Uart2 as u32
        );
        assert_eq!(
            unsafe { itc_regs.add(ITC_INTTYPE).read_volatile() } & InterruptSource::Uart2.bit(),
            0
        );
        assert!(!itc.handler(InterruptSource::Uart2).is_unhandled());
        assert!(itc.handler(InterruptSource::Uart1).is_unhandled());
        assert!(uart.tx_callback.get().is_none());
        assert!(registry.find("uart2").is_some());
    }

    #[test]
    fn init_rejects_bad_baud_rate_before_touching_hardware() {
        let uart = sim_uart(UartId::Uart1);
        let (itc, _) = sim_itc();
        let pins = PinLog::default();
        let registry: &'static DeviceTable<2> = Box::leak(Box::new(DeviceTable::new()));
        let env = UartEnv {
            pins: &pins,
            itc,
            registry,
            clock_hz: 24_000_000,
        };

        let e = uart.init(0, &env).unwrap_err();
        assert!(matches!(e, UartError::BadBaudRate(_)));
        assert_eq!(uart.last_error(), Some(e));
        assert!(uart.hw().con_writes.borrow().is_empty());
        assert!(pins.0.borrow().is_empty());
        assert!(itc.handler(InterruptSource::Uart1).is_unhandled());

        assert_eq!(
            uart.init(115_200, &UartEnv {
                pins: &BrokenPins,
                ..env
            }),
            Err(UartError::BadPin(GpioError::InvalidParameter))
        );

        // A successful initialization clears the error
        uart.init(115_200, &env).unwrap();
        assert_eq!(uart.last_error(), None);

        // The name is taken now
        assert_eq!(
            uart.init(115_200, &env),
            Err(UartError::Registration(
                crate::dev::RegisterDeviceError::NameTaken
            ))
        );
    }

    #[test]
    fn send_more_than_ring_capacity() {
        let (uart, _, _) = bring_up(UartId::Uart1);
        let data: Vec<u8> = (0..300).map(|i| i as u8).collect();

        assert_eq!(uart.send(&data), 256);
        assert_eq!(uart.tx_pending(), 256);

        let wire = run_tx(uart);
        assert_eq!(wire, data[..256]);
        assert_eq!(uart.tx_pending(), 0);

        assert_eq!(uart.send(&data[256..]), 44);
        assert_eq!(run_tx(uart), data[256..]);
    }

    #[test]
    fn rx_backpressure() {
        let (uart, _, _) = bring_up(UartId::Uart1);
        let hw = uart.hw();

        let mut sent = 0u32;
        while !hw.masked(CON::MRXR) {
            let chunk: Vec<u8> = (sent..sent + FIFO_SIZE as u32).map(|i| i as u8).collect();
            sent += hw.deliver(&chunk) as u32;
            uart.service();
        }
        assert_eq!(sent, 256);

        // The ring is full, so further bytes stay in the FIFO
        hw.deliver(&[0xa0, 0xa1, 0xa2]);
        uart.service();
        assert_eq!(hw.rx_available(), 3);

        let mut byte = [0];
        assert_eq!(uart.receive(&mut byte), 1);
        assert_eq!(byte[0], 0);
        assert!(!hw.masked(CON::MRXR));

        uart.service();
        assert_eq!(hw.rx_available(), 2);
        assert!(hw.masked(CON::MRXR));

        let mut out = [0u8; 300];
        assert_eq!(uart.receive(&mut out), 256);
        assert_eq!(out[0], 1);
        assert_eq!(out[254], 255);
        assert_eq!(out[255], 0xa0);
    }

    #[test]
    fn blocking_byte_transfers() {
        let (uart, _, _) = bring_up(UartId::Uart1);
        let hw = uart.hw();

        assert_eq!(uart.send(b"abc"), 3);
        // `send` left TX unmasked; `send_byte` restores that
        uart.send_byte(b'd');
        assert_eq!(hw.transmit(), b"abcd");
        assert!(!hw.masked(CON::MTXR));
        assert_eq!(uart.tx_pending(), 0);

        hw.con.set(hw.con.get() | 1 << 13);
        uart.send_byte(b'e');
        assert!(hw.masked(CON::MTXR));
        assert_eq!(hw.transmit(), b"e");

        // Buffered bytes come before the FIFO
        hw.deliver(b"xy");
        uart.service();
        hw.deliver(b"z");
        assert_eq!(uart.receive_byte(), b'x');
        assert_eq!(uart.receive_byte(), b'y');
        assert_eq!(uart.receive_byte(), b'z');
        assert!(!hw.masked(CON::MRXR));
    }

    #[test]
    fn callbacks() {
        static RX_CALLS: AtomicUsize = AtomicUsize::new(0);
        static TX_CALLS: AtomicUsize = AtomicUsize::new(0);

        let (uart, _, _) = bring_up(UartId::Uart1);
        uart.set_receive_callback(Some(|| {
            RX_CALLS.fetch_add(1, Ordering::Relaxed);
        }));
        uart.set_send_callback(Some(|| {
            TX_CALLS.fetch_add(1, Ordering::Relaxed);
        }));

        uart.hw().deliver(b"hi");
        uart.service();
        assert_eq!(RX_CALLS.load(Ordering::Relaxed), 1);
        // TX is masked after initialization
        assert_eq!(TX_CALLS.load(Ordering::Relaxed), 0);

        uart.send(b"!");
        uart.service();
        assert_eq!(TX_CALLS.load(Ordering::Relaxed), 1);

        uart.set_receive_callback(None);
        uart.hw().deliver(b"?");
        uart.service();
        assert_eq!(RX_CALLS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn error_bits_are_cleared() {
        let (uart, _, _) = bring_up(UartId::Uart1);
        uart.hw().errors.set(1 << 2 | 1 << 4);
        uart.service();
        assert_eq!(uart.hw().errors.get(), 0);
    }

    #[test]
    fn dispatched_through_itc() {
        let (uart, itc, itc_regs) = bring_up(UartId::Uart2);
        uart.hw().deliver(b"ok");
        unsafe { itc_regs.add(ITC_NIPEND).write_volatile(InterruptSource::Uart2.bit()) };
        itc.service_normal_interrupt();

        let mut out = [0; 4];
        assert_eq!(uart.read(&mut out), 2);
        assert_eq!(&out[..2], b"ok");
        assert_eq!(uart.write(b"42"), 2);
    }

    #[test]
    fn nb_adapter() {
        let (uart, _, _) = bring_up(UartId::Uart1);
        let mut serial = uart.nb();

        assert_eq!(serial.read(), Err(nb::Error::WouldBlock));
        uart.hw().deliver(b"q");
        uart.service();
        assert_eq!(serial.read(), Ok(b'q'));

        serial.write(b'w').unwrap();
        assert_eq!(serial.flush(), Err(nb::Error::WouldBlock));
        assert_eq!(run_tx(uart), b"w");
        assert_eq!(serial.flush(), Ok(()));

        for _ in 0..256 {
            serial.write(0).unwrap();
        }
        assert_eq!(serial.write(0), Err(nb::Error::WouldBlock));
    }

    #[quickcheck]
    fn stream_order_is_preserved(chunks: Vec<Vec<u8>>) -> bool {
        let (uart, _, _) = bring_up(UartId::Uart1);
        let mut expected = Vec::new();
        let mut wire = Vec::new();

        for chunk in chunks {
            let mut rest = &chunk[..];
            while !rest.is_empty() {
                let n = uart.send(rest);
                expected.extend_from_slice(&rest[..n]);
                rest = &rest[n..];
                wire.extend(uart.hw().transmit());
                uart.service();
            }
        }
        wire.extend(run_tx(uart));

        wire == expected
    }
}
