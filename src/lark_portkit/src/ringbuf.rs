//! Fixed-capacity byte FIFO
use crate::utils::Init;

#[doc = svgbobdoc::transform!(
/// A fixed-capacity byte FIFO shared by an interrupt handler and foreground
/// code.
///
/// <center>
/// ```svgbob
///               head                    tail
///                 |                       |
///                 v                       v
///      +-----+-----+-----+-----+-----+-----+-----+-----+
///      |     |  a  |  b  |  c  |  d  |  e  |     |     |   len = 5
///      +-----+-----+-----+-----+-----+-----+-----+-----+
///                 pop ->                 <- push
/// ```
/// </center>
///
/// The buffer does no synchronization of its own. Each instance must have
/// exactly one party mutating it at a time, which drivers guarantee by
/// masking the interrupt source that shares it.
)]
#[derive(Clone)]
pub struct RingBuffer<const N: usize> {
    storage: [u8; N],
    /// The position of the oldest byte.
    head: usize,
    /// The position where the next byte will be stored.
    tail: usize,
    len: usize,
}

impl<const N: usize> Init for RingBuffer<N> {
    const INIT: Self = Self::new();
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    /// The capacity.
    pub const CAPACITY: usize = N;

    /// Construct an empty buffer.
    pub const fn new() -> Self {
        assert!(N > 0, "a ring buffer must have a non-zero capacity");
        Self {
            storage: [0; N],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Discard the contents.
    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Get the number of bytes that can be pushed before the buffer becomes
    /// full.
    #[inline]
    pub const fn free(&self) -> usize {
        N - self.len
    }

    /// Append a byte. Returns `Err(byte)` if the buffer is full.
    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<(), u8> {
        if self.is_full() {
            return Err(byte);
        }
        self.storage[self.tail] = byte;
        self.tail = Self::wrap(self.tail + 1);
        self.len += 1;
        Ok(())
    }

    /// Remove the oldest byte.
    #[inline]
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.storage[self.head];
        self.head = Self::wrap(self.head + 1);
        self.len -= 1;
        Some(byte)
    }

    /// Get the oldest byte without removing it.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        (!self.is_empty()).then(|| self.storage[self.head])
    }

    /// Append as many bytes from `bytes` as fit. Returns the number of bytes
    /// appended.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(self.free());
        for &byte in &bytes[..count] {
            self.storage[self.tail] = byte;
            self.tail = Self::wrap(self.tail + 1);
        }
        self.len += count;
        count
    }

    /// Remove as many bytes as are available into `out`. Returns the number
    /// of bytes removed.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.len);
        for slot in &mut out[..count] {
            *slot = self.storage[self.head];
            self.head = Self::wrap(self.head + 1);
        }
        self.len -= count;
        count
    }

    #[inline]
    fn wrap(i: usize) -> usize {
        if i == N {
            0
        } else {
            i
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use std::{collections::VecDeque, vec, vec::Vec};

    #[test]
    fn wraps_around() {
        let mut rb = RingBuffer::<4>::new();
        assert_eq!(rb.write(&[1, 2, 3]), 3);
        assert_eq!(rb.pop(), Some(1));
        assert_eq!(rb.pop(), Some(2));
        assert_eq!(rb.write(&[4, 5, 6, 7]), 3);
        assert!(rb.is_full());
        assert_eq!(rb.push(8), Err(8));
        assert_eq!(rb.peek(), Some(3));

        let mut out = [0; 8];
        assert_eq!(rb.read(&mut out), 4);
        assert_eq!(&out[..4], &[3, 4, 5, 6]);
        assert!(rb.is_empty());
        assert_eq!(rb.pop(), None);
        assert_eq!(rb.peek(), None);
    }

    #[test]
    fn short_counts_on_saturation() {
        let mut rb = RingBuffer::<256>::new();
        let data: Vec<u8> = (0..300).map(|i| i as u8).collect();
        assert_eq!(rb.write(&data), 256);
        assert_eq!(rb.write(&data[256..]), 0);

        let mut out = vec![0; 300];
        assert_eq!(rb.read(&mut out), 256);
        assert_eq!(&out[..256], &data[..256]);
        assert_eq!(rb.read(&mut out), 0);
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Push(u8),
        Pop,
        Write(u8, u8),
        Read(u8),
    }

    fn decode_ops(bytes: &[u8]) -> impl Iterator<Item = Op> + '_ {
        bytes.chunks(2).map(|c| {
            let arg = c.get(1).copied().unwrap_or(0);
            match c[0] % 4 {
                0 => Op::Push(arg),
                1 => Op::Pop,
                2 => Op::Write(arg, c[0]),
                _ => Op::Read(arg % 16),
            }
        })
    }

    /// Compare against `VecDeque` for random interleavings of a producer and
    /// a consumer.
    #[quickcheck]
    fn matches_model(bytes: Vec<u8>) {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut rb = RingBuffer::<7>::new();
        let mut model = VecDeque::new();

        for op in decode_ops(&bytes) {
            log::trace!("{:?}", op);
            match op {
                Op::Push(b) => {
                    let expected = if model.len() < 7 {
                        model.push_back(b);
                        Ok(())
                    } else {
                        Err(b)
                    };
                    assert_eq!(rb.push(b), expected);
                }
                Op::Pop => assert_eq!(rb.pop(), model.pop_front()),
                Op::Write(len, seed) => {
                    let data: Vec<u8> = (0..len % 10).map(|i| seed.wrapping_add(i)).collect();
                    let count = rb.write(&data);
                    assert_eq!(count, data.len().min(7 - model.len()));
                    model.extend(&data[..count]);
                }
                Op::Read(len) => {
                    let mut out = vec![0; len as usize];
                    let count = rb.read(&mut out);
                    let expected: Vec<u8> =
                        model.drain(..(len as usize).min(model.len())).collect();
                    assert_eq!(&out[..count], &expected[..]);
                }
            }

            assert!(rb.len() <= RingBuffer::<7>::CAPACITY);
            assert_eq!(rb.len(), model.len());
            assert_eq!(rb.free(), 7 - model.len());
        }
    }
}
