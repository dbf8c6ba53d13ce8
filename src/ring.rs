//! Fixed-capacity circular byte buffer for serial ingestion.
//!
//! Single producer, single consumer: `push` is the producer side (interrupt
//! or DMA completion), everything else belongs to the consumer. The head
//! index is only written by the producer and the tail only by the consumer,
//! except on overflow, where the producer claims the oldest byte by
//! advancing the tail - data loss is the accepted overflow policy, not an
//! error.
//!
//! Indices are free-running `u16`s masked down to the (power-of-two)
//! capacity, so a 32-bit target updates each index with a single word write.

use crate::framer::Terminator;

/// Circular byte buffer of capacity `N` (must be a power of two, <= 32768).
pub struct RingBuffer<const N: usize> {
    buf: [u8; N],
    /// Producer-owned write index (free-running).
    head: u16,
    /// Consumer-owned read index (free-running).
    tail: u16,
}

impl<const N: usize> RingBuffer<N> {
    const CAPACITY_IS_POW2: () = assert!(N.is_power_of_two() && N <= 32768);

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::CAPACITY_IS_POW2;
        Self {
            buf: [0; N],
            head: 0,
            tail: 0,
        }
    }

    /// Number of unread bytes.
    pub fn len(&self) -> usize {
        self.head.wrapping_sub(self.tail) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    fn slot(index: u16) -> usize {
        index as usize & (N - 1)
    }

    /// Append one byte. Never blocks, never fails: when the buffer is full
    /// the oldest unread byte is dropped to make room.
    pub fn push(&mut self, byte: u8) {
        if self.len() == N {
            self.tail = self.tail.wrapping_add(1);
        }
        self.buf[Self::slot(self.head)] = byte;
        self.head = self.head.wrapping_add(1);
    }

    /// Append a slice, byte by byte, with the same overflow policy.
    pub fn push_slice(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    /// Remove and return the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let b = self.buf[Self::slot(self.tail)];
        self.tail = self.tail.wrapping_add(1);
        Some(b)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.buf[Self::slot(self.tail.wrapping_add(offset as u16))]
    }

    /// Extract the next terminated line, if one is present.
    ///
    /// Scans from the tail for the first `\n` or `\r`; a `\r` immediately
    /// followed by `\n` within the available data counts as a two-byte
    /// terminator. Line content (terminator excluded) is copied into
    /// `storage`, silently truncating if it does not fit, and the tail is
    /// advanced past the terminator. Returns the number of bytes copied and
    /// the terminator that ended the line.
    pub fn peek_line(&mut self, storage: &mut [u8]) -> Option<(usize, Terminator)> {
        let available = self.len();
        let mut end = None;
        for i in 0..available {
            match self.peek_at(i) {
                b'\n' => {
                    end = Some((i, Terminator::Lf));
                    break;
                }
                b'\r' => {
                    let term = if i + 1 < available && self.peek_at(i + 1) == b'\n' {
                        Terminator::CrLf
                    } else {
                        Terminator::Cr
                    };
                    end = Some((i, term));
                    break;
                }
                _ => {}
            }
        }
        let (line_len, terminator) = end?;

        let copy_len = line_len.min(storage.len());
        for (i, dst) in storage.iter_mut().enumerate().take(copy_len) {
            *dst = self.peek_at(i);
        }
        let consumed = line_len + terminator.len();
        self.tail = self.tail.wrapping_add(consumed as u16);
        Some((copy_len, terminator))
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
