//! Per-connection receive buffer used to reassemble fixed-size frames.
//!
//! The buffer knows nothing about frame sizes. Callers ask whether a frame of
//! `n` bytes is fully present and, once they have acted on it, consume exactly
//! `n` bytes from the front. Trailing bytes of the next frame are shifted down
//! to offset 0 in place.

use std::io::{self, Read};

/// Larger than any client frame, so a full buffer always starts with a
/// complete frame.
pub const RX_CAPACITY: usize = 1024;

pub struct RxBuffer {
    data: [u8; RX_CAPACITY],
    len: usize,
}

impl RxBuffer {
    pub fn new() -> Self {
        Self {
            data: [0; RX_CAPACITY],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == RX_CAPACITY
    }

    /// Performs a single read into the free tail of the buffer.
    ///
    /// Must not be called on a full buffer: a zero-length read would be
    /// indistinguishable from end of stream.
    pub fn fill_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        debug_assert!(!self.is_full());
        let n = reader.read(&mut self.data[self.len..])?;
        self.len += n;
        Ok(n)
    }

    /// First byte of the oldest buffered frame.
    pub fn opcode(&self) -> Option<u8> {
        (self.len > 0).then(|| self.data[0])
    }

    /// The first `size` bytes, if that many have arrived.
    pub fn frame(&self, size: usize) -> Option<&[u8]> {
        (size <= self.len).then(|| &self.data[..size])
    }

    pub fn consume(&mut self, size: usize) {
        let size = size.min(self.len);
        self.data.copy_within(size..self.len, 0);
        self.len -= size;
    }
}

impl Default for RxBuffer {
    fn default() -> Self {
        Self::new()
    }
}
