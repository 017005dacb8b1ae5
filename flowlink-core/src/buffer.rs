//! Fixed-capacity byte ring buffer
//!
//! One instance carries the inbound stream of a channel, another the
//! outbound one. The buffer itself is not synchronized; the channel wraps
//! each instance in a blocking mutex so every index/length update runs
//! with the producer masked.

/// Circular byte queue with FIFO semantics
///
/// When `overwrite` is enabled a put into a full buffer drops the oldest
/// unread byte instead of failing.
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize> {
    data: [u8; N],
    /// Bytes currently queued
    len: usize,
    /// Next write position
    put: usize,
    /// Next read position
    get: usize,
    overwrite: bool,
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    const NON_EMPTY: () = assert!(N > 0, "ring buffer capacity must be non-zero");

    /// Create an empty, zeroed buffer with overwrite disabled
    pub const fn new() -> Self {
        let () = Self::NON_EMPTY;
        Self {
            data: [0; N],
            len: 0,
            put: 0,
            get: 0,
            overwrite: false,
        }
    }

    /// Empty the buffer and zero its storage
    pub fn init(&mut self) {
        self.reset();
        self.data.fill(0);
    }

    /// Empty the buffer and restore the default policy
    ///
    /// Storage is left as is; only [`init`](Self::init) zeroes it.
    pub fn reset(&mut self) {
        self.len = 0;
        self.put = 0;
        self.get = 0;
        self.overwrite = false;
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    pub const fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn set_overwrite(&mut self, allow: bool) {
        self.overwrite = allow;
    }

    /// Bytes that can be put without failing or overwriting
    pub const fn free(&self) -> usize {
        N - self.len
    }

    const fn advance(index: usize) -> usize {
        if index + 1 == N {
            0
        } else {
            index + 1
        }
    }

    /// Queue one byte
    ///
    /// Returns `false`, leaving the buffer untouched, when it is full and
    /// overwrite is disabled.
    pub fn put_byte(&mut self, byte: u8) -> bool {
        if self.len == N {
            if !self.overwrite {
                return false;
            }
            // Drop the oldest byte; length stays at N
            self.get = Self::advance(self.get);
        } else {
            self.len += 1;
        }
        self.data[self.put] = byte;
        self.put = Self::advance(self.put);
        true
    }

    /// Queue all of `bytes` or none of them
    ///
    /// With overwrite disabled the span must fit in the free space. With
    /// overwrite enabled it always succeeds and the oldest bytes make room.
    pub fn put_span(&mut self, bytes: &[u8]) -> bool {
        if !self.overwrite && bytes.len() > self.free() {
            return false;
        }
        for &byte in bytes {
            self.put_byte(byte);
        }
        true
    }

    /// Remove and return the oldest byte
    pub fn get_byte(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.data[self.get];
        self.get = Self::advance(self.get);
        self.len -= 1;
        Some(byte)
    }

    /// Return the oldest byte without removing it
    pub fn peek_byte(&self) -> Option<u8> {
        if self.len == 0 {
            None
        } else {
            Some(self.data[self.get])
        }
    }

    /// Copy the `out.len()` oldest bytes without removing them
    ///
    /// Returns `false` and writes nothing if fewer bytes are queued.
    pub fn peek_span(&self, out: &mut [u8]) -> bool {
        if out.len() > self.len {
            return false;
        }
        let mut index = self.get;
        for slot in out.iter_mut() {
            *slot = self.data[index];
            index = Self::advance(index);
        }
        true
    }

    /// Remove exactly `out.len()` bytes in order
    ///
    /// Returns `false` and removes nothing if fewer bytes are queued.
    pub fn get_span(&mut self, out: &mut [u8]) -> bool {
        if !self.peek_span(out) {
            return false;
        }
        self.discard(out.len());
        true
    }

    /// Drop up to `count` of the oldest bytes, returning how many were dropped
    pub fn discard(&mut self, count: usize) -> usize {
        let count = count.min(self.len);
        self.get = (self.get + count) % N;
        self.len -= count;
        count
    }
}
