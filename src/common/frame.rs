// src/common/frame.rs

/// Fixed-capacity scratch space for one wire frame.
///
/// Owned by exactly one decoder and overwritten on every attempt, so no frame
/// data ever outlives the call that produced it. Nothing here allocates.
#[derive(Debug, Clone)]
pub struct FrameBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> FrameBuffer<N> {
    pub const CAPACITY: usize = N;

    pub const fn new() -> Self {
        FrameBuffer { bytes: [0; N], len: 0 }
    }

    /// Forgets the previous frame. Contents are not zeroed.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends one byte, returning `false` once the buffer is full.
    #[inline]
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len >= N {
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Exposes the full backing array for in-place fills (e.g. I2C bulk reads),
    /// marking all `N` bytes as valid.
    pub fn fill_all(&mut self) -> &mut [u8; N] {
        self.len = N;
        &mut self.bytes
    }
}

impl<const N: usize> Default for FrameBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
