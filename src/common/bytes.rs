// src/common/bytes.rs

//! Byte-order-aware field readers.
//!
//! Every multi-byte field is pulled out of a frame through these helpers so the
//! wire byte order is always stated at the call site instead of being implied
//! by how the host lays out memory.

/// Wire byte order of a multi-byte field.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ByteOrder {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
}

/// Reads the `u16` at `offset`. Panics if `offset + 2 > buf.len()`.
#[inline]
pub fn read_u16(buf: &[u8], offset: usize, order: ByteOrder) -> u16 {
    let raw = [buf[offset], buf[offset + 1]];
    match order {
        ByteOrder::Big => u16::from_be_bytes(raw),
        ByteOrder::Little => u16::from_le_bytes(raw),
    }
}

/// Reads the IEEE-754 single at `offset`. Panics if `offset + 4 > buf.len()`.
#[inline]
pub fn read_f32(buf: &[u8], offset: usize, order: ByteOrder) -> f32 {
    let raw = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
    match order {
        ByteOrder::Big => f32::from_be_bytes(raw),
        ByteOrder::Little => f32::from_le_bytes(raw),
    }
}

/// Fills `out` with consecutive `u16` fields starting at `offset`.
pub fn read_u16_array<const N: usize>(buf: &[u8], offset: usize, order: ByteOrder) -> [u16; N] {
    let mut out = [0u16; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = read_u16(buf, offset + i * 2, order);
    }
    out
}
