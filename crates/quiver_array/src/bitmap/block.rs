use num_traits::ops::bytes::ToBytes;
use num_traits::{PrimInt, Unsigned};

use crate::buffer::Native;

/// An unsigned integer used as the unit of storage for a bitmap.
pub trait BitBlock: PrimInt + Unsigned + ToBytes + Native {
    const BITS: usize;

    /// Number of set bits in the block.
    fn popcount(self) -> usize {
        popcount_bytes(self.to_le_bytes().as_ref())
    }
}

impl BitBlock for u8 {
    const BITS: usize = 8;
}

impl BitBlock for u16 {
    const BITS: usize = 16;
}

impl BitBlock for u32 {
    const BITS: usize = 32;
}

impl BitBlock for u64 {
    const BITS: usize = 64;
}

/// Set bits for every byte value.
pub(crate) const POPCOUNT_TABLE: [u8; 256] = {
    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8 & 1) + table[i / 2];
        i += 1;
    }
    table
};

/// Count the set bits in a byte slice using table lookup.
pub fn popcount_bytes(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .map(|&b| POPCOUNT_TABLE[b as usize] as usize)
        .sum()
}

/// Number of blocks needed to hold `bits` bits.
pub const fn blocks_for<B: BitBlock>(bits: usize) -> usize {
    bits.div_ceil(B::BITS)
}

/// Mask covering the lowest `bits` bits of a block.
pub(crate) fn low_mask<B: BitBlock>(bits: usize) -> B {
    if bits >= B::BITS {
        B::max_value()
    } else {
        (B::one() << bits) - B::one()
    }
}
