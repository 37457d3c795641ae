//! Packed bit vectors used for validity and boolean values.
//!
//! A bitmap keeps a running count of its unset bits. Every mutation adjusts
//! that count as it goes, and bits past the logical length inside the last
//! block are kept zeroed for owned and mutable storage.

mod block;
mod iter;
mod reference;

pub use block::*;
pub use iter::*;
pub use reference::*;

use std::fmt;
use std::ops::Range;

use num_traits::{Bounded, One, Zero};
use quiver_error::{QuiverError, Result};

use crate::buffer::{Buffer, BufferView, BufferViewMut};

/// Read access to the blocks backing a bitmap.
pub trait BitStorage {
    type Block: BitBlock;

    fn blocks(&self) -> &[Self::Block];
}

/// Write access to the blocks backing a bitmap.
pub trait BitStorageMut: BitStorage {
    fn blocks_mut(&mut self) -> &mut [Self::Block];
}

/// Storage that can change the number of blocks it holds.
pub trait BitStorageResize: BitStorageMut {
    fn resize_blocks(&mut self, count: usize, fill: Self::Block);
}

impl<B: BitBlock> BitStorage for Buffer<B> {
    type Block = B;

    fn blocks(&self) -> &[B] {
        self.as_slice()
    }
}

impl<B: BitBlock> BitStorageMut for Buffer<B> {
    fn blocks_mut(&mut self) -> &mut [B] {
        self.as_mut_slice()
    }
}

impl<B: BitBlock> BitStorageResize for Buffer<B> {
    fn resize_blocks(&mut self, count: usize, fill: B) {
        self.resize(count, fill)
    }
}

impl<'a, B: BitBlock> BitStorage for BufferView<'a, B> {
    type Block = B;

    fn blocks(&self) -> &[B] {
        self.as_slice()
    }
}

impl<'a, B: BitBlock> BitStorage for BufferViewMut<'a, B> {
    type Block = B;

    fn blocks(&self) -> &[B] {
        self
    }
}

impl<'a, B: BitBlock> BitStorageMut for BufferViewMut<'a, B> {
    fn blocks_mut(&mut self) -> &mut [B] {
        self
    }
}

/// A bitmap over some block storage.
///
/// Bits are LSB ordered within each block.
#[derive(Clone, Default)]
pub struct BitmapBase<S> {
    storage: S,
    len: usize,
    null_count: usize,
}

/// A bitmap owning its blocks.
pub type Bitmap<B = u8> = BitmapBase<Buffer<B>>;

/// A read only bitmap borrowing its blocks.
pub type BitmapView<'a, B = u8> = BitmapBase<BufferView<'a, B>>;

/// A bitmap borrowing its blocks mutably. Its length is fixed.
pub type BitmapViewMut<'a, B = u8> = BitmapBase<BufferViewMut<'a, B>>;

impl<B: BitBlock> BitmapBase<Buffer<B>> {
    /// Create a bitmap of `len` bits all set to `fill`.
    pub fn new(len: usize, fill: bool) -> Self {
        let block = if fill { B::max_value() } else { B::zero() };
        let storage = Buffer::from_iter(std::iter::repeat(block).take(blocks_for::<B>(len)));
        let mut bitmap = BitmapBase {
            storage,
            len,
            null_count: if fill { 0 } else { len },
        };
        bitmap.zero_unused_bits();
        bitmap
    }

    pub fn new_with_all_true(len: usize) -> Self {
        Self::new(len, true)
    }

    pub fn new_with_all_false(len: usize) -> Self {
        Self::new(len, false)
    }

    pub fn from_bool_iter(iter: impl IntoIterator<Item = bool>) -> Self {
        let iter = iter.into_iter();
        let mut storage = Buffer::with_capacity(blocks_for::<B>(iter.size_hint().0));

        let mut len = 0;
        let mut null_count = 0;
        let mut block = B::zero();

        for bit in iter {
            let offset = len % B::BITS;
            if bit {
                block = block | (B::one() << offset);
            } else {
                null_count += 1;
            }
            len += 1;

            if offset == B::BITS - 1 {
                storage.push(block);
                block = B::zero();
            }
        }

        if len % B::BITS != 0 {
            storage.push(block);
        }

        BitmapBase {
            storage,
            len,
            null_count,
        }
    }

    /// Create a bitmap from existing blocks, taking ownership of them.
    ///
    /// Bits past `len` are zeroed.
    pub fn from_blocks(blocks: impl Into<Buffer<B>>, len: usize) -> Self {
        let mut storage = blocks.into();
        assert!(
            storage.len() >= blocks_for::<B>(len),
            "not enough blocks for {len} bits"
        );
        storage.truncate(blocks_for::<B>(len));
        let mut bitmap = BitmapBase {
            storage,
            len,
            null_count: 0,
        };
        bitmap.zero_unused_bits();
        bitmap.null_count = len - bitmap.count_non_null();
        bitmap
    }

    pub fn into_storage(self) -> Buffer<B> {
        self.storage
    }
}

impl<S: BitStorage> BitmapBase<S> {
    /// Wrap existing storage, counting unset bits.
    ///
    /// Panics if the storage holds fewer than `len` bits.
    pub fn from_storage(storage: S, len: usize) -> Self {
        let mut bitmap = Self::from_storage_unchecked(storage, len);
        bitmap.null_count = len - bitmap.count_non_null();
        bitmap
    }

    /// Wrap existing storage with a known null count, skipping the scan.
    ///
    /// Debug builds verify the provided count.
    pub fn from_storage_with_null_count(storage: S, len: usize, null_count: usize) -> Self {
        let mut bitmap = Self::from_storage_unchecked(storage, len);
        bitmap.null_count = null_count;
        debug_assert_eq!(
            len - bitmap.count_non_null(),
            null_count,
            "provided null count doesn't match bitmap contents"
        );
        bitmap
    }

    fn from_storage_unchecked(storage: S, len: usize) -> Self {
        assert!(
            storage.blocks().len() >= blocks_for::<S::Block>(len),
            "not enough blocks for {len} bits"
        );
        BitmapBase {
            storage,
            len,
            null_count: 0,
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of unset bits.
    pub const fn null_count(&self) -> usize {
        self.null_count
    }

    /// Blocks covering the bitmap's bits.
    pub fn blocks(&self) -> &[S::Block] {
        &self.storage.blocks()[..self.block_count()]
    }

    pub fn block_count(&self) -> usize {
        blocks_for::<S::Block>(self.len)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Get the bit at `pos`.
    ///
    /// Panics if `pos` is out of bounds.
    pub fn test(&self, pos: usize) -> bool {
        assert!(
            pos < self.len,
            "bit {pos} out of bounds for bitmap of length {}",
            self.len
        );
        get_bit(self.storage.blocks(), pos)
    }

    /// Get the bit at `pos`, erroring if out of bounds.
    pub fn at(&self, pos: usize) -> Result<bool> {
        if pos >= self.len {
            return Err(QuiverError::new("Bit position out of bounds")
                .with_field("pos", pos)
                .with_field("len", self.len));
        }
        Ok(get_bit(self.storage.blocks(), pos))
    }

    pub fn front(&self) -> Option<bool> {
        self.iter().next()
    }

    pub fn back(&self) -> Option<bool> {
        self.iter().next_back()
    }

    pub fn iter(&self) -> BitIter<'_, S::Block> {
        BitIter::new(self.storage.blocks(), 0..self.len)
    }

    /// Iterate over a sub range of bits.
    pub fn iter_range(&self, range: Range<usize>) -> BitIter<'_, S::Block> {
        assert!(range.start <= range.end && range.end <= self.len);
        BitIter::new(self.storage.blocks(), range)
    }

    /// Count set bits by scanning the blocks.
    pub fn count_non_null(&self) -> usize {
        let bits = S::Block::BITS;
        let full = self.len / bits;
        let blocks = self.storage.blocks();

        let mut count: usize = blocks[..full].iter().map(|b| b.popcount()).sum();
        let rem = self.len % bits;
        if rem != 0 {
            count += (blocks[full] & low_mask::<S::Block>(rem)).popcount();
        }
        count
    }

    /// Count unset bits within a range.
    pub fn count_nulls_in_range(&self, range: Range<usize>) -> usize {
        if range.start == 0 && range.end == self.len {
            return self.null_count;
        }
        self.iter_range(range).filter(|b| !b).count()
    }

    pub fn as_view(&self) -> BitmapView<'_, S::Block> {
        BitmapBase {
            storage: BufferView::new(self.storage.blocks()),
            len: self.len,
            null_count: self.null_count,
        }
    }

    /// Copy into an owned bitmap.
    pub fn to_owned_bitmap(&self) -> Bitmap<S::Block> {
        BitmapBase {
            storage: Buffer::from_slice(self.blocks()),
            len: self.len,
            null_count: self.null_count,
        }
        .with_zeroed_unused_bits()
    }
}

impl<S: BitStorageMut> BitmapBase<S> {
    /// Set the bit at `pos`, adjusting the null count.
    pub fn set(&mut self, pos: usize, value: bool) {
        let old = self.test(pos);
        if old == value {
            return;
        }
        let blocks = self.storage.blocks_mut();
        let block = &mut blocks[pos / S::Block::BITS];
        let mask = S::Block::one() << (pos % S::Block::BITS);
        if value {
            *block = *block | mask;
            self.null_count -= 1;
        } else {
            *block = *block & !mask;
            self.null_count += 1;
        }
    }

    /// Get a mutable reference to the bit at `pos`.
    pub fn get_mut(&mut self, pos: usize) -> BitRef<'_, S> {
        assert!(pos < self.len);
        BitRef::new(self, pos)
    }

    /// Get a cursor for walking and mutating bits starting at `pos`.
    pub fn cursor_mut(&mut self, pos: usize) -> BitCursorMut<'_, S> {
        BitCursorMut::new(self, pos)
    }

    /// Clear all bits past the logical length in the last block.
    pub fn zero_unused_bits(&mut self) {
        let rem = self.len % S::Block::BITS;
        if rem == 0 {
            return;
        }
        let idx = self.len / S::Block::BITS;
        let blocks = self.storage.blocks_mut();
        blocks[idx] = blocks[idx] & low_mask::<S::Block>(rem);
    }

    fn with_zeroed_unused_bits(mut self) -> Self {
        self.zero_unused_bits();
        self
    }

    pub fn as_view_mut(&mut self) -> BitmapViewMut<'_, S::Block> {
        let block_count = self.block_count();
        BitmapBase {
            storage: BufferViewMut::new(&mut self.storage.blocks_mut()[..block_count]),
            len: self.len,
            null_count: self.null_count,
        }
    }
}

impl<S: BitStorageResize> BitmapBase<S> {
    /// Resize the bitmap, setting new bits to `fill`.
    ///
    /// The null count is recounted afterwards.
    pub fn resize(&mut self, new_len: usize, fill: bool) {
        let bits = S::Block::BITS;
        let fill_block = if fill {
            S::Block::max_value()
        } else {
            S::Block::zero()
        };

        // Drop any blocks past what the current length uses, and clear stale
        // bits in the last one so they don't resurface.
        self.storage
            .resize_blocks(self.block_count(), S::Block::zero());
        self.zero_unused_bits();

        if new_len > self.len {
            let rem = self.len % bits;
            if fill && rem != 0 {
                let blocks = self.storage.blocks_mut();
                let idx = self.len / bits;
                blocks[idx] = blocks[idx] | (S::Block::max_value() << rem);
            }
        }

        self.storage
            .resize_blocks(blocks_for::<S::Block>(new_len), fill_block);
        self.len = new_len;
        self.zero_unused_bits();
        self.null_count = self.len - self.count_non_null();
    }

    pub fn push(&mut self, value: bool) {
        self.insert(self.len, value)
    }

    pub fn pop(&mut self) -> Option<bool> {
        let value = self.back()?;
        self.erase(self.len - 1);
        Some(value)
    }

    pub fn insert(&mut self, pos: usize, value: bool) {
        self.insert_n(pos, 1, value)
    }

    /// Insert `count` bits of `value` at `pos`, shifting following bits.
    pub fn insert_n(&mut self, pos: usize, count: usize, value: bool) {
        assert!(
            pos <= self.len,
            "insert position {pos} out of bounds for bitmap of length {}",
            self.len
        );
        if count == 0 {
            return;
        }
        let old_len = self.len;
        let null_count = self.null_count;
        self.grow_unset(count);

        let blocks = self.storage.blocks_mut();
        copy_bits(blocks, pos, pos + count, old_len - pos);
        fill_bits(blocks, pos, count, value);
        self.null_count = if value { null_count } else { null_count + count };
    }

    /// Insert bits from an iterator at `pos`.
    pub fn insert_iter<I>(&mut self, pos: usize, iter: I)
    where
        I: IntoIterator<Item = bool>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = iter.into_iter();
        let count = iter.len();
        self.insert_n(pos, count, false);
        for (idx, bit) in (pos..pos + count).zip(iter) {
            self.set(idx, bit);
        }
    }

    pub fn erase(&mut self, pos: usize) {
        self.erase_range(pos..pos + 1)
    }

    /// Remove a range of bits, shifting following bits down.
    pub fn erase_range(&mut self, range: Range<usize>) {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "erase range {range:?} out of bounds for bitmap of length {}",
            self.len
        );
        let count = range.end - range.start;
        if count == 0 {
            return;
        }
        let removed_nulls = self.count_nulls_in_range(range.clone());
        let moved = self.len - range.end;
        copy_bits(self.storage.blocks_mut(), range.end, range.start, moved);

        self.null_count -= removed_nulls;
        self.len -= count;
        self.storage
            .resize_blocks(blocks_for::<S::Block>(self.len), S::Block::zero());
        self.zero_unused_bits();
    }

    pub fn clear(&mut self) {
        self.storage.resize_blocks(0, S::Block::zero());
        self.len = 0;
        self.null_count = 0;
    }

    /// Extend the bitmap by `count` unset bits without rescanning.
    fn grow_unset(&mut self, count: usize) {
        self.storage
            .resize_blocks(self.block_count(), S::Block::zero());
        self.zero_unused_bits();
        let new_len = self.len + count;
        self.storage
            .resize_blocks(blocks_for::<S::Block>(new_len), S::Block::zero());
        self.len = new_len;
        self.null_count += count;
    }
}

pub(crate) fn get_bit<B: BitBlock>(blocks: &[B], pos: usize) -> bool {
    let mask = B::one() << (pos % B::BITS);
    blocks[pos / B::BITS] & mask != B::zero()
}

/// Read `n` bits starting at `start` into the low bits of a block.
fn read_bits<B: BitBlock>(blocks: &[B], start: usize, n: usize) -> B {
    debug_assert!(n > 0 && n <= B::BITS);
    let idx = start / B::BITS;
    let offset = start % B::BITS;
    let mut value = blocks[idx] >> offset;
    if offset != 0 && offset + n > B::BITS {
        value = value | (blocks[idx + 1] << (B::BITS - offset));
    }
    value & low_mask::<B>(n)
}

/// Write the low `n` bits of `value` starting at `start`.
fn write_bits<B: BitBlock>(blocks: &mut [B], start: usize, n: usize, value: B) {
    debug_assert!(n > 0 && n <= B::BITS);
    let idx = start / B::BITS;
    let offset = start % B::BITS;
    let mask = low_mask::<B>(n);
    let value = value & mask;
    blocks[idx] = (blocks[idx] & !(mask << offset)) | (value << offset);
    if offset != 0 && offset + n > B::BITS {
        let spill = B::BITS - offset;
        blocks[idx + 1] = (blocks[idx + 1] & !(mask >> spill)) | (value >> spill);
    }
}

/// Move `len` bits from `src` to `dst` a block at a time. The ranges may
/// overlap.
fn copy_bits<B: BitBlock>(blocks: &mut [B], src: usize, dst: usize, len: usize) {
    if src == dst || len == 0 {
        return;
    }
    if dst < src {
        let mut done = 0;
        while done < len {
            let n = (len - done).min(B::BITS);
            let value = read_bits(blocks, src + done, n);
            write_bits(blocks, dst + done, n, value);
            done += n;
        }
    } else {
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(B::BITS);
            remaining -= n;
            let value = read_bits(blocks, src + remaining, n);
            write_bits(blocks, dst + remaining, n, value);
        }
    }
}

/// Set `len` bits starting at `start` to `value`.
fn fill_bits<B: BitBlock>(blocks: &mut [B], start: usize, len: usize, value: bool) {
    let fill = if value { B::max_value() } else { B::zero() };
    let mut done = 0;
    while done < len {
        let n = (len - done).min(B::BITS);
        write_bits(blocks, start + done, n, fill);
        done += n;
    }
}

impl<S: BitStorage, T: BitStorage<Block = S::Block>> PartialEq<BitmapBase<T>> for BitmapBase<S> {
    fn eq(&self, other: &BitmapBase<T>) -> bool {
        self.len == other.len && self.null_count == other.null_count && self.iter().eq(other.iter())
    }
}

impl<S: BitStorage> Eq for BitmapBase<S> {}

impl<S: BitStorage> fmt::Debug for BitmapBase<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap(len: {}, nulls: {}, ", self.len, self.null_count)?;
        for bit in self.iter() {
            write!(f, "{}", if bit { '1' } else { '0' })?;
        }
        write!(f, ")")
    }
}

impl<B: BitBlock> FromIterator<bool> for Bitmap<B> {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        Self::from_bool_iter(iter)
    }
}

impl<'a, S: BitStorage> IntoIterator for &'a BitmapBase<S> {
    type Item = bool;
    type IntoIter = BitIter<'a, S::Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Recount to check the maintained null count and zeroed tail bits.
    fn assert_invariants<S: BitStorage>(bitmap: &BitmapBase<S>) {
        let set = bitmap.iter().filter(|b| *b).count();
        assert_eq!(bitmap.len() - set, bitmap.null_count());

        let bits = S::Block::BITS;
        let rem = bitmap.len() % bits;
        if rem != 0 {
            let last = bitmap.blocks()[bitmap.len() / bits];
            assert_eq!(S::Block::zero(), last & !low_mask::<S::Block>(rem));
        }
    }

    #[test]
    fn from_bytes_null_count() {
        let bitmap = Bitmap::<u8>::from_blocks(vec![38, 85, 53, 7], 29);
        assert_eq!(29, bitmap.len());
        assert_eq!(15, bitmap.null_count());
        assert_invariants(&bitmap);
    }

    #[test]
    fn set_adjusts_null_count() {
        let mut bitmap = Bitmap::<u8>::from_blocks(vec![38, 85, 53, 7], 29);
        bitmap.set(3, true);
        assert_eq!(14, bitmap.null_count());
        assert_eq!(46, bitmap.blocks()[0]);

        bitmap.set(3, true);
        assert_eq!(14, bitmap.null_count());

        bitmap.set(1, false);
        assert_eq!(15, bitmap.null_count());
        assert_invariants(&bitmap);
    }

    #[test]
    fn view_over_borrowed_bytes() {
        let bytes = [38_u8, 85, 53, 7];
        let view = BitmapView::from_storage(BufferView::new(&bytes), 29);
        assert_eq!(15, view.null_count());
        assert!(!view.test(0));
        assert!(view.test(1));

        let trusted = BitmapView::from_storage_with_null_count(BufferView::new(&bytes), 29, 15);
        assert_eq!(view, trusted);
    }

    #[test]
    fn view_ignores_bits_past_len() {
        let bytes = [0xFF_u8];
        let view = BitmapView::from_storage(BufferView::new(&bytes), 3);
        assert_eq!(0, view.null_count());
        assert_eq!(3, view.count_non_null());
    }

    #[test]
    fn view_mut_sets_through() {
        let mut bytes = [0_u8; 2];
        {
            let mut view = BitmapViewMut::from_storage(BufferViewMut::new(&mut bytes), 12);
            assert_eq!(12, view.null_count());
            view.set(9, true);
            assert_eq!(11, view.null_count());
        }
        assert_eq!([0, 2], bytes);
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds() {
        let bitmap = Bitmap::<u8>::new(4, true);
        bitmap.test(4);
    }

    #[test]
    fn at_out_of_bounds() {
        let bitmap = Bitmap::<u8>::new(4, true);
        assert!(bitmap.at(3).unwrap());
        bitmap.at(4).unwrap_err();
    }

    #[test]
    fn new_filled() {
        let bitmap = Bitmap::<u32>::new(40, true);
        assert_eq!(0, bitmap.null_count());
        assert_eq!(2, bitmap.block_count());
        assert_invariants(&bitmap);

        let bitmap = Bitmap::<u32>::new_with_all_false(40);
        assert_eq!(40, bitmap.null_count());
    }

    #[test]
    fn resize_grow_fill_true() {
        let mut bitmap = Bitmap::<u8>::from_bool_iter([true, false, true]);
        bitmap.resize(12, true);
        assert_eq!(12, bitmap.len());
        assert_eq!(1, bitmap.null_count());
        assert!(bitmap.iter().skip(3).all(|b| b));
        assert_invariants(&bitmap);
    }

    #[test]
    fn resize_grow_fill_false_then_shrink() {
        let mut bitmap = Bitmap::<u16>::new(5, true);
        bitmap.resize(20, false);
        assert_eq!(15, bitmap.null_count());
        assert_invariants(&bitmap);

        bitmap.resize(3, false);
        assert_eq!(0, bitmap.null_count());
        assert_eq!(1, bitmap.blocks().len());
        assert_invariants(&bitmap);
    }

    #[test]
    fn insert_shifts_bits() {
        let mut bitmap =
            Bitmap::<u8>::from_bool_iter([true, true, false, true, false, false, true, true]);
        bitmap.insert(2, false);
        bitmap.insert_n(0, 3, true);

        let got: Vec<_> = bitmap.iter().collect();
        assert_eq!(
            vec![true, true, true, true, true, false, false, true, false, false, true, true],
            got
        );
        assert_invariants(&bitmap);
    }

    #[test]
    fn insert_iter_middle() {
        let mut bitmap = Bitmap::<u8>::from_bool_iter([false, false]);
        bitmap.insert_iter(1, [true, false, true]);

        let got: Vec<_> = bitmap.iter().collect();
        assert_eq!(vec![false, true, false, true, false], got);
        assert_invariants(&bitmap);
    }

    #[test]
    fn erase_shifts_bits() {
        let bits = [true, false, true, true, false, true, false, false, true, true];
        let mut bitmap = Bitmap::<u8>::from_bool_iter(bits);

        bitmap.erase(1);
        bitmap.erase_range(4..7);

        let got: Vec<_> = bitmap.iter().collect();
        assert_eq!(vec![true, true, true, false, true, true], got);
        assert_eq!(1, bitmap.null_count());
        assert_invariants(&bitmap);
    }

    #[test]
    fn push_pop() {
        let mut bitmap = Bitmap::<u64>::default();
        for i in 0..100 {
            bitmap.push(i % 3 == 0);
        }
        assert_eq!(100, bitmap.len());
        assert_eq!(66, bitmap.null_count());
        assert_eq!(Some(true), bitmap.pop());
        assert_eq!(Some(false), bitmap.pop());
        assert_eq!(98, bitmap.len());
        assert_invariants(&bitmap);

        bitmap.clear();
        assert!(bitmap.is_empty());
        assert_eq!(None, bitmap.pop());
    }

    #[test]
    fn equality_across_storage() {
        let owned = Bitmap::<u8>::from_bool_iter([true, false, true]);
        let view = owned.as_view();
        assert_eq!(owned, view);
        assert_eq!(owned, view.to_owned_bitmap());
    }

    #[test]
    fn stale_bits_past_len_stay_hidden() {
        let mut bitmap = Bitmap::<u8>::from_storage(Buffer::from_slice(&[0xFF]), 3);
        assert_eq!(0, bitmap.null_count());
        bitmap.push(false);
        assert_eq!(1, bitmap.null_count());
        assert!(!bitmap.test(3));
        bitmap.set(3, false);
        assert_eq!(1, bitmap.null_count());
        assert_invariants(&bitmap);

        let mut bitmap = Bitmap::<u8>::from_storage(Buffer::from_slice(&[0xFF]), 3);
        bitmap.resize(8, false);
        assert_eq!(5, bitmap.null_count());
        assert_invariants(&bitmap);

        let mut bitmap = Bitmap::<u8>::from_storage(Buffer::from_slice(&[0xFF, 0xFF]), 3);
        bitmap.insert(1, true);
        assert_eq!(4, bitmap.len());
        assert_eq!(0, bitmap.null_count());
        assert_invariants(&bitmap);
    }

    #[test]
    fn shifts_across_block_boundaries() {
        let bits: Vec<bool> = (0..70).map(|i| i % 3 == 0 || i % 7 == 0).collect();
        let mut expected = bits.clone();
        let mut bitmap = Bitmap::<u8>::from_bool_iter(bits);

        bitmap.insert_n(5, 13, true);
        expected.splice(5..5, std::iter::repeat(true).take(13));
        bitmap.erase_range(9..30);
        expected.drain(9..30);
        bitmap.insert_n(60, 3, false);
        expected.splice(60..60, std::iter::repeat(false).take(3));

        assert_eq!(expected, bitmap.iter().collect::<Vec<_>>());
        assert_invariants(&bitmap);
    }

    #[test]
    fn mixed_operations_keep_null_count() {
        let mut expected: Vec<bool> = Vec::new();
        let mut bitmap = Bitmap::<u16>::default();

        // Small LCG so the sequence is deterministic.
        let mut state: u64 = 0x2545_f491;
        let mut next = |bound: usize| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 33) as usize) % bound.max(1)
        };

        for _ in 0..500 {
            let value = next(2) == 0;
            match next(6) {
                0 => {
                    bitmap.push(value);
                    expected.push(value);
                }
                1 => {
                    let pos = next(expected.len() + 1);
                    let count = next(20);
                    bitmap.insert_n(pos, count, value);
                    expected.splice(pos..pos, std::iter::repeat(value).take(count));
                }
                2 if !expected.is_empty() => {
                    let start = next(expected.len());
                    let end = start + next(expected.len() - start + 1);
                    bitmap.erase_range(start..end);
                    expected.drain(start..end);
                }
                3 if !expected.is_empty() => {
                    let pos = next(expected.len());
                    bitmap.set(pos, value);
                    expected[pos] = value;
                }
                4 => {
                    let len = next(80);
                    bitmap.resize(len, value);
                    expected.resize(len, value);
                }
                _ => {
                    assert_eq!(expected.pop(), bitmap.pop());
                }
            }

            assert_eq!(bitmap.len() - bitmap.count_non_null(), bitmap.null_count());
            assert_invariants(&bitmap);
        }
        assert_eq!(expected, bitmap.iter().collect::<Vec<_>>());
    }

    #[test]
    fn nulls_in_range() {
        let bitmap = Bitmap::<u8>::from_bool_iter([true, false, false, true, false]);
        assert_eq!(2, bitmap.count_nulls_in_range(0..3));
        assert_eq!(3, bitmap.count_nulls_in_range(0..5));
        assert_eq!(0, bitmap.count_nulls_in_range(3..4));
    }
}
