use std::iter::FusedIterator;
use std::ops::Range;

use super::{get_bit, BitBlock, BitStorageMut, BitmapBase};

/// Iterator over bits of a block slice.
///
/// Random access (`nth`, `nth_back`) is O(1).
#[derive(Debug, Clone)]
pub struct BitIter<'a, B: BitBlock> {
    blocks: &'a [B],
    pos: usize,
    end: usize,
}

impl<'a, B: BitBlock> BitIter<'a, B> {
    pub fn new(blocks: &'a [B], range: Range<usize>) -> Self {
        assert!(range.end <= blocks.len() * B::BITS);
        BitIter {
            blocks,
            pos: range.start,
            end: range.end,
        }
    }

    /// Absolute position of the next bit yielded from the front.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a, B: BitBlock> Iterator for BitIter<'a, B> {
    type Item = bool;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        let bit = get_bit(self.blocks, self.pos);
        self.pos += 1;
        Some(bit)
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.pos = self.pos.saturating_add(n).min(self.end);
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.end - self.pos;
        (rem, Some(rem))
    }
}

impl<'a, B: BitBlock> DoubleEndedIterator for BitIter<'a, B> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        self.end -= 1;
        Some(get_bit(self.blocks, self.end))
    }

    fn nth_back(&mut self, n: usize) -> Option<Self::Item> {
        self.end = self.end.saturating_sub(n).max(self.pos);
        self.next_back()
    }
}

impl<'a, B: BitBlock> ExactSizeIterator for BitIter<'a, B> {}

impl<'a, B: BitBlock> FusedIterator for BitIter<'a, B> {}

/// A movable position within a mutable bitmap.
///
/// Writes go through [`BitmapBase::set`] so the null count stays current.
pub struct BitCursorMut<'a, S> {
    bitmap: &'a mut BitmapBase<S>,
    pos: usize,
}

impl<'a, S: BitStorageMut> BitCursorMut<'a, S> {
    pub(crate) fn new(bitmap: &'a mut BitmapBase<S>, pos: usize) -> Self {
        assert!(pos <= bitmap.len());
        BitCursorMut { bitmap, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor by `offset` bits.
    ///
    /// Panics if the cursor would move before the start or past the end.
    pub fn advance(&mut self, offset: isize) {
        let pos = self
            .pos
            .checked_add_signed(offset)
            .filter(|p| *p <= self.bitmap.len());
        match pos {
            Some(pos) => self.pos = pos,
            None => panic!(
                "cannot move cursor at {} by {offset} in bitmap of length {}",
                self.pos,
                self.bitmap.len()
            ),
        }
    }

    pub fn get(&self) -> bool {
        self.bitmap.test(self.pos)
    }

    pub fn set(&mut self, value: bool) {
        self.bitmap.set(self.pos, value)
    }

    /// Set the current bit and move to the next one.
    pub fn write_next(&mut self, value: bool) {
        self.set(value);
        self.pos += 1;
    }

    pub fn bitmap(&self) -> &BitmapBase<S> {
        self.bitmap
    }
}
