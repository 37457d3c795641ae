use std::marker::PhantomData;
use std::ops::Range;

use super::{Buffer, Native};

/// Presents a buffer of a narrow native type as a buffer of a wider type.
///
/// Every element level operation is translated into a range of `From` units
/// on the underlying buffer. Inserting one `To` value inserts `RATIO` `From`
/// values.
#[derive(Debug)]
pub struct BufferAdaptor<'a, To: Native, From: Native> {
    buffer: &'a mut Buffer<From>,
    _to: PhantomData<To>,
}

impl<'a, To: Native, From: Native> BufferAdaptor<'a, To, From> {
    /// Number of `From` values making up a single `To` value.
    pub const RATIO: usize = {
        let to = std::mem::size_of::<To>();
        let from = std::mem::size_of::<From>();
        assert!(to >= from && to % from == 0);
        to / from
    };

    /// Wrap a buffer.
    ///
    /// Panics if the buffer's length isn't a multiple of the size ratio.
    pub fn new(buffer: &'a mut Buffer<From>) -> Self {
        assert_eq!(
            0,
            buffer.len() % Self::RATIO,
            "buffer length must be a multiple of the adaptor ratio"
        );
        BufferAdaptor {
            buffer,
            _to: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len() / Self::RATIO
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity() / Self::RATIO
    }

    pub fn as_slice(&self) -> &[To] {
        self.buffer.cast()
    }

    pub fn as_mut_slice(&mut self) -> &mut [To] {
        self.buffer.cast_mut()
    }

    pub fn get(&self, idx: usize) -> Option<To> {
        self.as_slice().get(idx).copied()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.buffer.reserve(additional * Self::RATIO)
    }

    pub fn push(&mut self, value: To) {
        let len = self.len();
        self.insert(len, value)
    }

    pub fn pop(&mut self) -> Option<To> {
        let value = self.as_slice().last().copied()?;
        let len = self.buffer.len();
        self.buffer.truncate(len - Self::RATIO);
        Some(value)
    }

    pub fn insert(&mut self, idx: usize, value: To) {
        self.insert_n(idx, 1, value)
    }

    pub fn insert_n(&mut self, idx: usize, count: usize, value: To) {
        assert!(idx <= self.len());
        self.buffer
            .insert_n(idx * Self::RATIO, count * Self::RATIO, From::default());
        self.as_mut_slice()[idx..idx + count].fill(value);
    }

    pub fn insert_slice(&mut self, idx: usize, values: &[To]) {
        assert!(idx <= self.len());
        self.buffer
            .insert_n(idx * Self::RATIO, values.len() * Self::RATIO, From::default());
        self.as_mut_slice()[idx..idx + values.len()].copy_from_slice(values);
    }

    pub fn extend_from_slice(&mut self, values: &[To]) {
        let len = self.len();
        self.insert_slice(len, values)
    }

    pub fn erase(&mut self, idx: usize) -> To {
        let value = self.as_slice()[idx];
        self.erase_range(idx..idx + 1);
        value
    }

    pub fn erase_range(&mut self, range: Range<usize>) {
        assert!(range.end <= self.len());
        self.buffer
            .erase_range(range.start * Self::RATIO..range.end * Self::RATIO);
    }

    pub fn resize(&mut self, new_len: usize, value: To) {
        let len = self.len();
        if new_len > len {
            self.insert_n(len, new_len - len, value);
        } else {
            self.buffer.truncate(new_len * Self::RATIO);
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_changes_len_by_ratio() {
        let mut buf = Buffer::<u8>::new();
        let mut adaptor = BufferAdaptor::<u32, u8>::new(&mut buf);
        assert_eq!(4, BufferAdaptor::<u32, u8>::RATIO);

        adaptor.push(1);
        adaptor.push(3);
        adaptor.insert(1, 2);
        assert_eq!(&[1, 2, 3], adaptor.as_slice());
        assert_eq!(12, buf.len());

        let expected = Buffer::from_slice(&[1_u32, 2, 3]).into_byte_buffer();
        assert_eq!(expected, buf);
    }

    #[test]
    fn erase_changes_len_by_ratio() {
        let mut buf = Buffer::from_slice(&[4_u64, 5, 6]).into_byte_buffer();
        let mut adaptor = BufferAdaptor::<u64, u8>::new(&mut buf);

        assert_eq!(5, adaptor.erase(1));
        assert_eq!(&[4, 6], adaptor.as_slice());
        assert_eq!(16, buf.len());
    }

    #[test]
    fn resize_and_pop() {
        let mut buf = Buffer::<u16>::new();
        let mut adaptor = BufferAdaptor::<i64, u16>::new(&mut buf);

        adaptor.resize(3, -1);
        assert_eq!(&[-1, -1, -1], adaptor.as_slice());
        adaptor.as_mut_slice()[2] = 9;
        assert_eq!(Some(9), adaptor.pop());
        adaptor.resize(1, 0);
        assert_eq!(&[-1], adaptor.as_slice());
        assert_eq!(4, buf.len());
    }

    #[test]
    fn insert_slice_middle() {
        let mut buf = Buffer::<u8>::new();
        let mut adaptor = BufferAdaptor::<i32, u8>::new(&mut buf);

        adaptor.extend_from_slice(&[0, 3]);
        adaptor.insert_slice(1, &[1, 2]);
        assert_eq!(&[0, 1, 2, 3], adaptor.as_slice());
    }

    #[test]
    #[should_panic]
    fn misaligned_length() {
        let mut buf = Buffer::<u8>::zeroed(3);
        let _ = BufferAdaptor::<u16, u8>::new(&mut buf);
    }
}
