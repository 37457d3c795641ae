use std::ops::{Deref, DerefMut, Range};

use quiver_error::{QuiverError, Result};

use super::Native;

/// A non-owning, read-only window over a contiguous region of native values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferView<'a, T: Native> {
    data: &'a [T],
}

impl<'a, T: Native> BufferView<'a, T> {
    pub const fn new(data: &'a [T]) -> Self {
        BufferView { data }
    }

    /// Create a view from a raw pointer and length.
    ///
    /// # Safety
    ///
    /// `ptr` must be non-null, aligned, and valid for reads of `len` values for
    /// the lifetime `'a`.
    pub unsafe fn from_raw_parts(ptr: *const T, len: usize) -> Self {
        BufferView {
            data: std::slice::from_raw_parts(ptr, len),
        }
    }

    pub const fn len(&self) -> usize {
        self.data.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub const fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Narrow the view to a sub range.
    pub fn subrange(&self, range: Range<usize>) -> Self {
        BufferView {
            data: &self.data[range],
        }
    }

    /// Reinterpret the viewed values as `U`.
    pub fn cast<U: Native>(&self) -> Result<BufferView<'a, U>> {
        let bytes = std::mem::size_of_val(self.data);
        let size = std::mem::size_of::<U>();
        let ptr = self.data.as_ptr();
        if bytes % size != 0 || (ptr as usize) % std::mem::align_of::<U>() != 0 {
            return Err(QuiverError::new("Cannot cast buffer view")
                .with_field("bytes", bytes)
                .with_field("target_size", size));
        }
        // SAFETY: Alignment and length checked above.
        Ok(unsafe { BufferView::from_raw_parts(ptr.cast::<U>(), bytes / size) })
    }
}

impl<'a, T: Native> Deref for BufferView<'a, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl<'a, T: Native> From<&'a [T]> for BufferView<'a, T> {
    fn from(value: &'a [T]) -> Self {
        BufferView::new(value)
    }
}

/// A non-owning mutable window over a contiguous region of native values.
///
/// The view can't change the length of the underlying storage.
#[derive(Debug, PartialEq)]
pub struct BufferViewMut<'a, T: Native> {
    data: &'a mut [T],
}

impl<'a, T: Native> BufferViewMut<'a, T> {
    pub fn new(data: &'a mut [T]) -> Self {
        BufferViewMut { data }
    }

    /// # Safety
    ///
    /// `ptr` must be non-null, aligned, and valid for reads and writes of
    /// `len` values for the lifetime `'a` with no other live references.
    pub unsafe fn from_raw_parts(ptr: *mut T, len: usize) -> Self {
        BufferViewMut {
            data: std::slice::from_raw_parts_mut(ptr, len),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_view(&self) -> BufferView<'_, T> {
        BufferView::new(self.data)
    }

    pub fn into_slice(self) -> &'a mut [T] {
        self.data
    }

    pub fn subrange(&mut self, range: Range<usize>) -> BufferViewMut<'_, T> {
        BufferViewMut {
            data: &mut self.data[range],
        }
    }
}

impl<'a, T: Native> Deref for BufferViewMut<'a, T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl<'a, T: Native> DerefMut for BufferViewMut<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;

    #[test]
    fn view_subrange() {
        let buf = Buffer::from_slice(&[1_i32, 2, 3, 4, 5]);
        let view = buf.view();
        assert_eq!(5, view.len());

        let sub = view.subrange(1..3);
        assert_eq!(&[2, 3], sub.as_slice());
    }

    #[test]
    fn view_cast() {
        let buf = Buffer::from_slice(&[1_u32, 2]);
        let view = buf.view().cast::<u8>().unwrap();
        assert_eq!(8, view.len());

        let back = view.cast::<u32>().unwrap();
        assert_eq!(&[1, 2], back.as_slice());

        let err = view.subrange(0..3).cast::<u16>();
        assert!(err.is_err());
    }

    #[test]
    fn view_mut_writes_through() {
        let mut buf = Buffer::from_slice(&[0_u8; 4]);
        {
            let mut view = buf.view_mut();
            view[2] = 7;
            view.subrange(0..1)[0] = 1;
        }
        assert_eq!(&[1, 0, 7, 0], buf.as_slice());
    }
}
