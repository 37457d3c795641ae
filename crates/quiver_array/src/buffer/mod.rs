//! Typed, resizable memory buffers.
//!
//! Every buffer allocation is aligned to [`BUFFER_ALIGNMENT`] bytes, which
//! allows the contents of a buffer to be reinterpreted as any other [`Native`]
//! type whose size evenly divides the buffer's byte length.

mod adaptor;
mod allocator;
mod native;
mod view;

pub use adaptor::*;
pub use allocator::*;
pub use native::*;
pub use view::*;

use std::alloc::Layout;
use std::fmt;
use std::ops::{Deref, DerefMut, Range};
use std::ptr::NonNull;

use quiver_error::{QuiverError, Result};
use tracing::trace;

/// Minimum number of elements allocated when a buffer first grows.
const MIN_GROW_CAPACITY: usize = 8;

/// An owned, contiguous, growable buffer of native values.
pub struct Buffer<T: Native> {
    ptr: NonNull<T>,
    /// Number of initialized elements.
    len: usize,
    /// Number of elements the current allocation can hold.
    cap: usize,
    allocator: BufferAllocator,
}

// SAFETY: Native values are Send + Sync and the buffer uniquely owns its
// allocation.
unsafe impl<T: Native> Send for Buffer<T> {}
unsafe impl<T: Native> Sync for Buffer<T> {}

impl<T: Native> Buffer<T> {
    pub fn new() -> Self {
        Self::new_in(BufferAllocator::Global)
    }

    pub fn new_in(allocator: BufferAllocator) -> Self {
        Buffer {
            ptr: dangling(),
            len: 0,
            cap: 0,
            allocator,
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self::with_capacity_in(cap, BufferAllocator::Global)
    }

    pub fn with_capacity_in(cap: usize, allocator: BufferAllocator) -> Self {
        let mut buf = Self::new_in(allocator);
        buf.reserve_exact(cap);
        buf
    }

    /// Create a buffer of `len` zeroed values.
    pub fn zeroed(len: usize) -> Self {
        Self::zeroed_in(len, BufferAllocator::Global)
    }

    pub fn zeroed_in(len: usize, allocator: BufferAllocator) -> Self {
        let mut buf = Self::with_capacity_in(len, allocator);
        // SAFETY: Capacity was reserved above, and all zeroes is a valid bit
        // pattern for native types.
        unsafe {
            std::ptr::write_bytes(buf.ptr.as_ptr(), 0, len);
        }
        buf.len = len;
        buf
    }

    pub fn from_slice(values: &[T]) -> Self {
        Self::from_slice_in(values, BufferAllocator::Global)
    }

    pub fn from_slice_in(values: &[T], allocator: BufferAllocator) -> Self {
        let mut buf = Self::with_capacity_in(values.len(), allocator);
        buf.extend_from_slice(values);
        buf
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        self.cap
    }

    /// Length of the initialized portion of the buffer in bytes.
    pub const fn byte_len(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    pub fn allocator(&self) -> &BufferAllocator {
        &self.allocator
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `ptr` is valid for `len` initialized elements (or dangling
        // and aligned when len is zero).
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: See `as_slice`, we have unique access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Get a view over the entire buffer.
    pub fn view(&self) -> BufferView<'_, T> {
        BufferView::new(self.as_slice())
    }

    pub fn view_mut(&mut self) -> BufferViewMut<'_, T> {
        BufferViewMut::new(self.as_mut_slice())
    }

    /// Reinterpret the contents of the buffer as a slice of `U`.
    ///
    /// Panics if the byte length of the buffer is not a multiple of `U`'s
    /// size.
    pub fn cast<U: Native>(&self) -> &[U] {
        match self.try_cast() {
            Ok(s) => s,
            Err(e) => panic!("{e}"),
        }
    }

    /// Reinterpret the contents of the buffer as a mutable slice of `U`.
    ///
    /// Panics if the byte length of the buffer is not a multiple of `U`'s
    /// size.
    pub fn cast_mut<U: Native>(&mut self) -> &mut [U] {
        let len = cast_len::<T, U>(self.len);
        match len {
            Ok(len) => {
                // SAFETY: Allocations are aligned to BUFFER_ALIGNMENT and the
                // byte length is checked above.
                unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<U>(), len) }
            }
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_cast<U: Native>(&self) -> Result<&[U]> {
        let len = cast_len::<T, U>(self.len)?;
        // SAFETY: Allocations are aligned to BUFFER_ALIGNMENT and the byte
        // length is a multiple of U's size.
        Ok(unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<U>(), len) })
    }

    /// The raw bytes of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        self.cast::<u8>()
    }

    /// Convert this buffer into a byte buffer without copying.
    pub fn into_byte_buffer(self) -> Buffer<u8> {
        let size = std::mem::size_of::<T>();
        let this = std::mem::ManuallyDrop::new(self);
        Buffer {
            ptr: this.ptr.cast(),
            len: this.len * size,
            cap: this.cap * size,
            // SAFETY: `this` is never dropped, so reading out the allocator
            // moves it.
            allocator: unsafe { std::ptr::read(&this.allocator) },
        }
    }

    /// Reserve capacity for at least `additional` more values.
    ///
    /// Aborts through `handle_alloc_error` if the allocator fails.
    pub fn reserve(&mut self, additional: usize) {
        if let Err(e) = self.try_reserve(additional) {
            match Self::layout_for(self.len.saturating_add(additional)) {
                Ok(layout) => std::alloc::handle_alloc_error(layout),
                Err(_) => panic!("{e}"),
            }
        }
    }

    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        let required = self.required_capacity(additional)?;
        if required <= self.cap {
            return Ok(());
        }
        let new_cap = required.max(self.cap * 2).max(MIN_GROW_CAPACITY);
        self.reallocate(new_cap)
    }

    /// Reserve capacity for exactly `additional` more values without
    /// amortized growth.
    pub fn reserve_exact(&mut self, additional: usize) {
        let result = self.required_capacity(additional).and_then(|required| {
            if required <= self.cap {
                Ok(())
            } else {
                self.reallocate(required)
            }
        });
        if let Err(e) = result {
            panic!("{e}");
        }
    }

    fn required_capacity(&self, additional: usize) -> Result<usize> {
        self.len
            .checked_add(additional)
            .ok_or_else(|| QuiverError::new("Buffer capacity overflow"))
    }

    /// Shrink the allocation to fit the current length.
    pub fn shrink_to_fit(&mut self) {
        if self.cap > self.len {
            if let Err(e) = self.reallocate(self.len) {
                panic!("{e}");
            }
        }
    }

    pub fn push(&mut self, value: T) {
        self.reserve(1);
        // SAFETY: Capacity for one more element reserved.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.as_slice()[self.len - 1];
        self.len -= 1;
        Some(value)
    }

    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.insert_slice(self.len, values)
    }

    /// Insert a value at `idx`, shifting all following values.
    pub fn insert(&mut self, idx: usize, value: T) {
        self.insert_n(idx, 1, value)
    }

    /// Insert `count` copies of `value` at `idx`.
    pub fn insert_n(&mut self, idx: usize, count: usize, value: T) {
        self.make_gap(idx, count);
        self.as_mut_slice()[idx..idx + count].fill(value);
    }

    /// Insert all values from a slice at `idx`.
    pub fn insert_slice(&mut self, idx: usize, values: &[T]) {
        self.make_gap(idx, values.len());
        self.as_mut_slice()[idx..idx + values.len()].copy_from_slice(values);
    }

    /// Remove the value at `idx`, shifting all following values.
    pub fn erase(&mut self, idx: usize) -> T {
        assert!(
            idx < self.len,
            "erase index {idx} out of bounds for buffer of length {}",
            self.len
        );
        let value = self.as_slice()[idx];
        self.erase_range(idx..idx + 1);
        value
    }

    /// Remove a range of values.
    pub fn erase_range(&mut self, range: Range<usize>) {
        assert!(range.start <= range.end && range.end <= self.len);
        let count = range.end - range.start;
        if count == 0 {
            return;
        }
        self.as_mut_slice().copy_within(range.end.., range.start);
        self.len -= count;
    }

    /// Resize the buffer, filling new slots with `value`.
    pub fn resize(&mut self, new_len: usize, value: T) {
        if new_len > self.len {
            self.insert_n(self.len, new_len - self.len, value);
        } else {
            self.truncate(new_len);
        }
    }

    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Open a gap of `count` uninitialized slots at `idx`.
    ///
    /// Callers must write to all slots in the gap.
    fn make_gap(&mut self, idx: usize, count: usize) {
        assert!(
            idx <= self.len,
            "insert index {idx} out of bounds for buffer of length {}",
            self.len
        );
        if count == 0 {
            return;
        }
        self.reserve(count);
        // SAFETY: Capacity reserved, and `copy` handles overlapping regions.
        unsafe {
            let src = self.ptr.as_ptr().add(idx);
            std::ptr::copy(src, src.add(count), self.len - idx);
        }
        self.len += count;
    }

    fn layout_for(cap: usize) -> Result<Layout> {
        let bytes = cap
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| QuiverError::new("Buffer capacity overflow"))?;
        Layout::from_size_align(bytes, BUFFER_ALIGNMENT)
            .map_err(|_| QuiverError::new("Invalid buffer layout").with_field("bytes", bytes))
    }

    fn reallocate(&mut self, new_cap: usize) -> Result<()> {
        debug_assert!(new_cap >= self.len);
        trace!(old_cap = self.cap, new_cap, "reallocating buffer");

        let new_layout = Self::layout_for(new_cap)?;
        let new_ptr = if new_layout.size() == 0 {
            dangling()
        } else {
            let ptr = self.allocator.allocate(new_layout)?.cast::<T>();
            // SAFETY: Both allocations hold at least `len` elements and don't
            // overlap.
            unsafe { std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), ptr.as_ptr(), self.len) };
            ptr
        };

        self.free();
        self.ptr = new_ptr;
        self.cap = new_cap;

        Ok(())
    }

    fn free(&mut self) {
        if let Ok(layout) = Self::layout_for(self.cap) {
            if layout.size() != 0 {
                // SAFETY: The pointer was allocated by this allocator using
                // the layout for the current capacity.
                unsafe { self.allocator.deallocate(self.ptr.cast(), layout) };
            }
        }
    }
}

/// Number of `U` values that fit in `len` values of `T`.
fn cast_len<T: Native, U: Native>(len: usize) -> Result<usize> {
    let bytes = len * std::mem::size_of::<T>();
    let size = std::mem::size_of::<U>();
    if bytes % size != 0 {
        return Err(QuiverError::new("Buffer byte length not a multiple of the target type size")
            .with_field("bytes", bytes)
            .with_field("target_size", size));
    }
    Ok(bytes / size)
}

fn dangling<T>() -> NonNull<T> {
    // SAFETY: BUFFER_ALIGNMENT is non-zero, and a multiple of every native
    // type's alignment.
    unsafe { NonNull::new_unchecked(BUFFER_ALIGNMENT as *mut T) }
}

impl<T: Native> Drop for Buffer<T> {
    fn drop(&mut self) {
        self.free()
    }
}

impl<T: Native> Default for Buffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Native> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        Self::from_slice_in(self.as_slice(), self.allocator.clone())
    }
}

impl<T: Native> Deref for Buffer<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T: Native> DerefMut for Buffer<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T: Native> AsRef<[T]> for Buffer<T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Native> PartialEq for Buffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Native> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: Native> From<Vec<T>> for Buffer<T> {
    fn from(value: Vec<T>) -> Self {
        Self::from_slice(&value)
    }
}

impl<T: Native> From<&[T]> for Buffer<T> {
    fn from(value: &[T]) -> Self {
        Self::from_slice(value)
    }
}

impl<T: Native> FromIterator<T> for Buffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let mut buf = Self::with_capacity(lower);
        buf.extend(iter);
        buf
    }
}

impl<T: Native> Extend<T> for Buffer<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.reserve(lower);
        for v in iter {
            self.push(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn push_and_pop() {
        let mut buf = Buffer::<i32>::new();
        assert!(buf.is_empty());

        for v in 0..20 {
            buf.push(v);
        }
        assert_eq!(20, buf.len());
        assert!(buf.capacity() >= 20);
        assert_eq!(Some(19), buf.pop());
        assert_eq!(19, buf.len());
        assert_eq!(&[0, 1, 2], &buf[0..3]);
    }

    #[test]
    fn insert_and_erase() {
        let mut buf = Buffer::from_slice(&[1_u16, 2, 3, 4]);

        buf.insert(1, 9);
        assert_eq!(&[1, 9, 2, 3, 4], buf.as_slice());

        buf.insert_n(5, 2, 7);
        assert_eq!(&[1, 9, 2, 3, 4, 7, 7], buf.as_slice());

        buf.insert_slice(0, &[5, 6]);
        assert_eq!(&[5, 6, 1, 9, 2, 3, 4, 7, 7], buf.as_slice());

        assert_eq!(1, buf.erase(2));
        buf.erase_range(0..2);
        assert_eq!(&[9, 2, 3, 4, 7, 7], buf.as_slice());
    }

    #[test]
    #[should_panic]
    fn insert_out_of_bounds() {
        let mut buf = Buffer::from_slice(&[1_u8, 2]);
        buf.insert(3, 0);
    }

    #[test]
    fn resize_grow_and_shrink() {
        let mut buf = Buffer::from_slice(&[1_i64, 2]);
        buf.resize(4, 8);
        assert_eq!(&[1, 2, 8, 8], buf.as_slice());
        assert!(buf.len() <= buf.capacity());

        buf.resize(1, 0);
        assert_eq!(&[1], buf.as_slice());
        assert!(buf.len() <= buf.capacity());

        buf.shrink_to_fit();
        assert_eq!(1, buf.capacity());
    }

    #[test]
    fn zeroed() {
        let buf = Buffer::<u32>::zeroed(5);
        assert_eq!(&[0, 0, 0, 0, 0], buf.as_slice());
    }

    #[test]
    fn cast_bytes() {
        let mut buf = Buffer::<u8>::zeroed(8);
        buf.cast_mut::<i32>()[1] = 0x01020304;

        assert_eq!(&[0, 0x01020304], buf.cast::<i32>());
        assert_eq!(&0x01020304_i32.to_ne_bytes(), &buf[4..8]);
        assert_eq!(&[0x01020304_i64 << 32], buf.cast::<i64>());
    }

    #[test]
    fn cast_invalid_len() {
        let buf = Buffer::<u8>::zeroed(7);
        let _ = buf.try_cast::<u32>().unwrap_err();
    }

    #[test]
    fn into_byte_buffer() {
        let buf = Buffer::from_slice(&[1_u32, 2]);
        let bytes = buf.into_byte_buffer();
        assert_eq!(8, bytes.len());
        assert_eq!(&[1, 2], bytes.cast::<u32>());
    }

    #[test]
    fn tracking_allocator_released() {
        let tracker = Arc::new(TrackingAllocator::default());

        let mut buf = Buffer::<u64>::with_capacity_in(4, tracker.clone().into());
        assert_eq!(32, tracker.bytes_allocated());

        buf.extend(0..100);
        let cloned = buf.clone();
        assert_eq!(cloned.allocator(), buf.allocator());
        assert!(tracker.bytes_allocated() >= 1600);

        std::mem::drop(buf);
        std::mem::drop(cloned);
        assert_eq!(0, tracker.bytes_allocated());
    }

    #[test]
    fn from_iter() {
        let buf: Buffer<i8> = (0..4).collect();
        assert_eq!(&[0, 1, 2, 3], buf.as_slice());
    }
}
