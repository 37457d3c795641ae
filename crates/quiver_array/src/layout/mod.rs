//! Typed, zero copy views over [`ArrayData`].
//!
//! Every layout exposes the same nullable random access interface. Values are
//! read straight out of the underlying buffers.

mod boolean;
mod dictionary;
mod dynamic;
mod fixed_size_binary;
mod list;
mod null;
mod primitive;
mod run_end;
mod struct_layout;
mod union;
mod varlen;

pub use boolean::*;
pub use dictionary::*;
pub use dynamic::*;
pub use fixed_size_binary::*;
pub use list::*;
pub use null::*;
pub use primitive::*;
pub use run_end::*;
pub use struct_layout::*;
pub use union::*;
pub use varlen::*;

use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ops::Range;

use quiver_error::Result;

use crate::array_data::ArrayData;
use crate::nullable::Nullable;

/// A typed view over array data.
pub trait Layout<'a>: Sized + Clone {
    /// Type of a single value.
    type Value: 'a;

    /// Iterator over all values.
    type Iter: Iterator<Item = Nullable<Self::Value>>;

    /// Create the layout, checking the data has the expected type and shape.
    fn try_new(data: &'a ArrayData) -> Result<Self>;

    fn data(&self) -> &'a ArrayData;

    fn len(&self) -> usize {
        self.data().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_valid(&self, idx: usize) -> bool {
        self.data().is_valid(idx)
    }

    fn null_count(&self) -> usize {
        self.data().null_count()
    }

    /// Get the value at `idx` ignoring validity.
    ///
    /// Panics if `idx` is out of bounds.
    fn value(&self, idx: usize) -> Self::Value;

    /// Get the value at `idx` along with its validity.
    ///
    /// Panics if `idx` is out of bounds.
    fn get(&self, idx: usize) -> Nullable<Self::Value> {
        Nullable::with_validity(self.value(idx), self.is_valid(idx))
    }

    fn iter(&self) -> Self::Iter;
}

/// Iterator over a range of a layout using random access.
#[derive(Debug, Clone)]
pub struct LayoutIter<'a, L> {
    layout: L,
    idx: usize,
    end: usize,
    _lifetime: PhantomData<&'a ()>,
}

impl<'a, L: Layout<'a>> LayoutIter<'a, L> {
    pub fn new(layout: L) -> Self {
        let end = layout.len();
        LayoutIter {
            layout,
            idx: 0,
            end,
            _lifetime: PhantomData,
        }
    }

    pub fn with_range(layout: L, range: Range<usize>) -> Self {
        assert!(range.start <= range.end && range.end <= layout.len());
        LayoutIter {
            layout,
            idx: range.start,
            end: range.end,
            _lifetime: PhantomData,
        }
    }
}

impl<'a, L: Layout<'a>> Iterator for LayoutIter<'a, L> {
    type Item = Nullable<L::Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.end {
            return None;
        }
        let v = self.layout.get(self.idx);
        self.idx += 1;
        Some(v)
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.idx = self.idx.saturating_add(n).min(self.end);
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.end - self.idx;
        (rem, Some(rem))
    }
}

impl<'a, L: Layout<'a>> DoubleEndedIterator for LayoutIter<'a, L> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.idx >= self.end {
            return None;
        }
        self.end -= 1;
        Some(self.layout.get(self.end))
    }
}

impl<'a, L: Layout<'a>> ExactSizeIterator for LayoutIter<'a, L> {}

impl<'a, L: Layout<'a>> FusedIterator for LayoutIter<'a, L> {}
