use std::iter::FusedIterator;

use quiver_error::{QuiverError, Result};

use super::Layout;
use crate::array_data::ArrayData;
use crate::bitmap::BitIter;
use crate::nullable::Nullable;
use crate::traits::ArrowPrimitive;

/// Layout over a single buffer of fixed width native values.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveLayout<'a, T> {
    data: &'a ArrayData,
    /// Values with the data's offset applied.
    values: &'a [T],
}

impl<'a, T: ArrowPrimitive> PrimitiveLayout<'a, T> {
    /// Create the layout for data already validated to hold `T` values.
    pub(crate) fn new_unchecked(data: &'a ArrayData) -> Self {
        debug_assert!(T::accepts(data.datatype()));
        let values = &data.buffers()[0].cast::<T>()[data.offset()..data.offset() + data.len()];
        PrimitiveLayout { data, values }
    }

    /// Values, ignoring validity.
    pub fn values(&self) -> &'a [T] {
        self.values
    }
}

impl<'a, T: ArrowPrimitive> Layout<'a> for PrimitiveLayout<'a, T> {
    type Value = T;
    type Iter = PrimitiveIter<'a, T>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        if !T::accepts(data.datatype()) {
            return Err(QuiverError::new("Data type not supported by primitive layout")
                .with_field("datatype", data.datatype())
                .with_field("expected", T::DATA_TYPE));
        }
        let values: &[T] = data.buffer_as(0)?;
        let values = values
            .get(data.offset()..data.offset() + data.len())
            .ok_or_else(|| QuiverError::new("Values buffer too short"))?;
        Ok(PrimitiveLayout { data, values })
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn value(&self, idx: usize) -> T {
        self.values[idx]
    }

    fn iter(&self) -> Self::Iter {
        let validity = self
            .data
            .validity()
            .map(|v| v.iter_range(self.data.offset()..self.data.offset() + self.data.len()));
        PrimitiveIter {
            values: self.values.iter(),
            validity,
        }
    }
}

/// Iterator advancing values and validity bits together.
#[derive(Debug, Clone)]
pub struct PrimitiveIter<'a, T> {
    values: std::slice::Iter<'a, T>,
    validity: Option<BitIter<'a, u8>>,
}

impl<'a, T: Copy> Iterator for PrimitiveIter<'a, T> {
    type Item = Nullable<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = *self.values.next()?;
        let valid = match &mut self.validity {
            Some(validity) => validity.next().unwrap_or(true),
            None => true,
        };
        Some(Nullable::with_validity(value, valid))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        let value = *self.values.nth(n)?;
        let valid = match &mut self.validity {
            Some(validity) => validity.nth(n).unwrap_or(true),
            None => true,
        };
        Some(Nullable::with_validity(value, valid))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<'a, T: Copy> DoubleEndedIterator for PrimitiveIter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let value = *self.values.next_back()?;
        let valid = match &mut self.validity {
            Some(validity) => validity.next_back().unwrap_or(true),
            None => true,
        };
        Some(Nullable::with_validity(value, valid))
    }
}

impl<'a, T: Copy> ExactSizeIterator for PrimitiveIter<'a, T> {}

impl<'a, T: Copy> FusedIterator for PrimitiveIter<'a, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::PrimitiveArray;
    use crate::datatype::{DataType, TimeUnit};

    #[test]
    fn get_and_iter() {
        let arr = PrimitiveArray::<i32>::from_nullable_iter([Some(1), None, Some(3), Some(4)]);
        let layout = arr.layout();

        assert_eq!(4, layout.len());
        assert_eq!(1, layout.null_count());
        assert_eq!(Nullable::new(1_i32), layout.get(0));
        assert!(layout.get(1).is_null());

        let got: Vec<_> = layout.iter().map(|v| v.into_option()).collect();
        assert_eq!(vec![Some(1), None, Some(3), Some(4)], got);

        let back: Vec<_> = layout.iter().rev().map(|v| v.into_option()).collect();
        assert_eq!(vec![Some(4), Some(3), None, Some(1)], back);

        let mut iter = layout.iter();
        assert_eq!(Some(Nullable::new(3_i32)), iter.nth(2));
    }

    #[test]
    fn sliced_window() {
        let arr = PrimitiveArray::<i64>::from_nullable_iter([Some(1), None, Some(3), Some(4)]);
        let sliced = arr.data().slice(1, 2);
        let layout = PrimitiveLayout::<i64>::try_new(&sliced).unwrap();

        assert_eq!(2, layout.len());
        assert!(layout.get(0).is_null());
        assert_eq!(Nullable::new(3_i64), layout.get(1));
        assert_eq!(&[0, 3], layout.values());
    }

    #[test]
    fn wrong_type() {
        let arr = PrimitiveArray::<i32>::from_iter([1, 2]);
        PrimitiveLayout::<u32>::try_new(arr.data()).unwrap_err();
    }

    #[test]
    fn timestamps() {
        let arr = PrimitiveArray::<i64>::from_iter([10, 20])
            .with_data_type(DataType::Timestamp(TimeUnit::Millisecond))
            .unwrap();
        let layout = PrimitiveLayout::<i64>::try_new(arr.data()).unwrap();
        assert_eq!(20, layout.value(1));
    }
}
