use std::marker::PhantomData;

use quiver_error::{QuiverError, Result};

use super::{Layout, LayoutIter};
use crate::array_data::ArrayData;
use crate::datatype::DataType;
use crate::nullable::Nullable;
use crate::offsets::OffsetIndex;
use crate::traits::check_data_type;

/// Layout over lists of values stored in a single child array.
///
/// List `i` spans `child[offsets[i]..offsets[i + 1]]`.
#[derive(Debug, Clone)]
pub struct ListLayout<'a, O, L> {
    data: &'a ArrayData,
    /// Offsets with the data's offset applied. One longer than the layout.
    offsets: &'a [O],
    child: L,
}

pub type LargeListLayout<'a, L> = ListLayout<'a, i64, L>;

impl<'a, O: OffsetIndex, L: Layout<'a>> ListLayout<'a, O, L> {
    pub fn child(&self) -> &L {
        &self.child
    }

    pub fn offsets(&self) -> &'a [O] {
        self.offsets
    }
}

impl<'a, O: OffsetIndex, L: Layout<'a> + 'a> Layout<'a> for ListLayout<'a, O, L> {
    type Value = ListValue<'a, L>;
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        check_data_type(&O::LIST_TYPE, data.datatype())?;
        let offsets: &[O] = data.buffer_as(0)?;
        let offsets = offsets
            .get(data.offset()..=data.offset() + data.len())
            .ok_or_else(|| QuiverError::new("Offsets buffer too short"))?;
        let child = L::try_new(data.child(0)?)?;
        Ok(ListLayout {
            data,
            offsets,
            child,
        })
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn value(&self, idx: usize) -> ListValue<'a, L> {
        ListValue {
            child: self.child.clone(),
            start: self.offsets[idx].as_usize(),
            end: self.offsets[idx + 1].as_usize(),
            _lifetime: PhantomData,
        }
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(self.clone())
    }
}

/// Layout over lists that each hold exactly `size` child values.
///
/// List `i` spans `size` child values starting at `(offset + i) * size`, so
/// no offsets buffer is needed.
#[derive(Debug, Clone)]
pub struct FixedSizeListLayout<'a, L> {
    data: &'a ArrayData,
    size: usize,
    child: L,
}

impl<'a, L: Layout<'a>> FixedSizeListLayout<'a, L> {
    pub fn child(&self) -> &L {
        &self.child
    }

    pub fn list_size(&self) -> usize {
        self.size
    }
}

impl<'a, L: Layout<'a> + 'a> Layout<'a> for FixedSizeListLayout<'a, L> {
    type Value = ListValue<'a, L>;
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        let size = match data.datatype() {
            DataType::FixedSizeList(size) => *size,
            other => {
                return Err(QuiverError::new("Expected fixed size list data")
                    .with_field("datatype", other))
            }
        };
        let child = L::try_new(data.child(0)?)?;
        let required = (data.offset() + data.len()) * size;
        if child.len() < required {
            return Err(QuiverError::new("Fixed size list child too short")
                .with_field("len", child.len())
                .with_field("required", required));
        }
        Ok(FixedSizeListLayout { data, size, child })
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn value(&self, idx: usize) -> ListValue<'a, L> {
        assert!(
            idx < self.len(),
            "index {idx} out of bounds for array of length {}",
            self.len()
        );
        let start = (self.data.offset() + idx) * self.size;
        ListValue {
            child: self.child.clone(),
            start,
            end: start + self.size,
            _lifetime: PhantomData,
        }
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(self.clone())
    }
}

/// A single list, viewing a range of the child layout.
#[derive(Debug, Clone)]
pub struct ListValue<'a, L: 'a> {
    child: L,
    start: usize,
    end: usize,
    _lifetime: PhantomData<&'a ()>,
}

impl<'a, L: Layout<'a>> ListValue<'a, L> {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Range of the child covered by this list.
    pub fn child_range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    /// Get the element at `idx` within this list.
    pub fn get(&self, idx: usize) -> Nullable<L::Value> {
        assert!(idx < self.len());
        self.child.get(self.start + idx)
    }

    pub fn iter(&self) -> LayoutIter<'a, L> {
        LayoutIter::with_range(self.child.clone(), self.start..self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{FixedSizeListArray, ListArray, PrimitiveArray};
    use crate::bitmap::Bitmap;
    use crate::layout::{PrimitiveLayout, Utf8Layout};

    #[test]
    fn nested_primitives() {
        let arr = ListArray::<i32>::from_rows::<i64>([
            Some(vec![Some(&1), Some(&2)]),
            None,
            Some(vec![]),
            Some(vec![None, Some(&5)]),
        ])
        .unwrap();
        let layout: ListLayout<i32, PrimitiveLayout<i64>> = arr.layout().unwrap();

        assert_eq!(4, layout.len());
        assert_eq!(1, layout.null_count());

        let first = layout.value(0);
        assert_eq!(2, first.len());
        assert_eq!(Some(2), first.get(1).into_option());

        assert!(layout.get(1).is_null());
        assert!(layout.value(2).is_empty());

        let last: Vec<_> = layout.value(3).iter().map(|v| v.into_option()).collect();
        assert_eq!(vec![None, Some(5)], last);
        assert_eq!(&[0, 2, 2, 2, 4], layout.offsets());
    }

    #[test]
    fn nested_strings() {
        let arr = ListArray::<i64>::from_rows::<str>([
            Some(vec![Some("a"), None]),
            Some(vec![Some("bc")]),
        ])
        .unwrap();
        let layout: LargeListLayout<Utf8Layout> = arr.layout().unwrap();
        let got: Vec<_> = layout.value(1).iter().map(|v| v.into_option()).collect();
        assert_eq!(vec![Some("bc")], got);
        assert_eq!(2..3, layout.value(1).child_range());
    }

    #[test]
    fn wrong_offset_width() {
        let arr = ListArray::<i32>::from_rows::<i64>([Some(vec![Some(&1)])]).unwrap();
        LargeListLayout::<PrimitiveLayout<i64>>::try_new(arr.data()).unwrap_err();
    }

    #[test]
    fn fixed_size_lists() {
        let arr = FixedSizeListArray::try_new(
            PrimitiveArray::<u8>::from_nullable_iter([
                Some(1),
                Some(2),
                None,
                Some(4),
                Some(5),
                Some(6),
            ])
            .into(),
            3,
            Some(Bitmap::from_bool_iter([true, false])),
        )
        .unwrap();
        let layout: FixedSizeListLayout<PrimitiveLayout<u8>> = arr.layout().unwrap();

        assert_eq!(2, layout.len());
        assert_eq!(3, layout.list_size());
        assert_eq!(1, layout.null_count());
        let first: Vec<_> = layout.value(0).iter().map(|v| v.into_option()).collect();
        assert_eq!(vec![Some(1), Some(2), None], first);
        assert!(layout.get(1).is_null());
        assert_eq!(3..6, layout.value(1).child_range());
    }

    #[test]
    fn fixed_size_list_window() {
        let arr = FixedSizeListArray::try_new(
            PrimitiveArray::<i32>::from_iter([1, 2, 3, 4, 5, 6]).into(),
            2,
            None,
        )
        .unwrap();
        let sliced = arr.data().slice(1, 2);
        let layout = FixedSizeListLayout::<PrimitiveLayout<i32>>::try_new(&sliced).unwrap();

        assert_eq!(2, layout.len());
        let got: Vec<Vec<_>> = layout
            .iter()
            .map(|list| list.into_option().unwrap().iter().map(|v| v.into_option()).collect())
            .collect();
        assert_eq!(vec![vec![Some(3), Some(4)], vec![Some(5), Some(6)]], got);

        ListLayout::<i32, PrimitiveLayout<i32>>::try_new(arr.data()).unwrap_err();
    }
}
