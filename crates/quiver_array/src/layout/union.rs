use std::sync::Arc;

use quiver_error::{QuiverError, Result};

use super::{ArrayView, Layout, LayoutIter};
use crate::array_data::ArrayData;
use crate::datatype::DataType;
use crate::scalar::ScalarValue;

/// Layout over a dense or sparse union.
///
/// Each slot holds an `i8` type id selecting the child the value lives in. A
/// sparse union reads the child at the same position, a dense union reads it
/// at the position given by the offsets buffer. Unions have no validity of
/// their own, a slot is null when the selected child is null there.
#[derive(Debug, Clone)]
pub struct UnionLayout<'a> {
    data: &'a ArrayData,
    /// Type ids with the data's offset applied.
    type_ids: &'a [i8],
    /// Dense offsets with the data's offset applied.
    offsets: Option<&'a [i32]>,
    children: Arc<[ArrayView<'a>]>,
}

impl<'a> UnionLayout<'a> {
    pub fn is_dense(&self) -> bool {
        self.offsets.is_some()
    }

    pub fn type_ids(&self) -> &'a [i8] {
        self.type_ids
    }

    pub fn children(&self) -> &[ArrayView<'a>] {
        &self.children
    }

    /// Resolve `idx` to the child and the position within that child.
    pub fn child_position(&self, idx: usize) -> (usize, usize) {
        let child = self.type_ids[idx] as usize;
        let pos = match self.offsets {
            Some(offsets) => offsets[idx] as usize,
            None => self.data.offset() + idx,
        };
        (child, pos)
    }
}

impl<'a> Layout<'a> for UnionLayout<'a> {
    type Value = ScalarValue<'a>;
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        let dense = match data.datatype() {
            DataType::DenseUnion => true,
            DataType::SparseUnion => false,
            other => {
                return Err(QuiverError::new("Expected union data").with_field("datatype", other))
            }
        };

        let window = data.offset()..data.offset() + data.len();
        let type_ids: &[i8] = data.buffer_as(0)?;
        let type_ids = type_ids
            .get(window.clone())
            .ok_or_else(|| QuiverError::new("Type ids buffer too short"))?;

        let offsets = if dense {
            let offsets: &[i32] = data.buffer_as(1)?;
            Some(
                offsets
                    .get(window)
                    .ok_or_else(|| QuiverError::new("Union offsets buffer too short"))?,
            )
        } else {
            None
        };

        let children = data
            .children()
            .iter()
            .map(|child| ArrayView::try_new(child))
            .collect::<Result<Arc<[_]>>>()?;

        Ok(UnionLayout {
            data,
            type_ids,
            offsets,
            children,
        })
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn len(&self) -> usize {
        self.type_ids.len()
    }

    fn is_valid(&self, idx: usize) -> bool {
        let (child, pos) = self.child_position(idx);
        self.children[child].is_valid(pos)
    }

    fn null_count(&self) -> usize {
        (0..self.len()).filter(|&idx| !self.is_valid(idx)).count()
    }

    fn value(&self, idx: usize) -> ScalarValue<'a> {
        let (child, pos) = self.child_position(idx);
        self.children[child].value(pos)
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{PrimitiveArray, UnionArray, Utf8Array};
    use crate::nullable::Nullable;

    #[test]
    fn sparse() {
        let arr = UnionArray::try_new_sparse(
            vec![0, 1, 0],
            vec![
                PrimitiveArray::<i64>::from_nullable_iter([Some(1), Some(2), None]).into(),
                Utf8Array::from_values(["x", "y", "z"]).unwrap().into(),
            ],
        )
        .unwrap();
        let layout = arr.layout().unwrap();

        assert!(!layout.is_dense());
        assert_eq!(3, layout.len());
        assert_eq!(Nullable::new(ScalarValue::Int64(1)), layout.get(0));
        assert_eq!(Nullable::new(ScalarValue::Utf8("y")), layout.get(1));
        assert!(layout.get(2).is_null());
        assert_eq!(1, layout.null_count());
    }

    #[test]
    fn dense() {
        let arr = UnionArray::try_new_dense(
            vec![1, 0, 1, 1],
            vec![0, 0, 1, 0],
            vec![
                PrimitiveArray::<i32>::from_iter([7]).into(),
                Utf8Array::from_values(["a", "b"]).unwrap().into(),
            ],
        )
        .unwrap();
        let layout = arr.layout().unwrap();

        assert!(layout.is_dense());
        assert_eq!((1, 1), layout.child_position(2));
        let got: Vec<_> = layout.iter().map(|v| v.into_option()).collect();
        assert_eq!(
            vec![
                Some(ScalarValue::Utf8("a")),
                Some(ScalarValue::Int32(7)),
                Some(ScalarValue::Utf8("b")),
                Some(ScalarValue::Utf8("a")),
            ],
            got
        );
    }

    #[test]
    fn type_id_out_of_range() {
        UnionArray::try_new_sparse(vec![2], vec![PrimitiveArray::<i32>::from_iter([1]).into()])
            .unwrap_err();
    }
}
