use std::sync::Arc;

use quiver_error::{QuiverError, Result};

use crate::array_data::{bytes_from_slice, ArrayData};
use crate::datatype::DataType;
use crate::layout::{Layout, UnionLayout};

/// An owned union array, holding values from several children.
///
/// A slot's type id is the index of the child holding its value.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionArray {
    data: ArrayData,
}

impl UnionArray {
    /// Create a sparse union. Every child has one value per slot.
    pub fn try_new_sparse(type_ids: Vec<i8>, children: Vec<ArrayData>) -> Result<Self> {
        let data = ArrayData::try_new(
            DataType::SparseUnion,
            type_ids.len(),
            None,
            vec![bytes_from_slice(&type_ids)],
            children.into_iter().map(Arc::new).collect(),
        )?;
        Ok(UnionArray { data })
    }

    /// Create a dense union, where `offsets[i]` is the position of slot `i`
    /// within the child selected by `type_ids[i]`.
    pub fn try_new_dense(
        type_ids: Vec<i8>,
        offsets: Vec<i32>,
        children: Vec<ArrayData>,
    ) -> Result<Self> {
        if type_ids.len() != offsets.len() {
            return Err(QuiverError::new("Union type ids and offsets differ in length")
                .with_field("type_ids", type_ids.len())
                .with_field("offsets", offsets.len()));
        }
        let data = ArrayData::try_new(
            DataType::DenseUnion,
            type_ids.len(),
            None,
            vec![bytes_from_slice(&type_ids), bytes_from_slice(&offsets)],
            children.into_iter().map(Arc::new).collect(),
        )?;
        Ok(UnionArray { data })
    }

    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        match data.datatype() {
            DataType::SparseUnion | DataType::DenseUnion if !data.is_dictionary() => {
                data.validate()?;
                Ok(UnionArray { data })
            }
            other => Err(QuiverError::new("Expected union data").with_field("datatype", other)),
        }
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn into_data(self) -> ArrayData {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_dense(&self) -> bool {
        self.data.datatype() == &DataType::DenseUnion
    }

    pub fn layout(&self) -> Result<UnionLayout<'_>> {
        UnionLayout::try_new(&self.data)
    }
}

impl From<UnionArray> for ArrayData {
    fn from(arr: UnionArray) -> Self {
        arr.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{BooleanArray, PrimitiveArray};
    use crate::scalar::ScalarValue;

    #[test]
    fn dense_offset_out_of_bounds() {
        let res = UnionArray::try_new_dense(
            vec![0, 0],
            vec![0, 1],
            vec![PrimitiveArray::<i32>::from_iter([1]).into()],
        );
        res.unwrap_err();
    }

    #[test]
    fn mismatched_offsets() {
        UnionArray::try_new_dense(vec![0], Vec::new(), Vec::new()).unwrap_err();
    }

    #[test]
    fn sliced_sparse() {
        let arr = UnionArray::try_new_sparse(
            vec![1, 0, 1],
            vec![
                PrimitiveArray::<u8>::from_iter([1, 2, 3]).into(),
                BooleanArray::from_iter([true, false, true]).into(),
            ],
        )
        .unwrap();
        assert!(!arr.is_dense());

        let sliced = UnionArray::try_from_data(arr.data().slice(1, 2)).unwrap();
        let layout = sliced.layout().unwrap();
        assert_eq!(ScalarValue::UInt8(2), layout.value(0));
        assert_eq!(ScalarValue::Boolean(true), layout.value(1));
    }
}
