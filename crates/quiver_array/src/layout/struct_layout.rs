use std::sync::Arc;

use quiver_error::Result;

use super::{ArrayView, Layout, LayoutIter};
use crate::array_data::ArrayData;
use crate::datatype::DataType;
use crate::nullable::Nullable;
use crate::scalar::ScalarValue;
use crate::traits::check_data_type;

/// Layout over a struct, where each field is stored in its own child.
///
/// Children are read at the struct's offset, they are never sliced
/// independently.
#[derive(Debug, Clone)]
pub struct StructLayout<'a> {
    data: &'a ArrayData,
    children: Arc<[ArrayView<'a>]>,
}

impl<'a> StructLayout<'a> {
    pub fn num_fields(&self) -> usize {
        self.children.len()
    }

    /// Dynamic view of the child backing field `idx`.
    pub fn field(&self, idx: usize) -> Option<&ArrayView<'a>> {
        self.children.get(idx)
    }
}

impl<'a> Layout<'a> for StructLayout<'a> {
    type Value = StructValue<'a>;
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        check_data_type(&DataType::Struct, data.datatype())?;
        let children = data
            .children()
            .iter()
            .map(|child| ArrayView::try_new(child))
            .collect::<Result<Arc<[_]>>>()?;
        Ok(StructLayout { data, children })
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn value(&self, idx: usize) -> StructValue<'a> {
        assert!(idx < self.len());
        StructValue {
            children: self.children.clone(),
            idx: self.data.offset() + idx,
        }
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(self.clone())
    }
}

/// A single row of a struct.
#[derive(Debug, Clone)]
pub struct StructValue<'a> {
    children: Arc<[ArrayView<'a>]>,
    /// Row index into the children.
    idx: usize,
}

impl<'a> StructValue<'a> {
    pub fn num_fields(&self) -> usize {
        self.children.len()
    }

    /// Get the value of field `field`.
    ///
    /// Panics if the field doesn't exist.
    pub fn field(&self, field: usize) -> Nullable<ScalarValue<'a>> {
        self.children[field].get(self.idx)
    }

    pub fn fields(&self) -> impl Iterator<Item = Nullable<ScalarValue<'a>>> + '_ {
        self.children.iter().map(|child| child.get(self.idx))
    }
}

impl<'a> PartialEq for StructValue<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.num_fields() == other.num_fields() && self.fields().eq(other.fields())
    }
}
