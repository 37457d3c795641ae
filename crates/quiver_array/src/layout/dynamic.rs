use std::sync::Arc;

use half::f16;
use quiver_error::Result;

use super::{
    AnyKeyLayout, BinaryLayout, BooleanLayout, DictionaryLayout, FixedSizeBinaryLayout,
    FixedSizeListLayout, LargeBinaryLayout, LargeUtf8Layout, Layout, LayoutIter, ListLayout,
    NullLayout, PrimitiveLayout, RunEndLayout, StructLayout, UnionLayout, Utf8Layout,
};
use crate::array_data::ArrayData;
use crate::datatype::{DataType, TimeUnit};
use crate::scalar::ScalarValue;

/// A layout chosen at runtime from the data type.
///
/// Values are read as [`ScalarValue`]s. Nested variants are reference
/// counted so cloning a view stays cheap.
#[derive(Debug, Clone)]
pub enum ArrayView<'a> {
    Null(NullLayout<'a>),
    Boolean(BooleanLayout<'a>),
    UInt8(PrimitiveLayout<'a, u8>),
    Int8(PrimitiveLayout<'a, i8>),
    UInt16(PrimitiveLayout<'a, u16>),
    Int16(PrimitiveLayout<'a, i16>),
    UInt32(PrimitiveLayout<'a, u32>),
    Int32(PrimitiveLayout<'a, i32>),
    UInt64(PrimitiveLayout<'a, u64>),
    Int64(PrimitiveLayout<'a, i64>),
    Float16(PrimitiveLayout<'a, f16>),
    Float32(PrimitiveLayout<'a, f32>),
    Float64(PrimitiveLayout<'a, f64>),
    Timestamp(TimeUnit, PrimitiveLayout<'a, i64>),
    Utf8(Utf8Layout<'a>),
    LargeUtf8(LargeUtf8Layout<'a>),
    Binary(BinaryLayout<'a>),
    LargeBinary(LargeBinaryLayout<'a>),
    FixedSizeBinary(FixedSizeBinaryLayout<'a>),
    List(Arc<ListLayout<'a, i32, ArrayView<'a>>>),
    LargeList(Arc<ListLayout<'a, i64, ArrayView<'a>>>),
    FixedSizeList(Arc<FixedSizeListLayout<'a, ArrayView<'a>>>),
    Struct(StructLayout<'a>),
    Union(UnionLayout<'a>),
    RunEndEncoded(Arc<RunEndLayout<'a, ArrayView<'a>>>),
    Dictionary(Arc<DictionaryLayout<'a, AnyKeyLayout<'a>, ArrayView<'a>>>),
}

macro_rules! with_layout {
    ($view:expr, $layout:ident => $body:expr) => {
        match $view {
            ArrayView::Null($layout) => $body,
            ArrayView::Boolean($layout) => $body,
            ArrayView::UInt8($layout) => $body,
            ArrayView::Int8($layout) => $body,
            ArrayView::UInt16($layout) => $body,
            ArrayView::Int16($layout) => $body,
            ArrayView::UInt32($layout) => $body,
            ArrayView::Int32($layout) => $body,
            ArrayView::UInt64($layout) => $body,
            ArrayView::Int64($layout) => $body,
            ArrayView::Float16($layout) => $body,
            ArrayView::Float32($layout) => $body,
            ArrayView::Float64($layout) => $body,
            ArrayView::Timestamp(_, $layout) => $body,
            ArrayView::Utf8($layout) => $body,
            ArrayView::LargeUtf8($layout) => $body,
            ArrayView::Binary($layout) => $body,
            ArrayView::LargeBinary($layout) => $body,
            ArrayView::FixedSizeBinary($layout) => $body,
            ArrayView::List($layout) => $body,
            ArrayView::LargeList($layout) => $body,
            ArrayView::FixedSizeList($layout) => $body,
            ArrayView::Struct($layout) => $body,
            ArrayView::Union($layout) => $body,
            ArrayView::RunEndEncoded($layout) => $body,
            ArrayView::Dictionary($layout) => $body,
        }
    };
}

impl<'a> ArrayView<'a> {
    pub fn datatype(&self) -> &'a DataType {
        self.data().datatype()
    }
}

impl<'a> Layout<'a> for ArrayView<'a> {
    type Value = ScalarValue<'a>;
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        if data.is_dictionary() {
            return Ok(Self::Dictionary(Arc::new(DictionaryLayout::try_new(data)?)));
        }

        Ok(match data.datatype() {
            DataType::Null => Self::Null(NullLayout::try_new(data)?),
            DataType::Boolean => Self::Boolean(BooleanLayout::try_new(data)?),
            DataType::UInt8 => Self::UInt8(PrimitiveLayout::try_new(data)?),
            DataType::Int8 => Self::Int8(PrimitiveLayout::try_new(data)?),
            DataType::UInt16 => Self::UInt16(PrimitiveLayout::try_new(data)?),
            DataType::Int16 => Self::Int16(PrimitiveLayout::try_new(data)?),
            DataType::UInt32 => Self::UInt32(PrimitiveLayout::try_new(data)?),
            DataType::Int32 => Self::Int32(PrimitiveLayout::try_new(data)?),
            DataType::UInt64 => Self::UInt64(PrimitiveLayout::try_new(data)?),
            DataType::Int64 => Self::Int64(PrimitiveLayout::try_new(data)?),
            DataType::Float16 => Self::Float16(PrimitiveLayout::try_new(data)?),
            DataType::Float32 => Self::Float32(PrimitiveLayout::try_new(data)?),
            DataType::Float64 => Self::Float64(PrimitiveLayout::try_new(data)?),
            DataType::Timestamp(unit) => Self::Timestamp(*unit, PrimitiveLayout::try_new(data)?),
            DataType::Utf8 => Self::Utf8(Utf8Layout::try_new(data)?),
            DataType::LargeUtf8 => Self::LargeUtf8(LargeUtf8Layout::try_new(data)?),
            DataType::Binary => Self::Binary(BinaryLayout::try_new(data)?),
            DataType::LargeBinary => Self::LargeBinary(LargeBinaryLayout::try_new(data)?),
            DataType::FixedSizeBinary(_) => {
                Self::FixedSizeBinary(FixedSizeBinaryLayout::try_new(data)?)
            }
            DataType::List => Self::List(Arc::new(ListLayout::try_new(data)?)),
            DataType::LargeList => Self::LargeList(Arc::new(ListLayout::try_new(data)?)),
            DataType::FixedSizeList(_) => {
                Self::FixedSizeList(Arc::new(FixedSizeListLayout::try_new(data)?))
            }
            DataType::Struct => Self::Struct(StructLayout::try_new(data)?),
            DataType::DenseUnion | DataType::SparseUnion => {
                Self::Union(UnionLayout::try_new(data)?)
            }
            DataType::RunEndEncoded => {
                Self::RunEndEncoded(Arc::new(RunEndLayout::try_new(data)?))
            }
        })
    }

    fn data(&self) -> &'a ArrayData {
        with_layout!(self, layout => layout.data())
    }

    fn len(&self) -> usize {
        with_layout!(self, layout => layout.len())
    }

    fn is_valid(&self, idx: usize) -> bool {
        with_layout!(self, layout => layout.is_valid(idx))
    }

    fn null_count(&self) -> usize {
        with_layout!(self, layout => layout.null_count())
    }

    fn value(&self, idx: usize) -> ScalarValue<'a> {
        match self {
            Self::Null(layout) => {
                layout.value(idx);
                ScalarValue::Null
            }
            Self::Boolean(layout) => ScalarValue::Boolean(layout.value(idx)),
            Self::UInt8(layout) => ScalarValue::UInt8(layout.value(idx)),
            Self::Int8(layout) => ScalarValue::Int8(layout.value(idx)),
            Self::UInt16(layout) => ScalarValue::UInt16(layout.value(idx)),
            Self::Int16(layout) => ScalarValue::Int16(layout.value(idx)),
            Self::UInt32(layout) => ScalarValue::UInt32(layout.value(idx)),
            Self::Int32(layout) => ScalarValue::Int32(layout.value(idx)),
            Self::UInt64(layout) => ScalarValue::UInt64(layout.value(idx)),
            Self::Int64(layout) => ScalarValue::Int64(layout.value(idx)),
            Self::Float16(layout) => ScalarValue::Float16(layout.value(idx)),
            Self::Float32(layout) => ScalarValue::Float32(layout.value(idx)),
            Self::Float64(layout) => ScalarValue::Float64(layout.value(idx)),
            Self::Timestamp(unit, layout) => ScalarValue::Timestamp(*unit, layout.value(idx)),
            Self::Utf8(layout) => ScalarValue::Utf8(layout.value(idx)),
            Self::LargeUtf8(layout) => ScalarValue::Utf8(layout.value(idx)),
            Self::Binary(layout) => ScalarValue::Binary(layout.value(idx)),
            Self::LargeBinary(layout) => ScalarValue::Binary(layout.value(idx)),
            Self::FixedSizeBinary(layout) => ScalarValue::FixedSizeBinary(layout.value(idx)),
            Self::List(layout) => ScalarValue::List(layout.value(idx)),
            Self::LargeList(layout) => ScalarValue::List(layout.value(idx)),
            Self::FixedSizeList(layout) => ScalarValue::List(layout.value(idx)),
            Self::Struct(layout) => ScalarValue::Struct(layout.value(idx)),
            Self::Union(layout) => layout.value(idx),
            Self::RunEndEncoded(layout) => layout.value(idx),
            Self::Dictionary(layout) => layout.value(idx),
        }
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(self.clone())
    }
}
