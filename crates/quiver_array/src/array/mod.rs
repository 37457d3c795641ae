//! Owned arrays.
//!
//! Each array owns its [`ArrayData`] and keeps it compact, with no offset
//! and buffers sized to the values. That's what lets them support in place
//! mutation. [`Array`] wraps any of them with the concrete type chosen from
//! the data type at runtime.
//!
//! Compacting sliced data keeps its field name and metadata.

mod boolean;
mod dictionary;
mod fixed_size_binary;
mod list;
mod null;
mod primitive;
mod run_end;
mod struct_array;
mod union;
mod varlen;

pub use boolean::*;
pub use dictionary::*;
pub use fixed_size_binary::*;
pub use list::*;
pub use null::*;
pub use primitive::*;
pub use run_end::*;
pub use struct_array::*;
pub use union::*;
pub use varlen::*;

use quiver_error::{QuiverError, Result};

use crate::array_data::ArrayData;
use crate::datatype::DataType;
use crate::layout::{ArrayView, Layout};
use crate::nullable::Nullable;
use crate::scalar::ScalarValue;

/// An owned array of any type.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Null(NullArray),
    Boolean(BooleanArray),
    UInt8(UInt8Array),
    Int8(Int8Array),
    UInt16(UInt16Array),
    Int16(Int16Array),
    UInt32(UInt32Array),
    Int32(Int32Array),
    UInt64(UInt64Array),
    Int64(Int64Array),
    Float16(Float16Array),
    Float32(Float32Array),
    Float64(Float64Array),
    /// Timestamps are stored as i64 values with a timestamp data type.
    Timestamp(Int64Array),
    Utf8(Utf8Array),
    LargeUtf8(LargeUtf8Array),
    Binary(BinaryArray),
    LargeBinary(LargeBinaryArray),
    FixedSizeBinary(FixedSizeBinaryArray),
    List(ListArray<i32>),
    LargeList(LargeListArray),
    FixedSizeList(FixedSizeListArray),
    Struct(StructArray),
    Union(UnionArray),
    RunEndEncoded(RunEndEncodedArray),
    Dictionary(AnyDictionaryArray),
}

macro_rules! with_array {
    ($arr:expr, $inner:ident => $body:expr) => {
        match $arr {
            Array::Null($inner) => $body,
            Array::Boolean($inner) => $body,
            Array::UInt8($inner) => $body,
            Array::Int8($inner) => $body,
            Array::UInt16($inner) => $body,
            Array::Int16($inner) => $body,
            Array::UInt32($inner) => $body,
            Array::Int32($inner) => $body,
            Array::UInt64($inner) => $body,
            Array::Int64($inner) => $body,
            Array::Float16($inner) => $body,
            Array::Float32($inner) => $body,
            Array::Float64($inner) => $body,
            Array::Timestamp($inner) => $body,
            Array::Utf8($inner) => $body,
            Array::LargeUtf8($inner) => $body,
            Array::Binary($inner) => $body,
            Array::LargeBinary($inner) => $body,
            Array::FixedSizeBinary($inner) => $body,
            Array::List($inner) => $body,
            Array::LargeList($inner) => $body,
            Array::FixedSizeList($inner) => $body,
            Array::Struct($inner) => $body,
            Array::Union($inner) => $body,
            Array::RunEndEncoded($inner) => $body,
            Array::Dictionary($inner) => $body,
        }
    };
}

impl Array {
    /// Wrap array data in the owned array matching its data type.
    ///
    /// Sliced data is compacted.
    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        if data.is_dictionary() {
            return Ok(Self::Dictionary(AnyDictionaryArray::try_from_data(data)?));
        }

        Ok(match *data.datatype() {
            DataType::Null => Self::Null(NullArray::try_from_data(data)?),
            DataType::Boolean => Self::Boolean(BooleanArray::try_from_data(data)?),
            DataType::UInt8 => Self::UInt8(PrimitiveArray::try_from_data(data)?),
            DataType::Int8 => Self::Int8(PrimitiveArray::try_from_data(data)?),
            DataType::UInt16 => Self::UInt16(PrimitiveArray::try_from_data(data)?),
            DataType::Int16 => Self::Int16(PrimitiveArray::try_from_data(data)?),
            DataType::UInt32 => Self::UInt32(PrimitiveArray::try_from_data(data)?),
            DataType::Int32 => Self::Int32(PrimitiveArray::try_from_data(data)?),
            DataType::UInt64 => Self::UInt64(PrimitiveArray::try_from_data(data)?),
            DataType::Int64 => Self::Int64(PrimitiveArray::try_from_data(data)?),
            DataType::Float16 => Self::Float16(PrimitiveArray::try_from_data(data)?),
            DataType::Float32 => Self::Float32(PrimitiveArray::try_from_data(data)?),
            DataType::Float64 => Self::Float64(PrimitiveArray::try_from_data(data)?),
            DataType::Timestamp(_) => Self::Timestamp(PrimitiveArray::try_from_data(data)?),
            DataType::Utf8 => Self::Utf8(Utf8Array::try_from_data(data)?),
            DataType::LargeUtf8 => Self::LargeUtf8(LargeUtf8Array::try_from_data(data)?),
            DataType::Binary => Self::Binary(BinaryArray::try_from_data(data)?),
            DataType::LargeBinary => Self::LargeBinary(LargeBinaryArray::try_from_data(data)?),
            DataType::FixedSizeBinary(_) => {
                Self::FixedSizeBinary(FixedSizeBinaryArray::try_from_data(data)?)
            }
            DataType::List => Self::List(ListArray::try_from_data(data)?),
            DataType::LargeList => Self::LargeList(ListArray::try_from_data(data)?),
            DataType::FixedSizeList(_) => {
                Self::FixedSizeList(FixedSizeListArray::try_from_data(data)?)
            }
            DataType::Struct => Self::Struct(StructArray::try_from_data(data)?),
            DataType::DenseUnion | DataType::SparseUnion => {
                Self::Union(UnionArray::try_from_data(data)?)
            }
            DataType::RunEndEncoded => {
                Self::RunEndEncoded(RunEndEncodedArray::try_from_data(data)?)
            }
        })
    }

    pub fn data(&self) -> &ArrayData {
        with_array!(self, arr => arr.data())
    }

    pub fn into_data(self) -> ArrayData {
        with_array!(self, arr => arr.into_data())
    }

    /// Name of the field holding this array, if any.
    pub fn name(&self) -> Option<&str> {
        self.data().name()
    }

    pub fn data_type(&self) -> &DataType {
        self.data().datatype()
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    /// Dynamic view over the array.
    pub fn view(&self) -> Result<ArrayView<'_>> {
        ArrayView::try_new(self.data())
    }

    /// If the value at `idx` is valid, resolving dictionaries and unions.
    pub fn is_valid(&self, idx: usize) -> Result<bool> {
        Ok(self.view()?.is_valid(idx))
    }

    /// Number of nulls, resolving dictionaries and unions.
    pub fn null_count(&self) -> Result<usize> {
        Ok(self.view()?.null_count())
    }

    /// Get the value at `idx`.
    pub fn scalar(&self, idx: usize) -> Result<Nullable<ScalarValue<'_>>> {
        Ok(self.view()?.get(idx))
    }
}

impl TryFrom<ArrayData> for Array {
    type Error = QuiverError;

    fn try_from(data: ArrayData) -> Result<Self> {
        Self::try_from_data(data)
    }
}

impl From<Array> for ArrayData {
    fn from(arr: Array) -> Self {
        arr.into_data()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::datatype::TimeUnit;
    use crate::metadata::Metadata;

    #[test]
    fn dispatch_from_data() {
        let data: ArrayData = PrimitiveArray::<i64>::from_iter([1, 2])
            .with_data_type(DataType::Timestamp(TimeUnit::Millisecond))
            .unwrap()
            .into();
        let arr = Array::try_from_data(data).unwrap();
        assert!(matches!(arr, Array::Timestamp(_)));
        assert_eq!(
            Nullable::new(ScalarValue::Timestamp(TimeUnit::Millisecond, 2)),
            arr.scalar(1).unwrap()
        );
    }

    #[test]
    fn compacts_sliced_data() {
        let arr = Utf8Array::from_values(["a", "bb", "ccc"]).unwrap();
        let arr = Array::try_from_data(arr.data().slice(1, 2)).unwrap();
        assert_eq!(0, arr.data().offset());
        assert_eq!(2, arr.len());
        assert_eq!(Nullable::new(ScalarValue::Utf8("ccc")), arr.scalar(1).unwrap());
    }

    #[test]
    fn compaction_keeps_field_info() {
        let metadata: Metadata = [("k", "v")].into_iter().collect();
        let data = PrimitiveArray::<i16>::from_iter([1, 2, 3])
            .into_data()
            .with_name("a")
            .with_metadata(metadata.clone());

        let arr = Array::try_from_data(data.slice(1, 2)).unwrap();
        assert_eq!(0, arr.data().offset());
        assert_eq!(Some("a"), arr.name());
        assert_eq!(Some(&metadata), arr.data().metadata());

        let list = ListArray::<i32>::from_rows::<str>([Some(vec![Some("x")]), None])
            .unwrap()
            .into_data()
            .with_name("l");
        let arr = Array::try_from_data(list.slice(1, 1)).unwrap();
        assert_eq!(Some("l"), arr.name());
    }

    #[test]
    fn dispatch_new_layouts() {
        let arr = FixedSizeListArray::from_rows::<u8>(1, [Some(vec![Some(&4)])]).unwrap();
        let arr = Array::try_from_data(arr.into_data()).unwrap();
        assert!(matches!(arr, Array::FixedSizeList(_)));
        assert_eq!("[4]", arr.scalar(0).unwrap().into_option().unwrap().to_string());

        let arr = RunEndEncodedArray::from_values::<str>([None, None, Some("r")]).unwrap();
        let arr = Array::try_from_data(arr.data().slice(1, 2)).unwrap();
        assert!(matches!(arr, Array::RunEndEncoded(_)));
        assert_eq!(1, arr.null_count().unwrap());
        assert_eq!(Nullable::new(ScalarValue::Utf8("r")), arr.scalar(1).unwrap());
    }

    #[test]
    fn dictionary_null_count_includes_null_values() {
        let words = Utf8Array::from_nullable_iter([Some("a"), None]).unwrap();
        let dict = DictionaryArray::<u32>::try_new(
            PrimitiveArray::from_iter([0, 1, 1]),
            Arc::new(words.into()),
        )
        .unwrap();
        let arr = Array::try_from_data(dict.into_data()).unwrap();

        assert!(matches!(arr, Array::Dictionary(AnyDictionaryArray::UInt32(_))));
        assert_eq!(0, arr.data().null_count());
        assert_eq!(2, arr.null_count().unwrap());
        assert!(!arr.is_valid(2).unwrap());
    }

    #[test]
    fn round_trip_through_data() {
        let arr = Array::Boolean(BooleanArray::from_iter([true, false]));
        let data: ArrayData = arr.clone().into();
        assert_eq!(arr, Array::try_from(data).unwrap());
    }
}
