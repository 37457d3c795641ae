//! Compile time mapping from Rust value types to array types and layouts.

use half::f16;
use quiver_error::{QuiverError, Result};

use crate::array::{BinaryArray, BooleanArray, PrimitiveArray, Utf8Array};
use crate::array_data::ArrayData;
use crate::buffer::Native;
use crate::datatype::DataType;
use crate::layout::{BooleanLayout, Layout, PrimitiveLayout, VarBinaryLayout};

/// A native type stored as a fixed width value in a single buffer.
pub trait ArrowPrimitive: Native {
    const DATA_TYPE: DataType;

    /// If arrays of the given type store values of this native type.
    fn accepts(datatype: &DataType) -> bool {
        *datatype == Self::DATA_TYPE
    }
}

macro_rules! impl_primitive {
    ($native:ty, $variant:ident) => {
        impl ArrowPrimitive for $native {
            const DATA_TYPE: DataType = DataType::$variant;
        }
    };
}

impl_primitive!(u8, UInt8);
impl_primitive!(i8, Int8);
impl_primitive!(u16, UInt16);
impl_primitive!(i16, Int16);
impl_primitive!(u32, UInt32);
impl_primitive!(i32, Int32);
impl_primitive!(u64, UInt64);
impl_primitive!(f16, Float16);
impl_primitive!(f32, Float32);
impl_primitive!(f64, Float64);

impl ArrowPrimitive for i64 {
    const DATA_TYPE: DataType = DataType::Int64;

    fn accepts(datatype: &DataType) -> bool {
        matches!(datatype, DataType::Int64 | DataType::Timestamp(_))
    }
}

/// Integer types usable as dictionary keys.
pub trait DictionaryKey: ArrowPrimitive + Ord {
    /// Convert to an index. Negative keys return None.
    fn as_index(self) -> Option<usize>;

    fn try_from_index(idx: usize) -> Option<Self>;
}

macro_rules! impl_dictionary_key {
    ($($native:ty),*) => {
        $(
            impl DictionaryKey for $native {
                fn as_index(self) -> Option<usize> {
                    usize::try_from(self).ok()
                }

                fn try_from_index(idx: usize) -> Option<Self> {
                    <$native>::try_from(idx).ok()
                }
            }
        )*
    };
}

impl_dictionary_key!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Types stored as variable length byte sequences.
pub trait BinaryValue: 'static {
    /// Data type for this value with the given offset width.
    fn data_type_for(large: bool) -> DataType;

    fn as_bytes(&self) -> &[u8];

    /// Check bytes are a valid encoding of this type.
    fn validate(bytes: &[u8]) -> Result<()>;

    /// # Safety
    ///
    /// `bytes` must have passed `validate`.
    unsafe fn from_bytes_unchecked(bytes: &[u8]) -> &Self;
}

impl BinaryValue for str {
    fn data_type_for(large: bool) -> DataType {
        if large {
            DataType::LargeUtf8
        } else {
            DataType::Utf8
        }
    }

    fn as_bytes(&self) -> &[u8] {
        str::as_bytes(self)
    }

    fn validate(bytes: &[u8]) -> Result<()> {
        std::str::from_utf8(bytes)?;
        Ok(())
    }

    unsafe fn from_bytes_unchecked(bytes: &[u8]) -> &Self {
        std::str::from_utf8_unchecked(bytes)
    }
}

impl BinaryValue for [u8] {
    fn data_type_for(large: bool) -> DataType {
        if large {
            DataType::LargeBinary
        } else {
            DataType::Binary
        }
    }

    fn as_bytes(&self) -> &[u8] {
        self
    }

    fn validate(_bytes: &[u8]) -> Result<()> {
        Ok(())
    }

    unsafe fn from_bytes_unchecked(bytes: &[u8]) -> &Self {
        bytes
    }
}

/// Maps a value type to its data type, default layout, and default array.
pub trait ArrowValue {
    const DATA_TYPE: DataType;

    /// Layout used to read arrays of this value.
    type Layout<'a>: Layout<'a>;

    /// Owned array built from values of this type.
    type Array: Into<ArrayData>;

    /// Build the default array from nullable values.
    fn array_from_iter<'b, I>(values: I) -> Result<Self::Array>
    where
        Self: 'b,
        I: IntoIterator<Item = Option<&'b Self>>;
}

macro_rules! impl_arrow_value_primitive {
    ($($native:ty),*) => {
        $(
            impl ArrowValue for $native {
                const DATA_TYPE: DataType = <$native as ArrowPrimitive>::DATA_TYPE;
                type Layout<'a> = PrimitiveLayout<'a, $native>;
                type Array = PrimitiveArray<$native>;

                fn array_from_iter<'b, I>(values: I) -> Result<Self::Array>
                where
                    I: IntoIterator<Item = Option<&'b Self>>,
                {
                    Ok(PrimitiveArray::from_nullable_iter(values.into_iter().map(|v| v.copied())))
                }
            }
        )*
    };
}

impl_arrow_value_primitive!(u8, i8, u16, i16, u32, i32, u64, i64, f16, f32, f64);

impl ArrowValue for bool {
    const DATA_TYPE: DataType = DataType::Boolean;
    type Layout<'a> = BooleanLayout<'a>;
    type Array = BooleanArray;

    fn array_from_iter<'b, I>(values: I) -> Result<Self::Array>
    where
        I: IntoIterator<Item = Option<&'b Self>>,
    {
        Ok(BooleanArray::from_nullable_iter(
            values.into_iter().map(|v| v.copied()),
        ))
    }
}

impl ArrowValue for str {
    const DATA_TYPE: DataType = DataType::Utf8;
    type Layout<'a> = VarBinaryLayout<'a, i32, str>;
    type Array = Utf8Array;

    fn array_from_iter<'b, I>(values: I) -> Result<Self::Array>
    where
        I: IntoIterator<Item = Option<&'b Self>>,
    {
        Utf8Array::from_nullable_iter(values)
    }
}

impl ArrowValue for String {
    const DATA_TYPE: DataType = DataType::Utf8;
    type Layout<'a> = VarBinaryLayout<'a, i32, str>;
    type Array = Utf8Array;

    fn array_from_iter<'b, I>(values: I) -> Result<Self::Array>
    where
        I: IntoIterator<Item = Option<&'b Self>>,
    {
        Utf8Array::from_nullable_iter(values.into_iter().map(|v| v.map(|s| s.as_str())))
    }
}

impl ArrowValue for [u8] {
    const DATA_TYPE: DataType = DataType::Binary;
    type Layout<'a> = VarBinaryLayout<'a, i32, [u8]>;
    type Array = BinaryArray;

    fn array_from_iter<'b, I>(values: I) -> Result<Self::Array>
    where
        I: IntoIterator<Item = Option<&'b Self>>,
    {
        BinaryArray::from_nullable_iter(values)
    }
}

impl ArrowValue for Vec<u8> {
    const DATA_TYPE: DataType = DataType::Binary;
    type Layout<'a> = VarBinaryLayout<'a, i32, [u8]>;
    type Array = BinaryArray;

    fn array_from_iter<'b, I>(values: I) -> Result<Self::Array>
    where
        I: IntoIterator<Item = Option<&'b Self>>,
    {
        BinaryArray::from_nullable_iter(values.into_iter().map(|v| v.map(|b| b.as_slice())))
    }
}

/// Check that a data type matches what a value type expects.
pub(crate) fn check_data_type(expected: &DataType, got: &DataType) -> Result<()> {
    if expected != got {
        return Err(QuiverError::new("Unexpected data type")
            .with_field("expected", expected)
            .with_field("got", got));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_data_types() {
        assert_eq!(DataType::Int32, <i32 as ArrowValue>::DATA_TYPE);
        assert_eq!(DataType::Float16, <f16 as ArrowValue>::DATA_TYPE);
        assert_eq!(DataType::Utf8, <String as ArrowValue>::DATA_TYPE);
        assert_eq!(DataType::Binary, <Vec<u8> as ArrowValue>::DATA_TYPE);
        assert_eq!(DataType::Boolean, <bool as ArrowValue>::DATA_TYPE);
    }

    #[test]
    fn build_default_arrays() {
        let arr = i16::array_from_iter([Some(&1), None, Some(&3)]).unwrap();
        let layout = arr.layout();
        assert_eq!(3, layout.len());
        assert!(!layout.is_valid(1));

        let words = [String::from("a"), String::from("bc")];
        let arr = String::array_from_iter(words.iter().map(Some)).unwrap();
        assert_eq!(Some("bc"), arr.layout().get(1).into_option());
    }

    #[test]
    fn timestamps_accept_i64() {
        assert!(i64::accepts(&DataType::Timestamp(crate::datatype::TimeUnit::Second)));
        assert!(!i32::accepts(&DataType::Int64));
    }

    #[test]
    fn key_indexes() {
        assert_eq!(Some(4), 4_i8.as_index());
        assert_eq!(None, (-1_i32).as_index());
        assert_eq!(None, u8::try_from_index(256));
    }
}
