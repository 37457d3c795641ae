use std::fmt;

use half::f16;

use crate::datatype::TimeUnit;
use crate::layout::{ArrayView, ListValue, StructValue};

/// A list value read through a dynamic view.
pub type ListScalar<'a> = ListValue<'a, ArrayView<'a>>;

/// A single value borrowed from an array.
#[derive(Debug, Clone)]
pub enum ScalarValue<'a> {
    /// Value of a null array.
    Null,

    Boolean(bool),

    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),

    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),

    Float16(f16),
    Float32(f32),
    Float64(f64),

    /// Timestamp relative to the unix epoch.
    Timestamp(TimeUnit, i64),

    /// Utf-8 string, from either offset width.
    Utf8(&'a str),

    /// Binary, from either offset width.
    Binary(&'a [u8]),

    FixedSizeBinary(&'a [u8]),

    List(ListScalar<'a>),

    Struct(StructValue<'a>),
}

impl<'a> ScalarValue<'a> {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as an i64 if it's an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        Some(match self {
            Self::Int8(v) => *v as i64,
            Self::Int16(v) => *v as i64,
            Self::Int32(v) => *v as i64,
            Self::Int64(v) => *v,
            Self::UInt8(v) => *v as i64,
            Self::UInt16(v) => *v as i64,
            Self::UInt32(v) => *v as i64,
            Self::UInt64(v) => i64::try_from(*v).ok()?,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Self::Utf8(v) => Some(v),
            _ => None,
        }
    }
}

impl<'a> PartialEq for ScalarValue<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Int8(a), Self::Int8(b)) => a == b,
            (Self::Int16(a), Self::Int16(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::UInt8(a), Self::UInt8(b)) => a == b,
            (Self::UInt16(a), Self::UInt16(b)) => a == b,
            (Self::UInt32(a), Self::UInt32(b)) => a == b,
            (Self::UInt64(a), Self::UInt64(b)) => a == b,
            (Self::Float16(a), Self::Float16(b)) => a == b,
            (Self::Float32(a), Self::Float32(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Timestamp(u1, a), Self::Timestamp(u2, b)) => u1 == u2 && a == b,
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::FixedSizeBinary(a), Self::FixedSizeBinary(b)) => a == b,
            (Self::List(a), Self::List(b)) => a.len() == b.len() && a.iter().eq(b.iter()),
            (Self::Struct(a), Self::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> fmt::Display for ScalarValue<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float16(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Timestamp(unit, v) => write!(f, "{v}{unit}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::Binary(v) | Self::FixedSizeBinary(v) => {
                write!(f, "\\x")?;
                for b in v.iter() {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::List(list) => {
                write!(f, "[")?;
                for (idx, v) in list.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Self::Struct(row) => {
                write!(f, "{{")?;
                for (idx, v) in row.fields().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{ListArray, StructArray};
    use crate::layout::Layout;

    #[test]
    fn display_primitives() {
        assert_eq!("null", ScalarValue::Null.to_string());
        assert_eq!("-4", ScalarValue::Int8(-4).to_string());
        assert_eq!("1.5", ScalarValue::Float64(1.5).to_string());
        assert_eq!("\\x00ff", ScalarValue::Binary(&[0x00, 0xFF]).to_string());
        assert_eq!("10ms", ScalarValue::Timestamp(TimeUnit::Millisecond, 10).to_string());
    }

    #[test]
    fn display_nested() {
        let list = ListArray::<i32>::from_rows::<i16>([Some(vec![Some(&1), None, Some(&3)])])
            .unwrap();
        let strct = StructArray::try_new(vec![list.into()], None).unwrap();
        let view = ArrayView::try_new(strct.data()).unwrap();
        assert_eq!("{[1, null, 3]}", view.value(0).to_string());
    }

    #[test]
    fn integer_conversion() {
        assert_eq!(Some(7), ScalarValue::UInt16(7).as_i64());
        assert_eq!(None, ScalarValue::UInt64(u64::MAX).as_i64());
        assert_eq!(None, ScalarValue::Utf8("7").as_i64());
        assert_eq!(Some("7"), ScalarValue::Utf8("7").as_str());
    }

    #[test]
    fn equality_across_variants() {
        assert_ne!(ScalarValue::Int32(1), ScalarValue::Int64(1));
        assert_eq!(ScalarValue::Utf8("a"), ScalarValue::Utf8("a"));
    }
}
