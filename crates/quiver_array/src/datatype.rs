use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Resolution of timestamp values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl TimeUnit {
    const fn format_char(&self) -> char {
        match self {
            Self::Second => 's',
            Self::Millisecond => 'm',
            Self::Microsecond => 'u',
            Self::Nanosecond => 'n',
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Second => write!(f, "s"),
            Self::Millisecond => write!(f, "ms"),
            Self::Microsecond => write!(f, "us"),
            Self::Nanosecond => write!(f, "ns"),
        }
    }
}

/// Logical type of an array.
///
/// Child types of nested arrays are carried by the children themselves, not
/// by the type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Null,
    Boolean,
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float16,
    Float32,
    Float64,
    Utf8,
    Binary,
    FixedSizeBinary(usize),
    LargeUtf8,
    LargeBinary,
    Timestamp(TimeUnit),
    List,
    LargeList,
    /// List where every element holds the same number of child values.
    FixedSizeList(usize),
    Struct,
    DenseUnion,
    SparseUnion,
    /// Runs of repeated values stored as run ends plus one value per run.
    RunEndEncoded,
}

impl DataType {
    /// Stable numeric identifier for the type.
    pub const fn type_id(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Boolean => 1,
            Self::UInt8 => 2,
            Self::Int8 => 3,
            Self::UInt16 => 4,
            Self::Int16 => 5,
            Self::UInt32 => 6,
            Self::Int32 => 7,
            Self::UInt64 => 8,
            Self::Int64 => 9,
            Self::Float16 => 10,
            Self::Float32 => 11,
            Self::Float64 => 12,
            Self::Utf8 => 13,
            Self::Binary => 14,
            Self::FixedSizeBinary(_) => 15,
            Self::LargeUtf8 => 16,
            Self::LargeBinary => 17,
            Self::Timestamp(_) => 18,
            Self::List => 19,
            Self::LargeList => 20,
            Self::FixedSizeList(_) => 23,
            Self::Struct => 24,
            Self::DenseUnion => 26,
            Self::SparseUnion => 27,
            Self::RunEndEncoded => 28,
        }
    }

    /// Format string for this type as used by the C data interface.
    pub fn format(&self) -> Cow<'static, str> {
        let s = match self {
            Self::Null => "n",
            Self::Boolean => "b",
            Self::UInt8 => "C",
            Self::Int8 => "c",
            Self::UInt16 => "S",
            Self::Int16 => "s",
            Self::UInt32 => "I",
            Self::Int32 => "i",
            Self::UInt64 => "L",
            Self::Int64 => "l",
            Self::Float16 => "e",
            Self::Float32 => "f",
            Self::Float64 => "g",
            Self::Utf8 => "u",
            Self::Binary => "z",
            Self::LargeUtf8 => "U",
            Self::LargeBinary => "Z",
            Self::List => "+l",
            Self::LargeList => "+L",
            Self::Struct => "+s",
            Self::DenseUnion => "+ud:",
            Self::SparseUnion => "+us:",
            Self::RunEndEncoded => "+r",
            Self::FixedSizeList(size) => return Cow::Owned(format!("+w:{size}")),
            Self::FixedSizeBinary(width) => return Cow::Owned(format!("w:{width}")),
            Self::Timestamp(unit) => return Cow::Owned(format!("ts{}:", unit.format_char())),
        };
        Cow::Borrowed(s)
    }

    /// Parse a format string.
    ///
    /// Unknown or malformed formats resolve to `Null`.
    pub fn from_format(format: &str) -> Self {
        match format {
            "n" => return Self::Null,
            "b" => return Self::Boolean,
            "C" => return Self::UInt8,
            "c" => return Self::Int8,
            "S" => return Self::UInt16,
            "s" => return Self::Int16,
            "I" => return Self::UInt32,
            "i" => return Self::Int32,
            "L" => return Self::UInt64,
            "l" => return Self::Int64,
            "e" => return Self::Float16,
            "f" => return Self::Float32,
            "g" => return Self::Float64,
            "u" => return Self::Utf8,
            "z" => return Self::Binary,
            "U" => return Self::LargeUtf8,
            "Z" => return Self::LargeBinary,
            "+l" => return Self::List,
            "+L" => return Self::LargeList,
            "+s" => return Self::Struct,
            "+r" => return Self::RunEndEncoded,
            _ => (),
        }

        if let Some(size) = format.strip_prefix("+w:") {
            return match size.parse() {
                Ok(size) => Self::FixedSizeList(size),
                Err(_) => Self::Null,
            };
        }

        if let Some(width) = format.strip_prefix("w:") {
            return match width.parse() {
                Ok(width) => Self::FixedSizeBinary(width),
                Err(_) => Self::Null,
            };
        }

        if format.starts_with("+ud:") {
            return Self::DenseUnion;
        }
        if format.starts_with("+us:") {
            return Self::SparseUnion;
        }

        // Timezone after the colon is accepted and dropped.
        if let Some(rest) = format.strip_prefix("ts") {
            let mut chars = rest.chars();
            let unit = match chars.next() {
                Some('s') => TimeUnit::Second,
                Some('m') => TimeUnit::Millisecond,
                Some('u') => TimeUnit::Microsecond,
                Some('n') => TimeUnit::Nanosecond,
                _ => return Self::Null,
            };
            if chars.next() == Some(':') {
                return Self::Timestamp(unit);
            }
        }

        Self::Null
    }

    /// Width in bytes of a single value for fixed width types.
    pub const fn byte_width(&self) -> Option<usize> {
        Some(match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::UInt16 | Self::Int16 | Self::Float16 => 2,
            Self::UInt32 | Self::Int32 | Self::Float32 => 4,
            Self::UInt64 | Self::Int64 | Self::Float64 | Self::Timestamp(_) => 8,
            Self::FixedSizeBinary(width) => *width,
            _ => return None,
        })
    }

    /// If values are stored as a single buffer of native values.
    pub const fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::UInt8
                | Self::Int8
                | Self::UInt16
                | Self::Int16
                | Self::UInt32
                | Self::Int32
                | Self::UInt64
                | Self::Int64
                | Self::Float16
                | Self::Float32
                | Self::Float64
                | Self::Timestamp(_)
        )
    }

    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::UInt8
                | Self::Int8
                | Self::UInt16
                | Self::Int16
                | Self::UInt32
                | Self::Int32
                | Self::UInt64
                | Self::Int64
        )
    }

    pub const fn is_nested(&self) -> bool {
        matches!(
            self,
            Self::List
                | Self::LargeList
                | Self::FixedSizeList(_)
                | Self::Struct
                | Self::DenseUnion
                | Self::SparseUnion
                | Self::RunEndEncoded
        )
    }

    /// If arrays of this type carry a validity bitmap.
    ///
    /// Null arrays are all null. Unions and run end encoded arrays derive
    /// validity from their children.
    pub const fn has_validity(&self) -> bool {
        !matches!(
            self,
            Self::Null | Self::DenseUnion | Self::SparseUnion | Self::RunEndEncoded
        )
    }

    /// Number of buffers, excluding the validity bitmap, for this type.
    pub const fn data_buffer_count(&self) -> usize {
        match self {
            Self::Null | Self::Struct | Self::FixedSizeList(_) | Self::RunEndEncoded => 0,
            Self::Utf8 | Self::Binary | Self::LargeUtf8 | Self::LargeBinary | Self::DenseUnion => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Boolean => write!(f, "Boolean"),
            Self::UInt8 => write!(f, "UInt8"),
            Self::Int8 => write!(f, "Int8"),
            Self::UInt16 => write!(f, "UInt16"),
            Self::Int16 => write!(f, "Int16"),
            Self::UInt32 => write!(f, "UInt32"),
            Self::Int32 => write!(f, "Int32"),
            Self::UInt64 => write!(f, "UInt64"),
            Self::Int64 => write!(f, "Int64"),
            Self::Float16 => write!(f, "Float16"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
            Self::Utf8 => write!(f, "Utf8"),
            Self::Binary => write!(f, "Binary"),
            Self::FixedSizeBinary(width) => write!(f, "FixedSizeBinary({width})"),
            Self::LargeUtf8 => write!(f, "LargeUtf8"),
            Self::LargeBinary => write!(f, "LargeBinary"),
            Self::Timestamp(unit) => write!(f, "Timestamp({unit:?})"),
            Self::List => write!(f, "List"),
            Self::LargeList => write!(f, "LargeList"),
            Self::FixedSizeList(size) => write!(f, "FixedSizeList({size})"),
            Self::Struct => write!(f, "Struct"),
            Self::DenseUnion => write!(f, "DenseUnion"),
            Self::SparseUnion => write!(f, "SparseUnion"),
            Self::RunEndEncoded => write!(f, "RunEndEncoded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[DataType] = &[
        DataType::Null,
        DataType::Boolean,
        DataType::UInt8,
        DataType::Int8,
        DataType::UInt16,
        DataType::Int16,
        DataType::UInt32,
        DataType::Int32,
        DataType::UInt64,
        DataType::Int64,
        DataType::Float16,
        DataType::Float32,
        DataType::Float64,
        DataType::Utf8,
        DataType::Binary,
        DataType::FixedSizeBinary(16),
        DataType::LargeUtf8,
        DataType::LargeBinary,
        DataType::Timestamp(TimeUnit::Second),
        DataType::Timestamp(TimeUnit::Millisecond),
        DataType::Timestamp(TimeUnit::Microsecond),
        DataType::Timestamp(TimeUnit::Nanosecond),
        DataType::List,
        DataType::LargeList,
        DataType::FixedSizeList(3),
        DataType::Struct,
        DataType::DenseUnion,
        DataType::SparseUnion,
        DataType::RunEndEncoded,
    ];

    #[test]
    fn format_round_trip() {
        for datatype in ALL {
            let format = datatype.format();
            assert_eq!(*datatype, DataType::from_format(&format), "format: {format}");
        }
    }

    #[test]
    fn known_formats() {
        assert_eq!(DataType::Int32, DataType::from_format("i"));
        assert_eq!(DataType::Utf8, DataType::from_format("u"));
        assert_eq!(DataType::Boolean, DataType::from_format("b"));
        assert_eq!(
            DataType::Timestamp(TimeUnit::Microsecond),
            DataType::from_format("tsu:Europe/Paris")
        );
        assert_eq!(DataType::DenseUnion, DataType::from_format("+ud:0,1"));
        assert_eq!(DataType::FixedSizeList(4), DataType::from_format("+w:4"));
        assert_eq!(DataType::RunEndEncoded, DataType::from_format("+r"));
    }

    #[test]
    fn unknown_formats_are_null() {
        for format in ["", "x", "w:abc", "ts", "tsx:", "+m", "+w:", "d:19,10"] {
            assert_eq!(DataType::Null, DataType::from_format(format), "format: {format}");
        }
    }

    #[test]
    fn type_ids_unique() {
        let mut ids: Vec<_> = ALL
            .iter()
            .filter(|d| !matches!(d, DataType::Timestamp(u) if *u != TimeUnit::Second))
            .map(|d| d.type_id())
            .collect();
        let len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(len, ids.len());
        assert_eq!(7, DataType::Int32.type_id());
    }

    #[test]
    fn byte_widths() {
        assert_eq!(Some(4), DataType::Int32.byte_width());
        assert_eq!(Some(2), DataType::Float16.byte_width());
        assert_eq!(Some(3), DataType::FixedSizeBinary(3).byte_width());
        assert_eq!(None, DataType::Utf8.byte_width());
        assert_eq!(None, DataType::Boolean.byte_width());
    }

    #[test]
    fn serde_json() {
        let s = serde_json::to_string(&DataType::FixedSizeBinary(4)).unwrap();
        let got: DataType = serde_json::from_str(&s).unwrap();
        assert_eq!(DataType::FixedSizeBinary(4), got);
    }
}
