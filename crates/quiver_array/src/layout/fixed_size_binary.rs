use quiver_error::{QuiverError, Result};

use super::{Layout, LayoutIter};
use crate::array_data::ArrayData;
use crate::datatype::DataType;

/// Layout where every value is a byte string of the same width.
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeBinaryLayout<'a> {
    data: &'a ArrayData,
    width: usize,
    /// Bytes with the data's offset applied.
    values: &'a [u8],
}

impl<'a> FixedSizeBinaryLayout<'a> {
    /// Create the layout for data already validated as fixed size binary.
    pub(crate) fn new_unchecked(data: &'a ArrayData) -> Self {
        let width = data.datatype().byte_width().unwrap_or(0);
        let start = data.offset() * width;
        let end = (data.offset() + data.len()) * width;
        let values = &data.buffers()[0][start..end];
        FixedSizeBinaryLayout {
            data,
            width,
            values,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl<'a> Layout<'a> for FixedSizeBinaryLayout<'a> {
    type Value = &'a [u8];
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        let width = match data.datatype() {
            DataType::FixedSizeBinary(width) => *width,
            other => {
                return Err(QuiverError::new("Expected fixed size binary data")
                    .with_field("datatype", other))
            }
        };
        let start = data.offset() * width;
        let end = (data.offset() + data.len()) * width;
        let values = data
            .buffer(0)?
            .get(start..end)
            .ok_or_else(|| QuiverError::new("Fixed size binary buffer too short"))?;
        Ok(FixedSizeBinaryLayout {
            data,
            width,
            values,
        })
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn value(&self, idx: usize) -> &'a [u8] {
        assert!(idx < self.len());
        &self.values[idx * self.width..(idx + 1) * self.width]
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::FixedSizeBinaryArray;

    #[test]
    fn read_values() {
        let arr = FixedSizeBinaryArray::try_from_nullable_iter(
            3,
            [Some(b"abc".as_slice()), None, Some(b"xyz".as_slice())],
        )
        .unwrap();
        let layout = arr.layout();
        assert_eq!(3, layout.width());
        assert_eq!(b"abc", layout.value(0));
        assert!(layout.get(1).is_null());
        assert_eq!(Some(b"xyz".as_slice()), layout.get(2).into_option());
    }

    #[test]
    fn zero_width() {
        let arr = FixedSizeBinaryArray::try_from_nullable_iter(0, [Some(b"".as_slice()), None])
            .unwrap();
        let layout = arr.layout();
        assert_eq!(2, layout.len());
        assert!(layout.value(0).is_empty());
    }
}
