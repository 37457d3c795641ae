use quiver_error::{QuiverError, Result};

use crate::array_data::ArrayData;
use crate::bitmap::Bitmap;
use crate::buffer::Buffer;
use crate::datatype::DataType;
use crate::layout::{FixedSizeBinaryLayout, Layout};
use crate::nullable::Nullable;

/// An owned array of byte strings that all share one width.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSizeBinaryArray {
    data: ArrayData,
}

impl FixedSizeBinaryArray {
    /// Build an array from nullable values. Null slots are zero filled.
    ///
    /// Errors if a value doesn't have the expected width.
    pub fn try_from_nullable_iter<'b>(
        width: usize,
        values: impl IntoIterator<Item = Option<&'b [u8]>>,
    ) -> Result<Self> {
        let values = values.into_iter();
        let mut bytes = Buffer::with_capacity(values.size_hint().0 * width);
        let mut validity = Bitmap::default();

        for value in values {
            match value {
                Some(value) if value.len() != width => {
                    return Err(QuiverError::new("Unexpected value width")
                        .with_field("expected", width)
                        .with_field("got", value.len()))
                }
                Some(value) => bytes.extend_from_slice(value),
                None => bytes.resize(bytes.len() + width, 0),
            }
            validity.push(value.is_some());
        }

        let data = ArrayData::new_unchecked(
            DataType::FixedSizeBinary(width),
            validity.len(),
            Some(validity),
            vec![bytes],
            Vec::new(),
            None,
        );
        Ok(FixedSizeBinaryArray { data })
    }

    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        if data.is_dictionary() {
            return Err(QuiverError::new(
                "Cannot read dictionary data as a fixed size binary array",
            ));
        }
        let layout = FixedSizeBinaryLayout::try_new(&data)?;
        if data.offset() == 0 {
            return Ok(FixedSizeBinaryArray { data });
        }
        let mut arr =
            Self::try_from_nullable_iter(layout.width(), layout.iter().map(|v| v.into_option()))?;
        arr.data.set_field_info_from(&data);
        Ok(arr)
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

    pub fn layout(&self) -> FixedSizeBinaryLayout<'_> {
        FixedSizeBinaryLayout::new_unchecked(&self.data)
    }

    pub fn get(&self, idx: usize) -> Nullable<&[u8]> {
        self.layout().get(idx)
    }
}

impl From<FixedSizeBinaryArray> for ArrayData {
    fn from(arr: FixedSizeBinaryArray) -> Self {
        arr.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_width() {
        FixedSizeBinaryArray::try_from_nullable_iter(2, [Some(b"abc".as_slice())]).unwrap_err();
    }

    #[test]
    fn null_slots_are_zeroed() {
        let arr =
            FixedSizeBinaryArray::try_from_nullable_iter(2, [None, Some(b"hi".as_slice())]).unwrap();
        assert_eq!(&[0, 0, b'h', b'i'], arr.data().buffers()[0].as_slice());
        assert_eq!(Nullable::new(b"hi".as_slice()), arr.get(1));
    }

    #[test]
    fn compact_sliced() {
        let arr = FixedSizeBinaryArray::try_from_nullable_iter(
            1,
            [Some(b"a".as_slice()), Some(b"b"), Some(b"c")],
        )
        .unwrap();
        let arr = FixedSizeBinaryArray::try_from_data(arr.data().slice(1, 2)).unwrap();
        assert_eq!(0, arr.data().offset());
        assert_eq!(b"bc", arr.data().buffers()[0].as_slice());
    }
}
