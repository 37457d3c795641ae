use std::fmt;
use std::marker::PhantomData;

use quiver_error::{QuiverError, Result};

use super::{Layout, LayoutIter};
use crate::array_data::ArrayData;
use crate::offsets::OffsetIndex;
use crate::traits::{check_data_type, BinaryValue};

/// Layout over variable length values stored in one contiguous data buffer.
///
/// Value `i` spans `data[offsets[i]..offsets[i + 1]]`.
pub struct VarBinaryLayout<'a, O, K: ?Sized> {
    data: &'a ArrayData,
    /// Offsets with the data's offset applied. One longer than the layout.
    offsets: &'a [O],
    values: &'a [u8],
    _kind: PhantomData<&'a K>,
}

pub type Utf8Layout<'a> = VarBinaryLayout<'a, i32, str>;
pub type LargeUtf8Layout<'a> = VarBinaryLayout<'a, i64, str>;
pub type BinaryLayout<'a> = VarBinaryLayout<'a, i32, [u8]>;
pub type LargeBinaryLayout<'a> = VarBinaryLayout<'a, i64, [u8]>;

impl<'a, O: OffsetIndex, K: BinaryValue + ?Sized> VarBinaryLayout<'a, O, K> {
    /// Create the layout for data already validated to hold `K` values.
    pub(crate) fn new_unchecked(data: &'a ArrayData) -> Self {
        let offsets = &data.buffers()[0].cast::<O>()[data.offset()..=data.offset() + data.len()];
        VarBinaryLayout {
            data,
            offsets,
            values: data.buffers()[1].as_slice(),
            _kind: PhantomData,
        }
    }

    pub fn offsets(&self) -> &'a [O] {
        self.offsets
    }

    /// The full data buffer.
    pub fn values(&self) -> &'a [u8] {
        self.values
    }

    /// Byte length of the value at `idx`.
    pub fn value_len(&self, idx: usize) -> usize {
        self.offsets[idx + 1].as_usize() - self.offsets[idx].as_usize()
    }
}

impl<'a, O: OffsetIndex, K: BinaryValue + ?Sized> Layout<'a> for VarBinaryLayout<'a, O, K> {
    type Value = &'a K;
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        check_data_type(&K::data_type_for(O::LARGE), data.datatype())?;
        let offsets: &[O] = data.buffer_as(0)?;
        let offsets = offsets
            .get(data.offset()..=data.offset() + data.len())
            .ok_or_else(|| QuiverError::new("Offsets buffer too short"))?;
        let values = data.buffer(1)?.as_slice();
        Ok(VarBinaryLayout {
            data,
            offsets,
            values,
            _kind: PhantomData,
        })
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn value(&self, idx: usize) -> &'a K {
        let start = self.offsets[idx].as_usize();
        let end = self.offsets[idx + 1].as_usize();
        // SAFETY: Array data is validated on construction, including the
        // encoding of every value.
        unsafe { K::from_bytes_unchecked(&self.values[start..end]) }
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(self.clone())
    }
}

impl<'a, O, K: ?Sized> Clone for VarBinaryLayout<'a, O, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, O, K: ?Sized> Copy for VarBinaryLayout<'a, O, K> {}

impl<'a, O: fmt::Debug, K: ?Sized> fmt::Debug for VarBinaryLayout<'a, O, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarBinaryLayout")
            .field("datatype", self.data.datatype())
            .field("offsets", &self.offsets)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{BinaryArray, LargeUtf8Array, Utf8Array};

    #[test]
    fn read_strings() {
        let arr = Utf8Array::from_nullable_iter([Some("hello"), None, Some(""), Some("world")])
            .unwrap();
        let layout = arr.layout();

        assert_eq!(4, layout.len());
        assert_eq!("hello", layout.value(0));
        assert!(layout.get(1).is_null());
        assert_eq!(Some(""), layout.get(2).into_option());
        assert_eq!(5, layout.value_len(3));
        assert_eq!(&[0, 5, 5, 5, 10], layout.offsets());
    }

    #[test]
    fn wrong_offset_width() {
        let arr = Utf8Array::from_values(["a"]).unwrap();
        LargeUtf8Layout::try_new(arr.data()).unwrap_err();
        BinaryLayout::try_new(arr.data()).unwrap_err();
    }

    #[test]
    fn large_and_binary() {
        let arr = LargeUtf8Array::from_values(["ab", "c"]).unwrap();
        assert_eq!(Some("c"), arr.layout().get(1).into_option());

        let arr = BinaryArray::from_values([b"\x00\xFF".as_slice()]).unwrap();
        assert_eq!(&[0x00, 0xFF], arr.layout().value(0));
    }

    #[test]
    fn sliced() {
        let arr = Utf8Array::from_values(["a", "bb", "ccc"]).unwrap();
        let sliced = arr.data().slice(1, 2);
        let layout = Utf8Layout::try_new(&sliced).unwrap();
        let got: Vec<_> = layout.iter().map(|v| v.into_option()).collect();
        assert_eq!(vec![Some("bb"), Some("ccc")], got);
    }
}
