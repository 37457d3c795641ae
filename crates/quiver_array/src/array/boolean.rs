use quiver_error::{QuiverError, Result};

use crate::array_data::ArrayData;
use crate::bitmap::Bitmap;
use crate::datatype::DataType;
use crate::layout::{BooleanLayout, Layout};
use crate::nullable::Nullable;

/// An owned array of bit packed booleans.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanArray {
    data: ArrayData,
}

impl BooleanArray {
    /// Panics if the validity length doesn't match the values.
    pub fn new(values: Bitmap, validity: Option<Bitmap>) -> Self {
        let len = values.len();
        if let Some(validity) = &validity {
            assert_eq!(len, validity.len(), "validity length must match values");
        }
        let data = ArrayData::new_unchecked(
            DataType::Boolean,
            len,
            validity,
            vec![values.into_storage()],
            Vec::new(),
            None,
        );
        BooleanArray { data }
    }

    pub fn from_nullable_iter(iter: impl IntoIterator<Item = Option<bool>>) -> Self {
        let mut validity = Bitmap::default();
        let values = Bitmap::from_bool_iter(iter.into_iter().map(|v| {
            validity.push(v.is_some());
            v.unwrap_or(false)
        }));
        Self::new(values, Some(validity))
    }

    /// Take ownership of boolean data, copying it if it's sliced.
    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        if data.is_dictionary() {
            return Err(QuiverError::new("Cannot read dictionary data as a boolean array"));
        }
        let layout = BooleanLayout::try_new(&data)?;
        if data.offset() == 0 {
            return Ok(BooleanArray { data });
        }

        let window = data.offset()..data.offset() + data.len();
        let values = layout.values().iter_range(window.clone()).collect();
        let validity = data
            .validity()
            .map(|v| v.iter_range(window).collect::<Bitmap>());
        let mut arr = Self::new(values, validity);
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

    pub fn layout(&self) -> BooleanLayout<'_> {
        BooleanLayout::new_unchecked(&self.data)
    }

    pub fn get(&self, idx: usize) -> Nullable<bool> {
        self.layout().get(idx)
    }

    pub fn push(&mut self, value: Option<bool>) {
        let len = self.len();
        let (validity, buffers) = self.data.parts_mut();
        validity.resize(len, true);
        validity.push(value.is_some());

        // Values are stored as a bitmap over the raw bytes.
        let mut values = Bitmap::from_blocks(std::mem::take(&mut buffers[0]), len);
        values.push(value.unwrap_or(false));
        buffers[0] = values.into_storage();

        self.data.set_len(len + 1);
    }
}

impl FromIterator<bool> for BooleanArray {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self::new(Bitmap::from_bool_iter(iter), None)
    }
}

impl From<BooleanArray> for ArrayData {
    fn from(arr: BooleanArray) -> Self {
        arr.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_values() {
        let mut arr = BooleanArray::from_iter([true, false]);
        for _ in 0..10 {
            arr.push(Some(true));
        }
        arr.push(None);

        assert_eq!(13, arr.len());
        assert_eq!(11, arr.layout().true_count());
        assert_eq!(1, arr.data().null_count());
        assert!(arr.get(12).is_null());
        arr.data().validate().unwrap();
    }

    #[test]
    fn compact_sliced() {
        let arr = BooleanArray::from_nullable_iter([Some(true), None, Some(false), Some(true)]);
        let arr = BooleanArray::try_from_data(arr.data().slice(1, 3)).unwrap();

        assert_eq!(0, arr.data().offset());
        let got: Vec<_> = arr.layout().iter().map(|v| v.into_option()).collect();
        assert_eq!(vec![None, Some(false), Some(true)], got);
    }
}
