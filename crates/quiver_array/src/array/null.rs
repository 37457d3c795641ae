use quiver_error::Result;

use crate::array_data::ArrayData;
use crate::layout::{Layout, NullLayout};

/// An array where every value is null. Holds no buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct NullArray {
    data: ArrayData,
}

impl NullArray {
    pub fn new(len: usize) -> Self {
        NullArray {
            data: ArrayData::new_null(len),
        }
    }

    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        let len = NullLayout::try_new(&data)?.len();
        let mut arr = Self::new(len);
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

    pub fn push(&mut self) {
        self.data.set_len(self.len() + 1)
    }
}

impl From<NullArray> for ArrayData {
    fn from(arr: NullArray) -> Self {
        arr.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow() {
        let mut arr = NullArray::new(2);
        arr.push();
        assert_eq!(3, arr.len());
        assert_eq!(3, arr.data().null_count());
    }
}
