use quiver_error::{QuiverError, Result};

use super::{Layout, LayoutIter};
use crate::array_data::ArrayData;
use crate::bitmap::BitmapView;
use crate::datatype::DataType;
use crate::traits::check_data_type;

/// Layout over bit packed boolean values.
#[derive(Debug, Clone)]
pub struct BooleanLayout<'a> {
    data: &'a ArrayData,
    /// Values covering the full, unsliced data.
    values: BitmapView<'a>,
}

impl<'a> BooleanLayout<'a> {
    /// Create the layout for data already validated as boolean.
    pub(crate) fn new_unchecked(data: &'a ArrayData) -> Self {
        let bits = data.offset() + data.len();
        let values = BitmapView::from_storage(data.buffers()[0].view(), bits);
        BooleanLayout { data, values }
    }

    pub fn values(&self) -> &BitmapView<'a> {
        &self.values
    }

    /// Number of true values, ignoring validity.
    pub fn true_count(&self) -> usize {
        let offset = self.data.offset();
        self.values
            .iter_range(offset..offset + self.data.len())
            .filter(|b| *b)
            .count()
    }
}

impl<'a> Layout<'a> for BooleanLayout<'a> {
    type Value = bool;
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        check_data_type(&DataType::Boolean, data.datatype())?;
        let bytes = data.buffer(0)?;
        let bits = data.offset() + data.len();
        if bytes.len() * 8 < bits {
            return Err(QuiverError::new("Boolean values buffer too short"));
        }
        Ok(Self::new_unchecked(data))
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn value(&self, idx: usize) -> bool {
        assert!(idx < self.len());
        self.values.test(self.data.offset() + idx)
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(self.clone())
    }
}
