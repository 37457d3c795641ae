use quiver_error::Result;

use super::{Layout, LayoutIter};
use crate::array_data::ArrayData;
use crate::datatype::DataType;
use crate::traits::check_data_type;

/// Layout where every value is null.
#[derive(Debug, Clone, Copy)]
pub struct NullLayout<'a> {
    data: &'a ArrayData,
}

impl<'a> Layout<'a> for NullLayout<'a> {
    type Value = ();
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        check_data_type(&DataType::Null, data.datatype())?;
        Ok(NullLayout { data })
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn is_valid(&self, _idx: usize) -> bool {
        false
    }

    fn value(&self, idx: usize) {
        assert!(idx < self.len());
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_null() {
        let data = ArrayData::new_null(3);
        let layout = NullLayout::try_new(&data).unwrap();
        assert_eq!(3, layout.len());
        assert_eq!(3, layout.null_count());
        assert!(layout.iter().all(|v| v.is_null()));
    }
}
