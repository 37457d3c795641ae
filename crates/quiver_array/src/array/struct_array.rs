use std::sync::Arc;

use quiver_error::{QuiverError, Result};

use crate::array_data::ArrayData;
use crate::bitmap::Bitmap;
use crate::datatype::DataType;
use crate::layout::{Layout, StructLayout};
use crate::traits::check_data_type;

/// An owned struct array. Every field is a child of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct StructArray {
    data: ArrayData,
}

impl StructArray {
    /// Create a struct array from its fields.
    ///
    /// With no fields the length comes from the validity bitmap, or is zero.
    pub fn try_new(fields: Vec<ArrayData>, validity: Option<Bitmap>) -> Result<Self> {
        let len = match (fields.first(), &validity) {
            (Some(field), _) => field.len(),
            (None, Some(validity)) => validity.len(),
            (None, None) => 0,
        };
        if let Some(field) = fields.iter().find(|field| field.len() != len) {
            return Err(QuiverError::new("Struct fields must have the same length")
                .with_field("expected", len)
                .with_field("got", field.len()));
        }
        if let Some(validity) = &validity {
            if validity.len() != len {
                return Err(QuiverError::new("Validity length doesn't match struct length")
                    .with_field("expected", len)
                    .with_field("got", validity.len()));
            }
        }

        let children = fields.into_iter().map(Arc::new).collect();
        let data = ArrayData::try_new(DataType::Struct, len, validity, Vec::new(), children)?;
        Ok(StructArray { data })
    }

    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        if data.is_dictionary() {
            return Err(QuiverError::new("Cannot read dictionary data as a struct array"));
        }
        check_data_type(&DataType::Struct, data.datatype())?;
        data.validate()?;
        if data.offset() == 0 {
            return Ok(StructArray { data });
        }

        let window = data.offset()..data.offset() + data.len();
        let fields = data
            .children()
            .iter()
            .map(|child| child.slice(window.start, data.len()))
            .collect();
        let validity = data.validity().map(|v| v.iter_range(window).collect());
        let mut arr = Self::try_new(fields, validity)?;
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

    pub fn num_fields(&self) -> usize {
        self.data.children().len()
    }

    pub fn field(&self, idx: usize) -> Option<&ArrayData> {
        self.data.children().get(idx).map(|c| c.as_ref())
    }

    pub fn layout(&self) -> Result<StructLayout<'_>> {
        StructLayout::try_new(&self.data)
    }
}

impl From<StructArray> for ArrayData {
    fn from(arr: StructArray) -> Self {
        arr.data
    }
}
