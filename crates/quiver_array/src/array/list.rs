use std::marker::PhantomData;
use std::sync::Arc;

use quiver_error::{QuiverError, Result};

use super::PrimitiveArray;
use crate::array_data::ArrayData;
use crate::bitmap::Bitmap;
use crate::buffer::{Buffer, BufferAdaptor};
use crate::datatype::DataType;
use crate::layout::{FixedSizeListLayout, Layout, ListLayout, PrimitiveLayout};
use crate::offsets::{offset_from_usize, offsets_from_sizes, OffsetIndex};
use crate::traits::{check_data_type, ArrowPrimitive, ArrowValue};

pub type LargeListArray = ListArray<i64>;

/// An owned array of lists, with all list elements stored in one child.
#[derive(Debug, Clone, PartialEq)]
pub struct ListArray<O> {
    data: ArrayData,
    _offsets: PhantomData<O>,
}

impl<O: OffsetIndex> ListArray<O> {
    /// Create a list array from a child and `len + 1` offsets into it.
    pub fn try_new(child: ArrayData, offsets: Buffer<O>, validity: Option<Bitmap>) -> Result<Self> {
        let len = offsets
            .len()
            .checked_sub(1)
            .ok_or_else(|| QuiverError::new("List offsets must not be empty"))?;
        let data = ArrayData::try_new(
            O::LIST_TYPE,
            len,
            validity,
            vec![offsets.into_byte_buffer()],
            vec![Arc::new(child)],
        )?;
        Ok(ListArray {
            data,
            _offsets: PhantomData,
        })
    }

    /// Create a list array where list `i` holds the next `sizes[i]` child
    /// values.
    pub fn try_from_sizes(
        child: ArrayData,
        sizes: impl IntoIterator<Item = usize>,
        validity: Option<Bitmap>,
    ) -> Result<Self> {
        Self::try_new(child, offsets_from_sizes(sizes)?, validity)
    }

    /// Build a list array from rows of nullable values.
    ///
    /// The child uses the default array for `V`. Null rows are empty.
    pub fn from_rows<'b, V: ArrowValue + ?Sized + 'b>(
        rows: impl IntoIterator<Item = Option<Vec<Option<&'b V>>>>,
    ) -> Result<Self> {
        let mut sizes = Vec::new();
        let mut validity = Bitmap::default();
        let mut flattened = Vec::new();

        for row in rows {
            validity.push(row.is_some());
            let row = row.unwrap_or_default();
            sizes.push(row.len());
            flattened.extend(row);
        }

        let child = V::array_from_iter(flattened)?.into();
        Self::try_from_sizes(child, sizes, Some(validity))
    }

    /// Take ownership of list data.
    ///
    /// Sliced data gets rebased offsets and a child sliced to the values
    /// actually referenced.
    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        if data.is_dictionary() {
            return Err(QuiverError::new("Cannot read dictionary data as a list array"));
        }
        check_data_type(&O::LIST_TYPE, data.datatype())?;
        let offsets = data.buffer_as::<O>(0)?;
        let compact = data.offset() == 0
            && offsets.len() == data.len() + 1
            && data.validity().map_or(true, |v| v.len() == data.len());
        if compact {
            data.validate()?;
            return Ok(ListArray {
                data,
                _offsets: PhantomData,
            });
        }
        data.validate()?;

        let window = &offsets[data.offset()..=data.offset() + data.len()];
        let start = window[0].as_usize();
        let end = window[data.len()].as_usize();
        let rebased = window
            .iter()
            .map(|offset| offset_from_usize::<O>(offset.as_usize() - start))
            .collect::<Result<Buffer<O>>>()?;
        let child = data.child(0)?.slice(start, end - start);
        let validity = data
            .validity()
            .map(|v| v.iter_range(data.offset()..data.offset() + data.len()).collect());

        let mut arr = Self::try_new(child, rebased, validity)?;
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

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    pub fn offsets(&self) -> &[O] {
        self.data.buffers()[0].cast()
    }

    /// Child holding the values of every list.
    pub fn values(&self) -> &ArrayData {
        &self.data.children()[0]
    }

    /// Read the lists with `L` as the child layout.
    pub fn layout<'a, L: Layout<'a> + 'a>(&'a self) -> Result<ListLayout<'a, O, L>> {
        ListLayout::try_new(&self.data)
    }

    /// Append a list of primitive values, or a null list.
    ///
    /// The child is cloned first if other arrays share it.
    pub fn push_row<T: ArrowPrimitive>(&mut self, row: Option<&[T]>) -> Result<()> {
        let len = self.len();
        let start = self.offsets()[len].as_usize();
        let values = row.unwrap_or_default();

        let child = self.data.child_mut(0)?;
        if child.is_dictionary() || !T::accepts(child.datatype()) {
            return Err(QuiverError::new("Row values don't match the list child")
                .with_field("child", child.datatype())
                .with_field("values", T::DATA_TYPE));
        }
        let end = offset_from_usize::<O>(start + values.len())?;
        // Every check the conversion below makes happens here first, so the
        // child is never left swapped out on error.
        PrimitiveLayout::<T>::try_new(child)?;

        let mut child_values = PrimitiveArray::<T>::try_from_data(std::mem::replace(
            child,
            ArrayData::new_null(0),
        ))?;
        // Drop trailing child values no list points at.
        child_values.resize(start, None);
        child_values.extend_from_slice(values);
        *child = child_values.into_data();

        let (validity, buffers) = self.data.parts_mut();
        validity.resize(len, true);
        validity.push(row.is_some());
        BufferAdaptor::<O, u8>::new(&mut buffers[0]).push(end);
        self.data.set_len(len + 1);
        Ok(())
    }
}

impl<O> From<ListArray<O>> for ArrayData {
    fn from(arr: ListArray<O>) -> Self {
        arr.data
    }
}

/// An owned array of lists that all hold the same number of values.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSizeListArray {
    data: ArrayData,
}

impl FixedSizeListArray {
    /// Create lists of `size` values each over `child`.
    ///
    /// The child length must be a multiple of `size`. With a size of zero the
    /// length comes from the validity bitmap, or is zero.
    pub fn try_new(child: ArrayData, size: usize, validity: Option<Bitmap>) -> Result<Self> {
        let len = match (size, &validity) {
            (0, Some(validity)) => validity.len(),
            (0, None) => 0,
            (size, _) => child.len() / size,
        };
        if child.len() != len * size {
            return Err(QuiverError::new("Child length isn't a multiple of the list size")
                .with_field("child_len", child.len())
                .with_field("size", size));
        }
        if let Some(validity) = &validity {
            if validity.len() != len {
                return Err(QuiverError::new("Validity length doesn't match list length")
                    .with_field("expected", len)
                    .with_field("got", validity.len()));
            }
        }
        let data = ArrayData::try_new(
            DataType::FixedSizeList(size),
            len,
            validity,
            Vec::new(),
            vec![Arc::new(child)],
        )?;
        Ok(FixedSizeListArray { data })
    }

    /// Build from rows that each hold `size` nullable values.
    ///
    /// Null rows are stored as `size` null values.
    pub fn from_rows<'b, V: ArrowValue + ?Sized + 'b>(
        size: usize,
        rows: impl IntoIterator<Item = Option<Vec<Option<&'b V>>>>,
    ) -> Result<Self> {
        let mut validity = Bitmap::default();
        let mut flattened = Vec::new();
        for (idx, row) in rows.into_iter().enumerate() {
            validity.push(row.is_some());
            match row {
                Some(row) if row.len() != size => {
                    return Err(QuiverError::new("Row doesn't match the list size")
                        .with_field("row", idx)
                        .with_field("len", row.len())
                        .with_field("size", size))
                }
                Some(row) => flattened.extend(row),
                None => flattened.extend(std::iter::repeat(None).take(size)),
            }
        }

        let child = V::array_from_iter(flattened)?.into();
        Self::try_new(child, size, Some(validity))
    }

    /// Take ownership of fixed size list data.
    ///
    /// Sliced data gets a child sliced to the lists in the window.
    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        if data.is_dictionary() {
            return Err(QuiverError::new("Cannot read dictionary data as a list array"));
        }
        let size = match data.datatype() {
            DataType::FixedSizeList(size) => *size,
            other => {
                return Err(QuiverError::new("Expected fixed size list data")
                    .with_field("datatype", other))
            }
        };
        data.validate()?;
        let compact = data.offset() == 0
            && data.child(0)?.len() == data.len() * size
            && data.validity().map_or(true, |v| v.len() == data.len());
        if compact {
            return Ok(FixedSizeListArray { data });
        }

        let window = data.offset()..data.offset() + data.len();
        let child = data.child(0)?.slice(window.start * size, data.len() * size);
        let validity = match data.validity() {
            Some(v) => Some(v.iter_range(window).collect()),
            // Keeps the length of zero sized lists.
            None if size == 0 => Some(Bitmap::new_with_all_true(data.len())),
            None => None,
        };
        let mut arr = Self::try_new(child, size, validity)?;
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

    pub fn null_count(&self) -> usize {
        self.data.null_count()
    }

    /// Number of values in every list.
    pub fn list_size(&self) -> usize {
        match self.data.datatype() {
            DataType::FixedSizeList(size) => *size,
            _ => 0,
        }
    }

    /// Child holding the values of every list.
    pub fn values(&self) -> &ArrayData {
        &self.data.children()[0]
    }

    /// Read the lists with `L` as the child layout.
    pub fn layout<'a, L: Layout<'a> + 'a>(&'a self) -> Result<FixedSizeListLayout<'a, L>> {
        FixedSizeListLayout::try_new(&self.data)
    }
}

impl From<FixedSizeListArray> for ArrayData {
    fn from(arr: FixedSizeListArray) -> Self {
        arr.data
    }
}
