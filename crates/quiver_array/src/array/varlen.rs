use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use quiver_error::{QuiverError, Result};

use super::dictionary::unique_values_and_indices;
use crate::array_data::ArrayData;
use crate::bitmap::Bitmap;
use crate::buffer::{Buffer, BufferAdaptor};
use crate::layout::{Layout, VarBinaryLayout};
use crate::nullable::Nullable;
use crate::offsets::{offset_from_usize, offsets_from_sizes, OffsetIndex};
use crate::traits::BinaryValue;

pub type Utf8Array = VariableSizeBinaryArray<i32, str>;
pub type LargeUtf8Array = VariableSizeBinaryArray<i64, str>;
pub type BinaryArray = VariableSizeBinaryArray<i32, [u8]>;
pub type LargeBinaryArray = VariableSizeBinaryArray<i64, [u8]>;

/// An owned array of variable length strings or byte strings.
///
/// Values are concatenated in a single data buffer, delimited by an offsets
/// buffer one longer than the array.
pub struct VariableSizeBinaryArray<O, K: ?Sized> {
    data: ArrayData,
    _type: PhantomData<(O, Box<K>)>,
}

impl<O: OffsetIndex, K: BinaryValue + ?Sized> VariableSizeBinaryArray<O, K> {
    fn from_parts(offsets: Buffer<O>, values: Buffer<u8>, validity: Option<Bitmap>) -> Self {
        let len = offsets.len() - 1;
        let data = ArrayData::new_unchecked(
            K::data_type_for(O::LARGE),
            len,
            validity,
            vec![offsets.into_byte_buffer(), values],
            Vec::new(),
            None,
        );
        VariableSizeBinaryArray {
            data,
            _type: PhantomData,
        }
    }

    /// Build an array from non-null values.
    ///
    /// Offsets are computed up front from the value sizes, then every value
    /// is copied once into a data buffer of the final size.
    pub fn from_values<I>(values: I) -> Result<Self>
    where
        I: IntoIterator,
        I::IntoIter: Clone,
        I::Item: AsRef<K>,
    {
        let values = values.into_iter();
        let offsets: Buffer<O> =
            offsets_from_sizes(values.clone().map(|v| K::as_bytes(v.as_ref()).len()))?;

        let total = offsets.as_slice().last().map_or(0, |o| o.as_usize());
        let mut data = Buffer::<u8>::zeroed(total);
        for (value, window) in values.zip(offsets.windows(2)) {
            data[window[0].as_usize()..window[1].as_usize()]
                .copy_from_slice(K::as_bytes(value.as_ref()));
        }

        Ok(Self::from_parts(offsets, data, None))
    }

    pub fn from_nullable_iter<'b, I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = Option<&'b K>>,
    {
        let values = values.into_iter();
        let mut offsets = Buffer::with_capacity(values.size_hint().0 + 1);
        offsets.push(O::ZERO);
        let mut data = Buffer::new();
        let mut validity = Bitmap::default();

        for value in values {
            if let Some(value) = value {
                data.extend_from_slice(value.as_bytes());
            }
            offsets.push(offset_from_usize(data.len())?);
            validity.push(value.is_some());
        }

        Ok(Self::from_parts(offsets, data, Some(validity)))
    }

    /// Build an array of the distinct values along with the index of each
    /// input value in that array.
    pub fn from_unique_values<'b, I>(values: I) -> Result<(Self, Vec<usize>)>
    where
        K: Hash + Eq + AsRef<K>,
        I: IntoIterator<Item = &'b K>,
    {
        let (unique, indices) = unique_values_and_indices(values);
        let arr = Self::from_values(unique.iter().copied())?;
        Ok((arr, indices))
    }

    /// Take ownership of data, copying it if it's sliced or holds bytes
    /// outside its window.
    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        if data.is_dictionary() {
            return Err(QuiverError::new("Cannot read dictionary data as a binary array"));
        }
        let layout = VarBinaryLayout::<O, K>::try_new(&data)?;
        let offsets = layout.offsets();

        let compact = data.offset() == 0
            && offsets[0] == O::ZERO
            && offsets[data.len()].as_usize() == layout.values().len()
            && data.buffers()[0].len() == (data.len() + 1) * std::mem::size_of::<O>()
            && data.validity().map_or(true, |v| v.len() == data.len());
        if compact {
            return Ok(VariableSizeBinaryArray {
                data,
                _type: PhantomData,
            });
        }

        let mut arr = Self::from_nullable_iter(layout.iter().map(|v| v.into_option()))?;
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

    pub fn layout(&self) -> VarBinaryLayout<'_, O, K> {
        VarBinaryLayout::new_unchecked(&self.data)
    }

    pub fn get(&self, idx: usize) -> Nullable<&K> {
        self.layout().get(idx)
    }

    pub fn push(&mut self, value: &K) -> Result<()> {
        self.push_bytes(value.as_bytes(), true)
    }

    pub fn push_null(&mut self) -> Result<()> {
        self.push_bytes(&[], false)
    }

    fn push_bytes(&mut self, bytes: &[u8], valid: bool) -> Result<()> {
        let len = self.len();
        let (validity, buffers) = self.data.parts_mut();
        let (offsets, values) = buffers.split_at_mut(1);

        let end = offset_from_usize::<O>(values[0].len() + bytes.len())?;
        values[0].extend_from_slice(bytes);
        BufferAdaptor::<O, u8>::new(&mut offsets[0]).push(end);
        validity.push(valid);

        self.data.set_len(len + 1);
        Ok(())
    }

    /// Replace the value at `idx`.
    ///
    /// The data buffer is spliced in place and the offsets of every later
    /// value are shifted by the change in length.
    pub fn set(&mut self, idx: usize, value: Option<&K>) -> Result<()> {
        let len = self.len();
        assert!(idx < len, "index {idx} out of bounds for array of length {len}");
        let bytes = value.map_or(&[][..], |v| v.as_bytes());

        let (validity, buffers) = self.data.parts_mut();
        let (offsets, values) = buffers.split_at_mut(1);
        let values = &mut values[0];
        let mut offsets = BufferAdaptor::<O, u8>::new(&mut offsets[0]);

        let start = offsets.as_slice()[idx].as_usize();
        let end = offsets.as_slice()[idx + 1].as_usize();
        // Check the new total fits before touching anything.
        offset_from_usize::<O>(values.len() - (end - start) + bytes.len())?;

        values.erase_range(start..end);
        values.insert_slice(start, bytes);
        shift_offsets(&mut offsets.as_mut_slice()[idx + 1..], end - start, bytes.len())?;
        validity.set(idx, value.is_some());
        Ok(())
    }

    /// Remove the value at `idx`.
    pub fn erase(&mut self, idx: usize) -> Result<()> {
        let len = self.len();
        assert!(idx < len, "index {idx} out of bounds for array of length {len}");

        let (validity, buffers) = self.data.parts_mut();
        let (offsets, values) = buffers.split_at_mut(1);
        let mut offsets = BufferAdaptor::<O, u8>::new(&mut offsets[0]);

        let start = offsets.as_slice()[idx].as_usize();
        let end = offsets.as_slice()[idx + 1].as_usize();

        values[0].erase_range(start..end);
        offsets.erase(idx + 1);
        shift_offsets(&mut offsets.as_mut_slice()[idx + 1..], end - start, 0)?;
        validity.erase(idx);

        self.data.set_len(len - 1);
        Ok(())
    }
}

/// Move offsets to account for a value changing from `removed` to `added`
/// bytes.
fn shift_offsets<O: OffsetIndex>(offsets: &mut [O], removed: usize, added: usize) -> Result<()> {
    for offset in offsets {
        *offset = offset_from_usize(offset.as_usize() - removed + added)?;
    }
    Ok(())
}

impl<O, K: ?Sized> Clone for VariableSizeBinaryArray<O, K> {
    fn clone(&self) -> Self {
        VariableSizeBinaryArray {
            data: self.data.clone(),
            _type: PhantomData,
        }
    }
}

impl<O, K: ?Sized> PartialEq for VariableSizeBinaryArray<O, K> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<O, K: ?Sized> fmt::Debug for VariableSizeBinaryArray<O, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableSizeBinaryArray")
            .field("data", &self.data)
            .finish()
    }
}

impl<O, K: ?Sized> From<VariableSizeBinaryArray<O, K>> for ArrayData {
    fn from(arr: VariableSizeBinaryArray<O, K>) -> Self {
        arr.data
    }
}
