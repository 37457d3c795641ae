use std::marker::PhantomData;
use std::mem::size_of;

use half::f16;
use quiver_error::{QuiverError, Result};

use crate::array_data::ArrayData;
use crate::bitmap::Bitmap;
use crate::buffer::{Buffer, BufferAdaptor};
use crate::datatype::DataType;
use crate::layout::{Layout, PrimitiveLayout};
use crate::nullable::{Nullable, NullableMut};
use crate::traits::ArrowPrimitive;

pub type Int8Array = PrimitiveArray<i8>;
pub type Int16Array = PrimitiveArray<i16>;
pub type Int32Array = PrimitiveArray<i32>;
pub type Int64Array = PrimitiveArray<i64>;
pub type UInt8Array = PrimitiveArray<u8>;
pub type UInt16Array = PrimitiveArray<u16>;
pub type UInt32Array = PrimitiveArray<u32>;
pub type UInt64Array = PrimitiveArray<u64>;
pub type Float16Array = PrimitiveArray<f16>;
pub type Float32Array = PrimitiveArray<f32>;
pub type Float64Array = PrimitiveArray<f64>;

/// An owned, growable array of fixed width values.
///
/// Mutations edit the byte buffer in place through a [`BufferAdaptor`] and
/// keep the validity bitmap the same length as the values.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveArray<T> {
    data: ArrayData,
    _type: PhantomData<T>,
}

impl<T: ArrowPrimitive> PrimitiveArray<T> {
    /// Create an array from values and an optional validity bitmap.
    ///
    /// Panics if the bitmap length doesn't match the number of values.
    pub fn new(values: Buffer<T>, validity: Option<Bitmap>) -> Self {
        let len = values.len();
        if let Some(validity) = &validity {
            assert_eq!(len, validity.len(), "validity length must match values");
        }
        let data = ArrayData::new_unchecked(
            T::DATA_TYPE,
            len,
            validity,
            vec![values.into_byte_buffer()],
            Vec::new(),
            None,
        );
        PrimitiveArray {
            data,
            _type: PhantomData,
        }
    }

    pub fn from_nullable_iter(iter: impl IntoIterator<Item = Option<T>>) -> Self {
        let iter = iter.into_iter();
        let mut values = Buffer::with_capacity(iter.size_hint().0);
        let validity = Bitmap::from_bool_iter(iter.map(|v| {
            values.push(v.unwrap_or_default());
            v.is_some()
        }));
        Self::new(values, Some(validity))
    }

    /// Take ownership of array data holding `T` values.
    ///
    /// Sliced data is copied so the array owns exactly its values.
    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        if data.is_dictionary() {
            return Err(QuiverError::new("Cannot read dictionary data as a primitive array"));
        }
        let layout = PrimitiveLayout::<T>::try_new(&data)?;

        let compact = data.offset() == 0
            && data.buffers()[0].len() == data.len() * size_of::<T>()
            && data.validity().map_or(true, |v| v.len() == data.len());
        if compact {
            return Ok(PrimitiveArray {
                data,
                _type: PhantomData,
            });
        }

        let window = data.offset()..data.offset() + data.len();
        let validity = data
            .validity()
            .map(|v| v.iter_range(window).collect::<Bitmap>());
        let mut arr = Self::new(Buffer::from_slice(layout.values()), validity);
        arr.data.set_datatype(*data.datatype());
        arr.data.set_field_info_from(&data);
        Ok(arr)
    }

    /// Change the logical type, keeping the values.
    ///
    /// Errors if `T` can't be stored with the new type.
    pub fn with_data_type(mut self, datatype: DataType) -> Result<Self> {
        if !T::accepts(&datatype) {
            return Err(QuiverError::new("Data type not supported for values")
                .with_field("datatype", datatype)
                .with_field("native", T::DATA_TYPE));
        }
        self.data.set_datatype(datatype);
        Ok(self)
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

    pub fn layout(&self) -> PrimitiveLayout<'_, T> {
        PrimitiveLayout::new_unchecked(&self.data)
    }

    /// Values, ignoring validity.
    pub fn values(&self) -> &[T] {
        self.data.buffers()[0].cast()
    }

    pub fn get(&self, idx: usize) -> Nullable<T> {
        self.layout().get(idx)
    }

    /// Get a mutable reference to the value and validity bit at `idx`.
    pub fn get_mut(&mut self, idx: usize) -> NullableMut<'_, T, Buffer<u8>> {
        assert!(
            idx < self.len(),
            "index {idx} out of bounds for array of length {}",
            self.len()
        );
        let (validity, buffers) = self.data.parts_mut();
        let value = &mut buffers[0].cast_mut::<T>()[idx];
        NullableMut::new(value, validity.get_mut(idx))
    }

    pub fn set(&mut self, idx: usize, value: Option<T>) {
        self.get_mut(idx).assign(value.into())
    }

    pub fn push(&mut self, value: T) {
        self.insert(self.len(), Some(value))
    }

    pub fn push_null(&mut self) {
        self.insert(self.len(), None)
    }

    /// Append valid values.
    pub fn extend_from_slice(&mut self, values: &[T]) {
        let len = self.len();
        let (validity, buffers) = self.data.parts_mut();
        BufferAdaptor::<T, u8>::new(&mut buffers[0]).extend_from_slice(values);
        validity.resize(len + values.len(), true);
        self.data.set_len(len + values.len());
    }

    /// Insert a value at `idx`, shifting later values back.
    pub fn insert(&mut self, idx: usize, value: Option<T>) {
        let len = self.len();
        assert!(idx <= len, "insert index {idx} out of bounds for length {len}");
        let (validity, buffers) = self.data.parts_mut();
        BufferAdaptor::<T, u8>::new(&mut buffers[0]).insert(idx, value.unwrap_or_default());
        validity.insert(idx, value.is_some());
        self.data.set_len(len + 1);
    }

    /// Remove the value at `idx`, shifting later values forward.
    pub fn erase(&mut self, idx: usize) -> Nullable<T> {
        let len = self.len();
        assert!(idx < len, "erase index {idx} out of bounds for length {len}");
        let (validity, buffers) = self.data.parts_mut();
        let value = BufferAdaptor::<T, u8>::new(&mut buffers[0]).erase(idx);
        let valid = validity.test(idx);
        validity.erase(idx);
        self.data.set_len(len - 1);
        Nullable::with_validity(value, valid)
    }

    pub fn pop(&mut self) -> Option<Nullable<T>> {
        match self.len() {
            0 => None,
            len => Some(self.erase(len - 1)),
        }
    }

    /// Resize to `new_len`, filling new slots with `value`.
    pub fn resize(&mut self, new_len: usize, value: Option<T>) {
        let (validity, buffers) = self.data.parts_mut();
        BufferAdaptor::<T, u8>::new(&mut buffers[0]).resize(new_len, value.unwrap_or_default());
        validity.resize(new_len, value.is_some());
        self.data.set_len(new_len);
    }
}

impl<T: ArrowPrimitive> FromIterator<T> for PrimitiveArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(Buffer::from_iter(iter), None)
    }
}

impl<T> From<PrimitiveArray<T>> for ArrayData {
    fn from(arr: PrimitiveArray<T>) -> Self {
        arr.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::TimeUnit;

    #[test]
    fn push_keeps_validity_in_sync() {
        let mut arr = PrimitiveArray::<i64>::from_iter([1, 2]);
        assert!(arr.data().validity().is_none());

        arr.push(3);
        arr.push_null();
        arr.extend_from_slice(&[5, 6]);

        assert_eq!(6, arr.len());
        assert_eq!(6, arr.data().validity().unwrap().len());
        assert_eq!(48, arr.data().buffers()[0].len());
        assert_eq!(1, arr.null_count());
        assert_eq!(Nullable::new(3_i64), arr.get(2));
        assert!(arr.get(3).is_null());
        assert_eq!(&[1, 2, 3, 0, 5, 6], arr.values());
    }

    #[test]
    fn insert_and_erase() {
        let mut arr = PrimitiveArray::<i32>::from_nullable_iter([Some(1), None, Some(3)]);
        arr.insert(1, Some(9));
        assert_eq!(&[1, 9, 0, 3], arr.values());
        assert!(arr.get(2).is_null());

        let removed = arr.erase(2);
        assert!(removed.is_null());
        let got: Vec<_> = arr.layout().iter().map(|v| v.into_option()).collect();
        assert_eq!(vec![Some(1), Some(9), Some(3)], got);
        assert_eq!(0, arr.null_count());

        assert_eq!(Some(Nullable::new(3_i32)), arr.pop());
    }

    #[test]
    #[should_panic]
    fn insert_out_of_bounds() {
        let mut arr = PrimitiveArray::<u8>::from_iter([1]);
        arr.insert(3, Some(1));
    }

    #[test]
    fn resize_grow_and_shrink() {
        let mut arr = PrimitiveArray::<u16>::from_iter([1, 2]);
        arr.resize(5, None);
        assert_eq!(5, arr.len());
        assert_eq!(3, arr.null_count());

        arr.resize(1, Some(0));
        assert_eq!(&[1], arr.values());
        assert_eq!(0, arr.null_count());
        arr.data().validate().unwrap();
    }

    #[test]
    fn write_through_reference() {
        let mut arr = PrimitiveArray::<f64>::from_iter([1.0, 2.0]);
        {
            let mut slot = arr.get_mut(1);
            slot.set_null();
            assert!(!slot.has_value());
        }
        assert!(arr.get(1).is_null());
        assert_eq!(2.0, arr.values()[1]);

        arr.set(1, Some(4.5));
        assert_eq!(Nullable::new(4.5_f64), arr.get(1));
    }

    #[test]
    fn compact_sliced_data() {
        let arr = PrimitiveArray::<i32>::from_nullable_iter([Some(1), None, Some(3), Some(4)]);
        let sliced = arr.data().slice(1, 2);
        let mut arr = PrimitiveArray::<i32>::try_from_data(sliced).unwrap();

        assert_eq!(0, arr.data().offset());
        assert_eq!(&[0, 3], arr.values());
        arr.push(5);
        let got: Vec<_> = arr.layout().iter().map(|v| v.into_option()).collect();
        assert_eq!(vec![None, Some(3), Some(5)], got);
    }

    #[test]
    fn wrong_native_type() {
        let arr = PrimitiveArray::<i32>::from_iter([1]);
        PrimitiveArray::<u32>::try_from_data(arr.into_data()).unwrap_err();
    }

    #[test]
    fn timestamp_type() {
        let arr = PrimitiveArray::<i64>::from_iter([1])
            .with_data_type(DataType::Timestamp(TimeUnit::Second))
            .unwrap();
        assert_eq!(&DataType::Timestamp(TimeUnit::Second), arr.data().datatype());

        PrimitiveArray::<i32>::from_iter([1])
            .with_data_type(DataType::Timestamp(TimeUnit::Second))
            .unwrap_err();
    }
}
