use std::iter::FusedIterator;

use once_cell::unsync::OnceCell;
use quiver_error::{QuiverError, Result};

use super::{Layout, LayoutIter, PrimitiveLayout};
use crate::array_data::ArrayData;
use crate::datatype::DataType;
use crate::nullable::Nullable;
use crate::traits::DictionaryKey;

/// Reads dictionary keys as indices.
pub trait KeyLayout<'a>: Sized + Clone {
    fn try_new_keys(data: &'a ArrayData) -> Result<Self>;

    /// Raw key at `idx` as an index, ignoring validity. Negative keys return
    /// None.
    fn key(&self, idx: usize) -> Option<usize>;
}

impl<'a, K: DictionaryKey> KeyLayout<'a> for PrimitiveLayout<'a, K> {
    fn try_new_keys(data: &'a ArrayData) -> Result<Self> {
        <Self as Layout<'a>>::try_new(data)
    }

    fn key(&self, idx: usize) -> Option<usize> {
        self.value(idx).as_index()
    }
}

/// Keys of any integer type, chosen at runtime.
#[derive(Debug, Clone, Copy)]
pub enum AnyKeyLayout<'a> {
    UInt8(PrimitiveLayout<'a, u8>),
    Int8(PrimitiveLayout<'a, i8>),
    UInt16(PrimitiveLayout<'a, u16>),
    Int16(PrimitiveLayout<'a, i16>),
    UInt32(PrimitiveLayout<'a, u32>),
    Int32(PrimitiveLayout<'a, i32>),
    UInt64(PrimitiveLayout<'a, u64>),
    Int64(PrimitiveLayout<'a, i64>),
}

impl<'a> KeyLayout<'a> for AnyKeyLayout<'a> {
    fn try_new_keys(data: &'a ArrayData) -> Result<Self> {
        Ok(match data.datatype() {
            DataType::UInt8 => Self::UInt8(PrimitiveLayout::try_new_keys(data)?),
            DataType::Int8 => Self::Int8(PrimitiveLayout::try_new_keys(data)?),
            DataType::UInt16 => Self::UInt16(PrimitiveLayout::try_new_keys(data)?),
            DataType::Int16 => Self::Int16(PrimitiveLayout::try_new_keys(data)?),
            DataType::UInt32 => Self::UInt32(PrimitiveLayout::try_new_keys(data)?),
            DataType::Int32 => Self::Int32(PrimitiveLayout::try_new_keys(data)?),
            DataType::UInt64 => Self::UInt64(PrimitiveLayout::try_new_keys(data)?),
            DataType::Int64 => Self::Int64(PrimitiveLayout::try_new_keys(data)?),
            other => {
                return Err(QuiverError::new("Dictionary keys must be integers")
                    .with_field("datatype", other))
            }
        })
    }

    fn key(&self, idx: usize) -> Option<usize> {
        match self {
            Self::UInt8(keys) => keys.key(idx),
            Self::Int8(keys) => keys.key(idx),
            Self::UInt16(keys) => keys.key(idx),
            Self::Int16(keys) => keys.key(idx),
            Self::UInt32(keys) => keys.key(idx),
            Self::Int32(keys) => keys.key(idx),
            Self::UInt64(keys) => keys.key(idx),
            Self::Int64(keys) => keys.key(idx),
        }
    }
}

/// Layout over dictionary encoded data.
///
/// An element is valid only when both its key and the dictionary slot the
/// key points at are valid. Null keys may hold any value, reading one yields
/// the dictionary value at the key clamped into range.
#[derive(Debug, Clone)]
pub struct DictionaryLayout<'a, KL, VL> {
    data: &'a ArrayData,
    keys: KL,
    values: VL,
    /// Effective null count, computed on first request.
    null_count: OnceCell<usize>,
}

impl<'a, KL: KeyLayout<'a>, VL: Layout<'a>> DictionaryLayout<'a, KL, VL> {
    pub fn keys(&self) -> &KL {
        &self.keys
    }

    /// Layout over the dictionary values.
    pub fn values(&self) -> &VL {
        &self.values
    }

    /// Dictionary slot for the key at `idx`, null if the key is null.
    pub fn key(&self, idx: usize) -> Nullable<usize> {
        Nullable::with_validity(self.slot(idx), self.data.is_valid(idx))
    }

    /// Iterate effective validity, resolving each key through the dictionary.
    pub fn validity_iter(&self) -> DictionaryValidityIter<'_, 'a, KL, VL> {
        DictionaryValidityIter {
            layout: self,
            idx: 0,
            end: self.len(),
        }
    }

    fn slot(&self, idx: usize) -> usize {
        let last = self.values.len().saturating_sub(1);
        self.keys.key(idx).unwrap_or(0).min(last)
    }
}

impl<'a, KL: KeyLayout<'a>, VL: Layout<'a>> Layout<'a> for DictionaryLayout<'a, KL, VL> {
    type Value = VL::Value;
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        let dictionary = data
            .dictionary()
            .ok_or_else(|| QuiverError::new("Data is not dictionary encoded"))?;
        let keys = KL::try_new_keys(data)?;
        let values = VL::try_new(dictionary)?;
        Ok(DictionaryLayout {
            data,
            keys,
            values,
            null_count: OnceCell::new(),
        })
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn is_valid(&self, idx: usize) -> bool {
        self.data.is_valid(idx) && self.values.is_valid(self.slot(idx))
    }

    fn null_count(&self) -> usize {
        *self
            .null_count
            .get_or_init(|| self.validity_iter().filter(|valid| !valid).count())
    }

    fn value(&self, idx: usize) -> VL::Value {
        assert!(idx < self.len());
        self.values.value(self.slot(idx))
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(self.clone())
    }
}

/// Iterator over the effective validity of a dictionary layout.
#[derive(Debug)]
pub struct DictionaryValidityIter<'l, 'a, KL, VL> {
    layout: &'l DictionaryLayout<'a, KL, VL>,
    idx: usize,
    end: usize,
}

impl<'l, 'a, KL: KeyLayout<'a>, VL: Layout<'a>> Iterator
    for DictionaryValidityIter<'l, 'a, KL, VL>
{
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.idx >= self.end {
            return None;
        }
        let valid = self.layout.is_valid(self.idx);
        self.idx += 1;
        Some(valid)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.end - self.idx;
        (rem, Some(rem))
    }
}

impl<'l, 'a, KL: KeyLayout<'a>, VL: Layout<'a>> ExactSizeIterator
    for DictionaryValidityIter<'l, 'a, KL, VL>
{
}

impl<'l, 'a, KL: KeyLayout<'a>, VL: Layout<'a>> FusedIterator
    for DictionaryValidityIter<'l, 'a, KL, VL>
{
}
