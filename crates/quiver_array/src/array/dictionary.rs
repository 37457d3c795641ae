use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use ahash::RandomState;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use quiver_error::{QuiverError, Result};
use tracing::trace;

use super::PrimitiveArray;
use crate::array_data::ArrayData;
use crate::bitmap::Bitmap;
use crate::buffer::Buffer;
use crate::datatype::DataType;
use crate::layout::{DictionaryLayout, Layout, PrimitiveLayout};
use crate::traits::{ArrowValue, DictionaryKey};

/// Seeds are fixed so dictionary builds are reproducible.
const DEDUP_RANDOM_STATE: RandomState = RandomState::with_seeds(0, 0, 0, 0);

/// Deduplicate values, keeping the order they first appear in.
///
/// Returns the unique values and, for every input value, the index of its
/// unique value.
pub fn unique_values_and_indices<'b, V>(
    values: impl IntoIterator<Item = &'b V>,
) -> (Vec<&'b V>, Vec<usize>)
where
    V: Hash + Eq + ?Sized + 'b,
{
    let mut seen: HashMap<&V, usize, RandomState> = HashMap::with_hasher(DEDUP_RANDOM_STATE);
    let mut unique = Vec::new();
    let indices = values
        .into_iter()
        .map(|value| match seen.entry(value) {
            Entry::Occupied(ent) => *ent.get(),
            Entry::Vacant(ent) => {
                unique.push(value);
                *ent.insert(unique.len() - 1)
            }
        })
        .collect();
    (unique, indices)
}

/// Dictionary encoded values with keys of type `K`.
///
/// The dictionary is shared, cloning the array or building several arrays
/// over the same dictionary doesn't copy it.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryArray<K> {
    data: ArrayData,
    /// Same dictionary the data points at.
    dictionary: Arc<ArrayData>,
    _key: PhantomData<K>,
}

impl<K: DictionaryKey> DictionaryArray<K> {
    pub fn try_new(keys: PrimitiveArray<K>, dictionary: Arc<ArrayData>) -> Result<Self> {
        let data = ArrayData::try_new_dictionary(keys.into_data(), Arc::clone(&dictionary))?;
        Ok(DictionaryArray {
            data,
            dictionary,
            _key: PhantomData,
        })
    }

    /// Dictionary encode nullable values.
    ///
    /// Each distinct value is stored once. Null values get a null key.
    pub fn from_values<'b, V>(values: impl IntoIterator<Item = Option<&'b V>>) -> Result<Self>
    where
        V: ArrowValue + Hash + Eq + ?Sized + 'b,
    {
        let values: Vec<_> = values.into_iter().collect();
        let validity: Bitmap = values.iter().map(|v| v.is_some()).collect();
        let (unique, indices) = unique_values_and_indices(values.iter().flatten().copied());

        let mut keys = Buffer::with_capacity(values.len());
        let mut indices = indices.into_iter();
        for value in &values {
            let idx = match value {
                Some(_) => indices.next().unwrap_or_default(),
                None => 0,
            };
            let key = K::try_from_index(idx).ok_or_else(|| {
                QuiverError::new("Too many distinct values for dictionary key type")
                    .with_field("key_type", K::DATA_TYPE)
                    .with_field("index", idx)
            })?;
            keys.push(key);
        }

        let dictionary: ArrayData = if unique.is_empty() && !values.is_empty() {
            // Null keys still need a slot to point at.
            V::array_from_iter([None])?.into()
        } else {
            V::array_from_iter(unique.iter().map(|v| Some(*v)))?.into()
        };
        let key_type = K::DATA_TYPE;
        trace!(
            len = values.len(),
            distinct = dictionary.len(),
            %key_type,
            "built dictionary array"
        );

        Self::try_new(PrimitiveArray::new(keys, Some(validity)), Arc::new(dictionary))
    }

    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        let dictionary = data
            .shared_dictionary()
            .cloned()
            .ok_or_else(|| QuiverError::new("Data is not dictionary encoded"))?;
        PrimitiveLayout::<K>::try_new(&data)?;
        Ok(DictionaryArray {
            data,
            dictionary,
            _key: PhantomData,
        })
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

    pub fn keys(&self) -> PrimitiveLayout<'_, K> {
        PrimitiveLayout::new_unchecked(&self.data)
    }

    /// The shared dictionary. Clone the `Arc` to encode other keys against
    /// the same values.
    pub fn dictionary(&self) -> &Arc<ArrayData> {
        &self.dictionary
    }

    /// Read the array with `VL` as the dictionary value layout.
    pub fn layout<'a, VL: Layout<'a>>(
        &'a self,
    ) -> Result<DictionaryLayout<'a, PrimitiveLayout<'a, K>, VL>> {
        DictionaryLayout::try_new(&self.data)
    }
}

impl<K> From<DictionaryArray<K>> for ArrayData {
    fn from(arr: DictionaryArray<K>) -> Self {
        arr.data
    }
}

/// A dictionary array with its key type chosen at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyDictionaryArray {
    UInt8(DictionaryArray<u8>),
    Int8(DictionaryArray<i8>),
    UInt16(DictionaryArray<u16>),
    Int16(DictionaryArray<i16>),
    UInt32(DictionaryArray<u32>),
    Int32(DictionaryArray<i32>),
    UInt64(DictionaryArray<u64>),
    Int64(DictionaryArray<i64>),
}

macro_rules! with_dictionary {
    ($arr:expr, $inner:ident => $body:expr) => {
        match $arr {
            AnyDictionaryArray::UInt8($inner) => $body,
            AnyDictionaryArray::Int8($inner) => $body,
            AnyDictionaryArray::UInt16($inner) => $body,
            AnyDictionaryArray::Int16($inner) => $body,
            AnyDictionaryArray::UInt32($inner) => $body,
            AnyDictionaryArray::Int32($inner) => $body,
            AnyDictionaryArray::UInt64($inner) => $body,
            AnyDictionaryArray::Int64($inner) => $body,
        }
    };
}

impl AnyDictionaryArray {
    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        Ok(match *data.datatype() {
            DataType::UInt8 => Self::UInt8(DictionaryArray::try_from_data(data)?),
            DataType::Int8 => Self::Int8(DictionaryArray::try_from_data(data)?),
            DataType::UInt16 => Self::UInt16(DictionaryArray::try_from_data(data)?),
            DataType::Int16 => Self::Int16(DictionaryArray::try_from_data(data)?),
            DataType::UInt32 => Self::UInt32(DictionaryArray::try_from_data(data)?),
            DataType::Int32 => Self::Int32(DictionaryArray::try_from_data(data)?),
            DataType::UInt64 => Self::UInt64(DictionaryArray::try_from_data(data)?),
            DataType::Int64 => Self::Int64(DictionaryArray::try_from_data(data)?),
            other => {
                return Err(QuiverError::new("Dictionary keys must be integers")
                    .with_field("datatype", other))
            }
        })
    }

    pub fn data(&self) -> &ArrayData {
        with_dictionary!(self, arr => arr.data())
    }

    pub fn into_data(self) -> ArrayData {
        with_dictionary!(self, arr => arr.into_data())
    }
}
