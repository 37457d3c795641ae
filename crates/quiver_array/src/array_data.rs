use std::sync::Arc;

use quiver_error::{not_implemented, QuiverError, Result};

use crate::bitmap::{BitStorage, Bitmap};
use crate::buffer::{Buffer, Native};
use crate::datatype::DataType;
use crate::metadata::Metadata;
use crate::offsets::{validate_offsets, OffsetIndex};
use crate::traits::{BinaryValue, DictionaryKey};

/// The storage shared by every array layout.
///
/// Buffers hold raw bytes and are interpreted according to the data type.
/// Children and dictionaries are shared, and mutating them goes through copy
/// on write.
///
/// `offset` and `len` select a window into the buffers. The validity bitmap
/// always covers the full, unsliced data.
///
/// The optional name and metadata describe the field holding the data. They
/// travel with the data through slicing and the C data interface.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    datatype: DataType,
    len: usize,
    offset: usize,
    validity: Option<Bitmap>,
    buffers: Vec<Buffer<u8>>,
    children: Vec<Arc<ArrayData>>,
    dictionary: Option<Arc<ArrayData>>,
    name: Option<String>,
    metadata: Option<Metadata>,
}

impl ArrayData {
    /// Create array data, validating the buffers against the data type.
    pub fn try_new(
        datatype: DataType,
        len: usize,
        validity: Option<Bitmap>,
        buffers: Vec<Buffer<u8>>,
        children: Vec<Arc<ArrayData>>,
    ) -> Result<Self> {
        let data = ArrayData {
            datatype,
            len,
            offset: 0,
            validity,
            buffers,
            children,
            dictionary: None,
            name: None,
            metadata: None,
        };
        data.validate()?;
        Ok(data)
    }

    /// Create dictionary encoded data from keys and a dictionary.
    ///
    /// `keys` must have an integer data type.
    pub fn try_new_dictionary(keys: ArrayData, dictionary: Arc<ArrayData>) -> Result<Self> {
        let data = ArrayData {
            dictionary: Some(dictionary),
            ..keys
        };
        data.validate()?;
        Ok(data)
    }

    /// Create array data without validating it.
    ///
    /// Only used by builders maintaining the invariants themselves.
    pub(crate) fn new_unchecked(
        datatype: DataType,
        len: usize,
        validity: Option<Bitmap>,
        buffers: Vec<Buffer<u8>>,
        children: Vec<Arc<ArrayData>>,
        dictionary: Option<Arc<ArrayData>>,
    ) -> Self {
        let data = ArrayData {
            datatype,
            len,
            offset: 0,
            validity,
            buffers,
            children,
            dictionary,
            name: None,
            metadata: None,
        };
        debug_assert!(data.validate().is_ok(), "{:?}", data.validate());
        data
    }

    /// Create array data with only nulls.
    pub fn new_null(len: usize) -> Self {
        ArrayData {
            datatype: DataType::Null,
            len,
            offset: 0,
            validity: None,
            buffers: Vec::new(),
            children: Vec::new(),
            dictionary: None,
            name: None,
            metadata: None,
        }
    }

    /// Attach a field name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach field metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Copy the name and metadata of `other` onto this data.
    pub(crate) fn set_field_info_from(&mut self, other: &ArrayData) {
        self.name.clone_from(&other.name);
        self.metadata.clone_from(&other.metadata);
    }

    pub const fn datatype(&self) -> &DataType {
        &self.datatype
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }

    pub fn buffers(&self) -> &[Buffer<u8>] {
        &self.buffers
    }

    pub fn buffer(&self, idx: usize) -> Result<&Buffer<u8>> {
        self.buffers.get(idx).ok_or_else(|| {
            QuiverError::new("Missing buffer")
                .with_field("idx", idx)
                .with_field("datatype", self.datatype)
        })
    }

    /// Get a buffer reinterpreted as a slice of `T`.
    pub fn buffer_as<T: Native>(&self, idx: usize) -> Result<&[T]> {
        self.buffer(idx)?.try_cast()
    }

    pub fn children(&self) -> &[Arc<ArrayData>] {
        &self.children
    }

    pub fn child(&self, idx: usize) -> Result<&ArrayData> {
        self.children
            .get(idx)
            .map(|c| c.as_ref())
            .ok_or_else(|| QuiverError::new("Missing child").with_field("idx", idx))
    }

    pub fn dictionary(&self) -> Option<&ArrayData> {
        self.dictionary.as_deref()
    }

    /// The dictionary as a shared pointer, for building more keys over it.
    pub fn shared_dictionary(&self) -> Option<&Arc<ArrayData>> {
        self.dictionary.as_ref()
    }

    pub fn is_dictionary(&self) -> bool {
        self.dictionary.is_some()
    }

    /// If the value at `idx` is valid.
    ///
    /// This only looks at this array's own validity. Dictionary values and
    /// union children are resolved by their layouts.
    pub fn is_valid(&self, idx: usize) -> bool {
        assert!(
            idx < self.len,
            "index {idx} out of bounds for array of length {}",
            self.len
        );
        if self.datatype == DataType::Null {
            return false;
        }
        match &self.validity {
            Some(validity) => validity.test(self.offset + idx),
            None => true,
        }
    }

    /// Number of nulls according to this array's own validity.
    pub fn null_count(&self) -> usize {
        if self.datatype == DataType::Null {
            return self.len;
        }
        match &self.validity {
            Some(validity) => {
                validity.count_nulls_in_range(self.offset..self.offset + self.len)
            }
            None => 0,
        }
    }

    /// Get a window into this data.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        assert!(
            offset + len <= self.len,
            "slice {offset}..{} out of bounds for array of length {}",
            offset + len,
            self.len
        );
        ArrayData {
            offset: self.offset + offset,
            len,
            ..self.clone()
        }
    }

    /// Split into mutable validity and buffers, materializing the validity.
    pub(crate) fn parts_mut(&mut self) -> (&mut Bitmap, &mut [Buffer<u8>]) {
        let len = self.offset + self.len;
        let validity = self
            .validity
            .get_or_insert_with(|| Bitmap::new_with_all_true(len));
        (validity, &mut self.buffers)
    }

    /// Get a mutable child, cloning it first if it's shared.
    pub(crate) fn child_mut(&mut self, idx: usize) -> Result<&mut ArrayData> {
        self.children
            .get_mut(idx)
            .map(Arc::make_mut)
            .ok_or_else(|| QuiverError::new("Missing child").with_field("idx", idx))
    }

    pub(crate) fn set_len(&mut self, len: usize) {
        self.len = len;
    }

    pub(crate) fn set_datatype(&mut self, datatype: DataType) {
        self.datatype = datatype;
    }

    /// Check that buffers, children, and the dictionary are consistent with
    /// the data type, length, and offset.
    pub fn validate(&self) -> Result<()> {
        let end = self.offset + self.len;

        let expected = self.datatype.data_buffer_count();
        if self.buffers.len() != expected {
            return Err(QuiverError::new("Unexpected number of buffers")
                .with_field("datatype", self.datatype)
                .with_field("expected", expected)
                .with_field("got", self.buffers.len()));
        }

        match &self.validity {
            Some(_) if !self.datatype.has_validity() => {
                return Err(QuiverError::new("Data type doesn't support a validity bitmap")
                    .with_field("datatype", self.datatype))
            }
            Some(validity) if validity.len() < end => {
                return Err(QuiverError::new("Validity bitmap too short")
                    .with_field("bitmap_len", validity.len())
                    .with_field("required", end))
            }
            _ => (),
        }

        match self.datatype {
            DataType::Null => (),
            DataType::Boolean => {
                check_len("values", self.buffers[0].len() * 8, end)?;
            }
            DataType::FixedSizeBinary(width) => {
                check_len("values", self.buffers[0].len(), end * width)?;
            }
            datatype if datatype.is_primitive() => {
                // Primitive types always have a byte width.
                let width = datatype.byte_width().unwrap_or(1);
                check_len("values", self.buffers[0].len(), end * width)?;
            }
            DataType::Utf8 => self.validate_varlen::<i32, str>()?,
            DataType::LargeUtf8 => self.validate_varlen::<i64, str>()?,
            DataType::Binary => self.validate_varlen::<i32, [u8]>()?,
            DataType::LargeBinary => self.validate_varlen::<i64, [u8]>()?,
            DataType::List => self.validate_list::<i32>()?,
            DataType::LargeList => self.validate_list::<i64>()?,
            DataType::FixedSizeList(size) => {
                if self.children.len() != 1 {
                    return Err(QuiverError::new("List arrays must have exactly one child")
                        .with_field("children", self.children.len()));
                }
                check_len("child", self.children[0].len(), end * size)?;
            }
            DataType::RunEndEncoded => self.validate_run_ends()?,
            DataType::Struct => {
                for child in &self.children {
                    check_len("child", child.len(), end)?;
                }
            }
            DataType::SparseUnion => {
                self.validate_type_ids()?;
                for child in &self.children {
                    check_len("child", child.len(), end)?;
                }
            }
            DataType::DenseUnion => {
                let type_ids = self.validate_type_ids()?;
                let offsets: &[i32] = self.buffer_as(1)?;
                check_len("offsets", offsets.len(), end)?;
                for (idx, (&type_id, &offset)) in
                    type_ids.iter().zip(&offsets[self.offset..end]).enumerate()
                {
                    let child = &self.children[type_id as usize];
                    if offset < 0 || offset as usize >= child.len() {
                        return Err(QuiverError::new("Union offset out of bounds")
                            .with_field("idx", idx)
                            .with_field("offset", offset));
                    }
                }
            }
            other => not_implemented!("validate {other}"),
        }

        for child in &self.children {
            child.validate()?;
        }

        if let Some(dictionary) = &self.dictionary {
            dictionary.validate()?;
            self.validate_keys(dictionary)?;
        }

        Ok(())
    }

    fn validate_varlen<O: OffsetIndex, K: BinaryValue + ?Sized>(&self) -> Result<()> {
        let end = self.offset + self.len;
        let offsets: &[O] = self.buffer_as(0)?;
        check_len("offsets", offsets.len(), end + 1)?;
        let data = &self.buffers[1];

        let window = &offsets[self.offset..=end];
        validate_offsets(window, data.len())?;
        for pair in window.windows(2) {
            K::validate(&data[pair[0].as_usize()..pair[1].as_usize()])?;
        }
        Ok(())
    }

    fn validate_list<O: OffsetIndex>(&self) -> Result<()> {
        let end = self.offset + self.len;
        if self.children.len() != 1 {
            return Err(QuiverError::new("List arrays must have exactly one child")
                .with_field("children", self.children.len()));
        }
        let offsets: &[O] = self.buffer_as(0)?;
        check_len("offsets", offsets.len(), end + 1)?;
        validate_offsets(&offsets[self.offset..=end], self.children[0].len())
    }

    fn validate_run_ends(&self) -> Result<()> {
        let end = self.offset + self.len;
        if self.children.len() != 2 {
            return Err(
                QuiverError::new("Run end encoded arrays must have exactly two children")
                    .with_field("children", self.children.len()),
            );
        }
        let (run_ends, values) = (&self.children[0], &self.children[1]);
        if run_ends.len() != values.len() {
            return Err(QuiverError::new("Run ends and values must have the same length")
                .with_field("run_ends", run_ends.len())
                .with_field("values", values.len()));
        }
        if run_ends.null_count() != 0 || run_ends.is_dictionary() {
            return Err(QuiverError::new("Run ends must not contain nulls"));
        }
        match run_ends.datatype() {
            DataType::Int16 => validate_run_ends_as::<i16>(run_ends, end),
            DataType::Int32 => validate_run_ends_as::<i32>(run_ends, end),
            DataType::Int64 => validate_run_ends_as::<i64>(run_ends, end),
            other => Err(QuiverError::new("Run ends must be Int16, Int32, or Int64")
                .with_field("datatype", other)),
        }
    }

    /// Check type ids point at children, returning the windowed ids.
    fn validate_type_ids(&self) -> Result<&[i8]> {
        let end = self.offset + self.len;
        let type_ids: &[i8] = self.buffer_as(0)?;
        check_len("type ids", type_ids.len(), end)?;
        let type_ids = &type_ids[self.offset..end];
        for &type_id in type_ids {
            if type_id < 0 || type_id as usize >= self.children.len() {
                return Err(
                    QuiverError::new("Union type id out of range").with_field("type_id", type_id)
                );
            }
        }
        Ok(type_ids)
    }

    fn validate_keys(&self, dictionary: &ArrayData) -> Result<()> {
        match self.datatype {
            DataType::UInt8 => self.validate_keys_as::<u8>(dictionary),
            DataType::Int8 => self.validate_keys_as::<i8>(dictionary),
            DataType::UInt16 => self.validate_keys_as::<u16>(dictionary),
            DataType::Int16 => self.validate_keys_as::<i16>(dictionary),
            DataType::UInt32 => self.validate_keys_as::<u32>(dictionary),
            DataType::Int32 => self.validate_keys_as::<i32>(dictionary),
            DataType::UInt64 => self.validate_keys_as::<u64>(dictionary),
            DataType::Int64 => self.validate_keys_as::<i64>(dictionary),
            other => Err(QuiverError::new("Dictionary keys must be integers")
                .with_field("datatype", other)),
        }
    }

    /// Valid keys must index into the dictionary. Null keys may hold any
    /// value, but reading them needs at least one dictionary slot.
    fn validate_keys_as<K: DictionaryKey>(&self, dictionary: &ArrayData) -> Result<()> {
        if self.len > 0 && dictionary.is_empty() {
            return Err(QuiverError::new("Dictionary is empty"));
        }
        let keys: &[K] = self.buffer_as(0)?;
        for idx in 0..self.len {
            if !self.is_valid(idx) {
                continue;
            }
            let in_range = keys[self.offset + idx]
                .as_index()
                .is_some_and(|key| key < dictionary.len());
            if !in_range {
                return Err(QuiverError::new("Dictionary key out of range")
                    .with_field("idx", idx)
                    .with_field("dictionary_len", dictionary.len()));
            }
        }
        Ok(())
    }
}

/// Run ends must be positive, strictly increasing, and reach `end`.
fn validate_run_ends_as<R: DictionaryKey>(run_ends: &ArrayData, end: usize) -> Result<()> {
    let all: &[R] = run_ends.buffer_as(0)?;
    let window = &all[run_ends.offset()..run_ends.offset() + run_ends.len()];
    let mut prev = 0;
    for (idx, run_end) in window.iter().enumerate() {
        match run_end.as_index() {
            Some(run_end) if run_end > prev => prev = run_end,
            _ => {
                return Err(QuiverError::new("Run ends must be strictly increasing")
                    .with_field("idx", idx))
            }
        }
    }
    check_len("run ends", prev, end)
}

fn check_len(what: &'static str, got: usize, required: usize) -> Result<()> {
    if got < required {
        return Err(QuiverError::new("Buffer too short")
            .with_field("buffer", what)
            .with_field("len", got)
            .with_field("required", required));
    }
    Ok(())
}

/// Copy native values into a byte buffer.
pub(crate) fn bytes_from_slice<T: Native>(values: &[T]) -> Buffer<u8> {
    Buffer::from_slice(values).into_byte_buffer()
}
