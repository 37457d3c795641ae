use std::ffi::{c_void, CStr};
use std::mem::size_of;
use std::slice;
use std::sync::Arc;

use quiver_error::{QuiverError, Result};
use tracing::debug;

use super::{FFI_ArrowArray, FFI_ArrowSchema};
use crate::array_data::ArrayData;
use crate::bitmap::Bitmap;
use crate::buffer::Buffer;
use crate::datatype::DataType;
use crate::metadata::Metadata;
use crate::offsets::OffsetIndex;

/// An array received through the C data interface.
///
/// Holds on to the foreign array until dropped, at which point the
/// producer's `release` callback runs.
#[derive(Debug)]
pub struct ImportedArray {
    array: FFI_ArrowArray,
    schema: ImportedSchema,
}

/// Schema read out of an `FFI_ArrowSchema`.
#[derive(Debug, Clone, PartialEq)]
struct ImportedSchema {
    datatype: DataType,
    name: Option<String>,
    metadata: Option<Metadata>,
    children: Vec<ImportedSchema>,
    dictionary: Option<Box<ImportedSchema>>,
}

/// Take ownership of a foreign array described by `schema`.
///
/// The shape of the array is checked against the schema here, buffer
/// contents are checked when converting to [`ArrayData`]. The array is
/// released even if this errors.
///
/// # Safety
///
/// `array` and `schema` must be valid C data interface structs, with every
/// buffer pointer valid for the length its type implies.
pub unsafe fn import_array(
    array: FFI_ArrowArray,
    schema: &FFI_ArrowSchema,
) -> Result<ImportedArray> {
    if array.is_released() {
        return Err(QuiverError::new("Cannot import a released array"));
    }
    let schema = read_schema(schema)?;
    check_shape(&array, &schema)?;
    debug!(len = array.len(), datatype = %schema.datatype, "imported array");
    Ok(ImportedArray { array, schema })
}

impl ImportedArray {
    pub fn datatype(&self) -> &DataType {
        &self.schema.datatype
    }

    pub fn name(&self) -> Option<&str> {
        self.schema.name.as_deref()
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.schema.metadata.as_ref()
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Copy the foreign buffers into owned array data.
    pub fn to_array_data(&self) -> Result<ArrayData> {
        // SAFETY: The caller of `import_array` guaranteed the pointers are
        // valid, and they stay valid until `self` is dropped.
        unsafe { import_data(&self.array, &self.schema) }
    }
}

impl Drop for ImportedArray {
    fn drop(&mut self) {
        debug!(
            len = self.array.len(),
            datatype = %self.schema.datatype,
            "releasing imported array"
        );
    }
}

unsafe fn read_schema(schema: &FFI_ArrowSchema) -> Result<ImportedSchema> {
    if schema.is_released() {
        return Err(QuiverError::new("Cannot import a released schema"));
    }
    if schema.format.is_null() {
        return Err(QuiverError::new("Schema is missing a format"));
    }
    let format = CStr::from_ptr(schema.format).to_str()?;
    let datatype = DataType::from_format(format);
    if datatype == DataType::Null && format != "n" {
        return Err(QuiverError::new("Unsupported format").with_field("format", format));
    }
    let name = if schema.name.is_null() {
        None
    } else {
        Some(CStr::from_ptr(schema.name).to_str()?.to_owned())
    };
    let metadata = if schema.metadata.is_null() {
        None
    } else {
        Some(Metadata::decode_ptr(schema.metadata)?)
    };

    let mut children = Vec::with_capacity(schema.n_children as usize);
    for idx in 0..schema.n_children as usize {
        let child = *schema.children.add(idx);
        if child.is_null() {
            return Err(QuiverError::new("Missing child schema").with_field("idx", idx));
        }
        children.push(read_schema(&*child)?);
    }

    if matches!(datatype, DataType::DenseUnion | DataType::SparseUnion) {
        check_union_type_ids(format, children.len())?;
    }

    let dictionary = if schema.dictionary.is_null() {
        None
    } else {
        Some(Box::new(read_schema(&*schema.dictionary)?))
    };

    Ok(ImportedSchema {
        datatype,
        name,
        metadata,
        children,
        dictionary,
    })
}

/// Union type ids have to be the child indices in order.
fn check_union_type_ids(format: &str, num_children: usize) -> Result<()> {
    let ids = &format[4..];
    let matches = if ids.is_empty() {
        num_children == 0
    } else {
        ids.split(',')
            .map(|id| id.parse::<usize>().ok())
            .eq((0..num_children).map(Some))
    };
    if !matches {
        return Err(QuiverError::new("Union type ids must match child indices")
            .with_field("format", format));
    }
    Ok(())
}

unsafe fn check_shape(array: &FFI_ArrowArray, schema: &ImportedSchema) -> Result<()> {
    if array.length < 0 || array.offset < 0 {
        return Err(QuiverError::new("Negative array length or offset")
            .with_field("length", array.length)
            .with_field("offset", array.offset));
    }

    let datatype = schema.datatype;
    let expected = datatype.has_validity() as usize + datatype.data_buffer_count();
    if array.num_buffers() != expected {
        return Err(QuiverError::new("Unexpected number of buffers")
            .with_field("datatype", datatype)
            .with_field("expected", expected)
            .with_field("got", array.n_buffers));
    }
    if array.num_children() != schema.children.len() {
        return Err(QuiverError::new("Array and schema children differ")
            .with_field("array", array.n_children)
            .with_field("schema", schema.children.len()));
    }
    if array.num_buffers() > 0 && array.buffers.is_null() {
        return Err(QuiverError::new("Missing buffers"));
    }

    for (idx, child_schema) in schema.children.iter().enumerate() {
        let child = *array.children.add(idx);
        if child.is_null() {
            return Err(QuiverError::new("Missing child array").with_field("idx", idx));
        }
        check_shape(&*child, child_schema)?;
    }

    match (&schema.dictionary, array.dictionary.is_null()) {
        (Some(dictionary), false) => check_shape(&*array.dictionary, dictionary),
        (None, true) => Ok(()),
        _ => Err(QuiverError::new("Array and schema disagree on dictionary encoding")),
    }
}

unsafe fn import_data(array: &FFI_ArrowArray, schema: &ImportedSchema) -> Result<ArrayData> {
    let datatype = schema.datatype;
    let offset = array.offset();
    let len = array.len();
    let end = offset + len;

    let pointers: &[*const c_void] = if array.num_buffers() == 0 {
        &[]
    } else {
        slice::from_raw_parts(array.buffers, array.num_buffers())
    };
    let (validity, pointers) = if datatype.has_validity() {
        let validity = match pointers[0] {
            ptr if ptr.is_null() => None,
            ptr => Some(Bitmap::from_blocks(copy_buffer(ptr, end.div_ceil(8))?, end)),
        };
        (validity, &pointers[1..])
    } else {
        (None, pointers)
    };

    let buffers = match datatype {
        DataType::Null
        | DataType::Struct
        | DataType::FixedSizeList(_)
        | DataType::RunEndEncoded => Vec::new(),
        DataType::Boolean => vec![copy_buffer(pointers[0], end.div_ceil(8))?],
        DataType::Utf8 | DataType::Binary => copy_varlen::<i32>(pointers, end)?,
        DataType::LargeUtf8 | DataType::LargeBinary => copy_varlen::<i64>(pointers, end)?,
        DataType::List => vec![copy_buffer(pointers[0], (end + 1) * size_of::<i32>())?],
        DataType::LargeList => vec![copy_buffer(pointers[0], (end + 1) * size_of::<i64>())?],
        DataType::SparseUnion => vec![copy_buffer(pointers[0], end)?],
        DataType::DenseUnion => vec![
            copy_buffer(pointers[0], end)?,
            copy_buffer(pointers[1], end * size_of::<i32>())?,
        ],
        other => {
            let width = other.byte_width().ok_or_else(|| {
                QuiverError::new("Cannot import data type").with_field("datatype", other)
            })?;
            vec![copy_buffer(pointers[0], end * width)?]
        }
    };

    let children = schema
        .children
        .iter()
        .enumerate()
        .map(|(idx, child_schema)| {
            let child = &**array.children.add(idx);
            import_data(child, child_schema).map(Arc::new)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut data = ArrayData::try_new(datatype, end, validity, buffers, children)?;
    if let Some(dictionary) = &schema.dictionary {
        let values = import_data(&*array.dictionary, dictionary)?;
        data = ArrayData::try_new_dictionary(data, Arc::new(values))?;
    }

    let mut data = data.slice(offset, len);
    if let Some(name) = &schema.name {
        data = data.with_name(name.clone());
    }
    if let Some(metadata) = &schema.metadata {
        data = data.with_metadata(metadata.clone());
    }
    Ok(data)
}

/// Copy the offsets and the bytes they span.
unsafe fn copy_varlen<O: OffsetIndex>(
    pointers: &[*const c_void],
    end: usize,
) -> Result<Vec<Buffer<u8>>> {
    let offsets = copy_buffer(pointers[0], (end + 1) * size_of::<O>())?;
    let data_len = match offsets.try_cast::<O>()?.last() {
        Some(last) => last.as_usize(),
        None => 0,
    };
    let data = copy_buffer(pointers[1], data_len)?;
    Ok(vec![offsets, data])
}

unsafe fn copy_buffer(ptr: *const c_void, len: usize) -> Result<Buffer<u8>> {
    if len == 0 {
        return Ok(Buffer::new());
    }
    if ptr.is_null() {
        return Err(QuiverError::new("Missing buffer").with_field("len", len));
    }
    Ok(Buffer::from_slice(slice::from_raw_parts(ptr.cast::<u8>(), len)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{
        DictionaryArray, FixedSizeListArray, ListArray, PrimitiveArray, RunEndEncodedArray,
        StructArray, UnionArray, Utf8Array,
    };
    use crate::ffi::export_array;
    use crate::testutil::assert_arrays_eq;

    fn round_trip(data: &ArrayData) -> ArrayData {
        let (array, schema) = export_array(data.clone());
        let imported = unsafe { import_array(array, &schema) }.unwrap();
        assert_eq!(data.datatype(), imported.datatype());
        assert_eq!(data.len(), imported.len());
        imported.to_array_data().unwrap()
    }

    #[test]
    fn primitive_round_trip() {
        logutil::init_test();

        let arr = PrimitiveArray::<i32>::from_nullable_iter([Some(1), None, Some(3)]);
        assert_eq!(arr.data(), &round_trip(arr.data()));
    }

    #[test]
    fn sliced_round_trip() {
        let arr =
            Utf8Array::from_nullable_iter([Some("a"), None, Some("bb"), Some("ccc")]).unwrap();
        let sliced = arr.data().slice(1, 3);
        let imported = round_trip(&sliced);

        assert_eq!(1, imported.offset());
        assert_arrays_eq(&sliced, &imported);
    }

    #[test]
    fn nested_round_trip() {
        let list = ListArray::<i32>::from_rows::<str>([
            Some(vec![Some("a"), None]),
            None,
            Some(vec![Some("b")]),
        ])
        .unwrap();
        let strct = StructArray::try_new(
            vec![
                list.into(),
                PrimitiveArray::<f64>::from_iter([1.0, 2.0, 3.0]).into(),
            ],
            None,
        )
        .unwrap();

        assert_arrays_eq(strct.data(), &round_trip(strct.data()));
    }

    #[test]
    fn dictionary_round_trip() {
        let arr =
            DictionaryArray::<u16>::from_values::<str>([Some("x"), None, Some("y"), Some("x")])
                .unwrap();
        let imported = round_trip(arr.data());

        assert!(imported.is_dictionary());
        assert_arrays_eq(arr.data(), &imported);
    }

    #[test]
    fn dense_union_round_trip() {
        let arr = UnionArray::try_new_dense(
            vec![1, 0, 1],
            vec![0, 0, 1],
            vec![
                PrimitiveArray::<i64>::from_iter([9]).into(),
                Utf8Array::from_values(["p", "q"]).unwrap().into(),
            ],
        )
        .unwrap();
        assert_arrays_eq(arr.data(), &round_trip(arr.data()));
    }

    #[test]
    fn name_and_metadata_round_trip() {
        let metadata: Metadata = [("unit", "cm"), ("source", "scan")].into_iter().collect();
        let strct = StructArray::try_new(
            vec![
                PrimitiveArray::<i32>::from_iter([1, 2])
                    .into_data()
                    .with_name("height")
                    .with_metadata(metadata.clone()),
                Utf8Array::from_values(["a", "b"]).unwrap().into_data(),
            ],
            None,
        )
        .unwrap();
        let data = strct.into_data().with_name("row");

        let (array, schema) = export_array(data.clone());
        let imported = unsafe { import_array(array, &schema) }.unwrap();
        assert_eq!(Some("row"), imported.name());
        assert_eq!(None, imported.metadata());

        let got = imported.to_array_data().unwrap();
        assert_eq!(Some("row"), got.name());
        let first = got.child(0).unwrap();
        assert_eq!(Some("height"), first.name());
        assert_eq!(Some(&metadata), first.metadata());
        assert_eq!(None, got.child(1).unwrap().name());
        assert_arrays_eq(&data, &got);
    }

    #[test]
    fn fixed_size_list_round_trip() {
        let arr = FixedSizeListArray::try_new(
            PrimitiveArray::<i16>::from_iter([1, 2, 3, 4, 5, 6]).into(),
            2,
            Some(crate::bitmap::Bitmap::from_bool_iter([true, false, true])),
        )
        .unwrap();
        assert_arrays_eq(arr.data(), &round_trip(arr.data()));

        let sliced = arr.data().slice(1, 2);
        assert_arrays_eq(&sliced, &round_trip(&sliced));
    }

    #[test]
    fn run_end_encoded_round_trip() {
        let values = Utf8Array::from_nullable_iter([Some("a"), None, Some("b")]).unwrap();
        let arr = RunEndEncodedArray::try_new(
            PrimitiveArray::<i32>::from_iter([2, 3, 6]).into(),
            values.into(),
        )
        .unwrap();
        let imported = round_trip(arr.data());
        assert_eq!(&DataType::RunEndEncoded, imported.datatype());
        assert_arrays_eq(arr.data(), &imported);

        let sliced = arr.data().slice(1, 4);
        assert_arrays_eq(&sliced, &round_trip(&sliced));
    }

    #[test]
    fn released_array_is_rejected() {
        let (mut array, schema) = export_array(PrimitiveArray::<u8>::from_iter([1]).into_data());
        if let Some(release) = array.release {
            unsafe { release(&mut array) };
        }
        unsafe { import_array(array, &schema) }.unwrap_err();
    }

    #[test]
    fn unsupported_format() {
        let (array, mut schema) = export_array(PrimitiveArray::<u8>::from_iter([1]).into_data());
        schema.format = c"+m".as_ptr();
        // Dropping the schema still releases the private data it owns.
        unsafe { import_array(array, &schema) }.unwrap_err();
    }

    #[test]
    fn union_type_ids() {
        check_union_type_ids("+us:0,1", 2).unwrap();
        check_union_type_ids("+ud:", 0).unwrap();
        check_union_type_ids("+us:1,0", 2).unwrap_err();
        check_union_type_ids("+us:0", 2).unwrap_err();
    }
}
