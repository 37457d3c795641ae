use std::ffi::{c_char, c_void, CString};
use std::ptr;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{FFI_ArrowArray, FFI_ArrowSchema, ARROW_FLAG_NULLABLE};
use crate::array_data::ArrayData;
use crate::datatype::DataType;

/// Export array data through the C data interface.
///
/// The returned structs own everything they point at. Their `release`
/// callbacks free it, either when a consumer calls them or when the structs
/// are dropped without being handed off.
pub fn export_array(data: ArrayData) -> (FFI_ArrowArray, FFI_ArrowSchema) {
    debug!(len = data.len(), datatype = %data.datatype(), "exporting array");
    let schema = export_schema(&data);
    let array = export_data(Arc::new(data));
    (array, schema)
}

/// Private data of an exported array.
struct ExportedArray {
    /// Keeps the buffers the pointers below point into alive.
    data: Arc<ArrayData>,
    buffers: Box<[*const c_void]>,
    children: Box<[*mut FFI_ArrowArray]>,
    dictionary: *mut FFI_ArrowArray,
}

fn export_data(data: Arc<ArrayData>) -> FFI_ArrowArray {
    let mut buffers = Vec::with_capacity(data.buffers().len() + 1);
    if data.datatype().has_validity() {
        let validity = data
            .validity()
            .map_or(ptr::null(), |v| v.storage().as_ptr().cast::<c_void>());
        buffers.push(validity);
    }
    buffers.extend(data.buffers().iter().map(|b| b.as_ptr().cast::<c_void>()));

    let children: Box<[_]> = data
        .children()
        .iter()
        .map(|child| Box::into_raw(Box::new(export_data(Arc::clone(child)))))
        .collect();
    let dictionary = data.shared_dictionary().map_or(ptr::null_mut(), |dictionary| {
        Box::into_raw(Box::new(export_data(Arc::clone(dictionary))))
    });

    let mut private = Box::new(ExportedArray {
        data,
        buffers: buffers.into_boxed_slice(),
        children,
        dictionary,
    });

    FFI_ArrowArray {
        length: private.data.len() as i64,
        null_count: private.data.null_count() as i64,
        offset: private.data.offset() as i64,
        n_buffers: private.buffers.len() as i64,
        n_children: private.children.len() as i64,
        buffers: private.buffers.as_mut_ptr(),
        children: private.children.as_mut_ptr(),
        dictionary,
        release: Some(release_array),
        private_data: Box::into_raw(private).cast(),
    }
}

unsafe extern "C" fn release_array(array: *mut FFI_ArrowArray) {
    if array.is_null() {
        return;
    }
    let array = &mut *array;
    array.release = None;
    if array.private_data.is_null() {
        return;
    }

    let private = Box::from_raw(array.private_data.cast::<ExportedArray>());
    array.private_data = ptr::null_mut();
    // Children and dictionaries moved out by the consumer have already been
    // marked released, dropping them is a no-op.
    for &child in private.children.iter() {
        drop(Box::from_raw(child));
    }
    if !private.dictionary.is_null() {
        drop(Box::from_raw(private.dictionary));
    }
    debug!(
        len = private.data.len(),
        datatype = %private.data.datatype(),
        "released exported array"
    );
}

/// Private data of an exported schema.
struct ExportedSchema {
    format: CString,
    name: Option<CString>,
    metadata: Option<Box<[u8]>>,
    children: Box<[*mut FFI_ArrowSchema]>,
    dictionary: *mut FFI_ArrowSchema,
}

fn export_schema(data: &ArrayData) -> FFI_ArrowSchema {
    let datatype = data.datatype();
    let format = match datatype {
        DataType::DenseUnion | DataType::SparseUnion => {
            // Type ids are child indices.
            let ids: Vec<_> = (0..data.children().len()).map(|id| id.to_string()).collect();
            format!("{}{}", datatype.format(), ids.join(","))
        }
        other => other.format().into_owned(),
    };
    // Formats are ascii, they never hold a nul byte.
    let format = CString::new(format).unwrap_or_default();
    let name = data.name().map(c_string);
    let metadata = data.metadata().and_then(|metadata| match metadata.encode() {
        Ok(bytes) => Some(bytes.into_boxed_slice()),
        Err(e) => {
            warn!(%e, "dropping metadata from exported schema");
            None
        }
    });

    let children: Box<[_]> = data
        .children()
        .iter()
        .map(|child| Box::into_raw(Box::new(export_schema(child))))
        .collect();
    let dictionary = data.dictionary().map_or(ptr::null_mut(), |dictionary| {
        Box::into_raw(Box::new(export_schema(dictionary)))
    });
    let flags = if datatype.has_validity() {
        ARROW_FLAG_NULLABLE
    } else {
        0
    };

    let mut private = Box::new(ExportedSchema {
        format,
        name,
        metadata,
        children,
        dictionary,
    });

    FFI_ArrowSchema {
        format: private.format.as_ptr(),
        name: private.name.as_ref().map_or(ptr::null(), |name| name.as_ptr()),
        metadata: private
            .metadata
            .as_ref()
            .map_or(ptr::null(), |metadata| metadata.as_ptr().cast::<c_char>()),
        flags,
        n_children: private.children.len() as i64,
        children: private.children.as_mut_ptr(),
        dictionary,
        release: Some(release_schema),
        private_data: Box::into_raw(private).cast(),
    }
}

/// C strings end at the first nul, so a name holding one is cut there.
fn c_string(s: &str) -> CString {
    let end = s.find('\0').unwrap_or(s.len());
    CString::new(&s[..end]).unwrap_or_default()
}

unsafe extern "C" fn release_schema(schema: *mut FFI_ArrowSchema) {
    if schema.is_null() {
        return;
    }
    let schema = &mut *schema;
    schema.release = None;
    if schema.private_data.is_null() {
        return;
    }

    let private = Box::from_raw(schema.private_data.cast::<ExportedSchema>());
    schema.private_data = ptr::null_mut();
    for &child in private.children.iter() {
        drop(Box::from_raw(child));
    }
    if !private.dictionary.is_null() {
        drop(Box::from_raw(private.dictionary));
    }
}
