//! Exchange arrays with other libraries through the Arrow C data interface.
//!
//! [`export_array`] hands out structs whose buffers stay owned by this
//! process until the consumer calls `release`. [`import_array`] does the
//! reverse: the imported buffers are only borrowed, and the producer's
//! `release` runs once the [`ImportedArray`] is dropped.

#![allow(non_camel_case_types)]

mod export;
mod import;

pub use export::*;
pub use import::*;

use std::ffi::{c_char, c_void};
use std::ptr;

/// The field may hold nulls.
pub const ARROW_FLAG_NULLABLE: i64 = 2;

/// C data interface `ArrowSchema`.
#[repr(C)]
#[derive(Debug)]
pub struct FFI_ArrowSchema {
    format: *const c_char,
    name: *const c_char,
    metadata: *const c_char,
    flags: i64,
    n_children: i64,
    children: *mut *mut FFI_ArrowSchema,
    dictionary: *mut FFI_ArrowSchema,
    release: Option<unsafe extern "C" fn(*mut FFI_ArrowSchema)>,
    private_data: *mut c_void,
}

impl FFI_ArrowSchema {
    /// A released schema, suitable as the target of a foreign export.
    pub const fn empty() -> Self {
        FFI_ArrowSchema {
            format: ptr::null(),
            name: ptr::null(),
            metadata: ptr::null(),
            flags: 0,
            n_children: 0,
            children: ptr::null_mut(),
            dictionary: ptr::null_mut(),
            release: None,
            private_data: ptr::null_mut(),
        }
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    pub fn flags(&self) -> i64 {
        self.flags
    }
}

impl Drop for FFI_ArrowSchema {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            // SAFETY: The producer set `release` for this exact struct.
            unsafe { release(self) }
        }
    }
}

/// C data interface `ArrowArray`.
#[repr(C)]
#[derive(Debug)]
pub struct FFI_ArrowArray {
    length: i64,
    null_count: i64,
    offset: i64,
    n_buffers: i64,
    n_children: i64,
    buffers: *mut *const c_void,
    children: *mut *mut FFI_ArrowArray,
    dictionary: *mut FFI_ArrowArray,
    release: Option<unsafe extern "C" fn(*mut FFI_ArrowArray)>,
    private_data: *mut c_void,
}

impl FFI_ArrowArray {
    /// A released array, suitable as the target of a foreign export.
    pub const fn empty() -> Self {
        FFI_ArrowArray {
            length: 0,
            null_count: 0,
            offset: 0,
            n_buffers: 0,
            n_children: 0,
            buffers: ptr::null_mut(),
            children: ptr::null_mut(),
            dictionary: ptr::null_mut(),
            release: None,
            private_data: ptr::null_mut(),
        }
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    pub fn null_count(&self) -> i64 {
        self.null_count
    }

    pub fn num_buffers(&self) -> usize {
        self.n_buffers as usize
    }

    pub fn num_children(&self) -> usize {
        self.n_children as usize
    }
}

impl Drop for FFI_ArrowArray {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            // SAFETY: The producer set `release` for this exact struct.
            unsafe { release(self) }
        }
    }
}
