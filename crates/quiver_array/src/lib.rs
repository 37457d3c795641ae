//! Arrow compatible columnar arrays.
//!
//! Storage is built bottom up: aligned [`buffer`]s and [`bitmap`]s hold the
//! bytes, [`array_data::ArrayData`] ties buffers, children and dictionaries
//! together, [`layout`]s read typed values out of it, and [`array`]s own and
//! mutate it. [`record_batch::RecordBatch`] groups named columns, and [`ffi`]
//! moves arrays, field names, and [`metadata`] across the C data interface.
pub mod array;
pub mod array_data;
pub mod bitmap;
pub mod buffer;
pub mod datatype;
pub mod ffi;
pub mod layout;
pub mod metadata;
pub mod nullable;
pub mod offsets;
pub mod record_batch;
pub mod scalar;
pub mod testutil;
pub mod traits;
