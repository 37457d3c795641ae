//! Assertions for tests.

use crate::array_data::ArrayData;
use crate::layout::{ArrayView, Layout};

/// Assert two arrays hold the same values.
///
/// Only the data type, length and logical values are compared. Offsets,
/// buffer capacity and whether a validity bitmap is present don't matter.
#[track_caller]
pub fn assert_arrays_eq(expected: &ArrayData, got: &ArrayData) {
    assert_eq!(expected.datatype(), got.datatype(), "data types differ");
    assert_eq!(expected.len(), got.len(), "lengths differ");

    let expected = match ArrayView::try_new(expected) {
        Ok(view) => view,
        Err(e) => panic!("invalid expected array: {e}"),
    };
    let got = match ArrayView::try_new(got) {
        Ok(view) => view,
        Err(e) => panic!("invalid array: {e}"),
    };
    for idx in 0..expected.len() {
        assert_eq!(expected.get(idx), got.get(idx), "values differ at index {idx}");
    }
}
