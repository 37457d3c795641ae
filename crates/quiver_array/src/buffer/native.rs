use std::fmt::Debug;

use half::f16;

/// Fixed width plain values that can be stored in a [`Buffer`] and
/// reinterpreted from raw bytes.
///
/// # Safety
///
/// Implementors must have no padding bytes, no drop glue, and every bit
/// pattern of the right size must be a valid value.
///
/// [`Buffer`]: super::Buffer
pub unsafe trait Native: Debug + Default + Copy + PartialEq + Send + Sync + 'static {}

macro_rules! impl_native {
    ($($t:ty),*) => {
        $(unsafe impl Native for $t {})*
    };
}

impl_native!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f16, f32, f64);
