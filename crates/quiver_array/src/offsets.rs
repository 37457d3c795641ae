use quiver_error::{QuiverError, Result};

use crate::buffer::{Buffer, Native};
use crate::datatype::DataType;

/// Integer type used for offsets into data buffers and child arrays.
pub trait OffsetIndex: Native + Ord {
    const ZERO: Self;

    /// If this is the 64 bit offset width used by the large types.
    const LARGE: bool;

    const LIST_TYPE: DataType;

    /// Convert from a usize, returning None if the value doesn't fit.
    fn try_from_usize(v: usize) -> Option<Self>;

    fn as_usize(self) -> usize;
}

impl OffsetIndex for i32 {
    const ZERO: Self = 0;
    const LARGE: bool = false;
    const LIST_TYPE: DataType = DataType::List;

    fn try_from_usize(v: usize) -> Option<Self> {
        i32::try_from(v).ok()
    }

    fn as_usize(self) -> usize {
        self as usize
    }
}

impl OffsetIndex for i64 {
    const ZERO: Self = 0;
    const LARGE: bool = true;
    const LIST_TYPE: DataType = DataType::LargeList;

    fn try_from_usize(v: usize) -> Option<Self> {
        i64::try_from(v).ok()
    }

    fn as_usize(self) -> usize {
        self as usize
    }
}

/// Convert a usize to an offset, erroring on overflow.
pub fn offset_from_usize<O: OffsetIndex>(v: usize) -> Result<O> {
    O::try_from_usize(v)
        .ok_or_else(|| QuiverError::new("Offset overflows offset type").with_field("offset", v))
}

/// Compute offsets from a sequence of lengths with a prefix sum.
///
/// The output always has one more element than the input and starts at zero.
pub fn offsets_from_sizes<O, I>(sizes: I) -> Result<Buffer<O>>
where
    O: OffsetIndex,
    I: IntoIterator<Item = usize>,
{
    let sizes = sizes.into_iter();
    let mut offsets = Buffer::with_capacity(sizes.size_hint().0 + 1);
    offsets.push(O::ZERO);

    let mut total: usize = 0;
    for size in sizes {
        total = total
            .checked_add(size)
            .ok_or_else(|| QuiverError::new("Offset sum overflows"))?;
        offsets.push(offset_from_usize(total)?);
    }

    Ok(offsets)
}

/// Check that offsets start at a non-negative value and never decrease.
///
/// `max_end` bounds the last offset, e.g. the length of the data buffer.
pub fn validate_offsets<O: OffsetIndex>(offsets: &[O], max_end: usize) -> Result<()> {
    let first = match offsets.first() {
        Some(first) => *first,
        None => return Err(QuiverError::new("Offsets must contain at least one value")),
    };
    if first < O::ZERO {
        return Err(QuiverError::new("Offsets must not be negative"));
    }

    for (idx, window) in offsets.windows(2).enumerate() {
        if window[1] < window[0] {
            return Err(QuiverError::new("Offsets are not monotonic").with_field("idx", idx + 1));
        }
    }

    let last = offsets[offsets.len() - 1].as_usize();
    if last > max_end {
        return Err(QuiverError::new("Offset out of bounds")
            .with_field("offset", last)
            .with_field("max", max_end));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_to_offsets() {
        let offsets = offsets_from_sizes::<i32, _>([3, 0, 2, 5]).unwrap();
        assert_eq!(&[0, 3, 3, 5, 10], offsets.as_slice());

        for (idx, size) in [3, 0, 2, 5].iter().enumerate() {
            assert_eq!(*size as i32, offsets[idx + 1] - offsets[idx]);
        }
    }

    #[test]
    fn empty_sizes() {
        let offsets = offsets_from_sizes::<i64, _>([]).unwrap();
        assert_eq!(&[0], offsets.as_slice());

        let offsets = offsets_from_sizes::<i64, _>([0, 0]).unwrap();
        assert_eq!(&[0, 0, 0], offsets.as_slice());
    }

    #[test]
    fn offsets_overflow() {
        let _ = offsets_from_sizes::<i32, _>([i32::MAX as usize, 1]).unwrap_err();
    }

    #[test]
    fn validate() {
        validate_offsets::<i32>(&[0, 1, 1, 4], 4).unwrap();
        validate_offsets::<i32>(&[0, 2, 1], 4).unwrap_err();
        validate_offsets::<i32>(&[0, 5], 4).unwrap_err();
        validate_offsets::<i32>(&[-1, 0], 4).unwrap_err();
        validate_offsets::<i32>(&[], 4).unwrap_err();
    }
}
