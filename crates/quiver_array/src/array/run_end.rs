use std::sync::Arc;

use quiver_error::{QuiverError, Result};
use tracing::trace;

use super::PrimitiveArray;
use crate::array_data::ArrayData;
use crate::buffer::Buffer;
use crate::datatype::DataType;
use crate::layout::{Layout, RunEndLayout, RunEnds};
use crate::offsets::offset_from_usize;
use crate::traits::{ArrowValue, DictionaryKey};

/// An owned run end encoded array.
///
/// Consecutive equal values are stored once, along with the logical position
/// their run ends at.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEndEncodedArray {
    data: ArrayData,
}

impl RunEndEncodedArray {
    /// Create an array from strictly increasing run ends and one value per
    /// run. The length is the last run end.
    pub fn try_new(run_ends: ArrayData, values: ArrayData) -> Result<Self> {
        let len = {
            let ends = RunEnds::try_new(&run_ends)?;
            match ends.len() {
                0 => 0,
                n => ends.run_end(n - 1),
            }
        };
        let data = ArrayData::try_new(
            DataType::RunEndEncoded,
            len,
            None,
            Vec::new(),
            vec![Arc::new(run_ends), Arc::new(values)],
        )?;
        Ok(RunEndEncodedArray { data })
    }

    /// Run end encode nullable values.
    ///
    /// Consecutive nulls form a single null run. Run ends are `Int32`.
    pub fn from_values<'b, V>(values: impl IntoIterator<Item = Option<&'b V>>) -> Result<Self>
    where
        V: ArrowValue + PartialEq + ?Sized + 'b,
    {
        let mut run_ends: Buffer<i32> = Buffer::new();
        let mut run_values = Vec::new();
        let mut len = 0;
        for value in values {
            let end = offset_from_usize::<i32>(len + 1)?;
            if run_values.last() == Some(&value) {
                if let Some(last) = run_ends.last_mut() {
                    *last = end;
                }
            } else {
                run_values.push(value);
                run_ends.push(end);
            }
            len += 1;
        }
        trace!(len, runs = run_values.len(), "built run end encoded array");

        let values = V::array_from_iter(run_values)?.into();
        Self::try_new(PrimitiveArray::new(run_ends, None).into(), values)
    }

    /// Take ownership of run end encoded data.
    ///
    /// Sliced data gets run ends rebased to the window and values trimmed to
    /// the runs it touches.
    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        if data.is_dictionary() {
            return Err(QuiverError::new(
                "Cannot read dictionary data as a run end encoded array",
            ));
        }
        if data.datatype() != &DataType::RunEndEncoded {
            return Err(QuiverError::new("Expected run end encoded data")
                .with_field("datatype", data.datatype()));
        }
        data.validate()?;

        let run_ends = data.child(0)?;
        let covered = {
            let ends = RunEnds::try_new(run_ends)?;
            match ends.len() {
                0 => 0,
                n => ends.run_end(n - 1),
            }
        };
        if data.offset() == 0 && covered == data.len() {
            return Ok(RunEndEncodedArray { data });
        }

        let (run_ends, first, count) = match run_ends.datatype() {
            DataType::Int16 => rebase_run_ends::<i16>(&data)?,
            DataType::Int32 => rebase_run_ends::<i32>(&data)?,
            DataType::Int64 => rebase_run_ends::<i64>(&data)?,
            other => {
                return Err(QuiverError::new("Run ends must be Int16, Int32, or Int64")
                    .with_field("datatype", other))
            }
        };
        let values = data.child(1)?.slice(first, count);
        let mut arr = Self::try_new(run_ends, values)?;
        arr.data.set_field_info_from(&data);
        Ok(arr)
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

    pub fn num_runs(&self) -> usize {
        self.run_ends().len()
    }

    /// Exclusive end of every run.
    pub fn run_ends(&self) -> &ArrayData {
        &self.data.children()[0]
    }

    /// One value per run.
    pub fn values(&self) -> &ArrayData {
        &self.data.children()[1]
    }

    /// Read the array with `V` as the value layout.
    pub fn layout<'a, V: Layout<'a>>(&'a self) -> Result<RunEndLayout<'a, V>> {
        RunEndLayout::try_new(&self.data)
    }
}

impl From<RunEndEncodedArray> for ArrayData {
    fn from(arr: RunEndEncodedArray) -> Self {
        arr.data
    }
}

/// Run ends for the runs overlapping the data's window, relative to the
/// window start. Also returns the first run and the number of runs kept.
fn rebase_run_ends<R: DictionaryKey>(data: &ArrayData) -> Result<(ArrayData, usize, usize)> {
    let child = data.child(0)?;
    let all: &[R] = child.buffer_as(0)?;
    let ends: Vec<usize> = all[child.offset()..child.offset() + child.len()]
        .iter()
        .map(|end| end.as_index().unwrap_or(0))
        .collect();

    let start = data.offset();
    let end = start + data.len();
    let first = ends.partition_point(|&e| e <= start);
    let last = ends.partition_point(|&e| e < end);
    let count = if data.is_empty() { 0 } else { last + 1 - first };

    let rebased = ends[first..first + count]
        .iter()
        .map(|&e| {
            R::try_from_index(e.min(end) - start)
                .ok_or_else(|| QuiverError::new("Run end doesn't fit the run end type"))
        })
        .collect::<Result<Buffer<R>>>()?;
    Ok((PrimitiveArray::new(rebased, None).into(), first, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Utf8Array;
    use crate::layout::{PrimitiveLayout, Utf8Layout};
    use crate::testutil::assert_arrays_eq;

    #[test]
    fn encode_runs() {
        let arr =
            RunEndEncodedArray::from_values::<i32>([Some(&1), Some(&1), None, None, Some(&1)])
                .unwrap();
        assert_eq!(5, arr.len());
        assert_eq!(3, arr.num_runs());
        assert_eq!(&[2, 4, 5], arr.run_ends().buffer_as::<i32>(0).unwrap());

        let layout = arr.layout::<PrimitiveLayout<i32>>().unwrap();
        let got: Vec<_> = layout.iter().map(|v| v.into_option()).collect();
        assert_eq!(vec![Some(1), Some(1), None, None, Some(1)], got);
        assert_eq!(2, layout.null_count());
    }

    #[test]
    fn encode_empty() {
        let arr = RunEndEncodedArray::from_values::<str>([]).unwrap();
        assert!(arr.is_empty());
        assert_eq!(0, arr.num_runs());
    }

    #[test]
    fn invalid_run_ends() {
        let values = || Utf8Array::from_values(["a", "b"]).unwrap().into_data();

        // Not increasing.
        let ends = PrimitiveArray::<i32>::from_iter([3, 3]).into();
        RunEndEncodedArray::try_new(ends, values()).unwrap_err();

        // Length mismatch with values.
        let ends = PrimitiveArray::<i32>::from_iter([3]).into();
        RunEndEncodedArray::try_new(ends, values()).unwrap_err();

        // Nulls aren't allowed.
        let ends = PrimitiveArray::<i64>::from_nullable_iter([Some(1), None]).into();
        RunEndEncodedArray::try_new(ends, values()).unwrap_err();

        // Unsigned run ends aren't allowed.
        let ends = PrimitiveArray::<u32>::from_iter([1, 2]).into();
        RunEndEncodedArray::try_new(ends, values()).unwrap_err();
    }

    #[test]
    fn compact_sliced() {
        let ends = PrimitiveArray::<i16>::from_iter([2, 5, 6]).into();
        let values = Utf8Array::from_values(["x", "y", "z"]).unwrap().into();
        let arr = RunEndEncodedArray::try_new(ends, values).unwrap();

        let sliced = arr.data().slice(3, 2);
        let compact = RunEndEncodedArray::try_from_data(sliced.clone()).unwrap();
        assert_eq!(0, compact.data().offset());
        assert_eq!(1, compact.num_runs());
        assert_eq!(&[2], compact.run_ends().buffer_as::<i16>(0).unwrap());
        assert_arrays_eq(&sliced, compact.data());

        let sliced = arr.data().slice(1, 5);
        let compact = RunEndEncodedArray::try_from_data(sliced.clone()).unwrap();
        assert_eq!(&[1, 4, 5], compact.run_ends().buffer_as::<i16>(0).unwrap());
        let layout = compact.layout::<Utf8Layout>().unwrap();
        assert_eq!(Some("x"), layout.get(0).into_option());
        assert_eq!(Some("z"), layout.get(4).into_option());
        assert_arrays_eq(&sliced, compact.data());

        let empty = RunEndEncodedArray::try_from_data(arr.data().slice(2, 0)).unwrap();
        assert!(empty.is_empty());
        assert_eq!(0, empty.num_runs());
    }

    #[test]
    fn run_ends_past_length_are_trimmed() {
        // Last run end past the length is allowed and compacted away.
        let ends = PrimitiveArray::<i32>::from_iter([2, 10]).into();
        let values = Utf8Array::from_values(["a", "b"]).unwrap().into();
        let arr = RunEndEncodedArray::try_new(ends, values).unwrap();
        let window = arr.data().slice(0, 4);
        let compact = RunEndEncodedArray::try_from_data(window).unwrap();
        assert_eq!(&[2, 4], compact.run_ends().buffer_as::<i32>(0).unwrap());
        assert_eq!(4, compact.len());
    }
}
