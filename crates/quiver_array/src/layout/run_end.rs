use once_cell::unsync::OnceCell;
use quiver_error::{QuiverError, Result};

use super::{Layout, LayoutIter, PrimitiveLayout};
use crate::array_data::ArrayData;
use crate::datatype::DataType;
use crate::traits::DictionaryKey;

/// Run ends of any supported width, chosen at runtime.
#[derive(Debug, Clone, Copy)]
pub enum RunEnds<'a> {
    Int16(PrimitiveLayout<'a, i16>),
    Int32(PrimitiveLayout<'a, i32>),
    Int64(PrimitiveLayout<'a, i64>),
}

impl<'a> RunEnds<'a> {
    pub fn try_new(data: &'a ArrayData) -> Result<Self> {
        Ok(match data.datatype() {
            DataType::Int16 => Self::Int16(PrimitiveLayout::try_new(data)?),
            DataType::Int32 => Self::Int32(PrimitiveLayout::try_new(data)?),
            DataType::Int64 => Self::Int64(PrimitiveLayout::try_new(data)?),
            other => {
                return Err(QuiverError::new("Run ends must be Int16, Int32, or Int64")
                    .with_field("datatype", other))
            }
        })
    }

    /// Number of runs.
    pub fn len(&self) -> usize {
        match self {
            Self::Int16(ends) => ends.len(),
            Self::Int32(ends) => ends.len(),
            Self::Int64(ends) => ends.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exclusive logical end of run `run`.
    pub fn run_end(&self, run: usize) -> usize {
        match self {
            Self::Int16(ends) => ends.value(run).as_index().unwrap_or(0),
            Self::Int32(ends) => ends.value(run).as_index().unwrap_or(0),
            Self::Int64(ends) => ends.value(run).as_index().unwrap_or(0),
        }
    }

    /// Index of the run containing logical position `pos`.
    ///
    /// Returns `len()` if `pos` is past the last run.
    pub fn find_run(&self, pos: usize) -> usize {
        match self {
            Self::Int16(ends) => upper_bound(ends.values(), pos),
            Self::Int32(ends) => upper_bound(ends.values(), pos),
            Self::Int64(ends) => upper_bound(ends.values(), pos),
        }
    }
}

/// First run whose end is past `pos`.
fn upper_bound<R: DictionaryKey>(ends: &[R], pos: usize) -> usize {
    ends.partition_point(|end| end.as_index().unwrap_or(0) <= pos)
}

/// Layout over run end encoded data.
///
/// Logical position `offset + i` is the value of the first run whose end is
/// greater than it. Run end encoded data has no validity of its own, a
/// position is null when its run's value is null.
#[derive(Debug, Clone)]
pub struct RunEndLayout<'a, V> {
    data: &'a ArrayData,
    run_ends: RunEnds<'a>,
    values: V,
    /// Effective null count, computed on first request.
    null_count: OnceCell<usize>,
}

impl<'a, V: Layout<'a>> RunEndLayout<'a, V> {
    pub fn run_ends(&self) -> &RunEnds<'a> {
        &self.run_ends
    }

    /// Layout over one value per run.
    pub fn values(&self) -> &V {
        &self.values
    }

    /// Index into the values for the element at `idx`.
    pub fn physical_index(&self, idx: usize) -> usize {
        assert!(
            idx < self.len(),
            "index {idx} out of bounds for array of length {}",
            self.len()
        );
        self.run_ends.find_run(self.data.offset() + idx)
    }

    fn count_nulls(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let start = self.data.offset();
        let end = start + self.len();
        let mut run = self.run_ends.find_run(start);
        let mut pos = start;
        let mut nulls = 0;
        while pos < end {
            let run_end = self.run_ends.run_end(run).min(end);
            if !self.values.is_valid(run) {
                nulls += run_end - pos;
            }
            pos = run_end;
            run += 1;
        }
        nulls
    }
}

impl<'a, V: Layout<'a>> Layout<'a> for RunEndLayout<'a, V> {
    type Value = V::Value;
    type Iter = LayoutIter<'a, Self>;

    fn try_new(data: &'a ArrayData) -> Result<Self> {
        if data.datatype() != &DataType::RunEndEncoded {
            return Err(QuiverError::new("Expected run end encoded data")
                .with_field("datatype", data.datatype()));
        }
        let run_ends = RunEnds::try_new(data.child(0)?)?;
        let values = V::try_new(data.child(1)?)?;
        if run_ends.len() != values.len() {
            return Err(QuiverError::new("Run ends and values must have the same length")
                .with_field("run_ends", run_ends.len())
                .with_field("values", values.len()));
        }
        let end = data.offset() + data.len();
        let covered = match run_ends.len() {
            0 => 0,
            n => run_ends.run_end(n - 1),
        };
        if covered < end {
            return Err(QuiverError::new("Run ends don't cover the array")
                .with_field("covered", covered)
                .with_field("required", end));
        }
        Ok(RunEndLayout {
            data,
            run_ends,
            values,
            null_count: OnceCell::new(),
        })
    }

    fn data(&self) -> &'a ArrayData {
        self.data
    }

    fn is_valid(&self, idx: usize) -> bool {
        self.values.is_valid(self.physical_index(idx))
    }

    fn null_count(&self) -> usize {
        *self.null_count.get_or_init(|| self.count_nulls())
    }

    fn value(&self, idx: usize) -> V::Value {
        self.values.value(self.physical_index(idx))
    }

    fn iter(&self) -> Self::Iter {
        LayoutIter::new(self.clone())
    }
}
