use hashbrown::HashMap;
use quiver_error::{QuiverError, Result};

use crate::array::{Array, StructArray};
use crate::array_data::ArrayData;
use crate::nullable::Nullable;
use crate::scalar::ScalarValue;

/// A batch of named, same-length columns.
///
/// Column names are unique. A batch converts to and from a struct array whose
/// fields carry the column names, which is how it crosses the C data
/// interface.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    name: Option<String>,
    names: Vec<String>,
    columns: Vec<Array>,
    /// Column index by name.
    index: HashMap<String, usize>,
    /// Length of the first column, zero with no columns.
    num_rows: usize,
}

impl RecordBatch {
    pub fn empty() -> Self {
        RecordBatch {
            name: None,
            names: Vec::new(),
            columns: Vec::new(),
            index: HashMap::new(),
            num_rows: 0,
        }
    }

    /// Create a batch from column names and columns, paired in order.
    pub fn try_new<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        columns: impl IntoIterator<Item = Array>,
    ) -> Result<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let columns: Vec<Array> = columns.into_iter().collect();
        if names.len() != columns.len() {
            return Err(QuiverError::new("Number of names and columns differ")
                .with_field("names", names.len())
                .with_field("columns", columns.len()));
        }

        let mut batch = Self::empty();
        for (name, column) in names.into_iter().zip(columns) {
            batch.add_column(name, column)?;
        }
        Ok(batch)
    }

    /// Create a batch from columns named through their field names.
    pub fn try_from_columns(columns: impl IntoIterator<Item = Array>) -> Result<Self> {
        let mut batch = Self::empty();
        for column in columns {
            batch.add_named_column(column)?;
        }
        Ok(batch)
    }

    /// Create a batch from the fields of a struct array.
    ///
    /// Fields must be named. The struct's name becomes the batch name. A
    /// struct with null rows is rejected since a batch has no row validity.
    pub fn try_from_struct(arr: StructArray) -> Result<Self> {
        if arr.data().null_count() > 0 {
            return Err(QuiverError::new("Cannot make a record batch from a struct with nulls")
                .with_field("nulls", arr.data().null_count()));
        }
        let mut batch = Self::empty();
        batch.name = arr.data().name().map(str::to_owned);
        for idx in 0..arr.num_fields() {
            let field = arr
                .field(idx)
                .ok_or_else(|| QuiverError::new("Missing struct field").with_field("idx", idx))?;
            batch.add_named_column(Array::try_from_data(field.clone())?)?;
        }
        Ok(batch)
    }

    /// Read a batch out of struct data, such as data imported through the C
    /// data interface.
    pub fn try_from_data(data: ArrayData) -> Result<Self> {
        Self::try_from_struct(StructArray::try_from_data(data)?)
    }

    /// Convert into a struct array with one named field per column.
    ///
    /// An empty batch becomes an empty struct.
    pub fn into_struct_array(self) -> Result<StructArray> {
        let fields = self
            .names
            .into_iter()
            .zip(self.columns)
            .map(|(name, column)| column.into_data().with_name(name))
            .collect();
        let arr = StructArray::try_new(fields, None)?;
        match self.name {
            Some(name) => StructArray::try_from_data(arr.into_data().with_name(name)),
            None => Ok(arr),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Append a column.
    ///
    /// Errors if the name is taken or the length doesn't match the other
    /// columns.
    pub fn add_column(&mut self, name: impl Into<String>, column: Array) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(QuiverError::new("Duplicate column name").with_field("name", name));
        }
        if !self.columns.is_empty() && column.len() != self.num_rows {
            return Err(QuiverError::new("Column length doesn't match the batch")
                .with_field("name", name)
                .with_field("expected", self.num_rows)
                .with_field("got", column.len()));
        }

        self.num_rows = column.len();
        self.index.insert(name.clone(), self.columns.len());
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Append a column named by its field name.
    pub fn add_named_column(&mut self, column: Array) -> Result<()> {
        let name = column
            .name()
            .ok_or_else(|| {
                QuiverError::new("Column has no name").with_field("idx", self.columns.len())
            })?
            .to_owned();
        self.add_column(name, column)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    pub fn column(&self, idx: usize) -> Option<&Array> {
        self.columns.get(idx)
    }

    pub fn column_by_name(&self, name: &str) -> Result<&Array> {
        self.index
            .get(name)
            .map(|&idx| &self.columns[idx])
            .ok_or_else(|| QuiverError::new("Column not found").with_field("name", name))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[Array] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Array> {
        self.columns
    }

    /// Get the values of every column at row `idx`.
    pub fn row(&self, idx: usize) -> Result<Option<Vec<Nullable<ScalarValue<'_>>>>> {
        if idx >= self.num_rows {
            return Ok(None);
        }
        let row = self
            .columns
            .iter()
            .map(|col| col.scalar(idx))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(row))
    }

    /// Rows `offset..offset + count` of every column, compacted.
    pub fn slice(&self, offset: usize, count: usize) -> Result<Self> {
        if offset + count > self.num_rows {
            return Err(QuiverError::new("Slice out of bounds")
                .with_field("end", offset + count)
                .with_field("num_rows", self.num_rows));
        }
        let columns = self
            .columns
            .iter()
            .map(|col| Array::try_from_data(col.data().slice(offset, count)))
            .collect::<Result<Vec<_>>>()?;
        Ok(RecordBatch {
            name: self.name.clone(),
            names: self.names.clone(),
            columns,
            index: self.index.clone(),
            num_rows: count,
        })
    }
}

impl Default for RecordBatch {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<StructArray> for RecordBatch {
    type Error = QuiverError;

    fn try_from(arr: StructArray) -> Result<Self> {
        Self::try_from_struct(arr)
    }
}

impl TryFrom<RecordBatch> for StructArray {
    type Error = QuiverError;

    fn try_from(batch: RecordBatch) -> Result<Self> {
        batch.into_struct_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{BooleanArray, PrimitiveArray, Utf8Array};
    use crate::bitmap::Bitmap;
    use crate::ffi::{export_array, import_array};
    use crate::testutil::assert_arrays_eq;

    fn batch() -> RecordBatch {
        RecordBatch::try_new(
            ["id", "label"],
            [
                Array::Int32(PrimitiveArray::from_iter([1, 2, 3])),
                Array::Utf8(Utf8Array::from_nullable_iter([Some("a"), None, Some("c")]).unwrap()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn accessors() {
        let batch = batch();
        assert_eq!(2, batch.num_columns());
        assert_eq!(3, batch.num_rows());
        assert!(batch.contains_column("label"));
        assert!(!batch.contains_column("missing"));
        assert_eq!(Some("label"), batch.column_name(1));
        assert_eq!(None, batch.column_name(2));
        assert_eq!(&["id".to_string(), "label".to_string()], batch.names());

        let label = batch.column_by_name("label").unwrap();
        assert_eq!(Some(&batch.columns()[1]), batch.column(1));
        assert_eq!(1, label.null_count().unwrap());
        batch.column_by_name("missing").unwrap_err();
    }

    #[test]
    fn rows() {
        let batch = batch();
        let row = batch.row(2).unwrap().unwrap();
        assert_eq!(Nullable::new(ScalarValue::Int32(3)), row[0]);
        assert_eq!(Nullable::new(ScalarValue::Utf8("c")), row[1]);
        assert!(batch.row(1).unwrap().unwrap()[1].is_null());
        assert!(batch.row(3).unwrap().is_none());
    }

    #[test]
    fn inconsistent_columns() {
        let res = RecordBatch::try_new(
            ["a", "a"],
            [
                Array::Boolean(BooleanArray::from_iter([true])),
                Array::Boolean(BooleanArray::from_iter([false])),
            ],
        );
        res.unwrap_err();

        let res = RecordBatch::try_new(
            ["a", "b"],
            [
                Array::Boolean(BooleanArray::from_iter([true])),
                Array::Boolean(BooleanArray::from_iter([true, false])),
            ],
        );
        res.unwrap_err();

        let res = RecordBatch::try_new(["a"], Vec::<Array>::new());
        res.unwrap_err();
    }

    #[test]
    fn add_columns() {
        let mut batch = RecordBatch::empty();
        assert_eq!(0, batch.num_rows());

        batch
            .add_column("x", Array::UInt8(PrimitiveArray::from_iter([1, 2])))
            .unwrap();
        assert_eq!(2, batch.num_rows());
        batch
            .add_column("x", Array::UInt8(PrimitiveArray::from_iter([3, 4])))
            .unwrap_err();

        let named = PrimitiveArray::<u8>::from_iter([5, 6]).into_data().with_name("y");
        batch.add_named_column(Array::try_from_data(named).unwrap()).unwrap();
        assert_eq!(Some("y"), batch.column_name(1));

        let unnamed = Array::UInt8(PrimitiveArray::from_iter([7, 8]));
        batch.add_named_column(unnamed).unwrap_err();
        assert_eq!(2, batch.num_columns());
    }

    #[test]
    fn struct_conversion() {
        let batch = batch().with_name("people");
        let arr = batch.clone().into_struct_array().unwrap();
        assert_eq!(Some("people"), arr.data().name());
        assert_eq!(Some("label"), arr.field(1).unwrap().name());

        let back = RecordBatch::try_from(arr).unwrap();
        assert_eq!(Some("people"), back.name());
        assert_eq!(batch.names(), back.names());
        assert_arrays_eq(batch.columns()[1].data(), back.columns()[1].data());

        let nulls = StructArray::try_new(
            vec![PrimitiveArray::<i32>::from_iter([1, 2]).into_data().with_name("a")],
            Some(Bitmap::from_bool_iter([true, false])),
        )
        .unwrap();
        RecordBatch::try_from_struct(nulls).unwrap_err();
    }

    #[test]
    fn slice_rows() {
        let sliced = batch().slice(1, 2).unwrap();
        assert_eq!(2, sliced.num_rows());
        assert_eq!(0, sliced.columns()[0].data().offset());
        let row = sliced.row(0).unwrap().unwrap();
        assert_eq!(Nullable::new(ScalarValue::Int32(2)), row[0]);
        assert!(batch().slice(2, 2).is_err());
    }

    #[test]
    fn c_data_interface_round_trip() {
        logutil::init_test();

        let batch = batch().with_name("people");
        let (array, schema) = export_array(batch.clone().into_struct_array().unwrap().into_data());
        let imported = unsafe { import_array(array, &schema) }.unwrap();
        assert_eq!(Some("people"), imported.name());

        let got = RecordBatch::try_from_data(imported.to_array_data().unwrap()).unwrap();
        assert_eq!(batch.names(), got.names());
        assert_eq!(Some("people"), got.name());
        for (expected, got) in batch.columns().iter().zip(got.columns()) {
            assert_arrays_eq(expected.data(), got.data());
        }
    }
}
