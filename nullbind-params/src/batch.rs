//! Arrow parameter batches bound to parameterized statements.
//!
//! A parameter batch pairs a schema with one Arrow column per statement
//! placeholder. Fields are named `"0"`, `"1"`, ... in placeholder order, the
//! way ADBC drivers expect positional parameters to arrive.

use std::sync::Arc;

use arrow_array::builder::StringBuilder;
use arrow_array::{Array, ArrayRef, NullArray, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use nullbind_result::{Error, Result};

use crate::placeholders::count_placeholders;

/// Declared Arrow type of one parameter column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// UTF-8 text. Holds strings or typed nulls.
    Utf8,
    /// The "no type yet" marker (`DataType::Null`, nanoarrow `na`). Holds
    /// nulls only.
    Untyped,
}

impl ParamType {
    pub fn data_type(self) -> DataType {
        match self {
            ParamType::Utf8 => DataType::Utf8,
            ParamType::Untyped => DataType::Null,
        }
    }

    #[inline]
    pub fn is_untyped(self) -> bool {
        matches!(self, ParamType::Untyped)
    }
}

enum ColumnBuilder {
    Utf8(StringBuilder),
    Untyped { len: usize },
}

impl ColumnBuilder {
    fn new(ty: ParamType) -> Self {
        match ty {
            ParamType::Utf8 => ColumnBuilder::Utf8(StringBuilder::new()),
            ParamType::Untyped => ColumnBuilder::Untyped { len: 0 },
        }
    }

    fn check(&self, column: usize, value: Option<&str>) -> Result<()> {
        match (self, value) {
            (ColumnBuilder::Untyped { .. }, Some(text)) => Err(Error::InvalidArgumentError(
                format!("parameter {column} has no type and only accepts NULL, got '{text}'"),
            )),
            _ => Ok(()),
        }
    }

    fn append(&mut self, value: Option<&str>) {
        match self {
            ColumnBuilder::Utf8(builder) => builder.append_option(value),
            ColumnBuilder::Untyped { len } => *len += 1,
        }
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            ColumnBuilder::Utf8(builder) => Arc::new(builder.finish()),
            ColumnBuilder::Untyped { len } => Arc::new(NullArray::new(*len)),
        }
    }
}

/// Row-at-a-time builder for a [`ParamBatch`].
pub struct ParamBatchBuilder {
    types: Vec<ParamType>,
    columns: Vec<ColumnBuilder>,
    rows: usize,
}

impl ParamBatchBuilder {
    pub fn new(types: &[ParamType]) -> Self {
        Self {
            types: types.to_vec(),
            columns: types.iter().copied().map(ColumnBuilder::new).collect(),
            rows: 0,
        }
    }

    /// Append one row with a cell per declared column. `None` appends a null.
    ///
    /// The row is validated in full before any column is touched, so a
    /// rejected row leaves the builder unchanged.
    pub fn append_row(&mut self, row: &[Option<&str>]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidArgumentError(format!(
                "parameter row has {} values but {} columns are declared",
                row.len(),
                self.columns.len()
            )));
        }
        for (idx, (column, value)) in self.columns.iter().zip(row).enumerate() {
            column.check(idx, *value)?;
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.append(*value);
        }
        self.rows += 1;
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    /// Finalize the schema and columns into a batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgumentError`] when no columns are declared
    /// or no rows were appended.
    pub fn finish(mut self) -> Result<ParamBatch> {
        if self.types.is_empty() {
            return Err(Error::InvalidArgumentError(
                "parameter batch declares no columns".into(),
            ));
        }
        if self.rows == 0 {
            return Err(Error::InvalidArgumentError(
                "parameter batch has no rows".into(),
            ));
        }

        let fields: Vec<Field> = self
            .types
            .iter()
            .enumerate()
            .map(|(idx, ty)| Field::new(idx.to_string(), ty.data_type(), true))
            .collect();
        let columns: Vec<ArrayRef> = self.columns.iter_mut().map(ColumnBuilder::finish).collect();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;

        Ok(ParamBatch {
            batch,
            types: self.types,
        })
    }
}

/// A finished schema + batch pair ready to bind.
#[derive(Debug, Clone)]
pub struct ParamBatch {
    batch: RecordBatch,
    types: Vec<ParamType>,
}

impl ParamBatch {
    /// Build a single-row batch.
    pub fn single_row(types: &[ParamType], row: &[Option<&str>]) -> Result<Self> {
        let mut builder = ParamBatchBuilder::new(types);
        builder.append_row(row)?;
        builder.finish()
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_record_batch(self) -> RecordBatch {
        self.batch
    }

    pub fn types(&self) -> &[ParamType] {
        &self.types
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// True when any column carries the no-type marker.
    pub fn uses_untyped(&self) -> bool {
        self.types.iter().any(|ty| ty.is_untyped())
    }

    /// Number of null cells in each column.
    pub fn null_counts(&self) -> Vec<usize> {
        self.batch
            .columns()
            .iter()
            .map(|column| match column.data_type() {
                // NullArray reports no validity buffer; every slot is null.
                DataType::Null => column.len(),
                _ => column.null_count(),
            })
            .collect()
    }

    /// Ensure the batch supplies exactly one column per placeholder in `sql`.
    pub fn check_placeholders(&self, sql: &str) -> Result<()> {
        let expected = count_placeholders(sql)?;
        if expected != self.num_columns() {
            return Err(Error::InvalidArgumentError(format!(
                "statement declares {expected} placeholders but the parameter batch has {} columns",
                self.num_columns()
            )));
        }
        Ok(())
    }
}
