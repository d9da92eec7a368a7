//! Readers and writers bound to a table column or a constant.

use std::path::PathBuf;

use serde::Serialize;

use super::{Processed, Reader, Writer};
use crate::error::SlideSetError;
use crate::report::RunLog;
use crate::table::{Table, Value};

/// A reader bound to one table column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnBoundReader {
    pub reader: Reader,
    pub column: usize,
}

impl ColumnBoundReader {
    pub fn new(reader: Reader, column: usize) -> Self {
        Self { reader, column }
    }

    /// Reads the bound column's cell in `row`.
    ///
    /// An empty cell is [`SlideSetError::DataUnavailable`].
    pub fn read(&self, table: &Table, row: usize, log: &mut RunLog) -> Result<Processed, SlideSetError> {
        let value = table.underlying_value(self.column, row)?;
        if value.is_empty() {
            let name = table.column(self.column).map_or("?", |c| c.name.as_str());
            return Err(SlideSetError::DataUnavailable {
                path: PathBuf::from(format!("<empty cell {name}[{row}]>")),
            });
        }
        self.reader.read(value, table, log)
    }
}

/// A writer bound to one table column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnBoundWriter {
    pub writer: Writer,
    pub column: usize,
}

impl ColumnBoundWriter {
    pub fn new(writer: Writer, column: usize) -> Self {
        Self { writer, column }
    }

    /// Writes `data` and stores the resulting value in the bound cell.
    pub fn write(&self, table: &mut Table, row: usize, data: &Processed) -> Result<(), SlideSetError> {
        let value = self.writer.write(data, table, self.column, row)?;
        table.set_underlying_value(self.column, row, value)
    }
}

/// A reader and writer sharing one column, for in-place edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnReadWritePair {
    pub reader: ColumnBoundReader,
    pub writer: ColumnBoundWriter,
}

/// A literal value standing in for a column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConstantElement {
    pub value: Value,
    pub mime: Option<String>,
    pub reader: Reader,
}

impl ConstantElement {
    pub fn new(value: Value, mime: Option<String>, reader: Reader) -> Self {
        Self {
            value,
            mime,
            reader,
        }
    }

    /// Reads the constant; file links resolve against the table's base
    /// directory.
    pub fn read(&self, table: &Table, log: &mut RunLog) -> Result<Processed, SlideSetError> {
        self.reader.read(&self.value, table, log)
    }
}

/// Where a command input comes from.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum BoundInput {
    Column(ColumnBoundReader),
    Constant(ConstantElement),
}

impl BoundInput {
    /// Reads the input's value for `row`.
    pub fn read(&self, table: &Table, row: usize, log: &mut RunLog) -> Result<Processed, SlideSetError> {
        match self {
            BoundInput::Column(bound) => bound.read(table, row, log),
            BoundInput::Constant(constant) => constant.read(table, log),
        }
    }

    pub fn reader(&self) -> Reader {
        match self {
            BoundInput::Column(bound) => bound.reader,
            BoundInput::Constant(constant) => constant.reader,
        }
    }

    /// The bound column, if any.
    pub fn column(&self) -> Option<usize> {
        match self {
            BoundInput::Column(bound) => Some(bound.column),
            BoundInput::Constant(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnDescriptor, ElementKind};

    #[test]
    fn bound_reader_reports_empty_cells_as_unavailable() {
        let mut table = Table::new("t", ".");
        table.add_column(ColumnDescriptor::new("n", ElementKind::Integer));
        table.add_row();
        let bound = ColumnBoundReader::new(Reader::IntegerValue, 0);
        let mut log = RunLog::new();

        let err = bound.read(&table, 0, &mut log).unwrap_err();
        assert!(matches!(err, SlideSetError::DataUnavailable { .. }));
        assert!(err.to_string().contains("n[0]"));

        table.set_underlying_value(0, 0, Value::Integer(4)).unwrap();
        assert_eq!(bound.read(&table, 0, &mut log).unwrap(), Processed::Integer(4));
    }

    #[test]
    fn bound_writer_stores_into_its_column() {
        let mut table = Table::new("t", ".");
        table.add_column(ColumnDescriptor::new("label", ElementKind::String));
        table.add_row();
        let bound = ColumnBoundWriter::new(Writer::DoubleArrayText, 0);
        bound
            .write(&mut table, 0, &Processed::DoubleArray(vec![0.5, 2.0]))
            .unwrap();
        assert_eq!(
            table.underlying_value(0, 0).unwrap(),
            &Value::String("0.5, 2".into())
        );
    }

    #[test]
    fn constant_input_ignores_row() {
        let table = Table::new("t", ".");
        let input = BoundInput::Constant(ConstantElement::new(
            Value::Boolean(true),
            None,
            Reader::BooleanValue,
        ));
        let mut log = RunLog::new();
        assert_eq!(input.read(&table, 99, &mut log).unwrap(), Processed::Boolean(true));
        assert_eq!(input.column(), None);
    }
}
