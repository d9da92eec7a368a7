//! The in-memory data table a batch run reads from and writes to.
//!
//! Every column stores underlying values of one [`ElementKind`], optionally
//! refined by a MIME type (for file links). Cells hold [`Value`]s; a cell
//! that was never set is [`Value::Empty`].

pub mod io_csv;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SlideSetError;

/// Storage shape of a column's cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Boolean,
    Integer,
    Double,
    String,
    FileLink,
}

impl ElementKind {
    /// Short tag used in CSV headers.
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Boolean => "bool",
            ElementKind::Integer => "int",
            ElementKind::Double => "double",
            ElementKind::String => "string",
            ElementKind::FileLink => "file",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Some(ElementKind::Boolean),
            "int" | "integer" => Some(ElementKind::Integer),
            "double" | "float" => Some(ElementKind::Double),
            "string" | "text" => Some(ElementKind::String),
            "file" | "filelink" => Some(ElementKind::FileLink),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// An underlying cell value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    FileLink(PathBuf),
    #[default]
    Empty,
}

impl Value {
    /// The element kind of this value; `None` for [`Value::Empty`].
    pub fn kind(&self) -> Option<ElementKind> {
        match self {
            Value::Boolean(_) => Some(ElementKind::Boolean),
            Value::Integer(_) => Some(ElementKind::Integer),
            Value::Double(_) => Some(ElementKind::Double),
            Value::String(_) => Some(ElementKind::String),
            Value::FileLink(_) => Some(ElementKind::FileLink),
            Value::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Parses cell text as a value of `kind`. Empty text is [`Value::Empty`].
    pub fn parse(kind: ElementKind, text: &str) -> Result<Value, String> {
        if text.is_empty() {
            return Ok(Value::Empty);
        }
        let trimmed = text.trim();
        match kind {
            ElementKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(format!("'{text}' is not a boolean")),
            },
            ElementKind::Integer => trimmed
                .parse()
                .map(Value::Integer)
                .map_err(|e| format!("'{text}' is not an integer: {e}")),
            ElementKind::Double => trimmed
                .parse()
                .map(Value::Double)
                .map_err(|e| format!("'{text}' is not a number: {e}")),
            ElementKind::String => Ok(Value::String(text.to_string())),
            ElementKind::FileLink => Ok(Value::FileLink(PathBuf::from(trimmed))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::FileLink(v) => write!(f, "{}", v.display()),
            Value::Empty => Ok(()),
        }
    }
}

/// Kind, MIME type and name of one column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Column {
    descriptor: ColumnDescriptor,
    cells: Vec<Value>,
}

/// A named table of typed columns.
///
/// Relative file links resolve against `base_dir`.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub name: String,
    pub base_dir: PathBuf,
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base_dir: base_dir.into(),
            columns: Vec::new(),
            rows: 0,
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index).map(|c| &c.descriptor)
    }

    /// All column descriptors, in column order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().map(|c| &c.descriptor)
    }

    /// Position of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.descriptor.name == name)
    }

    /// Appends a column filled with empty cells and returns its index.
    pub fn add_column(&mut self, descriptor: ColumnDescriptor) -> usize {
        self.columns.push(Column {
            descriptor,
            cells: vec![Value::Empty; self.rows],
        });
        self.columns.len() - 1
    }

    /// Appends an empty row and returns its index.
    pub fn add_row(&mut self) -> usize {
        for column in &mut self.columns {
            column.cells.push(Value::Empty);
        }
        self.rows += 1;
        self.rows - 1
    }

    pub fn remove_row(&mut self, row: usize) -> Result<(), SlideSetError> {
        self.check_row(row)?;
        for column in &mut self.columns {
            column.cells.remove(row);
        }
        self.rows -= 1;
        Ok(())
    }

    pub fn underlying_value(&self, column: usize, row: usize) -> Result<&Value, SlideSetError> {
        let col = self.column_ref(column)?;
        self.check_row(row)?;
        Ok(&col.cells[row])
    }

    /// Stores one cell; the value must match the column's kind or be empty.
    pub fn set_underlying_value(
        &mut self,
        column: usize,
        row: usize,
        value: Value,
    ) -> Result<(), SlideSetError> {
        self.check_cell(column, row, &value)?;
        self.columns[column].cells[row] = value;
        Ok(())
    }

    /// Stores `values[i]` into `rows[i]` of one column.
    ///
    /// Nothing is written unless every row and value is valid.
    pub fn set_underlying_values(
        &mut self,
        column: usize,
        rows: &[usize],
        values: Vec<Value>,
    ) -> Result<(), SlideSetError> {
        if rows.len() != values.len() {
            return Err(SlideSetError::LengthMismatch {
                expected: rows.len(),
                actual: values.len(),
            });
        }
        for (row, value) in rows.iter().zip(&values) {
            self.check_cell(column, *row, value)?;
        }
        let cells = &mut self.columns[column].cells;
        for (row, value) in rows.iter().zip(values) {
            cells[*row] = value;
        }
        Ok(())
    }

    /// Absolute path of a file-link value; `None` for other kinds.
    pub fn resolve_path(&self, value: &Value) -> Option<PathBuf> {
        match value {
            Value::FileLink(path) => Some(resolve_against(&self.base_dir, path)),
            _ => None,
        }
    }

    fn column_ref(&self, column: usize) -> Result<&Column, SlideSetError> {
        self.columns.get(column).ok_or_else(|| {
            SlideSetError::StructuralMismatch(format!(
                "table '{}' has no column {} ({} column(s))",
                self.name,
                column,
                self.columns.len()
            ))
        })
    }

    fn check_row(&self, row: usize) -> Result<(), SlideSetError> {
        if row < self.rows {
            Ok(())
        } else {
            Err(SlideSetError::RowOutOfRange {
                row,
                rows: self.rows,
            })
        }
    }

    fn check_cell(&self, column: usize, row: usize, value: &Value) -> Result<(), SlideSetError> {
        let col = self.column_ref(column)?;
        self.check_row(row)?;
        match value.kind() {
            Some(kind) if kind != col.descriptor.kind => {
                Err(SlideSetError::StructuralMismatch(format!(
                    "column '{}' stores {} values, got {}",
                    col.descriptor.name, col.descriptor.kind, kind
                )))
            }
            _ => Ok(()),
        }
    }
}

pub(crate) fn resolve_against(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
