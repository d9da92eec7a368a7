//! Built-in element writers.

use std::path::PathBuf;

use serde::Serialize;

use super::{Processed, ProcessedType, MIME_PNG, MIME_REGION_SET};
use crate::error::SlideSetError;
use crate::raster::write_raster;
use crate::roi::io_binary::write_region_set;
use crate::table::{resolve_against, ElementKind, Table, Value};

/// Converts a processed value into an underlying cell value.
///
/// File writers store their data on disk. They overwrite the file the cell
/// already links to, or create `<column>-<row>.<ext>` in the table's base
/// directory when the cell is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Writer {
    BooleanValue,
    IntegerValue,
    /// Accepts any number and stores it as a double.
    DoubleValue,
    StringValue,
    /// Stores the integers as comma-separated text.
    IntegerArrayText,
    /// Stores the doubles as comma-separated text.
    DoubleArrayText,
    RegionSetFile,
    PngImage,
}

impl Writer {
    /// Every built-in writer, in registration order.
    pub const BUILTIN: [Writer; 8] = [
        Writer::BooleanValue,
        Writer::IntegerValue,
        Writer::DoubleValue,
        Writer::StringValue,
        Writer::IntegerArrayText,
        Writer::DoubleArrayText,
        Writer::RegionSetFile,
        Writer::PngImage,
    ];

    /// Lookup key of the writer.
    pub fn name(self) -> &'static str {
        match self {
            Writer::BooleanValue => "BooleanWriter",
            Writer::IntegerValue => "IntegerWriter",
            Writer::DoubleValue => "DoubleWriter",
            Writer::StringValue => "StringWriter",
            Writer::IntegerArrayText => "IntegerArrayWriter",
            Writer::DoubleArrayText => "DoubleArrayWriter",
            Writer::RegionSetFile => "RegionSetWriter",
            Writer::PngImage => "PngImageWriter",
        }
    }

    pub fn element_kind(self) -> ElementKind {
        match self {
            Writer::BooleanValue => ElementKind::Boolean,
            Writer::IntegerValue => ElementKind::Integer,
            Writer::DoubleValue => ElementKind::Double,
            Writer::StringValue | Writer::IntegerArrayText | Writer::DoubleArrayText => {
                ElementKind::String
            }
            Writer::RegionSetFile | Writer::PngImage => ElementKind::FileLink,
        }
    }

    pub fn mime_types(self) -> &'static [&'static str] {
        match self {
            Writer::RegionSetFile => &[MIME_REGION_SET],
            Writer::PngImage => &[MIME_PNG],
            _ => &[],
        }
    }

    /// Type of the values this writer accepts.
    pub fn processed_type(self) -> ProcessedType {
        match self {
            Writer::BooleanValue => ProcessedType::Boolean,
            Writer::IntegerValue => ProcessedType::Integer,
            Writer::DoubleValue => ProcessedType::Number,
            Writer::StringValue => ProcessedType::Text,
            Writer::IntegerArrayText => ProcessedType::IntegerArray,
            Writer::DoubleArrayText => ProcessedType::DoubleArray,
            Writer::RegionSetFile => ProcessedType::RegionSet,
            Writer::PngImage => ProcessedType::Image,
        }
    }

    /// File extension of generated files, for file writers.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Writer::RegionSetFile => Some("roiset"),
            Writer::PngImage => Some("png"),
            _ => None,
        }
    }

    /// Column descriptor MIME for a new output column of this writer.
    pub fn default_mime(self) -> Option<&'static str> {
        self.mime_types().first().copied()
    }

    /// Returns true if a column of this kind and MIME type can hold the
    /// writer's output.
    pub fn accepts(self, kind: ElementKind, mime: Option<&str>) -> bool {
        if kind != self.element_kind() {
            return false;
        }
        let mimes = self.mime_types();
        mimes.is_empty() || mime.is_some_and(|m| mimes.contains(&m))
    }

    /// Writes `data` for the cell at (`column`, `row`) of `table` and
    /// returns the value to store there.
    pub fn write(
        self,
        data: &Processed,
        table: &Table,
        column: usize,
        row: usize,
    ) -> Result<Value, SlideSetError> {
        match (self, data) {
            (Writer::BooleanValue, Processed::Boolean(v)) => Ok(Value::Boolean(*v)),
            (Writer::IntegerValue, Processed::Integer(v)) => Ok(Value::Integer(*v)),
            (Writer::DoubleValue, Processed::Double(v)) => Ok(Value::Double(*v)),
            (Writer::DoubleValue, Processed::Integer(v)) => Ok(Value::Double(*v as f64)),
            (Writer::StringValue, Processed::Text(v)) => Ok(Value::String(v.clone())),
            (Writer::IntegerArrayText, Processed::IntegerArray(v)) => Ok(Value::String(join(v))),
            (Writer::DoubleArrayText, Processed::DoubleArray(v)) => Ok(Value::String(join(v))),
            (Writer::RegionSetFile, Processed::RegionSet(regions)) => {
                let (link, path) = self.target_file(table, column, row)?;
                write_region_set(&path, regions)?;
                Ok(Value::FileLink(link))
            }
            (Writer::PngImage, Processed::Image(raster)) => {
                let (link, path) = self.target_file(table, column, row)?;
                write_raster(&path, raster)?;
                Ok(Value::FileLink(link))
            }
            (_, other) => Err(SlideSetError::StructuralMismatch(format!(
                "{} cannot write a {} value",
                self.name(),
                other.processed_type()
            ))),
        }
    }

    /// The link to store and the resolved path to write.
    fn target_file(
        self,
        table: &Table,
        column: usize,
        row: usize,
    ) -> Result<(PathBuf, PathBuf), SlideSetError> {
        if let Value::FileLink(existing) = table.underlying_value(column, row)? {
            return Ok((existing.clone(), resolve_against(&table.base_dir, existing)));
        }
        let name = table.column(column).map_or("output", |c| c.name.as_str());
        let ext = self.extension().unwrap_or("bin");
        let link = PathBuf::from(format!("{}-{}.{}", sanitize(name), row, ext));
        let path = table.base_dir.join(&link);
        Ok((link, path))
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Replaces path separators and other awkward characters in a file stem.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
