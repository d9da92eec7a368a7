//! Table persistence as CSV.
//!
//! The header row declares every column as `name:kind[:mime]`, where `kind`
//! is one of `bool`, `int`, `double`, `string` or `file`:
//!
//! ```text
//! image:file:image/png,regions:file:image/svg+xml,threshold:double
//! a.png,a.svg,12.5
//! ```
//!
//! A header cell without a kind declares a string column. Empty cells are
//! read as [`Value::Empty`] and written as empty fields.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::{ColumnDescriptor, ElementKind, Table, Value};
use crate::error::SlideSetError;

/// Reads a table from a CSV file.
///
/// The table is named after the file stem, and relative file links resolve
/// against the file's directory.
pub fn read_table_csv(path: &Path) -> Result<Table, SlideSetError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SlideSetError::DataUnavailable {
                path: path.to_path_buf(),
            }
        } else {
            SlideSetError::Io(e)
        }
    })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_table(BufReader::new(file), path, &name, base_dir)
}

/// Reads a table from a CSV string.
pub fn from_table_csv_str(csv_str: &str, base_dir: &Path) -> Result<Table, SlideSetError> {
    from_table_csv_slice(csv_str.as_bytes(), base_dir)
}

/// Reads a table from CSV bytes.
pub fn from_table_csv_slice(bytes: &[u8], base_dir: &Path) -> Result<Table, SlideSetError> {
    parse_table(bytes, Path::new("<bytes>"), "table", base_dir)
}

/// Writes a table to a CSV file, creating parent directories as needed.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<(), SlideSetError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    let writer = emit_table(BufWriter::new(file), path, table)?;
    writer
        .into_inner()
        .map_err(|e| SlideSetError::Io(e.into_error()))?
        .flush()?;
    Ok(())
}

/// Writes a table to a CSV string.
pub fn to_table_csv_string(table: &Table) -> Result<String, SlideSetError> {
    let dummy_path = Path::new("<string>");
    let writer = emit_table(Vec::new(), dummy_path, table)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| SlideSetError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| SlideSetError::TableCsvInvalid {
        path: dummy_path.to_path_buf(),
        message: format!("Invalid UTF-8 in output: {}", e),
    })
}

/// Parses one `name:kind[:mime]` header cell.
pub fn parse_header(cell: &str) -> Result<ColumnDescriptor, String> {
    let mut parts = cell.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(format!("header '{cell}' has no column name"));
    }
    let kind = match parts.next() {
        Some(tag) => ElementKind::from_tag(tag)
            .ok_or_else(|| format!("header '{cell}' has unknown kind '{tag}'"))?,
        None => ElementKind::String,
    };
    let mut descriptor = ColumnDescriptor::new(name, kind);
    if let Some(mime) = parts.next().map(str::trim).filter(|m| !m.is_empty()) {
        descriptor = descriptor.with_mime(mime);
    }
    Ok(descriptor)
}

fn header_cell(descriptor: &ColumnDescriptor) -> String {
    match &descriptor.mime {
        Some(mime) => format!("{}:{}:{}", descriptor.name, descriptor.kind, mime),
        None => format!("{}:{}", descriptor.name, descriptor.kind),
    }
}

fn parse_table<R: Read>(
    input: R,
    path: &Path,
    name: &str,
    base_dir: &Path,
) -> Result<Table, SlideSetError> {
    let parse_error = |source| SlideSetError::TableCsvParse {
        path: path.to_path_buf(),
        source,
    };
    let invalid = |message: String| SlideSetError::TableCsvInvalid {
        path: path.to_path_buf(),
        message,
    };

    let mut csv_reader = csv::Reader::from_reader(input);
    let mut table = Table::new(name, base_dir);
    for cell in csv_reader.headers().map_err(parse_error)?.iter() {
        table.add_column(parse_header(cell).map_err(invalid)?);
    }
    let kinds: Vec<ElementKind> = table.columns().map(|c| c.kind).collect();

    for (line, record) in csv_reader.records().enumerate() {
        let record = record.map_err(parse_error)?;
        let row = table.add_row();
        for (column, (kind, text)) in kinds.iter().zip(record.iter()).enumerate() {
            let value = Value::parse(*kind, text)
                .map_err(|e| invalid(format!("data row {}, column {}: {e}", line + 1, column)))?;
            table.set_underlying_value(column, row, value)?;
        }
    }
    Ok(table)
}

fn emit_table<W: Write>(
    output: W,
    path: &Path,
    table: &Table,
) -> Result<csv::Writer<W>, SlideSetError> {
    let write_error = |source| SlideSetError::TableCsvWrite {
        path: path.to_path_buf(),
        source,
    };
    let mut csv_writer = csv::Writer::from_writer(output);
    csv_writer
        .write_record(table.columns().map(header_cell))
        .map_err(write_error)?;
    for row in 0..table.row_count() {
        let mut record = Vec::with_capacity(table.column_count());
        for column in 0..table.column_count() {
            record.push(table.underlying_value(column, row)?.to_string());
        }
        csv_writer.write_record(&record).map_err(write_error)?;
    }
    Ok(csv_writer)
}
