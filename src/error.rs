use std::path::PathBuf;
use thiserror::Error;

use crate::report::RunLog;

/// The main error type for Slide Set operations.
///
/// Variants fall into four families: data unavailable, data malformed,
/// structural mismatch and configuration error. Geometry and statistics
/// code recovers locally from the first two (see [`is_recoverable`]);
/// the last two abort the current invocation.
///
/// [`is_recoverable`]: SlideSetError::is_recoverable
#[derive(Debug, Error)]
pub enum SlideSetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data not available at {path}")]
    DataUnavailable { path: PathBuf },

    #[error("Failed to parse SVG from {path}: {message}")]
    SvgParse { path: PathBuf, message: String },

    #[error("Unsupported SVG shape: {0}")]
    SvgShape(String),

    #[error("Invalid region set in {path}: {message}")]
    RegionSetFormat { path: PathBuf, message: String },

    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    #[error("Dimension mismatch: region has {region} dimension(s), target has {target}")]
    DimensionMismatch { region: usize, target: usize },

    #[error("Image has no channel {channel} (channel count {count})")]
    MissingChannel { channel: usize, count: usize },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Unknown type: '{0}'")]
    UnknownType(String),

    #[error("Unknown reader: '{0}'")]
    UnknownReader(String),

    #[error("Unknown writer: '{0}'")]
    UnknownWriter(String),

    #[error("Unknown command: '{0}'")]
    UnknownCommand(String),

    #[error("No compatible reader for input '{input}'")]
    NoCompatibleReader { input: String },

    #[error("No compatible writer for output '{output}'")]
    NoCompatibleWriter { output: String },

    #[error("Length mismatch: expected {expected} value(s), got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Row {row} out of range (table has {rows} row(s))")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("Failed to parse table CSV from {path}: {source}")]
    TableCsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write table CSV to {path}: {source}")]
    TableCsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid table CSV in {path}: {message}")]
    TableCsvInvalid { path: PathBuf, message: String },

    #[error("Failed to parse command skeleton from {path}: {message}")]
    SkeletonParse { path: PathBuf, message: String },

    #[error("Run completed with {warning_count} warning(s) in strict mode")]
    RunFailed { warning_count: usize, log: RunLog },
}

impl SlideSetError {
    /// Returns true for errors that only invalidate one row, region or node.
    ///
    /// Unavailable and malformed data can be skipped with a warning; every
    /// other variant means the invocation itself is not well-formed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SlideSetError::DataUnavailable { .. }
                | SlideSetError::SvgParse { .. }
                | SlideSetError::SvgShape(_)
                | SlideSetError::RegionSetFormat { .. }
                | SlideSetError::ImageRead { .. }
                | SlideSetError::DimensionMismatch { .. }
                | SlideSetError::Unsupported(_)
        )
    }
}
