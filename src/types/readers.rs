//! Built-in element readers.

use std::path::PathBuf;

use serde::Serialize;

use super::{Processed, ProcessedType, MIME_JPEG, MIME_PNG, MIME_REGION_SET, MIME_SVG, MIME_TIFF};
use crate::error::SlideSetError;
use crate::raster::read_raster;
use crate::report::RunLog;
use crate::roi::io_binary::read_region_set;
use crate::roi::svg::read_svg_regions;
use crate::table::{ElementKind, Table, Value};

/// Converts one underlying value into a processed value.
///
/// Each reader accepts a single element kind and, for file links, a set of
/// MIME types. An empty MIME set accepts any MIME type or none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Reader {
    BooleanValue,
    IntegerValue,
    DoubleValue,
    StringValue,
    FilePath,
    ImageFile,
    RegionSetFile,
    SvgRegionSet,
}

impl Reader {
    /// Every built-in reader, in registration order.
    pub const BUILTIN: [Reader; 8] = [
        Reader::BooleanValue,
        Reader::IntegerValue,
        Reader::DoubleValue,
        Reader::StringValue,
        Reader::FilePath,
        Reader::ImageFile,
        Reader::RegionSetFile,
        Reader::SvgRegionSet,
    ];

    /// Lookup key of the reader.
    pub fn name(self) -> &'static str {
        match self {
            Reader::BooleanValue => "BooleanReader",
            Reader::IntegerValue => "IntegerReader",
            Reader::DoubleValue => "DoubleReader",
            Reader::StringValue => "StringReader",
            Reader::FilePath => "FilePathReader",
            Reader::ImageFile => "ImageFileReader",
            Reader::RegionSetFile => "RegionSetReader",
            Reader::SvgRegionSet => "SvgRegionSetReader",
        }
    }

    pub fn element_kind(self) -> ElementKind {
        match self {
            Reader::BooleanValue => ElementKind::Boolean,
            Reader::IntegerValue => ElementKind::Integer,
            Reader::DoubleValue => ElementKind::Double,
            Reader::StringValue => ElementKind::String,
            Reader::FilePath | Reader::ImageFile | Reader::RegionSetFile | Reader::SvgRegionSet => {
                ElementKind::FileLink
            }
        }
    }

    pub fn mime_types(self) -> &'static [&'static str] {
        match self {
            Reader::ImageFile => &[MIME_PNG, MIME_JPEG, MIME_TIFF],
            Reader::RegionSetFile => &[MIME_REGION_SET],
            Reader::SvgRegionSet => &[MIME_SVG],
            _ => &[],
        }
    }

    /// Type of the values this reader produces.
    pub fn processed_type(self) -> ProcessedType {
        match self {
            Reader::BooleanValue => ProcessedType::Boolean,
            Reader::IntegerValue => ProcessedType::Integer,
            Reader::DoubleValue => ProcessedType::Double,
            Reader::StringValue => ProcessedType::Text,
            Reader::FilePath => ProcessedType::FilePath,
            Reader::ImageFile => ProcessedType::Image,
            Reader::RegionSetFile | Reader::SvgRegionSet => ProcessedType::RegionSet,
        }
    }

    /// Returns true if the reader can read cells of this kind and MIME type.
    pub fn accepts(self, kind: ElementKind, mime: Option<&str>) -> bool {
        if kind != self.element_kind() {
            return false;
        }
        let mimes = self.mime_types();
        mimes.is_empty() || mime.is_some_and(|m| mimes.contains(&m))
    }

    /// Reads one underlying value.
    ///
    /// File links resolve against the table's base directory. A missing
    /// file is [`SlideSetError::DataUnavailable`].
    pub fn read(self, value: &Value, table: &Table, log: &mut RunLog) -> Result<Processed, SlideSetError> {
        match (self, value) {
            (Reader::BooleanValue, Value::Boolean(v)) => Ok(Processed::Boolean(*v)),
            (Reader::IntegerValue, Value::Integer(v)) => Ok(Processed::Integer(*v)),
            (Reader::DoubleValue, Value::Double(v)) => Ok(Processed::Double(*v)),
            (Reader::StringValue, Value::String(v)) => Ok(Processed::Text(v.clone())),
            (_, Value::FileLink(_)) if self.element_kind() == ElementKind::FileLink => {
                let path = table
                    .resolve_path(value)
                    .unwrap_or_else(PathBuf::new);
                log::debug!("{} reading {}", self.name(), path.display());
                match self {
                    Reader::ImageFile => read_raster(&path).map(Processed::Image),
                    Reader::RegionSetFile => read_region_set(&path).map(Processed::RegionSet),
                    Reader::SvgRegionSet => read_svg_regions(&path, log).map(Processed::RegionSet),
                    _ => Ok(Processed::FilePath(path)),
                }
            }
            (_, Value::Empty) => Err(SlideSetError::DataUnavailable {
                path: PathBuf::from("<empty cell>"),
            }),
            (_, other) => Err(SlideSetError::StructuralMismatch(format!(
                "{} cannot read a {} value",
                self.name(),
                other.kind().map_or("empty", |k| k.tag())
            ))),
        }
    }
}
