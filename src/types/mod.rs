//! Processed types and the reader/writer capability registry.
//!
//! Table cells hold underlying [`Value`](crate::table::Value)s; commands
//! consume and produce [`Processed`] values. A [`Reader`] turns the former
//! into the latter and a [`Writer`] goes the other way. The
//! [`TypeRegistry`] decides which readers and writers fit a given command
//! parameter and table column.

mod binding;
mod readers;
mod registry;
mod writers;

pub use binding::{BoundInput, ColumnBoundReader, ColumnBoundWriter, ColumnReadWritePair, ConstantElement};
pub use readers::Reader;
pub use registry::{TypeRegistry, TypeRegistryBuilder};
pub use writers::Writer;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::raster::Raster;
use crate::roi::Region;

/// MIME type of PNG images.
pub const MIME_PNG: &str = "image/png";
/// MIME type of JPEG images.
pub const MIME_JPEG: &str = "image/jpeg";
/// MIME type of TIFF images.
pub const MIME_TIFF: &str = "image/tiff";
/// MIME type of SVG documents holding regions.
pub const MIME_SVG: &str = "image/svg+xml";
/// MIME type of the binary region-set stream.
pub const MIME_REGION_SET: &str = "application/x-slideset-roiset";

/// The type of a command parameter or processed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ProcessedType {
    Boolean,
    Integer,
    Double,
    /// Either numeric type.
    Number,
    Text,
    FilePath,
    Image,
    RegionSet,
    IntegerArray,
    DoubleArray,
    /// Accepts every type.
    Any,
}

impl ProcessedType {
    /// Canonical type name, as accepted by [`TypeRegistry::resolve_type`].
    pub fn name(self) -> &'static str {
        match self {
            ProcessedType::Boolean => "Boolean",
            ProcessedType::Integer => "Integer",
            ProcessedType::Double => "Double",
            ProcessedType::Number => "Number",
            ProcessedType::Text => "String",
            ProcessedType::FilePath => "File",
            ProcessedType::Image => "Image",
            ProcessedType::RegionSet => "RegionSet",
            ProcessedType::IntegerArray => "IntegerArray",
            ProcessedType::DoubleArray => "DoubleArray",
            ProcessedType::Any => "Object",
        }
    }

    /// Returns true if a value of type `other` can be used where `self` is
    /// expected.
    pub fn is_assignable_from(self, other: ProcessedType) -> bool {
        self == other
            || self == ProcessedType::Any
            || (self == ProcessedType::Number
                && matches!(other, ProcessedType::Integer | ProcessedType::Double))
    }

    pub(crate) const ALL: [ProcessedType; 11] = [
        ProcessedType::Boolean,
        ProcessedType::Integer,
        ProcessedType::Double,
        ProcessedType::Number,
        ProcessedType::Text,
        ProcessedType::FilePath,
        ProcessedType::Image,
        ProcessedType::RegionSet,
        ProcessedType::IntegerArray,
        ProcessedType::DoubleArray,
        ProcessedType::Any,
    ];
}

impl fmt::Display for ProcessedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A materialized value a command works on.
#[derive(Clone, Debug, PartialEq)]
pub enum Processed {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Text(String),
    FilePath(PathBuf),
    Image(Raster),
    RegionSet(Vec<Region>),
    IntegerArray(Vec<i64>),
    DoubleArray(Vec<f64>),
}

impl Processed {
    pub fn processed_type(&self) -> ProcessedType {
        match self {
            Processed::Boolean(_) => ProcessedType::Boolean,
            Processed::Integer(_) => ProcessedType::Integer,
            Processed::Double(_) => ProcessedType::Double,
            Processed::Text(_) => ProcessedType::Text,
            Processed::FilePath(_) => ProcessedType::FilePath,
            Processed::Image(_) => ProcessedType::Image,
            Processed::RegionSet(_) => ProcessedType::RegionSet,
            Processed::IntegerArray(_) => ProcessedType::IntegerArray,
            Processed::DoubleArray(_) => ProcessedType::DoubleArray,
        }
    }

    /// Numeric view of integer and double values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Processed::Integer(v) => Some(*v as f64),
            Processed::Double(v) => Some(*v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_accepts_both_numeric_types() {
        assert!(ProcessedType::Number.is_assignable_from(ProcessedType::Integer));
        assert!(ProcessedType::Number.is_assignable_from(ProcessedType::Double));
        assert!(!ProcessedType::Number.is_assignable_from(ProcessedType::Text));
        assert!(!ProcessedType::Integer.is_assignable_from(ProcessedType::Number));
    }

    #[test]
    fn any_accepts_everything() {
        for t in ProcessedType::ALL {
            assert!(ProcessedType::Any.is_assignable_from(t));
            assert!(t.is_assignable_from(t));
        }
    }

    #[test]
    fn processed_values_report_their_type() {
        assert_eq!(
            Processed::RegionSet(Vec::new()).processed_type(),
            ProcessedType::RegionSet
        );
        assert_eq!(Processed::Integer(3).as_f64(), Some(3.0));
        assert_eq!(Processed::Text("x".into()).as_f64(), None);
    }
}
