//! The type registry: which readers and writers exist and what they fit.

use std::path::Path;

use super::binding::{ColumnBoundReader, ColumnBoundWriter, ColumnReadWritePair, ConstantElement};
use super::{
    ProcessedType, Reader, Writer, MIME_JPEG, MIME_PNG, MIME_REGION_SET, MIME_SVG, MIME_TIFF,
};
use crate::error::SlideSetError;
use crate::table::{ElementKind, Table, Value};

/// Registered readers, writers, type aliases and MIME names.
///
/// Built once through [`TypeRegistryBuilder`] and then only read.
/// Registration order is iteration order, so the first match of every
/// query is the first registered candidate.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    readers: Vec<Reader>,
    writers: Vec<Writer>,
    aliases: Vec<(String, ProcessedType)>,
    mime_names: Vec<(String, String)>,
    extensions: Vec<(String, String)>,
}

/// Builder for [`TypeRegistry`].
#[derive(Clone, Debug, Default)]
pub struct TypeRegistryBuilder {
    registry: TypeRegistry,
}

impl TypeRegistryBuilder {
    pub fn reader(mut self, reader: Reader) -> Self {
        if !self.registry.readers.contains(&reader) {
            self.registry.readers.push(reader);
        }
        self
    }

    pub fn writer(mut self, writer: Writer) -> Self {
        if !self.registry.writers.contains(&writer) {
            self.registry.writers.push(writer);
        }
        self
    }

    /// Makes `alias` resolve to `target`.
    pub fn alias(mut self, alias: impl Into<String>, target: ProcessedType) -> Self {
        self.registry.aliases.push((alias.into(), target));
        self
    }

    /// Registers a MIME type with its human-readable name and the file
    /// extensions that imply it.
    pub fn mime(mut self, mime: &str, name: &str, extensions: &[&str]) -> Self {
        self.registry
            .mime_names
            .push((mime.to_string(), name.to_string()));
        for ext in extensions {
            self.registry
                .extensions
                .push((ext.to_ascii_lowercase(), mime.to_string()));
        }
        self
    }

    pub fn build(self) -> TypeRegistry {
        self.registry
    }
}

/// Primitive and wrapper spellings of the basic types.
const PRIMITIVES: &[(&str, ProcessedType)] = &[
    ("boolean", ProcessedType::Boolean),
    ("bool", ProcessedType::Boolean),
    ("int", ProcessedType::Integer),
    ("integer", ProcessedType::Integer),
    ("long", ProcessedType::Integer),
    ("short", ProcessedType::Integer),
    ("byte", ProcessedType::Integer),
    ("double", ProcessedType::Double),
    ("float", ProcessedType::Double),
    ("number", ProcessedType::Number),
    ("string", ProcessedType::Text),
    ("object", ProcessedType::Any),
];

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// The registry with every built-in reader, writer, alias and MIME type.
    pub fn builtin() -> TypeRegistry {
        let mut builder = TypeRegistry::builder();
        for reader in Reader::BUILTIN {
            builder = builder.reader(reader);
        }
        for writer in Writer::BUILTIN {
            builder = builder.writer(writer);
        }
        builder
            .alias("RoiArray", ProcessedType::RegionSet)
            .alias("Region[]", ProcessedType::RegionSet)
            .alias("int[]", ProcessedType::IntegerArray)
            .alias("long[]", ProcessedType::IntegerArray)
            .alias("double[]", ProcessedType::DoubleArray)
            .alias("float[]", ProcessedType::DoubleArray)
            .alias("Dataset", ProcessedType::Image)
            .alias("Path", ProcessedType::FilePath)
            .mime(MIME_PNG, "PNG image", &["png"])
            .mime(MIME_JPEG, "JPEG image", &["jpg", "jpeg"])
            .mime(MIME_TIFF, "TIFF image", &["tif", "tiff"])
            .mime(MIME_SVG, "SVG regions", &["svg"])
            .mime(MIME_REGION_SET, "Region set", &["roiset"])
            .build()
    }

    pub fn readers(&self) -> &[Reader] {
        &self.readers
    }

    pub fn writers(&self) -> &[Writer] {
        &self.writers
    }

    /// Looks up a registered reader by name.
    pub fn reader(&self, name: &str) -> Result<Reader, SlideSetError> {
        self.readers
            .iter()
            .copied()
            .find(|r| r.name() == name)
            .ok_or_else(|| SlideSetError::UnknownReader(name.to_string()))
    }

    /// Looks up a registered writer by name.
    pub fn writer(&self, name: &str) -> Result<Writer, SlideSetError> {
        self.writers
            .iter()
            .copied()
            .find(|w| w.name() == name)
            .ok_or_else(|| SlideSetError::UnknownWriter(name.to_string()))
    }

    /// Resolves a type name, alias or primitive spelling.
    pub fn resolve_type(&self, name: &str) -> Result<ProcessedType, SlideSetError> {
        let name = name.trim();
        if let Some(t) = ProcessedType::ALL.iter().find(|t| t.name() == name) {
            return Ok(*t);
        }
        if let Some((_, t)) = self.aliases.iter().find(|(alias, _)| alias == name) {
            return Ok(*t);
        }
        let lower = name.to_ascii_lowercase();
        PRIMITIVES
            .iter()
            .find(|(primitive, _)| *primitive == lower)
            .map(|(_, t)| *t)
            .ok_or_else(|| SlideSetError::UnknownType(name.to_string()))
    }

    /// Human-readable name of a MIME type.
    pub fn mime_name(&self, mime: &str) -> Option<&str> {
        self.mime_names
            .iter()
            .find(|(m, _)| m == mime)
            .map(|(_, name)| name.as_str())
    }

    /// MIME type implied by a file's extension.
    pub fn mime_for_path(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        self.extensions
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, mime)| mime.as_str())
    }

    /// Every reader producing values assignable to `target`.
    pub fn compatible_readers(&self, target: ProcessedType) -> Vec<Reader> {
        self.readers
            .iter()
            .copied()
            .filter(|r| target.is_assignable_from(r.processed_type()))
            .collect()
    }

    /// Every writer accepting values of type `source`.
    pub fn compatible_writers(&self, source: ProcessedType) -> Vec<Writer> {
        self.writers
            .iter()
            .copied()
            .filter(|w| w.processed_type().is_assignable_from(source))
            .collect()
    }

    /// One bound reader per matching (column, reader) combination.
    ///
    /// Columns are visited in order, and within a column the readers in
    /// registration order, so a column may yield several candidates.
    pub fn compatible_column_readers(
        &self,
        target: ProcessedType,
        table: &Table,
    ) -> Vec<ColumnBoundReader> {
        let readers = self.compatible_readers(target);
        table
            .columns()
            .enumerate()
            .flat_map(|(column, descriptor)| {
                readers
                    .iter()
                    .filter(|r| r.accepts(descriptor.kind, descriptor.mime.as_deref()))
                    .map(move |r| ColumnBoundReader::new(*r, column))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Reader/writer pairs that share element kind and MIME set, bound to
    /// every column both accept.
    ///
    /// A pair lets a command read a cell, modify the value and save it back
    /// in place.
    pub fn column_read_write_pairs(
        &self,
        target: ProcessedType,
        table: &Table,
    ) -> Vec<ColumnReadWritePair> {
        let mut pairs = Vec::new();
        for (column, descriptor) in table.columns().enumerate() {
            let mime = descriptor.mime.as_deref();
            for reader in self.compatible_readers(target) {
                if !reader.accepts(descriptor.kind, mime) {
                    continue;
                }
                for writer in &self.writers {
                    let agrees = writer.element_kind() == reader.element_kind()
                        && writer.mime_types() == reader.mime_types()
                        && writer.processed_type().is_assignable_from(reader.processed_type());
                    if agrees {
                        pairs.push(ColumnReadWritePair {
                            reader: ColumnBoundReader::new(reader, column),
                            writer: ColumnBoundWriter::new(*writer, column),
                        });
                    }
                }
            }
        }
        pairs
    }

    /// Wraps a literal value for use as a command input.
    ///
    /// The first registered reader of the value's kind whose output fits
    /// `target` is chosen. File links pick up the MIME type implied by
    /// their extension.
    ///
    /// # Errors
    /// [`SlideSetError::NoCompatibleReader`] when no reader qualifies.
    pub fn bind_constant(
        &self,
        value: Value,
        target: ProcessedType,
    ) -> Result<ConstantElement, SlideSetError> {
        let no_reader = || SlideSetError::NoCompatibleReader {
            input: format!("constant '{value}' as {target}"),
        };
        let kind: ElementKind = value.kind().ok_or_else(no_reader)?;
        let mime = match &value {
            Value::FileLink(path) => self.mime_for_path(path).map(str::to_string),
            _ => None,
        };
        let reader = self
            .compatible_readers(target)
            .into_iter()
            .find(|r| r.accepts(kind, mime.as_deref()))
            .ok_or_else(no_reader)?;
        Ok(ConstantElement::new(value, mime, reader))
    }
}
