//! Command skeletons: saved command and binding choices.
//!
//! A skeleton names a command and says where each input comes from and
//! where each output goes, so a run can be replayed without prompting.
//! Skeletons are stored as JSON or YAML:
//!
//! ```yaml
//! command: RegionStats
//! inputs:
//!   image: { column: image }
//!   regions: { column: cells, reader: SvgRegionSetReader }
//!   red_threshold: { constant: 12.5 }
//! outputs:
//!   red: { column: red_sum }
//! ```
//!
//! Inputs left out fall back to their defaults; outputs left out are not
//! written unless the `outputs` map is empty, in which case every output
//! is written under its own name.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::commands::{CommandKind, InputSpec, OutputSpec};
use super::ChoiceResolver;
use crate::error::SlideSetError;
use crate::table::{Table, Value};
use crate::types::{BoundInput, ConstantElement, TypeRegistry, Writer};

/// Where one command input comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputBinding {
    /// Read every row's value from a table column.
    Column {
        column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reader: Option<String>,
    },
    /// Read the same file for every row.
    File {
        file: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reader: Option<String>,
    },
    /// Use a literal for every row.
    Constant {
        constant: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reader: Option<String>,
    },
}

/// Where one command output goes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
    /// Result column name; defaults to the output name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// A saved command invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandSkeleton {
    pub command: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputBinding>,
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputBinding>,
}

/// A skeleton with every binding checked against a table and registry.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedCommand {
    pub command: CommandKind,
    pub inputs: Vec<(&'static str, BoundInput)>,
    pub outputs: Vec<ResolvedOutput>,
}

/// An output with its writer and result column name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedOutput {
    pub spec: OutputSpec,
    pub writer: Writer,
    pub column: String,
}

/// Reads a skeleton, choosing JSON or YAML by file extension.
///
/// Files without a `.yaml`/`.yml` extension are read as JSON.
pub fn read_skeleton(path: &Path) -> Result<CommandSkeleton, SlideSetError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SlideSetError::DataUnavailable {
            path: path.to_path_buf(),
        },
        _ => SlideSetError::Io(e),
    })?;
    let is_yaml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        parse_yaml(&text, path)
    } else {
        parse_json(&text, path)
    }
}

/// Parses a skeleton from a JSON string.
pub fn from_skeleton_json_str(json: &str) -> Result<CommandSkeleton, SlideSetError> {
    parse_json(json, Path::new("<string>"))
}

/// Parses a skeleton from a YAML string.
pub fn from_skeleton_yaml_str(yaml: &str) -> Result<CommandSkeleton, SlideSetError> {
    parse_yaml(yaml, Path::new("<string>"))
}

/// Writes a skeleton as pretty-printed JSON.
pub fn to_skeleton_json_string(skeleton: &CommandSkeleton) -> Result<String, SlideSetError> {
    serde_json::to_string_pretty(skeleton).map_err(|e| SlideSetError::SkeletonParse {
        path: PathBuf::from("<string>"),
        message: e.to_string(),
    })
}

/// Fuzz-only entrypoint running both skeleton parsers on one input.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_skeleton(input: &str) -> Result<(), SlideSetError> {
    let path = Path::new("<fuzz>");
    let json = parse_json(input, path);
    let yaml = parse_yaml(input, path);
    json.or(yaml).map(|_| ())
}

fn parse_json(text: &str, path: &Path) -> Result<CommandSkeleton, SlideSetError> {
    serde_json::from_str(text).map_err(|e| SlideSetError::SkeletonParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn parse_yaml(text: &str, path: &Path) -> Result<CommandSkeleton, SlideSetError> {
    serde_yaml::from_str(text).map_err(|e| SlideSetError::SkeletonParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl CommandSkeleton {
    /// A skeleton for `command` with no bindings yet.
    pub fn new(command: CommandKind) -> Self {
        Self {
            command: command.name().to_string(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Binds an input to a table column.
    pub fn with_column(mut self, input: &str, column: &str) -> Self {
        self.inputs.insert(
            input.to_string(),
            InputBinding::Column {
                column: column.to_string(),
                reader: None,
            },
        );
        self
    }

    /// Binds an input to a literal.
    pub fn with_constant(mut self, input: &str, constant: Value) -> Self {
        self.inputs.insert(
            input.to_string(),
            InputBinding::Constant {
                constant,
                reader: None,
            },
        );
        self
    }

    /// Checks every binding and picks readers and writers.
    ///
    /// # Errors
    /// Configuration errors are fatal here: an unknown command, reader,
    /// writer or column, a required input without binding, or a binding
    /// no reader can serve.
    pub fn resolve(
        &self,
        table: &Table,
        registry: &TypeRegistry,
        resolver: &dyn ChoiceResolver,
    ) -> Result<ResolvedCommand, SlideSetError> {
        let command = CommandKind::from_name(&self.command)?;
        if let Some(unknown) = self
            .inputs
            .keys()
            .find(|name| !command.inputs().iter().any(|spec| spec.name == name.as_str()))
        {
            return Err(SlideSetError::StructuralMismatch(format!(
                "{command} has no input '{unknown}'"
            )));
        }

        let mut inputs = Vec::new();
        for spec in command.inputs() {
            let bound = match self.inputs.get(spec.name) {
                Some(binding) => bind_input(&spec, binding, table, registry, resolver)?,
                None => match &spec.default {
                    Some(default) => BoundInput::Constant(registry.bind_constant(default.clone(), spec.ty)?),
                    None => {
                        return Err(SlideSetError::NoCompatibleReader {
                            input: format!("{} (required input of {command} is not bound)", spec.name),
                        })
                    }
                },
            };
            inputs.push((spec.name, bound));
        }

        let mut outputs = Vec::new();
        for spec in command.outputs() {
            let binding = match self.outputs.get(spec.name) {
                Some(binding) => binding.clone(),
                None if self.outputs.is_empty() => OutputBinding::default(),
                None => continue,
            };
            let writer = pick_writer(&spec, binding.writer.as_deref(), registry, resolver)?;
            let column = binding.column.unwrap_or_else(|| spec.name.to_string());
            outputs.push(ResolvedOutput {
                spec,
                writer,
                column,
            });
        }
        if let Some(unknown) = self
            .outputs
            .keys()
            .find(|name| !outputs.iter().any(|o| o.spec.name == name.as_str()))
        {
            return Err(SlideSetError::StructuralMismatch(format!(
                "{command} has no output '{unknown}'"
            )));
        }

        Ok(ResolvedCommand {
            command,
            inputs,
            outputs,
        })
    }
}

fn bind_input(
    spec: &InputSpec,
    binding: &InputBinding,
    table: &Table,
    registry: &TypeRegistry,
    resolver: &dyn ChoiceResolver,
) -> Result<BoundInput, SlideSetError> {
    match binding {
        InputBinding::Column { column, reader } => {
            let index = table.column_index(column).ok_or_else(|| {
                SlideSetError::StructuralMismatch(format!(
                    "table '{}' has no column '{column}' for input '{}'",
                    table.name, spec.name
                ))
            })?;
            let candidates: Vec<_> = registry
                .compatible_column_readers(spec.ty, table)
                .into_iter()
                .filter(|bound| bound.column == index)
                .collect();
            let chosen = match reader {
                Some(name) => {
                    let wanted = registry.reader(name)?;
                    candidates.into_iter().find(|bound| bound.reader == wanted)
                }
                None => resolver
                    .choose_reader(spec, &candidates)
                    .and_then(|i| candidates.get(i).copied()),
            };
            chosen.map(BoundInput::Column).ok_or_else(|| SlideSetError::NoCompatibleReader {
                input: format!("{} from column '{column}'", spec.name),
            })
        }
        InputBinding::File { file, reader } => {
            bind_literal(spec, Value::FileLink(file.clone()), reader.as_deref(), registry)
        }
        InputBinding::Constant { constant, reader } => {
            bind_literal(spec, constant.clone(), reader.as_deref(), registry)
        }
    }
}

fn bind_literal(
    spec: &InputSpec,
    value: Value,
    reader: Option<&str>,
    registry: &TypeRegistry,
) -> Result<BoundInput, SlideSetError> {
    let Some(name) = reader else {
        return Ok(BoundInput::Constant(registry.bind_constant(value, spec.ty)?));
    };
    let reader = registry.reader(name)?;
    let mime = match &value {
        Value::FileLink(path) => registry.mime_for_path(path).map(str::to_string),
        _ => None,
    };
    let fits = value
        .kind()
        .is_some_and(|kind| reader.element_kind() == kind)
        && spec.ty.is_assignable_from(reader.processed_type());
    if !fits {
        return Err(SlideSetError::NoCompatibleReader {
            input: format!("{} with {}", spec.name, reader.name()),
        });
    }
    Ok(BoundInput::Constant(ConstantElement::new(value, mime, reader)))
}

fn pick_writer(
    spec: &OutputSpec,
    name: Option<&str>,
    registry: &TypeRegistry,
    resolver: &dyn ChoiceResolver,
) -> Result<Writer, SlideSetError> {
    let candidates = registry.compatible_writers(spec.ty);
    let chosen = match name {
        Some(name) => {
            let wanted = registry.writer(name)?;
            candidates.into_iter().find(|w| *w == wanted)
        }
        None => resolver
            .choose_writer(spec, &candidates)
            .and_then(|i| candidates.get(i).copied()),
    };
    chosen.ok_or_else(|| SlideSetError::NoCompatibleWriter {
        output: spec.name.to_string(),
    })
}
