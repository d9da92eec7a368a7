//! Batch execution: run one command over every row of a table.
//!
//! A [`CommandSkeleton`] names the command and binds its inputs to table
//! columns or constants. [`run_batch`] resolves the skeleton, then for each
//! row reads the inputs, runs the command and writes the outputs into a new
//! result table. Rows run strictly in order, and a row's processed data is
//! dropped before the next row starts.
//!
//! A row whose data is unavailable or malformed is skipped with a warning;
//! any other error aborts the run.

mod commands;
pub mod skeleton;

use std::path::{Path, PathBuf};

use crate::error::SlideSetError;
use crate::report::{LogCode, LogContext, RunLog};
use crate::table::{resolve_against, ColumnDescriptor, Table, Value};
use crate::types::{ColumnBoundReader, ColumnBoundWriter, Processed, TypeRegistry, Writer};

pub use commands::{CommandInputs, CommandKind, InputSpec, OutputShape, OutputSpec};
pub use skeleton::{
    read_skeleton, CommandSkeleton, InputBinding, OutputBinding, ResolvedCommand, ResolvedOutput,
};

/// One output of one row.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputValue {
    /// One value for the whole row.
    Scalar(Processed),
    /// One value per region.
    Sequence(Vec<Processed>),
}

/// Turns one row's outputs into result rows.
///
/// Sequences become one result row per element and scalars repeat on every
/// result row. Without sequences there is exactly one result row; empty
/// sequences yield none.
///
/// # Errors
/// [`SlideSetError::StructuralMismatch`] when sequences differ in length.
pub fn expand_outputs(outputs: Vec<OutputValue>) -> Result<Vec<Vec<Processed>>, SlideSetError> {
    let mut len = None;
    for output in &outputs {
        if let OutputValue::Sequence(values) = output {
            match len {
                None => len = Some(values.len()),
                Some(n) if n != values.len() => {
                    return Err(SlideSetError::StructuralMismatch(format!(
                        "output sequences differ in length ({n} vs {})",
                        values.len()
                    )))
                }
                Some(_) => {}
            }
        }
    }
    let rows = len.unwrap_or(1);
    Ok((0..rows)
        .map(|i| {
            outputs
                .iter()
                .map(|output| match output {
                    OutputValue::Scalar(value) => value.clone(),
                    OutputValue::Sequence(values) => values[i].clone(),
                })
                .collect()
        })
        .collect())
}

/// Picks among equally valid readers or writers.
///
/// Implementations may prompt a user; [`FirstCandidate`] takes the first
/// registry match. Returning `None` means no choice was made.
pub trait ChoiceResolver {
    fn choose_reader(&self, input: &InputSpec, candidates: &[ColumnBoundReader]) -> Option<usize>;
    fn choose_writer(&self, output: &OutputSpec, candidates: &[Writer]) -> Option<usize>;
}

/// Always picks the first candidate, in registration order.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstCandidate;

impl ChoiceResolver for FirstCandidate {
    fn choose_reader(&self, _input: &InputSpec, candidates: &[ColumnBoundReader]) -> Option<usize> {
        (!candidates.is_empty()).then_some(0)
    }

    fn choose_writer(&self, _output: &OutputSpec, candidates: &[Writer]) -> Option<usize> {
        (!candidates.is_empty()).then_some(0)
    }
}

/// Runs `skeleton` over `table`, writing result files next to the table.
pub fn run_batch(
    table: &Table,
    skeleton: &CommandSkeleton,
    registry: &TypeRegistry,
    log: &mut RunLog,
) -> Result<Table, SlideSetError> {
    let output_dir = table.base_dir.clone();
    run_batch_with(table, skeleton, registry, &FirstCandidate, &output_dir, log)
}

/// Runs `skeleton` over `table` with an explicit resolver and result
/// directory.
///
/// The result table lives in `output_dir`; file outputs are written there
/// and input file links are made absolute when the directory differs from
/// the source table's.
pub fn run_batch_with(
    table: &Table,
    skeleton: &CommandSkeleton,
    registry: &TypeRegistry,
    resolver: &dyn ChoiceResolver,
    output_dir: &Path,
    log: &mut RunLog,
) -> Result<Table, SlideSetError> {
    let resolved = skeleton.resolve(table, registry, resolver)?;
    log::info!(
        "running {} over {} row(s) of '{}'",
        resolved.command,
        table.row_count(),
        table.name
    );

    let mut result = Table::new(format!("{}-{}", table.name, resolved.command), output_dir);
    let copied = copied_columns(&resolved, table, &mut result);
    let writers: Vec<ColumnBoundWriter> = resolved
        .outputs
        .iter()
        .map(|output| {
            let mut descriptor = ColumnDescriptor::new(&output.column, output.writer.element_kind());
            descriptor.mime = output.writer.default_mime().map(str::to_string);
            ColumnBoundWriter::new(output.writer, result.add_column(descriptor))
        })
        .collect();
    let relocate = table.base_dir != output_dir;

    for row in 0..table.row_count() {
        let outputs = match run_row(&resolved, table, row, log) {
            Ok(outputs) => outputs,
            Err(err) if err.is_recoverable() => {
                let code = match err {
                    SlideSetError::DataUnavailable { .. } => LogCode::DataUnavailable,
                    _ => LogCode::RowSkipped,
                };
                log.warn(code, format!("row skipped: {err}"), LogContext::Row { row });
                continue;
            }
            Err(err) => return Err(err),
        };

        let expanded = expand_outputs(select_outputs(&resolved, outputs))?;
        let produced = expanded.len();
        for values in expanded {
            let target = result.add_row();
            for &(source, dest) in &copied {
                let value = table.underlying_value(source, row)?;
                let value = match value {
                    Value::FileLink(path) if relocate => {
                        Value::FileLink(resolve_against(&table.base_dir, path))
                    }
                    other => other.clone(),
                };
                result.set_underlying_value(dest, target, value)?;
            }
            for (writer, value) in writers.iter().zip(&values) {
                writer.write(&mut result, target, value)?;
            }
        }
        log.info(
            LogCode::RowCompleted,
            format!("{produced} result row(s)"),
            LogContext::Row { row },
        );
    }
    Ok(result)
}

/// Adds one result column per distinct bound input column.
fn copied_columns(resolved: &ResolvedCommand, table: &Table, result: &mut Table) -> Vec<(usize, usize)> {
    let mut copied: Vec<(usize, usize)> = Vec::new();
    for (_, input) in &resolved.inputs {
        let Some(source) = input.column() else {
            continue;
        };
        if copied.iter().any(|(s, _)| *s == source) {
            continue;
        }
        if let Some(descriptor) = table.column(source) {
            copied.push((source, result.add_column(descriptor.clone())));
        }
    }
    copied
}

/// Reads one row's inputs and runs the command.
fn run_row(
    resolved: &ResolvedCommand,
    table: &Table,
    row: usize,
    log: &mut RunLog,
) -> Result<Vec<OutputValue>, SlideSetError> {
    let mut inputs = CommandInputs::new();
    for (name, input) in &resolved.inputs {
        inputs.insert(*name, input.read(table, row, log)?);
    }
    resolved.command.execute(&inputs, log)
}

/// Keeps the outputs that have a result column, in column order.
fn select_outputs(resolved: &ResolvedCommand, outputs: Vec<OutputValue>) -> Vec<OutputValue> {
    let all = resolved.command.outputs();
    let mut by_name: Vec<(&'static str, OutputValue)> =
        all.iter().map(|spec| spec.name).zip(outputs).collect();
    resolved
        .outputs
        .iter()
        .filter_map(|wanted| {
            let index = by_name.iter().position(|(name, _)| *name == wanted.spec.name)?;
            Some(by_name.swap_remove(index).1)
        })
        .collect()
}

/// Where a run writes its result table when no path is given.
pub fn default_result_path(table_path: &Path, command: CommandKind) -> PathBuf {
    let stem = table_path
        .file_stem()
        .map_or_else(|| "table".into(), |s| s.to_string_lossy().into_owned());
    table_path.with_file_name(format!("{stem}-{}.csv", command.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{write_raster, Raster};
    use crate::roi::io_binary::write_region_set;
    use crate::roi::Region;
    use crate::table::ElementKind;
    use crate::types::{MIME_PNG, MIME_REGION_SET};

    #[test]
    fn scalars_repeat_alongside_sequences() {
        let rows = expand_outputs(vec![
            OutputValue::Scalar(Processed::Text("a".into())),
            OutputValue::Sequence(vec![Processed::Integer(1), Processed::Integer(2)]),
        ])
        .unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Processed::Text("a".into()), Processed::Integer(1)],
                vec![Processed::Text("a".into()), Processed::Integer(2)],
            ]
        );
    }

    #[test]
    fn scalars_alone_give_one_row() {
        let rows = expand_outputs(vec![OutputValue::Scalar(Processed::Boolean(true))]).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(expand_outputs(vec![OutputValue::Sequence(Vec::new())]).unwrap().is_empty());
    }

    #[test]
    fn unequal_sequences_are_rejected() {
        let err = expand_outputs(vec![
            OutputValue::Sequence(vec![Processed::Integer(1)]),
            OutputValue::Sequence(Vec::new()),
        ])
        .unwrap_err();
        assert!(matches!(err, SlideSetError::StructuralMismatch(_)));
    }

    fn fixture(dir: &Path) -> Table {
        let image = Raster::from_fn(&[4, 4], 1, 255.0, |pos, _| (pos[0] + pos[1]) as f64);
        write_raster(&dir.join("a.png"), &image).unwrap();
        write_region_set(
            &dir.join("a.roiset"),
            &[
                Region::rectangle(vec![0.0, 0.0], vec![1.0, 1.0]),
                Region::rectangle(vec![2.0, 2.0], vec![3.0, 3.0]),
            ],
        )
        .unwrap();

        let mut table = Table::new("cells", dir);
        let image = table.add_column(ColumnDescriptor::new("image", ElementKind::FileLink).with_mime(MIME_PNG));
        let rois = table.add_column(
            ColumnDescriptor::new("rois", ElementKind::FileLink).with_mime(MIME_REGION_SET),
        );
        for name in ["a", "missing"] {
            let row = table.add_row();
            table
                .set_underlying_value(image, row, Value::FileLink(format!("{name}.png").into()))
                .unwrap();
            table
                .set_underlying_value(rois, row, Value::FileLink(format!("{name}.roiset").into()))
                .unwrap();
        }
        table
    }

    #[test]
    fn unavailable_rows_are_skipped_with_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let table = fixture(dir.path());
        let skeleton = CommandSkeleton::new(CommandKind::RoiLengths).with_column("regions", "rois");
        let mut log = RunLog::new();

        let result = run_batch(&table, &skeleton, &TypeRegistry::builtin(), &mut log).unwrap();

        assert_eq!(result.column_count(), 2);
        assert_eq!(result.column(0).unwrap().name, "rois");
        assert_eq!(result.column(1).unwrap().name, "length");
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.underlying_value(1, 0).unwrap(), &Value::Double(4.0));
        assert_eq!(log.warning_count(), 1);
        assert_eq!(log.count_code(LogCode::DataUnavailable), 1);
        assert_eq!(log.count_code(LogCode::RowCompleted), 1);
    }

    #[test]
    fn file_outputs_land_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut table = fixture(dir.path());
        table.remove_row(1).unwrap();
        let skeleton = CommandSkeleton::new(CommandKind::CreateMask)
            .with_column("template", "image")
            .with_column("regions", "rois");
        let mut log = RunLog::new();

        let result = run_batch_with(
            &table,
            &skeleton,
            &TypeRegistry::builtin(),
            &FirstCandidate,
            out.path(),
            &mut log,
        )
        .unwrap();

        assert_eq!(result.row_count(), 1);
        assert_eq!(
            result.underlying_value(0, 0).unwrap(),
            &Value::FileLink(dir.path().join("a.png"))
        );
        assert_eq!(result.column(2).unwrap().mime.as_deref(), Some(MIME_PNG));
        assert_eq!(
            result.underlying_value(2, 0).unwrap(),
            &Value::FileLink("mask-0.png".into())
        );
        assert!(out.path().join("mask-0.png").exists());
        assert!(log.is_clean());
    }

    #[test]
    fn selected_outputs_keep_their_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = fixture(dir.path());
        table.remove_row(1).unwrap();
        let mut skeleton = CommandSkeleton::new(CommandKind::RegionStats)
            .with_column("image", "image")
            .with_column("regions", "rois");
        skeleton.outputs.insert(
            "red".into(),
            OutputBinding {
                writer: None,
                column: Some("red_sum".into()),
            },
        );
        skeleton.outputs.insert("size".into(), OutputBinding::default());
        let mut log = RunLog::new();

        let result = run_batch(&table, &skeleton, &TypeRegistry::builtin(), &mut log).unwrap();

        let names: Vec<&str> = result.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["image", "rois", "size", "red_sum"]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.underlying_value(2, 0).unwrap(), &Value::Integer(4));
    }

    #[test]
    fn fatal_errors_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let table = fixture(dir.path());
        let skeleton = CommandSkeleton::new(CommandKind::BorderStats)
            .with_column("image", "image")
            .with_column("regions", "rois")
            .with_constant("channel", Value::Integer(5));
        let mut log = RunLog::new();

        let err = run_batch(&table, &skeleton, &TypeRegistry::builtin(), &mut log).unwrap_err();
        assert!(matches!(err, SlideSetError::MissingChannel { channel: 5, .. }));
    }

    #[test]
    fn default_result_path_names_the_command() {
        assert_eq!(
            default_result_path(Path::new("/data/cells.csv"), CommandKind::RoiLengths),
            PathBuf::from("/data/cells-RoiLengths.csv")
        );
    }
}
