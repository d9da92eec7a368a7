//! Slide Set: batch region-of-interest analysis over tables of images.
//!
//! A table row references images and region sets. Slide Set runs one
//! analysis command over every row, converting cell values into images and
//! regions on the way in and results back into cells on the way out.
//!
//! # Modules
//!
//! - [`roi`]: Region shapes, geometry, SVG and binary region-set formats
//! - [`raster`]: N-dimensional images and lattice iteration
//! - [`analysis`]: Statistics and segmentation commands
//! - [`table`]: The data table and its CSV form
//! - [`types`]: Readers, writers and the type registry that matches them
//! - [`batch`]: Command skeletons and the row-by-row runner
//! - [`report`]: The run log
//! - [`error`]: Error types for Slide Set operations

pub mod analysis;
pub mod batch;
pub mod error;
pub mod raster;
pub mod report;
pub mod roi;
pub mod table;
pub mod types;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use batch::{CommandKind, FirstCandidate};
pub use error::SlideSetError;
use report::RunLog;
use types::TypeRegistry;

/// The slideset CLI application.
#[derive(Parser)]
#[command(name = "slideset")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run a command skeleton over every row of a table.
    Run(RunArgs),
    /// Parse an SVG file into regions.
    Svg(SvgArgs),
    /// List the built-in commands with their inputs and outputs.
    Commands(CommandsArgs),
}

/// Report format for command output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Arguments for the run subcommand.
#[derive(clap::Args)]
struct RunArgs {
    /// Input table (CSV with `name:kind[:mime]` headers).
    table: PathBuf,

    /// Command skeleton (.json, .yaml or .yml).
    skeleton: PathBuf,

    /// Result table path (default: `<table>-<command>.csv` next to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format.
    #[arg(long = "report", value_enum, default_value = "text", env = "SLIDESET_REPORT")]
    report: ReportFormat,

    /// Treat warnings as errors (exit non-zero if any row was skipped).
    #[arg(long)]
    strict: bool,
}

/// Arguments for the svg subcommand.
#[derive(clap::Args)]
struct SvgArgs {
    /// SVG file to parse.
    input: PathBuf,

    /// Report format.
    #[arg(long = "report", value_enum, default_value = "text", env = "SLIDESET_REPORT")]
    report: ReportFormat,

    /// Treat warnings as errors (exit non-zero if any node was skipped).
    #[arg(long)]
    strict: bool,
}

/// Arguments for the commands subcommand.
#[derive(clap::Args)]
struct CommandsArgs {
    /// Report format.
    #[arg(long = "report", value_enum, default_value = "text", env = "SLIDESET_REPORT")]
    report: ReportFormat,
}

/// Run the slideset CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), SlideSetError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run(args)) => run_table(args),
        Some(Commands::Svg(args)) => run_svg(args),
        Some(Commands::Commands(args)) => run_commands(args),
        None => {
            println!("slideset {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Batch region-of-interest analysis over tables of images.");
            println!();
            println!("Run 'slideset --help' for usage information.");
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct RunReport<'a> {
    command: CommandKind,
    output: &'a Path,
    rows: usize,
    warning_count: usize,
    log: &'a RunLog,
}

/// Execute the run subcommand.
fn run_table(args: RunArgs) -> Result<(), SlideSetError> {
    let table = table::io_csv::read_table_csv(&args.table)?;
    let skeleton = batch::read_skeleton(&args.skeleton)?;
    let command = CommandKind::from_name(&skeleton.command)?;
    let output = args
        .output
        .unwrap_or_else(|| batch::default_result_path(&args.table, command));
    let output_dir = output
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let mut log = RunLog::new();
    let result = batch::run_batch_with(
        &table,
        &skeleton,
        &TypeRegistry::builtin(),
        &FirstCandidate,
        &output_dir,
        &mut log,
    )?;
    table::io_csv::write_table_csv(&output, &result)?;

    match args.report {
        ReportFormat::Json => {
            let report = RunReport {
                command,
                output: &output,
                rows: result.row_count(),
                warning_count: log.warning_count(),
                log: &log,
            };
            println!("{}", to_json(&report)?);
        }
        ReportFormat::Text => {
            println!(
                "{command}: wrote {} row(s) to {}",
                result.row_count(),
                output.display()
            );
            print!("{log}");
        }
    }

    finish(args.strict, log)
}

#[derive(Serialize)]
struct SvgReport<'a> {
    regions: &'a [roi::Region],
    warning_count: usize,
    log: &'a RunLog,
}

/// Execute the svg subcommand.
fn run_svg(args: SvgArgs) -> Result<(), SlideSetError> {
    let mut log = RunLog::new();
    let regions = roi::svg::read_svg_regions(&args.input, &mut log)?;

    match args.report {
        ReportFormat::Json => {
            let report = SvgReport {
                regions: &regions,
                warning_count: log.warning_count(),
                log: &log,
            };
            println!("{}", to_json(&report)?);
        }
        ReportFormat::Text => {
            println!("{} region(s) in {}", regions.len(), args.input.display());
            for (i, region) in regions.iter().enumerate() {
                println!(
                    "  [{i}] {} ({}-D, {} defining point(s))",
                    region.kind_name(),
                    region.num_dimensions(),
                    region.defining_points().len()
                );
            }
            print!("{log}");
        }
    }

    finish(args.strict, log)
}

#[derive(Serialize)]
struct CommandListing {
    name: &'static str,
    description: &'static str,
    inputs: Vec<batch::InputSpec>,
    outputs: Vec<batch::OutputSpec>,
}

/// Execute the commands subcommand.
fn run_commands(args: CommandsArgs) -> Result<(), SlideSetError> {
    let listing: Vec<CommandListing> = CommandKind::ALL
        .into_iter()
        .map(|command| CommandListing {
            name: command.name(),
            description: command.description(),
            inputs: command.inputs(),
            outputs: command.outputs(),
        })
        .collect();

    match args.report {
        ReportFormat::Json => println!("{}", to_json(&listing)?),
        ReportFormat::Text => {
            for command in &listing {
                println!("{}: {}", command.name, command.description);
                for input in &command.inputs {
                    match &input.default {
                        Some(default) => {
                            println!("  in  {} ({}, default {default})", input.name, input.ty)
                        }
                        None => println!("  in  {} ({})", input.name, input.ty),
                    }
                }
                for output in &command.outputs {
                    let per = match output.shape {
                        batch::OutputShape::Scalar => "per row",
                        batch::OutputShape::Sequence => "per region",
                    };
                    println!("  out {} ({}, {per})", output.name, output.ty);
                }
            }
        }
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, SlideSetError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| SlideSetError::Io(std::io::Error::other(e)))
}

/// Fails strict runs that logged warnings.
fn finish(strict: bool, log: RunLog) -> Result<(), SlideSetError> {
    if strict && log.warning_count() > 0 {
        Err(SlideSetError::RunFailed {
            warning_count: log.warning_count(),
            log,
        })
    } else {
        Ok(())
    }
}
