//! The built-in commands, their parameters and how they run.

use std::fmt;

use serde::Serialize;

use super::OutputValue;
use crate::analysis::{
    self, BorderStatsOptions, ChannelThreshold, Combine, CorrelationOptions, MandersOptions,
    RegionStatsNChanOptions, RegionStatsOptions, ThresholdOptions,
};
use crate::error::SlideSetError;
use crate::raster::Raster;
use crate::report::RunLog;
use crate::roi::lengths::roi_lengths;
use crate::roi::Region;
use crate::table::Value;
use crate::types::{Processed, ProcessedType, ProcessedType as T};

/// A runnable analysis command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum CommandKind {
    RegionStats,
    RegionStatsNChan,
    BorderStats,
    Correlation,
    Manders,
    RoiOverlap,
    BinRegions,
    FilterRegions,
    RoiLengths,
    ThresholdSegmentation,
    CreateMask,
    OtsuSegmentation,
}

/// Whether an output holds one value per row or one per region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    Scalar,
    Sequence,
}

/// A command parameter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InputSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: ProcessedType,
    /// Used when the parameter is left unbound. Inputs without a default
    /// are required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// A command result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub ty: ProcessedType,
    pub shape: OutputShape,
}

fn required(name: &'static str, ty: ProcessedType) -> InputSpec {
    InputSpec {
        name,
        ty,
        default: None,
    }
}

fn optional(name: &'static str, ty: ProcessedType, default: Value) -> InputSpec {
    InputSpec {
        name,
        ty,
        default: Some(default),
    }
}

fn per_region(name: &'static str, ty: ProcessedType) -> OutputSpec {
    OutputSpec {
        name,
        ty,
        shape: OutputShape::Sequence,
    }
}

fn per_row(name: &'static str, ty: ProcessedType) -> OutputSpec {
    OutputSpec {
        name,
        ty,
        shape: OutputShape::Scalar,
    }
}

/// Marks an unused optional channel of threshold segmentation.
const NO_CHANNEL: i64 = -1;

impl CommandKind {
    pub const ALL: [CommandKind; 12] = [
        CommandKind::RegionStats,
        CommandKind::RegionStatsNChan,
        CommandKind::BorderStats,
        CommandKind::Correlation,
        CommandKind::Manders,
        CommandKind::RoiOverlap,
        CommandKind::BinRegions,
        CommandKind::FilterRegions,
        CommandKind::RoiLengths,
        CommandKind::ThresholdSegmentation,
        CommandKind::CreateMask,
        CommandKind::OtsuSegmentation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CommandKind::RegionStats => "RegionStats",
            CommandKind::RegionStatsNChan => "RegionStatsNChan",
            CommandKind::BorderStats => "BorderStats",
            CommandKind::Correlation => "Correlation",
            CommandKind::Manders => "Manders",
            CommandKind::RoiOverlap => "RoiOverlap",
            CommandKind::BinRegions => "BinRegions",
            CommandKind::FilterRegions => "FilterRegions",
            CommandKind::RoiLengths => "RoiLengths",
            CommandKind::ThresholdSegmentation => "ThresholdSegmentation",
            CommandKind::CreateMask => "CreateMask",
            CommandKind::OtsuSegmentation => "OtsuSegmentation",
        }
    }

    /// Looks a command up by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Result<CommandKind, SlideSetError> {
        CommandKind::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| SlideSetError::UnknownCommand(name.to_string()))
    }

    pub fn description(self) -> &'static str {
        match self {
            CommandKind::RegionStats => "Thresholded red/green/blue sums per region",
            CommandKind::RegionStatsNChan => "Thresholded per-channel sums and averages per region",
            CommandKind::BorderStats => "Intensity near the outline versus inside each region",
            CommandKind::Correlation => "Pearson correlation of two channels per region",
            CommandKind::Manders => "Manders colocalization coefficients per region",
            CommandKind::RoiOverlap => "Shared and exclusive pixels of paired regions",
            CommandKind::BinRegions => "Index of the first bin containing each region",
            CommandKind::FilterRegions => "Regions covered by the union of mask regions",
            CommandKind::RoiLengths => "Perimeter or length of each region",
            CommandKind::ThresholdSegmentation => "Outlines of blobs above channel thresholds",
            CommandKind::CreateMask => "Binary mask image of a region set",
            CommandKind::OtsuSegmentation => "Otsu threshold and mask per channel",
        }
    }

    /// Parameters, in binding order.
    pub fn inputs(self) -> Vec<InputSpec> {
        let image = || required("image", T::Image);
        let regions = || required("regions", T::RegionSet);
        let number = |name, v: f64| optional(name, T::Number, Value::Double(v));
        let integer = |name, v: i64| optional(name, T::Integer, Value::Integer(v));
        let flag = |name, v: bool| optional(name, T::Boolean, Value::Boolean(v));

        match self {
            CommandKind::RegionStats => vec![
                image(),
                regions(),
                number("red_threshold", 0.0),
                number("green_threshold", 0.0),
                number("blue_threshold", 0.0),
                flag("invert", false),
            ],
            CommandKind::RegionStatsNChan => vec![
                image(),
                regions(),
                number("threshold", 0.0),
                flag("invert", false),
            ],
            CommandKind::BorderStats => vec![
                image(),
                regions(),
                integer("channel", 0),
                number("threshold", 0.0),
                number("radius", 1.0),
            ],
            CommandKind::Correlation => vec![
                image(),
                regions(),
                integer("channel_a", 0),
                integer("channel_b", 1),
                number("threshold_a", 0.0),
                number("threshold_b", 0.0),
            ],
            CommandKind::Manders => vec![
                image(),
                regions(),
                integer("channel_a", 0),
                integer("channel_b", 1),
                number("threshold_a", 0.0),
                number("threshold_b", 0.0),
                flag("weighted", true),
            ],
            CommandKind::RoiOverlap => vec![
                image(),
                required("regions_a", T::RegionSet),
                required("regions_b", T::RegionSet),
            ],
            CommandKind::BinRegions => vec![regions(), required("bins", T::RegionSet)],
            CommandKind::FilterRegions => vec![regions(), required("masks", T::RegionSet)],
            CommandKind::RoiLengths => vec![regions()],
            CommandKind::ThresholdSegmentation => vec![
                image(),
                integer("channel", 0),
                number("threshold", 0.0),
                integer("channel_2", NO_CHANNEL),
                number("threshold_2", 0.0),
                integer("channel_3", NO_CHANNEL),
                number("threshold_3", 0.0),
                flag("combine_or", false),
                integer("min_size", 1),
                integer("max_size", i64::MAX),
            ],
            CommandKind::CreateMask => vec![required("template", T::Image), regions()],
            CommandKind::OtsuSegmentation => vec![image()],
        }
    }

    /// Results, in column order.
    pub fn outputs(self) -> Vec<OutputSpec> {
        match self {
            CommandKind::RegionStats => vec![
                per_region("size", T::Integer),
                per_region("red", T::Double),
                per_region("green", T::Double),
                per_region("blue", T::Double),
            ],
            CommandKind::RegionStatsNChan => vec![
                per_region("size", T::Integer),
                per_region("values", T::DoubleArray),
                per_region("averages", T::DoubleArray),
            ],
            CommandKind::BorderStats => vec![
                per_region("border_size", T::Integer),
                per_region("border_value", T::Double),
                per_region("interior_size", T::Integer),
                per_region("interior_value", T::Double),
            ],
            CommandKind::Correlation => vec![
                per_region("coefficient", T::Double),
                per_region("pixel_count", T::Integer),
            ],
            CommandKind::Manders => vec![per_region("m1", T::Double), per_region("m2", T::Double)],
            CommandKind::RoiOverlap => vec![
                per_region("overlap", T::Integer),
                per_region("a_out_b", T::Integer),
                per_region("b_out_a", T::Integer),
            ],
            CommandKind::BinRegions => vec![per_region("bin", T::Integer)],
            CommandKind::FilterRegions => vec![
                per_row("kept", T::RegionSet),
                per_row("kept_indices", T::IntegerArray),
            ],
            CommandKind::RoiLengths => vec![per_region("length", T::Double)],
            CommandKind::ThresholdSegmentation => vec![
                per_row("blobs", T::RegionSet),
                per_row("blob_count", T::Integer),
            ],
            CommandKind::CreateMask => vec![per_row("mask", T::Image)],
            CommandKind::OtsuSegmentation => vec![
                per_row("thresholds", T::DoubleArray),
                per_row("mask", T::Image),
            ],
        }
    }

    /// Runs the command on one row's inputs.
    ///
    /// The outputs follow [`CommandKind::outputs`] in order.
    pub fn execute(self, inputs: &CommandInputs, log: &mut RunLog) -> Result<Vec<OutputValue>, SlideSetError> {
        let outputs = match self {
            CommandKind::RegionStats => {
                let options = RegionStatsOptions {
                    thresholds: [
                        inputs.number("red_threshold")?,
                        inputs.number("green_threshold")?,
                        inputs.number("blue_threshold")?,
                    ],
                    invert: inputs.flag("invert")?,
                };
                let stats = analysis::region_stats(inputs.image("image")?, inputs.regions("regions")?, &options, log);
                vec![counts(&stats.size), doubles(&stats.red), doubles(&stats.green), doubles(&stats.blue)]
            }
            CommandKind::RegionStatsNChan => {
                let image = inputs.image("image")?;
                let options = RegionStatsNChanOptions {
                    thresholds: vec![inputs.number("threshold")?; image.channel_count()],
                    invert: inputs.flag("invert")?,
                };
                let stats = analysis::region_stats_n_chan(image, inputs.regions("regions")?, &options, log);
                vec![counts(&stats.size), double_arrays(stats.values), double_arrays(stats.averages)]
            }
            CommandKind::BorderStats => {
                let options = BorderStatsOptions {
                    channel: inputs.index("channel")?,
                    threshold: inputs.number("threshold")?,
                    radius: inputs.number("radius")?,
                };
                let stats = analysis::border_stats(inputs.image("image")?, inputs.regions("regions")?, &options, log)?;
                vec![
                    counts(&stats.border_size),
                    doubles(&stats.border_value),
                    counts(&stats.interior_size),
                    doubles(&stats.interior_value),
                ]
            }
            CommandKind::Correlation => {
                let options = CorrelationOptions {
                    channels: (inputs.index("channel_a")?, inputs.index("channel_b")?),
                    thresholds: (inputs.number("threshold_a")?, inputs.number("threshold_b")?),
                };
                let result = analysis::correlation(inputs.image("image")?, inputs.regions("regions")?, &options, log)?;
                vec![doubles(&result.coefficient), counts(&result.pixel_count)]
            }
            CommandKind::Manders => {
                let options = MandersOptions {
                    channels: vec![inputs.index("channel_a")?, inputs.index("channel_b")?],
                    thresholds: vec![inputs.number("threshold_a")?, inputs.number("threshold_b")?],
                    weighted: inputs.flag("weighted")?,
                };
                let regions = inputs.regions("regions")?;
                let result = analysis::manders(inputs.image("image")?, regions, &options, log)?;
                let m1: Vec<f64> = (0..regions.len()).map(|r| result.pair(r, 0, 1)).collect();
                let m2: Vec<f64> = (0..regions.len()).map(|r| result.pair(r, 1, 0)).collect();
                vec![doubles(&m1), doubles(&m2)]
            }
            CommandKind::RoiOverlap => {
                let result = analysis::roi_overlap(
                    inputs.image("image")?,
                    inputs.regions("regions_a")?,
                    inputs.regions("regions_b")?,
                    log,
                )?;
                vec![counts(&result.overlap), counts(&result.a_out_b), counts(&result.b_out_a)]
            }
            CommandKind::BinRegions => {
                let bins = analysis::bin_regions(inputs.regions("regions")?, inputs.regions("bins")?, log);
                vec![OutputValue::Sequence(bins.into_iter().map(Processed::Integer).collect())]
            }
            CommandKind::FilterRegions => {
                let kept = analysis::filter_regions(inputs.regions("regions")?, inputs.regions("masks")?, log);
                let indices = kept.indices.iter().map(|i| *i as i64).collect();
                vec![
                    OutputValue::Scalar(Processed::RegionSet(kept.regions)),
                    OutputValue::Scalar(Processed::IntegerArray(indices)),
                ]
            }
            CommandKind::RoiLengths => {
                vec![doubles(&roi_lengths(inputs.regions("regions")?, log))]
            }
            CommandKind::ThresholdSegmentation => {
                let mut channels = Vec::new();
                for (channel, threshold) in [
                    ("channel", "threshold"),
                    ("channel_2", "threshold_2"),
                    ("channel_3", "threshold_3"),
                ] {
                    if inputs.integer(channel)? == NO_CHANNEL {
                        continue;
                    }
                    channels.push(ChannelThreshold {
                        channel: inputs.index(channel)?,
                        threshold: inputs.number(threshold)?,
                    });
                }
                let options = ThresholdOptions {
                    channels,
                    combine: if inputs.flag("combine_or")? { Combine::Or } else { Combine::And },
                    min_size: inputs.integer("min_size")?.max(0) as u64,
                    max_size: inputs.integer("max_size")?.max(0) as u64,
                };
                let blobs = analysis::threshold_segmentation(inputs.image("image")?, &options, log)?;
                let count = blobs.len() as i64;
                vec![
                    OutputValue::Scalar(Processed::RegionSet(blobs)),
                    OutputValue::Scalar(Processed::Integer(count)),
                ]
            }
            CommandKind::CreateMask => {
                let mask = analysis::create_mask(inputs.image("template")?, inputs.regions("regions")?, log);
                vec![OutputValue::Scalar(Processed::Image(mask))]
            }
            CommandKind::OtsuSegmentation => {
                let result = analysis::otsu_segmentation(inputs.image("image")?, log)?;
                vec![
                    OutputValue::Scalar(Processed::DoubleArray(result.thresholds)),
                    OutputValue::Scalar(Processed::Image(result.mask)),
                ]
            }
        };
        Ok(outputs)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn counts(values: &[u64]) -> OutputValue {
    OutputValue::Sequence(values.iter().map(|v| Processed::Integer(*v as i64)).collect())
}

fn doubles(values: &[f64]) -> OutputValue {
    OutputValue::Sequence(values.iter().map(|v| Processed::Double(*v)).collect())
}

fn double_arrays(values: Vec<Vec<f64>>) -> OutputValue {
    OutputValue::Sequence(values.into_iter().map(Processed::DoubleArray).collect())
}

/// One row's processed inputs, by parameter name.
#[derive(Debug, Default)]
pub struct CommandInputs {
    values: Vec<(&'static str, Processed)>,
}

impl CommandInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, value: Processed) {
        self.values.retain(|(n, _)| *n != name);
        self.values.push((name, value));
    }

    pub fn get(&self, name: &str) -> Result<&Processed, SlideSetError> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| SlideSetError::StructuralMismatch(format!("input '{name}' is not bound")))
    }

    fn mismatch(name: &str, expected: ProcessedType, got: &Processed) -> SlideSetError {
        SlideSetError::StructuralMismatch(format!(
            "input '{name}' should be {expected}, got {}",
            got.processed_type()
        ))
    }

    pub fn image(&self, name: &str) -> Result<&Raster, SlideSetError> {
        match self.get(name)? {
            Processed::Image(raster) => Ok(raster),
            other => Err(Self::mismatch(name, T::Image, other)),
        }
    }

    pub fn regions(&self, name: &str) -> Result<&[Region], SlideSetError> {
        match self.get(name)? {
            Processed::RegionSet(regions) => Ok(regions),
            other => Err(Self::mismatch(name, T::RegionSet, other)),
        }
    }

    pub fn number(&self, name: &str) -> Result<f64, SlideSetError> {
        let value = self.get(name)?;
        value.as_f64().ok_or_else(|| Self::mismatch(name, T::Number, value))
    }

    pub fn integer(&self, name: &str) -> Result<i64, SlideSetError> {
        match self.get(name)? {
            Processed::Integer(v) => Ok(*v),
            other => Err(Self::mismatch(name, T::Integer, other)),
        }
    }

    /// An integer input used as a channel or other index.
    pub fn index(&self, name: &str) -> Result<usize, SlideSetError> {
        let v = self.integer(name)?;
        usize::try_from(v).map_err(|_| {
            SlideSetError::StructuralMismatch(format!("input '{name}' must not be negative, got {v}"))
        })
    }

    pub fn flag(&self, name: &str) -> Result<bool, SlideSetError> {
        match self.get(name)? {
            Processed::Boolean(v) => Ok(*v),
            other => Err(Self::mismatch(name, T::Boolean, other)),
        }
    }
}
