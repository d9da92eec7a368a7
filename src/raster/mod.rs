//! N-dimensional image data.
//!
//! A [`Raster`] stores samples as `f64` in an [`ndarray::ArrayD`], with one
//! [`AxisKind`] per array axis. Every axis except the (optional, single)
//! channel axis is spatial; analysis code addresses pixels by their
//! spatial index vector plus a channel number.

mod io;
pub mod lattice;

pub use io::{from_dynamic_image, read_raster, write_raster};
pub use lattice::{interior_points, LatticeBox};

use ndarray::{ArrayD, Axis, IxDyn};
use serde::Serialize;

use crate::error::SlideSetError;

/// The meaning of one raster axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AxisKind {
    X,
    Y,
    Z,
    Time,
    Channel,
    Other,
}

/// An N-D image with typed axes.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    data: ArrayD<f64>,
    axes: Vec<AxisKind>,
    /// Largest value the source pixel type can hold (255 for 8-bit).
    max_value: f64,
}

impl Raster {
    /// Wraps an array with its axis kinds.
    ///
    /// # Errors
    /// [`SlideSetError::StructuralMismatch`] when the axis list does not
    /// match the array rank or names more than one channel axis.
    pub fn new(
        data: ArrayD<f64>,
        axes: Vec<AxisKind>,
        max_value: f64,
    ) -> Result<Self, SlideSetError> {
        if axes.len() != data.ndim() {
            return Err(SlideSetError::StructuralMismatch(format!(
                "{} axis kind(s) for a {}-D array",
                axes.len(),
                data.ndim()
            )));
        }
        if axes.iter().filter(|a| **a == AxisKind::Channel).count() > 1 {
            return Err(SlideSetError::StructuralMismatch(
                "a raster has at most one channel axis".to_string(),
            ));
        }
        Ok(Self {
            data,
            axes,
            max_value,
        })
    }

    /// A zero-filled raster with the given spatial shape and a trailing
    /// channel axis.
    pub fn zeros(spatial: &[usize], channels: usize, max_value: f64) -> Self {
        let mut shape = spatial.to_vec();
        shape.push(channels);
        let mut axes: Vec<AxisKind> = (0..spatial.len()).map(default_spatial_axis).collect();
        axes.push(AxisKind::Channel);
        Self {
            data: ArrayD::zeros(IxDyn(&shape)),
            axes,
            max_value,
        }
    }

    /// Like [`Raster::zeros`] but filled from `f(spatial_index, channel)`.
    pub fn from_fn(
        spatial: &[usize],
        channels: usize,
        max_value: f64,
        f: impl Fn(&[usize], usize) -> f64,
    ) -> Self {
        let mut raster = Self::zeros(spatial, channels, max_value);
        let n = spatial.len();
        for (index, value) in raster.data.indexed_iter_mut() {
            let position: Vec<usize> = (0..n).map(|d| index[d]).collect();
            *value = f(&position, index[n]);
        }
        raster
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn axes(&self) -> &[AxisKind] {
        &self.axes
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    fn channel_axis(&self) -> Option<usize> {
        self.axes.iter().position(|a| *a == AxisKind::Channel)
    }

    /// Sizes of the spatial axes, in axis order.
    pub fn spatial_dims(&self) -> Vec<usize> {
        self.axes
            .iter()
            .zip(self.data.shape())
            .filter(|(kind, _)| **kind != AxisKind::Channel)
            .map(|(_, len)| *len)
            .collect()
    }

    /// Number of channels; 1 when there is no channel axis.
    pub fn channel_count(&self) -> usize {
        self.channel_axis()
            .map_or(1, |axis| self.data.shape()[axis])
    }

    /// Fails with [`SlideSetError::MissingChannel`] if `channel` is absent.
    pub fn require_channel(&self, channel: usize) -> Result<(), SlideSetError> {
        if channel < self.channel_count() {
            Ok(())
        } else {
            Err(SlideSetError::MissingChannel {
                channel,
                count: self.channel_count(),
            })
        }
    }

    /// Array index for a spatial position; `None` when out of bounds.
    ///
    /// Missing trailing spatial coordinates are taken as 0 and surplus
    /// ones are ignored.
    fn index_of(&self, spatial: &[i64], channel: usize) -> Option<Vec<usize>> {
        let shape = self.data.shape();
        let mut next_spatial = 0;
        let mut index = Vec::with_capacity(shape.len());
        for (axis, kind) in self.axes.iter().enumerate() {
            let i = if *kind == AxisKind::Channel {
                channel
            } else {
                let coord = spatial.get(next_spatial).copied().unwrap_or(0);
                next_spatial += 1;
                usize::try_from(coord).ok()?
            };
            if i >= shape[axis] {
                return None;
            }
            index.push(i);
        }
        if self.channel_axis().is_none() && channel != 0 {
            return None;
        }
        Some(index)
    }

    /// The sample at a spatial position, or 0 outside the raster.
    pub fn sample(&self, spatial: &[i64], channel: usize) -> f64 {
        self.index_of(spatial, channel)
            .map_or(0.0, |index| self.data[IxDyn(&index)])
    }

    /// Stores a sample; positions outside the raster are ignored.
    pub fn set_sample(&mut self, spatial: &[i64], channel: usize, value: f64) {
        if let Some(index) = self.index_of(spatial, channel) {
            self.data[IxDyn(&index)] = value;
        }
    }

    /// Largest sample of one channel (0 for an empty raster).
    pub fn channel_max(&self, channel: usize) -> f64 {
        let fold = |acc: Option<f64>, v: &f64| {
            if v.is_nan() {
                acc
            } else {
                Some(acc.map_or(*v, |m| m.max(*v)))
            }
        };
        let max = match self.channel_axis() {
            Some(axis) if channel < self.data.shape()[axis] => self
                .data
                .index_axis(Axis(axis), channel)
                .iter()
                .fold(None, fold),
            None if channel == 0 => self.data.iter().fold(None, fold),
            _ => None,
        };
        max.unwrap_or(0.0)
    }
}

fn default_spatial_axis(i: usize) -> AxisKind {
    match i {
        0 => AxisKind::X,
        1 => AxisKind::Y,
        2 => AxisKind::Z,
        3 => AxisKind::Time,
        _ => AxisKind::Other,
    }
}
