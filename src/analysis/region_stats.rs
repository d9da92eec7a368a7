//! Thresholded intensity sums inside regions.

use serde::Serialize;

use super::{above_threshold, region_box, to_real};
use crate::raster::Raster;
use crate::report::RunLog;
use crate::roi::Region;

/// Options for [`region_stats`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionStatsOptions {
    /// Thresholds for the red, green and blue channels.
    pub thresholds: [f64; 3],
    /// Sum `max(t - s, 0)` instead of `max(s - t, 0)`.
    pub invert: bool,
}

/// Per-region results of [`region_stats`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RegionStats {
    /// Number of lattice points inside each region.
    pub size: Vec<u64>,
    pub red: Vec<f64>,
    pub green: Vec<f64>,
    pub blue: Vec<f64>,
}

/// Sums thresholded channel 0/1/2 intensities over each region.
///
/// Channels the image does not have report 0.
pub fn region_stats(
    image: &Raster,
    regions: &[Region],
    options: &RegionStatsOptions,
    log: &mut RunLog,
) -> RegionStats {
    let n_chan = region_stats_n_chan(
        image,
        regions,
        &RegionStatsNChanOptions {
            thresholds: options.thresholds.to_vec(),
            invert: options.invert,
        },
        log,
    );

    let channel = |c: usize| -> Vec<f64> {
        n_chan
            .values
            .iter()
            .map(|per_channel| per_channel.get(c).copied().unwrap_or(0.0))
            .collect()
    };

    RegionStats {
        red: channel(0),
        green: channel(1),
        blue: channel(2),
        size: n_chan.size,
    }
}

/// Options for [`region_stats_n_chan`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionStatsNChanOptions {
    /// One threshold per channel; missing entries are 0.
    pub thresholds: Vec<f64>,
    pub invert: bool,
}

/// Per-region results of [`region_stats_n_chan`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RegionStatsNChan {
    pub size: Vec<u64>,
    /// `values[region][channel]`: thresholded intensity sum.
    pub values: Vec<Vec<f64>>,
    /// `averages[region][channel]`: `values / size`, or 0 for empty regions.
    pub averages: Vec<Vec<f64>>,
}

/// Like [`region_stats`], over every channel of the image.
pub fn region_stats_n_chan(
    image: &Raster,
    regions: &[Region],
    options: &RegionStatsNChanOptions,
    log: &mut RunLog,
) -> RegionStatsNChan {
    let dims = image.spatial_dims();
    let channels = image.channel_count();
    let threshold = |c: usize| options.thresholds.get(c).copied().unwrap_or(0.0);

    let mut out = RegionStatsNChan::default();
    for (index, region) in regions.iter().enumerate() {
        let mut size = 0u64;
        let mut values = vec![0.0; channels];

        if let Some(bounds) = region_box(&dims, region, index, 0, log) {
            for point in bounds.iter() {
                if !region.contains(&to_real(&point)) {
                    continue;
                }
                size += 1;
                for (c, value) in values.iter_mut().enumerate() {
                    *value += above_threshold(image.sample(&point, c), threshold(c), options.invert);
                }
            }
        }

        let averages = values
            .iter()
            .map(|v| if size == 0 { 0.0 } else { v / size as f64 })
            .collect();
        out.size.push(size);
        out.values.push(values);
        out.averages.push(averages);
    }
    out
}
