//! The built-in analysis commands.
//!
//! Each command takes a raster and/or region sets and returns plain result
//! structs, one entry per region. They share the same iteration contract:
//!
//! 1. compute the region's lattice box, clamped to the raster
//! 2. visit every lattice point of the box (first axis fastest)
//! 3. classify the point against the region(s) and accumulate
//!
//! A region that cannot be iterated (for example one with more dimensions
//! than the raster) is logged and reported with zero statistics. Missing
//! channels and unequal paired inputs abort the command.

pub mod bin_regions;
pub mod border_stats;
pub mod correlation;
pub mod manders;
pub mod mask;
pub mod otsu;
pub mod overlap;
pub mod region_stats;
pub mod threshold;

pub use bin_regions::{bin_regions, filter_regions, FilteredRegions};
pub use border_stats::{border_stats, BorderStats, BorderStatsOptions};
pub use correlation::{correlation, Correlation, CorrelationOptions};
pub use manders::{manders, Manders, MandersOptions};
pub use mask::create_mask;
pub use otsu::{channel_histogram, otsu_segmentation, otsu_threshold, OtsuSegmentation};
pub use overlap::{roi_overlap, Overlap};
pub use region_stats::{
    region_stats, region_stats_n_chan, RegionStats, RegionStatsNChan, RegionStatsNChanOptions,
    RegionStatsOptions,
};
pub use threshold::{threshold_segmentation, ChannelThreshold, Combine, ThresholdOptions};

use crate::raster::{interior_points, LatticeBox};
use crate::report::{LogCode, LogContext, RunLog};
use crate::roi::Region;

/// The clamped lattice box of `region`, grown by `margin`.
///
/// Logs a warning and returns `None` when the region spans more axes than
/// the raster. A region entirely outside the raster also yields `None`,
/// silently.
pub(crate) fn region_box(
    dims: &[usize],
    region: &Region,
    index: usize,
    margin: i64,
    log: &mut RunLog,
) -> Option<LatticeBox> {
    match LatticeBox::for_region_in_with_margin(region, dims, margin) {
        Ok(bounds) => bounds,
        Err(err) => {
            log.warn(
                LogCode::DimensionMismatch,
                format!("skipping {}: {err}", region.kind_name()),
                LogContext::Region { index },
            );
            None
        }
    }
}

#[inline]
pub(crate) fn to_real(point: &[i64]) -> Vec<f64> {
    point.iter().map(|v| *v as f64).collect()
}

/// Thresholded contribution of one sample.
///
/// `max(s - t, 0)`, or `max(t - s, 0)` when inverted.
#[inline]
pub(crate) fn above_threshold(sample: f64, threshold: f64, invert: bool) -> f64 {
    if invert {
        (threshold - sample).max(0.0)
    } else {
        (sample - threshold).max(0.0)
    }
}

/// The points that must be covered for `region` to count as inside another
/// region.
///
/// Points and lines use their defining points. Area shapes use their
/// interior lattice points, falling back to the defining points when the
/// shape is too thin to contain any.
pub fn membership_points(region: &Region) -> Vec<Vec<f64>> {
    if !region.is_area() {
        return region.defining_points();
    }
    let interior = interior_points(region);
    if interior.is_empty() {
        region.defining_points()
    } else {
        interior
    }
}
