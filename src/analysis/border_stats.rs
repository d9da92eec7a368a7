//! Intensity near a region's outline versus inside it.

use serde::Serialize;

use super::{above_threshold, region_box, to_real};
use crate::error::SlideSetError;
use crate::raster::Raster;
use crate::report::{LogCode, LogContext, RunLog};
use crate::roi::geometry::{boundary_polylines, distance_to_polylines};
use crate::roi::{Coord, Region};

/// Options for [`border_stats`].
#[derive(Clone, Debug, PartialEq)]
pub struct BorderStatsOptions {
    pub channel: usize,
    pub threshold: f64,
    /// Points within this distance of the outline count as border.
    pub radius: f64,
}

impl Default for BorderStatsOptions {
    fn default() -> Self {
        Self {
            channel: 0,
            threshold: 0.0,
            radius: 1.0,
        }
    }
}

/// Per-region results of [`border_stats`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BorderStats {
    pub border_size: Vec<u64>,
    pub border_value: Vec<f64>,
    pub interior_size: Vec<u64>,
    pub interior_value: Vec<f64>,
}

/// Splits each region's pixels into a border band and an interior.
///
/// The region box is grown by `ceil(radius)` so the band also covers
/// points just outside the outline. A point within `radius` of the outline
/// is border whether or not the region contains it; any other contained
/// point is interior.
///
/// # Errors
/// [`SlideSetError::MissingChannel`] if the image lacks the channel.
pub fn border_stats(
    image: &Raster,
    regions: &[Region],
    options: &BorderStatsOptions,
    log: &mut RunLog,
) -> Result<BorderStats, SlideSetError> {
    image.require_channel(options.channel)?;
    let dims = image.spatial_dims();
    let margin = options.radius.max(0.0).ceil() as i64;

    let mut out = BorderStats::default();
    for (index, region) in regions.iter().enumerate() {
        let (mut border_size, mut border_value) = (0u64, 0.0);
        let (mut interior_size, mut interior_value) = (0u64, 0.0);

        let outline = boundary_polylines(region);
        if outline.is_none() {
            log.warn(
                LogCode::RegionSkipped,
                format!(
                    "no planar outline for {}-D {}",
                    region.num_dimensions(),
                    region.kind_name()
                ),
                LogContext::Region { index },
            );
        }

        let bounds = outline
            .as_ref()
            .and_then(|_| region_box(&dims, region, index, margin, log));
        if let (Some(outline), Some(bounds)) = (outline, bounds) {
            for point in bounds.iter() {
                let real = to_real(&point);
                let near = real.len() >= 2
                    && distance_to_polylines(&Coord::new(real[0], real[1]), &outline)
                        <= options.radius;
                let value = above_threshold(
                    image.sample(&point, options.channel),
                    options.threshold,
                    false,
                );
                if near {
                    border_size += 1;
                    border_value += value;
                } else if region.contains(&real) {
                    interior_size += 1;
                    interior_value += value;
                }
            }
        }

        out.border_size.push(border_size);
        out.border_value.push(border_value);
        out.interior_size.push(interior_size);
        out.interior_value.push(interior_value);
    }
    Ok(out)
}
