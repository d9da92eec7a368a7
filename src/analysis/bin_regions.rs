//! Region-in-region tests: binning and mask filtering.
//!
//! Containment of one region in another is evaluated pointwise over the
//! inner region's membership points (see [`membership_points`]), never by
//! polygon clipping.

use serde::Serialize;

use super::membership_points;
use crate::report::{LogCode, LogContext, RunLog};
use crate::roi::Region;

/// Index of the first bin containing each region, or -1.
///
/// A bin contains a region when every membership point of the region is
/// inside the bin. A region without membership points is never binned. A
/// bin of different dimensionality is logged and skipped for that region.
pub fn bin_regions(regions: &[Region], bins: &[Region], log: &mut RunLog) -> Vec<i64> {
    regions
        .iter()
        .enumerate()
        .map(|(index, region)| {
            let points = membership_points(region);
            if points.is_empty() {
                return -1;
            }
            for (b, bin) in bins.iter().enumerate() {
                if !same_dimensions(region, bin, index, b, log) {
                    continue;
                }
                if points.iter().all(|p| bin.contains(p)) {
                    return b as i64;
                }
            }
            -1
        })
        .collect()
}

/// Regions kept by [`filter_regions`] and their original positions.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FilteredRegions {
    pub regions: Vec<Region>,
    pub indices: Vec<usize>,
}

/// Keeps the regions fully covered by the union of `masks`.
///
/// Every membership point of a kept region lies in at least one mask.
pub fn filter_regions(regions: &[Region], masks: &[Region], log: &mut RunLog) -> FilteredRegions {
    let mut out = FilteredRegions::default();
    for (index, region) in regions.iter().enumerate() {
        let points = membership_points(region);
        if points.is_empty() {
            continue;
        }
        let usable: Vec<&Region> = masks
            .iter()
            .enumerate()
            .filter(|(m, mask)| same_dimensions(region, mask, index, *m, log))
            .map(|(_, mask)| mask)
            .collect();
        let covered = points
            .iter()
            .all(|p| usable.iter().any(|mask| mask.contains(p)));
        if covered {
            out.regions.push(region.clone());
            out.indices.push(index);
        }
    }
    out
}

fn same_dimensions(
    region: &Region,
    other: &Region,
    index: usize,
    partner: usize,
    log: &mut RunLog,
) -> bool {
    if region.num_dimensions() == other.num_dimensions() {
        return true;
    }
    log.warn(
        LogCode::DimensionMismatch,
        format!(
            "{}-D {} cannot be tested against {}-D {}",
            region.num_dimensions(),
            region.kind_name(),
            other.num_dimensions(),
            other.kind_name()
        ),
        LogContext::RegionPair { index, partner },
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::Coord;

    fn triangle_bin() -> Region {
        Region::polygon(vec![
            Coord::new(0.0, 0.0),
            Coord::new(9.0, 0.0),
            Coord::new(0.0, 9.0),
        ])
    }

    #[test]
    fn point_at_centroid_is_binned() {
        let regions = vec![Region::point(vec![3.0, 3.0])];
        let mut log = RunLog::new();
        assert_eq!(bin_regions(&regions, &[triangle_bin()], &mut log), vec![0]);
        assert_eq!(bin_regions(&regions, &[], &mut log), vec![-1]);
    }

    #[test]
    fn first_matching_bin_wins() {
        let big = Region::rectangle(vec![0.0, 0.0], vec![20.0, 20.0]);
        let small = Region::rectangle(vec![0.0, 0.0], vec![5.0, 5.0]);
        let regions = vec![
            Region::rectangle(vec![1.0, 1.0], vec![2.0, 2.0]),
            Region::rectangle(vec![10.0, 10.0], vec![2.0, 2.0]),
            Region::rectangle(vec![30.0, 30.0], vec![2.0, 2.0]),
        ];
        let mut log = RunLog::new();
        assert_eq!(
            bin_regions(&regions, &[small, big], &mut log),
            vec![0, 1, -1]
        );
    }

    #[test]
    fn area_region_must_be_fully_inside() {
        let bin = Region::rectangle(vec![0.0, 0.0], vec![5.0, 5.0]);
        let straddling = Region::rectangle(vec![4.0, 4.0], vec![3.0, 3.0]);
        let mut log = RunLog::new();
        assert_eq!(bin_regions(&[straddling], &[bin], &mut log), vec![-1]);
    }

    #[test]
    fn degenerate_line_bins_like_a_point() {
        let line = Region::line(vec![2.0, 2.0], vec![2.0, 2.0]);
        let mut log = RunLog::new();
        assert_eq!(bin_regions(&[line], &[triangle_bin()], &mut log), vec![0]);
    }

    #[test]
    fn dimension_mismatch_skips_the_pair() {
        let region = Region::point(vec![1.0, 1.0, 1.0]);
        let bins = vec![
            triangle_bin(),
            Region::rectangle(vec![0.0, 0.0, 0.0], vec![2.0, 2.0, 2.0]),
        ];
        let mut log = RunLog::new();
        assert_eq!(bin_regions(&[region], &bins, &mut log), vec![1]);
        assert_eq!(log.count_code(LogCode::DimensionMismatch), 1);
    }

    #[test]
    fn filter_keeps_regions_covered_by_union() {
        let masks = vec![
            Region::rectangle(vec![0.0, 0.0], vec![5.0, 10.0]),
            Region::rectangle(vec![5.0, 0.0], vec![5.0, 10.0]),
        ];
        let regions = vec![
            // Spans both masks.
            Region::rectangle(vec![3.0, 3.0], vec![4.0, 4.0]),
            // Leaves the union.
            Region::rectangle(vec![8.0, 8.0], vec![4.0, 4.0]),
            Region::point(vec![9.0, 1.0]),
        ];
        let mut log = RunLog::new();
        let kept = filter_regions(&regions, &masks, &mut log);
        assert_eq!(kept.indices, vec![0, 2]);
        assert_eq!(kept.regions.len(), 2);
        assert!(log.is_clean());
    }
}
