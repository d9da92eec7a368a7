//! Binary mask rasters from region sets.

use super::{region_box, to_real};
use crate::raster::Raster;
use crate::report::RunLog;
use crate::roi::Region;

/// Value written where a region covers a pixel.
pub const MASK_ON: f64 = 255.0;

/// A single-channel raster shaped like `template`, [`MASK_ON`] wherever any
/// region contains the lattice point and 0 elsewhere.
pub fn create_mask(template: &Raster, regions: &[Region], log: &mut RunLog) -> Raster {
    let dims = template.spatial_dims();
    let mut mask = Raster::zeros(&dims, 1, MASK_ON);
    for (index, region) in regions.iter().enumerate() {
        let Some(bounds) = region_box(&dims, region, index, 0, log) else {
            continue;
        };
        for point in bounds.iter() {
            if region.contains(&to_real(&point)) {
                mask.set_sample(&point, 0, MASK_ON);
            }
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::LogCode;

    #[test]
    fn union_of_regions_is_lit() {
        let template = Raster::zeros(&[10, 10], 3, 255.0);
        let regions = vec![
            Region::rectangle(vec![0.0, 0.0], vec![1.0, 1.0]),
            Region::point(vec![9.0, 9.0]),
            Region::rectangle(vec![1.0, 1.0], vec![1.0, 1.0]),
        ];
        let mut log = RunLog::new();
        let mask = create_mask(&template, &regions, &mut log);

        assert_eq!(mask.channel_count(), 1);
        assert_eq!(mask.spatial_dims(), vec![10, 10]);
        let lit = mask.data().iter().filter(|v| **v == MASK_ON).count();
        // Two 2x2 squares sharing one pixel, plus the point.
        assert_eq!(lit, 8);
        assert_eq!(mask.sample(&[9, 9], 0), MASK_ON);
        assert_eq!(mask.sample(&[5, 5], 0), 0.0);
    }

    #[test]
    fn regions_with_extra_axes_are_skipped() {
        let template = Raster::zeros(&[4, 4], 1, 255.0);
        let regions = vec![Region::point(vec![1.0, 1.0, 1.0])];
        let mut log = RunLog::new();
        let mask = create_mask(&template, &regions, &mut log);
        assert_eq!(mask.channel_max(0), 0.0);
        assert_eq!(log.count_code(LogCode::DimensionMismatch), 1);
    }
}
