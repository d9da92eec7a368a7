//! Pearson correlation between two channels inside each region.

use serde::Serialize;

use super::{region_box, to_real};
use crate::error::SlideSetError;
use crate::raster::Raster;
use crate::report::RunLog;
use crate::roi::Region;

/// Options for [`correlation`].
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationOptions {
    pub channels: (usize, usize),
    /// A pixel counts only if both samples reach their threshold.
    pub thresholds: (f64, f64),
}

impl Default for CorrelationOptions {
    fn default() -> Self {
        Self {
            channels: (0, 1),
            thresholds: (0.0, 0.0),
        }
    }
}

/// Per-region results of [`correlation`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Correlation {
    pub coefficient: Vec<f64>,
    pub pixel_count: Vec<u64>,
}

/// Computes the Pearson coefficient of two channels over each region.
///
/// Regions without qualifying pixels, or where either channel is constant,
/// report a coefficient of 0.
///
/// # Errors
/// [`SlideSetError::MissingChannel`] if the image lacks either channel.
pub fn correlation(
    image: &Raster,
    regions: &[Region],
    options: &CorrelationOptions,
    log: &mut RunLog,
) -> Result<Correlation, SlideSetError> {
    let (ca, cb) = options.channels;
    let (ta, tb) = options.thresholds;
    image.require_channel(ca)?;
    image.require_channel(cb)?;
    let dims = image.spatial_dims();

    let mut out = Correlation::default();
    for (index, region) in regions.iter().enumerate() {
        let mut xs = Vec::new();
        let mut ys = Vec::new();

        if let Some(bounds) = region_box(&dims, region, index, 0, log) {
            for point in bounds.iter() {
                if !region.contains(&to_real(&point)) {
                    continue;
                }
                let (a, b) = (image.sample(&point, ca), image.sample(&point, cb));
                if a >= ta && b >= tb {
                    xs.push(a);
                    ys.push(b);
                }
            }
        }

        out.coefficient.push(pearson(&xs, &ys));
        out.pixel_count.push(xs.len() as u64);
    }
    Ok(out)
}

/// Pearson's r, or 0 for empty or constant input.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_x * var_y).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anti_correlated_channels() {
        let image = Raster::from_fn(&[10, 10], 2, 255.0, |p, c| {
            let v = (p[0] + 3 * p[1]) as f64;
            if c == 0 {
                v
            } else {
                100.0 - v
            }
        });
        let regions = vec![Region::rectangle(vec![1.0, 1.0], vec![6.0, 6.0])];
        let mut log = RunLog::new();
        let result = correlation(&image, &regions, &CorrelationOptions::default(), &mut log).unwrap();
        assert!((result.coefficient[0] + 1.0).abs() < 1e-12);
        assert_eq!(result.pixel_count, vec![49]);
    }

    #[test]
    fn thresholds_filter_pixels() {
        let image = Raster::from_fn(&[4, 1], 2, 255.0, |p, _| p[0] as f64);
        let regions = vec![Region::rectangle(vec![0.0, 0.0], vec![3.0, 0.0])];
        let options = CorrelationOptions {
            thresholds: (2.0, 0.0),
            ..Default::default()
        };
        let mut log = RunLog::new();
        let result = correlation(&image, &regions, &options, &mut log).unwrap();
        assert_eq!(result.pixel_count, vec![2]);
        assert!((result.coefficient[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_and_constant_regions_report_zero() {
        let image = Raster::from_fn(&[4, 4], 2, 255.0, |_, c| c as f64);
        let regions = vec![
            Region::rectangle(vec![0.0, 0.0], vec![3.0, 3.0]),
            Region::rectangle(vec![40.0, 40.0], vec![1.0, 1.0]),
        ];
        let mut log = RunLog::new();
        let result = correlation(&image, &regions, &CorrelationOptions::default(), &mut log).unwrap();
        assert_eq!(result.coefficient, vec![0.0, 0.0]);
        assert_eq!(result.pixel_count, vec![16, 0]);
    }

    #[test]
    fn missing_channel_is_fatal() {
        let image = Raster::zeros(&[2, 2], 1, 255.0);
        let mut log = RunLog::new();
        let err = correlation(&image, &[], &CorrelationOptions::default(), &mut log).unwrap_err();
        assert!(matches!(err, SlideSetError::MissingChannel { channel: 1, .. }));
    }
}
