//! Manders colocalization coefficients.

use serde::Serialize;

use super::{region_box, to_real};
use crate::error::SlideSetError;
use crate::raster::Raster;
use crate::report::RunLog;
use crate::roi::Region;

/// Options for [`manders`].
#[derive(Clone, Debug, PartialEq)]
pub struct MandersOptions {
    pub channels: Vec<usize>,
    /// One threshold per entry of `channels`; missing entries are 0.
    pub thresholds: Vec<f64>,
    /// Weight each pixel by its intensity instead of counting it.
    pub weighted: bool,
}

impl Default for MandersOptions {
    fn default() -> Self {
        Self {
            channels: vec![0, 1],
            thresholds: Vec::new(),
            weighted: true,
        }
    }
}

/// Per-region results of [`manders`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Manders {
    /// `coefficients[region][i][j]`: the share of channel `i`'s signal that
    /// lies where channel `j` is also above threshold.
    pub coefficients: Vec<Vec<Vec<f64>>>,
}

impl Manders {
    /// Coefficient of one ordered channel pair, by position in the option
    /// list.
    pub fn pair(&self, region: usize, i: usize, j: usize) -> f64 {
        self.coefficients
            .get(region)
            .and_then(|m| m.get(i))
            .and_then(|row| row.get(j))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Computes the Manders matrix of the selected channels over each region.
///
/// A channel is "above threshold" at a pixel when its sample exceeds the
/// threshold. Entries with no signal in the denominator are 0.
///
/// # Errors
/// [`SlideSetError::MissingChannel`] if the image lacks a selected channel.
pub fn manders(
    image: &Raster,
    regions: &[Region],
    options: &MandersOptions,
    log: &mut RunLog,
) -> Result<Manders, SlideSetError> {
    for channel in &options.channels {
        image.require_channel(*channel)?;
    }
    let dims = image.spatial_dims();
    let k = options.channels.len();
    let threshold = |i: usize| options.thresholds.get(i).copied().unwrap_or(0.0);

    let mut out = Manders::default();
    for (index, region) in regions.iter().enumerate() {
        let mut numerator = vec![vec![0.0; k]; k];
        let mut denominator = vec![0.0; k];

        if let Some(bounds) = region_box(&dims, region, index, 0, log) {
            let mut samples = vec![0.0; k];
            let mut above = vec![false; k];
            for point in bounds.iter() {
                if !region.contains(&to_real(&point)) {
                    continue;
                }
                for (i, channel) in options.channels.iter().enumerate() {
                    samples[i] = image.sample(&point, *channel);
                    above[i] = samples[i] > threshold(i);
                }
                for i in (0..k).filter(|i| above[*i]) {
                    let weight = if options.weighted { samples[i] } else { 1.0 };
                    denominator[i] += weight;
                    for j in (0..k).filter(|j| above[*j]) {
                        numerator[i][j] += weight;
                    }
                }
            }
        }

        let matrix = numerator
            .into_iter()
            .zip(&denominator)
            .map(|(row, den)| {
                row.into_iter()
                    .map(|num| if *den == 0.0 { 0.0 } else { num / den })
                    .collect()
            })
            .collect();
        out.coefficients.push(matrix);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Channel 0 lit on x < 6, channel 1 lit on x >= 4, 10x1 image.
    fn stripes() -> Raster {
        Raster::from_fn(&[10, 1], 2, 255.0, |p, c| match (c, p[0]) {
            (0, x) if x < 6 => 10.0,
            (1, x) if x >= 4 => 20.0,
            _ => 0.0,
        })
    }

    #[test]
    fn counted_coefficients() {
        let regions = vec![Region::rectangle(vec![0.0, 0.0], vec![9.0, 0.0])];
        let options = MandersOptions {
            weighted: false,
            ..Default::default()
        };
        let mut log = RunLog::new();
        let m = manders(&stripes(), &regions, &options, &mut log).unwrap();
        // Overlap is x in {4, 5}: 2 of 6 pixels for either channel.
        assert_eq!(m.pair(0, 0, 0), 1.0);
        assert!((m.pair(0, 0, 1) - 2.0 / 6.0).abs() < 1e-12);
        assert!((m.pair(0, 1, 0) - 2.0 / 6.0).abs() < 1e-12);
        assert_eq!(m.pair(0, 1, 1), 1.0);
    }

    #[test]
    fn weighted_coefficients_follow_intensity() {
        let image = Raster::from_fn(&[4, 1], 2, 255.0, |p, c| match (c, p[0]) {
            (0, 0) => 1.0,
            (0, 1) => 3.0,
            (1, 1) => 5.0,
            _ => 0.0,
        });
        let regions = vec![Region::rectangle(vec![0.0, 0.0], vec![3.0, 0.0])];
        let mut log = RunLog::new();
        let m = manders(&image, &regions, &MandersOptions::default(), &mut log).unwrap();
        assert!((m.pair(0, 0, 1) - 0.75).abs() < 1e-12);
        assert_eq!(m.pair(0, 1, 0), 1.0);
    }

    #[test]
    fn empty_signal_gives_zero() {
        let image = Raster::zeros(&[3, 3], 2, 255.0);
        let regions = vec![Region::rectangle(vec![0.0, 0.0], vec![2.0, 2.0])];
        let mut log = RunLog::new();
        let m = manders(&image, &regions, &MandersOptions::default(), &mut log).unwrap();
        assert_eq!(m.coefficients[0], vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }
}
