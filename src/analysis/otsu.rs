//! Otsu's global threshold per channel.
//!
//! The histogram covers the integer intensity range `0..=ceil(max)` of the
//! channel. When several thresholds share the maximum between-class
//! variance (typically an empty gap between two modes), the midpoint of the
//! tied range is used rather than its first element.

use serde::Serialize;

use crate::error::SlideSetError;
use crate::raster::{LatticeBox, Raster};
use crate::report::{LogCode, LogContext, RunLog};

/// Largest intensity a histogram may cover.
pub const MAX_HISTOGRAM_BIN: usize = 1 << 24;

/// Counts samples of one channel per integer intensity.
///
/// Negative samples land in bin 0, others in `floor(sample)`. NaN and
/// infinite samples are ignored.
///
/// # Errors
/// [`SlideSetError::MissingChannel`] if the channel does not exist, and
/// [`SlideSetError::Unsupported`] if the largest finite sample exceeds
/// [`MAX_HISTOGRAM_BIN`].
pub fn channel_histogram(image: &Raster, channel: usize) -> Result<Vec<u64>, SlideSetError> {
    image.require_channel(channel)?;
    let Some(bounds) = LatticeBox::covering(&image.spatial_dims()) else {
        return Ok(vec![0]);
    };

    let max = bounds
        .iter()
        .map(|point| image.sample(&point, channel))
        .filter(|sample| sample.is_finite())
        .fold(0.0f64, f64::max)
        .ceil();
    if max > MAX_HISTOGRAM_BIN as f64 {
        return Err(SlideSetError::Unsupported(format!(
            "channel {channel} maximum {max} exceeds the histogram limit of {MAX_HISTOGRAM_BIN}"
        )));
    }
    let bins = max as usize + 1;
    let mut histogram = vec![0u64; bins];

    for point in bounds.iter() {
        let sample = image.sample(&point, channel);
        if !sample.is_finite() {
            continue;
        }
        let bin = (sample.max(0.0).floor() as usize).min(bins - 1);
        histogram[bin] += 1;
    }
    Ok(histogram)
}

/// The Otsu threshold of a histogram, as a bin position.
///
/// Returns 0 when no split separates two non-empty classes.
pub fn otsu_threshold(histogram: &[u64]) -> f64 {
    let total: f64 = histogram.iter().map(|c| *c as f64).sum();
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, c)| i as f64 * *c as f64)
        .sum();

    let mut weight_b = 0.0;
    let mut sum_b = 0.0;
    let mut best = f64::NEG_INFINITY;
    let (mut low, mut high) = (0usize, 0usize);

    for (t, count) in histogram.iter().enumerate() {
        weight_b += *count as f64;
        sum_b += t as f64 * *count as f64;
        if weight_b == 0.0 {
            continue;
        }
        let weight_f = total - weight_b;
        if weight_f == 0.0 {
            break;
        }

        let mean_b = sum_b / weight_b;
        let mean_f = (weighted_total - sum_b) / weight_f;
        let variance = weight_b * weight_f * (mean_b - mean_f).powi(2);

        if variance > best {
            best = variance;
            low = t;
            high = t;
        } else if variance == best {
            high = t;
        }
    }

    (low + high) as f64 / 2.0
}

/// Result of [`otsu_segmentation`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OtsuSegmentation {
    /// One threshold per channel.
    pub thresholds: Vec<f64>,
    /// 255 where a channel's sample exceeds its threshold, 0 elsewhere;
    /// same spatial shape and channel count as the input.
    #[serde(skip)]
    pub mask: Raster,
}

/// Thresholds every channel with Otsu's method and builds the binary mask.
pub fn otsu_segmentation(image: &Raster, log: &mut RunLog) -> Result<OtsuSegmentation, SlideSetError> {
    let dims = image.spatial_dims();
    let channels = image.channel_count();
    let mut mask = Raster::zeros(&dims, channels, 255.0);
    let mut thresholds = Vec::with_capacity(channels);

    for channel in 0..channels {
        let threshold = otsu_threshold(&channel_histogram(image, channel)?);
        log.info(
            LogCode::ThresholdChosen,
            format!("Otsu threshold {threshold}"),
            LogContext::Channel { channel },
        );
        if let Some(bounds) = LatticeBox::covering(&dims) {
            for point in bounds.iter() {
                if image.sample(&point, channel) > threshold {
                    mask.set_sample(&point, channel, 255.0);
                }
            }
        }
        thresholds.push(threshold);
    }

    Ok(OtsuSegmentation { thresholds, mask })
}
