//! Blob extraction by per-channel thresholds.
//!
//! Pixels passing the combined threshold test are grouped into 4-connected
//! blobs, and each blob is outlined by tracing its pixel edges. Pixel
//! `(x, y)` occupies the square `[x - 0.5, x + 0.5] × [y - 0.5, y + 0.5]`,
//! so outline vertices sit on half-integer coordinates.
//!
//! Only the first two spatial axes are segmented; any further spatial axis
//! is read at index 0.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SlideSetError;
use crate::raster::Raster;
use crate::report::{LogCode, LogContext, RunLog};
use crate::roi::{Coord, Region};

/// How per-channel tests are combined into one mask bit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
    #[default]
    And,
    Or,
}

/// A pixel passes when `sample(channel) > threshold`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelThreshold {
    pub channel: usize,
    pub threshold: f64,
}

/// Options for [`threshold_segmentation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdOptions {
    /// One to three channel tests.
    pub channels: Vec<ChannelThreshold>,
    pub combine: Combine,
    /// Smallest blob kept, in pixels.
    pub min_size: u64,
    /// Largest blob kept, in pixels.
    pub max_size: u64,
}

impl Default for ThresholdOptions {
    fn default() -> Self {
        Self {
            channels: vec![ChannelThreshold {
                channel: 0,
                threshold: 0.0,
            }],
            combine: Combine::And,
            min_size: 1,
            max_size: u64::MAX,
        }
    }
}

const MAX_CHANNEL_TESTS: usize = 3;

/// Segments the image into blobs and returns one polygon per kept blob.
///
/// Blobs are numbered in row-major order of their first pixel, and the
/// output keeps that order. A blob with holes is reported by its outer
/// outline only.
///
/// # Errors
/// - [`SlideSetError::StructuralMismatch`] for zero or more than three
///   channel tests
/// - [`SlideSetError::MissingChannel`] when a tested channel is absent
/// - [`SlideSetError::Unsupported`] for rasters with fewer than two
///   spatial axes
pub fn threshold_segmentation(
    image: &Raster,
    options: &ThresholdOptions,
    log: &mut RunLog,
) -> Result<Vec<Region>, SlideSetError> {
    if options.channels.is_empty() || options.channels.len() > MAX_CHANNEL_TESTS {
        return Err(SlideSetError::StructuralMismatch(format!(
            "threshold segmentation takes 1 to {MAX_CHANNEL_TESTS} channel tests, got {}",
            options.channels.len()
        )));
    }
    for test in &options.channels {
        image.require_channel(test.channel)?;
    }
    let dims = image.spatial_dims();
    if dims.len() < 2 {
        return Err(SlideSetError::Unsupported(format!(
            "threshold segmentation needs a 2-D raster, got {} spatial axis/axes",
            dims.len()
        )));
    }

    let grid = Grid::new(dims[0], dims[1]);
    let mask = build_mask(image, options, &grid);
    let blobs = label_blobs(&mask, &grid);

    let mut regions = Vec::new();
    let mut discarded = 0usize;
    for blob in &blobs.pixels {
        let size = blob.len() as u64;
        if size < options.min_size || size > options.max_size {
            discarded += 1;
            continue;
        }
        if let Some(outline) = outer_outline(blob, &blobs.labels, &grid) {
            regions.push(Region::polygon(outline));
        }
    }

    if discarded > 0 {
        log.info(
            LogCode::BlobsDiscarded,
            format!(
                "{discarded} of {} blob(s) outside the size window [{}, {}]",
                blobs.pixels.len(),
                options.min_size,
                options.max_size
            ),
            LogContext::Run,
        );
    }
    Ok(regions)
}

#[derive(Clone, Copy)]
struct Grid {
    width: usize,
    height: usize,
}

impl Grid {
    fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    fn len(&self) -> usize {
        self.width * self.height
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn position(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Linear index of the neighbour in direction `(dx, dy)`, if on the grid.
    fn neighbour(&self, index: usize, dx: i64, dy: i64) -> Option<usize> {
        let (x, y) = self.position(index);
        let nx = usize::try_from(x as i64 + dx).ok()?;
        let ny = usize::try_from(y as i64 + dy).ok()?;
        (nx < self.width && ny < self.height).then(|| self.index(nx, ny))
    }
}

const NEIGHBOURS: [(i64, i64); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

fn build_mask(image: &Raster, options: &ThresholdOptions, grid: &Grid) -> Vec<bool> {
    (0..grid.len())
        .map(|index| {
            let (x, y) = grid.position(index);
            let position = [x as i64, y as i64];
            let mut passes = options
                .channels
                .iter()
                .map(|t| image.sample(&position, t.channel) > t.threshold);
            match options.combine {
                Combine::And => passes.all(|p| p),
                Combine::Or => passes.any(|p| p),
            }
        })
        .collect()
}

struct Blobs {
    /// 0 for background, otherwise blob number + 1.
    labels: Vec<usize>,
    pixels: Vec<Vec<usize>>,
}

fn label_blobs(mask: &[bool], grid: &Grid) -> Blobs {
    let mut labels = vec![0usize; grid.len()];
    let mut pixels = Vec::new();
    let mut stack = Vec::new();

    for seed in 0..grid.len() {
        if !mask[seed] || labels[seed] != 0 {
            continue;
        }
        let label = pixels.len() + 1;
        let mut blob = Vec::new();
        labels[seed] = label;
        stack.push(seed);

        while let Some(index) = stack.pop() {
            blob.push(index);
            for (dx, dy) in NEIGHBOURS {
                if let Some(n) = grid.neighbour(index, dx, dy) {
                    if mask[n] && labels[n] == 0 {
                        labels[n] = label;
                        stack.push(n);
                    }
                }
            }
        }
        blob.sort_unstable();
        pixels.push(blob);
    }
    Blobs { labels, pixels }
}

/// A pixel corner; `(i, j)` is the point `(i - 0.5, j - 0.5)`.
type Corner = (i64, i64);

/// Boundary edges of one blob, keyed by start corner, oriented so the blob
/// lies to the right of travel (clockwise on screen).
fn boundary_edges(blob: &[usize], labels: &[usize], grid: &Grid) -> BTreeMap<Corner, Vec<Corner>> {
    let mut edges: BTreeMap<Corner, Vec<Corner>> = BTreeMap::new();
    for &index in blob {
        let label = labels[index];
        let (x, y) = grid.position(index);
        let (x, y) = (x as i64, y as i64);
        for (dx, dy) in NEIGHBOURS {
            let outside = grid
                .neighbour(index, dx, dy)
                .map_or(true, |n| labels[n] != label);
            if !outside {
                continue;
            }
            let (start, end) = match (dx, dy) {
                (0, -1) => ((x, y), (x + 1, y)),
                (1, 0) => ((x + 1, y), (x + 1, y + 1)),
                (0, 1) => ((x + 1, y + 1), (x, y + 1)),
                _ => ((x, y + 1), (x, y)),
            };
            edges.entry(start).or_default().push(end);
        }
    }
    edges
}

/// Joins edges end to start into closed loops.
///
/// Where two edges leave the same corner the blob touches itself
/// diagonally; the walk then turns right so the two pixels stay apart.
fn stitch_loops(mut edges: BTreeMap<Corner, Vec<Corner>>) -> Vec<Vec<Corner>> {
    let mut loops = Vec::new();
    while let Some(start) = edges
        .iter()
        .find(|(_, ends)| !ends.is_empty())
        .map(|(corner, _)| *corner)
    {
        let mut ring = vec![start];
        let mut current = start;
        let mut heading: Option<Corner> = None;
        loop {
            let Some(ends) = edges.get_mut(&current) else {
                break;
            };
            if ends.is_empty() {
                break;
            }
            let pick = match heading {
                Some((dx, dy)) if ends.len() > 1 => ends
                    .iter()
                    .position(|e| (e.0 - current.0, e.1 - current.1) == (-dy, dx))
                    .unwrap_or(0),
                _ => 0,
            };
            let next = ends.swap_remove(pick);
            heading = Some((next.0 - current.0, next.1 - current.1));
            if next == start {
                break;
            }
            ring.push(next);
            current = next;
        }
        loops.push(ring);
    }
    loops
}

/// Drops vertices that lie on a straight run between their neighbours.
fn remove_collinear(ring: &[Corner]) -> Vec<Corner> {
    let n = ring.len();
    if n < 3 {
        return ring.to_vec();
    }
    (0..n)
        .filter(|i| {
            let prev = ring[(i + n - 1) % n];
            let here = ring[*i];
            let next = ring[(i + 1) % n];
            let cross = (here.0 - prev.0) * (next.1 - here.1) - (here.1 - prev.1) * (next.0 - here.0);
            cross != 0
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the signed area enclosed by a ring.
fn doubled_area(ring: &[Corner]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.0 * b.1 - b.0 * a.1
        })
        .sum()
}

fn outer_outline(blob: &[usize], labels: &[usize], grid: &Grid) -> Option<Vec<Coord>> {
    let ring = stitch_loops(boundary_edges(blob, labels, grid))
        .into_iter()
        .max_by_key(|ring| doubled_area(ring).abs())?;
    Some(
        remove_collinear(&ring)
            .into_iter()
            .map(|(i, j)| Coord::new(i as f64 - 0.5, j as f64 - 0.5))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_from_rows(rows: &[&str]) -> Raster {
        let height = rows.len();
        let width = rows[0].len();
        Raster::from_fn(&[width, height], 1, 255.0, |p, _| {
            if rows[p[1]].as_bytes()[p[0]] == b'#' {
                255.0
            } else {
                0.0
            }
        })
    }

    fn vertices(region: &Region) -> Vec<(f64, f64)> {
        match region {
            Region::Polygon { vertices } => vertices.iter().map(|c| (c.x, c.y)).collect(),
            other => panic!("expected polygon, got {}", other.kind_name()),
        }
    }

    fn polygon_area(region: &Region) -> f64 {
        let v = vertices(region);
        let n = v.len();
        let twice: f64 = (0..n)
            .map(|i| v[i].0 * v[(i + 1) % n].1 - v[(i + 1) % n].0 * v[i].1)
            .sum();
        twice.abs() / 2.0
    }

    #[test]
    fn square_blob_outline() {
        let image = image_from_rows(&[".....", ".###.", ".###.", ".###.", "....."]);
        let mut log = RunLog::new();
        let regions = threshold_segmentation(&image, &ThresholdOptions::default(), &mut log).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(
            vertices(&regions[0]),
            vec![(0.5, 0.5), (3.5, 0.5), (3.5, 3.5), (0.5, 3.5)]
        );
    }

    #[test]
    fn l_shape_keeps_six_corners() {
        let image = image_from_rows(&["#..", "#..", "###"]);
        let mut log = RunLog::new();
        let regions = threshold_segmentation(&image, &ThresholdOptions::default(), &mut log).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(vertices(&regions[0]).len(), 6);
        assert_eq!(polygon_area(&regions[0]), 5.0);
    }

    #[test]
    fn ring_reports_outer_outline_only() {
        let image = image_from_rows(&["#####", "#...#", "#...#", "#...#", "#####"]);
        let mut log = RunLog::new();
        let regions = threshold_segmentation(&image, &ThresholdOptions::default(), &mut log).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(
            vertices(&regions[0]),
            vec![(-0.5, -0.5), (4.5, -0.5), (4.5, 4.5), (-0.5, 4.5)]
        );
    }

    #[test]
    fn diagonal_pixels_are_separate_blobs() {
        let image = image_from_rows(&["#.", ".#"]);
        let mut log = RunLog::new();
        let regions = threshold_segmentation(&image, &ThresholdOptions::default(), &mut log).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(
            vertices(&regions[1]),
            vec![(0.5, 0.5), (1.5, 0.5), (1.5, 1.5), (0.5, 1.5)]
        );
    }

    #[test]
    fn self_touching_blob_traces_every_pixel_edge() {
        // The blob touches itself at the corner between (2, 1) and (1, 2).
        let image = image_from_rows(&["###", "#.#", "##."]);
        let mut log = RunLog::new();
        let regions = threshold_segmentation(&image, &ThresholdOptions::default(), &mut log).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(polygon_area(&regions[0]), 7.0);
    }

    #[test]
    fn size_window_discards_small_blobs() {
        let image = image_from_rows(&["#...##", "....##"]);
        let options = ThresholdOptions {
            min_size: 2,
            ..Default::default()
        };
        let mut log = RunLog::new();
        let regions = threshold_segmentation(&image, &options, &mut log).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(polygon_area(&regions[0]), 4.0);
        assert_eq!(log.count_code(LogCode::BlobsDiscarded), 1);
    }

    #[test]
    fn channel_tests_combine() {
        // Channel 0 lit on x < 3, channel 1 lit on x >= 2.
        let image = Raster::from_fn(&[5, 1], 2, 255.0, |p, c| match (c, p[0]) {
            (0, x) if x < 3 => 100.0,
            (1, x) if x >= 2 => 100.0,
            _ => 0.0,
        });
        let tests = vec![
            ChannelThreshold {
                channel: 0,
                threshold: 50.0,
            },
            ChannelThreshold {
                channel: 1,
                threshold: 50.0,
            },
        ];
        let mut log = RunLog::new();

        let and = ThresholdOptions {
            channels: tests.clone(),
            ..Default::default()
        };
        let regions = threshold_segmentation(&image, &and, &mut log).unwrap();
        assert_eq!(polygon_area(&regions[0]), 1.0);

        let or = ThresholdOptions {
            channels: tests,
            combine: Combine::Or,
            ..Default::default()
        };
        let regions = threshold_segmentation(&image, &or, &mut log).unwrap();
        assert_eq!(polygon_area(&regions[0]), 5.0);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let mut log = RunLog::new();
        let image = Raster::zeros(&[4, 4], 1, 255.0);
        let none = ThresholdOptions {
            channels: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            threshold_segmentation(&image, &none, &mut log),
            Err(SlideSetError::StructuralMismatch(_))
        ));

        let missing = ThresholdOptions {
            channels: vec![ChannelThreshold {
                channel: 2,
                threshold: 0.0,
            }],
            ..Default::default()
        };
        assert!(matches!(
            threshold_segmentation(&image, &missing, &mut log),
            Err(SlideSetError::MissingChannel { channel: 2, .. })
        ));

        let line = Raster::zeros(&[4], 1, 255.0);
        assert!(matches!(
            threshold_segmentation(&line, &ThresholdOptions::default(), &mut log),
            Err(SlideSetError::Unsupported(_))
        ));
    }
}
