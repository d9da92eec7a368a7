//! Perimeter and length measurements for regions.

use std::f64::consts::PI;

use super::coord::Coord;
use super::region::Region;
use crate::report::{LogCode, LogContext, RunLog};

/// Length of the region's outline, if the shape kind has one.
///
/// - polygon: perimeter including the closing edge
/// - line: endpoint distance (any dimensionality)
/// - path: sum of subpath segment lengths
/// - 2-D rectangle: `2 * (w + h)`
/// - 2-D ellipse: Ramanujan's second approximation
///
/// Points and N-D (> 2) ellipses or rectangles have no length.
pub fn region_length(region: &Region) -> Option<f64> {
    match region {
        Region::Polygon { vertices } => Some(ring_length(vertices)),
        Region::Line { start, end } => Some(
            start
                .iter()
                .zip(end)
                .map(|(a, b)| (b - a).powi(2))
                .sum::<f64>()
                .sqrt(),
        ),
        Region::Path { subpaths } => Some(subpaths.iter().map(|s| open_length(s)).sum()),
        Region::Rectangle { extent, .. } if region.num_dimensions() == 2 => {
            let w = extent.first().copied().unwrap_or(0.0).abs();
            let h = extent.get(1).copied().unwrap_or(0.0).abs();
            Some(2.0 * (w + h))
        }
        Region::Ellipse { radii, .. } if region.num_dimensions() == 2 => {
            let a = radii.first().copied().unwrap_or(0.0).abs();
            let b = radii.get(1).copied().unwrap_or(0.0).abs();
            Some(ramanujan_perimeter(a, b))
        }
        _ => None,
    }
}

/// Lengths of every region in the set.
///
/// Regions without a length definition yield `0.0` and a warning; the
/// remaining regions are still measured.
pub fn roi_lengths(regions: &[Region], log: &mut RunLog) -> Vec<f64> {
    regions
        .iter()
        .enumerate()
        .map(|(index, region)| {
            region_length(region).unwrap_or_else(|| {
                log.warn(
                    LogCode::UnsupportedLength,
                    format!(
                        "no length for {}-D {}; reporting 0",
                        region.num_dimensions(),
                        region.kind_name()
                    ),
                    LogContext::Region { index },
                );
                0.0
            })
        })
        .collect()
}

/// Ramanujan's second approximation of an ellipse perimeter.
pub fn ramanujan_perimeter(a: f64, b: f64) -> f64 {
    if a + b == 0.0 {
        return 0.0;
    }
    let h = ((a - b) / (a + b)).powi(2);
    PI * (a + b) * (1.0 + 3.0 * h / (10.0 + (4.0 - 3.0 * h).sqrt()))
}

fn open_length(vertices: &[Coord]) -> f64 {
    vertices.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

fn ring_length(vertices: &[Coord]) -> f64 {
    match vertices {
        [] => 0.0,
        [first, .., last] => open_length(vertices) + last.distance(first),
        [_] => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_perimeter_wraps_around() {
        let triangle = Region::polygon(vec![
            Coord::new(0.0, 0.0),
            Coord::new(3.0, 0.0),
            Coord::new(3.0, 4.0),
        ]);
        assert_eq!(region_length(&triangle), Some(12.0));
    }

    #[test]
    fn rectangle_perimeter() {
        let rect = Region::rectangle(vec![1.0, 1.0], vec![4.0, 2.0]);
        assert_eq!(region_length(&rect), Some(12.0));
    }

    #[test]
    fn circle_perimeter_is_exact_for_equal_radii() {
        let circle = Region::ellipse(vec![0.0, 0.0], vec![2.0, 2.0]);
        let len = region_length(&circle).unwrap();
        assert!((len - 4.0 * PI).abs() < 1e-12);
    }

    #[test]
    fn line_length_in_three_dimensions() {
        let line = Region::line(vec![0.0, 0.0, 0.0], vec![2.0, 3.0, 6.0]);
        assert_eq!(region_length(&line), Some(7.0));
    }

    #[test]
    fn path_length_is_open() {
        let path = Region::path(vec![vec![
            Coord::new(0.0, 0.0),
            Coord::new(3.0, 0.0),
            Coord::new(3.0, 4.0),
        ]]);
        assert_eq!(region_length(&path), Some(7.0));
    }

    #[test]
    fn unsupported_shapes_warn_and_continue() {
        let regions = vec![
            Region::ellipse(vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]),
            Region::line(vec![0.0, 0.0], vec![0.0, 5.0]),
            Region::point(vec![1.0, 1.0]),
        ];
        let mut log = RunLog::new();
        let lengths = roi_lengths(&regions, &mut log);
        assert_eq!(lengths, vec![0.0, 5.0, 0.0]);
        assert_eq!(log.count_code(LogCode::UnsupportedLength), 2);
    }
}
