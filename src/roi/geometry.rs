//! Distance and containment primitives shared by the region shapes and the
//! border-aware statistics.

use super::coord::Coord;
use super::region::Region;
use crate::error::SlideSetError;

/// Number of vertices used to approximate an ellipse outline.
pub const ELLIPSE_BORDER_VERTICES: usize = 360;

/// Points within this distance of a polygon edge count as on the edge.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Euclidean distance between two planar points.
#[inline]
pub fn distance(a: &Coord, b: &Coord) -> f64 {
    a.distance(b)
}

/// Distance from `p` to the segment `a`-`b`.
///
/// The point is projected onto the infinite line through the segment. When
/// the projection falls outside `[0, |ab|]` the nearer endpoint decides;
/// otherwise the result is the altitude of triangle `a b p` over the base
/// `ab`, with the area taken from Heron's formula (in Kahan's numerically
/// stable arrangement). A zero-length segment is treated as the point `a`.
pub fn distance_from_segment(p: &Coord, a: &Coord, b: &Coord) -> f64 {
    let ab = distance(a, b);
    let pa = distance(p, a);
    if ab == 0.0 {
        return pa;
    }
    let pb = distance(p, b);

    let projection = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / ab;
    if projection < 0.0 || projection > ab {
        return pa.min(pb);
    }

    2.0 * heron_area(ab, pa, pb) / ab
}

/// Triangle area from its three side lengths.
fn heron_area(a: f64, b: f64, c: f64) -> f64 {
    let mut sides = [a, b, c];
    sides.sort_by(|x, y| y.total_cmp(x));
    let [a, b, c] = sides;
    let radicand = (a + (b + c)) * (c - (a - b)) * (c + (a - b)) * (a + (b - c));
    // Rounding can push a collinear triangle slightly negative.
    0.25 * radicand.max(0.0).sqrt()
}

/// Distance from `p` to the N-D segment `a`-`b`.
///
/// Used for line membership, where the region may live in more than two
/// dimensions. Degenerate segments reduce to a point distance.
pub fn distance_from_segment_nd(p: &[f64], a: &[f64], b: &[f64]) -> f64 {
    let n = p.len().min(a.len()).min(b.len());
    let mut len_sq = 0.0;
    let mut dot = 0.0;
    for d in 0..n {
        let ab = b[d] - a[d];
        len_sq += ab * ab;
        dot += (p[d] - a[d]) * ab;
    }
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (dot / len_sq).clamp(0.0, 1.0)
    };
    (0..n)
        .map(|d| {
            let closest = a[d] + t * (b[d] - a[d]);
            (p[d] - closest).powi(2)
        })
        .sum::<f64>()
        .sqrt()
}

/// Even-odd containment over a set of implicitly closed rings.
///
/// Points lying on any ring edge are inside.
pub fn rings_contain<'a>(rings: impl Iterator<Item = &'a [Coord]>, p: Coord) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n == 0 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (vi, vj) = (ring[i], ring[j]);
            if distance_from_segment(&p, &vj, &vi) <= EDGE_TOLERANCE {
                return true;
            }
            if (vi.y > p.y) != (vj.y > p.y) {
                let x_cross = vj.x + (p.y - vj.y) * (vi.x - vj.x) / (vi.y - vj.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
    }
    inside
}

/// A boundary polyline: vertices plus whether the last connects to the first.
pub type Polyline = (Vec<Coord>, bool);

/// The region's planar outline as polylines.
///
/// Polygons and rectangles are closed rings, lines and path subpaths are
/// open, ellipses are approximated by a closed ring of
/// [`ELLIPSE_BORDER_VERTICES`] vertices and points are a single vertex.
/// Returns `None` for shapes with more than two dimensions.
pub fn boundary_polylines(region: &Region) -> Option<Vec<Polyline>> {
    match region {
        Region::Polygon { vertices } => Some(vec![(vertices.clone(), true)]),
        Region::Path { subpaths } => Some(subpaths.iter().map(|s| (s.clone(), false)).collect()),
        Region::Line { start, end } if start.len() == 2 => Some(vec![(
            vec![Coord::new(start[0], start[1]), Coord::new(end[0], end[1])],
            false,
        )]),
        Region::Point { position } if position.len() == 2 => {
            Some(vec![(vec![Coord::new(position[0], position[1])], false)])
        }
        Region::Rectangle { .. } if region.num_dimensions() == 2 => {
            let (x0, y0) = (region.real_min(0), region.real_min(1));
            let (x1, y1) = (region.real_max(0), region.real_max(1));
            Some(vec![(
                vec![
                    Coord::new(x0, y0),
                    Coord::new(x1, y0),
                    Coord::new(x1, y1),
                    Coord::new(x0, y1),
                ],
                true,
            )])
        }
        Region::Ellipse { center, radii } if center.len() == 2 => {
            let rx = radii.first().copied().unwrap_or(0.0).abs();
            let ry = radii.get(1).copied().unwrap_or(0.0).abs();
            let ring = (0..ELLIPSE_BORDER_VERTICES)
                .map(|i| {
                    let theta = std::f64::consts::TAU * i as f64 / ELLIPSE_BORDER_VERTICES as f64;
                    Coord::new(center[0] + rx * theta.cos(), center[1] + ry * theta.sin())
                })
                .collect();
            Some(vec![(ring, true)])
        }
        _ => None,
    }
}

/// Minimum distance from `point` to the region's boundary.
///
/// # Errors
/// Returns [`SlideSetError::Unsupported`] for shapes without a planar
/// outline (see [`boundary_polylines`]).
pub fn distance_to_border(point: &Coord, region: &Region) -> Result<f64, SlideSetError> {
    let polylines = boundary_polylines(region).ok_or_else(|| {
        SlideSetError::Unsupported(format!(
            "border distance for {}-D {}",
            region.num_dimensions(),
            region.kind_name()
        ))
    })?;

    Ok(distance_to_polylines(point, &polylines))
}

/// Minimum distance from `point` to any of the polylines.
///
/// Returns `+inf` when there are no vertices at all.
pub fn distance_to_polylines(point: &Coord, polylines: &[Polyline]) -> f64 {
    let mut best = f64::INFINITY;
    for (vertices, closed) in polylines {
        match vertices.len() {
            0 => continue,
            1 => best = best.min(distance(point, &vertices[0])),
            n => {
                for pair in vertices.windows(2) {
                    best = best.min(distance_from_segment(point, &pair[0], &pair[1]));
                }
                if *closed {
                    best = best.min(distance_from_segment(point, &vertices[n - 1], &vertices[0]));
                }
            }
        }
    }
    best
}

/// Returns true if `point` is within `radius` of the region's boundary.
///
/// Only the first two coordinates of `point` are used.
///
/// # Errors
/// See [`distance_to_border`].
pub fn is_near_border(point: &[f64], region: &Region, radius: f64) -> Result<bool, SlideSetError> {
    if point.len() < 2 {
        return Err(SlideSetError::DimensionMismatch {
            region: region.num_dimensions(),
            target: point.len(),
        });
    }
    let p = Coord::new(point[0], point[1]);
    Ok(distance_to_border(&p, region)? <= radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_segment_interior_is_altitude() {
        let d = distance_from_segment(
            &Coord::new(5.0, 3.0),
            &Coord::new(0.0, 0.0),
            &Coord::new(10.0, 0.0),
        );
        assert!((d - 3.0).abs() < 1e-12);
    }

    #[test]
    fn distance_beyond_segment_uses_nearest_endpoint() {
        let d = distance_from_segment(
            &Coord::new(13.0, 4.0),
            &Coord::new(0.0, 0.0),
            &Coord::new(10.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn point_on_axis_aligned_segment_has_zero_distance() {
        let d = distance_from_segment(
            &Coord::new(4.0, 0.0),
            &Coord::new(0.0, 0.0),
            &Coord::new(10.0, 0.0),
        );
        assert_eq!(d, 0.0);
    }

    #[test]
    fn zero_length_segment_is_a_point() {
        let a = Coord::new(2.0, 2.0);
        let d = distance_from_segment(&Coord::new(5.0, 6.0), &a, &a);
        assert_eq!(d, 5.0);
        assert!(!d.is_nan());
    }

    #[test]
    fn nd_segment_distance() {
        let d = distance_from_segment_nd(&[1.0, 1.0, 1.0], &[0.0, 0.0, 0.0], &[2.0, 2.0, 2.0]);
        assert!(d.abs() < 1e-12);
        let d = distance_from_segment_nd(&[0.0, 0.0, 3.0], &[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0]);
        assert_eq!(d, 3.0);
    }

    #[test]
    fn near_border_polygon() {
        let square = Region::polygon(vec![
            Coord::new(0.0, 0.0),
            Coord::new(10.0, 0.0),
            Coord::new(10.0, 10.0),
            Coord::new(0.0, 10.0),
        ]);
        assert!(!is_near_border(&[5.0, 5.0], &square, 0.0).unwrap());
        assert!(is_near_border(&[5.0, 0.0], &square, 0.0).unwrap());
        assert!(is_near_border(&[9.0, 5.0], &square, 1.01).unwrap());
        // Closing edge from (0,10) back to (0,0).
        assert!(is_near_border(&[0.5, 5.0], &square, 0.51).unwrap());
        assert!(!is_near_border(&[0.5, 5.0], &square, 0.49).unwrap());
    }

    #[test]
    fn path_border_is_open() {
        let path = Region::path(vec![vec![
            Coord::new(0.0, 0.0),
            Coord::new(10.0, 0.0),
            Coord::new(10.0, 10.0),
        ]]);
        // Would be on the closing edge of a polygon, but paths stay open.
        assert!(!is_near_border(&[5.0, 5.0], &path, 1.0).unwrap());
    }

    #[test]
    fn ellipse_border_is_approximated() {
        let circle = Region::ellipse(vec![0.0, 0.0], vec![5.0, 5.0]);
        let d = distance_to_border(&Coord::new(0.0, 0.0), &circle).unwrap();
        assert!((d - 5.0).abs() < 1e-3);
    }

    #[test]
    fn three_dimensional_shapes_are_unsupported() {
        let ellipsoid = Region::ellipse(vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]);
        let err = is_near_border(&[0.0, 0.0, 0.0], &ellipsoid, 1.0).unwrap_err();
        assert!(matches!(err, SlideSetError::Unsupported(_)));
    }

    #[test]
    fn rings_contain_concave_polygon() {
        let l_shape = [
            Coord::new(0.0, 0.0),
            Coord::new(4.0, 0.0),
            Coord::new(4.0, 1.0),
            Coord::new(1.0, 1.0),
            Coord::new(1.0, 4.0),
            Coord::new(0.0, 4.0),
        ];
        assert!(rings_contain(std::iter::once(&l_shape[..]), Coord::new(0.5, 3.0)));
        assert!(!rings_contain(std::iter::once(&l_shape[..]), Coord::new(3.0, 3.0)));
    }
}
