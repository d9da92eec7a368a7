//! Region-of-interest shapes.
//!
//! A [`Region`] is a closed sum over the shape kinds Slide Set works with.
//! Every variant answers the same three questions: how many dimensions it
//! spans, what its real-valued bounding extents are, and whether a point
//! lies inside it. Membership is always consistent with the extents: no
//! contained point lies outside `[real_min(d), real_max(d)]`.

use serde::{Deserialize, Serialize};

use super::coord::Coord;
use super::geometry;

/// Points closer than this to a line region count as on the line.
pub const LINE_TOLERANCE: f64 = 1e-9;

/// A geometric shape used to select image pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Region {
    /// A single N-D position.
    Point { position: Vec<f64> },

    /// A straight N-D segment.
    Line { start: Vec<f64>, end: Vec<f64> },

    /// A planar polygon; the last vertex connects back to the first.
    Polygon { vertices: Vec<Coord> },

    /// A planar general path made of flattened subpaths.
    Path { subpaths: Vec<Vec<Coord>> },

    /// An axis-aligned N-D ellipse.
    Ellipse { center: Vec<f64>, radii: Vec<f64> },

    /// An axis-aligned N-D box. Negative extents are allowed and normalized
    /// by the extent queries.
    Rectangle { origin: Vec<f64>, extent: Vec<f64> },
}

impl Region {
    /// Creates a point region.
    pub fn point(position: impl Into<Vec<f64>>) -> Self {
        Region::Point {
            position: position.into(),
        }
    }

    /// Creates a line region.
    pub fn line(start: impl Into<Vec<f64>>, end: impl Into<Vec<f64>>) -> Self {
        Region::Line {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Creates a polygon region.
    pub fn polygon(vertices: impl Into<Vec<Coord>>) -> Self {
        Region::Polygon {
            vertices: vertices.into(),
        }
    }

    /// Creates a path region.
    pub fn path(subpaths: Vec<Vec<Coord>>) -> Self {
        Region::Path { subpaths }
    }

    /// Creates an ellipse region.
    pub fn ellipse(center: impl Into<Vec<f64>>, radii: impl Into<Vec<f64>>) -> Self {
        Region::Ellipse {
            center: center.into(),
            radii: radii.into(),
        }
    }

    /// Creates a rectangle region.
    pub fn rectangle(origin: impl Into<Vec<f64>>, extent: impl Into<Vec<f64>>) -> Self {
        Region::Rectangle {
            origin: origin.into(),
            extent: extent.into(),
        }
    }

    /// Short name of the variant, used in log messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Region::Point { .. } => "point",
            Region::Line { .. } => "line",
            Region::Polygon { .. } => "polygon",
            Region::Path { .. } => "path",
            Region::Ellipse { .. } => "ellipse",
            Region::Rectangle { .. } => "rectangle",
        }
    }

    /// Returns true for shapes that enclose an area.
    ///
    /// Points and lines select pixels by their defining points only.
    pub fn is_area(&self) -> bool {
        !matches!(self, Region::Point { .. } | Region::Line { .. })
    }

    /// Number of dimensions the region spans.
    pub fn num_dimensions(&self) -> usize {
        match self {
            Region::Point { position } => position.len(),
            Region::Line { start, .. } => start.len(),
            Region::Polygon { .. } | Region::Path { .. } => 2,
            Region::Ellipse { center, .. } => center.len(),
            Region::Rectangle { origin, .. } => origin.len(),
        }
    }

    /// Minimum extent along axis `d`.
    ///
    /// Axes the region does not span are unbounded. Empty polygons and
    /// paths yield `+inf` here and `-inf` from [`Region::real_max`].
    pub fn real_min(&self, d: usize) -> f64 {
        if d >= self.num_dimensions() {
            return f64::NEG_INFINITY;
        }
        match self {
            Region::Point { position } => position[d],
            Region::Line { start, end } => start[d].min(coord_at(end, d)),
            Region::Polygon { vertices } => {
                planar_extent(vertices.iter(), d, f64::INFINITY, f64::min)
            }
            Region::Path { subpaths } => {
                planar_extent(subpaths.iter().flatten(), d, f64::INFINITY, f64::min)
            }
            Region::Ellipse { center, radii } => center[d] - radius_at(radii, d),
            Region::Rectangle { origin, extent } => {
                origin[d].min(origin[d] + extent.get(d).copied().unwrap_or(0.0))
            }
        }
    }

    /// Maximum extent along axis `d`.
    pub fn real_max(&self, d: usize) -> f64 {
        if d >= self.num_dimensions() {
            return f64::INFINITY;
        }
        match self {
            Region::Point { position } => position[d],
            Region::Line { start, end } => start[d].max(coord_at(end, d)),
            Region::Polygon { vertices } => {
                planar_extent(vertices.iter(), d, f64::NEG_INFINITY, f64::max)
            }
            Region::Path { subpaths } => {
                planar_extent(subpaths.iter().flatten(), d, f64::NEG_INFINITY, f64::max)
            }
            Region::Ellipse { center, radii } => center[d] + radius_at(radii, d),
            Region::Rectangle { origin, extent } => {
                origin[d].max(origin[d] + extent.get(d).copied().unwrap_or(0.0))
            }
        }
    }

    /// Returns true if `point` lies inside the region.
    ///
    /// Coordinates beyond the region's dimensionality are ignored; a point
    /// with fewer coordinates than the region is never contained.
    pub fn contains(&self, point: &[f64]) -> bool {
        let n = self.num_dimensions();
        if point.len() < n {
            return false;
        }
        if !(0..n).all(|d| point[d] >= self.real_min(d) && point[d] <= self.real_max(d)) {
            return false;
        }

        match self {
            Region::Point { position } => position.iter().zip(point).all(|(a, b)| a == b),
            Region::Line { start, end } => {
                let end: Vec<f64> = (0..n).map(|d| coord_at(end, d)).collect();
                geometry::distance_from_segment_nd(&point[..n], start, &end) <= LINE_TOLERANCE
            }
            Region::Polygon { vertices } => {
                let p = Coord::new(point[0], point[1]);
                geometry::rings_contain(std::iter::once(vertices.as_slice()), p)
            }
            Region::Path { subpaths } => {
                let p = Coord::new(point[0], point[1]);
                geometry::rings_contain(subpaths.iter().map(Vec::as_slice), p)
            }
            Region::Ellipse { center, radii } => {
                let mut sum = 0.0;
                for d in 0..n {
                    let r = radius_at(radii, d);
                    let offset = point[d] - center[d];
                    if r == 0.0 {
                        if offset != 0.0 {
                            return false;
                        }
                        continue;
                    }
                    sum += (offset / r).powi(2);
                }
                sum <= 1.0
            }
            // The extent check above is the whole test for boxes.
            Region::Rectangle { .. } => true,
        }
    }

    /// Ordered vertex list for vertex-based shapes, as N-D points.
    ///
    /// Polygons and paths yield their vertices (paths concatenated in
    /// subpath order), lines their two endpoints and points their position.
    /// Ellipses and rectangles have no vertex list.
    pub fn vertices(&self) -> Option<Vec<Vec<f64>>> {
        match self {
            Region::Point { position } => Some(vec![position.clone()]),
            Region::Line { start, end } => Some(vec![start.clone(), end.clone()]),
            Region::Polygon { vertices } => Some(vertices.iter().map(|c| c.to_vec()).collect()),
            Region::Path { subpaths } => {
                Some(subpaths.iter().flatten().map(|c| c.to_vec()).collect())
            }
            Region::Ellipse { .. } | Region::Rectangle { .. } => None,
        }
    }

    /// The points that stand for the region in bin and filter tests.
    ///
    /// A degenerate line (start equals end) is reduced to a single point.
    /// Ellipses are represented by their centre and rectangles by their
    /// corners.
    pub fn defining_points(&self) -> Vec<Vec<f64>> {
        match self {
            Region::Line { start, end } if start == end => vec![start.clone()],
            Region::Ellipse { center, .. } => vec![center.clone()],
            Region::Rectangle { origin, extent } => rectangle_corners(origin, extent),
            other => other.vertices().unwrap_or_default(),
        }
    }

    /// Returns true if the line region has equal endpoints.
    pub fn is_degenerate_line(&self) -> bool {
        matches!(self, Region::Line { start, end } if start == end)
    }
}

/// Missing trailing coordinates read as 0.
fn coord_at(values: &[f64], d: usize) -> f64 {
    values.get(d).copied().unwrap_or(0.0)
}

fn radius_at(radii: &[f64], d: usize) -> f64 {
    radii.get(d).copied().unwrap_or(0.0).abs()
}

/// Folds the x (d == 0) or y (d == 1) coordinate of `coords`.
///
/// An empty vertex list returns `init`, which callers pick so that the
/// resulting box is empty.
fn planar_extent<'a>(
    coords: impl Iterator<Item = &'a Coord>,
    d: usize,
    init: f64,
    fold: impl Fn(f64, f64) -> f64,
) -> f64 {
    coords
        .map(|c| if d == 0 { c.x } else { c.y })
        .fold(init, fold)
}

fn rectangle_corners(origin: &[f64], extent: &[f64]) -> Vec<Vec<f64>> {
    let n = origin.len();
    let mut corners = Vec::with_capacity(1 << n.min(16));
    for mask in 0..(1usize << n.min(16)) {
        let corner = (0..n)
            .map(|d| {
                let e = extent.get(d).copied().unwrap_or(0.0);
                if mask & (1 << d) != 0 {
                    origin[d] + e
                } else {
                    origin[d]
                }
            })
            .collect();
        corners.push(corner);
    }
    corners
}
