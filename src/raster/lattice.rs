//! Integer lattice boxes and their iteration.
//!
//! Analysis commands visit the pixels of a region by iterating the integer
//! box around it and testing each lattice point for membership. The box is
//! `floor(real_min)..=ceil(real_max)` per axis, optionally clamped to a
//! raster.

use crate::error::SlideSetError;
use crate::roi::Region;

/// An inclusive N-D integer box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LatticeBox {
    pub min: Vec<i64>,
    pub max: Vec<i64>,
}

impl LatticeBox {
    pub fn new(min: Vec<i64>, max: Vec<i64>) -> Self {
        Self { min, max }
    }

    pub fn dims(&self) -> usize {
        self.min.len()
    }

    /// True if some axis has `min > max`.
    pub fn is_empty(&self) -> bool {
        self.min.iter().zip(&self.max).any(|(lo, hi)| lo > hi)
    }

    /// Number of lattice points in the box.
    pub fn point_count(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| (hi - lo + 1) as u64)
            .product()
    }

    /// Iterates every lattice point; the first axis varies fastest.
    pub fn iter(&self) -> LatticeIter<'_> {
        LatticeIter {
            bounds: self,
            next: (!self.is_empty()).then(|| self.min.clone()),
        }
    }

    /// The unclamped box around a region.
    ///
    /// `None` when the region has no finite extent (an empty polygon, for
    /// example).
    pub fn for_region(region: &Region) -> Option<LatticeBox> {
        let n = region.num_dimensions();
        let mut min = Vec::with_capacity(n);
        let mut max = Vec::with_capacity(n);
        for d in 0..n {
            let lo = region.real_min(d).floor();
            let hi = region.real_max(d).ceil();
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return None;
            }
            min.push(lo as i64);
            max.push(hi as i64);
        }
        Some(LatticeBox { min, max })
    }

    /// The region's box clamped to a raster with spatial shape `dims`.
    ///
    /// Raster axes the region does not span are covered completely.
    ///
    /// # Errors
    /// [`SlideSetError::DimensionMismatch`] if the region spans more axes
    /// than the raster has.
    pub fn for_region_in(
        region: &Region,
        dims: &[usize],
    ) -> Result<Option<LatticeBox>, SlideSetError> {
        Self::for_region_in_with_margin(region, dims, 0)
    }

    /// Like [`LatticeBox::for_region_in`], with the region's box grown by
    /// `margin` on every spanned axis before clamping.
    pub fn for_region_in_with_margin(
        region: &Region,
        dims: &[usize],
        margin: i64,
    ) -> Result<Option<LatticeBox>, SlideSetError> {
        let n = region.num_dimensions();
        if n > dims.len() {
            return Err(SlideSetError::DimensionMismatch {
                region: n,
                target: dims.len(),
            });
        }

        let mut min = Vec::with_capacity(dims.len());
        let mut max = Vec::with_capacity(dims.len());
        for (d, &len) in dims.iter().enumerate() {
            if len == 0 {
                return Ok(None);
            }
            let last = (len - 1) as f64;
            let (lo, hi) = if d < n {
                let margin = margin as f64;
                (
                    (region.real_min(d).floor() - margin).max(0.0),
                    (region.real_max(d).ceil() + margin).min(last),
                )
            } else {
                (0.0, last)
            };
            // NaN fails this test as well.
            if !(lo <= hi) {
                return Ok(None);
            }
            min.push(lo as i64);
            max.push(hi as i64);
        }
        Ok(Some(LatticeBox { min, max }))
    }

    /// Every position of a raster with spatial shape `dims`; `None` if
    /// some axis has length zero.
    pub fn covering(dims: &[usize]) -> Option<LatticeBox> {
        if dims.contains(&0) {
            return None;
        }
        Some(LatticeBox {
            min: vec![0; dims.len()],
            max: dims.iter().map(|d| *d as i64 - 1).collect(),
        })
    }

    /// Smallest box holding both; boxes must have the same dimensionality.
    pub fn union(&self, other: &LatticeBox) -> LatticeBox {
        LatticeBox {
            min: self.min.iter().zip(&other.min).map(|(a, b)| *a.min(b)).collect(),
            max: self.max.iter().zip(&other.max).map(|(a, b)| *a.max(b)).collect(),
        }
    }
}

/// Iterator over the points of a [`LatticeBox`].
pub struct LatticeIter<'a> {
    bounds: &'a LatticeBox,
    next: Option<Vec<i64>>,
}

impl Iterator for LatticeIter<'_> {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Vec<i64>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for d in 0..following.len() {
            if following[d] < self.bounds.max[d] {
                following[d] += 1;
                self.next = Some(following);
                return Some(current);
            }
            following[d] = self.bounds.min[d];
        }
        // Every axis wrapped: `current` was the last point.
        Some(current)
    }
}

/// Lattice points of the region's unclamped box that the region contains.
pub fn interior_points(region: &Region) -> Vec<Vec<f64>> {
    let Some(bounds) = LatticeBox::for_region(region) else {
        return Vec::new();
    };
    bounds
        .iter()
        .map(|p| p.into_iter().map(|v| v as f64).collect::<Vec<f64>>())
        .filter(|p| region.contains(p))
        .collect()
}
