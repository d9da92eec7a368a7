//! Pixel overlap between two region sets paired by index.

use serde::Serialize;

use super::{region_box, to_real};
use crate::error::SlideSetError;
use crate::raster::{LatticeBox, Raster};
use crate::report::RunLog;
use crate::roi::Region;

/// Per-pair results of [`roi_overlap`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Overlap {
    /// Points inside both `a[i]` and `b[i]`.
    pub overlap: Vec<u64>,
    /// Points inside `a[i]` only.
    pub a_out_b: Vec<u64>,
    /// Points inside `b[i]` only.
    pub b_out_a: Vec<u64>,
}

/// Counts shared and exclusive lattice points of each `(a[i], b[i])` pair
/// within the raster's bounds.
///
/// # Errors
/// [`SlideSetError::StructuralMismatch`] if the sets differ in length.
pub fn roi_overlap(
    image: &Raster,
    a: &[Region],
    b: &[Region],
    log: &mut RunLog,
) -> Result<Overlap, SlideSetError> {
    if a.len() != b.len() {
        return Err(SlideSetError::StructuralMismatch(format!(
            "overlap needs equally long region sets, got {} and {}",
            a.len(),
            b.len()
        )));
    }
    let dims = image.spatial_dims();

    let mut out = Overlap::default();
    for (index, (ra, rb)) in a.iter().zip(b).enumerate() {
        let (mut both, mut only_a, mut only_b) = (0u64, 0u64, 0u64);

        let box_a = region_box(&dims, ra, index, 0, log);
        let box_b = region_box(&dims, rb, index, 0, log);
        let bounds: Option<LatticeBox> = match (box_a, box_b) {
            (Some(x), Some(y)) => Some(x.union(&y)),
            (x, y) => x.or(y),
        };

        if let Some(bounds) = bounds {
            for point in bounds.iter() {
                let real = to_real(&point);
                match (ra.contains(&real), rb.contains(&real)) {
                    (true, true) => both += 1,
                    (true, false) => only_a += 1,
                    (false, true) => only_b += 1,
                    (false, false) => {}
                }
            }
        }

        out.overlap.push(both);
        out.a_out_b.push(only_a);
        out.b_out_a.push(only_b);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sets_overlap_fully() {
        let image = Raster::zeros(&[20, 20], 1, 255.0);
        let regions = vec![
            Region::rectangle(vec![0.0, 0.0], vec![4.0, 4.0]),
            Region::ellipse(vec![10.0, 10.0], vec![3.0, 2.0]),
        ];
        let mut log = RunLog::new();
        let result = roi_overlap(&image, &regions, &regions, &mut log).unwrap();
        assert_eq!(result.overlap[0], 25);
        assert!(result.overlap[1] > 0);
        assert_eq!(result.a_out_b, vec![0, 0]);
        assert_eq!(result.b_out_a, vec![0, 0]);
    }

    #[test]
    fn partial_overlap() {
        let image = Raster::zeros(&[10, 10], 1, 255.0);
        let a = vec![Region::rectangle(vec![0.0, 0.0], vec![3.0, 0.0])];
        let b = vec![Region::rectangle(vec![2.0, 0.0], vec![3.0, 0.0])];
        let mut log = RunLog::new();
        let result = roi_overlap(&image, &a, &b, &mut log).unwrap();
        assert_eq!(result.overlap, vec![2]);
        assert_eq!(result.a_out_b, vec![2]);
        assert_eq!(result.b_out_a, vec![2]);
    }

    #[test]
    fn region_outside_raster_still_counts_its_partner() {
        let image = Raster::zeros(&[10, 10], 1, 255.0);
        let a = vec![Region::rectangle(vec![50.0, 50.0], vec![1.0, 1.0])];
        let b = vec![Region::rectangle(vec![0.0, 0.0], vec![1.0, 1.0])];
        let mut log = RunLog::new();
        let result = roi_overlap(&image, &a, &b, &mut log).unwrap();
        assert_eq!(result.b_out_a, vec![4]);
        assert_eq!(result.overlap, vec![0]);
    }

    #[test]
    fn unequal_lengths_are_fatal() {
        let image = Raster::zeros(&[2, 2], 1, 255.0);
        let a = vec![Region::point(vec![0.0, 0.0])];
        let mut log = RunLog::new();
        let err = roi_overlap(&image, &a, &[], &mut log).unwrap_err();
        assert!(matches!(err, SlideSetError::StructuralMismatch(_)));
        assert!(!err.is_recoverable());
    }
}
