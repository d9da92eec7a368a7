//! End-to-end checks of the analysis commands on hand-built inputs.

use slideset::analysis::{
    bin_regions, correlation, region_stats, roi_overlap, CorrelationOptions, RegionStatsOptions,
};
use slideset::raster::Raster;
use slideset::report::RunLog;
use slideset::roi::svg::from_svg_str;
use slideset::roi::{Coord, Region};

const EPS: f64 = 1e-9;

#[test]
fn flat_image_sums_value_times_lattice_points() {
    let image = Raster::from_fn(&[16, 16], 3, 255.0, |_, _| 5.0);
    let regions = [Region::rectangle(vec![0.0, 0.0], vec![10.0, 10.0])];
    let mut log = RunLog::new();

    let stats = region_stats(&image, &regions, &RegionStatsOptions::default(), &mut log);

    assert_eq!(stats.size, vec![121]);
    assert_eq!(stats.red, vec![5.0 * 121.0]);
    assert_eq!(stats.green, vec![5.0 * 121.0]);
    assert!(log.is_clean());
}

#[test]
fn ellipse_element_and_two_arc_path_parse_alike() {
    let mut log = RunLog::new();
    let regions = from_svg_str(
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <ellipse cx="40.5" cy="12" rx="7.25" ry="3"/>
             <path d="M 33.25 12 A 7.25 3 0 0 1 47.75 12 A 7.25 3 0 0 1 33.25 12"/>
           </svg>"#,
        &mut log,
    )
    .unwrap();
    assert!(log.is_clean(), "{log}");
    assert_eq!(regions.len(), 2);

    let parts = |region: &Region| match region {
        Region::Ellipse { center, radii } => (center.clone(), radii.clone()),
        other => panic!("expected ellipse, got {other:?}"),
    };
    let (c1, r1) = parts(&regions[0]);
    let (c2, r2) = parts(&regions[1]);
    for d in 0..2 {
        assert!((c1[d] - c2[d]).abs() < EPS);
        assert!((r1[d] - r2[d]).abs() < EPS);
    }
    assert!((c1[0] - 40.5).abs() < EPS);
    assert!((r1[1] - 3.0).abs() < EPS);
}

#[test]
fn identical_sets_overlap_completely() {
    let image = Raster::zeros(&[32, 32], 1, 255.0);
    let regions = vec![
        Region::rectangle(vec![2.0, 3.0], vec![8.0, 5.0]),
        Region::ellipse(vec![16.0, 16.0], vec![6.0, 4.0]),
        Region::polygon(vec![
            Coord::new(20.0, 2.0),
            Coord::new(30.0, 2.0),
            Coord::new(25.0, 12.0),
        ]),
    ];
    let mut log = RunLog::new();

    let overlap = roi_overlap(&image, &regions, &regions, &mut log).unwrap();
    let sizes = region_stats(&image, &regions, &RegionStatsOptions::default(), &mut log).size;

    assert_eq!(overlap.overlap, sizes);
    assert!(overlap.overlap.iter().all(|n| *n > 0));
    assert_eq!(overlap.a_out_b, vec![0, 0, 0]);
    assert_eq!(overlap.b_out_a, vec![0, 0, 0]);
}

#[test]
fn point_at_bin_centroid_lands_in_that_bin() {
    let bin = Region::polygon(vec![
        Coord::new(0.0, 0.0),
        Coord::new(10.0, 0.0),
        Coord::new(10.0, 10.0),
        Coord::new(0.0, 10.0),
    ]);
    let point = Region::point(vec![5.0, 5.0]);
    let mut log = RunLog::new();

    assert_eq!(bin_regions(&[point.clone()], &[bin], &mut log), vec![0]);
    assert_eq!(bin_regions(&[point], &[], &mut log), vec![-1]);
}

#[test]
fn anti_correlated_channels_give_minus_one() {
    let image = Raster::from_fn(&[12, 12], 2, 255.0, |pos, c| {
        let t = (pos[0] + 3 * pos[1]) as f64;
        if c == 0 {
            t
        } else {
            200.0 - 2.0 * t
        }
    });
    let regions = [Region::rectangle(vec![1.0, 1.0], vec![6.0, 6.0])];
    let mut log = RunLog::new();

    let result = correlation(&image, &regions, &CorrelationOptions::default(), &mut log).unwrap();

    assert_eq!(result.pixel_count, vec![49]);
    assert!((result.coefficient[0] + 1.0).abs() < 1e-9);
}
