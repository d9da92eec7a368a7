#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

use slideset::roi::{Coord, Region};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_coordinate() -> impl Strategy<Value = f64> {
    -1000.0f64..1000.0
}

pub fn arb_coord() -> impl Strategy<Value = Coord> {
    (arb_coordinate(), arb_coordinate()).prop_map(|(x, y)| Coord::new(x, y))
}

/// Positions of 1 to 4 dimensions.
pub fn arb_position() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(arb_coordinate(), 1..=4)
}

pub fn arb_region() -> BoxedStrategy<Region> {
    prop_oneof![
        arb_position().prop_map(Region::point),
        arb_position()
            .prop_flat_map(|start| {
                let n = start.len();
                (Just(start), prop::collection::vec(arb_coordinate(), n))
            })
            .prop_map(|(start, end)| Region::line(start, end)),
        prop::collection::vec(arb_coord(), 3..12).prop_map(Region::polygon),
        prop::collection::vec(prop::collection::vec(arb_coord(), 2..8), 1..4)
            .prop_map(Region::path),
        arb_position()
            .prop_flat_map(|center| {
                let n = center.len();
                (Just(center), prop::collection::vec(0.5f64..50.0, n))
            })
            .prop_map(|(center, radii)| Region::ellipse(center, radii)),
        arb_position()
            .prop_flat_map(|origin| {
                let n = origin.len();
                (Just(origin), prop::collection::vec(-50.0f64..50.0, n))
            })
            .prop_map(|(origin, extent)| Region::rectangle(origin, extent)),
    ]
    .boxed()
}

pub fn arb_region_set(max_len: usize) -> BoxedStrategy<Vec<Region>> {
    prop::collection::vec(arb_region(), 0..=max_len).boxed()
}

/// An integer-aligned rectangle `(x, y, w, h)` that fits in a
/// `size` x `size` image.
pub fn arb_pixel_rect(size: usize) -> impl Strategy<Value = (usize, usize, usize, usize)> {
    (0..size, 0..size).prop_flat_map(move |(x, y)| (Just(x), Just(y), 1..=size - x, 1..=size - y))
}
