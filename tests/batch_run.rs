//! Batch runs over tables read from disk.

use std::path::Path;

use slideset::batch::{read_skeleton, run_batch};
use slideset::raster::{read_raster, write_raster, Raster};
use slideset::report::{LogCode, RunLog};
use slideset::roi::io_binary::read_region_set;
use slideset::roi::Region;
use slideset::table::io_csv::{read_table_csv, to_table_csv_string};
use slideset::table::Value;
use slideset::types::TypeRegistry;

mod common;

fn two_squares(dir: &Path) {
    let image = Raster::from_fn(&[20, 20], 1, 255.0, |pos, _| {
        let (x, y) = (pos[0], pos[1]);
        let first = (2..6).contains(&x) && (2..6).contains(&y);
        let second = (10..17).contains(&x) && (12..15).contains(&y);
        if first || second {
            200.0
        } else {
            0.0
        }
    });
    write_raster(&dir.join("squares.png"), &image).unwrap();
    common::write_text(&dir.join("images.csv"), "image:file:image/png\nsquares.png\n");
}

#[test]
fn threshold_segmentation_writes_blob_files() {
    let dir = tempfile::tempdir().unwrap();
    two_squares(dir.path());
    common::write_text(
        &dir.path().join("segment.json"),
        r#"{
          "command": "ThresholdSegmentation",
          "inputs": {
            "image": { "column": "image" },
            "threshold": { "constant": 100.0 },
            "min_size": { "constant": 2 }
          }
        }"#,
    );

    let table = read_table_csv(&dir.path().join("images.csv")).unwrap();
    let skeleton = read_skeleton(&dir.path().join("segment.json")).unwrap();
    let mut log = RunLog::new();
    let result = run_batch(&table, &skeleton, &TypeRegistry::builtin(), &mut log).unwrap();

    assert_eq!(result.row_count(), 1);
    assert_eq!(result.underlying_value(1, 0).unwrap(), &Value::FileLink("blobs-0.roiset".into()));
    assert_eq!(result.underlying_value(2, 0).unwrap(), &Value::Integer(2));

    let blobs = read_region_set(&dir.path().join("blobs-0.roiset")).unwrap();
    assert_eq!(blobs.len(), 2);
    assert!(blobs[0].contains(&[3.0, 3.0]));
    assert!(blobs[1].contains(&[16.0, 14.0]));
    assert!(!blobs[1].contains(&[16.0, 15.0]));
    assert_eq!(log.count_code(LogCode::RowCompleted), 1);
}

#[test]
fn otsu_writes_thresholds_and_mask() {
    let dir = tempfile::tempdir().unwrap();
    two_squares(dir.path());
    common::write_text(
        &dir.path().join("otsu.yaml"),
        "command: OtsuSegmentation\ninputs:\n  image: { column: image }\n",
    );

    let table = read_table_csv(&dir.path().join("images.csv")).unwrap();
    let skeleton = read_skeleton(&dir.path().join("otsu.yaml")).unwrap();
    let mut log = RunLog::new();
    let result = run_batch(&table, &skeleton, &TypeRegistry::builtin(), &mut log).unwrap();

    let Value::String(thresholds) = result.underlying_value(1, 0).unwrap() else {
        panic!("thresholds should be text");
    };
    let threshold: f64 = thresholds.parse().unwrap();
    assert!(threshold > 0.0 && threshold < 200.0);

    let mask = read_raster(&dir.path().join("mask-0.png")).unwrap();
    assert_eq!(mask.spatial_dims(), vec![20, 20]);
    assert!(mask.sample(&[3, 3], 0) > 0.0);
    assert_eq!(mask.sample(&[0, 0], 0), 0.0);
}

#[test]
fn filter_regions_reads_svg_and_binary_sets() {
    let dir = tempfile::tempdir().unwrap();
    common::write_text(
        &dir.path().join("cells.svg"),
        r#"<svg xmlns="http://www.w3.org/2000/svg">
             <rect x="1" y="1" width="2" height="2"/>
             <rect x="30" y="30" width="2" height="2"/>
             <circle cx="5" cy="5" r="1"/>
           </svg>"#,
    );
    common::write_roiset(
        &dir.path().join("tissue.roiset"),
        &[Region::rectangle(vec![0.0, 0.0], vec![10.0, 10.0])],
    );
    common::write_text(
        &dir.path().join("slides.csv"),
        "cells:file:image/svg+xml,tissue:file:application/x-slideset-roiset\n\
         cells.svg,tissue.roiset\n",
    );
    common::write_text(
        &dir.path().join("filter.yaml"),
        "command: FilterRegions\n\
         inputs:\n  regions: { column: cells }\n  masks: { column: tissue }\n",
    );

    let table = read_table_csv(&dir.path().join("slides.csv")).unwrap();
    let skeleton = read_skeleton(&dir.path().join("filter.yaml")).unwrap();
    let mut log = RunLog::new();
    let result = run_batch(&table, &skeleton, &TypeRegistry::builtin(), &mut log).unwrap();

    assert_eq!(
        result.underlying_value(3, 0).unwrap(),
        &Value::String("0, 2".into())
    );
    let kept = read_region_set(&dir.path().join("kept-0.roiset")).unwrap();
    assert_eq!(kept.len(), 2);
    assert!(log.is_clean(), "{log}");

    let csv = to_table_csv_string(&result).unwrap();
    assert!(csv.starts_with(
        "cells:file:image/svg+xml,tissue:file:application/x-slideset-roiset,\
         kept:file:application/x-slideset-roiset,kept_indices:string\n"
    ));
}
