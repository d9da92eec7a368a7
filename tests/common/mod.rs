#![allow(dead_code)]

use std::fs;
use std::path::Path;

use slideset::raster::{write_raster, Raster};
use slideset::roi::io_binary::write_region_set;
use slideset::roi::Region;

/// A `width` x `height` single-channel 8-bit image where every pixel is `value`.
pub fn write_flat_png(path: &Path, width: usize, height: usize, value: f64) {
    let raster = Raster::from_fn(&[width, height], 1, 255.0, |_, _| value);
    write_raster(path, &raster).expect("write png");
}

pub fn write_roiset(path: &Path, regions: &[Region]) {
    write_region_set(path, regions).expect("write region set");
}

pub fn write_text(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write text file");
}

/// A table with one image and one region-set column, plus the files it
/// references. Rows: `a` (present) and `gone` (missing files).
pub fn write_cells_fixture(dir: &Path) {
    write_flat_png(&dir.join("a.png"), 16, 16, 5.0);
    write_roiset(
        &dir.join("a.roiset"),
        &[
            Region::rectangle(vec![0.0, 0.0], vec![10.0, 10.0]),
            Region::rectangle(vec![2.0, 2.0], vec![1.0, 1.0]),
        ],
    );
    write_text(
        &dir.join("cells.csv"),
        "image:file:image/png,rois:file:application/x-slideset-roiset\n\
         a.png,a.roiset\n\
         gone.png,gone.roiset\n",
    );
}

pub const REGION_STATS_YAML: &str = "\
command: RegionStats
inputs:
  image: { column: image }
  regions: { column: rois }
outputs:
  size: {}
  red: { column: red_sum }
";
