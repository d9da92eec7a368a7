//! Fuzz target for table CSV parsing.
//!
//! This fuzzer feeds arbitrary byte sequences to the table CSV reader,
//! checking for panics, crashes, or hangs.

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use slideset::table::io_csv::from_table_csv_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    let _ = from_table_csv_slice(data, Path::new("."));
});
