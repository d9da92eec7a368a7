//! Fuzz target for SVG region parsing.
//!
//! This fuzzer feeds arbitrary byte sequences to the SVG reader, checking
//! for panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slideset::report::RunLog;
use slideset::roi::svg::from_svg_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    let mut log = RunLog::new();
    let _ = from_svg_slice(data, &mut log);
});
