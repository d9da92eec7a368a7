//! Fuzz target for SVG path data and transform lists.
//!
//! Each input is split at the first newline: the head is used as path data
//! (`d` attribute), the tail as a `transform` attribute.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slideset::roi::svg_path::interpret_path;
use slideset::roi::transform::parse_transform_list;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (d, transform) = text.split_once('\n').unwrap_or((text, ""));
    let _ = interpret_path(d);
    let _ = parse_transform_list(transform);
});
