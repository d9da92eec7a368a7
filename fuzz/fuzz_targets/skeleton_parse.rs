//! Fuzz target for command skeleton parsing (JSON and YAML).

#![no_main]

use libfuzzer_sys::fuzz_target;
use slideset::batch::skeleton::fuzz_parse_skeleton;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = fuzz_parse_skeleton(text);
});
