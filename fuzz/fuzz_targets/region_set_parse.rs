//! Fuzz target for binary region-set decoding.
//!
//! Every successfully decoded set must encode back to the same bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slideset::roi::io_binary::{from_region_set_slice, to_region_set_bytes};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    if let Ok(regions) = from_region_set_slice(data) {
        let bytes = to_region_set_bytes(&regions).expect("decoded regions encode");
        assert_eq!(bytes, data);
    }
});
