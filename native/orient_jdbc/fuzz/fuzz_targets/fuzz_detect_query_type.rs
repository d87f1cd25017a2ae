#![no_main]
//! Fuzz test for detect_query_type
//!
//! Classifies arbitrary command text by its first keyword. Must never panic.

use libfuzzer_sys::fuzz_target;
use orient_jdbc::detect_query_type;

fuzz_target!(|data: &[u8]| {
    if let Ok(sql) = std::str::from_utf8(data) {
        let _ = detect_query_type(sql);
    }
});
