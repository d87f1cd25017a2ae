#![no_main]
//! Fuzz test for is_query_text and command compilation
//!
//! Every statement execution goes through these two, so they see raw client
//! input. A compiled command must agree with the classifier.

use libfuzzer_sys::fuzz_target;
use orient_jdbc::is_query_text;
use orient_jdbc::query::CompiledCommand;

fuzz_target!(|data: &[u8]| {
    if let Ok(sql) = std::str::from_utf8(data) {
        let is_query = is_query_text(sql);
        if let Ok(compiled) = CompiledCommand::compile(sql, "Statement.executeEmptyString") {
            assert_eq!(compiled.is_query(), is_query);
            assert_eq!(compiled.text(), sql);
        }
    }
});
