//! Fuzz target for roster record mapping.
//!
//! Arbitrary header/value pairs must map to a row without panicking, and
//! any email kept on the row still has its `@`.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_record_mapping -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use roster_import::FieldMapping;
use std::collections::HashMap;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // One "header=value" pair per line.
    let record: HashMap<String, String> = s
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let (row, warnings) = FieldMapping::new().map_record(&record, 2);

    if let Some(email) = row.email.as_deref() {
        assert!(email.contains('@'));
    }
    for warning in &warnings {
        assert_eq!(warning.line, 2);
    }
    let _ = row.label();
});
