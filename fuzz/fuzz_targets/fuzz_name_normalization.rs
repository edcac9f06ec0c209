//! Fuzz target for identity key normalization.
//!
//! Normalized identity keys must be stable: normalizing a key again yields
//! the same key, and a key is never empty.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_name_normalization -- -max_total_time=600

#![no_main]

use libfuzzer_sys::fuzz_target;
use roster_core::{normalize_email, normalize_external_id, normalize_name};
use roster_import::{normalize_header, parse_supervisor_name};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Some(name) = normalize_name(s) {
            assert!(!name.is_empty());
            assert_eq!(normalize_name(&name).as_deref(), Some(name.as_str()));
        }

        if let Some(email) = normalize_email(s) {
            assert!(!email.is_empty());
            assert_eq!(normalize_email(&email).as_deref(), Some(email.as_str()));
        }

        if let Some(id) = normalize_external_id(s) {
            assert_eq!(id.trim(), id);
        }

        let header = normalize_header(s);
        assert!(!header.contains('_'));

        let _ = parse_supervisor_name(s);
    }
});
