//! Validation helpers for roster import.
//!
//! Provides email validation, header normalization and supervisor name
//! parsing.

/// Maximum email length per RFC 5321.
const MAX_EMAIL_LENGTH: usize = 254;

/// UTF-8 byte order mark as it appears at the start of a decoded header.
const BOM: char = '\u{feff}';

/// Validate an email address format.
///
/// Uses a practical check consistent with RFC 5322 basics:
/// - Non-empty
/// - Contains exactly one `@`
/// - Local part and domain both non-empty
/// - Domain contains at least one `.`
/// - No whitespace
/// - Reasonable length
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is empty".to_string());
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(format!(
            "Email exceeds maximum length of {MAX_EMAIL_LENGTH} characters"
        ));
    }

    if email.contains(char::is_whitespace) {
        return Err("Email contains whitespace".to_string());
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err("Email must contain exactly one '@'".to_string());
    };

    if domain.contains('@') {
        return Err("Email must contain exactly one '@'".to_string());
    }

    if local.is_empty() {
        return Err("Email local part is empty".to_string());
    }

    if domain.is_empty() {
        return Err("Email domain is empty".to_string());
    }

    if !domain.contains('.') {
        return Err("Email domain must contain at least one '.'".to_string());
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Err("Email domain cannot start or end with '.'".to_string());
    }

    if domain.starts_with('-') || domain.ends_with('-') {
        return Err("Email domain cannot start or end with '-'".to_string());
    }

    Ok(())
}

/// Normalize a column header for case-insensitive matching.
///
/// Lower-cases, strips a leading BOM, treats `_` and `-` as spaces and
/// collapses whitespace, so `Work_Email`, `work email` and ` WORK  EMAIL`
/// compare equal.
#[must_use]
pub fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches(BOM)
        .replace(['_', '-'], " ")
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert a supervisor name from `Last, First` to `First Last`.
///
/// Values without exactly one comma are returned trimmed as-is.
#[must_use]
pub fn parse_supervisor_name(raw: &str) -> String {
    let raw = raw.trim();
    let mut parts = raw.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(last), Some(first), None) => {
            roster_core::join_name(first.trim(), last.trim())
        }
        _ => raw.to_string(),
    }
}
