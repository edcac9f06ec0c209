//! Identity key normalization.
//!
//! The resolver compares emails case-insensitively and names after case
//! folding and whitespace collapsing. Both the index and the lookup side go
//! through these helpers so the two never disagree.

/// Lower-cases and trims an email. Returns `None` for blank input.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Case-folds a name and collapses runs of whitespace into single spaces.
/// Returns `None` when nothing but whitespace remains.
#[must_use]
pub fn normalize_name(name: &str) -> Option<String> {
    let collapsed = name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Trims an external id. Returns `None` for blank input.
#[must_use]
pub fn normalize_external_id(external_id: &str) -> Option<String> {
    let trimmed = external_id.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Joins first and last name the way the directory displays them.
#[must_use]
pub fn join_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

/// Maps blank strings to `None` and trims everything else.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
