//! Error types for roster record mapping.

use thiserror::Error;

/// Errors raised while building a field mapping.
///
/// Per-row problems are not errors; they are reported as
/// [`RowWarning`](crate::RowWarning)s so one bad row never blocks a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Column override names a field that does not exist.
    #[error("unknown roster field '{name}' (valid fields: {valid})")]
    UnknownField { name: String, valid: String },

    /// Column override has an empty source header.
    #[error("column mapping for field '{field}' has an empty source header")]
    EmptyHeader { field: String },
}

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;
