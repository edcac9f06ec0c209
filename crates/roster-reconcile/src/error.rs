//! Error types for reconciliation runs.
//!
//! Only failures that stop a run live here. Per-record write failures are
//! collected into the run's result instead.

use roster_store::StoreError;
use thiserror::Error;

/// Invalid or missing configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Required configuration is missing.
    #[error("Configuration missing: {var}")]
    Missing { var: String },

    /// Configuration value is invalid.
    #[error("Configuration invalid for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(var: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var: var.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors that abort a reconciliation run before any mutation is applied.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The run was configured with invalid settings.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The directory snapshot could not be read completely.
    #[error("Failed to load directory snapshot: {source}")]
    StoreRead {
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    /// Stable error code for logs and reports.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "INVALID_CONFIG",
            Self::StoreRead { source } => source.error_code(),
        }
    }
}

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
