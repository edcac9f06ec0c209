//! Directory store error types
//!
//! Error definitions with transient/permanent classification for retry logic.

use roster_core::EntryId;
use thiserror::Error;

/// Error that can occur while talking to the directory store.
#[derive(Debug, Error)]
pub enum StoreError {
    // Capacity errors (transient)
    /// The store rejected the request because provisioned throughput was exceeded.
    #[error("throughput exceeded: {message}")]
    Throttled { message: String },

    /// The store is temporarily unavailable.
    #[error("store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The request timed out.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    // Record errors (permanent)
    /// A conditional create found an existing record.
    #[error("entry already exists: {id}")]
    AlreadyExists { id: EntryId },

    /// The record does not exist.
    #[error("entry not found: {id}")]
    NotFound { id: EntryId },

    /// The record was rejected by the store's validation.
    #[error("invalid entry {id}: {message}")]
    InvalidEntry { id: EntryId, message: String },

    // Scan errors (permanent)
    /// A scan returned a continuation cursor that was already consumed.
    #[error("scan cursor repeated: {cursor}")]
    CursorLoop { cursor: String },

    /// A scan returned the same entry twice.
    #[error("entry {id} returned by more than one scan page")]
    DuplicateScanEntry { id: EntryId },

    /// Scan cursor is not recognised by the store.
    #[error("invalid scan cursor: {cursor}")]
    InvalidCursor { cursor: String },

    // Internal errors
    /// Serialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Check if this error is transient and the request should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Throttled { .. }
                | StoreError::Unavailable { .. }
                | StoreError::Timeout { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Throttled { .. } => "THROTTLED",
            StoreError::Unavailable { .. } => "STORE_UNAVAILABLE",
            StoreError::Timeout { .. } => "TIMEOUT",
            StoreError::AlreadyExists { .. } => "ENTRY_EXISTS",
            StoreError::NotFound { .. } => "ENTRY_NOT_FOUND",
            StoreError::InvalidEntry { .. } => "INVALID_ENTRY",
            StoreError::CursorLoop { .. } => "CURSOR_LOOP",
            StoreError::DuplicateScanEntry { .. } => "DUPLICATE_SCAN_ENTRY",
            StoreError::InvalidCursor { .. } => "INVALID_CURSOR",
            StoreError::Serialization { .. } => "SERIALIZATION_ERROR",
            StoreError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    /// Create a throttling error.
    pub fn throttled(message: impl Into<String>) -> Self {
        StoreError::Throttled {
            message: message.into(),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        StoreError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an invalid entry error.
    pub fn invalid_entry(id: EntryId, message: impl Into<String>) -> Self {
        StoreError::InvalidEntry {
            id,
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
