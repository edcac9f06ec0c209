//! # Directory Store
//!
//! Abstraction over the persisted employee directory used by roster
//! reconciliation.
//!
//! The backing store is a key-value table with per-record atomic writes and
//! no multi-record transactions. The engine needs:
//!
//! - [`DirectoryStore::scan_page`] - paginated full scan
//! - [`DirectoryStore::get_entry`] - point read (used right before an update)
//! - [`DirectoryStore::put_entry`] - full-record upsert
//! - [`DirectoryStore::create_entry`] - create-if-absent
//!
//! ## Crate Organization
//!
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - The store trait
//! - [`paging`] - Scan request/page types
//! - [`memory`] - In-memory store with fault injection
//! - [`resilience`] - Retry with exponential backoff

pub mod error;
pub mod memory;
pub mod paging;
pub mod resilience;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryDirectoryStore, InjectedFault};
pub use paging::{ScanPage, ScanRequest};
pub use resilience::{is_retryable, RetryConfig, RetryExecutor};
pub use traits::DirectoryStore;
