//! Directory store trait
//!
//! The reconciliation engine only needs three primitives from the backing
//! store: a paginated full scan, a point read, and a full-record write. The
//! store offers per-record atomicity only.

use async_trait::async_trait;
use roster_core::{DirectoryEntry, EntryId};

use crate::error::StoreResult;
use crate::paging::{ScanPage, ScanRequest};

/// Persistent directory of people.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Get the display name of this store (for logs).
    fn display_name(&self) -> &str;

    /// Read one page of a full scan.
    ///
    /// Pages must be traversed until `next_cursor` is `None`; a partial scan
    /// is not a consistent view of the directory.
    async fn scan_page(&self, request: ScanRequest) -> StoreResult<ScanPage>;

    /// Read a single entry by id.
    async fn get_entry(&self, id: &EntryId) -> StoreResult<Option<DirectoryEntry>>;

    /// Write an entry, replacing any existing record with the same id.
    ///
    /// This replaces the whole record; callers must start from a fresh read
    /// when modifying an existing entry.
    async fn put_entry(&self, entry: &DirectoryEntry) -> StoreResult<()>;

    /// Write an entry only if no record with the same id exists.
    ///
    /// Stores without conditional writes fall back to a plain upsert.
    async fn create_entry(&self, entry: &DirectoryEntry) -> StoreResult<()> {
        self.put_entry(entry).await
    }
}
