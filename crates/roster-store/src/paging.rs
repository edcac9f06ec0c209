//! Scan pagination types.

use roster_core::DirectoryEntry;
use serde::{Deserialize, Serialize};

/// Request for one page of a full-table scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Maximum number of entries to return.
    pub page_size: u32,

    /// Opaque cursor returned by the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl ScanRequest {
    /// Request the first page.
    pub fn first(page_size: u32) -> Self {
        Self {
            page_size,
            cursor: None,
        }
    }

    /// Request the page following `cursor`.
    pub fn after(page_size: u32, cursor: impl Into<String>) -> Self {
        Self {
            page_size,
            cursor: Some(cursor.into()),
        }
    }
}

/// One page of scan results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanPage {
    /// Entries on this page.
    pub entries: Vec<DirectoryEntry>,

    /// Cursor for the next page; `None` when the scan is complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl ScanPage {
    /// Create a final page.
    pub fn last(entries: Vec<DirectoryEntry>) -> Self {
        Self {
            entries,
            next_cursor: None,
        }
    }

    /// Whether more pages follow.
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}
