//! Directory snapshot loading.
//!
//! Walks every scan page before classification starts. Each page read goes
//! through the retry executor; a read that still fails, a cursor that comes
//! back twice, or an id seen on two pages aborts the load.

use roster_core::{DirectoryEntry, EntryId};
use roster_store::{DirectoryStore, RetryExecutor, ScanRequest, StoreError, StoreResult};
use std::collections::HashSet;
use tracing::debug;

/// Complete set of directory entries at load time.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    pub entries: Vec<DirectoryEntry>,
    /// Number of pages read.
    pub pages: usize,
}

impl DirectorySnapshot {
    /// Ids present in the snapshot.
    #[must_use]
    pub fn ids(&self) -> HashSet<EntryId> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read the whole directory, page by page.
pub async fn load_snapshot(
    store: &dyn DirectoryStore,
    page_size: u32,
    retry: &RetryExecutor,
) -> StoreResult<DirectorySnapshot> {
    let mut snapshot = DirectorySnapshot::default();
    let mut seen_ids: HashSet<EntryId> = HashSet::new();
    let mut seen_cursors: HashSet<String> = HashSet::new();
    let mut request = ScanRequest::first(page_size);

    loop {
        let page = retry.execute(|| store.scan_page(request.clone())).await?;
        snapshot.pages += 1;

        for entry in page.entries {
            if !seen_ids.insert(entry.id.clone()) {
                return Err(StoreError::DuplicateScanEntry { id: entry.id });
            }
            snapshot.entries.push(entry);
        }

        debug!(
            store = store.display_name(),
            page = snapshot.pages,
            loaded = snapshot.entries.len(),
            "Loaded snapshot page"
        );

        match page.next_cursor {
            Some(cursor) => {
                if !seen_cursors.insert(cursor.clone()) {
                    return Err(StoreError::CursorLoop { cursor });
                }
                request = ScanRequest::after(page_size, cursor);
            }
            None => break,
        }
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_store::{InMemoryDirectoryStore, InjectedFault, RetryConfig, ScanPage};
    use std::time::Duration;

    fn retry() -> RetryExecutor {
        RetryExecutor::new(
            RetryConfig::default()
                .with_delays(Duration::from_millis(1), Duration::from_millis(4))
                .without_jitter(),
        )
    }

    fn store_with(n: usize) -> InMemoryDirectoryStore {
        InMemoryDirectoryStore::with_entries(
            (0..n).map(|i| DirectoryEntry::new(format!("{i:03}"), format!("Person {i}"))),
        )
    }

    #[tokio::test]
    async fn test_loads_every_page() {
        let store = store_with(7);

        let snapshot = load_snapshot(&store, 3, &retry()).await.unwrap();

        assert_eq!(snapshot.len(), 7);
        assert_eq!(snapshot.pages, 3);
        assert_eq!(snapshot.ids().len(), 7);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = InMemoryDirectoryStore::new();

        let snapshot = load_snapshot(&store, 10, &retry()).await.unwrap();

        assert!(snapshot.is_empty());
        assert_eq!(snapshot.pages, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_page_failure_is_retried() {
        let store = store_with(4);
        store.fail_scans(1, 2, InjectedFault::Throttled).await;

        let snapshot = load_snapshot(&store, 2, &retry()).await.unwrap();

        assert_eq!(snapshot.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail_the_load() {
        let store = store_with(4);
        store.fail_scans(1, 10, InjectedFault::Unavailable).await;

        let err = load_snapshot(&store, 2, &retry()).await.unwrap_err();

        assert!(matches!(err, StoreError::Unavailable { .. }));
    }

    struct LoopingStore;

    #[async_trait::async_trait]
    impl DirectoryStore for LoopingStore {
        fn display_name(&self) -> &str {
            "looping"
        }

        async fn scan_page(&self, _request: ScanRequest) -> StoreResult<ScanPage> {
            Ok(ScanPage {
                entries: Vec::new(),
                next_cursor: Some("same".to_string()),
            })
        }

        async fn get_entry(&self, _id: &EntryId) -> StoreResult<Option<DirectoryEntry>> {
            Ok(None)
        }

        async fn put_entry(&self, _entry: &DirectoryEntry) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_repeated_cursor_is_rejected() {
        let err = load_snapshot(&LoopingStore, 10, &retry()).await.unwrap_err();

        assert!(matches!(err, StoreError::CursorLoop { .. }));
    }

    struct RepeatingStore;

    #[async_trait::async_trait]
    impl DirectoryStore for RepeatingStore {
        fn display_name(&self) -> &str {
            "repeating"
        }

        async fn scan_page(&self, request: ScanRequest) -> StoreResult<ScanPage> {
            let entries = vec![DirectoryEntry::new("dup", "Dup Licate")];
            Ok(ScanPage {
                entries,
                next_cursor: request.cursor.is_none().then(|| "next".to_string()),
            })
        }

        async fn get_entry(&self, _id: &EntryId) -> StoreResult<Option<DirectoryEntry>> {
            Ok(None)
        }

        async fn put_entry(&self, _entry: &DirectoryEntry) -> StoreResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_entry_on_two_pages_is_rejected() {
        let err = load_snapshot(&RepeatingStore, 10, &retry()).await.unwrap_err();

        assert!(matches!(err, StoreError::DuplicateScanEntry { .. }));
    }
}
