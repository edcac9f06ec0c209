//! Contract tests for `DirectoryStore` implementations.

use async_trait::async_trait;
use roster_core::{DirectoryEntry, EntryId};
use roster_store::{
    DirectoryStore, InMemoryDirectoryStore, InjectedFault, RetryConfig, RetryExecutor, ScanPage,
    ScanRequest, StoreError, StoreResult,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Store that only knows plain upserts and serves everything in one page.
#[derive(Default)]
struct UpsertOnlyStore {
    entries: Mutex<BTreeMap<EntryId, DirectoryEntry>>,
    puts: AtomicUsize,
}

#[async_trait]
impl DirectoryStore for UpsertOnlyStore {
    fn display_name(&self) -> &str {
        "upsert-only"
    }

    async fn scan_page(&self, _request: ScanRequest) -> StoreResult<ScanPage> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::internal(e.to_string()))?
            .values()
            .cloned()
            .collect();
        Ok(ScanPage::last(entries))
    }

    async fn get_entry(&self, id: &EntryId) -> StoreResult<Option<DirectoryEntry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::internal(e.to_string()))?;
        Ok(entries.get(id).cloned())
    }

    async fn put_entry(&self, entry: &DirectoryEntry) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::internal(e.to_string()))?;
        entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }
}

fn fast_retry(max_retries: u32) -> RetryExecutor {
    RetryExecutor::new(
        RetryConfig::default()
            .with_max_retries(max_retries)
            .with_delays(Duration::from_millis(1), Duration::from_millis(4)),
    )
}

#[tokio::test]
async fn test_default_create_falls_back_to_put() {
    let store = UpsertOnlyStore::default();
    let first = DirectoryEntry::new("7", "Ann Ray");
    let mut second = first.clone();
    second.department = Some("Ops".to_string());

    store.create_entry(&first).await.unwrap();
    store.create_entry(&second).await.unwrap();

    assert_eq!(store.puts.load(Ordering::SeqCst), 2);
    let saved = store.get_entry(&EntryId::from("7")).await.unwrap().unwrap();
    assert_eq!(saved.department.as_deref(), Some("Ops"));
    let page = store.scan_page(ScanRequest::first(10)).await.unwrap();
    assert!(!page.has_more());
    assert_eq!(page.entries.len(), 1);
}

#[tokio::test]
async fn test_in_memory_create_is_conditional() {
    let store = InMemoryDirectoryStore::new();
    let entry = DirectoryEntry::new("7", "Ann Ray");

    store.create_entry(&entry).await.unwrap();
    let err = store.create_entry(&entry).await.unwrap_err();

    assert!(matches!(err, StoreError::AlreadyExists { .. }));
    assert_eq!(err.error_code(), "ENTRY_EXISTS");
    assert!(err.is_permanent());
}

#[tokio::test(start_paused = true)]
async fn test_retry_executor_rides_out_injected_throttling() {
    let store = InMemoryDirectoryStore::with_entries([DirectoryEntry::new("1", "Ann Ray")]);
    store.fail_writes("1", 2, InjectedFault::Throttled).await;
    let mut updated = DirectoryEntry::new("1", "Ann Ray");
    updated.office = Some("Denver".to_string());

    fast_retry(3)
        .execute(|| store.put_entry(&updated))
        .await
        .unwrap();

    assert_eq!(store.put_calls(), 3);
    assert_eq!(
        store.entry("1").await.unwrap().office.as_deref(),
        Some("Denver")
    );
}

#[tokio::test(start_paused = true)]
async fn test_retry_executor_gives_up_on_permanent_error() {
    let store = InMemoryDirectoryStore::with_entries([DirectoryEntry::new("1", "Ann Ray")]);
    store.fail_writes("1", 5, InjectedFault::Internal).await;
    let entry = DirectoryEntry::new("1", "Ann Ray");

    let err = fast_retry(3)
        .execute(|| store.put_entry(&entry))
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "INTERNAL_ERROR");
    assert_eq!(store.put_calls(), 1);
}
