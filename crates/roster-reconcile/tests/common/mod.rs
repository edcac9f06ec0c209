//! Integration test helpers for roster-reconcile.
//!
//! Provides logging setup, directory entry builders and store wrappers that
//! interfere with a run at precise points.

#![allow(dead_code)]

use async_trait::async_trait;
use roster_core::{DirectoryEntry, EntryId};
use roster_reconcile::{CancellationToken, ReconcileConfig, RosterReconciler};
use roster_store::{
    DirectoryStore, InMemoryDirectoryStore, ScanPage, ScanRequest, StoreError, StoreResult,
};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// Configuration with short backoff so retry tests stay fast.
pub fn fast_config() -> ReconcileConfig {
    ReconcileConfig::default()
        .with_retry_delays(Duration::from_millis(1), Duration::from_millis(8))
        .with_scan_page_size(2)
}

/// Active entry with a name and email.
pub fn entry(id: &str, name: &str, email: &str) -> DirectoryEntry {
    let mut entry = DirectoryEntry::new(id, name);
    entry.email = Some(email.to_string());
    entry
}

/// Entry carrying non-default protected fields.
pub fn funded_entry(id: &str, name: &str, email: &str, balance: i64) -> DirectoryEntry {
    let mut entry = entry(id, name, email);
    entry.protected.credential_secret = format!("secret-{id}");
    entry.protected.reward_balance = Decimal::new(balance, 0);
    entry.protected.reward_budget = Decimal::new(1000, 0);
    entry.protected.is_reward_manager = true;
    entry
        .protected
        .history
        .insert("merchandise".to_string(), serde_json::json!([{"item": "jacket"}]));
    entry
}

/// Store pre-populated with `entries` and a reconciler over it.
pub fn setup(
    entries: impl IntoIterator<Item = DirectoryEntry>,
    config: ReconcileConfig,
) -> (Arc<InMemoryDirectoryStore>, RosterReconciler) {
    init_test_logging();
    let store = Arc::new(InMemoryDirectoryStore::with_entries(entries));
    let reconciler = RosterReconciler::with_config(store.clone(), config);
    (store, reconciler)
}

/// Replaces an entry behind the engine's back once the full scan is served,
/// as a concurrent writer would.
pub struct ConcurrentWriterStore {
    pub inner: Arc<InMemoryDirectoryStore>,
    after_scan: Mutex<Option<DirectoryEntry>>,
}

impl ConcurrentWriterStore {
    pub fn new(inner: Arc<InMemoryDirectoryStore>, replacement: DirectoryEntry) -> Self {
        Self {
            inner,
            after_scan: Mutex::new(Some(replacement)),
        }
    }
}

#[async_trait]
impl DirectoryStore for ConcurrentWriterStore {
    fn display_name(&self) -> &str {
        "concurrent-writer"
    }

    async fn scan_page(&self, request: ScanRequest) -> StoreResult<ScanPage> {
        let page = self.inner.scan_page(request).await?;
        if !page.has_more() {
            let pending = self.after_scan.lock().unwrap().take();
            if let Some(entry) = pending {
                self.inner.insert(entry).await;
            }
        }
        Ok(page)
    }

    async fn get_entry(&self, id: &EntryId) -> StoreResult<Option<DirectoryEntry>> {
        self.inner.get_entry(id).await
    }

    async fn put_entry(&self, entry: &DirectoryEntry) -> StoreResult<()> {
        self.inner.put_entry(entry).await
    }

    async fn create_entry(&self, entry: &DirectoryEntry) -> StoreResult<()> {
        self.inner.create_entry(entry).await
    }
}

/// Cancels `token` right after the first successful write.
pub struct CancelOnWriteStore {
    pub inner: Arc<InMemoryDirectoryStore>,
    pub token: CancellationToken,
}

#[async_trait]
impl DirectoryStore for CancelOnWriteStore {
    fn display_name(&self) -> &str {
        "cancel-on-write"
    }

    async fn scan_page(&self, request: ScanRequest) -> StoreResult<ScanPage> {
        self.inner.scan_page(request).await
    }

    async fn get_entry(&self, id: &EntryId) -> StoreResult<Option<DirectoryEntry>> {
        self.inner.get_entry(id).await
    }

    async fn put_entry(&self, entry: &DirectoryEntry) -> StoreResult<()> {
        self.inner.put_entry(entry).await?;
        self.token.cancel();
        Ok(())
    }

    async fn create_entry(&self, entry: &DirectoryEntry) -> StoreResult<()> {
        self.inner.create_entry(entry).await?;
        self.token.cancel();
        Ok(())
    }
}

/// Times out the first create after the record has already been stored.
///
/// With `rival_name` set, the stored record is someone else's under the
/// same id, as if another writer got there first.
pub struct LostCreateAckStore {
    pub inner: Arc<InMemoryDirectoryStore>,
    rival_name: Option<String>,
    timed_out: AtomicBool,
}

impl LostCreateAckStore {
    pub fn new(inner: Arc<InMemoryDirectoryStore>) -> Self {
        Self {
            inner,
            rival_name: None,
            timed_out: AtomicBool::new(false),
        }
    }

    pub fn with_rival(inner: Arc<InMemoryDirectoryStore>, rival_name: &str) -> Self {
        Self {
            rival_name: Some(rival_name.to_string()),
            ..Self::new(inner)
        }
    }
}

#[async_trait]
impl DirectoryStore for LostCreateAckStore {
    fn display_name(&self) -> &str {
        "lost-create-ack"
    }

    async fn scan_page(&self, request: ScanRequest) -> StoreResult<ScanPage> {
        self.inner.scan_page(request).await
    }

    async fn get_entry(&self, id: &EntryId) -> StoreResult<Option<DirectoryEntry>> {
        self.inner.get_entry(id).await
    }

    async fn put_entry(&self, entry: &DirectoryEntry) -> StoreResult<()> {
        self.inner.put_entry(entry).await
    }

    async fn create_entry(&self, entry: &DirectoryEntry) -> StoreResult<()> {
        if self.timed_out.swap(true, Ordering::SeqCst) {
            return self.inner.create_entry(entry).await;
        }
        let mut stored = entry.clone();
        if let Some(name) = &self.rival_name {
            stored.full_name = name.clone();
        }
        self.inner.insert(stored).await;
        Err(StoreError::Timeout { timeout_ms: 3000 })
    }
}
