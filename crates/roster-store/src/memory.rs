//! In-memory directory store.
//!
//! Backs tests and dry runs. Entries are kept ordered by id so scans are
//! deterministic. Faults can be injected per entry (writes) or per scan page
//! to exercise retry and abort paths.

use async_trait::async_trait;
use roster_core::{DirectoryEntry, EntryId};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::paging::{ScanPage, ScanRequest};
use crate::traits::DirectoryStore;

const CURSOR_PREFIX: &str = "after:";

/// Kind of failure to inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFault {
    /// Transient throughput error.
    Throttled,
    /// Transient unavailability.
    Unavailable,
    /// Permanent failure.
    Internal,
}

impl InjectedFault {
    fn to_error(self, context: &str) -> StoreError {
        match self {
            Self::Throttled => StoreError::throttled(format!("injected throttle on {context}")),
            Self::Unavailable => {
                StoreError::unavailable(format!("injected outage on {context}"))
            }
            Self::Internal => StoreError::internal(format!("injected failure on {context}")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ScanFault {
    after_pages: usize,
    remaining: u32,
    kind: InjectedFault,
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<EntryId, DirectoryEntry>,
    write_faults: HashMap<EntryId, (u32, InjectedFault)>,
    scan_fault: Option<ScanFault>,
    pages_served: usize,
}

/// Directory store held entirely in memory.
#[derive(Debug)]
pub struct InMemoryDirectoryStore {
    name: String,
    state: RwLock<MemoryState>,
    write_latency: Duration,
    scans: AtomicUsize,
    gets: AtomicUsize,
    puts: AtomicUsize,
    creates: AtomicUsize,
    in_flight_writes: AtomicUsize,
    max_in_flight_writes: AtomicUsize,
}

impl InMemoryDirectoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            name: "in-memory".to_string(),
            state: RwLock::new(MemoryState::default()),
            write_latency: Duration::ZERO,
            scans: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            in_flight_writes: AtomicUsize::new(0),
            max_in_flight_writes: AtomicUsize::new(0),
        }
    }

    /// Create a store pre-populated with entries.
    pub fn with_entries(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
        Self {
            state: RwLock::new(MemoryState {
                entries,
                ..MemoryState::default()
            }),
            ..Self::new()
        }
    }

    /// Delay every write by `latency` (lets concurrent writers overlap).
    #[must_use]
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = latency;
        self
    }

    /// Make the next `times` writes to `id` fail with `fault`.
    pub async fn fail_writes(&self, id: impl Into<EntryId>, times: u32, fault: InjectedFault) {
        let mut state = self.state.write().await;
        state.write_faults.insert(id.into(), (times, fault));
    }

    /// Make `times` scan requests fail once `after_pages` pages have been served.
    pub async fn fail_scans(&self, after_pages: usize, times: u32, fault: InjectedFault) {
        let mut state = self.state.write().await;
        state.scan_fault = Some(ScanFault {
            after_pages,
            remaining: times,
            kind: fault,
        });
    }

    /// Insert or replace an entry directly, bypassing fault injection.
    pub async fn insert(&self, entry: DirectoryEntry) {
        let mut state = self.state.write().await;
        state.entries.insert(entry.id.clone(), entry);
    }

    /// Read an entry directly, bypassing counters.
    pub async fn entry(&self, id: &str) -> Option<DirectoryEntry> {
        let state = self.state.read().await;
        state.entries.get(&EntryId::from(id)).cloned()
    }

    /// All entries ordered by id.
    pub async fn entries(&self) -> Vec<DirectoryEntry> {
        let state = self.state.read().await;
        state.entries.values().cloned().collect()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of `scan_page` calls served (including failed ones).
    pub fn scan_calls(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// Number of `get_entry` calls served.
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `put_entry` calls (including failed ones).
    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of `create_entry` calls (including failed ones).
    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Total write attempts of either kind.
    pub fn write_calls(&self) -> usize {
        self.put_calls() + self.create_calls()
    }

    /// Highest number of writes observed in flight at once.
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_in_flight_writes.load(Ordering::SeqCst)
    }

    async fn write(&self, entry: &DirectoryEntry, if_absent: bool) -> StoreResult<()> {
        let in_flight = self.in_flight_writes.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_writes.fetch_max(in_flight, Ordering::SeqCst);

        if !self.write_latency.is_zero() {
            tokio::time::sleep(self.write_latency).await;
        }

        let result = {
            let mut state = self.state.write().await;
            if let Some(fault) = take_write_fault(&mut state, &entry.id) {
                Err(fault.to_error(entry.id.as_str()))
            } else if if_absent && state.entries.contains_key(&entry.id) {
                Err(StoreError::AlreadyExists {
                    id: entry.id.clone(),
                })
            } else {
                state.entries.insert(entry.id.clone(), entry.clone());
                Ok(())
            }
        };

        self.in_flight_writes.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn take_write_fault(state: &mut MemoryState, id: &EntryId) -> Option<InjectedFault> {
    let (remaining, kind) = state.write_faults.get_mut(id)?;
    if *remaining == 0 {
        return None;
    }
    *remaining -= 1;
    Some(*kind)
}

impl Default for InMemoryDirectoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    fn display_name(&self) -> &str {
        &self.name
    }

    async fn scan_page(&self, request: ScanRequest) -> StoreResult<ScanPage> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;

        let served = state.pages_served;
        if let Some(fault) = state.scan_fault.as_mut() {
            if served >= fault.after_pages && fault.remaining > 0 {
                fault.remaining -= 1;
                let kind = fault.kind;
                return Err(kind.to_error("scan"));
            }
        }

        let lower = match request.cursor.as_deref() {
            None => Bound::Unbounded,
            Some(cursor) => match cursor.strip_prefix(CURSOR_PREFIX) {
                Some(id) => Bound::Excluded(EntryId::from(id)),
                None => {
                    return Err(StoreError::InvalidCursor {
                        cursor: cursor.to_string(),
                    })
                }
            },
        };

        let page_size = request.page_size.max(1) as usize;
        let mut range = state.entries.range((lower, Bound::Unbounded));
        let entries: Vec<DirectoryEntry> = range
            .by_ref()
            .take(page_size)
            .map(|(_, entry)| entry.clone())
            .collect();
        let has_more = range.next().is_some();

        let next_cursor = if has_more {
            entries
                .last()
                .map(|entry| format!("{CURSOR_PREFIX}{}", entry.id))
        } else {
            None
        };

        state.pages_served += 1;
        debug!(
            entries = entries.len(),
            has_more = next_cursor.is_some(),
            "Served scan page"
        );

        Ok(ScanPage {
            entries,
            next_cursor,
        })
    }

    async fn get_entry(&self, id: &EntryId) -> StoreResult<Option<DirectoryEntry>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        Ok(state.entries.get(id).cloned())
    }

    async fn put_entry(&self, entry: &DirectoryEntry) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.write(entry, false).await
    }

    async fn create_entry(&self, entry: &DirectoryEntry) -> StoreResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.write(entry, true).await
    }
}
