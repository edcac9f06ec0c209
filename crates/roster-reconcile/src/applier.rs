//! Mutation application.
//!
//! Each classified mutation is written on its own task, at most
//! `concurrency` at a time. Updates and terminates start from a fresh read
//! of the entry so fields written since the snapshot (credentials, reward
//! balances) survive. A failed record is reported and the run moves on.

use chrono::{DateTime, Utc};
use roster_core::{DirectoryEntry, EntryId, MergeOptions, RosterRow};
use roster_store::{DirectoryStore, RetryExecutor, StoreError, StoreResult};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::{Mutation, PlannedUpdate};
use crate::config::{CreateDefaults, ReconcileConfig};
use crate::report::{RecordError, ReportAccumulator};
use crate::types::MutationKind;

/// What a single mutation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Applied,
    Unchanged,
}

type MutationTask = Pin<Box<dyn Future<Output = StoreResult<Outcome>> + Send>>;

/// Picks ids for new entries.
///
/// The row's external id is used when no entry holds it yet; otherwise a
/// random UUID is generated.
#[derive(Debug, Default)]
pub struct IdAllocator {
    taken: HashSet<EntryId>,
}

impl IdAllocator {
    #[must_use]
    pub fn new(taken: HashSet<EntryId>) -> Self {
        Self { taken }
    }

    /// Reserve an id for `row`.
    pub fn allocate(&mut self, row: &RosterRow) -> EntryId {
        if let Some(external_id) = row.external_key() {
            let id = EntryId::new(external_id);
            if self.taken.insert(id.clone()) {
                return id;
            }
        }
        loop {
            let id = EntryId::generate();
            if self.taken.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// Applies mutations to the store and reports each outcome.
pub struct MutationApplier {
    store: Arc<dyn DirectoryStore>,
    retry: RetryExecutor,
    report: Arc<ReportAccumulator>,
    concurrency: usize,
    dry_run: bool,
    merge_options: MergeOptions,
    create_defaults: CreateDefaults,
    run_at: DateTime<Utc>,
}

impl MutationApplier {
    #[must_use]
    pub fn new(
        store: Arc<dyn DirectoryStore>,
        config: &ReconcileConfig,
        report: Arc<ReportAccumulator>,
    ) -> Self {
        Self {
            store,
            retry: RetryExecutor::new(config.retry_config()),
            run_at: report.started_at(),
            report,
            concurrency: config.concurrency.max(1),
            dry_run: config.dry_run,
            merge_options: config.merge_options(),
            create_defaults: config.create_defaults.clone(),
        }
    }

    /// Apply `mutations` in order until done or cancelled.
    ///
    /// Cancellation is checked before each dispatch. Mutations already
    /// dispatched run to completion; the rest are counted as not dispatched.
    pub async fn apply(
        &self,
        mutations: Vec<Mutation>,
        ids: &mut IdAllocator,
        cancel: &CancellationToken,
    ) {
        let total = mutations.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles: Vec<(String, MutationKind, JoinHandle<()>)> =
            Vec::with_capacity(total);
        let mut pending = mutations.into_iter();

        while let Some(mutation) = pending.next() {
            if cancel.is_cancelled() {
                self.stop(1 + pending.len());
                break;
            }

            if self.dry_run {
                self.record_planned(&mutation);
                continue;
            }

            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                self.stop(1 + pending.len());
                break;
            };

            let identifier = mutation.identifier();
            let kind = mutation.kind();
            let task = self.task_for(mutation, ids);
            let report = self.report.clone();
            let task_identifier = identifier.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                match task.await {
                    Ok(Outcome::Applied) => report.record_applied(kind),
                    Ok(Outcome::Unchanged) => report.record_unchanged(),
                    Err(e) => {
                        warn!(
                            record = %task_identifier,
                            kind = %kind,
                            error_code = e.error_code(),
                            error = %e,
                            "Mutation failed"
                        );
                        report.record_error(RecordError {
                            identifier: task_identifier,
                            kind,
                            error_code: e.error_code().to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            });
            handles.push((identifier, kind, handle));
        }

        for (identifier, kind, handle) in handles {
            if let Err(e) = handle.await {
                warn!(record = %identifier, kind = %kind, error = %e, "Mutation task aborted");
                self.report.record_error(RecordError {
                    identifier,
                    kind,
                    error_code: "TASK_FAILED".to_string(),
                    message: e.to_string(),
                });
            }
        }

        debug!(total, "Mutations settled");
    }

    fn stop(&self, remaining: usize) {
        let remaining = u32::try_from(remaining).unwrap_or(u32::MAX);
        info!(remaining, "Reconciliation cancelled, skipping remaining mutations");
        self.report.record_cancelled(remaining);
    }

    /// Count what a mutation would do without writing it.
    fn record_planned(&self, mutation: &Mutation) {
        match mutation {
            Mutation::Update(update) => {
                let changed = update
                    .entry
                    .merged_with(&update.row, self.merge_options, self.run_at)
                    .is_some();
                if changed {
                    self.report.record_applied(MutationKind::Update);
                } else {
                    self.report.record_unchanged();
                }
            }
            Mutation::Terminate(entry) if !entry.active => self.report.record_unchanged(),
            other => self.report.record_applied(other.kind()),
        }
    }

    fn task_for(&self, mutation: Mutation, ids: &mut IdAllocator) -> MutationTask {
        let store = self.store.clone();
        let retry = self.retry.clone();
        let run_at = self.run_at;
        match mutation {
            Mutation::Create(row) => {
                let id = ids.allocate(&row);
                let protected = self.create_defaults.protected_fields(&row);
                let entry = DirectoryEntry::from_roster(id, &row, protected, run_at);
                Box::pin(async move { create(store.as_ref(), &retry, entry).await })
            }
            Mutation::Update(update) => {
                let options = self.merge_options;
                Box::pin(async move {
                    update_entry(store.as_ref(), &retry, update, options, run_at).await
                })
            }
            Mutation::Terminate(entry) => Box::pin(async move {
                terminate(store.as_ref(), &retry, entry.id, run_at).await
            }),
        }
    }
}

async fn create(
    store: &dyn DirectoryStore,
    retry: &RetryExecutor,
    entry: DirectoryEntry,
) -> StoreResult<Outcome> {
    let mut attempts = 0u32;
    let outcome = retry
        .execute(|| {
            attempts += 1;
            create_once(store, &entry, attempts > 1)
        })
        .await?;
    debug!(id = %entry.id, "Created entry");
    Ok(outcome)
}

/// Conditionally create `entry`.
///
/// On a retry, an existing record carrying this entry's roster fields is
/// the write of an earlier attempt whose acknowledgement was lost.
async fn create_once(
    store: &dyn DirectoryStore,
    entry: &DirectoryEntry,
    retried: bool,
) -> StoreResult<Outcome> {
    match store.create_entry(entry).await {
        Ok(()) => Ok(Outcome::Applied),
        Err(StoreError::AlreadyExists { id }) if retried => {
            match store.get_entry(&id).await? {
                Some(stored) if stored.same_roster_fields(entry) => {
                    debug!(id = %id, "Create already applied by an earlier attempt");
                    Ok(Outcome::Applied)
                }
                _ => Err(StoreError::AlreadyExists { id }),
            }
        }
        Err(e) => Err(e),
    }
}

async fn update_entry(
    store: &dyn DirectoryStore,
    retry: &RetryExecutor,
    update: PlannedUpdate,
    options: MergeOptions,
    run_at: DateTime<Utc>,
) -> StoreResult<Outcome> {
    let id = &update.entry.id;
    let outcome = retry
        .execute(|| merge_once(store, id, &update.row, options, run_at))
        .await?;
    debug!(id = %id, tier = %update.tier, outcome = ?outcome, "Updated entry");
    Ok(outcome)
}

/// Re-read `id`, merge `row` into it and write it back if anything changed.
async fn merge_once(
    store: &dyn DirectoryStore,
    id: &EntryId,
    row: &RosterRow,
    options: MergeOptions,
    run_at: DateTime<Utc>,
) -> StoreResult<Outcome> {
    let fresh = store
        .get_entry(id)
        .await?
        .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
    match fresh.merged_with(row, options, run_at) {
        Some(merged) => {
            store.put_entry(&merged).await?;
            Ok(Outcome::Applied)
        }
        None => Ok(Outcome::Unchanged),
    }
}

async fn terminate(
    store: &dyn DirectoryStore,
    retry: &RetryExecutor,
    id: EntryId,
    run_at: DateTime<Utc>,
) -> StoreResult<Outcome> {
    let outcome = retry
        .execute(|| terminate_once(store, &id, run_at))
        .await?;
    debug!(id = %id, outcome = ?outcome, "Terminated entry");
    Ok(outcome)
}

async fn terminate_once(
    store: &dyn DirectoryStore,
    id: &EntryId,
    run_at: DateTime<Utc>,
) -> StoreResult<Outcome> {
    let mut fresh = store
        .get_entry(id)
        .await?
        .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
    if !fresh.terminate(run_at) {
        return Ok(Outcome::Unchanged);
    }
    store.put_entry(&fresh).await?;
    Ok(Outcome::Applied)
}
