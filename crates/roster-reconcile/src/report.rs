//! Reconciliation report.
//!
//! [`ReportAccumulator`] is shared by every mutation task and is updated
//! concurrently. [`ReportAccumulator::finalize`] turns it into the
//! immutable [`ReconciliationResult`] handed back to the caller.

use chrono::{DateTime, Utc};
use roster_core::RunId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::types::{MutationKind, SkipReason};

/// A record whose mutation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    /// Entry id, or the row label for creates.
    pub identifier: String,
    pub kind: MutationKind,
    /// Stable code of the last store error.
    pub error_code: String,
    pub message: String,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub run_id: RunId,
    /// Run timestamp; also used as the termination date.
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
    pub created: u32,
    pub updated: u32,
    pub terminated: u32,
    pub unchanged: u32,
    pub skipped: u32,
    /// Skipped rows broken down by reason.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skipped_by_reason: BTreeMap<String, u32>,
    /// Rows that hit at least one ambiguous identity tier.
    pub ambiguous_matches: u32,
    /// Mutations never dispatched because the run was cancelled.
    #[serde(default)]
    pub not_dispatched: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RecordError>,
}

impl ReconciliationResult {
    /// Mutations that changed the directory (or would have, in a dry run).
    #[must_use]
    pub fn applied(&self) -> u32 {
        self.created + self.updated + self.terminated
    }

    /// Number of failed records.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Completed without cancellation and without record errors.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.errors.is_empty()
    }

    /// Wall-clock duration of the run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at - self.started_at
    }

    /// Count for a specific skip reason.
    #[must_use]
    pub fn skipped_for(&self, reason: SkipReason) -> u32 {
        self.skipped_by_reason
            .get(&reason.to_string())
            .copied()
            .unwrap_or(0)
    }
}

/// Thread-safe accumulator for a run in progress.
#[derive(Debug)]
pub struct ReportAccumulator {
    run_id: RunId,
    started_at: DateTime<Utc>,
    dry_run: bool,
    created: AtomicU32,
    updated: AtomicU32,
    terminated: AtomicU32,
    unchanged: AtomicU32,
    skipped: AtomicU32,
    ambiguous_matches: AtomicU32,
    not_dispatched: AtomicU32,
    cancelled: AtomicBool,
    skipped_by_reason: Mutex<HashMap<SkipReason, u32>>,
    errors: Mutex<Vec<RecordError>>,
}

impl ReportAccumulator {
    #[must_use]
    pub fn new(run_id: RunId, started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            run_id,
            started_at,
            dry_run,
            created: AtomicU32::new(0),
            updated: AtomicU32::new(0),
            terminated: AtomicU32::new(0),
            unchanged: AtomicU32::new(0),
            skipped: AtomicU32::new(0),
            ambiguous_matches: AtomicU32::new(0),
            not_dispatched: AtomicU32::new(0),
            cancelled: AtomicBool::new(false),
            skipped_by_reason: Mutex::new(HashMap::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Count a successful mutation of `kind`.
    pub fn record_applied(&self, kind: MutationKind) {
        let counter = match kind {
            MutationKind::Create => &self.created,
            MutationKind::Update => &self.updated,
            MutationKind::Terminate => &self.terminated,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Count a record that needed no write.
    pub fn record_unchanged(&self) {
        self.unchanged.fetch_add(1, Ordering::SeqCst);
    }

    /// Count a skipped row.
    pub fn record_skipped(&self, reason: SkipReason) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut map) = self.skipped_by_reason.lock() {
            *map.entry(reason).or_insert(0) += 1;
        }
    }

    /// Count rows that hit an ambiguous tier.
    pub fn record_ambiguous(&self, count: u32) {
        self.ambiguous_matches.fetch_add(count, Ordering::SeqCst);
    }

    /// Record a failed mutation.
    pub fn record_error(&self, error: RecordError) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(error);
        }
    }

    /// Mark the run cancelled, with `remaining` mutations left undone.
    pub fn record_cancelled(&self, remaining: u32) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.not_dispatched.fetch_add(remaining, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Produce the run result. Errors are ordered by identifier.
    #[must_use]
    pub fn finalize(&self) -> ReconciliationResult {
        let mut errors = self
            .errors
            .lock()
            .map(|errors| errors.clone())
            .unwrap_or_default();
        errors.sort_by(|a, b| (&a.identifier, a.kind).cmp(&(&b.identifier, b.kind)));

        let skipped_by_reason = self
            .skipped_by_reason
            .lock()
            .map(|map| {
                map.iter()
                    .map(|(reason, count)| (reason.to_string(), *count))
                    .collect()
            })
            .unwrap_or_default();

        ReconciliationResult {
            run_id: self.run_id,
            started_at: self.started_at,
            completed_at: Utc::now(),
            dry_run: self.dry_run,
            cancelled: self.cancelled.load(Ordering::SeqCst),
            created: self.created.load(Ordering::SeqCst),
            updated: self.updated.load(Ordering::SeqCst),
            terminated: self.terminated.load(Ordering::SeqCst),
            unchanged: self.unchanged.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            skipped_by_reason,
            ambiguous_matches: self.ambiguous_matches.load(Ordering::SeqCst),
            not_dispatched: self.not_dispatched.load(Ordering::SeqCst),
            errors,
        }
    }
}
