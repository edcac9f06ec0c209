//! Reconciliation engine orchestrator.
//!
//! Main entry point: load the directory snapshot, classify the roster
//! against it, apply the mutations and return the run result.

use chrono::Utc;
use roster_core::{RosterRow, RunId};
use roster_store::{DirectoryStore, RetryExecutor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::applier::{IdAllocator, MutationApplier};
use crate::classify::{classify, Classification};
use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::report::{ReconciliationResult, ReportAccumulator};
use crate::snapshot::{load_snapshot, DirectorySnapshot};

/// Reconciles roster snapshots into a directory store.
pub struct RosterReconciler {
    store: Arc<dyn DirectoryStore>,
    config: ReconcileConfig,
}

impl RosterReconciler {
    /// Create a reconciler with default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self::with_config(store, ReconcileConfig::default())
    }

    /// Create a reconciler with custom configuration.
    #[must_use]
    pub fn with_config(store: Arc<dyn DirectoryStore>, config: ReconcileConfig) -> Self {
        Self { store, config }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Reconcile `rows` into the store.
    pub async fn run(&self, rows: &[RosterRow]) -> ReconcileResult<ReconciliationResult> {
        self.run_with_cancellation(rows, &CancellationToken::new()).await
    }

    /// Reconcile `rows` into the store, stopping early when `cancel` fires.
    ///
    /// Returns an error only when nothing was applied (invalid configuration
    /// or an unreadable snapshot). Per-record failures and cancellation are
    /// reported in the result.
    #[instrument(
        skip_all,
        fields(
            store = self.store.display_name(),
            rows = rows.len(),
            dry_run = self.config.dry_run
        )
    )]
    pub async fn run_with_cancellation(
        &self,
        rows: &[RosterRow],
        cancel: &CancellationToken,
    ) -> ReconcileResult<ReconciliationResult> {
        self.config.validate()?;

        let run_id = RunId::new();
        let started_at = Utc::now();
        info!(run_id = %run_id, "Starting roster reconciliation");

        let snapshot = self.load().await?;
        let classification = classify(rows, &snapshot.entries, self.config.name_matching);
        info!(
            run_id = %run_id,
            entries = snapshot.len(),
            creates = classification.creates.len(),
            updates = classification.updates.len(),
            terminates = classification.terminates.len(),
            skipped = classification.skipped.len(),
            "Roster classified"
        );

        let report = Arc::new(ReportAccumulator::new(run_id, started_at, self.config.dry_run));
        for skipped in &classification.skipped {
            report.record_skipped(skipped.reason);
        }
        let ambiguous = u32::try_from(classification.ambiguous_matches).unwrap_or(u32::MAX);
        report.record_ambiguous(ambiguous);

        let mut ids = IdAllocator::new(snapshot.ids());
        MutationApplier::new(self.store.clone(), &self.config, report.clone())
            .apply(classification.into_mutations(), &mut ids, cancel)
            .await;

        let result = report.finalize();
        info!(
            run_id = %run_id,
            created = result.created,
            updated = result.updated,
            terminated = result.terminated,
            unchanged = result.unchanged,
            skipped = result.skipped,
            errors = result.errors.len(),
            cancelled = result.cancelled,
            duration_ms = result.duration().num_milliseconds(),
            "Roster reconciliation finished"
        );
        Ok(result)
    }

    /// Load and classify without touching the store.
    pub async fn plan(&self, rows: &[RosterRow]) -> ReconcileResult<Classification> {
        self.config.validate()?;
        let snapshot = self.load().await?;
        Ok(classify(rows, &snapshot.entries, self.config.name_matching))
    }

    async fn load(&self) -> ReconcileResult<DirectorySnapshot> {
        let retry = RetryExecutor::new(self.config.retry_config());
        load_snapshot(self.store.as_ref(), self.config.scan_page_size, &retry)
            .await
            .map_err(|source| {
                error!(
                    error_code = source.error_code(),
                    error = %source,
                    "Directory snapshot could not be loaded, nothing applied"
                );
                ReconcileError::StoreRead { source }
            })
    }
}
