//! # Roster Reconciliation
//!
//! Merges an HR roster snapshot into the employee directory.
//!
//! A run loads the whole directory, matches every roster row to at most one
//! entry (external id, then email, then normalized name), and applies three
//! kinds of mutation:
//!
//! - **Create** for rows with no match, with protected defaults filled in
//! - **Update** for matched rows, merged into a freshly read entry so
//!   credentials, reward balances and history are never overwritten
//! - **Terminate** for active entries no row matched (soft delete)
//!
//! Running the same roster twice leaves the directory unchanged the second
//! time.
//!
//! ## Crate Organization
//!
//! - [`config`] - Run configuration and create defaults
//! - [`resolver`] - Tiered identity matching
//! - [`classify`] - Create/update/terminate partitioning
//! - [`snapshot`] - Paginated directory loading
//! - [`applier`] - Bounded-concurrency mutation writer
//! - [`report`] - Run counters and per-record errors
//! - [`engine`] - The orchestrator
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use roster_core::RosterRow;
//! use roster_reconcile::RosterReconciler;
//! use roster_store::InMemoryDirectoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(InMemoryDirectoryStore::new());
//! let reconciler = RosterReconciler::new(store.clone());
//!
//! let rows = vec![RosterRow::new("Amedeo Citro").with_email("a@x.com")];
//! let result = reconciler.run(&rows).await.unwrap();
//!
//! assert_eq!(result.created, 1);
//! # }
//! ```

pub mod applier;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod resolver;
pub mod snapshot;
pub mod types;

pub use applier::{IdAllocator, MutationApplier};
pub use classify::{classify, Classification, Mutation, PlannedUpdate, SkippedRow};
pub use config::{generate_credential, CreateDefaults, ReconcileConfig};
pub use engine::RosterReconciler;
pub use error::{ConfigError, ReconcileError, ReconcileResult};
pub use report::{ReconciliationResult, RecordError, ReportAccumulator};
pub use resolver::{DirectoryIndex, IdentityMatch, Resolution};
pub use snapshot::{load_snapshot, DirectorySnapshot};
pub use types::{MatchTier, MutationKind, SkipReason};

pub use tokio_util::sync::CancellationToken;
