//! Roster Core Library
//!
//! Shared types for roster reconciliation.
//!
//! # Modules
//!
//! - [`ids`] - Entry and run identifiers
//! - [`model`] - `RosterRow`, `DirectoryEntry` and the protected field set
//! - [`normalize`] - Identity key normalization (email, name, external id)
//!
//! # Example
//!
//! ```
//! use roster_core::{DirectoryEntry, MergeOptions, RosterRow};
//!
//! let entry = DirectoryEntry::new("5", "Amedeo Citro");
//! let row = RosterRow::new("Amedeo Citro").with_department("Support");
//!
//! let merged = entry
//!     .merged_with(&row, MergeOptions::default(), chrono::Utc::now())
//!     .unwrap();
//! assert_eq!(merged.department.as_deref(), Some("Support"));
//! assert_eq!(merged.protected, entry.protected);
//! ```

pub mod ids;
pub mod model;
pub mod normalize;

pub use ids::{EntryId, RunId};
pub use model::{
    parse_source_date, DirectoryEntry, MergeOptions, ProtectedFields, RosterRow, SourceStatus,
};
pub use normalize::{join_name, non_blank, normalize_email, normalize_external_id, normalize_name};
