//! # Roster Import
//!
//! Turns header-keyed HR export records into [`RosterRow`](roster_core::RosterRow)s
//! for reconciliation.
//!
//! Byte-level parsing (CSV dialects, spreadsheets) happens upstream; this
//! crate receives one `header -> value` map per record and resolves the
//! vendor's column names through a [`FieldMapping`].
//!
//! ```
//! use std::collections::HashMap;
//! use roster_import::FieldMapping;
//!
//! let record: HashMap<String, String> = [
//!     ("Employee Id".to_string(), "1001".to_string()),
//!     ("First Name".to_string(), "Jane".to_string()),
//!     ("Last Name".to_string(), "Wu".to_string()),
//! ]
//! .into();
//!
//! let mapped = FieldMapping::new().map_records([&record]);
//! assert_eq!(mapped.rows[0].full_name, "Jane Wu");
//! ```

pub mod error;
pub mod mapping;
pub mod validation;

pub use error::{MappingError, MappingResult};
pub use mapping::{FieldMapping, MappedRoster, RosterField, RowWarning};
pub use validation::{normalize_header, parse_supervisor_name, validate_email};
