//! Roster and directory models.
//!
//! A [`RosterRow`] is one person as reported by the HR export for a single
//! run. A [`DirectoryEntry`] is the persisted record. The roster owns the
//! descriptive fields (name, email, department, ...); everything inside
//! [`ProtectedFields`] belongs to the platform and is only ever set at
//! creation.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::ids::EntryId;
use crate::normalize::{normalize_email, normalize_external_id, non_blank};

/// Employment status as declared by the source system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Status code `A` / `ACTIVE`.
    Active,
    /// Any other non-empty status code.
    Terminated,
    /// No status code in the export.
    Unknown,
}

impl SourceStatus {
    /// Interpret a raw status code from the export.
    #[must_use]
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            None | Some("") => Self::Unknown,
            Some(c) if c.eq_ignore_ascii_case("a") || c.eq_ignore_ascii_case("active") => {
                Self::Active
            }
            Some(_) => Self::Terminated,
        }
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Terminated => write!(f, "terminated"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One entry from the external personnel snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    /// Stable identifier from the source system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Display name, usually "First Last".
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<String>,
    /// Raw source status marker (`A` for active).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    /// Supervisor display name ("First Last").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Termination date reported by the source, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_date: Option<String>,
    /// 1-based line in the upstream file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
}

impl RosterRow {
    /// Create a row with only a name set.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    #[must_use]
    pub fn with_office(mut self, office: impl Into<String>) -> Self {
        self.office = Some(office.into());
        self
    }

    #[must_use]
    pub fn with_hire_date(mut self, hire_date: impl Into<String>) -> Self {
        self.hire_date = Some(hire_date.into());
        self
    }

    #[must_use]
    pub fn with_status_code(mut self, status_code: impl Into<String>) -> Self {
        self.status_code = Some(status_code.into());
        self
    }

    #[must_use]
    pub fn with_supervisor(mut self, supervisor: impl Into<String>) -> Self {
        self.supervisor = Some(supervisor.into());
        self
    }

    /// Status as declared by the source system.
    #[must_use]
    pub fn source_status(&self) -> SourceStatus {
        SourceStatus::from_code(self.status_code.as_deref())
    }

    /// Trimmed external id, if any.
    #[must_use]
    pub fn external_key(&self) -> Option<String> {
        self.external_id.as_deref().and_then(normalize_external_id)
    }

    /// Lower-cased email, if any.
    #[must_use]
    pub fn email_key(&self) -> Option<String> {
        self.email.as_deref().and_then(normalize_email)
    }

    /// Whether the row carries the mandatory identity fields.
    #[must_use]
    pub fn has_name(&self) -> bool {
        !self.full_name.trim().is_empty()
    }

    /// Human-readable identifier used in reports and logs.
    #[must_use]
    pub fn label(&self) -> String {
        if let Some(id) = self.external_key() {
            return id;
        }
        if let Some(email) = self.email_key() {
            return email;
        }
        if self.has_name() {
            return self.full_name.trim().to_string();
        }
        match self.source_line {
            Some(line) => format!("line {line}"),
            None => "<unnamed row>".to_string(),
        }
    }
}

/// Fields the roster source does not own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtectedFields {
    /// Login password.
    pub credential_secret: String,
    #[serde(default)]
    pub reward_balance: Decimal,
    #[serde(default)]
    pub reward_budget: Decimal,
    #[serde(default)]
    pub is_reward_manager: bool,
    /// Free-form historical data (merchandise records, login history, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub history: BTreeMap<String, serde_json::Value>,
}

/// How roster fields are merged onto an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Let the source status deactivate or reactivate the entry.
    pub apply_source_status: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            apply_source_status: true,
        }
    }
}

/// The persisted directory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: EntryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub protected: ProtectedFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DirectoryEntry {
    /// Create an active entry with the given name and default protected fields.
    pub fn new(id: impl Into<EntryId>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external_id: None,
            full_name: full_name.into(),
            email: None,
            department: None,
            position: None,
            office: None,
            hire_date: None,
            supervisor: None,
            phone: None,
            active: true,
            termination_date: None,
            protected: ProtectedFields::default(),
            updated_at: None,
        }
    }

    /// Build a brand-new entry from a roster row.
    #[must_use]
    pub fn from_roster(
        id: EntryId,
        row: &RosterRow,
        protected: ProtectedFields,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            external_id: row.external_key(),
            full_name: row.full_name.trim().to_string(),
            email: row.email_key(),
            department: non_blank(row.department.as_deref()),
            position: non_blank(row.position.as_deref()),
            office: non_blank(row.office.as_deref()),
            hire_date: non_blank(row.hire_date.as_deref()),
            supervisor: non_blank(row.supervisor.as_deref()),
            phone: non_blank(row.phone.as_deref()),
            active: true,
            termination_date: None,
            protected,
            updated_at: Some(now),
        }
    }

    /// Merge roster-owned fields onto a copy of this entry.
    ///
    /// Protected fields are copied through untouched. Blank roster values
    /// never erase a populated directory value. Returns `None` when the merge
    /// would not change anything.
    #[must_use]
    pub fn merged_with(
        &self,
        row: &RosterRow,
        options: MergeOptions,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let mut merged = self.clone();

        if row.has_name() {
            merged.full_name = row.full_name.trim().to_string();
        }
        overwrite(&mut merged.external_id, row.external_key());
        overwrite(&mut merged.email, row.email_key());
        overwrite(&mut merged.department, non_blank(row.department.as_deref()));
        overwrite(&mut merged.position, non_blank(row.position.as_deref()));
        overwrite(&mut merged.office, non_blank(row.office.as_deref()));
        overwrite(&mut merged.hire_date, non_blank(row.hire_date.as_deref()));
        overwrite(&mut merged.supervisor, non_blank(row.supervisor.as_deref()));
        overwrite(&mut merged.phone, non_blank(row.phone.as_deref()));

        if options.apply_source_status {
            match row.source_status() {
                SourceStatus::Terminated if merged.active => {
                    merged.active = false;
                    merged.termination_date = Some(
                        row.termination_date
                            .as_deref()
                            .and_then(parse_source_date)
                            .unwrap_or(now),
                    );
                }
                SourceStatus::Active if !merged.active => {
                    merged.active = true;
                    merged.termination_date = None;
                }
                _ => {}
            }
        }

        merged.protected = self.protected.clone();

        if merged == *self {
            None
        } else {
            merged.updated_at = Some(now);
            Some(merged)
        }
    }

    /// Whether both entries carry the same roster-owned fields.
    #[must_use]
    pub fn same_roster_fields(&self, other: &Self) -> bool {
        self.id == other.id
            && self.external_id == other.external_id
            && self.full_name == other.full_name
            && self.email == other.email
            && self.department == other.department
            && self.position == other.position
            && self.office == other.office
            && self.hire_date == other.hire_date
            && self.supervisor == other.supervisor
            && self.phone == other.phone
    }

    /// Soft-terminate the entry. Returns `false` if it was already inactive.
    pub fn terminate(&mut self, at: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.termination_date = Some(at);
        self.updated_at = Some(at);
        true
    }
}

fn overwrite(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Parse a date as the HR export writes it (`2025-10-01`, `10/01/2025`,
/// or a full RFC 3339 timestamp).
#[must_use]
pub fn parse_source_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d", "%m/%d/%Y", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| {
            NaiveDate::parse_from_str(raw, fmt)
                .ok()
                .or_else(|| {
                    chrono::NaiveDateTime::parse_from_str(raw, fmt)
                        .ok()
                        .map(|dt| dt.date())
                })
        })
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
