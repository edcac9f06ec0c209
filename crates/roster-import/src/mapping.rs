//! Header-to-field mapping for HR export records.
//!
//! HR exports change column names between vendors and revisions
//! (`Work Email` vs `Current Work Email`, `Job Title (PIT)` vs
//! `Position Description`). Each [`RosterField`] carries an ordered list of
//! accepted headers; the first non-blank value wins.

use roster_core::{join_name, non_blank, RosterRow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{MappingError, MappingResult};
use crate::validation::{normalize_header, parse_supervisor_name, validate_email};

/// A field of [`RosterRow`] that can be populated from a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterField {
    ExternalId,
    FirstName,
    LastName,
    FullName,
    Email,
    Department,
    Position,
    Office,
    HireDate,
    StatusCode,
    Supervisor,
    Phone,
    TerminationDate,
}

impl RosterField {
    /// Every mappable field.
    pub const ALL: [RosterField; 13] = [
        Self::ExternalId,
        Self::FirstName,
        Self::LastName,
        Self::FullName,
        Self::Email,
        Self::Department,
        Self::Position,
        Self::Office,
        Self::HireDate,
        Self::StatusCode,
        Self::Supervisor,
        Self::Phone,
        Self::TerminationDate,
    ];

    /// Built-in headers accepted for this field, highest priority first.
    #[must_use]
    pub fn default_aliases(self) -> &'static [&'static str] {
        match self {
            Self::ExternalId => &["employee id", "employee number", "employee_id", "id"],
            Self::FirstName => &["first name", "firstname", "given name"],
            Self::LastName => &["last name", "lastname", "surname"],
            Self::FullName => &["full name", "name"],
            Self::Email => &["work email", "email", "current work email"],
            Self::Department => &["department description", "department"],
            Self::Position => &[
                "position description",
                "job title (pit)",
                "job title",
                "position",
                "role",
            ],
            Self::Office => &["current work location name", "office location", "office"],
            Self::HireDate => &["hire date", "employment date"],
            Self::StatusCode => &["employee status code", "status code", "status"],
            Self::Supervisor => &["supervisor", "manager"],
            Self::Phone => &["phone", "phone number"],
            Self::TerminationDate => &["termination date"],
        }
    }
}

impl fmt::Display for RosterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExternalId => write!(f, "external_id"),
            Self::FirstName => write!(f, "first_name"),
            Self::LastName => write!(f, "last_name"),
            Self::FullName => write!(f, "full_name"),
            Self::Email => write!(f, "email"),
            Self::Department => write!(f, "department"),
            Self::Position => write!(f, "position"),
            Self::Office => write!(f, "office"),
            Self::HireDate => write!(f, "hire_date"),
            Self::StatusCode => write!(f, "status_code"),
            Self::Supervisor => write!(f, "supervisor"),
            Self::Phone => write!(f, "phone"),
            Self::TerminationDate => write!(f, "termination_date"),
        }
    }
}

impl FromStr for RosterField {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|field| field.to_string() == wanted)
            .ok_or_else(|| MappingError::UnknownField {
                name: s.to_string(),
                valid: Self::ALL
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Problem found while mapping a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowWarning {
    /// 1-based line in the source file (header is line 1).
    pub line: usize,
    /// Field the warning applies to.
    pub field: RosterField,
    /// Human-readable explanation.
    pub message: String,
}

/// Rows produced from a batch of records, plus anything dropped on the way.
#[derive(Debug, Clone, Default)]
pub struct MappedRoster {
    pub rows: Vec<RosterRow>,
    pub warnings: Vec<RowWarning>,
}

/// Column aliases for every [`RosterField`].
#[derive(Debug, Clone)]
pub struct FieldMapping {
    aliases: HashMap<RosterField, Vec<String>>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        let aliases = RosterField::ALL
            .into_iter()
            .map(|field| {
                let headers = field
                    .default_aliases()
                    .iter()
                    .map(|h| normalize_header(h))
                    .collect();
                (field, headers)
            })
            .collect();
        Self { aliases }
    }
}

impl FieldMapping {
    /// Mapping with only the built-in aliases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `header` for `field`, ahead of the built-in aliases.
    #[must_use]
    pub fn with_alias(mut self, field: RosterField, header: &str) -> Self {
        let header = normalize_header(header);
        let headers = self.aliases.entry(field).or_default();
        headers.retain(|h| *h != header);
        headers.insert(0, header);
        self
    }

    /// Build a mapping from `(source header, field name)` overrides.
    ///
    /// Field names are matched case-insensitively against [`RosterField`]'s
    /// display form (`work_email` is not a field, `email` is). When several
    /// headers target one field, the earlier override has priority.
    pub fn with_overrides<I, H, F>(overrides: I) -> MappingResult<Self>
    where
        I: IntoIterator<Item = (H, F)>,
        H: AsRef<str>,
        F: AsRef<str>,
    {
        let overrides: Vec<(H, RosterField)> = overrides
            .into_iter()
            .map(|(source, target)| Ok((source, target.as_ref().parse()?)))
            .collect::<MappingResult<_>>()?;

        let mut mapping = Self::default();
        for (source, field) in overrides.into_iter().rev() {
            let source = source.as_ref();
            if normalize_header(source).is_empty() {
                return Err(MappingError::EmptyHeader {
                    field: field.to_string(),
                });
            }
            mapping = mapping.with_alias(field, source);
        }
        Ok(mapping)
    }

    /// Headers accepted for `field`, normalized, highest priority first.
    #[must_use]
    pub fn aliases(&self, field: RosterField) -> &[String] {
        self.aliases
            .get(&field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Map one record (`header -> value`) to a roster row.
    ///
    /// Blank values are treated as absent. When several headers normalize to
    /// the same name (`Work Email`, `work_email`), the first non-blank one in
    /// byte order of the raw header wins. An email that fails validation is
    /// dropped with a warning rather than rejecting the row.
    pub fn map_record(
        &self,
        record: &HashMap<String, String>,
        line: usize,
    ) -> (RosterRow, Vec<RowWarning>) {
        let mut headers: Vec<(&String, &String)> = record
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();
        headers.sort_unstable();
        let mut columns: HashMap<String, &str> = HashMap::with_capacity(headers.len());
        for (header, value) in headers {
            columns
                .entry(normalize_header(header))
                .or_insert(value.as_str());
        }
        let get = |field: RosterField| -> Option<String> {
            self.aliases(field)
                .iter()
                .find_map(|header| non_blank(columns.get(header).copied()))
        };

        let mut warnings = Vec::new();

        let full_name = match (get(RosterField::FirstName), get(RosterField::LastName)) {
            (None, None) => get(RosterField::FullName).unwrap_or_default(),
            (first, last) => join_name(
                first.as_deref().unwrap_or_default(),
                last.as_deref().unwrap_or_default(),
            ),
        };
        if full_name.is_empty() {
            warnings.push(RowWarning {
                line,
                field: RosterField::FullName,
                message: "Row has no name".to_string(),
            });
        }

        let email = get(RosterField::Email).and_then(|email| match validate_email(&email) {
            Ok(()) => Some(email.to_lowercase()),
            Err(reason) => {
                debug!(line, email = %email, reason = %reason, "Dropping invalid email");
                warnings.push(RowWarning {
                    line,
                    field: RosterField::Email,
                    message: format!("Invalid email '{email}': {reason}"),
                });
                None
            }
        });

        let row = RosterRow {
            external_id: get(RosterField::ExternalId),
            full_name,
            email,
            department: get(RosterField::Department),
            position: get(RosterField::Position),
            office: get(RosterField::Office),
            hire_date: get(RosterField::HireDate),
            status_code: get(RosterField::StatusCode),
            supervisor: get(RosterField::Supervisor)
                .map(|raw| parse_supervisor_name(&raw))
                .filter(|s| !s.is_empty()),
            phone: get(RosterField::Phone),
            termination_date: get(RosterField::TerminationDate),
            source_line: Some(line),
        };

        (row, warnings)
    }

    /// Map a batch of records in file order.
    ///
    /// Records are numbered from line 2, the header being line 1.
    pub fn map_records<'a, I>(&self, records: I) -> MappedRoster
    where
        I: IntoIterator<Item = &'a HashMap<String, String>>,
    {
        let mut mapped = MappedRoster::default();
        for (index, record) in records.into_iter().enumerate() {
            let (row, warnings) = self.map_record(record, index + 2);
            mapped.rows.push(row);
            mapped.warnings.extend(warnings);
        }
        debug!(
            rows = mapped.rows.len(),
            warnings = mapped.warnings.len(),
            "Mapped roster records"
        );
        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::SourceStatus;

    fn record(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_maps_standard_export_columns() {
        let rec = record(&[
            ("Employee Id", "1001"),
            ("First Name", "Jane"),
            ("Last Name", "Wu"),
            ("Work Email", "JW@x.com"),
            ("Department Description", "Sales"),
            ("Position Description", "Rep"),
            ("Current Work Location Name", "Denver"),
            ("Hire Date", "2024-02-01"),
            ("Employee Status Code", "A"),
            ("Supervisor", "Daniel, Jason"),
        ]);

        let (row, warnings) = FieldMapping::new().map_record(&rec, 2);

        assert!(warnings.is_empty());
        assert_eq!(row.external_id.as_deref(), Some("1001"));
        assert_eq!(row.full_name, "Jane Wu");
        assert_eq!(row.email.as_deref(), Some("jw@x.com"));
        assert_eq!(row.department.as_deref(), Some("Sales"));
        assert_eq!(row.position.as_deref(), Some("Rep"));
        assert_eq!(row.office.as_deref(), Some("Denver"));
        assert_eq!(row.supervisor.as_deref(), Some("Jason Daniel"));
        assert_eq!(row.source_status(), SourceStatus::Active);
        assert_eq!(row.source_line, Some(2));
    }

    #[test]
    fn test_alias_fallback_skips_blank_values() {
        let rec = record(&[
            ("Name", "Pat Doe"),
            ("Position Description", "  "),
            ("Job Title (PIT)", "Installer"),
        ]);

        let (row, _) = FieldMapping::new().map_record(&rec, 3);

        assert_eq!(row.full_name, "Pat Doe");
        assert_eq!(row.position.as_deref(), Some("Installer"));
    }

    #[test]
    fn test_headers_match_case_and_separator_insensitively() {
        let rec = record(&[("EMPLOYEE_ID", "7"), ("full-name", "A B"), ("work_email", "a@b.co")]);

        let (row, _) = FieldMapping::new().map_record(&rec, 2);

        assert_eq!(row.external_id.as_deref(), Some("7"));
        assert_eq!(row.full_name, "A B");
        assert_eq!(row.email.as_deref(), Some("a@b.co"));
    }

    #[test]
    fn test_invalid_email_is_dropped_with_warning() {
        let rec = record(&[("Name", "Sam Lee"), ("Email", "not-an-email")]);

        let (row, warnings) = FieldMapping::new().map_record(&rec, 9);

        assert!(row.email.is_none());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 9);
        assert_eq!(warnings[0].field, RosterField::Email);
    }

    #[test]
    fn test_missing_name_warns() {
        let rec = record(&[("Employee Id", "55")]);

        let (row, warnings) = FieldMapping::new().map_record(&rec, 4);

        assert!(!row.has_name());
        assert_eq!(warnings[0].field, RosterField::FullName);
    }

    #[test]
    fn test_custom_alias_takes_priority() {
        let rec = record(&[("Email", "home@x.com"), ("Corporate Mail", "work@x.com")]);

        let mapping = FieldMapping::new().with_alias(RosterField::Email, "Corporate Mail");
        let (row, _) = mapping.map_record(&rec, 2);

        assert_eq!(row.email.as_deref(), Some("work@x.com"));
        assert_eq!(mapping.aliases(RosterField::Email)[0], "corporate mail");
    }

    #[test]
    fn test_overrides_reject_unknown_field() {
        let err = FieldMapping::with_overrides([("Badge", "badge_number")]).unwrap_err();

        assert!(matches!(err, MappingError::UnknownField { .. }));
    }

    #[test]
    fn test_overrides_apply_case_insensitively() {
        let mapping = FieldMapping::with_overrides([("Badge", "EXTERNAL_ID")]).unwrap();

        let (row, _) = mapping.map_record(&record(&[("badge", "B-9"), ("Name", "X Y")]), 2);

        assert_eq!(row.external_id.as_deref(), Some("B-9"));
    }

    #[test]
    fn test_work_email_outranks_personal_email() {
        let rec = record(&[
            ("Name", "Ann Ray"),
            ("Email", "ann.home@mail.com"),
            ("Work Email", "ann.ray@corp.com"),
            ("Rehire Date", "03/01/2024"),
            ("Employment Type Description", "Full Time"),
        ]);

        let (row, warnings) = FieldMapping::new().map_record(&rec, 2);

        assert!(warnings.is_empty());
        assert_eq!(row.email.as_deref(), Some("ann.ray@corp.com"));
        assert_eq!(row.full_name, "Ann Ray");
    }

    #[test]
    fn test_earlier_override_has_priority() {
        let overrides = [("Login", "email"), ("Contact", "email")];
        let mapping = FieldMapping::with_overrides(overrides).unwrap();
        let rec = record(&[("Name", "X Y"), ("Login", "l@x.com"), ("Contact", "c@x.com")]);

        let (row, _) = mapping.map_record(&rec, 2);

        assert_eq!(mapping.aliases(RosterField::Email)[..2], ["login", "contact"]);
        assert_eq!(row.email.as_deref(), Some("l@x.com"));
    }

    #[test]
    fn test_colliding_headers_resolve_deterministically() {
        let rec = record(&[
            ("Name", "X Y"),
            ("work_email", "second@x.com"),
            ("Work Email", "first@x.com"),
            ("WORK-EMAIL", "  "),
        ]);

        for _ in 0..16 {
            let (row, _) = FieldMapping::new().map_record(&rec, 2);
            assert_eq!(row.email.as_deref(), Some("first@x.com"));
        }
    }

    #[test]
    fn test_map_records_numbers_lines_after_header() {
        let records = vec![
            record(&[("Name", "One"), ("Email", "bad")]),
            record(&[("Name", "Two")]),
        ];

        let mapped = FieldMapping::new().map_records(&records);

        assert_eq!(mapped.rows.len(), 2);
        assert_eq!(mapped.rows[1].source_line, Some(3));
        assert_eq!(mapped.warnings.len(), 1);
        assert_eq!(mapped.warnings[0].line, 2);
    }

    #[test]
    fn test_field_display_round_trips_through_from_str() {
        for field in RosterField::ALL {
            assert_eq!(field.to_string().parse::<RosterField>().unwrap(), field);
        }
    }
}
