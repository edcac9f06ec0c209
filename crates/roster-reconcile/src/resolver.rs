//! Identity resolution.
//!
//! A roster row is matched to a directory entry through three key tiers:
//! external id, then email (case-insensitive), then normalized full name.
//! The first tier with exactly one candidate wins. A tier with several
//! candidates is ambiguous and falls through to the next one; a row with no
//! unique match at any tier is unmatched.

use roster_core::{
    normalize_email, normalize_external_id, normalize_name, DirectoryEntry, RosterRow,
};
use std::collections::HashMap;

use crate::types::MatchTier;

/// A unique match at one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityMatch {
    /// Position of the entry in the indexed snapshot.
    pub index: usize,
    /// Tier that produced the match.
    pub tier: MatchTier,
}

/// Outcome of resolving one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub matched: Option<IdentityMatch>,
    /// Tiers consulted before the match that had more than one candidate.
    pub ambiguous: Vec<MatchTier>,
}

impl Resolution {
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        !self.ambiguous.is_empty()
    }
}

/// Key of `row` at `tier`, normalized. `None` when the row has no usable key.
pub(crate) fn row_key(row: &RosterRow, tier: MatchTier) -> Option<String> {
    match tier {
        MatchTier::ExternalId => row.external_id.as_deref().and_then(normalize_external_id),
        MatchTier::Email => row.email.as_deref().and_then(normalize_email),
        MatchTier::Name => normalize_name(&row.full_name),
    }
}

fn entry_key(entry: &DirectoryEntry, tier: MatchTier) -> Option<String> {
    match tier {
        MatchTier::ExternalId => entry.external_id.as_deref().and_then(normalize_external_id),
        MatchTier::Email => entry.email.as_deref().and_then(normalize_email),
        MatchTier::Name => normalize_name(&entry.full_name),
    }
}

/// Read-only lookup index over a directory snapshot.
///
/// Built once per run and shared by every lookup.
#[derive(Debug)]
pub struct DirectoryIndex<'a> {
    entries: &'a [DirectoryEntry],
    keys: HashMap<MatchTier, HashMap<String, Vec<usize>>>,
    name_matching: bool,
}

impl<'a> DirectoryIndex<'a> {
    /// Index `entries` by every tier.
    #[must_use]
    pub fn build(entries: &'a [DirectoryEntry], name_matching: bool) -> Self {
        let mut keys: HashMap<MatchTier, HashMap<String, Vec<usize>>> = HashMap::new();
        for tier in MatchTier::ORDER {
            if tier == MatchTier::Name && !name_matching {
                continue;
            }
            let by_key = keys.entry(tier).or_default();
            for (index, entry) in entries.iter().enumerate() {
                if let Some(key) = entry_key(entry, tier) {
                    by_key.entry(key).or_default().push(index);
                }
            }
        }
        Self {
            entries,
            keys,
            name_matching,
        }
    }

    /// Tiers this index consults, highest priority first.
    pub fn tiers(&self) -> impl Iterator<Item = MatchTier> + '_ {
        MatchTier::ORDER
            .into_iter()
            .filter(move |tier| *tier != MatchTier::Name || self.name_matching)
    }

    /// Entries with `key` at `tier`.
    #[must_use]
    pub fn candidates(&self, tier: MatchTier, key: &str) -> &[usize] {
        self.keys
            .get(&tier)
            .and_then(|by_key| by_key.get(key))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Find the directory entry `row` refers to.
    #[must_use]
    pub fn resolve(&self, row: &RosterRow) -> Resolution {
        let mut resolution = Resolution::default();
        for tier in self.tiers() {
            let Some(key) = row_key(row, tier) else {
                continue;
            };
            match self.candidates(tier, &key) {
                [] => {}
                [index] => {
                    resolution.matched = Some(IdentityMatch {
                        index: *index,
                        tier,
                    });
                    return resolution;
                }
                _ => resolution.ambiguous.push(tier),
            }
        }
        resolution
    }

    /// Entry at `index`.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&'a DirectoryEntry> {
        self.entries.get(index)
    }

    /// The indexed snapshot.
    #[must_use]
    pub fn entries(&self) -> &'a [DirectoryEntry] {
        self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        id: &str,
        name: &str,
        email: Option<&str>,
        external_id: Option<&str>,
    ) -> DirectoryEntry {
        let mut entry = DirectoryEntry::new(id, name);
        entry.email = email.map(ToString::to_string);
        entry.external_id = external_id.map(ToString::to_string);
        entry
    }

    #[test]
    fn test_external_id_beats_email() {
        let entries = vec![
            entry("1", "Jane Wu", Some("jw@x.com"), None),
            entry("2", "Jane Wu", Some("other@x.com"), Some("E-2")),
        ];
        let index = DirectoryIndex::build(&entries, true);

        let row = RosterRow::new("Jane Wu")
            .with_external_id("E-2")
            .with_email("jw@x.com");
        let resolution = index.resolve(&row);

        assert_eq!(
            resolution.matched,
            Some(IdentityMatch {
                index: 1,
                tier: MatchTier::ExternalId
            })
        );
        assert!(!resolution.is_ambiguous());
    }

    #[test]
    fn test_email_match_is_case_insensitive() {
        let entries = vec![entry("1", "Jane Wu", Some("JW@X.com"), None)];
        let index = DirectoryIndex::build(&entries, true);

        let resolution = index.resolve(&RosterRow::new("Someone Else").with_email(" jw@x.COM "));

        assert_eq!(resolution.matched.map(|m| m.tier), Some(MatchTier::Email));
    }

    #[test]
    fn test_email_wins_over_ambiguous_name() {
        let entries = vec![
            entry("1", "Chris Lee", Some("chris.a@x.com"), None),
            entry("2", "Chris Lee", Some("chris.b@x.com"), None),
        ];
        let index = DirectoryIndex::build(&entries, true);

        let resolution = index.resolve(&RosterRow::new("Chris Lee").with_email("chris.b@x.com"));

        assert_eq!(resolution.matched.map(|m| m.index), Some(1));
        assert!(!resolution.is_ambiguous());
    }

    #[test]
    fn test_ambiguous_tier_falls_through() {
        let entries = vec![
            entry("1", "Ann Ray", Some("shared@x.com"), None),
            entry("2", "Bob Ray", Some("shared@x.com"), None),
        ];
        let index = DirectoryIndex::build(&entries, true);

        let resolution = index.resolve(&RosterRow::new("bob   RAY").with_email("shared@x.com"));

        assert_eq!(
            resolution.matched,
            Some(IdentityMatch {
                index: 1,
                tier: MatchTier::Name
            })
        );
        assert_eq!(resolution.ambiguous, vec![MatchTier::Email]);
    }

    #[test]
    fn test_all_tiers_ambiguous_is_unmatched() {
        let entries = vec![
            entry("1", "Ann Ray", Some("shared@x.com"), None),
            entry("2", "Ann Ray", Some("shared@x.com"), None),
        ];
        let index = DirectoryIndex::build(&entries, true);

        let resolution = index.resolve(&RosterRow::new("Ann Ray").with_email("shared@x.com"));

        assert!(resolution.matched.is_none());
        assert_eq!(resolution.ambiguous, vec![MatchTier::Email, MatchTier::Name]);
    }

    #[test]
    fn test_name_tier_can_be_disabled() {
        let entries = vec![entry("1", "Ann Ray", None, None)];
        let index = DirectoryIndex::build(&entries, false);

        assert!(index.resolve(&RosterRow::new("Ann Ray")).matched.is_none());
        assert_eq!(index.tiers().count(), 2);
    }

    #[test]
    fn test_blank_keys_are_not_consulted() {
        let entries = vec![entry("1", "Ann Ray", Some(""), Some("  "))];
        let index = DirectoryIndex::build(&entries, true);

        let row = RosterRow::new("Zed Zee").with_email("").with_external_id(" ");
        assert!(index.resolve(&row).matched.is_none());
    }
}
