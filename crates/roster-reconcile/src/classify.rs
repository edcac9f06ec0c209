//! Diff/classification of a roster against a directory snapshot.
//!
//! Every named roster row ends up in exactly one of creates, updates or
//! skipped; every active entry no row claims ends up in terminates. The
//! result does not depend on the order the store returned entries in.

use roster_core::{DirectoryEntry, RosterRow, SourceStatus};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::resolver::{row_key, DirectoryIndex};
use crate::types::{MatchTier, MutationKind, SkipReason};

/// A row matched to an existing entry.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedUpdate {
    pub row: RosterRow,
    /// Entry as seen in the snapshot. Writers re-read before merging.
    pub entry: DirectoryEntry,
    pub tier: MatchTier,
}

/// A row left out of classification.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub row: RosterRow,
    pub reason: SkipReason,
    pub detail: String,
}

/// One directory mutation to apply.
#[derive(Debug, Clone)]
pub enum Mutation {
    Create(RosterRow),
    Update(PlannedUpdate),
    Terminate(DirectoryEntry),
}

impl Mutation {
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Create(_) => MutationKind::Create,
            Self::Update(_) => MutationKind::Update,
            Self::Terminate(_) => MutationKind::Terminate,
        }
    }

    /// Identifier used in logs and error reports.
    #[must_use]
    pub fn identifier(&self) -> String {
        match self {
            Self::Create(row) => row.label(),
            Self::Update(update) => update.entry.id.to_string(),
            Self::Terminate(entry) => entry.id.to_string(),
        }
    }
}

/// Disjoint operation sets for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classification {
    /// Unmatched rows, in roster order.
    pub creates: Vec<RosterRow>,
    /// Matched rows, ordered by entry id.
    pub updates: Vec<PlannedUpdate>,
    /// Active entries no row claimed, ordered by id.
    pub terminates: Vec<DirectoryEntry>,
    /// Rows left out, in roster order.
    pub skipped: Vec<SkippedRow>,
    /// Rows for which at least one tier had several candidates.
    pub ambiguous_matches: usize,
}

impl Classification {
    /// Number of mutations to apply.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.creates.len() + self.updates.len() + self.terminates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operation_count() == 0
    }

    /// Skipped rows counted per reason.
    #[must_use]
    pub fn skipped_by_reason(&self) -> HashMap<SkipReason, usize> {
        let mut counts = HashMap::new();
        for skipped in &self.skipped {
            *counts.entry(skipped.reason).or_insert(0) += 1;
        }
        counts
    }

    /// Flatten into mutations: updates, then terminates, then creates.
    #[must_use]
    pub fn into_mutations(self) -> Vec<Mutation> {
        let mut mutations = Vec::with_capacity(self.operation_count());
        mutations.extend(self.updates.into_iter().map(Mutation::Update));
        mutations.extend(self.terminates.into_iter().map(Mutation::Terminate));
        mutations.extend(self.creates.into_iter().map(Mutation::Create));
        mutations
    }
}

/// Identity keys of the rows accepted for creation so far.
#[derive(Debug, Default)]
struct NewRowKeys {
    rows: Vec<Vec<(MatchTier, String)>>,
    by_key: HashMap<(MatchTier, String), Vec<usize>>,
}

impl NewRowKeys {
    /// Tier on which `keys` collides with an accepted row.
    ///
    /// A collision counts only on the highest-priority tier both rows carry,
    /// so two people sharing a name but not an email stay distinct.
    fn duplicate_tier(&self, keys: &[(MatchTier, String)]) -> Option<MatchTier> {
        keys.iter().find_map(|(tier, key)| {
            let candidates = self.by_key.get(&(*tier, key.clone()))?;
            candidates
                .iter()
                .any(|&accepted| {
                    let higher_shared = self.rows[accepted].iter().any(|(other, _)| {
                        other < tier && keys.iter().any(|(mine, _)| mine == other)
                    });
                    !higher_shared
                })
                .then_some(*tier)
        })
    }

    fn insert(&mut self, keys: Vec<(MatchTier, String)>) {
        let position = self.rows.len();
        for key in &keys {
            self.by_key.entry(key.clone()).or_default().push(position);
        }
        self.rows.push(keys);
    }
}

/// Partition `rows` and `snapshot` into creates, updates, terminates and
/// skipped rows.
///
/// When several rows resolve to the same entry, the row matched through the
/// higher-priority tier keeps it (the earlier row on a tie) and the others
/// are skipped. Two unmatched rows are the same person when they agree on
/// the highest-priority key both carry; only the first of them is created.
/// Unmatched rows whose source status is terminated are skipped.
#[must_use]
pub fn classify(
    rows: &[RosterRow],
    snapshot: &[DirectoryEntry],
    name_matching: bool,
) -> Classification {
    let index = DirectoryIndex::build(snapshot, name_matching);
    let mut classification = Classification::default();

    // entry index -> (tier, row position) of the row currently holding it
    let mut claims: HashMap<usize, (MatchTier, usize)> = HashMap::new();
    let mut skipped: Vec<(usize, SkippedRow)> = Vec::new();
    let mut new_rows = NewRowKeys::default();

    for (position, row) in rows.iter().enumerate() {
        if !row.has_name() {
            skipped.push((
                position,
                SkippedRow {
                    row: row.clone(),
                    reason: SkipReason::MalformedRow,
                    detail: "row has no full name".to_string(),
                },
            ));
            continue;
        }

        let resolution = index.resolve(row);
        if resolution.is_ambiguous() {
            classification.ambiguous_matches += 1;
            debug!(
                row = %row.label(),
                tiers = ?resolution.ambiguous,
                "Ambiguous identity tier skipped"
            );
        }

        if let Some(matched) = resolution.matched {
            let contender = (matched.tier, position);
            let loser = match claims.get(&matched.index).copied() {
                None => {
                    claims.insert(matched.index, contender);
                    None
                }
                Some(holder) if holder <= contender => Some(position),
                Some(holder) => {
                    claims.insert(matched.index, contender);
                    Some(holder.1)
                }
            };
            if let Some(loser) = loser {
                let entry_id = index
                    .entry(matched.index)
                    .map(|e| e.id.to_string())
                    .unwrap_or_default();
                skipped.push((
                    loser,
                    SkippedRow {
                        row: rows[loser].clone(),
                        reason: SkipReason::DuplicateMatch,
                        detail: format!("entry {entry_id} is already matched by another row"),
                    },
                ));
            }
            continue;
        }

        if row.source_status() == SourceStatus::Terminated {
            skipped.push((
                position,
                SkippedRow {
                    row: row.clone(),
                    reason: SkipReason::TerminatedInSource,
                    detail: format!(
                        "status code {} marks the person as terminated",
                        row.status_code.as_deref().unwrap_or_default()
                    ),
                },
            ));
            continue;
        }

        let keys: Vec<(MatchTier, String)> = index
            .tiers()
            .filter_map(|tier| row_key(row, tier).map(|key| (tier, key)))
            .collect();
        if let Some(tier) = new_rows.duplicate_tier(&keys) {
            skipped.push((
                position,
                SkippedRow {
                    row: row.clone(),
                    reason: SkipReason::DuplicateRow,
                    detail: format!("another new row has the same {tier}"),
                },
            ));
            continue;
        }
        new_rows.insert(keys);
        classification.creates.push(row.clone());
    }

    let mut updates: Vec<PlannedUpdate> = claims
        .iter()
        .filter_map(|(&entry_index, &(tier, position))| {
            index.entry(entry_index).map(|entry| PlannedUpdate {
                row: rows[position].clone(),
                entry: entry.clone(),
                tier,
            })
        })
        .collect();
    updates.sort_by(|a, b| a.entry.id.cmp(&b.entry.id));
    classification.updates = updates;

    let mut terminates: Vec<DirectoryEntry> = index
        .entries()
        .iter()
        .enumerate()
        .filter(|(entry_index, entry)| entry.active && !claims.contains_key(entry_index))
        .map(|(_, entry)| entry.clone())
        .collect();
    terminates.sort_by(|a, b| a.id.cmp(&b.id));
    classification.terminates = terminates;

    skipped.sort_by_key(|(position, _)| *position);
    classification.skipped = skipped.into_iter().map(|(_, s)| s).collect();

    debug!(
        creates = classification.creates.len(),
        updates = classification.updates.len(),
        terminates = classification.terminates.len(),
        skipped = classification.skipped.len(),
        ambiguous = classification.ambiguous_matches,
        "Classified roster"
    );

    classification
}
