//! Shared enums for classification and reporting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of directory mutation produced by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// New directory entry.
    Create,
    /// Merge roster fields into an existing entry.
    Update,
    /// Soft-terminate an entry missing from the roster.
    Terminate,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Terminate => write!(f, "terminate"),
        }
    }
}

impl std::str::FromStr for MutationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "terminate" => Ok(Self::Terminate),
            _ => Err(format!("Invalid mutation kind: {s}")),
        }
    }
}

/// Identity tier that produced a match, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    ExternalId,
    Email,
    Name,
}

impl MatchTier {
    /// All tiers, highest priority first.
    pub const ORDER: [MatchTier; 3] = [Self::ExternalId, Self::Email, Self::Name];
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExternalId => write!(f, "external_id"),
            Self::Email => write!(f, "email"),
            Self::Name => write!(f, "name"),
        }
    }
}

impl std::str::FromStr for MatchTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "external_id" => Ok(Self::ExternalId),
            "email" => Ok(Self::Email),
            "name" => Ok(Self::Name),
            _ => Err(format!("Invalid match tier: {s}")),
        }
    }
}

/// Why a roster row was left out of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Row has no usable full name.
    MalformedRow,
    /// Another row already claimed the same directory entry.
    DuplicateMatch,
    /// Another unmatched row already carries the same identity key.
    DuplicateRow,
    /// Unmatched row whose source status says the person has left.
    TerminatedInSource,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRow => write!(f, "malformed_row"),
            Self::DuplicateMatch => write!(f, "duplicate_match"),
            Self::DuplicateRow => write!(f, "duplicate_row"),
            Self::TerminatedInSource => write!(f, "terminated_in_source"),
        }
    }
}

impl std::str::FromStr for SkipReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "malformed_row" => Ok(Self::MalformedRow),
            "duplicate_match" => Ok(Self::DuplicateMatch),
            "duplicate_row" => Ok(Self::DuplicateRow),
            "terminated_in_source" => Ok(Self::TerminatedInSource),
            _ => Err(format!("Invalid skip reason: {s}")),
        }
    }
}
