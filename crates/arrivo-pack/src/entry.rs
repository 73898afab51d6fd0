//! # Entry Preparation Record & Status Rules
//!
//! [`EntryInfo`] is the mutable, ongoing preparation record for one
//! (user, destination) pair. Form edits and lifecycle transitions mutate
//! it; nothing deletes it except explicit user action outside this core.
//!
//! ## Status graph
//!
//! ```text
//! Incomplete ──(all required categories filled)──▶ Ready
//! Ready ──(successful submission)──▶ Submitted
//! Submitted ──(confirmed data drift)──▶ Superseded
//! Submitted ──(arrival date + grace elapsed)──▶ Expired
//! Superseded ──(resubmission)──▶ Submitted
//! Superseded | Expired ──(user action)──▶ Archived
//! Archived ──(explicit user restart)──▶ Incomplete
//! ```
//!
//! Every other edge is refused with a [`StateTransitionError`]; a refused
//! transition changes nothing.

use serde::{Deserialize, Serialize};

use arrivo_core::{
    CompletionMetrics, DestinationId, EntryInfoId, StateTransitionError, Timestamp, UserId,
};

/// The lifecycle status of an entry preparation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Required categories not yet all filled.
    Incomplete,
    /// Submission-ready; every required category is complete.
    Ready,
    /// A successful submission is on record and still current.
    Submitted,
    /// Traveler data drifted after submission and the user confirmed the
    /// submitted card no longer matches.
    Superseded,
    /// Arrival date plus the grace period has elapsed.
    Expired,
    /// Shelved. Only an explicit user restart leaves this state.
    Archived,
}

impl EntryStatus {
    /// Whether the edge `self -> to` is on the status graph.
    pub fn can_transition(&self, to: EntryStatus) -> bool {
        use EntryStatus::*;
        matches!(
            (self, to),
            (Incomplete, Ready)
                | (Ready, Submitted)
                | (Submitted, Superseded)
                | (Submitted, Expired)
                | (Superseded, Submitted)
                | (Superseded, Archived)
                | (Expired, Archived)
                | (Archived, Incomplete)
        )
    }

    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::Ready => "ready",
            Self::Submitted => "submitted",
            Self::Superseded => "superseded",
            Self::Expired => "expired",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to one fund-proof photo held by the external profile store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundPhotoRef {
    /// Stable item id, used in snapshot photo file names.
    pub item_id: String,
    /// Source path of the live photo file.
    pub path: String,
}

/// The mutable preparation record for one (user, destination) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    pub entry_info_id: EntryInfoId,
    pub user_id: UserId,
    pub destination_id: DestinationId,
    pub status: EntryStatus,
    /// Per-category filled/required counts from the external calculator.
    pub completion_metrics: CompletionMetrics,
    /// Declared arrival date; drives the expiry sweep.
    pub arrival_date: Option<Timestamp>,
    /// Fund-photo references snapshotted alongside the textual data.
    pub fund_photos: Vec<FundPhotoRef>,
    pub last_updated_at: Timestamp,
}

impl EntryInfo {
    /// Fresh record in `Incomplete` status.
    pub fn new(user_id: UserId, destination_id: DestinationId) -> Self {
        Self {
            entry_info_id: EntryInfoId::new(),
            user_id,
            destination_id,
            status: EntryStatus::Incomplete,
            completion_metrics: CompletionMetrics { categories: vec![] },
            arrival_date: None,
            fund_photos: Vec::new(),
            last_updated_at: Timestamp::now(),
        }
    }

    /// Apply a status transition, refusing off-graph edges.
    pub fn transition(&mut self, to: EntryStatus) -> Result<(), StateTransitionError> {
        if !self.status.can_transition(to) {
            return Err(StateTransitionError::new(self.status, to));
        }
        tracing::debug!(entry = %self.entry_info_id, from = %self.status, to = %to, "entry status transition");
        self.status = to;
        self.last_updated_at = Timestamp::now();
        Ok(())
    }
}
