//! # Entry Pack
//!
//! The durable aggregate binding one entry preparation record to its
//! submission history. Created on the first successful submission, updated
//! in place on every later one. History is append-only and idempotent per
//! attempt id: one entry per protocol execution, ordered by time.

use serde::{Deserialize, Serialize};

use arrivo_client::{SubmissionAttempt, SubmissionDocument};
use arrivo_core::{EntryInfoId, EntryPackId, Timestamp};

use crate::entry::EntryStatus;
use crate::error::PackError;

/// The durable record of one destination's submitted arrival card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPack {
    pub entry_pack_id: EntryPackId,
    pub entry_info_id: EntryInfoId,
    /// Document metadata of the latest successful submission.
    pub submission: SubmissionDocument,
    /// Every protocol execution that succeeded, in time order.
    pub submission_history: Vec<SubmissionAttempt>,
    /// Status mirrored for display surfaces; follows the entry's status.
    pub display_status: EntryStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl EntryPack {
    /// Create a pack from the first successful attempt.
    pub fn from_first_attempt(
        entry_info_id: EntryInfoId,
        attempt: SubmissionAttempt,
    ) -> Result<Self, PackError> {
        let document = successful_document(&attempt)?;
        let now = Timestamp::now();
        Ok(Self {
            entry_pack_id: EntryPackId::new(),
            entry_info_id,
            submission: document,
            submission_history: vec![attempt],
            display_status: EntryStatus::Submitted,
            created_at: now,
            updated_at: now,
        })
    }

    /// Append a later successful attempt.
    ///
    /// Idempotent per attempt id: re-recording an attempt already in the
    /// history is a no-op returning `Ok(false)`.
    pub fn record_attempt(&mut self, attempt: SubmissionAttempt) -> Result<bool, PackError> {
        if self
            .submission_history
            .iter()
            .any(|a| a.attempt_id == attempt.attempt_id)
        {
            tracing::debug!(
                pack = %self.entry_pack_id,
                attempt = %attempt.attempt_id,
                "attempt already recorded; ignoring"
            );
            return Ok(false);
        }
        let document = successful_document(&attempt)?;
        self.submission = document;
        self.submission_history.push(attempt);
        self.updated_at = Timestamp::now();
        Ok(true)
    }

    /// The attempt that produced the current submission.
    pub fn latest_attempt(&self) -> Option<&SubmissionAttempt> {
        self.submission_history.last()
    }
}

fn successful_document(attempt: &SubmissionAttempt) -> Result<SubmissionDocument, PackError> {
    if !attempt.is_success() {
        return Err(PackError::AttemptNotSuccessful(attempt.attempt_id));
    }
    attempt
        .document
        .clone()
        .ok_or(PackError::AttemptNotSuccessful(attempt.attempt_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrivo_client::{AttemptOutcome, TransportKind};
    use arrivo_core::{AttemptId, CardNumber, DestinationId, UserId};

    fn successful_attempt(card: &str) -> SubmissionAttempt {
        SubmissionAttempt {
            attempt_id: AttemptId::new(),
            user_id: UserId::new(),
            destination_id: DestinationId::new(),
            transport_used: TransportKind::Direct,
            started_at: Timestamp::now(),
            step_timings: vec![],
            outcome: AttemptOutcome::Success,
            document: Some(SubmissionDocument {
                arr_card_no: CardNumber::new(card).unwrap(),
                qr_location: format!("https://docs.example.gov/{card}.qr.png"),
                document_location: format!("https://docs.example.gov/{card}.pdf"),
                submitted_at: Timestamp::now(),
                transport_used: TransportKind::Direct,
            }),
        }
    }

    #[test]
    fn first_attempt_creates_the_pack_with_one_history_entry() {
        let pack = EntryPack::from_first_attempt(EntryInfoId::new(), successful_attempt("387778D"))
            .unwrap();
        assert_eq!(pack.submission_history.len(), 1);
        assert_eq!(pack.submission.arr_card_no.as_str(), "387778D");
        assert_eq!(pack.display_status, EntryStatus::Submitted);
    }

    #[test]
    fn recording_the_same_attempt_twice_is_a_no_op() {
        let attempt = successful_attempt("387778D");
        let mut pack =
            EntryPack::from_first_attempt(EntryInfoId::new(), attempt.clone()).unwrap();
        assert!(!pack.record_attempt(attempt).unwrap());
        assert_eq!(pack.submission_history.len(), 1);
    }

    #[test]
    fn resubmission_appends_and_replaces_the_current_document() {
        let mut pack =
            EntryPack::from_first_attempt(EntryInfoId::new(), successful_attempt("387778D"))
                .unwrap();
        assert!(pack.record_attempt(successful_attempt("552301A")).unwrap());
        assert_eq!(pack.submission_history.len(), 2);
        assert_eq!(pack.submission.arr_card_no.as_str(), "552301A");
    }

    #[test]
    fn failed_attempts_never_enter_the_history() {
        let mut failed = successful_attempt("387778D");
        failed.outcome = AttemptOutcome::Failed;
        failed.document = None;
        assert!(matches!(
            EntryPack::from_first_attempt(EntryInfoId::new(), failed.clone()),
            Err(PackError::AttemptNotSuccessful(_))
        ));

        let mut pack =
            EntryPack::from_first_attempt(EntryInfoId::new(), successful_attempt("387778D"))
                .unwrap();
        assert!(pack.record_attempt(failed).is_err());
        assert_eq!(pack.submission_history.len(), 1);
    }
}
