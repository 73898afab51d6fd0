//! Submission attempt records and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use arrivo_core::{AttemptId, CardNumber, DestinationId, Timestamp, UserId};

use crate::protocol::ProtocolStep;
use crate::transport::TransportKind;

/// Terminal result of one protocol execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failed,
    Cancelled,
}

/// Wall-clock timing of one executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTiming {
    pub step: ProtocolStep,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
}

/// Document metadata issued on a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDocument {
    /// The arrival-card number, opaque beyond non-emptiness.
    pub arr_card_no: CardNumber,
    /// Where the QR image can be fetched from.
    pub qr_location: String,
    /// Where the issued document (PDF) can be fetched from.
    pub document_location: String,
    pub submitted_at: Timestamp,
    pub transport_used: TransportKind,
}

/// One execution of the submission protocol. Immutable once terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAttempt {
    pub attempt_id: AttemptId,
    pub user_id: UserId,
    pub destination_id: DestinationId,
    pub transport_used: TransportKind,
    pub started_at: Timestamp,
    /// Per-step wall-clock timings, in execution order.
    pub step_timings: Vec<StepTiming>,
    pub outcome: AttemptOutcome,
    /// Present only when `outcome == Success`.
    pub document: Option<SubmissionDocument>,
}

impl SubmissionAttempt {
    /// Whether this attempt ended in a confirmed, documented submission.
    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Success && self.document.is_some()
    }
}

/// Cooperative cancellation flag for an in-flight attempt.
///
/// The protocol client checks it between steps only; an in-flight step is
/// never interrupted, so no partial remote side effect is ever attributed
/// to the local record.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next step boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
