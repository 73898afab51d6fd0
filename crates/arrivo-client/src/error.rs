//! Submission failure taxonomy.
//!
//! Every way an attempt can end short of success, as callers need to see
//! it: validation failures are user-fixable and never retried; network and
//! timeout failures are safe to retry as a whole attempt; a challenge means
//! "switch transport"; protocol failures are backend misbehavior surfaced
//! as service-unavailable.

use arrivo_core::{DestinationId, UserId, ValidationError};

use crate::attempt::SubmissionAttempt;
use crate::protocol::ProtocolStep;

/// Terminal failure of a submission attempt.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Payload is missing backend-required fields. Detected before step 1
    /// fires; zero network steps were executed.
    #[error("payload validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No protocol configuration is registered for the destination.
    #[error("no protocol configuration registered for destination {0}")]
    UnconfiguredDestination(DestinationId),

    /// Connectivity or DNS failure at a step.
    #[error("network failure at {step}: {reason}")]
    Network { step: ProtocolStep, reason: String },

    /// A step exceeded its deadline. The step failed; the attempt is over.
    #[error("step {step} exceeded its deadline")]
    Timeout { step: ProtocolStep },

    /// The backend answered with an anti-automation challenge this
    /// transport cannot satisfy. The browser-automation transport can.
    #[error("anti-automation challenge at {step}; retry with the automated transport")]
    Challenge { step: ProtocolStep },

    /// Unexpected response shape or step-order violation.
    #[error("protocol violation at {step}: {reason}")]
    Protocol { step: ProtocolStep, reason: String },

    /// Another attempt for the same (user, destination) is already in
    /// flight. The second call started no protocol run.
    #[error("a submission attempt is already in flight for user {user_id} / destination {destination_id}")]
    Conflict {
        user_id: UserId,
        destination_id: DestinationId,
    },

    /// The caller cancelled the attempt. Observed at a step boundary; the
    /// named step was never started.
    #[error("attempt cancelled before {next_step}")]
    Cancelled { next_step: ProtocolStep },
}

impl SubmitError {
    /// Whether retrying the whole attempt (same transport) is reasonable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    /// Whether the caller should switch to the automated transport.
    pub fn wants_transport_switch(&self) -> bool {
        matches!(self, Self::Challenge { .. })
    }
}

/// A submission attempt that ended short of success.
///
/// Once the protocol run has started, the failure carries the terminal
/// [`SubmissionAttempt`] record (outcome `Failed` or `Cancelled`, with the
/// step timings accumulated so far) so callers can persist it. Failures
/// before step 1 — validation, an unconfigured destination, the
/// concurrent-attempt guard — never started a run and carry no record.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct SubmissionFailure {
    pub error: SubmitError,
    pub attempt: Option<SubmissionAttempt>,
}

impl SubmissionFailure {
    /// Failure before the protocol run started; no attempt record exists.
    pub fn before_start(error: SubmitError) -> Self {
        Self {
            error,
            attempt: None,
        }
    }
}

impl From<SubmitError> for SubmissionFailure {
    fn from(error: SubmitError) -> Self {
        Self::before_start(error)
    }
}

impl From<ValidationError> for SubmissionFailure {
    fn from(error: ValidationError) -> Self {
        Self::before_start(SubmitError::Validation(error))
    }
}
