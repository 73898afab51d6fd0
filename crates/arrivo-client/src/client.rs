//! The submission protocol client.
//!
//! Runs the nine-step protocol for one payload over whichever transport the
//! caller hands in. One `submit()` call is one attempt: the action token is
//! acquired fresh in step 1 and dies with the attempt, no step is retried,
//! and the cancellation flag is honored at step boundaries only.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use arrivo_core::{AttemptId, CardNumber, DestinationId, Timestamp, TravelerPayload, UserId};

use crate::attempt::{
    AttemptOutcome, CancellationToken, StepTiming, SubmissionAttempt, SubmissionDocument,
};
use crate::config::ClientConfig;
use crate::error::{SubmissionFailure, SubmitError};
use crate::protocol::{DestinationRegistry, ProtocolContext, ProtocolStep};
use crate::transport::{Transport, TransportError, TransportKind};

/// Executes submission attempts. Constructed once at process start and
/// shared by reference; holds the per-(user, destination) in-flight guard.
pub struct SubmissionProtocolClient {
    config: ClientConfig,
    registry: DestinationRegistry,
    in_flight: Arc<Mutex<HashSet<(UserId, DestinationId)>>>,
}

/// Releases the in-flight slot on every exit path.
struct InFlightGuard {
    slots: Arc<Mutex<HashSet<(UserId, DestinationId)>>>,
    key: (UserId, DestinationId),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.slots.lock().remove(&self.key);
    }
}

impl SubmissionProtocolClient {
    pub fn new(config: ClientConfig, registry: DestinationRegistry) -> Self {
        Self {
            config,
            registry,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute one submission attempt.
    ///
    /// Order of gates: payload validation (no network on failure), protocol
    /// resolution, the concurrent-attempt guard, then the step sequence.
    /// A step failure or a cancellation aborts the attempt; the returned
    /// [`SubmissionFailure`] carries the terminal attempt record with the
    /// step timings accumulated up to that point. The caller may retry the
    /// whole attempt, optionally on the other transport.
    pub async fn submit(
        &self,
        payload: &TravelerPayload,
        transport: Arc<dyn Transport>,
        cancel: &CancellationToken,
    ) -> Result<SubmissionAttempt, SubmissionFailure> {
        payload.validate()?;
        let protocol = self.registry.resolve(payload.destination_id)?;
        let _guard = self.claim_slot(payload.user_id, payload.destination_id)?;

        let attempt_id = AttemptId::new();
        let started_at = Timestamp::now();
        let transport_kind = transport.kind();
        tracing::info!(
            attempt = %attempt_id,
            destination = %payload.destination_id,
            transport = %transport_kind,
            "starting submission attempt"
        );

        // Terminal record for an attempt ending short of success. Timings
        // are handed in because the step loop is still appending to them.
        let terminal = |outcome: AttemptOutcome,
                        error: SubmitError,
                        step_timings: Vec<StepTiming>| {
            SubmissionFailure {
                error,
                attempt: Some(SubmissionAttempt {
                    attempt_id,
                    user_id: payload.user_id,
                    destination_id: payload.destination_id,
                    transport_used: transport_kind,
                    started_at,
                    step_timings,
                    outcome,
                    document: None,
                }),
            }
        };

        let mut ctx = ProtocolContext::new(payload);
        let mut timings = Vec::with_capacity(protocol.steps().len());

        for spec in protocol.steps() {
            if cancel.is_cancelled() {
                tracing::info!(attempt = %attempt_id, next_step = %spec.step, "attempt cancelled");
                return Err(terminal(
                    AttemptOutcome::Cancelled,
                    SubmitError::Cancelled { next_step: spec.step },
                    timings,
                ));
            }

            let request = match (spec.build)(&ctx) {
                Ok(request) => request,
                Err(e) => return Err(terminal(AttemptOutcome::Failed, e, timings)),
            };
            let step_started = Timestamp::now();
            let response = match transport.execute(&request, self.config.step_timeout()).await {
                Ok(response) => response,
                Err(e) => {
                    return Err(terminal(
                        AttemptOutcome::Failed,
                        step_error(spec.step, e),
                        timings,
                    ))
                }
            };
            if let Err(e) = (spec.apply)(&mut ctx, &response) {
                return Err(terminal(AttemptOutcome::Failed, e, timings));
            }

            timings.push(StepTiming {
                step: spec.step,
                started_at: step_started,
                finished_at: Timestamp::now(),
            });
            tracing::debug!(attempt = %attempt_id, step = %spec.step, "protocol step completed");
        }

        let document = match assemble_document(&ctx, transport_kind) {
            Ok(document) => document,
            Err(e) => return Err(terminal(AttemptOutcome::Failed, e, timings)),
        };
        tracing::info!(
            attempt = %attempt_id,
            arr_card_no = %document.arr_card_no,
            "submission attempt succeeded"
        );

        Ok(SubmissionAttempt {
            attempt_id,
            user_id: payload.user_id,
            destination_id: payload.destination_id,
            transport_used: transport_kind,
            started_at,
            step_timings: timings,
            outcome: AttemptOutcome::Success,
            document: Some(document),
        })
    }

    fn claim_slot(
        &self,
        user_id: UserId,
        destination_id: DestinationId,
    ) -> Result<InFlightGuard, SubmitError> {
        let key = (user_id, destination_id);
        let mut slots = self.in_flight.lock();
        if !slots.insert(key) {
            return Err(SubmitError::Conflict {
                user_id,
                destination_id,
            });
        }
        Ok(InFlightGuard {
            slots: Arc::clone(&self.in_flight),
            key,
        })
    }
}

fn step_error(step: ProtocolStep, err: TransportError) -> SubmitError {
    match err {
        TransportError::Network(reason) => SubmitError::Network { step, reason },
        TransportError::Timeout => SubmitError::Timeout { step },
        TransportError::Challenge => SubmitError::Challenge { step },
    }
}

fn assemble_document(
    ctx: &ProtocolContext<'_>,
    transport_used: TransportKind,
) -> Result<SubmissionDocument, SubmitError> {
    let missing = |what: &str| SubmitError::Protocol {
        step: ProtocolStep::FetchDocument,
        reason: format!("attempt finished without {what}"),
    };
    let arr_card_no = CardNumber::new(ctx.arr_card_no.clone().ok_or_else(|| missing("a card number"))?)
        .map_err(|_| missing("a non-empty card number"))?;
    Ok(SubmissionDocument {
        arr_card_no,
        qr_location: ctx.qr_location.clone().ok_or_else(|| missing("a QR location"))?,
        document_location: ctx
            .document_location
            .clone()
            .ok_or_else(|| missing("a document location"))?,
        submitted_at: Timestamp::now(),
        transport_used,
    })
}
