//! # arrivo-client — Submission protocol client
//!
//! Executes the ordered multi-step arrival-card submission protocol against
//! a destination government backend, over one of two interchangeable
//! transports:
//!
//! - [`transport::DirectTransport`] — plain HTTPS calls at the backend.
//! - [`transport::AutomatedTransport`] — the same step envelopes replayed
//!   through a local browser-automation bridge, for runtimes where direct
//!   calls are blocked or the backend raises anti-automation challenges.
//!
//! [`selector::TransportSelector`] probes the network once per process and
//! picks between them; [`SubmissionProtocolClient`] never branches on the
//! transport kind itself.
//!
//! ## Protocol shape
//!
//! Every destination runs the same nine-step sequence (token init → item
//! selection → draft registration → health-declaration check → advance →
//! preview → submit → confirm → document fetch), but the request bodies and
//! response shapes are destination configuration, resolved once at startup
//! through [`protocol::DestinationRegistry`]. See [`protocol`] for the step
//! machinery.
//!
//! ## Attempt semantics
//!
//! One [`SubmissionProtocolClient::submit`] call is one attempt. The
//! session/action token acquired in step 1 lives and dies with the attempt;
//! steps are never retried inside an attempt; cancellation is checked at
//! step boundaries only; and at most one attempt per `(user, destination)`
//! may be in flight at a time.

pub mod attempt;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod selector;
pub mod transport;

pub use attempt::{AttemptOutcome, CancellationToken, StepTiming, SubmissionAttempt, SubmissionDocument};
pub use client::SubmissionProtocolClient;
pub use config::ClientConfig;
pub use error::{SubmissionFailure, SubmitError};
pub use protocol::{DestinationProtocolConfig, DestinationRegistry, ProtocolStep};
pub use selector::{TransportChoice, TransportSelector};
pub use transport::{AutomatedTransport, DirectTransport, Transport, TransportKind};
