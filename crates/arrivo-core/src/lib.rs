//! # arrivo-core — Domain primitives for the Arrivo stack
//!
//! Shared foundation consumed by every other crate in the workspace:
//!
//! - **Identity newtypes** ([`identity`]) — distinct types for every
//!   identifier in the system; you cannot pass an [`EntryPackId`] where a
//!   [`SnapshotId`] is expected.
//! - **Temporal** ([`temporal`]) — UTC-only [`Timestamp`] with a canonical
//!   second-precision string form.
//! - **Payload** ([`payload`]) — the [`TravelerPayload`] value object the
//!   submission protocol ships to the destination backend, plus the fixed
//!   [`DataCategory`] ordering that drives deterministic diffing.
//! - **Errors** ([`error`]) — `thiserror` hierarchy shared across crates.

pub mod error;
pub mod identity;
pub mod payload;
pub mod temporal;

pub use error::{StateTransitionError, ValidationError};
pub use identity::{
    AttemptId, CardNumber, DestinationId, EntryInfoId, EntryPackId, SnapshotId, UserId,
};
pub use payload::{CompletionMetrics, DataCategory, PayloadField, TravelerPayload};
pub use temporal::Timestamp;
