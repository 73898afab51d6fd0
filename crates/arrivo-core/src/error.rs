//! # Shared Error Hierarchy
//!
//! Structured error types used across the workspace, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests. Variants carry the
//! context an operator needs: which field failed validation, which status
//! edge was refused.

use thiserror::Error;

/// Payload and domain-primitive validation failures.
///
/// Validation errors are fatal to a submission attempt, never retried
/// automatically, and surfaced verbatim to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A field the destination backend requires is absent or blank.
    #[error("required field '{0}' is missing or empty")]
    MissingField(&'static str),

    /// An arrival-card number must be non-empty.
    #[error("arrival-card number is empty")]
    EmptyCardNumber,
}

/// A refused entry-status transition.
///
/// Returned whenever a lifecycle operation is attempted on an ineligible
/// source state. The records involved are left untouched — no partial
/// transition is ever persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid entry status transition: {from} -> {to}")]
pub struct StateTransitionError {
    /// Status at the time of the attempt.
    pub from: String,
    /// The status the caller tried to reach.
    pub to: String,
}

impl StateTransitionError {
    /// Build a transition error from anything `Display`able.
    pub fn new(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
