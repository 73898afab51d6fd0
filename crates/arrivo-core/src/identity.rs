//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the Arrivo stack.
//! Each identifier is a distinct type — you cannot pass an [`EntryInfoId`]
//! where an [`EntryPackId`] is expected.
//!
//! UUID-based identifiers are always valid by construction. [`CardNumber`]
//! is the one string-based identifier: the arrival-card number issued by
//! the destination backend is treated as an opaque token, and the only
//! validation performed is non-emptiness.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// A traveler account identifier.
    UserId
}

uuid_id! {
    /// A destination identifier. One destination corresponds to one
    /// government arrival-card backend and one protocol configuration.
    DestinationId
}

uuid_id! {
    /// Identifier for the mutable, ongoing preparation record of one
    /// (user, destination) pair.
    EntryInfoId
}

uuid_id! {
    /// Identifier for the durable entry-pack aggregate created on first
    /// successful submission.
    EntryPackId
}

uuid_id! {
    /// Identifier for an immutable entry-pack snapshot.
    SnapshotId
}

uuid_id! {
    /// Identifier for one execution of the submission protocol.
    AttemptId
}

/// The arrival-card number issued by the destination backend on a
/// successful submission.
///
/// The backend's numbering scheme is opaque to this stack; construction
/// only rejects empty (or whitespace-only) values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardNumber(String);

impl CardNumber {
    /// Create a card number, rejecting empty input.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyCardNumber);
        }
        Ok(Self(raw))
    }

    /// The card number as issued by the backend.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CardNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_distinct_per_construction() {
        assert_ne!(EntryPackId::new(), EntryPackId::new());
    }

    #[test]
    fn card_number_accepts_opaque_formats() {
        // The backend's format is not ours to validate.
        for raw in ["387778D", "x", "00-00/AA"] {
            assert!(CardNumber::new(raw).is_ok());
        }
    }

    #[test]
    fn card_number_rejects_empty_and_whitespace() {
        assert!(CardNumber::new("").is_err());
        assert!(CardNumber::new("   ").is_err());
    }

    #[test]
    fn ids_round_trip_through_serde() {
        let id = SnapshotId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: SnapshotId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
