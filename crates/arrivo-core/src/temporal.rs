//! # Temporal Types
//!
//! UTC-only timestamp type for the Arrivo stack. Travelers, destination
//! backends, and the devices running this code all sit in different time
//! zones; to keep audit events, submission timings, and expiry arithmetic
//! unambiguous, every timestamp in the system is UTC. Local-time display
//! is a presentation concern outside this workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A UTC timestamp with second-level precision in its canonical form.
///
/// Serializes to ISO 8601 with a `Z` suffix (e.g. `2026-03-01T09:30:00Z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wrap an existing `chrono::DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Access the underlying `chrono::DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// ISO 8601 string truncated to seconds, `Z` suffix.
    pub fn to_canonical_string(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Compact form used in filesystem names: `20260301T093000Z`.
    ///
    /// Colons are invalid in filenames on some host platforms, so the
    /// separator-free form is used for snapshot photo files.
    pub fn to_file_stamp(&self) -> String {
        self.0.format("%Y%m%dT%H%M%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}
