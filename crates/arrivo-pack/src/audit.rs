//! # Audit Log
//!
//! Append-only record of lifecycle events. Events are written by the
//! lifecycle manager and the snapshot service and never mutated afterward;
//! the log exposes no update or removal API. Display/analytics surfaces
//! consume it elsewhere.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use arrivo_core::{EntryPackId, SnapshotId, Timestamp};

/// The type of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A record (pack or snapshot) came into existence.
    Created,
    /// A snapshot was loaded for viewing.
    Viewed,
    /// An entry status transition committed.
    StatusChanged,
    /// A snapshot was deleted as a unit.
    Deleted,
    /// A pack was handed to the external export tooling.
    Exported,
}

impl AuditEventType {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Viewed => "viewed",
            Self::StatusChanged => "status_changed",
            Self::Deleted => "deleted",
            Self::Exported => "exported",
        }
    }
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an audit event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum AuditSubject {
    Pack(EntryPackId),
    Snapshot(SnapshotId),
}

/// A single audit log event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub subject: AuditSubject,
    /// Structured context: old/new status, snapshot reason, warnings.
    pub metadata: Option<serde_json::Value>,
    pub timestamp: Timestamp,
}

impl AuditEvent {
    /// New event stamped with the current UTC time.
    pub fn new(
        event_type: AuditEventType,
        subject: AuditSubject,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            subject,
            metadata,
            timestamp: Timestamp::now(),
        }
    }
}

/// The append-only audit trail.
#[derive(Debug, Default)]
pub struct AuditLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event. There is deliberately no way to edit or remove
    /// events once written.
    pub fn append(&self, event: AuditEvent) {
        tracing::debug!(event_type = %event.event_type, subject = ?event.subject, "audit event");
        self.events.write().push(event);
    }

    /// All events, in insertion order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }

    /// Events about one subject, in insertion order.
    pub fn events_for(&self, subject: AuditSubject) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.subject == subject)
            .cloned()
            .collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}
