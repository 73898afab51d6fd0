//! # Entry Pack Lifecycle Manager
//!
//! Drives entry records and packs through the status graph. Every mutation
//! here follows the same shape: serialize on the entry, validate the
//! transition against the current stored state, take any required snapshot
//! BEFORE the status flips, persist, write the audit event, then notify
//! subscribers. A refused transition returns the error with every record
//! untouched.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use arrivo_client::SubmissionAttempt;
use arrivo_core::{CompletionMetrics, EntryInfoId, EntryPackId, StateTransitionError, Timestamp};
use arrivo_pack::{
    AuditEvent, AuditEventType, AuditLog, AuditSubject, EntryInfo, EntryInfoStore, EntryPack,
    EntryPackStore, EntryStatus, PackError, SnapshotReason, SnapshotService,
};

use crate::events::{StatusChange, StatusEvents};

/// Orchestrates entry status transitions, pack creation, snapshots, audit
/// events, and subscriber notification.
///
/// Mutations for the same entry are serialized through a per-entry lock;
/// mutations for different entries proceed concurrently.
pub struct EntryPackLifecycleManager {
    entries: Arc<dyn EntryInfoStore>,
    packs: Arc<dyn EntryPackStore>,
    snapshots: Arc<SnapshotService>,
    audit: Arc<AuditLog>,
    events: Arc<StatusEvents>,
    locks: Mutex<HashMap<EntryInfoId, Arc<Mutex<()>>>>,
}

impl EntryPackLifecycleManager {
    pub fn new(
        entries: Arc<dyn EntryInfoStore>,
        packs: Arc<dyn EntryPackStore>,
        snapshots: Arc<SnapshotService>,
        audit: Arc<AuditLog>,
        events: Arc<StatusEvents>,
    ) -> Self {
        Self {
            entries,
            packs,
            snapshots,
            audit,
            events,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Record fresh completion metrics and, if every required category is
    /// now filled and the entry is still `incomplete`, move it to `ready`.
    ///
    /// Returns `true` when the status changed. Metrics are persisted either
    /// way; a metrics update alone is not a transition.
    pub fn mark_ready(
        &self,
        entry_info_id: EntryInfoId,
        metrics: CompletionMetrics,
    ) -> Result<bool, PackError> {
        let lock = self.entry_lock(entry_info_id);
        let _guard = lock.lock();

        let mut entry = self.load_entry(entry_info_id)?;
        let promote = metrics.is_complete() && entry.status == EntryStatus::Incomplete;
        entry.completion_metrics = metrics;
        entry.last_updated_at = Timestamp::now();
        if !promote {
            self.entries.upsert(entry);
            return Ok(false);
        }

        let from = entry.status;
        entry.transition(EntryStatus::Ready)?;
        self.entries.upsert(entry.clone());
        // Audit events attach to a pack or snapshot id, and neither exists
        // before the first submission; this transition is observable
        // through the event bus only.
        self.events.emit(&StatusChange {
            entry_info_id,
            entry_pack_id: None,
            from,
            to: entry.status,
            at: entry.last_updated_at,
        });
        Ok(true)
    }

    /// Record a successful protocol attempt against an entry.
    ///
    /// First success creates the pack; a success after a supersession
    /// appends to the existing pack and returns the entry to `submitted`.
    /// Idempotent per attempt id: replaying an attempt already in the
    /// history returns the stored pack without writing anything, except
    /// that a replay finding the entry still `ready` completes the
    /// interrupted commit (snapshot, transition, audit, notification).
    pub fn create_or_update_pack(
        &self,
        entry_info_id: EntryInfoId,
        attempt: SubmissionAttempt,
    ) -> Result<EntryPack, PackError> {
        let lock = self.entry_lock(entry_info_id);
        let _guard = lock.lock();

        let mut entry = self.load_entry(entry_info_id)?;

        // Build the updated pack in memory first. The snapshot is the only
        // fallible write in the commit; taking it before any store upsert
        // means a snapshot failure returns with entry and pack untouched.
        let (pack, created) = match self.packs.find_by_entry(entry_info_id) {
            Some(mut pack) => {
                if pack
                    .submission_history
                    .iter()
                    .any(|a| a.attempt_id == attempt.attempt_id)
                {
                    // Replay. An entry still `ready` alongside a recorded
                    // attempt is an interrupted first commit; finish it.
                    // Any other state means the entry has moved on.
                    if entry.status != EntryStatus::Ready {
                        return Ok(pack);
                    }
                    pack.display_status = EntryStatus::Submitted;
                    (pack, false)
                } else {
                    if !entry.status.can_transition(EntryStatus::Submitted) {
                        return Err(StateTransitionError::new(
                            entry.status,
                            EntryStatus::Submitted,
                        )
                        .into());
                    }
                    pack.record_attempt(attempt.clone())?;
                    pack.display_status = EntryStatus::Submitted;
                    (pack, false)
                }
            }
            None => {
                if !entry.status.can_transition(EntryStatus::Submitted) {
                    return Err(StateTransitionError::new(
                        entry.status,
                        EntryStatus::Submitted,
                    )
                    .into());
                }
                let pack = EntryPack::from_first_attempt(entry_info_id, attempt.clone())?;
                (pack, true)
            }
        };

        self.snapshots
            .create_snapshot_of(&pack, SnapshotReason::Submission)?;

        self.packs.upsert(pack.clone());
        if created {
            self.audit.append(AuditEvent::new(
                AuditEventType::Created,
                AuditSubject::Pack(pack.entry_pack_id),
                Some(serde_json::json!({
                    "entryInfoId": entry_info_id.to_string(),
                    "arrCardNo": pack.submission.arr_card_no.as_str(),
                })),
            ));
        }

        let from = entry.status;
        entry.transition(EntryStatus::Submitted)?;
        self.entries.upsert(entry.clone());
        self.commit_transition(&entry, pack.entry_pack_id, from, None);
        tracing::info!(
            entry = %entry_info_id,
            pack = %pack.entry_pack_id,
            attempt = %attempt.attempt_id,
            card = %pack.submission.arr_card_no,
            "submission recorded"
        );
        Ok(pack)
    }

    /// Shelve the current submission after confirmed data drift.
    ///
    /// The snapshot freezes the data that was current while the pack was
    /// live, so it is taken before the status flips.
    pub fn mark_superseded(&self, entry_pack_id: EntryPackId) -> Result<(), PackError> {
        self.shelve(entry_pack_id, EntryStatus::Superseded, SnapshotReason::Superseded, None)
    }

    /// Move a `submitted` pack to `expired`. Called by the expiry sweep
    /// once the arrival date plus the grace period has elapsed.
    pub fn expire(&self, entry_pack_id: EntryPackId) -> Result<(), PackError> {
        self.shelve(entry_pack_id, EntryStatus::Expired, SnapshotReason::Archival, None)
    }

    /// Archive a `superseded` or `expired` pack, recording why.
    pub fn archive(&self, entry_pack_id: EntryPackId, reason: &str) -> Result<(), PackError> {
        self.shelve(
            entry_pack_id,
            EntryStatus::Archived,
            SnapshotReason::Archival,
            Some(reason),
        )
    }

    /// Explicit user restart: an `archived` entry returns to `incomplete`
    /// and a fresh preparation cycle begins. The pack and its history stay
    /// on record.
    pub fn restart(&self, entry_info_id: EntryInfoId) -> Result<(), PackError> {
        let lock = self.entry_lock(entry_info_id);
        let _guard = lock.lock();

        let mut entry = self.load_entry(entry_info_id)?;
        let from = entry.status;
        entry.transition(EntryStatus::Incomplete)?;
        self.entries.upsert(entry.clone());

        let pack_id = match self.packs.find_by_entry(entry_info_id) {
            Some(mut pack) => {
                pack.display_status = EntryStatus::Incomplete;
                pack.updated_at = Timestamp::now();
                let id = pack.entry_pack_id;
                self.packs.upsert(pack);
                Some(id)
            }
            None => None,
        };
        if let Some(pack_id) = pack_id {
            self.append_status_audit(pack_id, from, entry.status, None);
        }
        self.events.emit(&StatusChange {
            entry_info_id,
            entry_pack_id: pack_id,
            from,
            to: entry.status,
            at: entry.last_updated_at,
        });
        Ok(())
    }

    /// Record that a pack was handed to the external export tooling.
    pub fn record_exported(
        &self,
        entry_pack_id: EntryPackId,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), PackError> {
        if self.packs.get(entry_pack_id).is_none() {
            return Err(PackError::PackNotFound(entry_pack_id));
        }
        self.audit.append(AuditEvent::new(
            AuditEventType::Exported,
            AuditSubject::Pack(entry_pack_id),
            metadata,
        ));
        Ok(())
    }

    // Shared path for supersede/expire/archive: snapshot first, then flip.
    fn shelve(
        &self,
        entry_pack_id: EntryPackId,
        to: EntryStatus,
        reason: SnapshotReason,
        note: Option<&str>,
    ) -> Result<(), PackError> {
        let pack = self
            .packs
            .get(entry_pack_id)
            .ok_or(PackError::PackNotFound(entry_pack_id))?;
        let lock = self.entry_lock(pack.entry_info_id);
        let _guard = lock.lock();

        let mut entry = self.load_entry(pack.entry_info_id)?;
        if !entry.status.can_transition(to) {
            return Err(StateTransitionError::new(entry.status, to).into());
        }

        self.snapshots.create_snapshot(entry_pack_id, reason)?;

        let from = entry.status;
        entry.transition(to)?;
        self.entries.upsert(entry.clone());

        let mut pack = pack;
        pack.display_status = to;
        pack.updated_at = Timestamp::now();
        self.packs.upsert(pack);

        self.commit_transition(&entry, entry_pack_id, from, note);
        Ok(())
    }

    // Audit first, then notify. Subscribers observing a transition can
    // always find its audit event already on record.
    fn commit_transition(
        &self,
        entry: &EntryInfo,
        pack_id: EntryPackId,
        from: EntryStatus,
        note: Option<&str>,
    ) {
        self.append_status_audit(pack_id, from, entry.status, note);
        self.events.emit(&StatusChange {
            entry_info_id: entry.entry_info_id,
            entry_pack_id: Some(pack_id),
            from,
            to: entry.status,
            at: entry.last_updated_at,
        });
    }

    fn append_status_audit(
        &self,
        pack_id: EntryPackId,
        from: EntryStatus,
        to: EntryStatus,
        note: Option<&str>,
    ) {
        let mut metadata = serde_json::json!({
            "from": from.as_str(),
            "to": to.as_str(),
        });
        if let Some(note) = note {
            metadata["reason"] = serde_json::Value::String(note.to_string());
        }
        self.audit.append(AuditEvent::new(
            AuditEventType::StatusChanged,
            AuditSubject::Pack(pack_id),
            Some(metadata),
        ));
    }

    fn load_entry(&self, entry_info_id: EntryInfoId) -> Result<EntryInfo, PackError> {
        self.entries
            .get(entry_info_id)
            .ok_or(PackError::EntryInfoNotFound(entry_info_id))
    }

    fn entry_lock(&self, entry_info_id: EntryInfoId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(entry_info_id)
            .or_default()
            .clone()
    }
}
