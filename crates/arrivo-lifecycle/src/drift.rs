//! # Data Drift Monitor
//!
//! Watches the external profile store for traveler-data mutations and
//! compares each mutated payload against the latest snapshot of the
//! affected pack. A non-empty diff on a `submitted` entry surfaces as a
//! [`DriftReport`]; the decision to supersede stays with the user, so the
//! monitor never transitions anything itself.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use arrivo_core::{EntryInfoId, EntryPackId, SnapshotId, Timestamp, TravelerPayload};
use arrivo_pack::{
    calculate_diff, DataDiff, EntryInfoStore, EntryPackStore, EntryStatus, ProfileStore,
    SnapshotStore, SubscriptionToken,
};

/// One detected divergence between live data and the submitted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub entry_info_id: EntryInfoId,
    pub entry_pack_id: EntryPackId,
    /// The snapshot the live data was compared against.
    pub snapshot_id: SnapshotId,
    pub diff: DataDiff,
    pub detected_at: Timestamp,
}

/// Handler invoked synchronously with each detected drift.
pub type DriftHandler = Box<dyn Fn(&DriftReport) + Send + Sync>;

/// Subscription to profile-store mutations, comparing each against the
/// latest pack snapshot. Dropping the monitor ends the subscription.
pub struct DriftMonitor {
    profiles: Arc<dyn ProfileStore>,
    token: SubscriptionToken,
}

impl DriftMonitor {
    pub fn start(
        profiles: Arc<dyn ProfileStore>,
        entries: Arc<dyn EntryInfoStore>,
        packs: Arc<dyn EntryPackStore>,
        snapshots: Arc<dyn SnapshotStore>,
        handler: DriftHandler,
    ) -> Self {
        let token = profiles.on_data_changed(Box::new(move |payload| {
            if let Some(report) = detect_drift(&*entries, &*packs, &*snapshots, payload) {
                tracing::info!(
                    entry = %report.entry_info_id,
                    pack = %report.entry_pack_id,
                    changes = report.diff.changed_fields.len(),
                    "data drift detected"
                );
                handler(&report);
            }
        }));
        Self { profiles, token }
    }
}

impl Drop for DriftMonitor {
    fn drop(&mut self) {
        self.profiles.unsubscribe(self.token);
    }
}

/// Compare one mutated payload against the latest snapshot of its pack.
///
/// Returns `None` when the entry is not currently `submitted`, when there
/// is no pack or snapshot to compare against, or when the diff is empty.
pub fn detect_drift(
    entries: &dyn EntryInfoStore,
    packs: &dyn EntryPackStore,
    snapshots: &dyn SnapshotStore,
    payload: &TravelerPayload,
) -> Option<DriftReport> {
    let entry = entries.list().into_iter().find(|e| {
        e.user_id == payload.user_id && e.destination_id == payload.destination_id
    })?;
    // Only a live submission can drift. Superseded and archived packs are
    // already frozen history.
    if entry.status != EntryStatus::Submitted {
        return None;
    }
    let pack = packs.find_by_entry(entry.entry_info_id)?;
    let snapshot = snapshots.latest_for_pack(pack.entry_pack_id)?;
    let diff = calculate_diff(&snapshot.fields, payload.fields());
    if diff.is_empty() {
        return None;
    }
    Some(DriftReport {
        entry_info_id: entry.entry_info_id,
        entry_pack_id: pack.entry_pack_id,
        snapshot_id: snapshot.snapshot_id,
        diff,
        detected_at: Timestamp::now(),
    })
}
