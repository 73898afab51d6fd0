//! # Snapshots
//!
//! An [`EntryPackSnapshot`] is an immutable, point-in-time copy of all
//! traveler data bound to a pack: the payload fields, the current
//! submission metadata, completeness, and copies of the fund-photo files.
//! Snapshots are written once at meaningful lifecycle moments (submission,
//! supersession, archival) and only ever removed wholesale.
//!
//! ## Partial-failure policy
//!
//! The textual record always wins: a photo that cannot be copied becomes a
//! [`PhotoCopyStatus::Missing`] manifest entry plus a warning on the
//! snapshot, never an aborted snapshot. `delete` cleans up copied files
//! best-effort, so an interrupted copy does not wedge later deletion.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use arrivo_client::SubmissionDocument;
use arrivo_core::{EntryPackId, PayloadField, SnapshotId, Timestamp};

use crate::audit::{AuditEvent, AuditEventType, AuditLog, AuditSubject};
use crate::entry::FundPhotoRef;
use crate::error::PackError;
use crate::pack::EntryPack;
use crate::store::{EntryInfoStore, EntryPackStore, ProfileStore, SnapshotStore};

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotReason {
    /// Taken when a submission succeeded.
    Submission,
    /// Taken just before a pack is marked superseded.
    Superseded,
    /// Taken by the expiry/archival sweeps before shelving.
    Archival,
}

impl SnapshotReason {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submission => "submission",
            Self::Superseded => "superseded",
            Self::Archival => "archival",
        }
    }
}

impl std::fmt::Display for SnapshotReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where one fund photo ended up in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PhotoCopyStatus {
    /// Copied into pack-scoped storage under `file`.
    Stored { file: String },
    /// Source file unreadable at snapshot time; placeholder recorded.
    Missing,
}

/// Manifest entry for one referenced photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoManifestEntry {
    pub item_id: String,
    #[serde(flatten)]
    pub copy: PhotoCopyStatus,
}

/// Immutable point-in-time copy of a pack's traveler data.
///
/// There is no update operation anywhere in the public API; stores hand
/// out clones, and the only mutation of stored state is whole-unit
/// [`SnapshotService::delete`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPackSnapshot {
    pub snapshot_id: SnapshotId,
    pub entry_pack_id: EntryPackId,
    pub reason: SnapshotReason,
    /// 1-based, incremented per snapshot of the same pack.
    pub version: u32,
    /// Frozen copy of the payload fields at snapshot time.
    pub fields: Vec<PayloadField>,
    /// Frozen copy of the submission metadata at snapshot time.
    pub submission: SubmissionDocument,
    pub photo_manifest: Vec<PhotoManifestEntry>,
    /// Whether every required category was complete at snapshot time.
    pub complete: bool,
    /// Partial-failure notes (photo copy problems, missing live payload).
    pub warnings: Vec<String>,
    pub created_at: Timestamp,
}

/// Creates, loads, and deletes snapshots, including the pack-scoped photo
/// file copies.
pub struct SnapshotService {
    photo_root: PathBuf,
    entries: Arc<dyn EntryInfoStore>,
    packs: Arc<dyn EntryPackStore>,
    snapshots: Arc<dyn SnapshotStore>,
    profiles: Arc<dyn ProfileStore>,
    audit: Arc<AuditLog>,
}

impl SnapshotService {
    pub fn new(
        photo_root: impl Into<PathBuf>,
        entries: Arc<dyn EntryInfoStore>,
        packs: Arc<dyn EntryPackStore>,
        snapshots: Arc<dyn SnapshotStore>,
        profiles: Arc<dyn ProfileStore>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            photo_root: photo_root.into(),
            entries,
            packs,
            snapshots,
            profiles,
            audit,
        }
    }

    /// Freeze a stored pack's current data into a new snapshot.
    ///
    /// Photo-copy failures degrade into manifest placeholders; only a
    /// missing pack/entry or an unusable photo directory is fatal.
    pub fn create_snapshot(
        &self,
        entry_pack_id: EntryPackId,
        reason: SnapshotReason,
    ) -> Result<EntryPackSnapshot, PackError> {
        let pack = self
            .packs
            .get(entry_pack_id)
            .ok_or(PackError::PackNotFound(entry_pack_id))?;
        self.create_snapshot_of(&pack, reason)
    }

    /// Freeze a pack handed in by value, which need not be stored yet.
    ///
    /// The lifecycle manager snapshots through this before committing any
    /// store write, so a fatal snapshot error leaves the stores untouched.
    pub fn create_snapshot_of(
        &self,
        pack: &EntryPack,
        reason: SnapshotReason,
    ) -> Result<EntryPackSnapshot, PackError> {
        let entry_pack_id = pack.entry_pack_id;
        let entry = self
            .entries
            .get(pack.entry_info_id)
            .ok_or(PackError::EntryInfoNotFound(pack.entry_info_id))?;

        let snapshot_id = SnapshotId::new();
        let created_at = Timestamp::now();
        let mut warnings = Vec::new();

        let fields = match self
            .profiles
            .traveler_payload(entry.user_id, entry.destination_id)
        {
            Some(payload) => payload.fields().to_vec(),
            None => {
                warnings.push("live payload unavailable; snapshot has no field data".to_string());
                Vec::new()
            }
        };

        let pack_dir = self.pack_dir(entry_pack_id);
        std::fs::create_dir_all(&pack_dir)?;

        let photo_manifest =
            copy_photos(&pack_dir, snapshot_id, created_at, &entry.fund_photos, &mut warnings);

        let snapshot = EntryPackSnapshot {
            snapshot_id,
            entry_pack_id,
            reason,
            version: self.snapshots.count_for_pack(entry_pack_id) + 1,
            fields,
            submission: pack.submission.clone(),
            photo_manifest,
            complete: entry.completion_metrics.is_complete(),
            warnings,
            created_at,
        };

        self.snapshots.insert(snapshot.clone());
        self.audit.append(AuditEvent::new(
            AuditEventType::Created,
            AuditSubject::Snapshot(snapshot_id),
            Some(serde_json::json!({
                "entryPackId": entry_pack_id.to_string(),
                "reason": reason.as_str(),
                "version": snapshot.version,
                "warnings": snapshot.warnings.len(),
            })),
        ));
        tracing::info!(
            snapshot = %snapshot_id,
            pack = %entry_pack_id,
            reason = %reason,
            warnings = snapshot.warnings.len(),
            "snapshot created"
        );
        Ok(snapshot)
    }

    /// Read-only view of a snapshot. Records a `viewed` audit event.
    pub fn load(&self, snapshot_id: SnapshotId) -> Result<EntryPackSnapshot, PackError> {
        let snapshot = self
            .snapshots
            .get(snapshot_id)
            .ok_or(PackError::SnapshotNotFound(snapshot_id))?;
        self.audit.append(AuditEvent::new(
            AuditEventType::Viewed,
            AuditSubject::Snapshot(snapshot_id),
            None,
        ));
        Ok(snapshot)
    }

    /// Most recent snapshot of a pack, without the audit side effect.
    /// Used by the drift monitor's comparisons.
    pub fn latest_for_pack(&self, pack_id: EntryPackId) -> Option<EntryPackSnapshot> {
        self.snapshots.latest_for_pack(pack_id)
    }

    /// Remove a snapshot and its copied photo files as one unit.
    ///
    /// File removal is best-effort: files that were never copied (or were
    /// half-written when the process died) do not fail the delete.
    pub fn delete(&self, snapshot_id: SnapshotId) -> Result<(), PackError> {
        let snapshot = self
            .snapshots
            .remove(snapshot_id)
            .ok_or(PackError::SnapshotNotFound(snapshot_id))?;

        let pack_dir = self.pack_dir(snapshot.entry_pack_id);
        // Sweep by prefix rather than by manifest so partial files from an
        // interrupted copy are cleaned up too.
        let prefix = format!("snapshot_{snapshot_id}_");
        if let Ok(dir) = std::fs::read_dir(&pack_dir) {
            for file in dir.flatten() {
                let name = file.file_name();
                if name.to_string_lossy().starts_with(&prefix) {
                    if let Err(e) = std::fs::remove_file(file.path()) {
                        tracing::warn!(file = %name.to_string_lossy(), error = %e, "snapshot photo cleanup failed");
                    }
                }
            }
        }

        self.audit.append(AuditEvent::new(
            AuditEventType::Deleted,
            AuditSubject::Snapshot(snapshot_id),
            Some(serde_json::json!({ "entryPackId": snapshot.entry_pack_id.to_string() })),
        ));
        tracing::info!(snapshot = %snapshot_id, "snapshot deleted");
        Ok(())
    }

    fn pack_dir(&self, pack_id: EntryPackId) -> PathBuf {
        self.photo_root.join(format!("pack_{pack_id}"))
    }
}

fn copy_photos(
    pack_dir: &Path,
    snapshot_id: SnapshotId,
    created_at: Timestamp,
    photos: &[FundPhotoRef],
    warnings: &mut Vec<String>,
) -> Vec<PhotoManifestEntry> {
    let stamp = created_at.to_file_stamp();
    photos
        .iter()
        .map(|photo| {
            let file = format!("snapshot_{snapshot_id}_{}_{stamp}.jpg", photo.item_id);
            match std::fs::copy(&photo.path, pack_dir.join(&file)) {
                Ok(_) => PhotoManifestEntry {
                    item_id: photo.item_id.clone(),
                    copy: PhotoCopyStatus::Stored { file },
                },
                Err(e) => {
                    tracing::warn!(item = %photo.item_id, source = %photo.path, error = %e, "fund photo copy failed");
                    warnings.push(format!("photo '{}' could not be copied: {e}", photo.item_id));
                    PhotoManifestEntry {
                        item_id: photo.item_id.clone(),
                        copy: PhotoCopyStatus::Missing,
                    }
                }
            }
        })
        .collect()
}
