//! The scheduled sweeps and the drift monitor: expiry after the grace
//! period, re-entrancy, archival of shelved packs, and drift reports on
//! post-submission data mutation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::Mutex;

use arrivo_client::{AttemptOutcome, SubmissionAttempt, SubmissionDocument, TransportKind};
use arrivo_core::{
    AttemptId, CardNumber, CompletionMetrics, DataCategory, DestinationId, TravelerPayload,
    Timestamp, UserId,
};
use arrivo_lifecycle::{
    ArchivalSweep, DriftMonitor, DriftReport, EntryPackLifecycleManager, ExpirySweep,
    StatusEvents,
};
use arrivo_pack::{
    AuditLog, ChangeType, EntryInfo, EntryInfoStore, EntryPackStore, EntryStatus,
    InMemoryEntryInfoStore, InMemoryEntryPackStore, InMemoryProfileStore, InMemorySnapshotStore,
    ProfileStore, SnapshotReason, SnapshotService, SnapshotStore,
};

struct Fixture {
    _dir: tempfile::TempDir,
    entries: Arc<InMemoryEntryInfoStore>,
    packs: Arc<InMemoryEntryPackStore>,
    snapshots: Arc<InMemorySnapshotStore>,
    profiles: Arc<InMemoryProfileStore>,
    manager: Arc<EntryPackLifecycleManager>,
    entry: EntryInfo,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let entries = Arc::new(InMemoryEntryInfoStore::new());
    let packs = Arc::new(InMemoryEntryPackStore::new());
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let profiles = Arc::new(InMemoryProfileStore::new());
    let audit = Arc::new(AuditLog::new());

    let entry = EntryInfo::new(UserId::new(), DestinationId::new());
    entries.upsert(entry.clone());

    profiles.put(
        TravelerPayload::new(entry.user_id, entry.destination_id)
            .with_field(DataCategory::Identity, "fullName", "MARTA KOVACS")
            .with_field(DataCategory::Accommodation, "accommodationAddress", "12 Harbor Rd"),
    );

    let service = Arc::new(SnapshotService::new(
        dir.path().join("snapshots"),
        entries.clone() as Arc<dyn EntryInfoStore>,
        packs.clone() as Arc<dyn EntryPackStore>,
        snapshots.clone() as Arc<dyn SnapshotStore>,
        profiles.clone() as Arc<dyn ProfileStore>,
        audit.clone(),
    ));
    let manager = Arc::new(EntryPackLifecycleManager::new(
        entries.clone() as Arc<dyn EntryInfoStore>,
        packs.clone() as Arc<dyn EntryPackStore>,
        service,
        audit,
        Arc::new(StatusEvents::new()),
    ));

    Fixture {
        _dir: dir,
        entries,
        packs,
        snapshots,
        profiles,
        manager,
        entry,
    }
}

fn successful_attempt(entry: &EntryInfo, card: &str) -> SubmissionAttempt {
    SubmissionAttempt {
        attempt_id: AttemptId::new(),
        user_id: entry.user_id,
        destination_id: entry.destination_id,
        transport_used: TransportKind::Direct,
        started_at: Timestamp::now(),
        step_timings: vec![],
        outcome: AttemptOutcome::Success,
        document: Some(SubmissionDocument {
            arr_card_no: CardNumber::new(card).unwrap(),
            qr_location: format!("https://docs.example.gov/{card}.qr.png"),
            document_location: format!("https://docs.example.gov/{card}.pdf"),
            submitted_at: Timestamp::now(),
            transport_used: TransportKind::Direct,
        }),
    }
}

fn submit(f: &Fixture) -> arrivo_core::EntryPackId {
    f.manager
        .mark_ready(f.entry.entry_info_id, CompletionMetrics::complete())
        .unwrap();
    f.manager
        .create_or_update_pack(f.entry.entry_info_id, successful_attempt(&f.entry, "387778D"))
        .unwrap()
        .entry_pack_id
}

#[test]
fn expiry_sweep_is_reentrant_within_a_day() {
    let f = fixture();
    let pack_id = submit(&f);
    let now = Utc::now();

    let mut entry = f.entries.get(f.entry.entry_info_id).unwrap();
    entry.arrival_date = Some(Timestamp::from_datetime(now - Duration::days(8)));
    f.entries.upsert(entry);

    let sweep = ExpirySweep::new(f.manager.clone(), f.entries.clone(), f.packs.clone());

    let first = sweep.run(now);
    assert_eq!(first.transitioned, vec![pack_id]);
    assert_eq!(
        f.entries.get(f.entry.entry_info_id).unwrap().status,
        EntryStatus::Expired
    );
    let frozen = f.snapshots.latest_for_pack(pack_id).unwrap();
    assert_eq!(frozen.reason, SnapshotReason::Archival);

    // Second run the same day finds nothing left to expire.
    let second = sweep.run(now);
    assert!(second.transitioned.is_empty());
    assert_eq!(second.examined, 1);
    assert_eq!(f.snapshots.count_for_pack(pack_id), 2);
}

#[test]
fn expiry_sweep_leaves_packs_inside_the_grace_window_alone() {
    let f = fixture();
    submit(&f);
    let now = Utc::now();

    let mut entry = f.entries.get(f.entry.entry_info_id).unwrap();
    entry.arrival_date = Some(Timestamp::from_datetime(now - Duration::days(6)));
    f.entries.upsert(entry);

    let report = ExpirySweep::new(f.manager.clone(), f.entries.clone(), f.packs.clone()).run(now);
    assert!(report.transitioned.is_empty());
    assert_eq!(
        f.entries.get(f.entry.entry_info_id).unwrap().status,
        EntryStatus::Submitted
    );
}

#[test]
fn expiry_sweep_skips_entries_without_an_arrival_date() {
    let f = fixture();
    submit(&f);
    // arrival_date stays None.
    let report =
        ExpirySweep::new(f.manager.clone(), f.entries.clone(), f.packs.clone()).run(Utc::now());
    assert_eq!(report.examined, 1);
    assert!(report.transitioned.is_empty());
}

#[test]
fn archival_sweep_shelves_superseded_packs_after_its_grace() {
    let f = fixture();
    let pack_id = submit(&f);
    f.manager.mark_superseded(pack_id).unwrap();

    let sweep = ArchivalSweep::new(f.manager.clone(), f.entries.clone(), f.packs.clone());

    // Inside the 24-hour window: untouched.
    let early = sweep.run(Utc::now());
    assert!(early.transitioned.is_empty());

    let late = sweep.run(Utc::now() + Duration::hours(25));
    assert_eq!(late.transitioned, vec![pack_id]);
    assert_eq!(
        f.entries.get(f.entry.entry_info_id).unwrap().status,
        EntryStatus::Archived
    );

    // Re-entrant like the expiry sweep.
    let again = sweep.run(Utc::now() + Duration::hours(26));
    assert!(again.transitioned.is_empty());
}

#[test]
fn drift_monitor_reports_changes_against_the_latest_snapshot() {
    let f = fixture();
    let pack_id = submit(&f);

    let reports: Arc<Mutex<Vec<DriftReport>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let monitor = DriftMonitor::start(
        f.profiles.clone() as Arc<dyn ProfileStore>,
        f.entries.clone() as Arc<dyn EntryInfoStore>,
        f.packs.clone() as Arc<dyn EntryPackStore>,
        f.snapshots.clone() as Arc<dyn SnapshotStore>,
        Box::new(move |report| sink.lock().push(report.clone())),
    );

    // Re-storing the unchanged payload is not drift.
    let unchanged = f
        .profiles
        .traveler_payload(f.entry.user_id, f.entry.destination_id)
        .unwrap();
    f.profiles.put(unchanged.clone());
    assert!(reports.lock().is_empty());

    // A real mutation is.
    f.profiles.put(unchanged.with_field(
        DataCategory::Accommodation,
        "accommodationAddress",
        "88 Quay St",
    ));
    {
        let seen = reports.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].entry_pack_id, pack_id);
        assert_eq!(seen[0].diff.changed_fields.len(), 1);
        let change = &seen[0].diff.changed_fields[0];
        assert_eq!(change.field, "accommodationAddress");
        assert_eq!(change.change_type, ChangeType::Modified);
    }

    // Once superseded, further edits are no longer drift.
    f.manager.mark_superseded(pack_id).unwrap();
    let payload = f
        .profiles
        .traveler_payload(f.entry.user_id, f.entry.destination_id)
        .unwrap();
    f.profiles
        .put(payload.with_field(DataCategory::Identity, "fullName", "M. KOVACS"));
    assert_eq!(reports.lock().len(), 1);

    // Dropping the monitor ends the subscription.
    drop(monitor);
    let payload = f
        .profiles
        .traveler_payload(f.entry.user_id, f.entry.destination_id)
        .unwrap();
    f.profiles
        .put(payload.with_field(DataCategory::Identity, "fullName", "MARTA K."));
    assert_eq!(reports.lock().len(), 1);
}
