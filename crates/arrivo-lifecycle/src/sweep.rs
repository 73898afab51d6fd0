//! # Scheduled Sweeps
//!
//! Two daily passes over the stored packs:
//!
//! - [`ExpirySweep`] moves `submitted` packs whose arrival date plus the
//!   grace period has elapsed to `expired`.
//! - [`ArchivalSweep`] moves `superseded`/`expired` packs that have sat
//!   untouched past its own (shorter) grace to `archived`.
//!
//! Both are re-entrant: a pack already past the transition is skipped, so
//! running a sweep twice in one day changes nothing the second time. The
//! reference instant is a parameter, not `Utc::now()`, so hosts schedule
//! the sweep however they like and tests pin time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use arrivo_core::EntryPackId;
use arrivo_pack::{EntryInfoStore, EntryPackStore, EntryStatus};

use crate::manager::EntryPackLifecycleManager;

/// Days after the declared arrival date before a submission expires.
pub const EXPIRY_GRACE_DAYS: i64 = 7;

/// Hours a superseded or expired pack sits before the archival sweep
/// shelves it.
pub const ARCHIVAL_GRACE_HOURS: i64 = 24;

/// What one sweep run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Packs whose entries were examined.
    pub examined: usize,
    /// Packs transitioned by this run.
    pub transitioned: Vec<EntryPackId>,
}

/// Daily pass expiring submissions whose travel window has passed.
pub struct ExpirySweep {
    manager: Arc<EntryPackLifecycleManager>,
    entries: Arc<dyn EntryInfoStore>,
    packs: Arc<dyn EntryPackStore>,
    grace: Duration,
}

impl ExpirySweep {
    pub fn new(
        manager: Arc<EntryPackLifecycleManager>,
        entries: Arc<dyn EntryInfoStore>,
        packs: Arc<dyn EntryPackStore>,
    ) -> Self {
        Self {
            manager,
            entries,
            packs,
            grace: Duration::days(EXPIRY_GRACE_DAYS),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Expire every `submitted` pack whose arrival date plus the grace
    /// period is at or before `now`. Per-pack failures are logged and do
    /// not stop the pass.
    pub fn run(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport {
            examined: 0,
            transitioned: Vec::new(),
        };
        for pack in self.packs.list() {
            report.examined += 1;
            let Some(entry) = self.entries.get(pack.entry_info_id) else {
                tracing::warn!(pack = %pack.entry_pack_id, "pack without entry record; skipping");
                continue;
            };
            if entry.status != EntryStatus::Submitted {
                continue;
            }
            let Some(arrival) = entry.arrival_date else {
                continue;
            };
            if *arrival.as_datetime() + self.grace > now {
                continue;
            }
            match self.manager.expire(pack.entry_pack_id) {
                Ok(()) => report.transitioned.push(pack.entry_pack_id),
                Err(e) => {
                    tracing::warn!(pack = %pack.entry_pack_id, error = %e, "expiry failed");
                }
            }
        }
        tracing::info!(
            examined = report.examined,
            expired = report.transitioned.len(),
            "expiry sweep finished"
        );
        report
    }
}

/// Faster follow-up pass shelving packs that already left `submitted`.
pub struct ArchivalSweep {
    manager: Arc<EntryPackLifecycleManager>,
    entries: Arc<dyn EntryInfoStore>,
    packs: Arc<dyn EntryPackStore>,
    grace: Duration,
}

impl ArchivalSweep {
    pub fn new(
        manager: Arc<EntryPackLifecycleManager>,
        entries: Arc<dyn EntryInfoStore>,
        packs: Arc<dyn EntryPackStore>,
    ) -> Self {
        Self {
            manager,
            entries,
            packs,
            grace: Duration::hours(ARCHIVAL_GRACE_HOURS),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Archive every `superseded` or `expired` pack untouched since before
    /// `now` minus the grace period.
    pub fn run(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport {
            examined: 0,
            transitioned: Vec::new(),
        };
        for pack in self.packs.list() {
            report.examined += 1;
            let Some(entry) = self.entries.get(pack.entry_info_id) else {
                tracing::warn!(pack = %pack.entry_pack_id, "pack without entry record; skipping");
                continue;
            };
            if !matches!(entry.status, EntryStatus::Superseded | EntryStatus::Expired) {
                continue;
            }
            if *entry.last_updated_at.as_datetime() + self.grace > now {
                continue;
            }
            match self.manager.archive(pack.entry_pack_id, "archival sweep") {
                Ok(()) => report.transitioned.push(pack.entry_pack_id),
                Err(e) => {
                    tracing::warn!(pack = %pack.entry_pack_id, error = %e, "archival failed");
                }
            }
        }
        tracing::info!(
            examined = report.examined,
            archived = report.transitioned.len(),
            "archival sweep finished"
        );
        report
    }
}
