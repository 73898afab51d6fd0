//! # arrivo-lifecycle — Entry-pack lifecycle engine
//!
//! The orchestration layer over [`arrivo_pack`]'s records:
//!
//! - [`manager`] — the [`EntryPackLifecycleManager`] driving entries and
//!   packs through the status graph, snapshotting before destructive
//!   transitions and auditing every committed one.
//! - [`events`] — synchronous [`StatusEvents`] fan-out for notification
//!   surfaces.
//! - [`drift`] — the [`DriftMonitor`] comparing mutated traveler data
//!   against the latest pack snapshot.
//! - [`sweep`] — the daily [`ExpirySweep`] and the faster
//!   [`ArchivalSweep`].

pub mod drift;
pub mod events;
pub mod manager;
pub mod sweep;

pub use drift::{detect_drift, DriftHandler, DriftMonitor, DriftReport};
pub use events::{EventToken, StatusChange, StatusChangeHandler, StatusEvents};
pub use manager::EntryPackLifecycleManager;
pub use sweep::{
    ArchivalSweep, ExpirySweep, SweepReport, ARCHIVAL_GRACE_HOURS, EXPIRY_GRACE_DAYS,
};
